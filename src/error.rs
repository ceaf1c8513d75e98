//! # Error Types
//!
//! Error handling for the mesh link layer.
//!
//! Every fallible operation returns [`MeshError`]. Nothing here is fatal: the
//! send paths hand errors back to the caller, and the receive loop logs its
//! own failures and keeps listening.
//!
//! ## Error Categories
//! - **Bad argument**: empty or oversized payloads, node id 0, long names
//! - **Resource exhaustion**: allocation failure, registry full
//! - **Role violation**: a send issued from the wrong side of the tree
//! - **Not found**: unknown logical node id, out-of-range index
//! - **Not ready**: mesh inactive, link not started
//! - **Malformed frame**: structural decode failures (dropped by the receive loop)
//! - **Transport**: the underlying mesh send or receive failed
//!
//! ## Example Usage
//! ```rust
//! use mesh_link::error::{ErrorKind, MeshError};
//!
//! let err = MeshError::NodeNotFound(7);
//! match err.kind() {
//!     ErrorKind::NotFound => { /* ask node 7 to announce itself again */ }
//!     _ => {}
//! }
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Lock-related error messages
    pub const ERR_REGISTRY_LOCK: &str = "Failed to acquire registry lock";
    pub const ERR_CALLBACK_LOCK: &str = "Failed to acquire receive callback lock";

    /// Argument validation errors
    pub const ERR_EMPTY_PAYLOAD: &str = "Payload must not be empty";
    pub const ERR_INVALID_NODE_ID: &str = "Node id 0 is reserved";
    pub const ERR_NAME_TOO_LONG: &str = "Node name exceeds 15 bytes";
    pub const ERR_NAME_NUL: &str = "Node name must not contain NUL bytes";
    pub const ERR_NAME_UTF8: &str = "Node name is not valid UTF-8";

    /// Role errors
    pub const ERR_NOT_ROOT: &str = "Operation is only permitted on the root node";
    pub const ERR_IS_ROOT: &str = "The root node has no upstream to send to";

    /// Lifecycle errors
    pub const ERR_ALREADY_STARTED: &str = "Receive loop is already running";
    pub const ERR_NOT_STARTED: &str = "Receive loop is not running";
}

/// Category of a [`MeshError`], for callers that branch on the kind of failure
/// rather than on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadArgument,
    ResourceExhausted,
    RoleViolation,
    NotFound,
    NotReady,
    MalformedFrame,
    Transport,
    InvalidState,
    Config,
}

// MeshError is the primary error type for all mesh link operations
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("Payload too large: {0} bytes (maximum {max})", max = u16::MAX)]
    OversizedPayload(usize),

    #[error("Out of memory allocating {0} bytes")]
    OutOfMemory(usize),

    #[error("Node registry full ({capacity} entries)")]
    RegistryFull { capacity: usize },

    #[error("Role violation: {0}")]
    RoleViolation(&'static str),

    #[error("Node id {0} is not registered")]
    NodeNotFound(u8),

    #[error("Registry index {index} out of range (count {count})")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Mesh is not started")]
    MeshNotStarted,

    #[error("Frame too short: {actual} bytes, need at least {required}")]
    FrameTooShort { actual: usize, required: usize },

    #[error("Frame length mismatch: header declares {declared} payload bytes, frame carries {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Broadcast failed: all {attempted} sends failed")]
    FanOutFailed { attempted: usize },

    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    #[error("Synchronization primitive poisoned: {0}")]
    LockPoisoned(&'static str),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl MeshError {
    /// Map this error onto its category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MeshError::InvalidArgument(_) | MeshError::OversizedPayload(_) => {
                ErrorKind::BadArgument
            }
            MeshError::OutOfMemory(_) | MeshError::RegistryFull { .. } => {
                ErrorKind::ResourceExhausted
            }
            MeshError::RoleViolation(_) => ErrorKind::RoleViolation,
            MeshError::NodeNotFound(_) | MeshError::IndexOutOfRange { .. } => ErrorKind::NotFound,
            MeshError::MeshNotStarted => ErrorKind::NotReady,
            MeshError::FrameTooShort { .. } | MeshError::LengthMismatch { .. } => {
                ErrorKind::MalformedFrame
            }
            MeshError::Io(_) | MeshError::Transport(_) | MeshError::FanOutFailed { .. } => {
                ErrorKind::Transport
            }
            MeshError::InvalidState(_) | MeshError::LockPoisoned(_) => ErrorKind::InvalidState,
            MeshError::ConfigError(_) => ErrorKind::Config,
        }
    }

    /// True for structural decode failures on inbound frames.
    pub fn is_malformed_frame(&self) -> bool {
        self.kind() == ErrorKind::MalformedFrame
    }
}

/// Type alias for Results using MeshError
pub type Result<T> = std::result::Result<T, MeshError>;
