//! # Transport Layer
//!
//! The mesh transport this crate sits on, expressed as two traits.
//!
//! [`MeshTransport`] covers the send side and role queries; it is shared by
//! every caller. [`FrameReceiver`] is the blocking receive primitive and is
//! owned by exactly one task, the receive loop.
//!
//! Topology formation, root election and link security belong to the
//! transport and are not modelled here.
//!
//! ## Implementations
//! - [`memory::MemoryMesh`]: in-process tree over tokio channels

use std::future::Future;

use crate::core::address::MeshAddr;
use crate::error::Result;

pub mod memory;

/// Which way a frame travels through the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Child → root.
    ToRoot,
    /// Root → child.
    FromRoot,
}

impl Direction {
    /// Flag bits reported alongside a received frame.
    pub const fn flag(self) -> u32 {
        match self {
            Direction::FromRoot => 0x04,
            Direction::ToRoot => 0x08,
        }
    }
}

/// Metadata of a frame copied into the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivedFrame {
    pub from: MeshAddr,
    pub len: usize,
    pub flag: u32,
}

/// Send side of the mesh.
pub trait MeshTransport: Send + Sync + 'static {
    /// Hand one frame to the mesh. `dest = None` means toward the root.
    ///
    /// May block briefly while the mesh queues the frame.
    fn send(&self, dest: Option<&MeshAddr>, frame: &[u8], direction: Direction) -> Result<()>;

    /// Addresses currently reachable below this node.
    fn routing_table(&self) -> Result<Vec<MeshAddr>>;

    /// Whether this node is joined to a running mesh.
    fn is_active(&self) -> bool;

    fn is_root(&self) -> bool;
}

/// Receive side of the mesh.
pub trait FrameReceiver: Send + 'static {
    /// Wait, without timeout, for the next frame and copy it into `buf`.
    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<ReceivedFrame>> + Send;
}
