//! Node identity record.
//!
//! A child announces itself to the root by sending this record upstream as a
//! [`DataType::CONFIG`](crate::core::packet::DataType::CONFIG) payload:
//!
//! ```text
//! [node_id u8] [node_type u8] [name 16 bytes, NUL-padded]
//! ```
//!
//! The name holds at most 15 bytes so the last byte is always a terminator.

use crate::error::{constants, MeshError, Result};
use std::fmt;

/// Capacity of the name field on the wire, terminator included.
pub const NAME_FIELD_SIZE: usize = 16;

/// Longest name that fits the name field.
pub const MAX_NAME_LEN: usize = NAME_FIELD_SIZE - 1;

/// Encoded size of an identity record.
pub const IDENTITY_SIZE: usize = 2 + NAME_FIELD_SIZE;

/// Device category tag. Unknown values are carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeType(u8);

impl NodeType {
    pub const UNKNOWN: Self = Self(0x00);
    pub const SENSOR: Self = Self(0x01);
    pub const ACTUATOR: Self = Self(0x02);
    pub const GATEWAY: Self = Self(0x03);

    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl From<u8> for NodeType {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UNKNOWN => f.write_str("unknown"),
            Self::SENSOR => f.write_str("sensor"),
            Self::ACTUATOR => f.write_str("actuator"),
            Self::GATEWAY => f.write_str("gateway"),
            Self(other) => write!(f, "type-{other}"),
        }
    }
}

/// Check a logical node id. Zero is reserved.
pub fn validate_node_id(node_id: u8) -> Result<()> {
    if node_id == 0 {
        return Err(MeshError::InvalidArgument(constants::ERR_INVALID_NODE_ID));
    }
    Ok(())
}

/// Check that a name fits the wire field.
pub fn validate_name(name: &str) -> Result<()> {
    if name.len() > MAX_NAME_LEN {
        return Err(MeshError::InvalidArgument(constants::ERR_NAME_TOO_LONG));
    }
    if name.bytes().any(|b| b == 0) {
        return Err(MeshError::InvalidArgument(constants::ERR_NAME_NUL));
    }
    Ok(())
}

/// What a child says about itself when it joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    node_id: u8,
    node_type: NodeType,
    name: String,
}

impl NodeIdentity {
    pub fn new(node_id: u8, node_type: NodeType, name: &str) -> Result<Self> {
        validate_node_id(node_id)?;
        validate_name(name)?;
        Ok(Self {
            node_id,
            node_type,
            name: name.to_owned(),
        })
    }

    pub fn node_id(&self) -> u8 {
        self.node_id
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn to_bytes(&self) -> [u8; IDENTITY_SIZE] {
        let mut out = [0u8; IDENTITY_SIZE];
        out[0] = self.node_id;
        out[1] = self.node_type.0;
        out[2..2 + self.name.len()].copy_from_slice(self.name.as_bytes());
        out
    }

    /// Decode a record that must be exactly [`IDENTITY_SIZE`] bytes.
    ///
    /// The name must be valid UTF-8 and NUL-terminated within its field.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < IDENTITY_SIZE {
            return Err(MeshError::FrameTooShort {
                actual: bytes.len(),
                required: IDENTITY_SIZE,
            });
        }
        if bytes.len() != IDENTITY_SIZE {
            return Err(MeshError::LengthMismatch {
                declared: IDENTITY_SIZE,
                actual: bytes.len(),
            });
        }

        let node_id = bytes[0];
        validate_node_id(node_id)?;

        let field = &bytes[2..];
        let end = field
            .iter()
            .position(|&b| b == 0)
            .ok_or(MeshError::InvalidArgument(constants::ERR_NAME_TOO_LONG))?;

        let name = std::str::from_utf8(&field[..end])
            .map_err(|_| MeshError::InvalidArgument(constants::ERR_NAME_UTF8))?;
        validate_name(name)?;

        Ok(Self {
            node_id,
            node_type: NodeType(bytes[1]),
            name: name.to_owned(),
        })
    }
}
