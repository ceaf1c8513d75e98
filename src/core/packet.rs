//! Packet framing for the mesh link.
//!
//! A frame is a 4-byte header followed by exactly `length` payload bytes:
//!
//! ```text
//! +--------+-------------+----------+-------------------+
//! | type u8| length u16le| reserved | payload[length]   |
//! +--------+-------------+----------+-------------------+
//! ```
//!
//! The reserved byte is written as zero and ignored when reading.

use crate::error::{MeshError, Result};
use std::fmt;

/// Size of the packet header in bytes.
pub const HEADER_SIZE: usize = 4;

/// Largest payload the 16-bit length field can describe.
pub const MAX_PAYLOAD_SIZE: usize = u16::MAX as usize;

/// Largest frame the codec will ever produce or accept.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_SIZE;

/// Application payload tag carried in the first header byte.
///
/// Unknown tags are preserved as-is so custom applications can use the
/// whole byte range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataType(u8);

impl DataType {
    pub const SENSOR: Self = Self(0x01);
    pub const CONTROL: Self = Self(0x02);
    pub const STATUS: Self = Self(0x03);
    /// Configuration data. Also carries identity announcements.
    pub const CONFIG: Self = Self(0x04);
    pub const CUSTOM: Self = Self(0xFF);

    pub const fn from_raw(raw: u8) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Name of a well-known tag, `None` for application-defined ones.
    pub fn name(self) -> Option<&'static str> {
        match self {
            Self::SENSOR => Some("SENSOR"),
            Self::CONTROL => Some("CONTROL"),
            Self::STATUS => Some("STATUS"),
            Self::CONFIG => Some("CONFIG"),
            Self::CUSTOM => Some("CUSTOM"),
            _ => None,
        }
    }
}

impl From<u8> for DataType {
    fn from(raw: u8) -> Self {
        Self(raw)
    }
}

impl From<DataType> for u8 {
    fn from(data_type: DataType) -> Self {
        data_type.0
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "0x{:02x}", self.0),
        }
    }
}

/// Parsed packet header. The reserved byte is not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub data_type: DataType,
    pub length: u16,
}

impl PacketHeader {
    /// Read the header fields from the front of `bytes`.
    ///
    /// Only checks that enough bytes exist for the header itself.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [data_type, len_lo, len_hi, _reserved, ..] => Ok(Self {
                data_type: DataType(*data_type),
                length: u16::from_le_bytes([*len_lo, *len_hi]),
            }),
            _ => Err(MeshError::FrameTooShort {
                actual: bytes.len(),
                required: HEADER_SIZE,
            }),
        }
    }

    pub fn to_bytes(self) -> [u8; HEADER_SIZE] {
        let [lo, hi] = self.length.to_le_bytes();
        [self.data_type.0, lo, hi, 0]
    }
}

/// Borrowed view of a validated frame. The payload points into the
/// caller's receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketView<'a> {
    pub data_type: DataType,
    pub length: u16,
    pub payload: &'a [u8],
}

impl PacketView<'_> {
    pub fn to_packet(&self) -> Packet {
        Packet {
            data_type: self.data_type,
            payload: self.payload.to_vec(),
        }
    }
}

/// An owned packet: header fields plus a separately owned payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub data_type: DataType,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(data_type: DataType, payload: impl Into<Vec<u8>>) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(MeshError::OversizedPayload(payload.len()));
        }
        Ok(Self { data_type, payload })
    }

    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        encode(self.data_type, &self.payload)
    }

    pub fn from_bytes(frame: &[u8]) -> Result<Self> {
        decode(frame).map(|view| view.to_packet())
    }
}

/// Encode `payload` behind a header with `reserved = 0`.
///
/// Fails if the payload does not fit the 16-bit length field or the frame
/// buffer cannot be allocated.
pub fn encode(data_type: DataType, payload: &[u8]) -> Result<Vec<u8>> {
    let length =
        u16::try_from(payload.len()).map_err(|_| MeshError::OversizedPayload(payload.len()))?;
    let total = HEADER_SIZE + payload.len();

    let mut frame = Vec::new();
    frame
        .try_reserve_exact(total)
        .map_err(|_| MeshError::OutOfMemory(total))?;

    frame.extend_from_slice(&PacketHeader { data_type, length }.to_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Validate and decode a complete frame.
///
/// The frame must be exactly header + declared length; trailing or missing
/// bytes are both rejected.
pub fn decode(frame: &[u8]) -> Result<PacketView<'_>> {
    let header = PacketHeader::parse(frame)?;
    let actual = frame.len() - HEADER_SIZE;

    if usize::from(header.length) != actual {
        return Err(MeshError::LengthMismatch {
            declared: usize::from(header.length),
            actual,
        });
    }

    Ok(PacketView {
        data_type: header.data_type,
        length: header.length,
        payload: &frame[HEADER_SIZE..],
    })
}
