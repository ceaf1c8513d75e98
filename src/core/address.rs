//! Physical (MAC) addresses as seen by the mesh transport.

use crate::error::{MeshError, Result};
use std::fmt;
use std::str::FromStr;

/// A 6-byte station address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MeshAddr([u8; 6]);

impl MeshAddr {
    /// Address length in bytes.
    pub const LEN: usize = 6;

    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 6]> for MeshAddr {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

impl fmt::Display for MeshAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl FromStr for MeshAddr {
    type Err = MeshError;

    /// Parses `aa:bb:cc:dd:ee:ff` (case-insensitive; `-` also accepted).
    fn from_str(s: &str) -> Result<Self> {
        let mut octets = [0u8; 6];
        let mut parts = s.split([':', '-']);

        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .ok_or(MeshError::InvalidArgument("MAC address has fewer than 6 octets"))?;
            if part.len() != 2 {
                return Err(MeshError::InvalidArgument("MAC octet must be two hex digits"));
            }
            *octet = u8::from_str_radix(part, 16)
                .map_err(|_| MeshError::InvalidArgument("MAC octet is not hexadecimal"))?;
        }

        if parts.next().is_some() {
            return Err(MeshError::InvalidArgument("MAC address has more than 6 octets"));
        }

        Ok(Self(octets))
    }
}
