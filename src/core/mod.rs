//! # Core Wire Components
//!
//! Low-level packet framing, the node identity record, and physical addresses.
//!
//! This module is the foundation of the link layer: it turns typed payloads
//! into frames for the mesh transport and validates frames coming back.
//!
//! ## Components
//! - **Packet**: 4-byte header plus payload, encode/decode with length checks
//! - **Identity**: fixed 18-byte record a child sends to announce itself
//! - **Address**: 6-byte MAC address used by the transport
//!
//! ## Wire Format
//! ```text
//! [Type(1)] [Length(2, LE)] [Reserved(1)] [Payload(Length)]
//! ```
//!
//! ## Validation
//! - Frames shorter than the header are rejected
//! - Declared length must match the trailing byte count exactly
//! - Decoding borrows the payload from the receive buffer, never reinterprets it

pub mod address;
pub mod identity;
pub mod packet;
