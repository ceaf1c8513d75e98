//! # Service Layer
//!
//! The [`MeshLink`](link::MeshLink) facade ties the protocol components to
//! one transport and owns the receive task lifecycle.

pub mod link;

pub use link::MeshLink;
