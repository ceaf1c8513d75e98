//! # Link Protocol
//!
//! Everything between the application and the mesh transport: directed
//! send paths, the node registry, id-based addressing and the receive side.
//!
//! ## Components
//! - **Sender**: child → root, root → child and root → all fan-out
//! - **Registry**: bounded table of announced nodes (id, address, type, name)
//! - **Resolver**: logical node id → physical address for root-side sends
//! - **Dispatcher**: single receive callback slot
//! - **Receiver**: spawned loop that validates frames and dispatches them
//!
//! ## Roles
//! Downstream sends (to one child, to all, by node id) are only permitted on
//! the root. Upstream sends are only permitted on a non-root node. Role
//! violations are rejected before the transport is called.

pub mod dispatcher;
pub mod receiver;
pub mod registry;
pub mod resolver;
pub mod sender;

#[cfg(test)]
mod tests;
