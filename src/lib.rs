//! # mesh-link
//!
//! Application data link for a self-organizing tree mesh: one root node and
//! any number of children behind a transport that handles topology and
//! routing.
//!
//! The crate adds three things on top of that transport:
//! - a small typed frame (`[type][length][reserved][payload]`)
//! - directed send paths: child → root, root → child, root → all
//! - a root-side registry that maps logical node ids to physical addresses,
//!   filled by children announcing their identity
//!
//! ## Quick start
//! ```rust,no_run
//! use mesh_link::{DataType, MeshAddr, MeshConfig, MeshLink, NodeIdentity, NodeType};
//! use mesh_link::transport::memory::MemoryMesh;
//!
//! # async fn demo() -> mesh_link::Result<()> {
//! let mesh = MemoryMesh::new();
//! let root_addr = MeshAddr::new([0x24, 0x0A, 0xC4, 0, 0, 1]);
//! let child_addr = MeshAddr::new([0x24, 0x0A, 0xC4, 0, 0, 2]);
//!
//! let (root_node, root_rx) = mesh.join(root_addr);
//! let (child_node, child_rx) = mesh.join(child_addr);
//! mesh.set_root(root_addr);
//!
//! let mut root = MeshLink::new(root_node, MeshConfig::default())?;
//! root.start(root_rx)?;
//!
//! let mut child = MeshLink::new(child_node, MeshConfig::default())?;
//! child.register_receive_callback(|from, data_type, payload| {
//!     println!("{data_type} from {from}: {payload:02x?}");
//! })?;
//! child.start(child_rx)?;
//! child.announce_identity(&NodeIdentity::new(2, NodeType::ACTUATOR, "Actuator_2")?)?;
//!
//! // once the announcement has arrived:
//! root.send_to_node_id(2, DataType::CONTROL, &[0x01, 0x02, 0x03])?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//! - [`core`]: frame codec, identity record, addresses
//! - [`protocol`]: send paths, registry, resolver, receive loop
//! - [`service`]: the [`MeshLink`] facade
//! - [`transport`]: transport traits and the in-memory mesh
//! - [`config`]: TOML/env configuration
//! - [`utils`]: logging setup and metrics

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod service;
pub mod transport;
pub mod utils;

pub use crate::config::MeshConfig;
pub use crate::core::address::MeshAddr;
pub use crate::core::identity::{NodeIdentity, NodeType};
pub use crate::core::packet::{DataType, Packet, PacketView};
pub use crate::error::{ErrorKind, MeshError, Result};
pub use crate::protocol::registry::{NodeRegistry, RegisteredNode, Registration};
pub use crate::protocol::sender::FanOutReport;
pub use crate::service::MeshLink;
pub use crate::transport::{Direction, FrameReceiver, MeshTransport, ReceivedFrame};
