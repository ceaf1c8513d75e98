//! # Mesh Link
//!
//! The application-facing component: one instance per device, owning the
//! registry, the receive callback slot, the metrics and the receive task.
//!
//! ## Lifecycle
//! 1. `MeshLink::new(transport, config)` validates the configuration
//! 2. `start(receiver)` spawns the receive loop (fails if already running)
//! 3. sends and registry queries may be issued from any task
//! 4. `shutdown()` cancels the receive loop and clears the callback
//!
//! ## Example
//! ```rust,no_run
//! use mesh_link::config::MeshConfig;
//! use mesh_link::core::address::MeshAddr;
//! use mesh_link::core::packet::DataType;
//! use mesh_link::service::link::MeshLink;
//! use mesh_link::transport::memory::MemoryMesh;
//!
//! # async fn demo() -> mesh_link::error::Result<()> {
//! let mesh = MemoryMesh::new();
//! let root_addr = MeshAddr::new([0x24, 0x0A, 0xC4, 0, 0, 1]);
//! let (node, receiver) = mesh.join(root_addr);
//! mesh.set_root(root_addr);
//!
//! let mut link = MeshLink::new(node, MeshConfig::default())?;
//! link.register_receive_callback(|from, data_type, payload| {
//!     println!("{} bytes of {data_type} from {from}", payload.len());
//! })?;
//! link.start(receiver)?;
//!
//! link.send_to_node_id(2, DataType::CONTROL, &[0x01, 0x02, 0x03])?;
//! link.shutdown().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::MeshConfig;
use crate::core::address::MeshAddr;
use crate::core::identity::{NodeIdentity, NodeType};
use crate::core::packet::DataType;
use crate::error::{constants, MeshError, Result};
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::receiver::{ReceiveContext, ReceiveTask};
use crate::protocol::registry::{NodeRegistry, RegisteredNode, Registration};
use crate::protocol::sender::{FanOutReport, PacketSender};
use crate::transport::{FrameReceiver, MeshTransport};
use crate::utils::metrics::{LinkMetrics, MetricsSnapshot};

pub struct MeshLink<T: MeshTransport> {
    transport: Arc<T>,
    sender: PacketSender<T>,
    registry: Arc<NodeRegistry>,
    dispatcher: Arc<Dispatcher>,
    metrics: Arc<LinkMetrics>,
    config: MeshConfig,
    receive_task: Option<ReceiveTask>,
}

impl<T: MeshTransport> MeshLink<T> {
    pub fn new(transport: T, config: MeshConfig) -> Result<Self> {
        config.validate_strict()?;

        let transport = Arc::new(transport);
        let metrics = Arc::new(LinkMetrics::new());

        Ok(Self {
            sender: PacketSender::new(transport.clone(), metrics.clone()),
            registry: Arc::new(NodeRegistry::new(config.registry.capacity)),
            dispatcher: Arc::new(Dispatcher::new()),
            transport,
            metrics,
            config,
            receive_task: None,
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    // ---- lifecycle ----

    /// Spawn the receive loop on the current tokio runtime.
    pub fn start<R: FrameReceiver>(&mut self, receiver: R) -> Result<()> {
        if self
            .receive_task
            .as_ref()
            .is_some_and(ReceiveTask::is_finished)
        {
            warn!("Previous receive task has exited, replacing it");
            self.receive_task = None;
        }

        if self.receive_task.is_some() {
            warn!("Already initialized");
            return Err(MeshError::InvalidState(constants::ERR_ALREADY_STARTED));
        }

        let context = ReceiveContext {
            transport: self.transport.clone(),
            dispatcher: self.dispatcher.clone(),
            registry: self.registry.clone(),
            metrics: self.metrics.clone(),
            config: self.config.receive.clone(),
            auto_register_identities: self.config.registry.auto_register_identities,
        };

        self.receive_task = Some(ReceiveTask::spawn(context, receiver)?);
        info!("Mesh data transfer initialized");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.receive_task
            .as_ref()
            .map(|task| !task.is_finished())
            .unwrap_or(false)
    }

    /// Stop the receive loop and drop the registered callback.
    pub async fn shutdown(&mut self) -> Result<()> {
        let task = self.receive_task.take().ok_or_else(|| {
            warn!("Not initialized");
            MeshError::InvalidState(constants::ERR_NOT_STARTED)
        })?;

        task.stop().await?;
        self.dispatcher.clear()?;
        info!("Mesh data transfer deinitialized");
        Ok(())
    }

    // ---- receive callback ----

    /// Install the single consumer for inbound payloads, replacing any
    /// previous one from the next frame on.
    pub fn register_receive_callback<F>(&self, callback: F) -> Result<()>
    where
        F: Fn(&MeshAddr, DataType, &[u8]) + Send + Sync + 'static,
    {
        self.dispatcher.register(callback)?;
        info!("Receive callback registered");
        Ok(())
    }

    pub fn clear_receive_callback(&self) -> Result<bool> {
        self.dispatcher.clear()
    }

    // ---- send paths ----

    pub fn send_to_root(&self, data_type: DataType, payload: &[u8]) -> Result<()> {
        self.sender.send_to_root(data_type, payload)
    }

    pub fn send_to_child(&self, dest: &MeshAddr, data_type: DataType, payload: &[u8]) -> Result<()> {
        self.sender.send_to_child(dest, data_type, payload)
    }

    pub fn broadcast_from_root(&self, data_type: DataType, payload: &[u8]) -> Result<FanOutReport> {
        self.sender.broadcast(data_type, payload)
    }

    pub fn send_to_node_id(&self, node_id: u8, data_type: DataType, payload: &[u8]) -> Result<()> {
        self.sender
            .send_to_node_id(&self.registry, node_id, data_type, payload)
    }

    /// Tell the root who this node is.
    pub fn announce_identity(&self, identity: &NodeIdentity) -> Result<()> {
        self.sender
            .send_to_root(DataType::CONFIG, &identity.to_bytes())?;
        info!(
            node_id = identity.node_id(),
            node_name = identity.name(),
            "Identity announced"
        );
        Ok(())
    }

    // ---- registry ----

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn register_node(
        &self,
        node_id: u8,
        address: MeshAddr,
        node_type: NodeType,
        name: &str,
    ) -> Result<Registration> {
        self.registry.register(node_id, address, node_type, name)
    }

    pub fn registered_node_count(&self) -> Result<usize> {
        self.registry.count()
    }

    pub fn registered_node(&self, index: usize) -> Result<RegisteredNode> {
        self.registry.get_by_index(index)
    }

    pub fn clear_registry(&self) -> Result<usize> {
        self.registry.clear_all()
    }

    // ---- observability ----

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn log_metrics(&self) {
        self.metrics.log_metrics();
    }
}
