//! Logical node id → physical address resolution for root-side sends.

use tracing::{debug, instrument, warn};

use crate::core::packet::DataType;
use crate::error::Result;
use crate::protocol::registry::NodeRegistry;
use crate::protocol::sender::{validate_payload, PacketSender};
use crate::transport::MeshTransport;

impl<T: MeshTransport> PacketSender<T> {
    /// Send to the node registered under `node_id`.
    ///
    /// Root-only. An unknown id fails with
    /// [`MeshError::NodeNotFound`](crate::error::MeshError::NodeNotFound)
    /// before the transport is touched.
    #[instrument(skip_all, fields(node_id = node_id, %data_type, len = payload.len()))]
    pub fn send_to_node_id(
        &self,
        registry: &NodeRegistry,
        node_id: u8,
        data_type: DataType,
        payload: &[u8],
    ) -> Result<()> {
        validate_payload(payload)?;
        self.require_root()?;

        let address = registry
            .resolve(node_id)
            .map_err(|e| {
                warn!(error = %e, "Cannot resolve node");
                e
            })?;
        debug!(%address, "Resolved node id");

        self.send_to_child(&address, data_type, payload)
    }
}
