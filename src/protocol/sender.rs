//! # Send Paths
//!
//! The three directed senders: child → root, root → one child, and root →
//! every address in the transport routing table.
//!
//! Each path validates its arguments before allocating, checks the node's
//! mesh state and role, encodes one frame and hands it to the transport. The
//! frame is a plain `Vec<u8>` owned by the call, so it is released on every
//! return path.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::core::address::MeshAddr;
use crate::core::packet::{self, DataType, MAX_PAYLOAD_SIZE};
use crate::error::{constants, MeshError, Result};
use crate::transport::{Direction, MeshTransport};
use crate::utils::metrics::LinkMetrics;

/// Per-recipient outcome of a broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Recipients in the routing table snapshot.
    pub attempted: usize,
    pub delivered: Vec<MeshAddr>,
    pub failed: Vec<MeshAddr>,
}

impl FanOutReport {
    pub fn delivered_count(&self) -> usize {
        self.delivered.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Reject empty and oversized payloads before anything is allocated.
pub fn validate_payload(payload: &[u8]) -> Result<()> {
    if payload.is_empty() {
        return Err(MeshError::InvalidArgument(constants::ERR_EMPTY_PAYLOAD));
    }
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(MeshError::OversizedPayload(payload.len()));
    }
    Ok(())
}

/// Encodes payloads and pushes them through a [`MeshTransport`].
pub struct PacketSender<T> {
    transport: Arc<T>,
    metrics: Arc<LinkMetrics>,
}

impl<T> Clone for PacketSender<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

impl<T: MeshTransport> PacketSender<T> {
    pub fn new(transport: Arc<T>, metrics: Arc<LinkMetrics>) -> Self {
        Self { transport, metrics }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn require_active(&self) -> Result<()> {
        if !self.transport.is_active() {
            warn!("Mesh not started");
            return Err(MeshError::MeshNotStarted);
        }
        Ok(())
    }

    /// Role check shared with the address resolver.
    pub(crate) fn require_root(&self) -> Result<()> {
        if !self.transport.is_root() {
            warn!("Not a root node");
            return Err(MeshError::RoleViolation(constants::ERR_NOT_ROOT));
        }
        Ok(())
    }

    fn transmit(&self, dest: Option<&MeshAddr>, frame: &[u8], direction: Direction) -> Result<()> {
        match self.transport.send(dest, frame, direction) {
            Ok(()) => {
                self.metrics.frame_sent(frame.len());
                Ok(())
            }
            Err(e) => {
                self.metrics.send_failed();
                Err(e)
            }
        }
    }

    /// Send one frame upstream. Not permitted on the root itself.
    #[instrument(skip_all, fields(%data_type, len = payload.len()))]
    pub fn send_to_root(&self, data_type: DataType, payload: &[u8]) -> Result<()> {
        validate_payload(payload)?;
        self.require_active()?;
        if self.transport.is_root() {
            warn!("Root node cannot send upstream");
            return Err(MeshError::RoleViolation(constants::ERR_IS_ROOT));
        }

        let frame = packet::encode(data_type, payload)?;
        self.transmit(None, &frame, Direction::ToRoot)
            .map_err(|e| {
                warn!(error = %e, "Failed to send to root");
                e
            })?;

        info!("Sent {} bytes to root", payload.len());
        Ok(())
    }

    /// Send one frame from the root to `dest`.
    #[instrument(skip_all, fields(%dest, %data_type, len = payload.len()))]
    pub fn send_to_child(&self, dest: &MeshAddr, data_type: DataType, payload: &[u8]) -> Result<()> {
        validate_payload(payload)?;
        self.require_active()?;
        self.require_root()?;

        let frame = packet::encode(data_type, payload)?;
        self.transmit(Some(dest), &frame, Direction::FromRoot)
            .map_err(|e| {
                warn!(error = %e, "Failed to send to child");
                e
            })?;

        info!("Sent {} bytes to child", payload.len());
        Ok(())
    }

    /// Send the same frame to every address in the routing table.
    ///
    /// Succeeds when at least one recipient accepted the frame, or when the
    /// table is empty. Fails with [`MeshError::FanOutFailed`] only if every
    /// send failed.
    #[instrument(skip_all, fields(%data_type, len = payload.len()))]
    pub fn broadcast(&self, data_type: DataType, payload: &[u8]) -> Result<FanOutReport> {
        validate_payload(payload)?;
        self.require_active()?;
        self.require_root()?;

        let frame = packet::encode(data_type, payload)?;
        let routes = self.transport.routing_table()?;

        if routes.is_empty() {
            debug!("No children in routing table");
            return Ok(FanOutReport::default());
        }

        info!(recipients = routes.len(), "Broadcasting");

        let mut report = FanOutReport {
            attempted: routes.len(),
            ..FanOutReport::default()
        };
        for addr in routes {
            match self.transmit(Some(&addr), &frame, Direction::FromRoot) {
                Ok(()) => report.delivered.push(addr),
                Err(e) => {
                    warn!(%addr, error = %e, "Failed to send to node");
                    report.failed.push(addr);
                }
            }
        }

        info!(
            delivered = report.delivered.len(),
            attempted = report.attempted,
            "Broadcast complete"
        );

        if report.delivered.is_empty() {
            return Err(MeshError::FanOutFailed {
                attempted: report.attempted,
            });
        }
        Ok(report)
    }
}
