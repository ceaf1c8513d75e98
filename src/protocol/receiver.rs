//! # Receive Loop
//!
//! One spawned task per link waits on the transport's receive primitive,
//! validates each frame and hands the payload to the [`Dispatcher`].
//!
//! The task owns a single receive buffer for its whole life. It never exits
//! on bad input or transport errors; the only way out is cancellation,
//! which unblocks the pending receive and drops the buffer.
//!
//! On the root, identity announcements (a [`DataType::CONFIG`] payload of
//! exactly [`IDENTITY_SIZE`] bytes) are written to the registry under the
//! frame's source address before the callback runs.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, error, info, warn};

use crate::config::ReceiveConfig;
use crate::core::address::MeshAddr;
use crate::core::identity::{NodeIdentity, IDENTITY_SIZE};
use crate::core::packet::{self, DataType, HEADER_SIZE};
use crate::error::{MeshError, Result};
use crate::protocol::dispatcher::{Delivery, Dispatcher};
use crate::protocol::registry::NodeRegistry;
use crate::transport::{FrameReceiver, MeshTransport, ReceivedFrame};
use crate::utils::metrics::LinkMetrics;

/// Everything the receive task needs besides the receiver itself.
pub struct ReceiveContext<T> {
    pub transport: Arc<T>,
    pub dispatcher: Arc<Dispatcher>,
    pub registry: Arc<NodeRegistry>,
    pub metrics: Arc<LinkMetrics>,
    pub config: ReceiveConfig,
    pub auto_register_identities: bool,
}

impl<T: MeshTransport> ReceiveContext<T> {
    /// Validate one received frame and deliver it. Never fails: every
    /// problem is logged, counted and the frame dropped.
    pub fn handle_frame(&self, from: MeshAddr, frame: &[u8], flag: u32) {
        if frame.len() < HEADER_SIZE {
            warn!(%from, size = frame.len(), "Received packet too small");
            self.metrics.frame_malformed();
            return;
        }

        let view = match packet::decode(frame) {
            Ok(view) => view,
            Err(e) => {
                warn!(%from, error = %e, "Dropping malformed frame");
                self.metrics.frame_malformed();
                return;
            }
        };

        self.metrics.frame_received(frame.len());
        debug!(
            %from,
            data_type = %view.data_type,
            length = view.length,
            flag,
            "Received data"
        );

        if view.data_type == DataType::CONFIG
            && view.payload.len() == IDENTITY_SIZE
            && self.auto_register_identities
            && self.transport.is_root()
        {
            self.register_announcement(from, view.payload);
        }

        match self.dispatcher.dispatch(&from, view.data_type, view.payload) {
            Ok(Delivery::Delivered) | Ok(Delivery::CallbackPanicked) => {}
            Ok(Delivery::NoCallback) => {
                self.metrics.frame_unhandled();
                debug!("No receive callback registered, data discarded");
            }
            Err(e) => {
                self.metrics.frame_unhandled();
                error!(error = %e, "Dispatch failed, data discarded");
            }
        }
    }

    fn register_announcement(&self, from: MeshAddr, payload: &[u8]) {
        let identity = match NodeIdentity::from_bytes(payload) {
            Ok(identity) => identity,
            Err(e) => {
                debug!(%from, error = %e, "CONFIG payload is not an identity record");
                return;
            }
        };

        match self.registry.register_identity(&identity, from) {
            Ok(_) => self.metrics.identity_registered(),
            Err(e) => warn!(
                %from,
                node_id = identity.node_id(),
                error = %e,
                "Failed to register announced node"
            ),
        }
    }

    async fn run<R: FrameReceiver>(self, mut receiver: R, cancel: CancellationToken) {
        let mut buf = vec![0u8; self.config.rx_buffer_size];
        info!(buffer = buf.len(), "Mesh receive task started");

        loop {
            let received: Result<ReceivedFrame> = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = receiver.recv(&mut buf) => result,
            };

            match received.and_then(|frame| check_reported_len(frame, buf.len())) {
                Ok(frame) => self.handle_frame(frame.from, &buf[..frame.len], frame.flag),
                Err(e) => {
                    self.metrics.receive_error();
                    error!(error = %e, "Mesh receive failed");
                    if !self.config.error_backoff.is_zero() {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = tokio::time::sleep(self.config.error_backoff) => {}
                        }
                    }
                }
            }
        }

        info!("Mesh receive task stopped");
    }
}

/// A transport claiming more bytes than the buffer holds is a receive
/// failure, not a short frame.
fn check_reported_len(frame: ReceivedFrame, capacity: usize) -> Result<ReceivedFrame> {
    if frame.len > capacity {
        return Err(MeshError::Transport(format!(
            "transport reported {} bytes for a {capacity} byte receive buffer",
            frame.len
        )));
    }
    Ok(frame)
}

/// Handle to the running receive task. Dropping it cancels the task.
pub struct ReceiveTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    _guard: DropGuard,
}

impl ReceiveTask {
    /// Spawn the loop on the current tokio runtime.
    pub fn spawn<T, R>(context: ReceiveContext<T>, receiver: R) -> Result<Self>
    where
        T: MeshTransport,
        R: FrameReceiver,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| MeshError::InvalidState("receive loop requires a tokio runtime"))?;

        let cancel = CancellationToken::new();
        let handle = runtime.spawn(context.run(receiver, cancel.clone()));

        Ok(Self {
            _guard: cancel.clone().drop_guard(),
            cancel,
            handle,
        })
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the pending receive and wait for the task to release its buffer.
    pub async fn stop(self) -> Result<()> {
        self.cancel.cancel();
        self.handle
            .await
            .map_err(|e| MeshError::Transport(format!("receive task failed: {e}")))
    }
}
