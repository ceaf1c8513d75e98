//! Link Metrics
//!
//! Counters for the send paths and the receive loop.
//!
//! Uses atomic counters so the receive task and any number of senders can
//! record without locking. Each [`MeshLink`](crate::service::link::MeshLink)
//! owns its own collector.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Metrics collector for one link
#[derive(Debug)]
pub struct LinkMetrics {
    /// Frames handed to the transport successfully
    pub frames_sent: AtomicU64,
    /// Transport sends that failed, counted per recipient
    pub send_failures: AtomicU64,
    /// Bytes handed to the transport successfully
    pub bytes_sent: AtomicU64,
    /// Well-formed frames received
    pub frames_received: AtomicU64,
    /// Bytes of well-formed frames received
    pub bytes_received: AtomicU64,
    /// Frames dropped by validation
    pub frames_malformed: AtomicU64,
    /// Well-formed frames dropped because no callback was registered
    pub frames_unhandled: AtomicU64,
    /// Errors reported by the transport receive primitive
    pub receive_errors: AtomicU64,
    /// Identity announcements written to the registry
    pub identities_registered: AtomicU64,
    start_time: Instant,
}

impl LinkMetrics {
    pub fn new() -> Self {
        Self {
            frames_sent: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            frames_malformed: AtomicU64::new(0),
            frames_unhandled: AtomicU64::new(0),
            receive_errors: AtomicU64::new(0),
            identities_registered: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn frame_sent(&self, byte_count: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent
            .fetch_add(byte_count as u64, Ordering::Relaxed);
    }

    pub fn send_failed(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_received(&self, byte_count: usize) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received
            .fetch_add(byte_count as u64, Ordering::Relaxed);
    }

    pub fn frame_malformed(&self) {
        self.frames_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_unhandled(&self) {
        self.frames_unhandled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn receive_error(&self) {
        self.receive_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn identity_registered(&self) {
        self.identities_registered.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            frames_malformed: self.frames_malformed.load(Ordering::Relaxed),
            frames_unhandled: self.frames_unhandled.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            identities_registered: self.identities_registered.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            frames_sent = snapshot.frames_sent,
            send_failures = snapshot.send_failures,
            bytes_sent = snapshot.bytes_sent,
            frames_received = snapshot.frames_received,
            bytes_received = snapshot.bytes_received,
            frames_malformed = snapshot.frames_malformed,
            frames_unhandled = snapshot.frames_unhandled,
            receive_errors = snapshot.receive_errors,
            identities_registered = snapshot.identities_registered,
            uptime_seconds = snapshot.uptime_seconds,
            "Mesh link metrics snapshot"
        );
    }
}

impl Default for LinkMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_sent: u64,
    pub send_failures: u64,
    pub bytes_sent: u64,
    pub frames_received: u64,
    pub bytes_received: u64,
    pub frames_malformed: u64,
    pub frames_unhandled: u64,
    pub receive_errors: u64,
    pub identities_registered: u64,
    pub uptime_seconds: u64,
}
