// test-only module included via protocol/mod.rs
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::ReceiveConfig;
use crate::core::address::MeshAddr;
use crate::core::identity::{NodeIdentity, NodeType};
use crate::core::packet::{self, DataType};
use crate::error::{constants, MeshError, Result};
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::receiver::{ReceiveContext, ReceiveTask};
use crate::protocol::registry::NodeRegistry;
use crate::protocol::sender::PacketSender;
use crate::transport::{Direction, FrameReceiver, MeshTransport, ReceivedFrame};
use crate::utils::metrics::LinkMetrics;

/// Records every send instead of delivering it.
#[derive(Default)]
struct RecordingTransport {
    root: bool,
    inactive: bool,
    routes: Vec<MeshAddr>,
    failing: HashSet<MeshAddr>,
    sent: Mutex<Vec<(Option<MeshAddr>, Vec<u8>, Direction)>>,
}

impl RecordingTransport {
    fn root(routes: Vec<MeshAddr>) -> Self {
        Self {
            root: true,
            routes,
            ..Self::default()
        }
    }

    fn child() -> Self {
        Self::default()
    }

    fn sent(&self) -> Vec<(Option<MeshAddr>, Vec<u8>, Direction)> {
        self.sent.lock().unwrap().clone()
    }
}

impl MeshTransport for RecordingTransport {
    fn send(&self, dest: Option<&MeshAddr>, frame: &[u8], direction: Direction) -> Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((dest.copied(), frame.to_vec(), direction));
        match dest {
            Some(addr) if self.failing.contains(addr) => {
                Err(MeshError::Transport(format!("{addr} unreachable")))
            }
            _ => Ok(()),
        }
    }

    fn routing_table(&self) -> Result<Vec<MeshAddr>> {
        Ok(self.routes.clone())
    }

    fn is_active(&self) -> bool {
        !self.inactive
    }

    fn is_root(&self) -> bool {
        self.root
    }
}

fn addr(last: u8) -> MeshAddr {
    MeshAddr::new([0x24, 0x0A, 0xC4, 0x00, 0x00, last])
}

fn sender(transport: RecordingTransport) -> (PacketSender<RecordingTransport>, Arc<LinkMetrics>) {
    let metrics = Arc::new(LinkMetrics::new());
    (
        PacketSender::new(Arc::new(transport), metrics.clone()),
        metrics,
    )
}

// ---- send paths ----

#[test]
fn child_sends_framed_payload_upstream() {
    let (sender, metrics) = sender(RecordingTransport::child());

    sender
        .send_to_root(DataType::SENSOR, &[0x12, 0x34, 0x56, 0x78])
        .unwrap();

    let sent = sender.transport().sent();
    assert_eq!(sent.len(), 1);
    let (dest, frame, direction) = &sent[0];
    assert_eq!(*dest, None);
    assert_eq!(*direction, Direction::ToRoot);
    assert_eq!(frame, &[0x01, 0x04, 0x00, 0x00, 0x12, 0x34, 0x56, 0x78]);
    assert_eq!(metrics.snapshot().frames_sent, 1);
    assert_eq!(metrics.snapshot().bytes_sent, 8);
}

#[test]
fn root_cannot_send_upstream() {
    let (sender, _) = sender(RecordingTransport::root(vec![]));

    let err = sender.send_to_root(DataType::STATUS, &[1]).unwrap_err();
    assert!(matches!(err, MeshError::RoleViolation(constants::ERR_IS_ROOT)));
    assert!(sender.transport().sent().is_empty());
}

#[test]
fn child_cannot_send_downstream() {
    let (sender, _) = sender(RecordingTransport::child());

    let err = sender
        .send_to_child(&addr(2), DataType::CONTROL, &[1])
        .unwrap_err();
    assert!(matches!(err, MeshError::RoleViolation(constants::ERR_NOT_ROOT)));

    let err = sender.broadcast(DataType::CONTROL, &[1]).unwrap_err();
    assert!(matches!(err, MeshError::RoleViolation(_)));

    assert!(sender.transport().sent().is_empty());
}

#[test]
fn inactive_mesh_rejects_sends() {
    let transport = RecordingTransport {
        inactive: true,
        ..RecordingTransport::child()
    };
    let (sender, _) = sender(transport);

    assert!(matches!(
        sender.send_to_root(DataType::SENSOR, &[1]),
        Err(MeshError::MeshNotStarted)
    ));
    assert!(sender.transport().sent().is_empty());
}

#[test]
fn empty_payload_rejected_before_transport() {
    let (sender, _) = sender(RecordingTransport::root(vec![addr(2)]));

    assert!(matches!(
        sender.send_to_child(&addr(2), DataType::SENSOR, &[]),
        Err(MeshError::InvalidArgument(constants::ERR_EMPTY_PAYLOAD))
    ));
    assert!(matches!(
        sender.broadcast(DataType::SENSOR, &[]),
        Err(MeshError::InvalidArgument(_))
    ));
    assert!(sender.transport().sent().is_empty());
}

#[test]
fn oversized_payload_rejected() {
    let (sender, _) = sender(RecordingTransport::child());
    let payload = vec![0u8; packet::MAX_PAYLOAD_SIZE + 1];

    assert!(matches!(
        sender.send_to_root(DataType::CUSTOM, &payload),
        Err(MeshError::OversizedPayload(n)) if n == payload.len()
    ));
}

#[test]
fn transport_failure_is_reported() {
    let transport = RecordingTransport {
        failing: [addr(2)].into_iter().collect(),
        ..RecordingTransport::root(vec![addr(2)])
    };
    let (sender, metrics) = sender(transport);

    assert!(matches!(
        sender.send_to_child(&addr(2), DataType::CONTROL, &[9]),
        Err(MeshError::Transport(_))
    ));
    assert_eq!(metrics.snapshot().send_failures, 1);
}

// ---- fan-out ----

#[test]
fn broadcast_tolerates_partial_failure() {
    let transport = RecordingTransport {
        failing: [addr(3)].into_iter().collect(),
        ..RecordingTransport::root(vec![addr(2), addr(3), addr(4)])
    };
    let (sender, metrics) = sender(transport);

    let report = sender.broadcast(DataType::CONFIG, &[0xAA, 0xBB]).unwrap();
    assert_eq!(report.attempted, 3);
    assert_eq!(report.delivered, vec![addr(2), addr(4)]);
    assert_eq!(report.failed, vec![addr(3)]);
    assert!(!report.is_complete());

    // every recipient was attempted with the same frame
    let sent = sender.transport().sent();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|(_, frame, dir)| {
        frame == &[0x04, 0x02, 0x00, 0x00, 0xAA, 0xBB] && *dir == Direction::FromRoot
    }));

    let snap = metrics.snapshot();
    assert_eq!(snap.frames_sent, 2);
    assert_eq!(snap.send_failures, 1);
}

#[test]
fn broadcast_with_empty_routing_table_succeeds() {
    let (sender, _) = sender(RecordingTransport::root(vec![]));

    let report = sender.broadcast(DataType::STATUS, &[1]).unwrap();
    assert_eq!(report.attempted, 0);
    assert_eq!(report.delivered_count(), 0);
    assert!(sender.transport().sent().is_empty());
}

#[test]
fn broadcast_fails_when_every_send_fails() {
    let routes = vec![addr(2), addr(3)];
    let transport = RecordingTransport {
        failing: routes.iter().copied().collect(),
        ..RecordingTransport::root(routes)
    };
    let (sender, _) = sender(transport);

    assert!(matches!(
        sender.broadcast(DataType::CONTROL, &[1]),
        Err(MeshError::FanOutFailed { attempted: 2 })
    ));
    assert_eq!(sender.transport().sent().len(), 2);
}

// ---- resolver ----

#[test]
fn node_id_resolves_to_stored_address() {
    let (sender, _) = sender(RecordingTransport::root(vec![]));
    let registry = NodeRegistry::new(4);
    registry
        .register(2, addr(0x42), NodeType::ACTUATOR, "Actuator_2")
        .unwrap();

    sender
        .send_to_node_id(&registry, 2, DataType::CONTROL, &[0x01, 0x02, 0x03])
        .unwrap();

    let sent = sender.transport().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, Some(addr(0x42)));
    assert_eq!(sent[0].1, vec![0x02, 0x03, 0x00, 0x00, 0x01, 0x02, 0x03]);
}

#[test]
fn unknown_node_id_never_reaches_transport() {
    let (sender, _) = sender(RecordingTransport::root(vec![addr(2)]));
    let registry = NodeRegistry::new(4);

    assert!(matches!(
        sender.send_to_node_id(&registry, 9, DataType::CONTROL, &[1]),
        Err(MeshError::NodeNotFound(9))
    ));
    assert!(sender.transport().sent().is_empty());
}

#[test]
fn node_id_send_is_root_only() {
    let (sender, _) = sender(RecordingTransport::child());
    let registry = NodeRegistry::new(4);
    registry
        .register(2, addr(2), NodeType::SENSOR, "s")
        .unwrap();

    assert!(matches!(
        sender.send_to_node_id(&registry, 2, DataType::CONTROL, &[1]),
        Err(MeshError::RoleViolation(constants::ERR_NOT_ROOT))
    ));
    assert!(sender.transport().sent().is_empty());
}

// ---- receive path ----

fn context(transport: RecordingTransport) -> ReceiveContext<RecordingTransport> {
    ReceiveContext {
        transport: Arc::new(transport),
        dispatcher: Arc::new(Dispatcher::new()),
        registry: Arc::new(NodeRegistry::new(4)),
        metrics: Arc::new(LinkMetrics::new()),
        config: ReceiveConfig::default(),
        auto_register_identities: true,
    }
}

#[test]
fn valid_frame_reaches_callback() {
    let ctx = context(RecordingTransport::child());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    ctx.dispatcher
        .register(move |from, data_type, payload| {
            sink.lock().unwrap().push((*from, data_type, payload.to_vec()));
        })
        .unwrap();

    ctx.handle_frame(
        addr(1),
        &[0x01, 0x04, 0x00, 0x00, 0x12, 0x34, 0x56, 0x78],
        Direction::FromRoot.flag(),
    );

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![(addr(1), DataType::SENSOR, vec![0x12, 0x34, 0x56, 0x78])]
    );
    assert_eq!(ctx.metrics.snapshot().frames_received, 1);
}

#[test]
fn malformed_frames_are_dropped() {
    let ctx = context(RecordingTransport::child());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    ctx.dispatcher
        .register(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    // shorter than the header
    ctx.handle_frame(addr(1), &[0x01, 0x02, 0x00], 0);
    // declares 4 payload bytes, carries 3
    ctx.handle_frame(addr(1), &[0x01, 0x04, 0x00, 0x00, 1, 2, 3], 0);
    // declares 2 payload bytes, carries 3
    ctx.handle_frame(addr(1), &[0x01, 0x02, 0x00, 0x00, 1, 2, 3], 0);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let snap = ctx.metrics.snapshot();
    assert_eq!(snap.frames_malformed, 3);
    assert_eq!(snap.frames_received, 0);
}

#[test]
fn frame_without_callback_is_counted_unhandled() {
    let ctx = context(RecordingTransport::child());
    ctx.handle_frame(addr(1), &[0x03, 0x01, 0x00, 0x00, 0x07], 0);

    let snap = ctx.metrics.snapshot();
    assert_eq!(snap.frames_received, 1);
    assert_eq!(snap.frames_unhandled, 1);
}

#[test]
fn root_registers_announced_identity() {
    let ctx = context(RecordingTransport::root(vec![]));
    let identity = NodeIdentity::new(5, NodeType::SENSOR, "Sensor_5").unwrap();
    let frame = packet::encode(DataType::CONFIG, &identity.to_bytes()).unwrap();

    ctx.handle_frame(addr(0x55), &frame, Direction::ToRoot.flag());

    let node = ctx.registry.lookup(5).unwrap();
    assert_eq!(node.address, addr(0x55));
    assert_eq!(node.node_type, NodeType::SENSOR);
    assert_eq!(node.name, "Sensor_5");
    assert_eq!(ctx.metrics.snapshot().identities_registered, 1);
}

#[test]
fn child_ignores_identity_records() {
    let ctx = context(RecordingTransport::child());
    let identity = NodeIdentity::new(5, NodeType::SENSOR, "Sensor_5").unwrap();
    let frame = packet::encode(DataType::CONFIG, &identity.to_bytes()).unwrap();

    ctx.handle_frame(addr(1), &frame, Direction::FromRoot.flag());

    assert_eq!(ctx.registry.count().unwrap(), 0);
}

#[test]
fn auto_registration_can_be_disabled() {
    let mut ctx = context(RecordingTransport::root(vec![]));
    ctx.auto_register_identities = false;
    let identity = NodeIdentity::new(5, NodeType::SENSOR, "Sensor_5").unwrap();
    let frame = packet::encode(DataType::CONFIG, &identity.to_bytes()).unwrap();

    ctx.handle_frame(addr(0x55), &frame, Direction::ToRoot.flag());

    assert!(ctx.registry.is_empty().unwrap());
}

#[test]
fn non_utf8_identity_is_not_registered() {
    let ctx = context(RecordingTransport::root(vec![]));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    ctx.dispatcher
        .register(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    let mut record = [0u8; 18];
    record[0] = 7;
    record[1] = NodeType::SENSOR.raw();
    record[2..10].fill(0xFF);
    let frame = packet::encode(DataType::CONFIG, &record).unwrap();

    ctx.handle_frame(addr(0x77), &frame, Direction::ToRoot.flag());

    assert!(ctx.registry.is_empty().unwrap());
    assert_eq!(ctx.metrics.snapshot().identities_registered, 0);
    // the payload still reaches the application
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Replays scripted frames, each with the length the transport reports.
struct ScriptedReceiver {
    frames: VecDeque<(Vec<u8>, usize)>,
}

impl FrameReceiver for ScriptedReceiver {
    async fn recv(&mut self, buf: &mut [u8]) -> Result<ReceivedFrame> {
        let Some((bytes, reported)) = self.frames.pop_front() else {
            return std::future::pending().await;
        };
        let n = bytes.len().min(buf.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        Ok(ReceivedFrame {
            from: addr(1),
            len: reported,
            flag: Direction::FromRoot.flag(),
        })
    }
}

#[tokio::test]
async fn overlong_reported_frame_is_a_receive_error() {
    let mut ctx = context(RecordingTransport::child());
    ctx.config = ReceiveConfig {
        rx_buffer_size: 16,
        error_backoff: Duration::from_millis(1),
    };
    let metrics = ctx.metrics.clone();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    ctx.dispatcher
        .register(move |_, _, payload| sink.lock().unwrap().push(payload.to_vec()))
        .unwrap();

    let valid = packet::encode(DataType::SENSOR, &[0x2A]).unwrap();
    let receiver = ScriptedReceiver {
        frames: VecDeque::from(vec![(valid.clone(), 64), (valid.clone(), valid.len())]),
    };
    let task = ReceiveTask::spawn(ctx, receiver).unwrap();

    tokio::time::timeout(Duration::from_secs(2), async {
        while metrics.snapshot().frames_received == 0 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .expect("valid frame not delivered");

    let snap = metrics.snapshot();
    assert_eq!(snap.receive_errors, 1);
    assert_eq!(snap.frames_malformed, 0);
    assert_eq!(*seen.lock().unwrap(), vec![vec![0x2A]]);

    task.stop().await.unwrap();
}
