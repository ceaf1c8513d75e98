//! In-process mesh over tokio channels.
//!
//! One [`MemoryMesh`] is the shared medium. Each node that joins gets a
//! [`MemoryNode`] (send side) and a [`MemoryReceiver`] (receive side). The
//! mesh tracks which node is root and which nodes are active, and can be told
//! to fail deliveries to particular addresses.
//!
//! ```rust
//! use mesh_link::core::address::MeshAddr;
//! use mesh_link::transport::memory::MemoryMesh;
//! use mesh_link::transport::MeshTransport;
//!
//! let mesh = MemoryMesh::new();
//! let root = MeshAddr::new([0, 0, 0, 0, 0, 1]);
//! let (node, _rx) = mesh.join(root);
//! mesh.set_root(root);
//! assert!(node.is_root());
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::core::address::MeshAddr;
use crate::error::{MeshError, Result};
use crate::transport::{Direction, FrameReceiver, MeshTransport, ReceivedFrame};

const ERR_MESH_LOCK: &str = "Failed to acquire memory mesh lock";

/// One queued frame.
#[derive(Debug, Clone)]
struct Delivery {
    from: MeshAddr,
    frame: Bytes,
    flag: u32,
}

struct Station {
    inbox: mpsc::UnboundedSender<Delivery>,
    active: bool,
    failing: bool,
}

#[derive(Default)]
struct MeshState {
    root: Option<MeshAddr>,
    stations: HashMap<MeshAddr, Station>,
    join_order: Vec<MeshAddr>,
    sends_attempted: usize,
}

/// Shared in-memory medium.
#[derive(Clone, Default)]
pub struct MemoryMesh {
    state: Arc<Mutex<MeshState>>,
}

impl MemoryMesh {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MeshState>> {
        lock(&self.state)
    }

    /// Attach a station. Joining an address twice replaces its inbox.
    pub fn join(&self, addr: MeshAddr) -> (MemoryNode, MemoryReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        if let Ok(mut state) = self.state() {
            let station = Station {
                inbox: tx,
                active: true,
                failing: false,
            };
            if state.stations.insert(addr, station).is_none() {
                state.join_order.push(addr);
            }
        }
        debug!(%addr, "Station joined memory mesh");

        (
            MemoryNode {
                addr,
                state: self.state.clone(),
            },
            MemoryReceiver {
                inbox: rx,
                _state: self.state.clone(),
            },
        )
    }

    pub fn set_root(&self, addr: MeshAddr) {
        if let Ok(mut state) = self.state() {
            state.root = Some(addr);
        }
    }

    pub fn set_active(&self, addr: MeshAddr, active: bool) {
        if let Ok(mut state) = self.state() {
            if let Some(station) = state.stations.get_mut(&addr) {
                station.active = active;
            }
        }
    }

    /// Make every delivery to `addr` fail until cleared.
    pub fn fail_deliveries_to(&self, addr: MeshAddr, failing: bool) {
        if let Ok(mut state) = self.state() {
            if let Some(station) = state.stations.get_mut(&addr) {
                station.failing = failing;
            }
        }
    }

    /// Drop raw bytes into a station's inbox, bypassing any framing.
    pub fn inject(&self, to: MeshAddr, from: MeshAddr, frame: impl Into<Bytes>) -> Result<()> {
        let state = self.state()?;
        let station = state
            .stations
            .get(&to)
            .ok_or_else(|| MeshError::Transport(format!("no station {to}")))?;
        station
            .inbox
            .send(Delivery {
                from,
                frame: frame.into(),
                flag: Direction::FromRoot.flag(),
            })
            .map_err(|_| MeshError::Transport(format!("station {to} stopped receiving")))
    }

    /// Total send attempts made through any node, successful or not.
    pub fn sends_attempted(&self) -> usize {
        self.state().map(|s| s.sends_attempted).unwrap_or(0)
    }
}

fn lock(state: &Mutex<MeshState>) -> Result<MutexGuard<'_, MeshState>> {
    state
        .lock()
        .map_err(|_| MeshError::LockPoisoned(ERR_MESH_LOCK))
}

/// Send side of one station.
#[derive(Clone)]
pub struct MemoryNode {
    addr: MeshAddr,
    state: Arc<Mutex<MeshState>>,
}

impl MemoryNode {
    pub fn addr(&self) -> MeshAddr {
        self.addr
    }
}

impl MeshTransport for MemoryNode {
    fn send(&self, dest: Option<&MeshAddr>, frame: &[u8], direction: Direction) -> Result<()> {
        let mut state = lock(&self.state)?;
        state.sends_attempted += 1;

        let target = match dest {
            Some(addr) => *addr,
            None => state
                .root
                .ok_or_else(|| MeshError::Transport("mesh has no root".to_string()))?,
        };

        let station = state
            .stations
            .get(&target)
            .ok_or_else(|| MeshError::Transport(format!("{target} unreachable")))?;
        if station.failing || !station.active {
            return Err(MeshError::Transport(format!("delivery to {target} failed")));
        }

        station
            .inbox
            .send(Delivery {
                from: self.addr,
                frame: Bytes::copy_from_slice(frame),
                flag: direction.flag(),
            })
            .map_err(|_| MeshError::Transport(format!("{target} stopped receiving")))?;

        trace!(from = %self.addr, to = %target, bytes = frame.len(), "Frame queued");
        Ok(())
    }

    fn routing_table(&self) -> Result<Vec<MeshAddr>> {
        let state = lock(&self.state)?;
        Ok(state
            .join_order
            .iter()
            .copied()
            .filter(|addr| *addr != self.addr && Some(*addr) != state.root)
            .collect())
    }

    fn is_active(&self) -> bool {
        lock(&self.state)
            .ok()
            .and_then(|s| s.stations.get(&self.addr).map(|st| st.active))
            .unwrap_or(false)
    }

    fn is_root(&self) -> bool {
        lock(&self.state)
            .map(|s| s.root == Some(self.addr))
            .unwrap_or(false)
    }
}

/// Receive side of one station.
pub struct MemoryReceiver {
    inbox: mpsc::UnboundedReceiver<Delivery>,
    // keeps the station's sender alive so the inbox never reports closed
    _state: Arc<Mutex<MeshState>>,
}

impl FrameReceiver for MemoryReceiver {
    async fn recv(&mut self, buf: &mut [u8]) -> Result<ReceivedFrame> {
        let delivery = self
            .inbox
            .recv()
            .await
            .ok_or_else(|| MeshError::Transport("station inbox closed".to_string()))?;

        let len = delivery.frame.len();
        if len > buf.len() {
            return Err(MeshError::Transport(format!(
                "frame of {len} bytes exceeds {} byte receive buffer",
                buf.len()
            )));
        }
        buf[..len].copy_from_slice(&delivery.frame);

        Ok(ReceivedFrame {
            from: delivery.from,
            len,
            flag: delivery.flag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> MeshAddr {
        MeshAddr::new([0x02, 0, 0, 0, 0, last])
    }

    #[tokio::test]
    async fn upstream_reaches_root() {
        let mesh = MemoryMesh::new();
        let (_root, mut root_rx) = mesh.join(addr(1));
        let (child, _child_rx) = mesh.join(addr(2));
        mesh.set_root(addr(1));

        child.send(None, &[1, 2, 3], Direction::ToRoot).unwrap();

        let mut buf = [0u8; 16];
        let frame = root_rx.recv(&mut buf).await.unwrap();
        assert_eq!(frame.from, addr(2));
        assert_eq!(frame.len, 3);
        assert_eq!(frame.flag, Direction::ToRoot.flag());
        assert_eq!(&buf[..3], &[1, 2, 3]);
    }

    #[test]
    fn routing_table_excludes_root() {
        let mesh = MemoryMesh::new();
        let (root, _a) = mesh.join(addr(1));
        let (_c1, _b) = mesh.join(addr(2));
        let (_c2, _c) = mesh.join(addr(3));
        mesh.set_root(addr(1));

        assert!(root.is_root());
        assert_eq!(root.routing_table().unwrap(), vec![addr(2), addr(3)]);
    }

    #[test]
    fn failing_station_rejects_delivery() {
        let mesh = MemoryMesh::new();
        let (root, _a) = mesh.join(addr(1));
        let (_child, _b) = mesh.join(addr(2));
        mesh.set_root(addr(1));
        mesh.fail_deliveries_to(addr(2), true);

        assert!(root
            .send(Some(&addr(2)), &[0], Direction::FromRoot)
            .is_err());
        assert_eq!(mesh.sends_attempted(), 1);
    }

    #[tokio::test]
    async fn oversized_frame_reported() {
        let mesh = MemoryMesh::new();
        let (_node, mut rx) = mesh.join(addr(1));
        mesh.inject(addr(1), addr(9), vec![0u8; 32]).unwrap();

        let mut buf = [0u8; 8];
        assert!(matches!(
            rx.recv(&mut buf).await,
            Err(MeshError::Transport(_))
        ));
    }
}
