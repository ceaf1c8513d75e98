//! # Node Registry
//!
//! Root-side table of known nodes, keyed by logical node id.
//!
//! The table is bounded. Registering a new id when it is full fails with
//! [`MeshError::RegistryFull`]; nothing is ever evicted, so an address that
//! was resolvable stays resolvable until [`NodeRegistry::clear_all`].
//! Re-registering a known id updates its slot in place.
//!
//! A single mutex guards the whole table. Entries are handed out as clones so
//! no lock is held while callers use them.

use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::core::address::MeshAddr;
use crate::core::identity::{validate_name, validate_node_id, NodeIdentity, NodeType};
use crate::error::{constants, MeshError, Result};

/// A node as the root knows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredNode {
    pub node_id: u8,
    pub address: MeshAddr,
    pub node_type: NodeType,
    pub name: String,
    pub is_active: bool,
    pub last_seen: Instant,
}

/// Whether a registration created a slot or refreshed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Inserted,
    Updated,
}

/// Bounded, insertion-ordered table of registered nodes.
#[derive(Debug)]
pub struct NodeRegistry {
    capacity: usize,
    nodes: Mutex<Vec<RegisteredNode>>,
}

impl NodeRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            nodes: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn table(&self) -> Result<MutexGuard<'_, Vec<RegisteredNode>>> {
        self.nodes
            .lock()
            .map_err(|_| MeshError::LockPoisoned(constants::ERR_REGISTRY_LOCK))
    }

    /// Insert `node_id`, or overwrite its address, type, name and timestamp.
    pub fn register(
        &self,
        node_id: u8,
        address: MeshAddr,
        node_type: NodeType,
        name: &str,
    ) -> Result<Registration> {
        validate_node_id(node_id)?;
        validate_name(name)?;

        let mut nodes = self.table()?;
        let now = Instant::now();

        if let Some(node) = nodes.iter_mut().find(|n| n.node_id == node_id) {
            if node.address != address {
                info!(node_id, old = %node.address, new = %address, "Node address changed");
            }
            node.address = address;
            node.node_type = node_type;
            node.name.clear();
            node.name.push_str(name);
            node.is_active = true;
            node.last_seen = now;
            debug!(node_id, %address, "Registry entry refreshed");
            return Ok(Registration::Updated);
        }

        if nodes.len() >= self.capacity {
            warn!(node_id, capacity = self.capacity, "Registry full, rejecting node");
            return Err(MeshError::RegistryFull {
                capacity: self.capacity,
            });
        }

        nodes.push(RegisteredNode {
            node_id,
            address,
            node_type,
            name: name.to_owned(),
            is_active: true,
            last_seen: now,
        });
        info!(node_id, %address, %node_type, node_name = name, count = nodes.len(), "Node registered");
        Ok(Registration::Inserted)
    }

    /// Register from an announced identity heard from `address`.
    pub fn register_identity(
        &self,
        identity: &NodeIdentity,
        address: MeshAddr,
    ) -> Result<Registration> {
        self.register(
            identity.node_id(),
            address,
            identity.node_type(),
            identity.name(),
        )
    }

    pub fn lookup(&self, node_id: u8) -> Result<RegisteredNode> {
        validate_node_id(node_id)?;
        self.table()?
            .iter()
            .find(|n| n.node_id == node_id)
            .cloned()
            .ok_or(MeshError::NodeNotFound(node_id))
    }

    /// Address currently stored for `node_id`.
    pub fn resolve(&self, node_id: u8) -> Result<MeshAddr> {
        validate_node_id(node_id)?;
        self.table()?
            .iter()
            .find(|n| n.node_id == node_id)
            .map(|n| n.address)
            .ok_or(MeshError::NodeNotFound(node_id))
    }

    pub fn count(&self) -> Result<usize> {
        Ok(self.table()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.table()?.is_empty())
    }

    /// Entry at `index` in insertion order.
    pub fn get_by_index(&self, index: usize) -> Result<RegisteredNode> {
        let nodes = self.table()?;
        nodes
            .get(index)
            .cloned()
            .ok_or(MeshError::IndexOutOfRange {
                index,
                count: nodes.len(),
            })
    }

    /// Copy of every entry in insertion order, taken under one lock.
    pub fn snapshot(&self) -> Result<Vec<RegisteredNode>> {
        Ok(self.table()?.clone())
    }

    /// Remove every entry. Returns how many were dropped.
    pub fn clear_all(&self) -> Result<usize> {
        let mut nodes = self.table()?;
        let removed = nodes.len();
        nodes.clear();
        info!(removed, "Registry cleared");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(last: u8) -> MeshAddr {
        MeshAddr::new([0x24, 0x0A, 0xC4, 0x00, 0x00, last])
    }

    #[test]
    fn insert_then_lookup() {
        let registry = NodeRegistry::new(4);
        let outcome = registry
            .register(7, addr(7), NodeType::SENSOR, "sensor_7")
            .unwrap();
        assert_eq!(outcome, Registration::Inserted);

        let node = registry.lookup(7).unwrap();
        assert_eq!(node.address, addr(7));
        assert_eq!(node.name, "sensor_7");
        assert!(node.is_active);
        assert_eq!(registry.resolve(7).unwrap(), addr(7));
    }

    #[test]
    fn reregistration_updates_in_place() {
        let registry = NodeRegistry::new(4);
        registry.register(2, addr(1), NodeType::SENSOR, "old").unwrap();
        registry.register(3, addr(3), NodeType::SENSOR, "other").unwrap();
        let first_seen = registry.lookup(2).unwrap().last_seen;

        let outcome = registry
            .register(2, addr(9), NodeType::ACTUATOR, "new")
            .unwrap();
        assert_eq!(outcome, Registration::Updated);
        assert_eq!(registry.count().unwrap(), 2);

        let node = registry.get_by_index(0).unwrap();
        assert_eq!(node.node_id, 2);
        assert_eq!(node.address, addr(9));
        assert_eq!(node.node_type, NodeType::ACTUATOR);
        assert_eq!(node.name, "new");
        assert!(node.last_seen >= first_seen);
    }

    #[test]
    fn full_table_rejects_new_ids_but_updates_known_ones() {
        let registry = NodeRegistry::new(2);
        registry.register(1, addr(1), NodeType::SENSOR, "a").unwrap();
        registry.register(2, addr(2), NodeType::SENSOR, "b").unwrap();

        let err = registry
            .register(3, addr(3), NodeType::SENSOR, "c")
            .unwrap_err();
        assert!(matches!(err, MeshError::RegistryFull { capacity: 2 }));
        assert_eq!(registry.count().unwrap(), 2);
        assert!(matches!(registry.lookup(3), Err(MeshError::NodeNotFound(3))));

        registry.register(1, addr(5), NodeType::SENSOR, "a2").unwrap();
        assert_eq!(registry.resolve(1).unwrap(), addr(5));
    }

    #[test]
    fn node_id_zero_rejected_everywhere() {
        let registry = NodeRegistry::new(2);
        assert!(matches!(
            registry.register(0, addr(0), NodeType::SENSOR, "z"),
            Err(MeshError::InvalidArgument(_))
        ));
        assert!(matches!(registry.lookup(0), Err(MeshError::InvalidArgument(_))));
        assert!(matches!(registry.resolve(0), Err(MeshError::InvalidArgument(_))));
        assert_eq!(registry.count().unwrap(), 0);
    }

    #[test]
    fn index_enumeration_and_clear() {
        let registry = NodeRegistry::new(8);
        for id in [5u8, 1, 3] {
            registry
                .register(id, addr(id), NodeType::SENSOR, "n")
                .unwrap();
        }
        let order: Vec<u8> = (0..registry.count().unwrap())
            .map(|i| registry.get_by_index(i).unwrap().node_id)
            .collect();
        assert_eq!(order, vec![5, 1, 3]);
        assert!(matches!(
            registry.get_by_index(3),
            Err(MeshError::IndexOutOfRange { index: 3, count: 3 })
        ));

        assert_eq!(registry.clear_all().unwrap(), 3);
        assert!(registry.is_empty().unwrap());
        assert!(registry.snapshot().unwrap().is_empty());
    }

    #[test]
    fn identity_registration_uses_given_address() {
        let registry = NodeRegistry::new(2);
        let identity = NodeIdentity::new(4, NodeType::GATEWAY, "gw").unwrap();
        registry.register_identity(&identity, addr(44)).unwrap();
        let node = registry.lookup(4).unwrap();
        assert_eq!(node.address, addr(44));
        assert_eq!(node.node_type, NodeType::GATEWAY);
    }
}
