//! Example: Node Registry and Id-Based Addressing
//!
//! Builds a root and three children on an in-memory mesh. Each child
//! announces its identity, the root lists what it learned, then addresses
//! the actuator by its logical id and broadcasts a status frame.
//!
//! Run with: `cargo run --example node_registry`

#![allow(clippy::uninlined_format_args)]

use std::time::Duration;

use mesh_link::config::MeshConfig;
use mesh_link::transport::memory::{MemoryMesh, MemoryNode};
use mesh_link::utils::logging;
use mesh_link::{DataType, MeshAddr, MeshLink, NodeIdentity, NodeType};

const ROOT: MeshAddr = MeshAddr::new([0x24, 0x0A, 0xC4, 0x00, 0x00, 0x01]);

fn child(
    mesh: &MemoryMesh,
    addr: MeshAddr,
    config: &MeshConfig,
) -> Result<MeshLink<MemoryNode>, Box<dyn std::error::Error>> {
    let (node, rx) = mesh.join(addr);
    let mut link = MeshLink::new(node, config.clone())?;
    link.register_receive_callback(move |from, data_type, payload| {
        println!(
            "   [{}] {} from {}: {:02X?}",
            addr, data_type, from, payload
        );
    })?;
    link.start(rx)?;
    Ok(link)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = MeshConfig::from_env()?;
    logging::init(&config.logging)?;

    println!("=== Mesh Node Registry Demo ===\n");

    let mesh = MemoryMesh::new();
    let (root_node, root_rx) = mesh.join(ROOT);
    mesh.set_root(ROOT);

    let mut root = MeshLink::new(root_node, config.clone())?;
    root.register_receive_callback(|from, data_type, payload| {
        if data_type == DataType::SENSOR {
            println!("   [root] sensor reading from {}: {:02X?}", from, payload);
        }
    })?;
    root.start(root_rx)?;

    let nodes = [
        (1u8, NodeType::SENSOR, "Sensor_1"),
        (2u8, NodeType::ACTUATOR, "Actuator_2"),
        (3u8, NodeType::SENSOR, "Sensor_3"),
    ];

    // 1. Children join and announce themselves
    println!("1. ANNOUNCE");
    let mut children = Vec::new();
    for (id, node_type, name) in nodes {
        let addr = MeshAddr::new([0x24, 0x0A, 0xC4, 0x00, 0x01, id]);
        let link = child(&mesh, addr, &config)?;
        link.announce_identity(&NodeIdentity::new(id, node_type, name)?)?;
        println!("   {} announced as node {} ({})", addr, id, node_type);
        children.push(link);
    }

    tokio::time::timeout(Duration::from_secs(1), async {
        while root.registered_node_count().unwrap_or(0) < nodes.len() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;

    // 2. Root enumerates the registry
    println!("\n2. REGISTRY ({} nodes)", root.registered_node_count()?);
    for i in 0..root.registered_node_count()? {
        let node = root.registered_node(i)?;
        println!(
            "   #{} id={} type={} name={} addr={}",
            i, node.node_id, node.node_type, node.name, node.address
        );
    }

    // 3. Address the actuator by id rather than by MAC
    println!("\n3. CONTROL node 2");
    root.send_to_node_id(2, DataType::CONTROL, &[0x01, 0x02, 0x03])?;

    // 4. Fan out a status frame to every child
    println!("\n4. BROADCAST");
    let report = root.broadcast_from_root(DataType::STATUS, b"ok")?;
    println!(
        "   delivered to {}/{} children",
        report.delivered_count(),
        report.attempted
    );

    // 5. Sensors report upstream
    println!("\n5. SENSOR DATA");
    children[0].send_to_root(DataType::SENSOR, &[0x12, 0x34, 0x56, 0x78])?;

    tokio::time::sleep(Duration::from_millis(50)).await;

    for link in &mut children {
        link.shutdown().await?;
    }
    root.log_metrics();
    root.shutdown().await?;

    println!("\n=== Done ===");
    Ok(())
}
