use std::collections::HashSet;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use log::LevelFilter;
use tokio::time::sleep;

use chord_node::join;
use chord_node::node::address::NodeAddr;
use chord_node::node::finger_table::FingerTable;
use chord_node::node::Node;
use chord_node::utils::crypto::{Key, KEYSPACE};

const BASE_PORT: u16 = 42700;
const SETTLE: Duration = Duration::from_secs(3);

/// Spins up an in-process ring and audits it: the successor chain
/// must follow key order, every successor list head must match the
/// successor pointer, and every finger must point at the node
/// actually responsible for its start.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new().env().with_level(LevelFilter::Warn).init()?;

    let count: usize = std::env::args()
        .nth(1)
        .map(|arg| arg.parse())
        .transpose()?
        .unwrap_or(8);

    let mut nodes: Vec<Arc<Node>> = Vec::new();
    let mut used_keys = HashSet::new();
    let mut port = BASE_PORT;

    while nodes.len() < count {
        let addr = NodeAddr::new("127.0.0.1", port)?;
        port += 1;
        // Two nodes cannot share a ring position; skip colliding ports.
        if !used_keys.insert(addr.key()) {
            continue;
        }
        let node = if nodes.is_empty() {
            join::bootstrap(addr, Vec::new()).await?
        } else {
            join::join(addr, nodes[0].addr().clone()).await?
        };
        println!("Started node {} with key {}", node.addr(), node.key());
        nodes.push(node);
        sleep(Duration::from_millis(200)).await;
    }

    sleep(SETTLE).await;

    let mut keys: Vec<Key> = nodes.iter().map(|node| node.key()).collect();
    keys.sort_unstable();

    let mut valid = true;

    for node in &nodes {
        let expected = responsible_key((node.key() + 1) % KEYSPACE, &keys);
        let successor = node.successor();
        if successor.key() != expected {
            eprintln!(
                "Node {} has the wrong successor {} (key {}), expected key {}",
                node.key(),
                successor,
                successor.key(),
                expected
            );
            valid = false;
        }
        if node.successors_snapshot()[0] != successor {
            eprintln!("Node {} has a successor list head out of step with its successor", node.key());
            valid = false;
        }

        for (i, finger) in node.fingers_snapshot().iter().enumerate() {
            let start = FingerTable::start(node.key(), i);
            let expected = responsible_key(start, &keys);
            if finger.key != expected {
                eprintln!(
                    "Node {} finger {} (start {}) points at key {}, expected key {}",
                    node.key(),
                    i,
                    start,
                    finger.key,
                    expected
                );
                valid = false;
            }
        }
    }

    for node in &nodes {
        node.stop();
    }

    if valid {
        println!("Looks good!");
        Ok(())
    } else {
        eprintln!("Ring is invalid!");
        std::process::exit(1);
    }
}

/// The key of the node responsible for `id`: the smallest live key
/// greater than or equal to it, wrapping to the smallest overall.
fn responsible_key(id: Key, sorted_keys: &[Key]) -> Key {
    *sorted_keys
        .iter()
        .find(|&&key| key >= id)
        .unwrap_or(&sorted_keys[0])
}
