use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::node::address::NodeAddr;
use crate::node::finger_table::FingerTable;
use crate::node::{request_addr, Node};
use crate::protocol::{send_request, Request};
use crate::threads::{fix_fingers, stabilize, successor_list, tcp_service};
use crate::utils::crypto::{belongs, forward_distance, ith_step, KEYSPACE, NUM_BITS};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("peer {0} is unreachable during join")]
    JoinPeerUnreachable(NodeAddr),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: NodeAddr,
        source: std::io::Error,
    },
}

/// Starts the first node of a new ring. Every pointer refers to the
/// node itself and the store is seeded with the given filenames.
pub async fn bootstrap(addr: NodeAddr, files: Vec<String>) -> Result<Arc<Node>, StartupError> {
    let node = Node::new(addr);
    info!("Starting a new ring at {} with key {}", node.addr(), node.key());

    node.seed_files(files);
    start_server(&node).await?;
    node.init_successor_list().await;
    start_maintenance(&node);
    Ok(node)
}

/// Places a new node in an existing ring through `helper`, a node
/// already in it: resolve the successor, adopt its predecessor,
/// announce, refine the finger table, claim the keys this node now
/// owns, then start maintenance.
pub async fn join(addr: NodeAddr, helper: NodeAddr) -> Result<Arc<Node>, StartupError> {
    let node = Node::new(addr);
    info!(
        "Joining the ring via {} as {} with key {}",
        helper,
        node.addr(),
        node.key()
    );

    let successor = request_addr(&helper, &Request::FindSuccessor(node.key()))
        .await
        .ok_or_else(|| StartupError::JoinPeerUnreachable(helper.clone()))?;
    node.fill_fingers(&successor);

    let predecessor = request_addr(&successor, &Request::YourPredecessor)
        .await
        .ok_or_else(|| StartupError::JoinPeerUnreachable(successor.clone()))?;
    node.change_predecessor(predecessor);

    send_request(&successor, &Request::Notify(node.addr().clone())).await;

    // The server must answer before the finger table is refined: the
    // successor's stabilization is already probing this node, and
    // silence would read as a failure.
    start_server(&node).await?;

    init_finger_table(&node, &helper).await;
    update_others(&node).await;
    pull_keys(&node).await;

    node.init_successor_list().await;
    start_maintenance(&node);
    Ok(node)
}

async fn start_server(node: &Arc<Node>) -> Result<(), StartupError> {
    let listener = TcpListener::bind(node.addr().socket_addr())
        .await
        .map_err(|source| StartupError::Bind {
            addr: node.addr().clone(),
            source,
        })?;
    tokio::spawn(tcp_service::serve(node.clone(), listener));
    Ok(())
}

fn start_maintenance(node: &Arc<Node>) {
    tokio::spawn(stabilize::stabilize_periodically(node.clone()));
    tokio::spawn(fix_fingers::fix_fingers_periodically(node.clone()));
    tokio::spawn(successor_list::maintain_successors_periodically(node.clone()));
}

/// Refines the placeholder fingers left by the join. When the
/// previous finger already covers the i-th start there is no node
/// between the two starts, so the entry is copied without a lookup;
/// otherwise the helper resolves it.
async fn init_finger_table(node: &Arc<Node>, helper: &NodeAddr) {
    for i in 1..NUM_BITS {
        let last = node.finger(i - 1);
        let last_start = FingerTable::start(node.key(), i - 1);
        let this_start = FingerTable::start(node.key(), i);

        if !belongs(last_start, true, this_start, false, last.key) {
            node.set_finger(i, last.addr);
        } else {
            match request_addr(helper, &Request::FindSuccessor(this_start)).await {
                Some(finger) => node.set_finger(i, finger),
                None => warn!(
                    "Helper could not resolve the successor of {}, leaving finger {} on its placeholder",
                    this_start, i
                ),
            }
        }
    }
}

/// Announces this node to every peer whose finger table should now
/// point at it: for each i, the node `2^i` before this one (or its
/// successor, when that successor sits at exactly the i-th distance)
/// receives an `UpdateithFinger` that propagates backwards on its
/// own.
async fn update_others(node: &Arc<Node>) {
    for i in 0..NUM_BITS {
        let required_key = (node.key() + KEYSPACE - ith_step(i)) % KEYSPACE;

        let predecessor = node.find_predecessor(required_key).await;
        let successor = if predecessor == *node.addr() {
            node.successor()
        } else {
            match request_addr(&predecessor, &Request::YourSuccessor).await {
                Some(successor) => successor,
                None => {
                    warn!(
                        "Skipping finger announcement {}: {} is unreachable",
                        i, predecessor
                    );
                    continue;
                }
            }
        };

        let target = if forward_distance(successor.key(), node.key()) == ith_step(i) {
            successor
        } else {
            predecessor
        };
        send_request(&target, &Request::UpdateIthFinger(i, node.addr().clone())).await;
    }
}

/// Claims the arc `(predecessor, this node]` from the successor. An
/// empty response means no file moved.
async fn pull_keys(node: &Arc<Node>) {
    let successor = node.successor();
    let predecessor = node.predecessor();

    let request = Request::TransferKeys(node.key(), predecessor.key());
    match send_request(&successor, &request).await {
        Some(response) => {
            let files: Vec<String> = response
                .split(':')
                .filter(|filename| !filename.is_empty())
                .map(str::to_string)
                .collect();
            info!("Claimed {} files from successor {}", files.len(), successor);
            node.seed_files(files);
        }
        None => warn!("Successor {} is unreachable, no keys were handed off", successor),
    }
}
