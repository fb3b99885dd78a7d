use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::time::sleep;

use crate::node::{request_addr, Node};
use crate::protocol::{send_request, Request};
use crate::utils::constants::MAINTENANCE_SLEEP_MILLIS;
use crate::utils::crypto::belongs;

/// Repairs the successor pointer and keeps the successor informed of
/// this node. Once successor pointers are right, lookups eventually
/// become right everywhere.
pub async fn stabilize_periodically(node: Arc<Node>) {
    info!("Starting up periodic stabilization task");
    while node.is_active() {
        let successor = node.successor();
        match request_addr(&successor, &Request::YourPredecessor).await {
            None => {
                // The successor is gone; promote the first backup.
                let next = node.next_successor();
                debug!("Successor {} is unreachable, falling back to {}", successor, next);
                node.change_successor(next);
            }
            Some(candidate) => {
                let current = node.successor();
                if belongs(node.key(), false, current.key(), false, candidate.key()) {
                    debug!("Adopting {} as successor", candidate);
                    node.adopt_successor(candidate);
                }
            }
        }

        send_request(&node.successor(), &Request::Notify(node.addr().clone())).await;

        sleep(Duration::from_millis(MAINTENANCE_SLEEP_MILLIS)).await;
    }
    info!("Stabilization task on {} has stopped", node.addr());
}
