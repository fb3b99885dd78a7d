use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use rand::Rng;
use tokio::time::sleep;

use crate::node::{request_addr, Node};
use crate::protocol::Request;
use crate::utils::constants::{MAINTENANCE_SLEEP_MILLIS, SUCCESSOR_COUNT};

/// Checks one random backup successor per iteration: a live entry
/// refreshes the slot after it, a dead one is shifted out. A dead
/// head is left alone here; stabilization repairs it through
/// `next_successor`.
pub async fn maintain_successors_periodically(node: Arc<Node>) {
    info!("Starting up periodic successor list maintenance task");
    while node.is_active() {
        let index = rand::thread_rng().gen_range(0..SUCCESSOR_COUNT);
        let scrutinized = node.successor_at(index);
        match request_addr(&scrutinized, &Request::YourSuccessor).await {
            Some(next) => node.set_successor(index + 1, next),
            None if index != 0 => {
                debug!("Backup successor {} is unreachable, closing the gap", scrutinized);
                node.shift_successors(index);
            }
            None => {}
        }

        sleep(Duration::from_millis(MAINTENANCE_SLEEP_MILLIS)).await;
    }
    info!("Successor list maintenance task on {} has stopped", node.addr());
}
