use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use rand::Rng;
use tokio::time::sleep;

use crate::node::finger_table::FingerTable;
use crate::node::Node;
use crate::utils::constants::MAINTENANCE_SLEEP_MILLIS;
use crate::utils::crypto::NUM_BITS;

/// Re-resolves one random finger per iteration. Index 0 is excluded;
/// the successor pointer is stabilization's to repair.
pub async fn fix_fingers_periodically(node: Arc<Node>) {
    info!("Starting up periodic finger repair task");
    while node.is_active() {
        let index = rand::thread_rng().gen_range(1..NUM_BITS);
        let target = FingerTable::start(node.key(), index);
        let finger = node.find_successor(target).await;
        debug!("Finger {} (start {}) resolves to {}", index, target, finger);
        node.set_finger(index, finger);

        sleep(Duration::from_millis(MAINTENANCE_SLEEP_MILLIS)).await;
    }
    info!("Finger repair task on {} has stopped", node.addr());
}
