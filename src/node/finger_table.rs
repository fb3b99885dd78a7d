use crate::node::address::NodeAddr;
use crate::node::finger_entry::FingerEntry;
use crate::utils::crypto::{ith_step, Key, KEYSPACE, NUM_BITS};

/// The data structure that contains the routing information used for
/// efficient node look up. Entry i is the node responsible for
/// `start(key, i)`; entry 0 is the immediate successor.
#[derive(Debug, Clone)]
pub struct FingerTable {
    pub fingers: Vec<FingerEntry>,
}

impl FingerTable {
    /// A fresh table with every entry pointing at the owning node.
    pub fn new(own: &NodeAddr) -> FingerTable {
        FingerTable {
            fingers: vec![FingerEntry::new(own.clone()); NUM_BITS],
        }
    }

    /// Overwrites every entry with the same placeholder address.
    pub fn fill(&mut self, addr: &NodeAddr) {
        for finger in &mut self.fingers {
            *finger = FingerEntry::new(addr.clone());
        }
    }

    /// First identifier the i-th finger is responsible for.
    pub fn start(own_key: Key, i: usize) -> Key {
        (own_key + ith_step(i)) % KEYSPACE
    }
}
