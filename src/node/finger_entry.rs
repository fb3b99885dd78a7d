use std::fmt;

use crate::node::address::NodeAddr;
use crate::utils::crypto::Key;

/// A finger table slot: a peer address with its ring position cached
/// so routing comparisons do not rehash on every scan.
#[derive(Clone, PartialEq, Eq)]
pub struct FingerEntry {
    pub key: Key,
    pub addr: NodeAddr,
}

impl FingerEntry {
    pub fn new(addr: NodeAddr) -> FingerEntry {
        FingerEntry {
            key: addr.key(),
            addr,
        }
    }
}

impl From<NodeAddr> for FingerEntry {
    fn from(addr: NodeAddr) -> FingerEntry {
        FingerEntry::new(addr)
    }
}

impl fmt::Debug for FingerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("")
            .field("key", &self.key)
            .field("addr", &self.addr)
            .finish()
    }
}
