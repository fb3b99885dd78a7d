use crate::node::address::NodeAddr;
use crate::utils::constants::SUCCESSOR_COUNT;

/// Backup successors used to repair the ring head when the immediate
/// successor fails. The backing storage has one slot more than
/// SUCCESSOR_COUNT; the extra slot holds the owning node's own
/// address as a sentinel, so a fully shifted list degrades to the
/// single-node view instead of reading past the end.
#[derive(Debug, Clone)]
pub struct SuccessorList {
    successors: Vec<NodeAddr>,
}

impl SuccessorList {
    pub fn new(own: &NodeAddr) -> SuccessorList {
        SuccessorList {
            successors: vec![own.clone(); SUCCESSOR_COUNT + 1],
        }
    }

    pub fn get(&self, i: usize) -> &NodeAddr {
        &self.successors[i]
    }

    pub fn set(&mut self, i: usize, addr: NodeAddr) {
        self.successors[i] = addr;
    }

    /// Closes the gap left by a failed successor at `from` by moving
    /// every later entry one slot left.
    pub fn shift(&mut self, from: usize) {
        for i in from..SUCCESSOR_COUNT {
            self.successors[i] = self.successors[i + 1].clone();
        }
    }

    /// Called by stabilization when the head has failed: drops it and
    /// returns the replacement.
    pub fn next_successor(&mut self) -> NodeAddr {
        self.shift(0);
        self.successors[0].clone()
    }

    pub fn entries(&self) -> &[NodeAddr] {
        &self.successors
    }
}
