use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::Notify;
use tokio::time::sleep;

use crate::kv::file_store::FileStore;
use crate::node::address::NodeAddr;
use crate::node::finger_entry::FingerEntry;
use crate::node::finger_table::FingerTable;
use crate::node::successor_list::SuccessorList;
use crate::protocol::{send_request, Request};
use crate::utils::constants::{
    PREDECESSOR_RETRY_SLEEP_MILLIS, SUCCESSOR_COUNT, SUCCESSOR_RETRY_SLEEP_MILLIS,
};
use crate::utils::crypto::{belongs, Key, NUM_BITS};

pub mod address;
pub mod finger_entry;
pub mod finger_table;
pub mod successor_list;

/// Everything the maintenance loops and the request handler mutate,
/// behind the node's one mutex. Guards are released before any
/// network call; the algorithms re-verify over RPC, so readers may
/// act on a stale snapshot.
struct RoutingState {
    predecessor: NodeAddr,
    fingers: FingerTable,
    successors: SuccessorList,
    store: FileStore,
}

/// A Chord node: an immutable identity plus the mutable routing
/// state that stabilization, finger repair, successor-list repair
/// and the request handler all share.
pub struct Node {
    addr: NodeAddr,
    key: Key,
    state: Mutex<RoutingState>,
    active: AtomicBool,
    shutdown: Notify,
}

impl Node {
    /// A node whose every pointer refers to itself, the state of a
    /// one-node ring. Join and bootstrap both start from this.
    pub fn new(addr: NodeAddr) -> Arc<Node> {
        let key = addr.key();
        let state = RoutingState {
            predecessor: addr.clone(),
            fingers: FingerTable::new(&addr),
            successors: SuccessorList::new(&addr),
            store: FileStore::default(),
        };
        Arc::new(Node {
            addr,
            key,
            state: Mutex::new(state),
            active: AtomicBool::new(true),
            shutdown: Notify::new(),
        })
    }

    pub fn addr(&self) -> &NodeAddr {
        &self.addr
    }

    pub fn key(&self) -> Key {
        self.key
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Signals every loop to exit at its next iteration boundary and
    /// unblocks the request acceptor. In-flight requests are not
    /// drained; peers repair around this node as if it had failed.
    pub fn stop(&self) {
        self.active.store(false, Ordering::Release);
        self.shutdown.notify_waiters();
    }

    pub(crate) fn shutdown_signal(&self) -> &Notify {
        &self.shutdown
    }

    pub fn successor(&self) -> NodeAddr {
        self.state.lock().unwrap().fingers.fingers[0].addr.clone()
    }

    pub fn predecessor(&self) -> NodeAddr {
        self.state.lock().unwrap().predecessor.clone()
    }

    pub fn fingers_snapshot(&self) -> Vec<FingerEntry> {
        self.state.lock().unwrap().fingers.fingers.clone()
    }

    pub fn successors_snapshot(&self) -> Vec<NodeAddr> {
        self.state.lock().unwrap().successors.entries().to_vec()
    }

    pub fn files_snapshot(&self) -> Vec<(String, Key)> {
        self.state.lock().unwrap().store.snapshot()
    }

    /// Assigns the successor pointer. Callers have validated the
    /// change; this is a pure setter.
    pub fn change_successor(&self, addr: NodeAddr) {
        self.state.lock().unwrap().fingers.fingers[0] = FingerEntry::new(addr);
    }

    /// Assigns the predecessor pointer. Callers have validated the
    /// change; this is a pure setter.
    pub fn change_predecessor(&self, addr: NodeAddr) {
        self.state.lock().unwrap().predecessor = addr;
    }

    /// Stabilization's adoption of a better successor: the head of
    /// the successor list must move with `fingers[0]`.
    pub(crate) fn adopt_successor(&self, addr: NodeAddr) {
        let mut state = self.state.lock().unwrap();
        state.fingers.fingers[0] = FingerEntry::new(addr.clone());
        state.successors.set(0, addr);
    }

    pub(crate) fn set_finger(&self, i: usize, addr: NodeAddr) {
        self.state.lock().unwrap().fingers.fingers[i] = FingerEntry::new(addr);
    }

    pub(crate) fn finger(&self, i: usize) -> FingerEntry {
        self.state.lock().unwrap().fingers.fingers[i].clone()
    }

    pub(crate) fn fill_fingers(&self, addr: &NodeAddr) {
        self.state.lock().unwrap().fingers.fill(addr);
    }

    pub(crate) fn successor_at(&self, i: usize) -> NodeAddr {
        self.state.lock().unwrap().successors.get(i).clone()
    }

    pub(crate) fn set_successor(&self, i: usize, addr: NodeAddr) {
        self.state.lock().unwrap().successors.set(i, addr);
    }

    pub(crate) fn shift_successors(&self, from: usize) {
        self.state.lock().unwrap().successors.shift(from);
    }

    /// Head-failure hook for stabilization: drops the dead head and
    /// returns the backup that replaces it.
    pub(crate) fn next_successor(&self) -> NodeAddr {
        self.state.lock().unwrap().successors.next_successor()
    }

    pub(crate) fn seed_files(&self, files: Vec<String>) {
        let mut state = self.state.lock().unwrap();
        for filename in files {
            state.store.insert(filename);
        }
    }

    /// Walks the ring forward from the current successor to fill the
    /// backup list. An unreachable hop leaves the remaining slots on
    /// their previous value; the maintenance loop repairs them.
    pub(crate) async fn init_successor_list(&self) {
        let mut current = self.successor();
        self.set_successor(0, current.clone());
        for i in 1..SUCCESSOR_COUNT {
            match request_addr(&current, &Request::YourSuccessor).await {
                Some(next) => {
                    self.set_successor(i, next.clone());
                    current = next;
                }
                None => {
                    warn!("Successor {} unreachable while filling the backup list", current);
                    break;
                }
            }
        }
    }

    /// Resolves the first node whose key is greater than or equal to
    /// `id` on the ring. Retries until a live predecessor of `id`
    /// answers; converges while at least one responsive node covers
    /// the arc.
    pub async fn find_successor(&self, id: Key) -> NodeAddr {
        loop {
            let predecessor = self.find_predecessor(id).await;
            if let Some(addr) = request_addr(&predecessor, &Request::YourSuccessor).await {
                return addr;
            }
            sleep(Duration::from_millis(SUCCESSOR_RETRY_SLEEP_MILLIS)).await;
        }
    }

    /// Resolves the last node whose key is strictly less than `id`.
    /// Forwards through the closest preceding finger; when that
    /// finger is dead, re-aims at the closest preceding finger of
    /// the dead finger's own key and tries again.
    pub async fn find_predecessor(&self, id: Key) -> NodeAddr {
        let successor = self.successor();
        if belongs(self.key, false, successor.key(), true, id) {
            return self.addr.clone();
        }

        let mut closest = self.closest_preceding_finger(id);
        loop {
            if let Some(addr) = request_addr(&closest, &Request::FindPredecessor(id)).await {
                return addr;
            }
            sleep(Duration::from_millis(PREDECESSOR_RETRY_SLEEP_MILLIS)).await;
            closest = self.closest_preceding_finger(closest.key());
        }
    }

    /// The farthest finger whose key lies strictly inside
    /// `(self.key, id)`, or this node when none qualifies.
    pub fn closest_preceding_finger(&self, id: Key) -> NodeAddr {
        let state = self.state.lock().unwrap();
        for finger in state.fingers.fingers.iter().rev() {
            if belongs(self.key, false, id, false, finger.key) {
                return finger.addr.clone();
            }
        }
        self.addr.clone()
    }

    /// Considers `candidate` as this node's predecessor. A dead
    /// predecessor is replaced unconditionally, which is what lets
    /// the ring close again after a failure.
    pub async fn notify(&self, candidate: NodeAddr) {
        let predecessor = self.predecessor();
        if !self.is_alive(&predecessor).await {
            debug!("Predecessor {} is gone, adopting {}", predecessor, candidate);
            self.change_predecessor(candidate);
            return;
        }
        if belongs(predecessor.key(), false, self.key, false, candidate.key()) {
            debug!("Adopting {} as predecessor", candidate);
            self.change_predecessor(candidate);
        }
    }

    /// Accepts `candidate` as the i-th finger when it is closer than
    /// the current entry, then propagates the update backwards to the
    /// predecessor, whose finger may now be improvable too.
    pub async fn update_ith_finger(&self, i: usize, candidate: NodeAddr) {
        if i >= NUM_BITS {
            warn!("Ignoring finger update for out-of-range index {}", i);
            return;
        }
        let (current_key, predecessor) = {
            let state = self.state.lock().unwrap();
            (state.fingers.fingers[i].key, state.predecessor.clone())
        };
        if belongs(self.key, false, current_key, false, candidate.key()) {
            debug!("Updating finger {} to {}", i, candidate);
            self.set_finger(i, candidate.clone());
            send_request(&predecessor, &Request::UpdateIthFinger(i, candidate)).await;
        }
    }

    /// Hands over every stored filename whose key lies in
    /// `(second, first]` to a joiner with key `first` whose
    /// predecessor has key `second`. Returns the names colon-joined,
    /// or the empty string when nothing moves.
    pub fn transfer_keys(&self, first: Key, second: Key) -> String {
        let claimed = self.state.lock().unwrap().store.drain_range(second, first);
        claimed.join(":")
    }

    pub async fn is_alive(&self, addr: &NodeAddr) -> bool {
        send_request(addr, &Request::Alive).await.is_some()
    }
}

/// Sends a request whose response is expected to be an address.
/// Unreachable peers and malformed responses both come back as
/// `None`; the distinction does not matter to ring repair.
pub(crate) async fn request_addr(addr: &NodeAddr, request: &Request) -> Option<NodeAddr> {
    let response = send_request(addr, request).await?;
    match response.parse::<NodeAddr>() {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!("Discarding malformed response {:?} from {}: {}", response, addr, err);
            None
        }
    }
}
