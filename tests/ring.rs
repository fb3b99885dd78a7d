use std::collections::HashSet;
use std::time::Duration;

use tokio::time::sleep;

use chord_node::join;
use chord_node::node::address::NodeAddr;
use chord_node::utils::crypto::{belongs, hash, Key, KEYSPACE};

const SETTLE: Duration = Duration::from_secs(2);

/// Picks `count` loopback addresses with pairwise distinct ring
/// keys, starting at `base_port`. Two nodes on the same position
/// cannot coexist in a 2^NUM_BITS ring, so colliding ports are
/// skipped. Each test uses its own port range.
fn distinct_addrs(base_port: u16, count: usize) -> Vec<NodeAddr> {
    let mut addrs = Vec::new();
    let mut used = HashSet::new();
    let mut port = base_port;
    while addrs.len() < count {
        let addr = NodeAddr::new("127.0.0.1", port).unwrap();
        port += 1;
        if used.insert(addr.key()) {
            addrs.push(addr);
        }
    }
    addrs
}

/// The key of the node responsible for `id` among `sorted_keys`.
fn responsible(id: Key, sorted_keys: &[Key]) -> Key {
    *sorted_keys
        .iter()
        .find(|&&key| key >= id % KEYSPACE)
        .unwrap_or(&sorted_keys[0])
}

#[tokio::test(flavor = "multi_thread")]
async fn single_node_ring_owns_every_key() {
    let addr = distinct_addrs(43100, 1).remove(0);
    let files = vec!["Alpha.txt".to_string(), "Beta.csv".to_string()];
    let node = join::bootstrap(addr.clone(), files).await.unwrap();
    sleep(Duration::from_millis(300)).await;

    assert_eq!(node.successor(), addr);
    assert_eq!(node.predecessor(), addr);
    for finger in node.fingers_snapshot() {
        assert_eq!(finger.addr, addr);
    }
    for successor in node.successors_snapshot() {
        assert_eq!(successor, addr);
    }

    for id in [0, 1, node.key(), (node.key() + 7) % KEYSPACE, KEYSPACE - 1] {
        assert_eq!(node.find_successor(id).await, addr, "lookup for {}", id);
    }
    assert_eq!(node.files_snapshot().len(), 2);

    node.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn two_node_ring_routes_every_key_by_order() {
    let addrs = distinct_addrs(43200, 2);
    let first = join::bootstrap(addrs[0].clone(), Vec::new()).await.unwrap();
    let second = join::join(addrs[1].clone(), addrs[0].clone()).await.unwrap();
    sleep(SETTLE).await;

    assert_eq!(first.successor(), *second.addr());
    assert_eq!(first.predecessor(), *second.addr());
    assert_eq!(second.successor(), *first.addr());
    assert_eq!(second.predecessor(), *first.addr());
    assert_eq!(first.successors_snapshot()[0], first.successor());
    assert_eq!(second.successors_snapshot()[0], second.successor());

    let mut keys = vec![first.key(), second.key()];
    keys.sort_unstable();
    for id in 0..KEYSPACE {
        let expected = responsible(id, &keys);
        assert_eq!(first.find_successor(id).await.key(), expected, "lookup from first for {}", id);
        assert_eq!(second.find_successor(id).await.key(), expected, "lookup from second for {}", id);
    }

    first.stop();
    second.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn join_claims_exactly_its_arc_of_files() {
    let addrs = distinct_addrs(43300, 2);

    // Seed files covering every reachable ring position so both
    // sides of the split are exercised.
    let mut files = Vec::new();
    let mut covered = HashSet::new();
    for n in 0..4000 {
        let filename = format!("File{}.txt", n);
        if covered.insert(hash(&filename)) {
            files.push(filename);
        }
        if covered.len() == KEYSPACE as usize {
            break;
        }
    }
    let seeded = files.len();

    let first = join::bootstrap(addrs[0].clone(), files).await.unwrap();
    let second = join::join(addrs[1].clone(), addrs[0].clone()).await.unwrap();
    sleep(SETTLE).await;

    let first_key = first.key();
    let second_key = second.key();

    for (filename, key) in second.files_snapshot() {
        assert!(
            belongs(first_key, false, second_key, true, key),
            "{} (key {}) does not belong to the joiner's arc",
            filename,
            key
        );
    }
    for (filename, key) in first.files_snapshot() {
        assert!(
            belongs(second_key, false, first_key, true, key),
            "{} (key {}) should have moved to the joiner",
            filename,
            key
        );
    }
    assert!(!second.files_snapshot().is_empty());
    assert_eq!(first.files_snapshot().len() + second.files_snapshot().len(), seeded);

    first.stop();
    second.stop();
}

#[tokio::test(flavor = "multi_thread")]
async fn ring_heals_after_a_node_failure() {
    let addrs = distinct_addrs(43400, 4);
    let mut nodes = Vec::new();
    nodes.push(join::bootstrap(addrs[0].clone(), Vec::new()).await.unwrap());
    for addr in &addrs[1..] {
        nodes.push(join::join(addr.clone(), addrs[0].clone()).await.unwrap());
        sleep(Duration::from_millis(300)).await;
    }
    sleep(SETTLE).await;

    let victim = nodes.remove(1);
    victim.stop();
    sleep(Duration::from_secs(3)).await;

    let mut keys: Vec<Key> = nodes.iter().map(|node| node.key()).collect();
    keys.sort_unstable();

    for node in &nodes {
        let expected = responsible((node.key() + 1) % KEYSPACE, &keys);
        assert_eq!(
            node.successor().key(),
            expected,
            "successor of node {} did not heal",
            node.key()
        );

        let successors = node.successors_snapshot();
        assert_eq!(successors[0], node.successor());
        assert_ne!(successors[0], *victim.addr());
        assert_ne!(successors[1], *victim.addr());

        for (i, finger) in node.fingers_snapshot().iter().enumerate() {
            assert_ne!(
                finger.addr,
                *victim.addr(),
                "finger {} of node {} still points at the dead node",
                i,
                node.key()
            );
        }
    }

    // Fingers must point at the node actually responsible for their
    // start again.
    for node in &nodes {
        for (i, finger) in node.fingers_snapshot().iter().enumerate() {
            let start = chord_node::node::finger_table::FingerTable::start(node.key(), i);
            assert_eq!(
                finger.key,
                responsible(start, &keys),
                "finger {} of node {}",
                i,
                node.key()
            );
        }
    }

    for node in &nodes {
        node.stop();
    }
}
