use sha1::{Digest, Sha1};

pub type Key = u64;

/// Number of bits in the identifier space.
pub const NUM_BITS: usize = 5;

/// Total number of identifiers on the ring.
pub const KEYSPACE: Key = 1 << NUM_BITS;

/// Distance covered by the i-th finger, 2^i.
pub fn ith_step(i: usize) -> Key {
    1 << i
}

/// Folds the SHA-1 digest of `input` into a ring identifier.
///
/// The 160 digest bits are consumed most-significant-first in chunks
/// of NUM_BITS and XORed together; a trailing partial chunk (when
/// NUM_BITS does not divide 160) is padded with zeros on the right.
/// Every node must use the same NUM_BITS for the fold to agree.
pub fn hash(input: &str) -> Key {
    let digest = Sha1::digest(input.as_bytes());

    let mut folded: Key = 0;
    let mut chunk: Key = 0;
    let mut chunk_bits = 0;
    for byte in digest {
        for shift in (0..8).rev() {
            chunk = (chunk << 1) | ((byte >> shift) & 1) as Key;
            chunk_bits += 1;
            if chunk_bits == NUM_BITS {
                folded ^= chunk;
                chunk = 0;
                chunk_bits = 0;
            }
        }
    }
    if chunk_bits > 0 {
        folded ^= chunk << (NUM_BITS - chunk_bits);
    }
    folded
}

/// Ring-arc containment: is `id` on the arc from `left` to `right`,
/// with the given inclusivity on each end?
///
/// A wrapping arc (left > right) holds `id` iff the complementary
/// arc, with both inclusivities flipped, does not. An empty-looking
/// arc (left == right) is the full ring when either end is
/// inclusive, and the full ring minus the single point otherwise.
pub fn belongs(left: Key, left_inclusive: bool, right: Key, right_inclusive: bool, id: Key) -> bool {
    if left < right {
        let above = if left_inclusive { left <= id } else { left < id };
        let below = if right_inclusive { id <= right } else { id < right };
        above && below
    } else if left == right {
        left_inclusive || right_inclusive || id != left
    } else {
        !belongs(right, !right_inclusive, left, !left_inclusive, id)
    }
}

/// Clockwise distance from `from` to `to`; equal keys yield KEYSPACE.
pub fn forward_distance(from: Key, to: Key) -> Key {
    if to > from {
        to - from
    } else {
        KEYSPACE - (from - to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_matches_known_digests() {
        assert_eq!(hash("test"), 6);
        assert_eq!(hash("localhost/127.0.0.1:9000"), 12);
        assert_eq!(hash("Alpha.txt"), 30);
    }

    #[test]
    fn fold_stays_in_keyspace() {
        for i in 0..200 {
            let key = hash(&format!("input-{}", i));
            assert!(key < KEYSPACE);
        }
    }

    #[test]
    fn fold_matches_bit_string_reference() {
        // Reference fold: write the digest as a 160-char binary string
        // and XOR its NUM_BITS-wide slices.
        for input in ["", "a", "chord", "localhost/127.0.0.1:9000", "Xyzzy.json"] {
            let digest = Sha1::digest(input.as_bytes());
            let bits: String = digest.iter().map(|byte| format!("{:08b}", byte)).collect();
            let mut expected: Key = 0;
            let mut begin = 0;
            while begin < bits.len() {
                let end = (begin + NUM_BITS).min(bits.len());
                let mut chunk = Key::from_str_radix(&bits[begin..end], 2).unwrap();
                chunk <<= NUM_BITS - (end - begin);
                expected ^= chunk;
                begin = end;
            }
            assert_eq!(hash(input), expected, "input {:?}", input);
        }
    }

    #[test]
    fn belongs_edge_table() {
        assert!(belongs(5, false, 10, false, 7));
        assert!(!belongs(5, false, 10, false, 5));
        assert!(belongs(5, true, 10, false, 5));
        assert!(belongs(28, false, 3, false, 30));
        assert!(!belongs(28, false, 3, false, 3));
        assert!(!belongs(7, false, 7, false, 7));
        assert!(belongs(7, true, 7, false, 3));
    }

    #[test]
    fn belongs_complement_law() {
        for left in 0..KEYSPACE {
            for right in 0..KEYSPACE {
                if left == right {
                    continue;
                }
                for id in 0..KEYSPACE {
                    for left_inclusive in [false, true] {
                        for right_inclusive in [false, true] {
                            assert_eq!(
                                belongs(left, left_inclusive, right, right_inclusive, id),
                                !belongs(right, !right_inclusive, left, !left_inclusive, id),
                                "({}, {}, {}, {}, {})",
                                left,
                                left_inclusive,
                                right,
                                right_inclusive,
                                id
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn belongs_degenerate_arcs() {
        for left in 0..KEYSPACE {
            for id in 0..KEYSPACE {
                assert!(belongs(left, true, left, true, id));
                assert!(belongs(left, true, left, false, id));
                assert!(belongs(left, false, left, true, id));
                assert_eq!(belongs(left, false, left, false, id), id != left);
            }
        }
    }

    #[test]
    fn steps_double_per_index() {
        assert_eq!(ith_step(0), 1);
        assert_eq!(ith_step(1), 2);
        assert_eq!(ith_step(NUM_BITS - 1), KEYSPACE / 2);
    }

    #[test]
    fn forward_distance_wraps() {
        assert_eq!(forward_distance(3, 10), 7);
        assert_eq!(forward_distance(30, 2), 4);
        assert_eq!(forward_distance(10, 10), KEYSPACE);
    }
}
