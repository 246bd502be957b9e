//! BLAKE3 hashing: content identity and Merkle node hashes
//!
//! Leaves and interior nodes are domain-separated by a one-byte prefix so a
//! leaf digest can never be replayed as an interior node.

use pinseal_core::{PinsealError, PinsealResult};

/// A BLAKE3 hash digest (32 bytes), displayed as 64 hex chars
pub type Hash = blake3::Hash;

const LEAF_PREFIX: u8 = 0x00;
const NODE_PREFIX: u8 = 0x01;

/// Hash a byte slice in memory.
pub fn hash_bytes(data: &[u8]) -> Hash {
    blake3::hash(data)
}

/// Hash a chunk as a Merkle leaf: `BLAKE3(0x00 || chunk)`
pub fn leaf_hash(chunk: &[u8]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[LEAF_PREFIX]);
    hasher.update(chunk);
    hasher.finalize()
}

/// Combine two child digests: `BLAKE3(0x01 || min(a, b) || max(a, b))`.
///
/// The combine is symmetric, so `node_hash(a, b) == node_hash(b, a)`.
pub fn node_hash(a: &Hash, b: &Hash) -> Hash {
    let (lo, hi) = if a.as_bytes() <= b.as_bytes() {
        (a, b)
    } else {
        (b, a)
    };
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[NODE_PREFIX]);
    hasher.update(lo.as_bytes());
    hasher.update(hi.as_bytes());
    hasher.finalize()
}

/// Format a hash as lowercase hex string (64 chars)
pub fn hash_to_hex(hash: &Hash) -> String {
    hash.to_hex().to_string()
}

/// Parse a 64-char hex string into a Hash
pub fn hash_from_hex(hex: &str) -> PinsealResult<Hash> {
    blake3::Hash::from_hex(hex.trim())
        .map_err(|e| PinsealError::Decode(format!("invalid BLAKE3 hex '{hex}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_hash_is_deterministic() {
        assert_eq!(hash_bytes(b""), hash_bytes(b""));
    }

    #[test]
    fn hash_hex_roundtrip() {
        let h = hash_bytes(b"hello pinseal");
        let hex = hash_to_hex(&h);
        assert_eq!(hex.len(), 64);
        assert_eq!(hash_from_hex(&hex).unwrap(), h);
        assert!(hash_from_hex("not-hex").is_err());
    }

    #[test]
    fn leaf_is_domain_separated() {
        assert_ne!(leaf_hash(b"chunk"), hash_bytes(b"chunk"));
        let a = leaf_hash(b"a");
        let b = leaf_hash(b"b");
        let mut joined = a.as_bytes().to_vec();
        joined.extend_from_slice(b.as_bytes());
        assert_ne!(node_hash(&a, &b), leaf_hash(&joined));
    }

    proptest! {
        #[test]
        fn node_hash_is_symmetric(x in any::<[u8; 32]>(), y in any::<[u8; 32]>()) {
            let a = Hash::from(x);
            let b = Hash::from(y);
            prop_assert_eq!(node_hash(&a, &b), node_hash(&b, &a));
        }
    }
}
