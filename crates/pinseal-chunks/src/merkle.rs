//! Merkle integrity trees over chunk lists
//!
//! ```text
//! leaf   = BLAKE3(0x00 || chunk)
//! parent = BLAKE3(0x01 || min(a, b) || max(a, b))
//! ```
//!
//! Levels are built pairwise left to right. An odd node at the end of a level
//! is promoted unchanged and contributes no sibling to any proof. Because the
//! parent combine is symmetric, a proof is just the ordered list of sibling
//! digests from leaf to root.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use pinseal_core::{PinsealError, PinsealResult};

use crate::blake3::{hash_from_hex, hash_to_hex, leaf_hash, node_hash, Hash};

/// Above this many chunks, leaves are hashed in parallel.
const PARALLEL_LEAF_THRESHOLD: usize = 64;

/// Sibling digests from a leaf up to the root
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct MerkleProof {
    pub siblings: Vec<Hash>,
}

impl MerkleProof {
    pub fn len(&self) -> usize {
        self.siblings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.siblings.is_empty()
    }

    pub fn to_hex(&self) -> Vec<String> {
        self.siblings.iter().map(hash_to_hex).collect()
    }

    pub fn from_hex<S: AsRef<str>>(hexes: &[S]) -> PinsealResult<Self> {
        let siblings = hexes
            .iter()
            .map(|h| hash_from_hex(h.as_ref()))
            .collect::<PinsealResult<Vec<_>>>()?;
        Ok(Self { siblings })
    }
}

impl From<MerkleProof> for Vec<String> {
    fn from(proof: MerkleProof) -> Self {
        proof.to_hex()
    }
}

impl TryFrom<Vec<String>> for MerkleProof {
    type Error = PinsealError;

    fn try_from(hexes: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_hex(&hexes)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MerkleTree {
    /// `levels[0]` are the leaves; the last level holds the single root.
    levels: Vec<Vec<Hash>>,
    /// One proof per leaf, in leaf order
    proofs: Vec<MerkleProof>,
}

impl MerkleTree {
    /// `None` for a tree built over no chunks.
    pub fn root(&self) -> Option<Hash> {
        self.levels.last().and_then(|level| level.first()).copied()
    }

    pub fn root_hex(&self) -> Option<String> {
        self.root().map(|h| hash_to_hex(&h))
    }

    pub fn levels(&self) -> &[Vec<Hash>] {
        &self.levels
    }

    pub fn proofs(&self) -> &[MerkleProof] {
        &self.proofs
    }

    pub fn proof(&self, index: usize) -> Option<&MerkleProof> {
        self.proofs.get(index)
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }
}

/// Build a tree over `chunks` together with an inclusion proof per chunk.
pub fn build_tree<T>(chunks: &[T]) -> MerkleTree
where
    T: AsRef<[u8]> + Sync,
{
    if chunks.is_empty() {
        return MerkleTree::default();
    }

    let leaves: Vec<Hash> = if chunks.len() > PARALLEL_LEAF_THRESHOLD {
        chunks.par_iter().map(|c| leaf_hash(c.as_ref())).collect()
    } else {
        chunks.iter().map(|c| leaf_hash(c.as_ref())).collect()
    };

    let mut proofs = vec![MerkleProof::default(); leaves.len()];
    // Position of each leaf's ancestor within the current level
    let mut positions: Vec<usize> = (0..leaves.len()).collect();
    let mut levels = vec![leaves];

    while let Some(level) = levels.last().filter(|l| l.len() > 1) {
        for (proof, pos) in proofs.iter_mut().zip(positions.iter_mut()) {
            let sibling = *pos ^ 1;
            if let Some(hash) = level.get(sibling) {
                proof.siblings.push(*hash);
            }
            *pos /= 2;
        }

        let next: Vec<Hash> = level
            .chunks(2)
            .map(|pair| match pair {
                [a, b] => node_hash(a, b),
                _ => pair[0],
            })
            .collect();
        levels.push(next);
    }

    debug!(
        leaves = levels[0].len(),
        depth = levels.len(),
        "merkle tree built"
    );
    MerkleTree { levels, proofs }
}

/// Check that `chunk` is included under `root` via `proof`.
pub fn verify_proof(chunk: &[u8], proof: &MerkleProof, root: &Hash) -> bool {
    let computed = proof
        .siblings
        .iter()
        .fold(leaf_hash(chunk), |acc, sibling| node_hash(&acc, sibling));
    computed == *root
}
