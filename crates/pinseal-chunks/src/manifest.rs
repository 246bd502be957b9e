//! Integrity manifests: a Merkle root plus one inclusion proof per chunk,
//! together with the chunking parameters needed to re-cut the same file.

use serde::{Deserialize, Serialize};

use pinseal_core::config::ChunkingConfig;
use pinseal_core::PinsealResult;

use crate::blake3::hash_from_hex;
use crate::chunking::chunk_with_config;
use crate::merkle::{build_tree, verify_proof, MerkleProof};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestChunk {
    pub offset: u64,
    pub length: usize,
    pub proof: MerkleProof,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityManifest {
    /// Hex Merkle root; absent for an empty file
    pub root: Option<String>,
    pub chunk_size: usize,
    pub content_defined: bool,
    pub chunks: Vec<ManifestChunk>,
}

/// Outcome of checking a file against a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub checked: usize,
    /// Indices of chunks that failed, including chunks present on only one side
    pub failed: Vec<usize>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

impl IntegrityManifest {
    pub fn build(data: &[u8], config: &ChunkingConfig) -> PinsealResult<Self> {
        let chunks = chunk_with_config(data, config)?;
        let slices: Vec<&[u8]> = chunks.iter().map(|c| c.data(data)).collect();
        let tree = build_tree(&slices);

        Ok(Self {
            root: tree.root_hex(),
            chunk_size: config.chunk_size,
            content_defined: config.content_defined,
            chunks: chunks
                .iter()
                .zip(tree.proofs())
                .map(|(c, proof)| ManifestChunk {
                    offset: c.offset,
                    length: c.length,
                    proof: proof.clone(),
                })
                .collect(),
        })
    }

    pub fn chunking(&self) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: self.chunk_size,
            content_defined: self.content_defined,
        }
    }

    /// Re-chunk `data` with the manifest's parameters and check every proof.
    pub fn verify(&self, data: &[u8]) -> PinsealResult<VerifyReport> {
        let chunks = chunk_with_config(data, &self.chunking())?;
        let count = chunks.len().max(self.chunks.len());

        let root = match &self.root {
            Some(hex) => hash_from_hex(hex)?,
            None => {
                return Ok(VerifyReport {
                    checked: count,
                    failed: (0..chunks.len()).collect(),
                })
            }
        };

        let failed = (0..count)
            .filter(|&i| match (chunks.get(i), self.chunks.get(i)) {
                (Some(chunk), Some(entry)) => !verify_proof(chunk.data(data), &entry.proof, &root),
                _ => true,
            })
            .collect();

        Ok(VerifyReport {
            checked: count,
            failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(size: usize) -> ChunkingConfig {
        ChunkingConfig {
            chunk_size: size,
            content_defined: false,
        }
    }

    #[test]
    fn intact_file_verifies() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let manifest = IntegrityManifest::build(&data, &fixed(1024)).unwrap();
        assert_eq!(manifest.chunks.len(), 5);
        let report = manifest.verify(&data).unwrap();
        assert!(report.is_ok());
        assert_eq!(report.checked, 5);
    }

    #[test]
    fn single_byte_change_is_located() {
        let mut data = vec![0x5Au8; 4096];
        let manifest = IntegrityManifest::build(&data, &fixed(1024)).unwrap();
        data[2100] ^= 0xFF;
        let report = manifest.verify(&data).unwrap();
        assert_eq!(report.failed, vec![2]);
    }

    #[test]
    fn truncation_flags_missing_chunks() {
        let data = vec![1u8; 3000];
        let manifest = IntegrityManifest::build(&data, &fixed(1000)).unwrap();
        let report = manifest.verify(&data[..1500]).unwrap();
        assert_eq!(report.failed, vec![1, 2]);
    }

    #[test]
    fn empty_file_has_no_root() {
        let manifest = IntegrityManifest::build(&[], &fixed(1024)).unwrap();
        assert!(manifest.root.is_none());
        assert!(manifest.verify(&[]).unwrap().is_ok());
        assert_eq!(manifest.verify(b"new").unwrap().failed, vec![0]);
    }

    #[test]
    fn manifest_json_roundtrip() {
        let data = vec![9u8; 2500];
        let manifest = IntegrityManifest::build(&data, &fixed(1000)).unwrap();
        let json = serde_json::to_string_pretty(&manifest).unwrap();
        let back: IntegrityManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, manifest);
        assert!(back.verify(&data).unwrap().is_ok());
    }
}
