//! pinseal-chunks: chunking, BLAKE3 hashing, and Merkle integrity proofs
//!
//! # Overview
//! - `blake3`: content hashing and the domain-separated leaf/node hashes
//! - `chunking`: fixed-size and content-defined (FastCDC) chunk boundaries
//! - `merkle`: tree construction, per-chunk inclusion proofs, verification
//! - `manifest`: serializable root + proofs for a whole file

pub mod blake3;
pub mod chunking;
pub mod manifest;
pub mod merkle;

pub use self::blake3::{hash_bytes, hash_from_hex, hash_to_hex, Hash};
pub use chunking::{chunk_content_defined, chunk_fixed, chunk_with_config, Chunk, ChunkSizes};
pub use manifest::{IntegrityManifest, ManifestChunk, VerifyReport};
pub use merkle::{build_tree, verify_proof, MerkleProof, MerkleTree};
