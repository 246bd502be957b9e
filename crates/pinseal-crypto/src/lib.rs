//! pinseal-crypto: client-side file encryption for the pinning dashboard
//!
//! Everything here is an in-memory transform: bytes in, bytes + metadata out.
//! Storage, upload and chain calls belong to the caller.
//!
//! Layering:
//! ```text
//! Primary key (hex string or passphrase)
//!   ├── Single layer: AES-128-GCM(key=primary, nonce=random 96-bit)
//!   └── Onion: L × AES-128-GCM, one fresh key per layer
//!       └── layer keys as JSON, sealed under the primary key → metadata
//! Primary key ──split──▶ N shares (any T reconstruct), GF(256) per byte
//! ```

pub mod cipher;
pub mod keyfile;
pub mod keys;
pub mod onion;
pub mod recovery;
pub mod shares;
pub mod single;

pub use cipher::{AeadCipher, AesGcm, ChaChaPoly, SecureRandom};
pub use keyfile::{extract_key, render_key_file};
pub use keys::{
    base64_to_buffer, buffer_to_base64, derive_key_material, generate_key, KeyMaterial,
    KeySource, LayerKey,
};
pub use onion::{OnionEncryptor, DEFAULT_LAYERS};
pub use recovery::{
    default_candidates, Candidate, IvSource, Progress, Recovered, Recovery, RecoveryError,
};
pub use shares::{combine, combine_key, split, split_key, Share};
pub use single::{decrypt, encrypt, Encryptor};

/// Size of every symmetric key this system produces (128-bit)
pub const KEY_SIZE: usize = 16;

/// Size of 256-bit key material (recovery candidates, raw 64-hex keys)
pub const WIDE_KEY_SIZE: usize = 32;

/// Size of an AES-GCM / ChaCha20-Poly1305 nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of the GCM / Poly1305 authentication tag
pub const TAG_SIZE: usize = 16;
