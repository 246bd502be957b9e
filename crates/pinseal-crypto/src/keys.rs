//! Key and IV utilities: base64/hex codecs, random key generation, and
//! primary-key parsing.
//!
//! A primary key string is classified exactly one way:
//! ```text
//! 32 hex chars  → the 16 raw bytes                     (Raw128)
//! 64 hex chars  → the first 16 of the 32 raw bytes     (Raw256Truncated)
//! anything else → SHA-256(utf8), first 16 bytes        (Passphrase)
//! ```
//! Metadata sealed under one classification cannot be opened under another.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, Zeroizing};

use pinseal_core::{PinsealError, PinsealResult};

use crate::{KEY_SIZE, WIDE_KEY_SIZE};

pub fn buffer_to_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

pub fn base64_to_buffer(s: &str) -> PinsealResult<Vec<u8>> {
    STANDARD
        .decode(s)
        .map_err(|e| PinsealError::Decode(format!("base64: {e}")))
}

pub fn bytes_to_hex(data: &[u8]) -> String {
    hex::encode(data)
}

pub fn hex_to_bytes(s: &str) -> PinsealResult<Vec<u8>> {
    hex::decode(s).map_err(|e| PinsealError::Decode(format!("hex: {e}")))
}

/// Generate a random 128-bit key, hex-encoded (32 chars), from the OS CSPRNG.
pub fn generate_key() -> String {
    generate_key_with(&mut OsRng)
}

pub fn generate_key_with<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> String {
    let mut bytes = Zeroizing::new([0u8; KEY_SIZE]);
    rng.fill_bytes(&mut bytes[..]);
    hex::encode(&bytes[..])
}

/// A per-layer 128-bit key. Zeroized on drop.
#[derive(Clone)]
pub struct LayerKey {
    bytes: [u8; KEY_SIZE],
}

impl LayerKey {
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        rng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.bytes))
    }

    pub fn from_hex(s: &str) -> PinsealResult<Self> {
        let raw = Zeroizing::new(hex_to_bytes(s)?);
        if raw.len() != KEY_SIZE {
            return Err(PinsealError::Decode(format!(
                "layer key has wrong size: {} bytes (expected {KEY_SIZE})",
                raw.len()
            )));
        }
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&raw);
        Ok(Self { bytes })
    }
}

impl Drop for LayerKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for LayerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// How a primary key string was interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Raw128,
    Raw256Truncated,
    Passphrase,
}

/// Symmetric key bytes derived from a primary key string. Zeroized on drop.
pub struct KeyMaterial {
    bytes: Zeroizing<Vec<u8>>,
    source: KeySource,
}

impl KeyMaterial {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn source(&self) -> KeySource {
        self.source
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("len", &self.bytes.len())
            .field("source", &self.source)
            .finish()
    }
}

fn is_hex(s: &str) -> bool {
    s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Surrounding whitespace is ignored when recognising a raw hex key; a
/// passphrase is used exactly as given.
fn classify(key: &str) -> PinsealResult<(&str, KeySource)> {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return Err(PinsealError::InvalidKeyFormat("key is empty".into()));
    }
    Ok(match trimmed.len() {
        32 if is_hex(trimmed) => (trimmed, KeySource::Raw128),
        64 if is_hex(trimmed) => (trimmed, KeySource::Raw256Truncated),
        _ => (key, KeySource::Passphrase),
    })
}

/// Derive 128-bit key material from a primary key string.
pub fn derive_key_material(key: &str) -> PinsealResult<KeyMaterial> {
    let (key, source) = classify(key)?;
    let bytes = match source {
        KeySource::Raw128 => Zeroizing::new(hex_to_bytes(key)?),
        KeySource::Raw256Truncated => {
            let raw = Zeroizing::new(hex_to_bytes(key)?);
            Zeroizing::new(raw[..KEY_SIZE].to_vec())
        }
        KeySource::Passphrase => {
            let digest = Sha256::digest(key.as_bytes());
            Zeroizing::new(digest[..KEY_SIZE].to_vec())
        }
    };
    Ok(KeyMaterial { bytes, source })
}

/// Derive 256-bit key material: raw 64-hex keys whole, passphrases via the
/// full SHA-256 digest. A raw 128-bit key has no 256-bit form.
pub fn derive_key_material_256(key: &str) -> PinsealResult<KeyMaterial> {
    let (key, source) = classify(key)?;
    let bytes = match source {
        KeySource::Raw128 => {
            return Err(PinsealError::InvalidKeyFormat(
                "128-bit key cannot be used as 256-bit key material".into(),
            ))
        }
        KeySource::Raw256Truncated => Zeroizing::new(hex_to_bytes(key)?),
        KeySource::Passphrase => Zeroizing::new(Sha256::digest(key.as_bytes()).to_vec()),
    };
    debug_assert_eq!(bytes.len(), WIDE_KEY_SIZE);
    Ok(KeyMaterial { bytes, source })
}

/// Derive key material of the requested length (16 or 32 bytes).
pub fn derive_key_material_for(key: &str, len: usize) -> PinsealResult<KeyMaterial> {
    match len {
        KEY_SIZE => derive_key_material(key),
        WIDE_KEY_SIZE => derive_key_material_256(key),
        other => Err(PinsealError::InvalidParameter(format!(
            "unsupported key length: {other} bytes"
        ))),
    }
}
