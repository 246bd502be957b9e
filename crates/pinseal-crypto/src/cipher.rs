//! AEAD capability and randomness source
//!
//! Every ciphertext produced here is `body || 16-byte tag`; the 96-bit nonce
//! travels separately in metadata (base64). Callers inject randomness through
//! [`SecureRandom`] so tests can run against a seeded generator.

use aes_gcm::{Aes128Gcm, Aes256Gcm};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::ChaCha20Poly1305;
use rand::{CryptoRng, RngCore};

use pinseal_core::{Algorithm, PinsealError, PinsealResult};

use crate::keys::{base64_to_buffer, buffer_to_base64};
use crate::{KEY_SIZE, NONCE_SIZE, WIDE_KEY_SIZE};

/// A cryptographically secure random source
pub trait SecureRandom: RngCore + CryptoRng {}

impl<T: RngCore + CryptoRng> SecureRandom for T {}

/// Authenticated encryption over whole buffers with an explicit nonce.
pub trait AeadCipher: Send + Sync {
    fn algorithm(&self) -> Algorithm;

    /// Required key length in bytes
    fn key_len(&self) -> usize;

    fn seal(&self, key: &[u8], nonce: &[u8; NONCE_SIZE], plaintext: &[u8])
        -> PinsealResult<Vec<u8>>;

    /// Fails with [`PinsealError::Authentication`] on any tag mismatch.
    fn open(&self, key: &[u8], nonce: &[u8; NONCE_SIZE], ciphertext: &[u8])
        -> PinsealResult<Vec<u8>>;
}

/// AES-GCM with a 128-bit or 256-bit key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AesGcm {
    key_len: usize,
}

impl AesGcm {
    pub const fn aes128() -> Self {
        Self { key_len: KEY_SIZE }
    }

    pub const fn aes256() -> Self {
        Self {
            key_len: WIDE_KEY_SIZE,
        }
    }
}

impl Default for AesGcm {
    fn default() -> Self {
        Self::aes128()
    }
}

impl AeadCipher for AesGcm {
    fn algorithm(&self) -> Algorithm {
        Algorithm::AesGcm
    }

    fn key_len(&self) -> usize {
        self.key_len
    }

    fn seal(
        &self,
        key: &[u8],
        nonce: &[u8; NONCE_SIZE],
        plaintext: &[u8],
    ) -> PinsealResult<Vec<u8>> {
        check_key_len(key, self.key_len)?;
        let nonce = aes_gcm::Nonce::from_slice(nonce);
        let sealed = if self.key_len == KEY_SIZE {
            Aes128Gcm::new_from_slice(key)
                .map_err(|_| bad_key_len(key.len()))?
                .encrypt(nonce, plaintext)
        } else {
            Aes256Gcm::new_from_slice(key)
                .map_err(|_| bad_key_len(key.len()))?
                .encrypt(nonce, plaintext)
        };
        sealed.map_err(|e| PinsealError::Other(anyhow::anyhow!("AES-GCM encryption failed: {e}")))
    }

    fn open(
        &self,
        key: &[u8],
        nonce: &[u8; NONCE_SIZE],
        ciphertext: &[u8],
    ) -> PinsealResult<Vec<u8>> {
        check_key_len(key, self.key_len)?;
        let nonce = aes_gcm::Nonce::from_slice(nonce);
        let opened = if self.key_len == KEY_SIZE {
            Aes128Gcm::new_from_slice(key)
                .map_err(|_| bad_key_len(key.len()))?
                .decrypt(nonce, ciphertext)
        } else {
            Aes256Gcm::new_from_slice(key)
                .map_err(|_| bad_key_len(key.len()))?
                .decrypt(nonce, ciphertext)
        };
        opened.map_err(|_| PinsealError::Authentication)
    }
}

/// ChaCha20-Poly1305 (256-bit key, 96-bit nonce)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChaChaPoly;

impl AeadCipher for ChaChaPoly {
    fn algorithm(&self) -> Algorithm {
        Algorithm::ChaCha20Poly1305
    }

    fn key_len(&self) -> usize {
        WIDE_KEY_SIZE
    }

    fn seal(
        &self,
        key: &[u8],
        nonce: &[u8; NONCE_SIZE],
        plaintext: &[u8],
    ) -> PinsealResult<Vec<u8>> {
        check_key_len(key, WIDE_KEY_SIZE)?;
        ChaCha20Poly1305::new_from_slice(key)
            .map_err(|_| bad_key_len(key.len()))?
            .encrypt(chacha20poly1305::Nonce::from_slice(nonce), plaintext)
            .map_err(|e| {
                PinsealError::Other(anyhow::anyhow!("ChaCha20-Poly1305 encryption failed: {e}"))
            })
    }

    fn open(
        &self,
        key: &[u8],
        nonce: &[u8; NONCE_SIZE],
        ciphertext: &[u8],
    ) -> PinsealResult<Vec<u8>> {
        check_key_len(key, WIDE_KEY_SIZE)?;
        ChaCha20Poly1305::new_from_slice(key)
            .map_err(|_| bad_key_len(key.len()))?
            .decrypt(chacha20poly1305::Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| PinsealError::Authentication)
    }
}

fn check_key_len(key: &[u8], expected: usize) -> PinsealResult<()> {
    if key.len() != expected {
        return Err(bad_key_len(key.len()));
    }
    Ok(())
}

fn bad_key_len(len: usize) -> PinsealError {
    PinsealError::InvalidKeyFormat(format!("key material has wrong size: {len} bytes"))
}

/// Draw a fresh nonce. Called once per seal; nonces are never reused.
pub fn random_nonce<R: SecureRandom + ?Sized>(rng: &mut R) -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut nonce);
    nonce
}

pub fn encode_nonce(nonce: &[u8; NONCE_SIZE]) -> String {
    buffer_to_base64(nonce)
}

/// Decode a base64 nonce; anything other than 12 bytes is a hard failure.
pub fn decode_nonce(b64: &str) -> PinsealResult<[u8; NONCE_SIZE]> {
    let raw = base64_to_buffer(b64)?;
    raw.as_slice()
        .try_into()
        .map_err(|_| PinsealError::InvalidNonce(raw.len()))
}
