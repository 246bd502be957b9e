//! Single-layer file encryption
//!
//! ```text
//! ciphertext = AES-128-GCM(key = primary key material, nonce = random 96-bit)(file)
//! metadata   = { algorithm: "AES-GCM", iv: base64(nonce), original file info }
//! ```
//!
//! Inputs above the size limit are rejected before any key parsing or
//! cryptographic work.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::OsRng;
use tracing::debug;

use pinseal_core::config::DEFAULT_MAX_FILE_SIZE;
use pinseal_core::{EncryptionMetadata, FileInfo, PinsealError, PinsealResult};

use crate::cipher::{decode_nonce, encode_nonce, random_nonce, AeadCipher, AesGcm, SecureRandom};
use crate::keys::derive_key_material_for;

/// Reject inputs larger than `limit` bytes.
pub fn check_size(len: usize, limit: u64) -> PinsealResult<()> {
    let size = len as u64;
    if size > limit {
        return Err(PinsealError::SizeLimitExceeded { size, limit });
    }
    Ok(())
}

pub(crate) fn now_millis() -> Option<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_millis() as u64)
}

/// Whole-file encryptor parameterized by its AEAD capability
#[derive(Debug, Clone)]
pub struct Encryptor<C = AesGcm> {
    cipher: C,
    max_size: u64,
}

impl Default for Encryptor<AesGcm> {
    fn default() -> Self {
        Self::new(AesGcm::aes128())
    }
}

impl<C: AeadCipher> Encryptor<C> {
    pub fn new(cipher: C) -> Self {
        Self {
            cipher,
            max_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    pub fn with_max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Encrypt with a fresh nonce from the OS CSPRNG.
    pub fn encrypt(
        &self,
        file: &[u8],
        key: &str,
        info: &FileInfo,
    ) -> PinsealResult<(Vec<u8>, EncryptionMetadata)> {
        self.encrypt_with(&mut OsRng, file, key, info)
    }

    pub fn encrypt_with<R: SecureRandom + ?Sized>(
        &self,
        rng: &mut R,
        file: &[u8],
        key: &str,
        info: &FileInfo,
    ) -> PinsealResult<(Vec<u8>, EncryptionMetadata)> {
        check_size(file.len(), self.max_size)?;
        let material = derive_key_material_for(key, self.cipher.key_len())?;

        let nonce = random_nonce(rng);
        let ciphertext = self.cipher.seal(material.as_bytes(), &nonce, file)?;

        debug!(
            plaintext_len = file.len(),
            ciphertext_len = ciphertext.len(),
            key_source = ?material.source(),
            "file encrypted"
        );

        let metadata = EncryptionMetadata {
            algorithm: self.cipher.algorithm(),
            iv: encode_nonce(&nonce),
            original_file_name: info.name.clone(),
            original_file_size: info.size.or(Some(file.len() as u64)),
            original_file_type: info.mime_type.clone(),
            encryption_timestamp: now_millis(),
        };
        Ok((ciphertext, metadata))
    }

    /// Decrypt a ciphertext produced by [`Encryptor::encrypt`].
    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        metadata: &EncryptionMetadata,
        key: &str,
    ) -> PinsealResult<Vec<u8>> {
        if metadata.algorithm != self.cipher.algorithm() {
            return Err(PinsealError::UnsupportedAlgorithm(
                metadata.algorithm.to_string(),
            ));
        }
        let nonce = decode_nonce(&metadata.iv)?;
        let material = derive_key_material_for(key, self.cipher.key_len())?;
        self.cipher.open(material.as_bytes(), &nonce, ciphertext)
    }
}

/// Encrypt with the default AES-128-GCM encryptor and 15 MiB limit.
pub fn encrypt(file: &[u8], key: &str) -> PinsealResult<(Vec<u8>, EncryptionMetadata)> {
    Encryptor::default().encrypt(file, key, &FileInfo::default())
}

pub fn decrypt(ciphertext: &[u8], metadata: &EncryptionMetadata, key: &str) -> PinsealResult<Vec<u8>> {
    Encryptor::default().decrypt(ciphertext, metadata, key)
}
