//! Candidate-driven recovery decryption
//!
//! When the metadata for a blob is lost or untrusted, the recovery decryptor
//! walks an ordered list of (algorithm, key size, IV source) guesses and
//! returns the first that authenticates. Each attempt is independent; the
//! caller observes progress and may cancel between attempts.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{debug, info};

use pinseal_core::{Algorithm, PinsealError, PinsealResult};

use crate::cipher::{decode_nonce, AeadCipher, AesGcm, ChaChaPoly};
use crate::keys::derive_key_material_for;
use crate::{KEY_SIZE, NONCE_SIZE, WIDE_KEY_SIZE};

/// Where an attempt takes its nonce from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IvSource {
    /// The base64 `iv` recorded in metadata
    Metadata,
    /// The first 12 bytes of the blob; the rest is the sealed body
    CiphertextPrefix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub algorithm: Algorithm,
    /// Key length in bytes
    pub key_len: usize,
    pub iv_source: IvSource,
}

impl Candidate {
    pub const fn new(algorithm: Algorithm, key_len: usize, iv_source: IvSource) -> Self {
        Self {
            algorithm,
            key_len,
            iv_source,
        }
    }

    fn cipher(&self) -> PinsealResult<Box<dyn AeadCipher>> {
        match (self.algorithm, self.key_len) {
            (Algorithm::AesGcm, KEY_SIZE) => Ok(Box::new(AesGcm::aes128())),
            (Algorithm::AesGcm, WIDE_KEY_SIZE) => Ok(Box::new(AesGcm::aes256())),
            (Algorithm::ChaCha20Poly1305, WIDE_KEY_SIZE) => Ok(Box::new(ChaChaPoly)),
            (alg, len) => Err(PinsealError::UnsupportedAlgorithm(format!(
                "{alg} with {}-bit key",
                len * 8
            ))),
        }
    }

    fn attempt(
        &self,
        ciphertext: &[u8],
        key: &str,
        metadata_iv: Option<&str>,
    ) -> PinsealResult<Vec<u8>> {
        let cipher = self.cipher()?;
        let material = derive_key_material_for(key, self.key_len)?;
        let (nonce, body) = match self.iv_source {
            IvSource::Metadata => {
                let iv = metadata_iv.ok_or_else(|| {
                    PinsealError::InvalidParameter("no metadata iv supplied".into())
                })?;
                (decode_nonce(iv)?, ciphertext)
            }
            IvSource::CiphertextPrefix => {
                if ciphertext.len() < NONCE_SIZE {
                    return Err(PinsealError::Decode(format!(
                        "blob shorter than a {NONCE_SIZE}-byte nonce prefix"
                    )));
                }
                let (prefix, body) = ciphertext.split_at(NONCE_SIZE);
                let mut nonce = [0u8; NONCE_SIZE];
                nonce.copy_from_slice(prefix);
                (nonce, body)
            }
        };
        cipher.open(material.as_bytes(), &nonce, body)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let iv = match self.iv_source {
            IvSource::Metadata => "metadata iv",
            IvSource::CiphertextPrefix => "prefixed iv",
        };
        write!(f, "{}-{} ({iv})", self.algorithm, self.key_len * 8)
    }
}

/// Reported before each attempt
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    /// 1-based attempt number
    pub attempt: usize,
    pub total: usize,
    pub candidate: Candidate,
}

#[derive(Debug)]
pub struct Recovered {
    pub plaintext: Vec<u8>,
    pub candidate: Candidate,
    pub attempts: usize,
}

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("no candidate decrypted the data ({} tried)", .0.len())]
    Exhausted(Vec<(Candidate, PinsealError)>),

    #[error("recovery cancelled after {attempts} attempts")]
    Cancelled { attempts: usize },
}

#[derive(Debug, Clone)]
pub struct Recovery {
    candidates: Vec<Candidate>,
}

impl Default for Recovery {
    fn default() -> Self {
        Self::new(default_candidates())
    }
}

/// AES-128-GCM first, then AES-256-GCM, then ChaCha20-Poly1305; metadata IV
/// before prefixed IV for each.
pub fn default_candidates() -> Vec<Candidate> {
    let mut out = Vec::with_capacity(6);
    for (algorithm, key_len) in [
        (Algorithm::AesGcm, KEY_SIZE),
        (Algorithm::AesGcm, WIDE_KEY_SIZE),
        (Algorithm::ChaCha20Poly1305, WIDE_KEY_SIZE),
    ] {
        for iv_source in [IvSource::Metadata, IvSource::CiphertextPrefix] {
            out.push(Candidate::new(algorithm, key_len, iv_source));
        }
    }
    out
}

impl Recovery {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn run<F>(
        &self,
        ciphertext: &[u8],
        key: &str,
        metadata_iv: Option<&str>,
        cancel: &AtomicBool,
        mut progress: F,
    ) -> Result<Recovered, RecoveryError>
    where
        F: FnMut(&Progress),
    {
        let total = self.candidates.len();
        let mut failures = Vec::new();

        for (i, candidate) in self.candidates.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                info!(attempts = i, "recovery cancelled");
                return Err(RecoveryError::Cancelled { attempts: i });
            }
            progress(&Progress {
                attempt: i + 1,
                total,
                candidate: *candidate,
            });

            match candidate.attempt(ciphertext, key, metadata_iv) {
                Ok(plaintext) => {
                    info!(%candidate, attempts = i + 1, "recovery succeeded");
                    return Ok(Recovered {
                        plaintext,
                        candidate: *candidate,
                        attempts: i + 1,
                    });
                }
                Err(e) => {
                    debug!(%candidate, error = %e, "recovery attempt failed");
                    failures.push((*candidate, e));
                }
            }
        }

        Err(RecoveryError::Exhausted(failures))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::random_nonce;
    use crate::keys::derive_key_material_256;
    use crate::single::encrypt;
    use pinseal_core::ErrorKind;
    use rand::rngs::OsRng;

    const KEY: &str = "00112233445566778899aabbccddeeff";
    const PASS: &str = "an old passphrase from a sticky note";

    fn run(ct: &[u8], key: &str, iv: Option<&str>) -> Result<Recovered, RecoveryError> {
        Recovery::default().run(ct, key, iv, &AtomicBool::new(false), |_| {})
    }

    #[test]
    fn test_default_candidate_order() {
        let c = default_candidates();
        assert_eq!(c.len(), 6);
        assert_eq!(c[0], Candidate::new(Algorithm::AesGcm, 16, IvSource::Metadata));
        assert_eq!(c[1].iv_source, IvSource::CiphertextPrefix);
        assert_eq!(c[2].key_len, 32);
        assert_eq!(c[5].algorithm, Algorithm::ChaCha20Poly1305);
    }

    #[test]
    fn test_first_candidate_matches_single_layer_output() {
        let (ct, meta) = encrypt(b"lost metadata", KEY).unwrap();
        let found = run(&ct, KEY, Some(&meta.iv)).unwrap();
        assert_eq!(found.plaintext, b"lost metadata");
        assert_eq!(found.attempts, 1);
        assert_eq!(found.candidate.iv_source, IvSource::Metadata);
    }

    #[test]
    fn test_prefixed_chacha_blob() {
        let material = derive_key_material_256(PASS).unwrap();
        let nonce = random_nonce(&mut OsRng);
        let mut blob = nonce.to_vec();
        blob.extend(ChaChaPoly.seal(material.as_bytes(), &nonce, b"legacy blob").unwrap());

        let mut seen = Vec::new();
        let found = Recovery::default()
            .run(&blob, PASS, None, &AtomicBool::new(false), |p| seen.push(p.attempt))
            .unwrap();
        assert_eq!(found.plaintext, b"legacy blob");
        assert_eq!(
            found.candidate,
            Candidate::new(Algorithm::ChaCha20Poly1305, 32, IvSource::CiphertextPrefix)
        );
        assert_eq!(found.attempts, 6);
        assert_eq!(seen, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_exhausted_collects_every_failure() {
        let (ct, meta) = encrypt(b"payload", KEY).unwrap();
        let err = run(&ct, "ffffffffffffffffffffffffffffffff", Some(&meta.iv)).unwrap_err();
        let RecoveryError::Exhausted(failures) = err else {
            panic!("expected exhaustion");
        };
        assert_eq!(failures.len(), 6);
        assert_eq!(failures[0].1.kind(), ErrorKind::Authentication);
        // A 128-bit raw key has no 256-bit form
        assert_eq!(failures[2].1.kind(), ErrorKind::InvalidKeyFormat);
    }

    #[test]
    fn test_cancel_between_attempts() {
        let (ct, _) = encrypt(b"payload", KEY).unwrap();
        let cancel = AtomicBool::new(false);
        let err = Recovery::default()
            .run(&ct, "wrong key entirely", None, &cancel, |p| {
                if p.attempt == 2 {
                    cancel.store(true, Ordering::Relaxed);
                }
            })
            .unwrap_err();
        assert!(matches!(err, RecoveryError::Cancelled { attempts: 2 }));
    }

    #[test]
    fn test_cancelled_before_start() {
        let err = Recovery::default()
            .run(b"", KEY, None, &AtomicBool::new(true), |_| {
                panic!("no attempt should be reported")
            })
            .unwrap_err();
        assert!(matches!(err, RecoveryError::Cancelled { attempts: 0 }));
    }

    #[test]
    fn test_short_blob_is_decode_failure() {
        let err = run(b"tiny", KEY, None).unwrap_err();
        let RecoveryError::Exhausted(failures) = err else {
            panic!("expected exhaustion");
        };
        assert_eq!(failures[1].1.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_unsupported_candidate() {
        let odd = Candidate::new(Algorithm::ChaCha20Poly1305, 16, IvSource::Metadata);
        let err = Recovery::new(vec![odd])
            .run(b"0123456789abcdef", KEY, Some("AAAAAAAAAAAAAAAA"), &AtomicBool::new(false), |_| {})
            .unwrap_err();
        let RecoveryError::Exhausted(failures) = err else {
            panic!("expected exhaustion");
        };
        assert_eq!(failures[0].1.kind(), ErrorKind::UnsupportedAlgorithm);
    }
}
