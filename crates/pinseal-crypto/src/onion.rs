//! Multi-layer ("onion") encryption
//!
//! ```text
//! buf_0 = file
//! buf_i+1 = AEAD(layer_key_i, nonce_i)(buf_i)        for i in 0..L
//! encryptedLayerKeys = b64(AEAD(primary, n)(json[hex(layer_key_0), ...])) "." b64(n)
//! ```
//!
//! Decryption removes layers last-applied-first. Unwrapping the layer-key
//! bundle is the only step that can report [`PinsealError::KeyRecovery`]; a
//! failure on any individual layer is [`PinsealError::Authentication`] for the
//! whole call.

use rand::rngs::OsRng;
use rand::RngCore;
use tracing::debug;
use zeroize::Zeroizing;

use pinseal_core::config::DEFAULT_MAX_FILE_SIZE;
use pinseal_core::{
    LayerInfo, MultiLayerMetadata, PinsealError, PinsealResult, MULTI_LAYER_VERSION,
};

use crate::cipher::{decode_nonce, encode_nonce, random_nonce, AeadCipher, AesGcm, SecureRandom};
use crate::keys::{base64_to_buffer, buffer_to_base64, derive_key_material_for, LayerKey};
use crate::single::check_size;

/// Layer count used when no security preset says otherwise
pub const DEFAULT_LAYERS: usize = 3;

#[derive(Debug, Clone)]
pub struct OnionEncryptor<C = AesGcm> {
    cipher: C,
    max_size: u64,
}

impl Default for OnionEncryptor<AesGcm> {
    fn default() -> Self {
        Self::new(AesGcm::aes128())
    }
}

impl<C: AeadCipher> OnionEncryptor<C> {
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

    pub fn encrypt(
        &self,
        file: &[u8],
        primary_key: &str,
        layers: usize,
    ) -> PinsealResult<(Vec<u8>, MultiLayerMetadata)> {
        self.encrypt_with(&mut OsRng, file, primary_key, layers)
    }

    pub fn encrypt_with<R: SecureRandom + ?Sized>(
        &self,
        rng: &mut R,
        file: &[u8],
        primary_key: &str,
        layers: usize,
    ) -> PinsealResult<(Vec<u8>, MultiLayerMetadata)> {
        check_size(file.len(), self.max_size)?;
        if layers == 0 {
            return Err(PinsealError::InvalidParameter(
                "layer count must be at least 1".into(),
            ));
        }
        if self.cipher.key_len() != crate::KEY_SIZE {
            return Err(PinsealError::InvalidParameter(format!(
                "onion layers use 128-bit keys; {} needs {} bytes",
                self.cipher.algorithm(),
                self.cipher.key_len()
            )));
        }
        let primary = derive_key_material_for(primary_key, self.cipher.key_len())?;

        let mut keys = Vec::with_capacity(layers);
        let mut infos = Vec::with_capacity(layers);
        let mut buffer = file.to_vec();

        for index in 0..layers {
            let key = LayerKey::generate(rng);
            let nonce = random_nonce(rng);
            buffer = self.cipher.seal(key.as_bytes(), &nonce, &buffer)?;
            infos.push(LayerInfo {
                algorithm: self.cipher.algorithm(),
                iv: encode_nonce(&nonce),
                layer_index: index as u32,
            });
            keys.push(key);
        }

        let encrypted_layer_keys = self.wrap_layer_keys(rng, &keys, primary.as_bytes())?;

        let mut id = [0u8; 16];
        rng.fill_bytes(&mut id);
        let encryption_id = uuid::Builder::from_random_bytes(id)
            .into_uuid()
            .to_string();

        debug!(
            layers,
            plaintext_len = file.len(),
            ciphertext_len = buffer.len(),
            encryption_id = %encryption_id,
            "onion encryption complete"
        );

        Ok((
            buffer,
            MultiLayerMetadata {
                version: MULTI_LAYER_VERSION.to_string(),
                layers: infos,
                encrypted_layer_keys,
                encryption_id,
            },
        ))
    }

    pub fn decrypt(
        &self,
        ciphertext: &[u8],
        metadata: &MultiLayerMetadata,
        primary_key: &str,
    ) -> PinsealResult<Vec<u8>> {
        if metadata.version != MULTI_LAYER_VERSION {
            return Err(PinsealError::UnsupportedVersion(metadata.version.clone()));
        }
        if let Some(layer) = metadata
            .layers
            .iter()
            .find(|l| l.algorithm != self.cipher.algorithm())
        {
            return Err(PinsealError::UnsupportedAlgorithm(layer.algorithm.to_string()));
        }

        let primary = derive_key_material_for(primary_key, self.cipher.key_len())?;
        let keys = self.unwrap_layer_keys(&metadata.encrypted_layer_keys, primary.as_bytes())?;

        // Fail before touching any layer if metadata and key bundle disagree
        let mismatch = PinsealError::LayerCountMismatch {
            layers: metadata.layers.len(),
            keys: keys.len(),
        };
        if keys.len() != metadata.layers.len() {
            return Err(mismatch);
        }
        if metadata
            .layers
            .iter()
            .any(|l| l.layer_index as usize >= keys.len())
        {
            return Err(mismatch);
        }

        let mut buffer = ciphertext.to_vec();
        for layer in metadata.layers.iter().rev() {
            let key = &keys[layer.layer_index as usize];
            let nonce = decode_nonce(&layer.iv)?;
            buffer = self
                .cipher
                .open(key.as_bytes(), &nonce, &buffer)
                .map_err(|_| PinsealError::Authentication)?;
        }

        debug!(
            layers = keys.len(),
            plaintext_len = buffer.len(),
            "onion decryption complete"
        );
        Ok(buffer)
    }

    fn wrap_layer_keys<R: SecureRandom + ?Sized>(
        &self,
        rng: &mut R,
        keys: &[LayerKey],
        primary: &[u8],
    ) -> PinsealResult<String> {
        let hex_keys: Vec<Zeroizing<String>> = keys.iter().map(LayerKey::to_hex).collect();
        let refs: Vec<&str> = hex_keys.iter().map(|k| k.as_str()).collect();
        let json = Zeroizing::new(serde_json::to_vec(&refs)?);

        let nonce = random_nonce(rng);
        let sealed = self.cipher.seal(primary, &nonce, &json)?;
        Ok(format!("{}.{}", buffer_to_base64(&sealed), encode_nonce(&nonce)))
    }

    fn unwrap_layer_keys(&self, bundle: &str, primary: &[u8]) -> PinsealResult<Vec<LayerKey>> {
        let (ct_b64, iv_b64) = bundle.split_once('.').ok_or_else(|| {
            PinsealError::Decode("encryptedLayerKeys must be '<ciphertext>.<iv>'".into())
        })?;
        let sealed = base64_to_buffer(ct_b64)?;
        let nonce = decode_nonce(iv_b64)?;

        let json = Zeroizing::new(
            self.cipher
                .open(primary, &nonce, &sealed)
                .map_err(|_| PinsealError::KeyRecovery)?,
        );
        let hex_keys: Vec<Zeroizing<String>> = serde_json::from_slice::<Vec<String>>(&json)
            .map_err(|e| PinsealError::Decode(format!("layer key bundle: {e}")))?
            .into_iter()
            .map(Zeroizing::new)
            .collect();

        hex_keys.iter().map(|k| LayerKey::from_hex(k)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::ChaChaPoly;
    use pinseal_core::ErrorKind;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const PRIMARY: &str = "00112233445566778899aabbccddeeff";

    fn onion() -> OnionEncryptor {
        OnionEncryptor::default()
    }

    #[test]
    fn test_roundtrip_layer_counts() {
        let data = b"multi-layer protected payload".to_vec();
        for layers in [1usize, 2, 3, 5] {
            let (ct, meta) = onion().encrypt(&data, PRIMARY, layers).unwrap();
            assert_eq!(meta.layers.len(), layers);
            assert_eq!(ct.len(), data.len() + layers * crate::TAG_SIZE);
            assert_eq!(onion().decrypt(&ct, &meta, PRIMARY).unwrap(), data);
        }
    }

    #[test]
    fn test_metadata_shape() {
        let (_, meta) = onion().encrypt(b"x", PRIMARY, DEFAULT_LAYERS).unwrap();
        assert_eq!(meta.version, "1.0");
        let indices: Vec<u32> = meta.layers.iter().map(|l| l.layer_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        let (ct, iv) = meta.encrypted_layer_keys.split_once('.').unwrap();
        assert!(!ct.is_empty());
        assert_eq!(base64_to_buffer(iv).unwrap().len(), 12);
        assert_eq!(meta.encryption_id.len(), 36);
    }

    #[test]
    fn test_layer_keys_are_fresh_per_call() {
        let (ct1, m1) = onion().encrypt(b"same", PRIMARY, 2).unwrap();
        let (ct2, m2) = onion().encrypt(b"same", PRIMARY, 2).unwrap();
        assert_ne!(ct1, ct2);
        assert_ne!(m1.encrypted_layer_keys, m2.encrypted_layer_keys);
        assert_ne!(m1.encryption_id, m2.encryption_id);
    }

    #[test]
    fn test_seeded_rng_is_deterministic() {
        let mut a = StdRng::seed_from_u64(42);
        let mut b = StdRng::seed_from_u64(42);
        let (ct1, m1) = onion().encrypt_with(&mut a, b"det", PRIMARY, 3).unwrap();
        let (ct2, m2) = onion().encrypt_with(&mut b, b"det", PRIMARY, 3).unwrap();
        assert_eq!(ct1, ct2);
        assert_eq!(m1, m2);
    }

    #[test]
    fn test_wrong_primary_key_is_key_recovery_error() {
        let (ct, meta) = onion().encrypt(b"payload", PRIMARY, 3).unwrap();
        let err = onion()
            .decrypt(&ct, &meta, "ffffffffffffffffffffffffffffffff")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyRecovery);
    }

    #[test]
    fn test_corrupt_layer_is_authentication_error() {
        let (mut ct, meta) = onion().encrypt(b"payload", PRIMARY, 3).unwrap();
        ct[0] ^= 0x80;
        let err = onion().decrypt(&ct, &meta, PRIMARY).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn test_reordered_layers_fail() {
        let (ct, mut meta) = onion().encrypt(b"payload", PRIMARY, 3).unwrap();
        meta.layers.swap(0, 2);
        let err = onion().decrypt(&ct, &meta, PRIMARY).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn test_unsupported_version() {
        let (ct, mut meta) = onion().encrypt(b"payload", PRIMARY, 1).unwrap();
        meta.version = "2.0".into();
        assert!(matches!(
            onion().decrypt(&ct, &meta, PRIMARY),
            Err(PinsealError::UnsupportedVersion(v)) if v == "2.0"
        ));
    }

    #[test]
    fn test_layer_count_mismatch() {
        let (ct, mut meta) = onion().encrypt(b"payload", PRIMARY, 3).unwrap();
        meta.layers.pop();
        assert!(matches!(
            onion().decrypt(&ct, &meta, PRIMARY),
            Err(PinsealError::LayerCountMismatch { layers: 2, keys: 3 })
        ));

        let (ct, mut meta) = onion().encrypt(b"payload", PRIMARY, 2).unwrap();
        meta.layers[1].layer_index = 7;
        assert_eq!(
            onion().decrypt(&ct, &meta, PRIMARY).unwrap_err().kind(),
            ErrorKind::LayerCountMismatch
        );
    }

    #[test]
    fn test_malformed_bundle_is_decode_error() {
        let (ct, mut meta) = onion().encrypt(b"payload", PRIMARY, 1).unwrap();
        meta.encrypted_layer_keys = "no-separator".into();
        assert_eq!(
            onion().decrypt(&ct, &meta, PRIMARY).unwrap_err().kind(),
            ErrorKind::Decode
        );
    }

    #[test]
    fn test_zero_layers_rejected() {
        assert!(matches!(
            onion().encrypt(b"payload", PRIMARY, 0),
            Err(PinsealError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_wide_cipher_rejected() {
        let wide = OnionEncryptor::new(ChaChaPoly);
        assert!(matches!(
            wide.encrypt(b"payload", PRIMARY, 1),
            Err(PinsealError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_size_guard() {
        let small = OnionEncryptor::default().with_max_size(4);
        assert_eq!(
            small.encrypt(b"12345", PRIMARY, 1).unwrap_err().kind(),
            ErrorKind::SizeLimitExceeded
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn roundtrip_any_payload(
            data in proptest::collection::vec(any::<u8>(), 0..=1024),
            layers in 1usize..=5,
            passphrase in "[a-z ]{1,40}",
        ) {
            prop_assume!(!passphrase.trim().is_empty());
            let (ct, meta) = onion().encrypt(&data, &passphrase, layers).unwrap();
            prop_assert_eq!(onion().decrypt(&ct, &meta, &passphrase).unwrap(), data);
        }
    }
}
