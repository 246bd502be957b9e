use serde::{Deserialize, Serialize};
use std::fmt;

/// The only multi-layer metadata format version currently defined.
pub const MULTI_LAYER_VERSION: &str = "1.0";

/// AEAD algorithm identifiers as they appear in metadata records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    #[serde(rename = "AES-GCM")]
    AesGcm,
    #[serde(rename = "ChaCha20-Poly1305")]
    ChaCha20Poly1305,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::AesGcm => "AES-GCM",
            Algorithm::ChaCha20Poly1305 => "ChaCha20-Poly1305",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Informational description of the file being encrypted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: Option<String>,
    pub size: Option<u64>,
    pub mime_type: Option<String>,
}

/// Metadata produced by single-layer encryption and required to decrypt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionMetadata {
    pub algorithm: Algorithm,
    /// Base64 of the 12-byte nonce
    pub iv: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_file_type: Option<String>,
    /// Unix timestamp in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_timestamp: Option<u64>,
}

/// One applied encryption layer, in application order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerInfo {
    pub algorithm: Algorithm,
    /// Base64 of the 12-byte nonce used for this layer
    #[serde(rename = "ivBase64")]
    pub iv: String,
    pub layer_index: u32,
}

/// Metadata produced by multi-layer ("onion") encryption.
///
/// `layers` is ordered as applied; the last entry is the outermost layer and
/// the first one removed on decryption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiLayerMetadata {
    pub version: String,
    pub layers: Vec<LayerInfo>,
    /// `"<base64 ciphertext>.<base64 iv>"` of the JSON layer-key array
    pub encrypted_layer_keys: String,
    pub encryption_id: String,
}

impl MultiLayerMetadata {
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

/// A metadata record as handed to a [`crate::store::MetadataStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "kebab-case")]
pub enum StoredMetadata {
    SingleLayer(EncryptionMetadata),
    MultiLayer(MultiLayerMetadata),
}

impl From<EncryptionMetadata> for StoredMetadata {
    fn from(meta: EncryptionMetadata) -> Self {
        StoredMetadata::SingleLayer(meta)
    }
}

impl From<MultiLayerMetadata> for StoredMetadata {
    fn from(meta: MultiLayerMetadata) -> Self {
        StoredMetadata::MultiLayer(meta)
    }
}
