//! pinseal-core: shared types, configuration, security presets, errors, and
//! the metadata store boundary used by the pinseal crates.

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::{PinsealConfig, SecurityPolicy, SecurityPreset};
pub use error::{ErrorKind, PinsealError, PinsealResult};
pub use store::{JsonFileStore, MemoryStore, MetadataStore};
pub use types::{
    Algorithm, EncryptionMetadata, FileInfo, LayerInfo, MultiLayerMetadata, StoredMetadata,
    MULTI_LAYER_VERSION,
};
