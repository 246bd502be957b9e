//! Metadata store boundary — where encryption metadata lives between an
//! encrypt call and the matching decrypt call.
//!
//! Records are keyed by a caller-chosen content hash (the dashboard uses the
//! IPFS CID); the store never derives keys itself.
//!
//! Two backends are available:
//!   - **memory**: a plain map, for tests and short-lived sessions.
//!   - **JSON file**: loaded entirely into memory, flushed atomically via temp+rename.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{PinsealError, PinsealResult};
use crate::types::StoredMetadata;

/// Key/value persistence for metadata records
pub trait MetadataStore {
    fn get(&self, key: &str) -> PinsealResult<Option<StoredMetadata>>;
    fn put(&mut self, key: &str, metadata: StoredMetadata) -> PinsealResult<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, StoredMetadata>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MetadataStore for MemoryStore {
    fn get(&self, key: &str) -> PinsealResult<Option<StoredMetadata>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, metadata: StoredMetadata) -> PinsealResult<()> {
        self.entries.insert(key.to_string(), metadata);
        Ok(())
    }
}

/// In-memory map persisted to a JSON file on every `put`
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: HashMap<String, StoredMetadata>,
}

impl JsonFileStore {
    /// Load or create a store at the given path.
    /// If the file doesn't exist, starts empty.
    pub fn open(path: &Path) -> PinsealResult<Self> {
        let entries = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content).map_err(|e| {
                PinsealError::Store(format!("parsing metadata store {}: {e}", path.display()))
            })?
        } else {
            HashMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn flush(&self) -> PinsealResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(&self.entries)?;

        // Atomic write: write to temp file, then rename
        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &self.path)?;

        tracing::debug!(
            path = %self.path.display(),
            entries = self.entries.len(),
            "metadata store flushed"
        );
        Ok(())
    }
}

impl MetadataStore for JsonFileStore {
    fn get(&self, key: &str) -> PinsealResult<Option<StoredMetadata>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, metadata: StoredMetadata) -> PinsealResult<()> {
        self.entries.insert(key.to_string(), metadata);
        self.flush()
    }
}
