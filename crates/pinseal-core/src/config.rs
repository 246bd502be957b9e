use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{PinsealError, PinsealResult};

/// Default upload cap: 15 MiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 15 * 1024 * 1024;

/// Default fixed chunk size for integrity trees: 1 MiB
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Top-level configuration (loaded from pinseal.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PinsealConfig {
    pub security: SecurityConfig,
    pub limits: LimitsConfig,
    pub chunking: ChunkingConfig,
    pub logging: LoggingConfig,
    pub store: StoreConfig,
}

impl PinsealConfig {
    /// Load configuration from a TOML file. A missing file yields defaults.
    pub fn load(path: &Path) -> PinsealResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| PinsealError::Config(format!("parsing {}: {e}", path.display())))
    }

    pub fn from_toml_str(s: &str) -> PinsealResult<Self> {
        toml::from_str(s).map_err(|e| PinsealError::Config(e.to_string()))
    }
}

// ── Security presets ──────────────────────────────────────────────────────────

/// Named security presets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityPreset {
    #[default]
    Standard,
    High,
    Maximum,
}

impl SecurityPreset {
    pub const ALL: [SecurityPreset; 3] = [
        SecurityPreset::Standard,
        SecurityPreset::High,
        SecurityPreset::Maximum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityPreset::Standard => "standard",
            SecurityPreset::High => "high",
            SecurityPreset::Maximum => "maximum",
        }
    }

    /// The policy parameters this preset stands for.
    pub fn policy(&self) -> SecurityPolicy {
        match self {
            SecurityPreset::Standard => SecurityPolicy {
                preset: *self,
                layers: 3,
                key_rotation_days: 90,
                total_shares: 3,
                threshold: 2,
            },
            SecurityPreset::High => SecurityPolicy {
                preset: *self,
                layers: 5,
                key_rotation_days: 30,
                total_shares: 5,
                threshold: 3,
            },
            SecurityPreset::Maximum => SecurityPolicy {
                preset: *self,
                layers: 7,
                key_rotation_days: 7,
                total_shares: 7,
                threshold: 4,
            },
        }
    }
}

impl fmt::Display for SecurityPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityPreset {
    type Err = PinsealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(SecurityPreset::Standard),
            "high" => Ok(SecurityPreset::High),
            "maximum" => Ok(SecurityPreset::Maximum),
            other => Err(PinsealError::Config(format!("unknown security preset '{other}'"))),
        }
    }
}

/// Resolved parameters consumed by the encryption and secret-sharing components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    pub preset: SecurityPreset,
    /// Number of onion layers
    pub layers: usize,
    /// Primary key rotation period in days
    pub key_rotation_days: u32,
    /// Shares produced when splitting the primary key
    pub total_shares: u8,
    /// Shares required to reconstruct the primary key
    pub threshold: u8,
}

impl SecurityPolicy {
    pub fn rotation_period(&self) -> Duration {
        Duration::from_secs(u64::from(self.key_rotation_days) * 86400)
    }

    pub fn validate(&self) -> PinsealResult<()> {
        if self.layers == 0 {
            return Err(PinsealError::Config("layers must be at least 1".into()));
        }
        if self.threshold < 2 {
            return Err(PinsealError::Config("threshold must be at least 2".into()));
        }
        if self.threshold > self.total_shares {
            return Err(PinsealError::Config(format!(
                "threshold {} exceeds total shares {}",
                self.threshold, self.total_shares
            )));
        }
        Ok(())
    }
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        SecurityPreset::default().policy()
    }
}

/// `[security]` section: a preset plus optional per-field overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub preset: SecurityPreset,
    pub layers: Option<usize>,
    pub key_rotation_days: Option<u32>,
    pub total_shares: Option<u8>,
    pub threshold: Option<u8>,
}

impl SecurityConfig {
    /// Resolve the preset and overrides into a validated policy.
    pub fn effective(&self) -> PinsealResult<SecurityPolicy> {
        let base = self.preset.policy();
        let policy = SecurityPolicy {
            preset: self.preset,
            layers: self.layers.unwrap_or(base.layers),
            key_rotation_days: self.key_rotation_days.unwrap_or(base.key_rotation_days),
            total_shares: self.total_shares.unwrap_or(base.total_shares),
            threshold: self.threshold.unwrap_or(base.threshold),
        };
        policy.validate()?;
        Ok(policy)
    }
}

// ── Other sections ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted input in bytes (default: 15 MiB)
    pub max_file_size: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Fixed chunk size in bytes for integrity trees (default: 1 MiB)
    pub chunk_size: usize,
    /// Use content-defined (FastCDC) boundaries instead of fixed-size chunks
    pub content_defined: bool,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            content_defined: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON metadata store path; metadata is not recorded when unset
    pub metadata_path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[security]
preset = "high"
layers = 4

[limits]
max_file_size = 1048576

[chunking]
chunk_size = 65536
content_defined = true

[logging]
level = "debug"
format = "json"

[store]
metadata_path = "/var/lib/pinseal/metadata.json"
"#;
        let config = PinsealConfig::from_toml_str(toml_str).unwrap();

        assert_eq!(config.security.preset, SecurityPreset::High);
        assert_eq!(config.limits.max_file_size, 1048576);
        assert_eq!(config.chunking.chunk_size, 65536);
        assert!(config.chunking.content_defined);
        assert_eq!(config.logging.format, "json");
        assert_eq!(
            config.store.metadata_path,
            Some(PathBuf::from("/var/lib/pinseal/metadata.json"))
        );

        let policy = config.security.effective().unwrap();
        assert_eq!(policy.layers, 4);
        assert_eq!(policy.total_shares, 5);
        assert_eq!(policy.threshold, 3);
    }

    #[test]
    fn test_parse_defaults() {
        let config = PinsealConfig::from_toml_str("").unwrap();

        assert_eq!(config.security.preset, SecurityPreset::Standard);
        assert_eq!(config.limits.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.chunking.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(config.logging.level, "info");
        assert!(config.store.metadata_path.is_none());

        let policy = config.security.effective().unwrap();
        assert_eq!(policy.layers, 3);
    }

    #[test]
    fn test_presets_are_ordered_by_strength() {
        let policies: Vec<_> = SecurityPreset::ALL.iter().map(|p| p.policy()).collect();
        for pair in policies.windows(2) {
            assert!(pair[0].layers < pair[1].layers);
            assert!(pair[0].key_rotation_days > pair[1].key_rotation_days);
            assert!(pair[0].threshold <= pair[1].threshold);
        }
        for p in &policies {
            p.validate().unwrap();
        }
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let config = PinsealConfig::from_toml_str(
            r#"
[security]
total_shares = 2
threshold = 3
"#,
        )
        .unwrap();
        assert!(config.security.effective().is_err());

        let zero_layers = SecurityConfig {
            layers: Some(0),
            ..Default::default()
        };
        assert!(zero_layers.effective().is_err());
    }

    #[test]
    fn test_unknown_preset_rejected() {
        assert!(PinsealConfig::from_toml_str("[security]\npreset = \"paranoid\"").is_err());
        assert_eq!("MAXIMUM".parse::<SecurityPreset>().unwrap(), SecurityPreset::Maximum);
        assert!("paranoid".parse::<SecurityPreset>().is_err());
    }

    #[test]
    fn test_rotation_period() {
        let policy = SecurityPreset::Maximum.policy();
        assert_eq!(policy.rotation_period(), Duration::from_secs(7 * 86400));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PinsealConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.security.preset, SecurityPreset::Standard);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = PinsealConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = PinsealConfig::from_toml_str(&toml_str).unwrap();

        assert_eq!(config.security.preset, parsed.security.preset);
        assert_eq!(config.limits.max_file_size, parsed.limits.max_file_size);
        assert_eq!(config.logging.level, parsed.logging.level);
    }
}
