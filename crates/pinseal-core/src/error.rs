use thiserror::Error;

pub type PinsealResult<T> = Result<T, PinsealError>;

#[derive(Debug, Error)]
pub enum PinsealError {
    #[error("input too large: {size} bytes (limit {limit})")]
    SizeLimitExceeded { size: u64, limit: u64 },

    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("authentication failed: wrong key, wrong nonce, or corrupted data")]
    Authentication,

    #[error("layer key recovery failed: the primary key is wrong")]
    KeyRecovery,

    #[error("insufficient shares: need {needed}, got {got}")]
    InsufficientShares { needed: usize, got: usize },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("unsupported metadata version: {0}")]
    UnsupportedVersion(String),

    #[error("layer count mismatch: metadata lists {layers} layers, recovered {keys} keys")]
    LayerCountMismatch { layers: usize, keys: usize },

    #[error("duplicate share index: {0}")]
    DuplicateShare(u8),

    #[error("invalid nonce length: {0} bytes (expected 12)")]
    InvalidNonce(usize),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Fieldless error category, for callers that branch on the failure class
/// (troubleshooting flows, recovery diagnostics).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SizeLimitExceeded,
    InvalidKeyFormat,
    Authentication,
    KeyRecovery,
    InsufficientShares,
    Decode,
    UnsupportedVersion,
    LayerCountMismatch,
    DuplicateShare,
    InvalidNonce,
    UnsupportedAlgorithm,
    InvalidParameter,
    Config,
    Store,
    Io,
    Other,
}

impl PinsealError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SizeLimitExceeded { .. } => ErrorKind::SizeLimitExceeded,
            Self::InvalidKeyFormat(_) => ErrorKind::InvalidKeyFormat,
            Self::Authentication => ErrorKind::Authentication,
            Self::KeyRecovery => ErrorKind::KeyRecovery,
            Self::InsufficientShares { .. } => ErrorKind::InsufficientShares,
            Self::Decode(_) | Self::Json(_) => ErrorKind::Decode,
            Self::UnsupportedVersion(_) => ErrorKind::UnsupportedVersion,
            Self::LayerCountMismatch { .. } => ErrorKind::LayerCountMismatch,
            Self::DuplicateShare(_) => ErrorKind::DuplicateShare,
            Self::InvalidNonce(_) => ErrorKind::InvalidNonce,
            Self::UnsupportedAlgorithm(_) => ErrorKind::UnsupportedAlgorithm,
            Self::InvalidParameter(_) => ErrorKind::InvalidParameter,
            Self::Config(_) => ErrorKind::Config,
            Self::Store(_) => ErrorKind::Store,
            Self::Io(_) => ErrorKind::Io,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    /// True for failures where retrying with a different key or algorithm
    /// guess is meaningful.
    pub fn is_retryable_guess(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Authentication | ErrorKind::KeyRecovery | ErrorKind::InvalidNonce
        )
    }
}
