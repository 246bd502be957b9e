//! Threshold secret sharing over GF(256)
//!
//! A secret of `n` bytes becomes `total` shares, each `(x, y[0..n])` with a
//! distinct non-zero `x`. Any `threshold` shares reconstruct the secret by
//! Lagrange interpolation at zero; fewer reveal nothing about it.
//!
//! Shares travel as text: `"<x>:<hex(y)>"`, e.g. `"3:9f41c0..."`.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use rand::rngs::OsRng;
use sharks::Sharks;
use tracing::debug;
use zeroize::Zeroizing;

use pinseal_core::{PinsealError, PinsealResult};

use crate::cipher::SecureRandom;

/// Smallest threshold that still splits the secret
pub const MIN_THRESHOLD: u8 = 2;

/// One share of a split secret
#[derive(Clone, PartialEq, Eq)]
pub struct Share {
    x: u8,
    y: Vec<u8>,
}

impl Share {
    pub fn new(x: u8, y: Vec<u8>) -> PinsealResult<Self> {
        if x == 0 {
            return Err(PinsealError::Decode("share index must be non-zero".into()));
        }
        if y.is_empty() {
            return Err(PinsealError::Decode("share has no data".into()));
        }
        Ok(Self { x, y })
    }

    pub fn index(&self) -> u8 {
        self.x
    }

    pub fn data(&self) -> &[u8] {
        &self.y
    }

    fn to_sharks(&self) -> PinsealResult<sharks::Share> {
        let mut raw = Zeroizing::new(Vec::with_capacity(self.y.len() + 1));
        raw.push(self.x);
        raw.extend_from_slice(&self.y);
        sharks::Share::try_from(raw.as_slice())
            .map_err(|e| PinsealError::Decode(format!("share {}: {e}", self.x)))
    }

    fn from_sharks(share: &sharks::Share) -> PinsealResult<Self> {
        let raw = Zeroizing::new(Vec::<u8>::from(share));
        match raw.split_first() {
            Some((&x, y)) => Self::new(x, y.to_vec()),
            None => Err(PinsealError::Decode("empty share".into())),
        }
    }
}

impl Drop for Share {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut self.y);
    }
}

impl fmt::Debug for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Share")
            .field("x", &self.x)
            .field("len", &self.y.len())
            .finish()
    }
}

impl fmt::Display for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.x, hex::encode(&self.y))
    }
}

impl FromStr for Share {
    type Err = PinsealError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| PinsealError::Decode(format!("share must be '<index>:<hex>': {s:?}")))?;
        let x: u8 = x
            .parse()
            .map_err(|_| PinsealError::Decode(format!("share index out of range: {x:?}")))?;
        let y = hex::decode(y).map_err(|e| PinsealError::Decode(format!("share data: {e}")))?;
        Self::new(x, y)
    }
}

fn check_params(secret_len: usize, total: u8, threshold: u8) -> PinsealResult<()> {
    if secret_len == 0 {
        return Err(PinsealError::InvalidParameter("secret is empty".into()));
    }
    if threshold < MIN_THRESHOLD {
        return Err(PinsealError::InvalidParameter(format!(
            "threshold must be at least {MIN_THRESHOLD}, got {threshold}"
        )));
    }
    if threshold > total {
        return Err(PinsealError::InvalidParameter(format!(
            "threshold {threshold} exceeds share count {total}"
        )));
    }
    Ok(())
}

/// Split `secret` into `total` shares, any `threshold` of which recover it.
pub fn split(secret: &[u8], total: u8, threshold: u8) -> PinsealResult<Vec<Share>> {
    split_with(&mut OsRng, secret, total, threshold)
}

pub fn split_with<R: SecureRandom>(
    rng: &mut R,
    secret: &[u8],
    total: u8,
    threshold: u8,
) -> PinsealResult<Vec<Share>> {
    check_params(secret.len(), total, threshold)?;

    let shares = Sharks(threshold)
        .dealer_rng(secret, rng)
        .take(total as usize)
        .map(|s| Share::from_sharks(&s))
        .collect::<PinsealResult<Vec<_>>>()?;

    debug!(total, threshold, secret_len = secret.len(), "secret split");
    Ok(shares)
}

/// Reconstruct a secret from at least `threshold` shares.
///
/// Extra shares beyond the threshold are accepted. Two shares with the same
/// index are rejected rather than silently deduplicated.
pub fn combine(shares: &[Share], threshold: u8) -> PinsealResult<Zeroizing<Vec<u8>>> {
    if threshold < MIN_THRESHOLD {
        return Err(PinsealError::InvalidParameter(format!(
            "threshold must be at least {MIN_THRESHOLD}, got {threshold}"
        )));
    }
    if shares.len() < threshold as usize {
        return Err(PinsealError::InsufficientShares {
            needed: threshold as usize,
            got: shares.len(),
        });
    }

    let mut seen = HashSet::with_capacity(shares.len());
    for share in shares {
        if !seen.insert(share.x) {
            return Err(PinsealError::DuplicateShare(share.x));
        }
    }
    let len = shares[0].y.len();
    if let Some(odd) = shares.iter().find(|s| s.y.len() != len) {
        return Err(PinsealError::Decode(format!(
            "share {} has {} bytes, expected {len}",
            odd.x,
            odd.y.len()
        )));
    }

    let converted = shares
        .iter()
        .map(Share::to_sharks)
        .collect::<PinsealResult<Vec<_>>>()?;
    let secret = Sharks(threshold)
        .recover(converted.iter())
        .map_err(|e| PinsealError::Decode(format!("share recovery failed: {e}")))?;

    debug!(shares = shares.len(), threshold, "secret recovered");
    Ok(Zeroizing::new(secret))
}

/// Split a primary key string into textual shares.
pub fn split_key(key: &str, total: u8, threshold: u8) -> PinsealResult<Vec<String>> {
    let shares = split(key.as_bytes(), total, threshold)?;
    Ok(shares.iter().map(Share::to_string).collect())
}

/// Parse textual shares and recover the primary key string.
pub fn combine_key<S: AsRef<str>>(shares: &[S], threshold: u8) -> PinsealResult<Zeroizing<String>> {
    let parsed = shares
        .iter()
        .map(|s| s.as_ref().parse::<Share>())
        .collect::<PinsealResult<Vec<_>>>()?;
    let secret = combine(&parsed, threshold)?;
    let key = std::str::from_utf8(&secret)
        .map_err(|_| PinsealError::Decode("recovered key is not valid UTF-8".into()))?;
    Ok(Zeroizing::new(key.to_owned()))
}
