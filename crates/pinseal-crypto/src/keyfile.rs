//! Plain-text key files
//!
//! The dashboard offers the primary key for download as a small text document.
//! The only line that matters on the way back in is
//! `ENCRYPTION KEY: <32 to 64 lowercase hex chars>`.

use std::fmt::Write as _;

use pinseal_core::{EncryptionMetadata, PinsealError, PinsealResult};

const MARKER: &str = "ENCRYPTION KEY:";
const MIN_HEX: usize = 32;
const MAX_HEX: usize = 64;

fn is_lower_hex(c: char) -> bool {
    matches!(c, '0'..='9' | 'a'..='f')
}

/// Pull the first usable key out of a key-file document.
///
/// Takes the first marker followed (after optional whitespace) by at least 32
/// lowercase hex chars, and returns at most 64 of them.
pub fn extract_key(text: &str) -> Option<String> {
    let mut rest = text;
    while let Some(pos) = rest.find(MARKER) {
        let after = &rest[pos + MARKER.len()..];
        let candidate = after.trim_start();
        let run: String = candidate
            .chars()
            .take_while(|&c| is_lower_hex(c))
            .take(MAX_HEX)
            .collect();
        if run.len() >= MIN_HEX {
            return Some(run);
        }
        rest = after;
    }
    None
}

/// Render the downloadable key file for an encrypted upload.
///
/// Only raw 32- or 64-char hex keys can be written, lowercased so that
/// [`extract_key`] reads them back. Passphrases are rejected with
/// `InvalidKeyFormat`.
pub fn render_key_file(key: &str, metadata: &EncryptionMetadata) -> PinsealResult<String> {
    let key = key.trim();
    if !matches!(key.len(), MIN_HEX | MAX_HEX) || !key.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(PinsealError::InvalidKeyFormat(
            "only 32 or 64 hex char keys can be saved to a key file".into(),
        ));
    }
    let key = key.to_ascii_lowercase();

    let mut out = String::new();
    out.push_str("PINSEAL ENCRYPTION KEY\n");
    out.push_str("======================\n\n");
    if let Some(name) = &metadata.original_file_name {
        let _ = writeln!(out, "File: {name}");
    }
    if let Some(size) = metadata.original_file_size {
        let _ = writeln!(out, "Size: {size} bytes");
    }
    if let Some(mime) = &metadata.original_file_type {
        let _ = writeln!(out, "Type: {mime}");
    }
    if let Some(ts) = metadata.encryption_timestamp {
        let _ = writeln!(out, "Encrypted at (unix ms): {ts}");
    }
    let _ = writeln!(out, "Algorithm: {}", metadata.algorithm);
    let _ = writeln!(out, "IV: {}", metadata.iv);
    let _ = writeln!(out, "\n{MARKER} {key}\n");
    out.push_str("Keep this file private. Anyone holding it can decrypt the file;\n");
    out.push_str("without it the file cannot be recovered.\n");
    Ok(out)
}
