// src/dedup/fingerprint.rs
//! Article identity → fixed-length store key.
//!
//! Raw URLs carry `/`, `?`, unbounded length and other characters most
//! key-value backends reject, so every store is keyed by the SHA-256 of the
//! url instead. The url is hashed verbatim: two spellings of one page are two
//! articles as far as dedup is concerned.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::error::FingerprintError;

pub const FINGERPRINT_HEX_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parse a key read back from a store. Rejects anything that is not a
    /// lowercase 64-char hex digest.
    pub fn from_hex(s: &str) -> Option<Self> {
        let s = s.trim();
        let ok = s.len() == FINGERPRINT_HEX_LEN
            && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        ok.then(|| Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn fingerprint(url: &str) -> Result<Fingerprint, FingerprintError> {
    if url.trim().is_empty() {
        return Err(FingerprintError::MissingUrl);
    }
    let digest = Sha256::digest(url.as_bytes());
    let mut out = String::with_capacity(FINGERPRINT_HEX_LEN);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    Ok(Fingerprint(out))
}
