//! Hashing utilities for artifact fingerprints and release checksums.
//!
//! This module provides:
//! - `Fingerprint`: a 64-character SHA-256 identifying the inputs of a build
//! - `Hashable`: fingerprinting of any serializable value
//! - `hash_file()`: single file hashing

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub type HashError = serde_json::Error;

/// A full SHA-256 over the inputs that produced an artifact.
///
/// # Format
///
/// Lowercase hexadecimal, 64 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl std::fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

pub trait Hashable: Serialize {
  /// Hash the JSON serialization of `self`, salted with `extra`.
  fn fingerprint(&self, extra: &str) -> Result<Fingerprint, HashError> {
    let serialized = serde_json::to_string(self)?;
    let mut hasher = Sha256::new();
    hasher.update(serialized.as_bytes());
    hasher.update(b"\n");
    hasher.update(extra.as_bytes());
    Ok(Fingerprint(hex::encode(hasher.finalize())))
  }
}

/// Hash a file's contents.
///
/// Returns the full 64-character SHA256 hash of the file.
pub fn hash_file(path: &Path) -> std::io::Result<Fingerprint> {
  let mut file = fs::File::open(path)?;

  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(Fingerprint(hex::encode(hasher.finalize())))
}
