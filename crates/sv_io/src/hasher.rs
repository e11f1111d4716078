//! crates/sv_io/src/hasher.rs
//!
//! SHA-256 digests over canonical JSON. Hex output is lowercase.
//!
//! - `sha256_canonical(..)` for serializable values (sorted keys).
//! - `sha256_hex(..)` for raw bytes such as an imported dataset file.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::canonical_json::canonical_bytes_of;
use crate::{IoError, IoResult};

/// SHA-256 over raw bytes.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// SHA-256 over the canonical JSON rendering of `value`.
pub fn sha256_canonical<T: Serialize>(value: &T) -> IoResult<String> {
    let bytes = canonical_bytes_of(value).map_err(|e| IoError::Hash(e.to_string()))?;
    Ok(sha256_hex(&bytes))
}
