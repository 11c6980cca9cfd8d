use kmu2_core::errors::Kmu2Error;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::serde::{serde_error, to_canonical_value};

/// Lowercase hex SHA-256 of the compact canonical JSON form of `value`.
///
/// Configurations differing only in YAML key order or formatting share a
/// digest, which stamps the run report.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, Kmu2Error> {
    let canonical = to_canonical_value(value)?;
    let mut hasher = Sha256::new();
    serde_json::to_writer(&mut hasher, &canonical).map_err(|err| serde_error("json_write", err))?;
    Ok(hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect())
}
