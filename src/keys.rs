//! Deterministic record id to cold key mapping.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// Maximum shard fan-out for the sharded scheme (two hex digits).
pub const MAX_SHARDS: u32 = 256;

/// Naming scheme for cold blobs. The same id always maps to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum ColdKeyScheme {
    /// `{prefix}/{id}`
    Flat { prefix: String },
    /// `{prefix}/{shard:02x}/{id}`, shard picked by a stable hash of the id.
    Sharded { prefix: String, shards: u32 },
}

impl Default for ColdKeyScheme {
    fn default() -> Self {
        ColdKeyScheme::Flat {
            prefix: "archive".to_string(),
        }
    }
}

impl ColdKeyScheme {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = match self {
            ColdKeyScheme::Flat { prefix } => prefix,
            ColdKeyScheme::Sharded { prefix, shards } => {
                if *shards == 0 || *shards > MAX_SHARDS {
                    return Err(ConfigError::invalid(
                        "cold_keys.shards",
                        format!("must be between 1 and {}, got {}", MAX_SHARDS, shards),
                    ));
                }
                prefix
            }
        };
        let trimmed = prefix.trim_matches('/');
        if trimmed.is_empty() {
            return Err(ConfigError::invalid("cold_keys.prefix", "must not be empty"));
        }
        if trimmed.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..") {
            return Err(ConfigError::invalid(
                "cold_keys.prefix",
                format!("'{}' contains an empty or relative segment", prefix),
            ));
        }
        Ok(())
    }

    /// Cold key for a record id. Independent of blob encoding, so toggling
    /// compression never moves an archived record.
    pub fn key_for(&self, id: &str) -> String {
        let encoded = path_segment(id);
        match self {
            ColdKeyScheme::Flat { prefix } => format!("{}/{}", prefix.trim_matches('/'), encoded),
            ColdKeyScheme::Sharded { prefix, shards } => {
                let shard = fnv1a64(id.as_bytes()) % u64::from((*shards).max(1));
                format!("{}/{:02x}/{}", prefix.trim_matches('/'), shard, encoded)
            }
        }
    }
}

/// Percent-encode a raw value into a single, non-relative path segment.
///
/// "." and ".." are path segments to every filesystem and most gateways, so
/// dot-only values are fully escaped. The empty string maps to a bare `%`,
/// which percent-encoding never produces for any other input.
pub(crate) fn path_segment(raw: &str) -> String {
    if raw.is_empty() {
        return "%".to_string();
    }
    let encoded = urlencoding::encode(raw).into_owned();
    if encoded.chars().all(|c| c == '.') {
        return encoded.replace('.', "%2E");
    }
    encoded
}

/// 64-bit FNV-1a. Stable across processes and toolchains, unlike `DefaultHasher`.
fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(PRIME)
    })
}
