//! Cold blob encoding.
//!
//! Records are archived as a JSON envelope, optionally gzip-compressed.
//! Decoding sniffs the gzip magic so a bucket can hold both forms.

use bytes::Bytes;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::io::{Read, Write};

use crate::record::Record;

/// Envelope format version written into every blob.
const ENVELOPE_VERSION: u32 = 1;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Upper bound on decompressed blob size.
const MAX_DECOMPRESSED_SIZE: usize = 64 * 1024 * 1024;

#[derive(Debug)]
pub enum CodecError {
    Serialize(String),
    Deserialize(String),
    Decompress(String),
    UnsupportedVersion(u32),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::Serialize(e) => write!(f, "serialize error: {}", e),
            CodecError::Deserialize(e) => write!(f, "deserialize error: {}", e),
            CodecError::Decompress(e) => write!(f, "decompress error: {}", e),
            CodecError::UnsupportedVersion(v) => write!(f, "unsupported envelope version {}", v),
        }
    }
}

impl std::error::Error for CodecError {}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    v: u32,
    id: &'a str,
    partition_key: &'a str,
    timestamp_ms: i64,
    payload: &'a JsonValue,
}

#[derive(Deserialize)]
struct Envelope {
    v: u32,
    id: String,
    partition_key: String,
    timestamp_ms: i64,
    #[serde(default)]
    payload: JsonValue,
}

/// Encoder for cold blobs. Output is deterministic for a given record.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlobCodec {
    compress: bool,
}

impl BlobCodec {
    pub fn new(compress: bool) -> Self {
        Self { compress }
    }

    pub fn is_compressed(&self) -> bool {
        self.compress
    }

    pub fn encode(&self, record: &Record) -> Result<Bytes, CodecError> {
        let envelope = EnvelopeRef {
            v: ENVELOPE_VERSION,
            id: &record.id,
            partition_key: &record.partition_key,
            timestamp_ms: record.timestamp_ms,
            payload: &record.payload,
        };
        let json =
            serde_json::to_vec(&envelope).map_err(|e| CodecError::Serialize(e.to_string()))?;

        if !self.compress {
            return Ok(Bytes::from(json));
        }

        // GzEncoder writes a zero mtime, so identical input gives identical bytes.
        let mut encoder = GzEncoder::new(Vec::with_capacity(json.len() / 2), Compression::default());
        encoder
            .write_all(&json)
            .map_err(|e| CodecError::Serialize(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| CodecError::Serialize(e.to_string()))?;
        Ok(Bytes::from(compressed))
    }
}

/// Decode a blob written by any `BlobCodec`, compressed or not.
pub fn decode(blob: &[u8]) -> Result<Record, CodecError> {
    let envelope: Envelope = if blob.starts_with(&GZIP_MAGIC) {
        let json = decompress(blob)?;
        serde_json::from_slice(&json).map_err(|e| CodecError::Deserialize(e.to_string()))?
    } else {
        serde_json::from_slice(blob).map_err(|e| CodecError::Deserialize(e.to_string()))?
    };

    if envelope.v != ENVELOPE_VERSION {
        return Err(CodecError::UnsupportedVersion(envelope.v));
    }

    Ok(Record {
        id: envelope.id,
        partition_key: envelope.partition_key,
        timestamp_ms: envelope.timestamp_ms,
        payload: envelope.payload,
    })
}

fn decompress(blob: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::new();
    let read = GzDecoder::new(blob)
        .take(MAX_DECOMPRESSED_SIZE as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| CodecError::Decompress(e.to_string()))?;
    if read > MAX_DECOMPRESSED_SIZE {
        return Err(CodecError::Decompress(format!(
            "blob exceeds {} bytes when decompressed",
            MAX_DECOMPRESSED_SIZE
        )));
    }
    Ok(out)
}
