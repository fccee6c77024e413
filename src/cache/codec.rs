// src/cache/codec.rs
//! Wire format for cached match results.
//!
//! Values are JSON, zlib-compressed when larger than the configured threshold. A
//! two-byte marker in front of the payload records which form was stored.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::models::MatchResult;

const RAW_MARKER: &[u8; 2] = b"r:";
const COMPRESSED_MARKER: &[u8; 2] = b"z:";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPayload {
    pub cached_at: DateTime<Utc>,
    pub match_time_ms: f64,
    pub results: Vec<MatchResult>,
}

impl CachedPayload {
    pub fn new(results: Vec<MatchResult>, match_time_ms: f64) -> Self {
        Self {
            cached_at: Utc::now(),
            match_time_ms,
            results,
        }
    }
}

pub fn encode_payload(payload: &CachedPayload, compression_threshold: usize) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(payload).context("Failed to serialize cached results")?;
    if json.len() <= compression_threshold {
        let mut out = Vec::with_capacity(json.len() + RAW_MARKER.len());
        out.extend_from_slice(RAW_MARKER);
        out.extend_from_slice(&json);
        return Ok(out);
    }

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&json).context("Failed to compress cached results")?;
    let compressed = encoder.finish().context("Failed to finish compression")?;
    let mut out = Vec::with_capacity(compressed.len() + COMPRESSED_MARKER.len());
    out.extend_from_slice(COMPRESSED_MARKER);
    out.extend_from_slice(&compressed);
    Ok(out)
}

pub fn decode_payload(bytes: &[u8]) -> Result<CachedPayload> {
    if bytes.len() < RAW_MARKER.len() {
        bail!("Cached value too short ({} bytes)", bytes.len());
    }
    let (marker, body) = bytes.split_at(RAW_MARKER.len());
    let json = if marker == RAW_MARKER {
        body.to_vec()
    } else if marker == COMPRESSED_MARKER {
        let mut decoder = ZlibDecoder::new(body);
        let mut json = Vec::new();
        decoder
            .read_to_end(&mut json)
            .context("Failed to decompress cached results")?;
        json
    } else {
        bail!("Unknown cache value marker");
    };
    serde_json::from_slice(&json).context("Failed to deserialize cached results")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MatchType;

    fn result(i: usize) -> MatchResult {
        MatchResult {
            original: "acme".to_string(),
            matched: format!("Acme Holdings {}", i),
            score: 0.9,
            match_type: MatchType::Fuzzy,
            confidence: 0.81,
            entity_id: Some(i.to_string()),
            metadata: None,
        }
    }

    #[test]
    fn test_small_payload_is_stored_raw() {
        let payload = CachedPayload::new(vec![result(1)], 2.5);
        let bytes = encode_payload(&payload, 1024).unwrap();
        assert!(bytes.starts_with(RAW_MARKER));
        assert_eq!(decode_payload(&bytes).unwrap(), payload);
    }

    #[test]
    fn test_large_payload_is_compressed() {
        let payload = CachedPayload::new((0..50).map(result).collect(), 2.5);
        let raw_len = serde_json::to_vec(&payload).unwrap().len();
        let bytes = encode_payload(&payload, 1024).unwrap();
        assert!(bytes.starts_with(COMPRESSED_MARKER));
        assert!(bytes.len() < raw_len);
        assert_eq!(decode_payload(&bytes).unwrap(), payload);
    }

    #[test]
    fn test_corrupt_values_are_rejected() {
        assert!(decode_payload(b"").is_err());
        assert!(decode_payload(b"x:{}").is_err());
        assert!(decode_payload(b"z:not zlib").is_err());
        assert!(decode_payload(b"r:{\"truncated\"").is_err());
    }
}
