//! Signed snapshot envelope.
//!
//! Layout: `[3-byte marker][1-byte version][32-byte signature][payload]`.
//! The marker names the serializer that produced the payload; the signature
//! is a keyed blake3 hash over marker, version and payload. Decoding goes
//! through [`SnapshotCodec::decode`] only, which returns `None` on any
//! mismatch rather than trusting part of a file.

use crate::error::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

const VERSION: u8 = 1;
const MARKER_LEN: usize = 3;
const SIGNATURE_LEN: usize = 32;
const HEADER_LEN: usize = MARKER_LEN + 1 + SIGNATURE_LEN;
const KEY_CONTEXT: &str = "folio 2024-06 index snapshot signing key";

/// Payload serializer for snapshot files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Serializer {
    /// Compact binary (bincode)
    #[default]
    Bincode,
    /// Portable JSON
    Json,
}

impl Serializer {
    pub fn marker(&self) -> &'static [u8; MARKER_LEN] {
        match self {
            Serializer::Bincode => b"FBC",
            Serializer::Json => b"FJS",
        }
    }

    fn from_marker(marker: &[u8]) -> Option<Self> {
        match marker {
            b"FBC" => Some(Serializer::Bincode),
            b"FJS" => Some(Serializer::Json),
            _ => None,
        }
    }
}

/// Encodes and verifies snapshot files with a site-specific signing key.
#[derive(Clone)]
pub struct SnapshotCodec {
    serializer: Serializer,
    key: [u8; 32],
}

impl std::fmt::Debug for SnapshotCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotCodec")
            .field("serializer", &self.serializer)
            .finish_non_exhaustive()
    }
}

impl SnapshotCodec {
    pub fn new(serializer: Serializer, secret: Option<&str>) -> Self {
        let key = blake3::derive_key(KEY_CONTEXT, secret.unwrap_or_default().as_bytes());
        Self { serializer, key }
    }

    pub fn serializer(&self) -> Serializer {
        self.serializer
    }

    fn sign(&self, marker: &[u8], payload: &[u8]) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(marker);
        hasher.update(&[VERSION]);
        hasher.update(payload);
        hasher.finalize()
    }

    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        let payload = match self.serializer {
            Serializer::Bincode => bincode::serialize(value)?,
            Serializer::Json => serde_json::to_vec(value)?,
        };
        let marker = self.serializer.marker();
        let signature = self.sign(marker, &payload);

        let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
        out.extend_from_slice(marker);
        out.push(VERSION);
        out.extend_from_slice(signature.as_bytes());
        out.extend_from_slice(&payload);
        Ok(out)
    }

    /// Verify and decode a snapshot. Either serializer is accepted since the
    /// marker is self-describing.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Option<T> {
        if bytes.len() < HEADER_LEN {
            tracing::warn!("Snapshot too short ({} bytes)", bytes.len());
            return None;
        }
        let (marker, rest) = bytes.split_at(MARKER_LEN);
        let Some(serializer) = Serializer::from_marker(marker) else {
            tracing::warn!("Unknown snapshot format marker {:?}", marker);
            return None;
        };
        if rest[0] != VERSION {
            tracing::warn!("Unsupported snapshot version {}", rest[0]);
            return None;
        }

        let mut signature = [0u8; SIGNATURE_LEN];
        signature.copy_from_slice(&rest[1..=SIGNATURE_LEN]);
        let payload = &rest[1 + SIGNATURE_LEN..];

        // blake3::Hash equality is constant-time
        if blake3::Hash::from(signature) != self.sign(marker, payload) {
            tracing::warn!("Snapshot signature mismatch");
            return None;
        }

        let decoded = match serializer {
            Serializer::Bincode => bincode::deserialize(payload).map_err(|e| e.to_string()),
            Serializer::Json => serde_json::from_slice(payload).map_err(|e| e.to_string()),
        };
        match decoded {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("Snapshot payload failed to decode: {}", err);
                None
            }
        }
    }
}
