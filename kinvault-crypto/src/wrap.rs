//! Wrapped DEK entries: one per authorized recipient of a record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A DEK encrypted under one recipient's public key.
///
/// The bytes are opaque ciphertext produced client-side; this subsystem
/// stores and routes them, never unwraps them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedDek(Vec<u8>);

impl WrappedDek {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// Wrap ciphertext stays out of logs and panic messages.
impl fmt::Debug for WrappedDek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WrappedDek({} bytes)", self.0.len())
    }
}

/// Algorithm/version hints for one wrap, tagged per known scheme.
///
/// Unknown future schemes round-trip through [`WrapMeta::Opaque`]
/// without interpretation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "alg", rename_all = "snake_case")]
pub enum WrapMeta {
    /// X25519 ephemeral key agreement, XSalsa20-Poly1305 sealing.
    X25519SealedV1 {
        ephemeral_public_key: [u8; 32],
        nonce: [u8; 24],
    },
    /// Forward-compatibility fallback: hints preserved verbatim.
    Opaque { hints: BTreeMap<String, String> },
}

/// One entry of a record's wrapped-key directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedDekEntry {
    /// Stable recipient handle: user code or public-key fingerprint.
    pub recipient: String,
    pub wrapped: WrappedDek,
    pub meta: WrapMeta,
    pub added_at: DateTime<Utc>,
}
