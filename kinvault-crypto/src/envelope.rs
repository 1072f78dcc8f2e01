//! Encrypted-record envelope: shape validation and wire codec.
//!
//! An [`EncryptedBlob`] is the ciphertext, nonce, and authentication tag
//! (plus an optional per-record KDF salt) that let a DEK-holder recover
//! plaintext and detect tampering. Validation checks presence and byte
//! lengths against the fixed cipher suite; it does not decrypt.

use crate::error::{EnvelopeError, EnvelopeResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// ChaCha20-Poly1305 nonce length in bytes.
pub const IV_SIZE: usize = 12;
/// Poly1305 authentication tag length in bytes.
pub const TAG_SIZE: usize = 16;
/// Argon2id salt length in bytes, when a per-record salt is carried.
pub const KDF_SALT_SIZE: usize = 16;

/// An encrypted relative record, meaningless without its DEK.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    pub ciphertext: Vec<u8>,
    pub iv: Vec<u8>,
    pub tag: Vec<u8>,
    /// Present only for records whose DEK is password-derived.
    pub kdf_salt: Option<Vec<u8>>,
}

impl EncryptedBlob {
    /// Checks field presence and byte lengths against the cipher suite.
    ///
    /// Rejecting malformed envelopes here keeps them out of durable
    /// storage; nothing is decrypted.
    pub fn validate(&self) -> EnvelopeResult<()> {
        if self.ciphertext.is_empty() {
            return Err(EnvelopeError::Empty {
                field: "ciphertext",
            });
        }
        check_len("iv", &self.iv, IV_SIZE)?;
        check_len("tag", &self.tag, TAG_SIZE)?;
        if let Some(salt) = &self.kdf_salt {
            check_len("kdf_salt", salt, KDF_SALT_SIZE)?;
        }
        Ok(())
    }
}

fn check_len(field: &'static str, bytes: &[u8], expected: usize) -> EnvelopeResult<()> {
    if bytes.is_empty() {
        return Err(EnvelopeError::Empty { field });
    }
    if bytes.len() != expected {
        return Err(EnvelopeError::InvalidLength {
            field,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Transport form of [`EncryptedBlob`]: every byte field base64-encoded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EncryptedBlobWire {
    pub ciphertext: String,
    pub iv: String,
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kdf_salt: Option<String>,
}

/// Encodes a blob into its base64 wire form.
pub fn encode_blob(blob: &EncryptedBlob) -> EncryptedBlobWire {
    EncryptedBlobWire {
        ciphertext: STANDARD.encode(&blob.ciphertext),
        iv: STANDARD.encode(&blob.iv),
        tag: STANDARD.encode(&blob.tag),
        kdf_salt: blob.kdf_salt.as_ref().map(|s| STANDARD.encode(s)),
    }
}

/// Decodes a wire envelope back into byte buffers.
///
/// Fails on malformed base64; byte lengths are the job of
/// [`EncryptedBlob::validate`], which callers run before persisting.
pub fn decode_blob(wire: &EncryptedBlobWire) -> EnvelopeResult<EncryptedBlob> {
    Ok(EncryptedBlob {
        ciphertext: decode_field("ciphertext", &wire.ciphertext)?,
        iv: decode_field("iv", &wire.iv)?,
        tag: decode_field("tag", &wire.tag)?,
        kdf_salt: wire
            .kdf_salt
            .as_deref()
            .map(|s| decode_field("kdf_salt", s))
            .transpose()?,
    })
}

fn decode_field(field: &'static str, encoded: &str) -> EnvelopeResult<Vec<u8>> {
    STANDARD
        .decode(encoded)
        .map_err(|source| EnvelopeError::Encoding { field, source })
}
