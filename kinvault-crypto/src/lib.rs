//! Boundary validation for KinVault's encrypted-record envelopes.
//!
//! Relative records are encrypted client-side with a per-record DEK
//! (data encryption key); the DEK is wrapped individually for every
//! authorized recipient. This crate never performs a cryptographic
//! operation and never holds a plaintext DEK — it validates envelope
//! shape before persistence, converts between wire encoding (base64)
//! and byte buffers, and generates the opaque token strings that gate
//! sensitive state transitions.
//!
//! The cipher suite is fixed: 12-byte nonce, 16-byte Poly1305 tag,
//! 16-byte KDF salt. Wrap bytes are opaque ciphertext produced by the
//! client's public-key sealing; their algorithm hints travel in
//! [`WrapMeta`].

mod envelope;
mod error;
pub mod token;
mod wrap;

pub use envelope::{
    decode_blob, encode_blob, EncryptedBlob, EncryptedBlobWire, IV_SIZE, KDF_SALT_SIZE, TAG_SIZE,
};
pub use error::{EnvelopeError, EnvelopeResult};
pub use token::{generate_numeric_code, generate_token_string, TOKEN_ENTROPY_BYTES};
pub use wrap::{WrapMeta, WrappedDek, WrappedDekEntry};
