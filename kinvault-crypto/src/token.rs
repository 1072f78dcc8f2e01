//! Opaque token-string generation for single-use verification tokens.
//!
//! Link tokens carry 256 bits of entropy, enough to resist offline
//! guessing for their whole lifetime. Short numeric codes are reserved
//! for the fast-expiring `*_code` token types and are only safe behind
//! their minutes-scale TTL.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::{Rng, RngCore};

/// Entropy per link token, in bytes.
pub const TOKEN_ENTROPY_BYTES: usize = 32;

/// Generates an unguessable, URL-safe token string (43 chars).
pub fn generate_token_string() -> String {
    let mut bytes = [0u8; TOKEN_ENTROPY_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generates a 6-digit numeric code, zero-padded.
pub fn generate_numeric_code() -> String {
    let n: u32 = rand::rng().random_range(0..1_000_000);
    format!("{n:06}")
}
