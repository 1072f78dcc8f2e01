//! Single-use verification token lifecycle.

use crate::error::{tx_result, ProtocolError, ProtocolResult};
use chrono::{Duration, Utc};
use kinvault_crypto::generate_token_string;
use kinvault_storage::RegistryStore;
use kinvault_types::{TokenPayload, VerificationToken};
use std::sync::Arc;
use tracing::{debug, info};

/// Issues and consumes the tokens gating every sensitive transition.
pub struct VerificationTokenManager<S> {
    store: Arc<S>,
}

impl<S: RegistryStore> VerificationTokenManager<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Mints a token for the payload's type, with the type's default TTL
    /// unless the caller overrides it.
    pub async fn issue(
        &self,
        email_hash: String,
        payload: TokenPayload,
        ttl: Option<Duration>,
    ) -> ProtocolResult<VerificationToken> {
        let now = Utc::now();
        let ttl = ttl.unwrap_or_else(|| payload.token_type().default_ttl());
        let token = VerificationToken {
            token: generate_token_string(),
            email_hash,
            expires_at: now + ttl,
            payload,
            used: false,
            used_at: None,
            created_at: now,
        };
        self.store.put_token(token.clone()).await?;
        debug!(token_type = token.token_type().as_str(), "issued token");
        Ok(token)
    }

    /// Read-only validation: lookup, expiry, then used flag — in that
    /// order, so expiry dominates. Never marks the token used, letting a
    /// caller check preconditions before committing a transaction.
    pub async fn validate(&self, token: &str) -> ProtocolResult<VerificationToken> {
        let stored = self
            .store
            .token(token)
            .await?
            .ok_or(ProtocolError::NotFound("verification token"))?;
        if stored.is_expired(Utc::now()) {
            return Err(ProtocolError::Expired);
        }
        if stored.used {
            return Err(ProtocolError::AlreadyUsed);
        }
        Ok(stored)
    }

    /// Consumes the token: atomic compare-and-set on the `used` flag.
    /// Exactly one concurrent caller succeeds; the rest see `AlreadyUsed`.
    pub async fn consume(&self, token: &str) -> ProtocolResult<()> {
        let outcome = self.store.consume_token(token, Utc::now()).await?;
        tx_result(outcome, "token consume")
    }

    /// Sweeps tokens past expiry. Purging never changes the outcome of
    /// `validate` or `consume`.
    pub async fn purge_expired(&self) -> ProtocolResult<usize> {
        let purged = self.store.purge_expired_tokens(Utc::now()).await?;
        if purged > 0 {
            info!(purged, "purged expired verification tokens");
        }
        Ok(purged)
    }
}
