//! Account-recovery ceremony over the server-held secret share.
//!
//! The server never reconstructs the protected secret. It hands its
//! share to a token-holding client, and later stores the re-split,
//! re-encrypted artifacts the client sends back. The challenge token
//! snapshots the account's password hash, so a token leaked from an
//! earlier recovery is dead as soon as the password changes.

use crate::error::{tx_result, ProtocolError, ProtocolResult};
use crate::tokens::VerificationTokenManager;
use chrono::Utc;
use kinvault_crypto::{decode_blob, EncryptedBlobWire};
use kinvault_storage::{RecoveryCommit, RegistryStore};
use kinvault_types::{AccountKeyMaterial, TokenPayload, VerificationToken};
use std::sync::Arc;
use tracing::info;

/// Replacement artifacts produced client-side after re-splitting.
#[derive(Clone, Debug)]
pub struct RecoveryUpdate {
    pub server_share: Vec<u8>,
    pub encrypted_private_key: EncryptedBlobWire,
    pub master_salt: Vec<u8>,
    pub new_password_hash: String,
}

/// Runs the recovery ceremony for one account at a time.
pub struct RecoveryService<S> {
    store: Arc<S>,
    tokens: VerificationTokenManager<S>,
}

impl<S: RegistryStore> RecoveryService<S> {
    pub fn new(store: Arc<S>) -> Self {
        let tokens = VerificationTokenManager::new(Arc::clone(&store));
        Self { store, tokens }
    }

    /// Issues a `password_recovery` challenge token embedding the
    /// account's current password hash as the replay guard.
    pub async fn issue_challenge(&self, email_hash: &str) -> ProtocolResult<VerificationToken> {
        let account = self.account(email_hash).await?;
        let token = self
            .tokens
            .issue(
                email_hash.to_string(),
                TokenPayload::PasswordRecovery {
                    old_password_hash: account.password_hash,
                },
                None,
            )
            .await?;
        info!("recovery challenge issued");
        Ok(token)
    }

    /// Hands out the server-held share to a valid token holder.
    ///
    /// Read-only: the token stays consumable for `complete_recovery`.
    /// The share alone cannot reconstruct anything.
    pub async fn server_share(&self, token: &str) -> ProtocolResult<Vec<u8>> {
        let (stored, old_password_hash) = self.validated_challenge(token).await?;
        let account = self.account(&stored.email_hash).await?;
        if account.password_hash != old_password_hash {
            return Err(ProtocolError::Conflict("stale recovery challenge"));
        }
        Ok(account.server_share)
    }

    /// Completes recovery: consumes the token and atomically replaces
    /// the account's share, encrypted private key, salt, and password
    /// hash with the client's new artifacts.
    pub async fn complete_recovery(
        &self,
        token: &str,
        update: RecoveryUpdate,
    ) -> ProtocolResult<()> {
        let (stored, old_password_hash) = self.validated_challenge(token).await?;

        // Boundary-validate the new key envelope before committing.
        let encrypted_private_key = decode_blob(&update.encrypted_private_key)?;
        encrypted_private_key.validate()?;

        let now = Utc::now();
        let outcome = self
            .store
            .commit_recovery(RecoveryCommit {
                token: token.to_string(),
                now,
                expected_password_hash: old_password_hash,
                account: AccountKeyMaterial {
                    email_hash: stored.email_hash,
                    password_hash: update.new_password_hash,
                    server_share: update.server_share,
                    encrypted_private_key,
                    master_salt: update.master_salt,
                    updated_at: now,
                },
            })
            .await?;
        tx_result(outcome, "stale recovery challenge")?;

        info!("account recovery completed");
        Ok(())
    }

    /// Validates the token as a live `password_recovery` challenge and
    /// extracts its replay-guard snapshot.
    async fn validated_challenge(
        &self,
        token: &str,
    ) -> ProtocolResult<(VerificationToken, String)> {
        let stored = self.tokens.validate(token).await?;
        let TokenPayload::PasswordRecovery { old_password_hash } = stored.payload.clone() else {
            return Err(ProtocolError::NotFound("recovery token"));
        };
        Ok((stored, old_password_hash))
    }

    async fn account(&self, email_hash: &str) -> ProtocolResult<AccountKeyMaterial> {
        self.store
            .account(email_hash)
            .await?
            .ok_or(ProtocolError::NotFound("account"))
    }
}
