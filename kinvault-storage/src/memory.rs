//! In-memory `RegistryStore` built on `Arc<RwLock<_>>`.
//!
//! Each commit method takes one write lock over the whole backing state,
//! checks its preconditions, and applies every write before releasing —
//! the lock is the atomic-commit boundary. Clones share state.

use crate::error::StorageResult;
use crate::port::{AcceptanceCommit, DeclineCommit, RecoveryCommit, RegistryStore, TxOutcome};
use chrono::{DateTime, Utc};
use kinvault_types::{AccountKeyMaterial, Invite, InviteStatus, Relative, VerificationToken};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Inner {
    /// Keyed by token string.
    tokens: HashMap<String, VerificationToken>,
    /// Keyed by invite token (the join key to the verification token).
    invites: HashMap<String, Invite>,
    /// Keyed by record id.
    relatives: HashMap<String, Relative>,
    /// Keyed by email hash.
    accounts: HashMap<String, AccountKeyMaterial>,
}

impl Inner {
    /// Shared token precondition check for consume and commits.
    fn check_token(&self, token: &str, now: DateTime<Utc>) -> Result<(), TxOutcome> {
        let Some(stored) = self.tokens.get(token) else {
            return Err(TxOutcome::TokenNotFound);
        };
        if stored.is_expired(now) {
            return Err(TxOutcome::TokenExpired);
        }
        if stored.used {
            return Err(TxOutcome::TokenUsed);
        }
        Ok(())
    }

    fn mark_token_used(&mut self, token: &str, now: DateTime<Utc>) {
        if let Some(stored) = self.tokens.get_mut(token) {
            stored.used = true;
            stored.used_at = Some(now);
        }
    }
}

/// Thread-safe in-memory store; the test double and single-node backend.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RegistryStore for MemoryStore {
    async fn put_token(&self, token: VerificationToken) -> StorageResult<()> {
        self.inner
            .write()
            .await
            .tokens
            .insert(token.token.clone(), token);
        Ok(())
    }

    async fn token(&self, token: &str) -> StorageResult<Option<VerificationToken>> {
        Ok(self.inner.read().await.tokens.get(token).cloned())
    }

    async fn consume_token(&self, token: &str, now: DateTime<Utc>) -> StorageResult<TxOutcome> {
        let mut inner = self.inner.write().await;
        if let Err(outcome) = inner.check_token(token, now) {
            return Ok(outcome);
        }
        inner.mark_token_used(token, now);
        Ok(TxOutcome::Committed)
    }

    async fn purge_expired_tokens(&self, now: DateTime<Utc>) -> StorageResult<usize> {
        let mut inner = self.inner.write().await;
        let before = inner.tokens.len();
        inner.tokens.retain(|_, t| !t.is_expired(now));
        Ok(before - inner.tokens.len())
    }

    async fn put_invite(&self, invite: Invite) -> StorageResult<()> {
        self.inner
            .write()
            .await
            .invites
            .insert(invite.invite_token.clone(), invite);
        Ok(())
    }

    async fn invite(&self, invite_token: &str) -> StorageResult<Option<Invite>> {
        Ok(self.inner.read().await.invites.get(invite_token).cloned())
    }

    async fn has_pending_invite(
        &self,
        inviter: &str,
        invitee_email_hash: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner.invites.values().any(|inv| {
            inv.is_pending()
                && inv.inviter == inviter
                && inv.invitee_email_hash == invitee_email_hash
                && inner
                    .tokens
                    .get(&inv.invite_token)
                    .is_some_and(|t| !t.is_expired(now))
        }))
    }

    async fn put_relative(&self, relative: Relative) -> StorageResult<()> {
        self.inner
            .write()
            .await
            .relatives
            .insert(relative.id.clone(), relative);
        Ok(())
    }

    async fn relative(&self, id: &str) -> StorageResult<Option<Relative>> {
        Ok(self.inner.read().await.relatives.get(id).cloned())
    }

    async fn delete_relative(&self, id: &str) -> StorageResult<bool> {
        Ok(self.inner.write().await.relatives.remove(id).is_some())
    }

    async fn put_relative_if(
        &self,
        relative: Relative,
        expected_version: u64,
    ) -> StorageResult<TxOutcome> {
        let mut inner = self.inner.write().await;
        match inner.relatives.get(&relative.id) {
            Some(live) if live.version == expected_version => {
                inner.relatives.insert(relative.id.clone(), relative);
                Ok(TxOutcome::Committed)
            }
            _ => Ok(TxOutcome::StaleVersion),
        }
    }

    async fn put_account(&self, account: AccountKeyMaterial) -> StorageResult<()> {
        self.inner
            .write()
            .await
            .accounts
            .insert(account.email_hash.clone(), account);
        Ok(())
    }

    async fn account(&self, email_hash: &str) -> StorageResult<Option<AccountKeyMaterial>> {
        Ok(self.inner.read().await.accounts.get(email_hash).cloned())
    }

    async fn commit_acceptance(&self, commit: AcceptanceCommit) -> StorageResult<TxOutcome> {
        let mut inner = self.inner.write().await;

        // All preconditions first; nothing is written until all hold.
        if let Err(outcome) = inner.check_token(&commit.token, commit.accepted_at) {
            return Ok(outcome);
        }
        match inner.invites.get(&commit.invite_token) {
            Some(invite) if invite.is_pending() => {}
            _ => return Ok(TxOutcome::Conflict),
        }
        if let Some(expected) = commit.expected_version {
            match inner.relatives.get(&commit.relative.id) {
                Some(live) if live.version == expected => {}
                _ => return Ok(TxOutcome::StaleVersion),
            }
        }

        let Some(invite) = inner.invites.get_mut(&commit.invite_token) else {
            return Ok(TxOutcome::Conflict);
        };
        invite.status = InviteStatus::Accepted;
        invite.resolved_at = Some(commit.accepted_at);
        inner.mark_token_used(&commit.token, commit.accepted_at);
        inner
            .relatives
            .insert(commit.relative.id.clone(), commit.relative);

        Ok(TxOutcome::Committed)
    }

    async fn commit_decline(&self, commit: DeclineCommit) -> StorageResult<TxOutcome> {
        let mut inner = self.inner.write().await;

        if let Err(outcome) = inner.check_token(&commit.token, commit.declined_at) {
            return Ok(outcome);
        }
        let Some(invite) = inner.invites.get_mut(&commit.invite_token) else {
            return Ok(TxOutcome::Conflict);
        };
        if !invite.is_pending() {
            return Ok(TxOutcome::Conflict);
        }

        invite.status = InviteStatus::Declined;
        invite.resolved_at = Some(commit.declined_at);
        inner.mark_token_used(&commit.token, commit.declined_at);

        Ok(TxOutcome::Committed)
    }

    async fn commit_recovery(&self, commit: RecoveryCommit) -> StorageResult<TxOutcome> {
        let mut inner = self.inner.write().await;

        if let Err(outcome) = inner.check_token(&commit.token, commit.now) {
            return Ok(outcome);
        }
        match inner.accounts.get(&commit.account.email_hash) {
            Some(account) if account.password_hash == commit.expected_password_hash => {}
            _ => return Ok(TxOutcome::Conflict),
        }

        inner.mark_token_used(&commit.token, commit.now);
        inner
            .accounts
            .insert(commit.account.email_hash.clone(), commit.account);

        Ok(TxOutcome::Committed)
    }
}
