//! The `RegistryStore` port: get/put plus atomic commit boundaries.

use crate::error::StorageResult;
use chrono::{DateTime, Utc};
use kinvault_types::{AccountKeyMaterial, Invite, Relative, VerificationToken};

/// Outcome of an atomic store transaction.
///
/// Precondition failures are outcomes, not errors: the store is the only
/// place that can check them under the same lock that applies the write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxOutcome {
    Committed,
    TokenNotFound,
    TokenExpired,
    /// Exactly one concurrent consumer wins; everyone else sees this.
    TokenUsed,
    /// A guarded precondition no longer holds: the invite already reached
    /// a terminal state, the recovery challenge is stale, or the target
    /// account/record is gone.
    Conflict,
    /// The record's stored version no longer matches the version the
    /// writer read. The write was not applied; retry from a fresh read.
    StaleVersion,
}

/// All-or-nothing payload for invite acceptance: consume the token, move
/// the invite to `accepted`, and persist the updated record.
#[derive(Clone, Debug)]
pub struct AcceptanceCommit {
    pub token: String,
    pub invite_token: String,
    pub accepted_at: DateTime<Utc>,
    /// Full post-acceptance record (newly created or updated in place).
    pub relative: Relative,
    /// Version the writer read the target record at, `None` when the
    /// record is created by this acceptance. A mismatch against the live
    /// record aborts the whole commit with [`TxOutcome::StaleVersion`],
    /// so a concurrent acceptance onto the same record can never clobber
    /// a wrap that another committed acceptance installed.
    pub expected_version: Option<u64>,
}

/// All-or-nothing payload for invite decline: consume the token and move
/// the invite to `declined`. No directory change.
#[derive(Clone, Debug)]
pub struct DeclineCommit {
    pub token: String,
    pub invite_token: String,
    pub declined_at: DateTime<Utc>,
}

/// All-or-nothing payload for account recovery: consume the token and
/// replace the account's stored artifacts.
#[derive(Clone, Debug)]
pub struct RecoveryCommit {
    pub token: String,
    pub now: DateTime<Utc>,
    /// Replay guard: the account's live password hash must still equal
    /// the hash snapshotted into the challenge token.
    pub expected_password_hash: String,
    pub account: AccountKeyMaterial,
}

/// Injected durable-store port.
///
/// Every commit method checks its preconditions and applies all of its
/// writes under one atomic boundary; no reader may ever observe a
/// partially applied commit.
#[allow(async_fn_in_trait)]
pub trait RegistryStore {
    async fn put_token(&self, token: VerificationToken) -> StorageResult<()>;
    async fn token(&self, token: &str) -> StorageResult<Option<VerificationToken>>;
    /// Atomic compare-and-set on the `used` flag.
    async fn consume_token(&self, token: &str, now: DateTime<Utc>) -> StorageResult<TxOutcome>;
    /// Drops tokens past expiry; returns the purge count. Purging never
    /// changes a validate/consume outcome.
    async fn purge_expired_tokens(&self, now: DateTime<Utc>) -> StorageResult<usize>;

    async fn put_invite(&self, invite: Invite) -> StorageResult<()>;
    async fn invite(&self, invite_token: &str) -> StorageResult<Option<Invite>>;
    /// True if a pending invite for this (inviter, invitee) pair exists
    /// whose gating token has not yet expired.
    async fn has_pending_invite(
        &self,
        inviter: &str,
        invitee_email_hash: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<bool>;

    /// Unconditional insert/replace, for record creation and seeding.
    /// Read-modify-write flows must go through [`Self::put_relative_if`].
    async fn put_relative(&self, relative: Relative) -> StorageResult<()>;
    async fn relative(&self, id: &str) -> StorageResult<Option<Relative>>;
    /// Replaces the record only if the live version still equals
    /// `expected_version`; the candidate carries the bumped version.
    /// A missing record also reports [`TxOutcome::StaleVersion`].
    async fn put_relative_if(
        &self,
        relative: Relative,
        expected_version: u64,
    ) -> StorageResult<TxOutcome>;
    /// Removes the record and with it every wrap. Returns whether it existed.
    async fn delete_relative(&self, id: &str) -> StorageResult<bool>;

    async fn put_account(&self, account: AccountKeyMaterial) -> StorageResult<()>;
    async fn account(&self, email_hash: &str) -> StorageResult<Option<AccountKeyMaterial>>;

    async fn commit_acceptance(&self, commit: AcceptanceCommit) -> StorageResult<TxOutcome>;
    async fn commit_decline(&self, commit: DeclineCommit) -> StorageResult<TxOutcome>;
    async fn commit_recovery(&self, commit: RecoveryCommit) -> StorageResult<TxOutcome>;
}
