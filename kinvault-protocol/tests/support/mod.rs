//! Shared test doubles and fixtures for the protocol tests.
//!
//! Compiled into every test binary; not all binaries use every helper.
#![allow(dead_code)]

use chrono::Utc;
use kinvault_crypto::{
    encode_blob, EncryptedBlob, EncryptedBlobWire, WrapMeta, WrappedDek, WrappedDekEntry,
};
use kinvault_protocol::{CreateInvite, IdentityResolver, InviteProtocol, NewRelative};
use kinvault_storage::{
    AcceptanceCommit, DeclineCommit, MemoryStore, RecoveryCommit, RegistryStore, StorageError,
    StorageResult, TxOutcome,
};
use kinvault_types::{
    AccountKeyMaterial, Invite, Relative, RelativeMetadata, SharePermission, VerificationToken,
    Visibility,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;

pub const INVITER: &str = "user-inviter";
pub const INVITEE: &str = "user-invitee";
pub const INVITEE_EMAIL_HASH: &str = "invitee-email-hash";
pub const INVITER_PK: [u8; 32] = [7u8; 32];

/// Identity resolver backed by a fixed map.
pub struct StaticResolver {
    keys: HashMap<String, [u8; 32]>,
}

impl StaticResolver {
    pub fn with_key(identity: &str, pk: [u8; 32]) -> Self {
        let mut keys = HashMap::new();
        keys.insert(identity.to_string(), pk);
        Self { keys }
    }

    pub fn and_key(mut self, identity: &str, pk: [u8; 32]) -> Self {
        self.keys.insert(identity.to_string(), pk);
        self
    }

    pub fn empty() -> Self {
        Self {
            keys: HashMap::new(),
        }
    }
}

impl IdentityResolver for StaticResolver {
    async fn current_public_key(&self, identity: &str) -> Option<[u8; 32]> {
        self.keys.get(identity).copied()
    }
}

/// Protocol wired to a memory store and a resolver that knows the
/// inviter's snapshot key.
pub fn protocol(store: Arc<MemoryStore>) -> InviteProtocol<MemoryStore, StaticResolver> {
    InviteProtocol::new(store, Arc::new(StaticResolver::with_key(INVITER, INVITER_PK)))
}

pub fn blob() -> EncryptedBlob {
    EncryptedBlob {
        ciphertext: vec![0xA5; 64],
        iv: vec![0x01; 12],
        tag: vec![0x02; 16],
        kdf_salt: None,
    }
}

pub fn wire_blob() -> EncryptedBlobWire {
    encode_blob(&blob())
}

pub fn wrap(byte: u8) -> (WrappedDek, WrapMeta) {
    (
        WrappedDek::new(vec![byte; 48]),
        WrapMeta::X25519SealedV1 {
            ephemeral_public_key: [byte; 32],
            nonce: [byte; 24],
        },
    )
}

pub fn owner_entry(owner: &str, byte: u8) -> WrappedDekEntry {
    let (wrapped, meta) = wrap(byte);
    WrappedDekEntry {
        recipient: owner.to_string(),
        wrapped,
        meta,
        added_at: Utc::now(),
    }
}

pub fn new_relative(owner: &str) -> NewRelative {
    let (owner_wrap, owner_wrap_meta) = wrap(0xAA);
    NewRelative {
        owner: owner.to_string(),
        blob: wire_blob(),
        owner_wrap,
        owner_wrap_meta,
        visibility: Visibility::Shared,
        metadata: RelativeMetadata::default(),
    }
}

pub fn shared_record(owner: &str) -> Relative {
    Relative::new(
        owner.to_string(),
        "sister".into(),
        Visibility::Shared,
        RelativeMetadata::default(),
        blob(),
        owner_entry(owner, 0xAA),
    )
}

pub fn create_req() -> CreateInvite {
    CreateInvite {
        inviter: INVITER.into(),
        inviter_name: "Ada".into(),
        inviter_public_key: INVITER_PK,
        invitee_email_hash: INVITEE_EMAIL_HASH.into(),
        relation: "sister".into(),
        permission: SharePermission::Read,
    }
}

pub fn account(email_hash: &str, password_hash: &str) -> AccountKeyMaterial {
    AccountKeyMaterial {
        email_hash: email_hash.into(),
        password_hash: password_hash.into(),
        server_share: vec![0x11; 32],
        encrypted_private_key: blob(),
        master_salt: vec![0x22; 16],
        updated_at: Utc::now(),
    }
}

/// Store whose acceptance commit fails after zero effects, simulating a
/// backend crash at the commit boundary.
pub struct FailingCommitStore {
    pub inner: MemoryStore,
}

impl RegistryStore for FailingCommitStore {
    async fn put_token(&self, token: VerificationToken) -> StorageResult<()> {
        self.inner.put_token(token).await
    }

    async fn token(&self, token: &str) -> StorageResult<Option<VerificationToken>> {
        self.inner.token(token).await
    }

    async fn consume_token(
        &self,
        token: &str,
        now: chrono::DateTime<Utc>,
    ) -> StorageResult<TxOutcome> {
        self.inner.consume_token(token, now).await
    }

    async fn purge_expired_tokens(&self, now: chrono::DateTime<Utc>) -> StorageResult<usize> {
        self.inner.purge_expired_tokens(now).await
    }

    async fn put_invite(&self, invite: Invite) -> StorageResult<()> {
        self.inner.put_invite(invite).await
    }

    async fn invite(&self, invite_token: &str) -> StorageResult<Option<Invite>> {
        self.inner.invite(invite_token).await
    }

    async fn has_pending_invite(
        &self,
        inviter: &str,
        invitee_email_hash: &str,
        now: chrono::DateTime<Utc>,
    ) -> StorageResult<bool> {
        self.inner
            .has_pending_invite(inviter, invitee_email_hash, now)
            .await
    }

    async fn put_relative(&self, relative: Relative) -> StorageResult<()> {
        self.inner.put_relative(relative).await
    }

    async fn relative(&self, id: &str) -> StorageResult<Option<Relative>> {
        self.inner.relative(id).await
    }

    async fn delete_relative(&self, id: &str) -> StorageResult<bool> {
        self.inner.delete_relative(id).await
    }

    async fn put_relative_if(
        &self,
        relative: Relative,
        expected_version: u64,
    ) -> StorageResult<TxOutcome> {
        self.inner.put_relative_if(relative, expected_version).await
    }

    async fn put_account(&self, account: AccountKeyMaterial) -> StorageResult<()> {
        self.inner.put_account(account).await
    }

    async fn account(&self, email_hash: &str) -> StorageResult<Option<AccountKeyMaterial>> {
        self.inner.account(email_hash).await
    }

    async fn commit_acceptance(&self, _commit: AcceptanceCommit) -> StorageResult<TxOutcome> {
        Err(StorageError::Backend("injected crash at commit".into()))
    }

    async fn commit_decline(&self, commit: DeclineCommit) -> StorageResult<TxOutcome> {
        self.inner.commit_decline(commit).await
    }

    async fn commit_recovery(&self, commit: RecoveryCommit) -> StorageResult<TxOutcome> {
        self.inner.commit_recovery(commit).await
    }
}

/// Store that rendezvouses the first two `relative()` reads on a
/// barrier, forcing two writers to read the same record version before
/// either commits. Later reads (the retry path) pass straight through.
pub struct RendezvousReadStore {
    pub inner: MemoryStore,
    barrier: Barrier,
    reads: AtomicUsize,
}

impl RendezvousReadStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            barrier: Barrier::new(2),
            reads: AtomicUsize::new(0),
        }
    }
}

impl RegistryStore for RendezvousReadStore {
    async fn put_token(&self, token: VerificationToken) -> StorageResult<()> {
        self.inner.put_token(token).await
    }

    async fn token(&self, token: &str) -> StorageResult<Option<VerificationToken>> {
        self.inner.token(token).await
    }

    async fn consume_token(
        &self,
        token: &str,
        now: chrono::DateTime<Utc>,
    ) -> StorageResult<TxOutcome> {
        self.inner.consume_token(token, now).await
    }

    async fn purge_expired_tokens(&self, now: chrono::DateTime<Utc>) -> StorageResult<usize> {
        self.inner.purge_expired_tokens(now).await
    }

    async fn put_invite(&self, invite: Invite) -> StorageResult<()> {
        self.inner.put_invite(invite).await
    }

    async fn invite(&self, invite_token: &str) -> StorageResult<Option<Invite>> {
        self.inner.invite(invite_token).await
    }

    async fn has_pending_invite(
        &self,
        inviter: &str,
        invitee_email_hash: &str,
        now: chrono::DateTime<Utc>,
    ) -> StorageResult<bool> {
        self.inner
            .has_pending_invite(inviter, invitee_email_hash, now)
            .await
    }

    async fn put_relative(&self, relative: Relative) -> StorageResult<()> {
        self.inner.put_relative(relative).await
    }

    async fn relative(&self, id: &str) -> StorageResult<Option<Relative>> {
        if self.reads.fetch_add(1, Ordering::SeqCst) < 2 {
            self.barrier.wait().await;
        }
        self.inner.relative(id).await
    }

    async fn delete_relative(&self, id: &str) -> StorageResult<bool> {
        self.inner.delete_relative(id).await
    }

    async fn put_relative_if(
        &self,
        relative: Relative,
        expected_version: u64,
    ) -> StorageResult<TxOutcome> {
        self.inner.put_relative_if(relative, expected_version).await
    }

    async fn put_account(&self, account: AccountKeyMaterial) -> StorageResult<()> {
        self.inner.put_account(account).await
    }

    async fn account(&self, email_hash: &str) -> StorageResult<Option<AccountKeyMaterial>> {
        self.inner.account(email_hash).await
    }

    async fn commit_acceptance(&self, commit: AcceptanceCommit) -> StorageResult<TxOutcome> {
        self.inner.commit_acceptance(commit).await
    }

    async fn commit_decline(&self, commit: DeclineCommit) -> StorageResult<TxOutcome> {
        self.inner.commit_decline(commit).await
    }

    async fn commit_recovery(&self, commit: RecoveryCommit) -> StorageResult<TxOutcome> {
        self.inner.commit_recovery(commit).await
    }
}
