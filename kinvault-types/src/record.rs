//! Relative records and account key material.

use chrono::{DateTime, Utc};
use kinvault_crypto::{EncryptedBlob, WrappedDekEntry};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who may hold a wrap for a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Only the owner's wrap may exist.
    Private,
    /// Additional identities may be added via the invite protocol.
    Shared,
    /// Plaintext metadata is exposed without any wrap; the blob stays sealed.
    Public,
}

/// Plaintext fields the owner has explicitly marked non-sensitive.
///
/// Anything confidential belongs inside the encrypted blob, not here.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_donation_at: Option<DateTime<Utc>>,
    /// Coarse time-availability window, e.g. "weekday evenings".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_window: Option<String>,
}

/// One encrypted relative record with its wrapped-key directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relative {
    pub id: String,
    /// Identity of the user who created the record.
    pub owner: String,
    /// Set once the relative has registered an account of their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_recipient: Option<String>,
    pub relation: String,
    pub visibility: Visibility,
    pub metadata: RelativeMetadata,
    pub blob: EncryptedBlob,
    /// Insertion-ordered; at most one live wrap per recipient.
    pub wraps: Vec<WrappedDekEntry>,
    /// Optimistic-concurrency version, bumped on every guarded write.
    /// Writers read a record at some version and commit only if the
    /// stored version still matches.
    #[serde(default)]
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Relative {
    /// Creates a record with the owner's wrap as the first directory entry.
    pub fn new(
        owner: String,
        relation: String,
        visibility: Visibility,
        metadata: RelativeMetadata,
        blob: EncryptedBlob,
        owner_entry: WrappedDekEntry,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            owner,
            linked_recipient: None,
            relation,
            visibility,
            metadata,
            blob,
            wraps: vec![owner_entry],
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Upserts a wrap keyed by recipient, preserving insertion position
    /// on replace. Re-inviting the same recipient overwrites, never
    /// duplicates.
    pub fn upsert_wrap(&mut self, entry: WrappedDekEntry) {
        match self
            .wraps
            .iter()
            .position(|e| e.recipient == entry.recipient)
        {
            Some(i) => self.wraps[i] = entry,
            None => self.wraps.push(entry),
        }
    }

    /// Removes a recipient's wrap. Returns whether an entry was removed.
    pub fn remove_wrap(&mut self, recipient: &str) -> bool {
        let before = self.wraps.len();
        self.wraps.retain(|e| e.recipient != recipient);
        self.wraps.len() < before
    }

    /// The wrap for one recipient, if any.
    pub fn wrap_for(&self, recipient: &str) -> Option<&WrappedDekEntry> {
        self.wraps.iter().find(|e| e.recipient == recipient)
    }

    /// Recipient handles in insertion order.
    pub fn recipients(&self) -> Vec<String> {
        self.wraps.iter().map(|e| e.recipient.clone()).collect()
    }
}

/// Server-held recovery artifacts for one account.
///
/// `server_share` is one share of a client-side secret split; alone it is
/// computationally useless for reconstructing the protected secret.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountKeyMaterial {
    pub email_hash: String,
    /// Current password hash; recovery challenges snapshot it to detect
    /// replay after a password change.
    pub password_hash: String,
    pub server_share: Vec<u8>,
    pub encrypted_private_key: EncryptedBlob,
    pub master_salt: Vec<u8>,
    pub updated_at: DateTime<Utc>,
}
