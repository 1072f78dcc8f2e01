//! Invite lifecycle records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Invite state: `pending` moves exactly once to a terminal state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
    Declined,
}

/// Access level granted to an accepted invitee.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SharePermission {
    Read,
    Write,
}

/// A family invite, retained indefinitely for audit after resolution.
///
/// `invite_token` doubles as the join key to the `family_invite`
/// verification token that gates acceptance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    pub invite_token: String,
    pub inviter: String,
    /// Snapshot of the inviter's wrap key at invite time. Acceptance is
    /// refused if the live key no longer matches.
    pub inviter_public_key: [u8; 32],
    pub invitee_email_hash: String,
    pub relation: String,
    pub permission: SharePermission,
    pub status: InviteStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Invite {
    pub fn is_pending(&self) -> bool {
        self.status == InviteStatus::Pending
    }
}
