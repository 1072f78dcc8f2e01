//! Single-use, typed, expiring verification tokens.

use crate::invite::SharePermission;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Token types, each with its own payload shape and default TTL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    EmailVerification,
    EmailVerificationCode,
    PasswordRecovery,
    PasswordRecoveryCode,
    FamilyInvite,
}

impl TokenType {
    /// Default lifetime. Codes expire fast; link tokens slower.
    pub fn default_ttl(self) -> Duration {
        match self {
            TokenType::EmailVerification => Duration::hours(24),
            TokenType::EmailVerificationCode => Duration::minutes(10),
            TokenType::PasswordRecovery => Duration::hours(1),
            TokenType::PasswordRecoveryCode => Duration::minutes(10),
            TokenType::FamilyInvite => Duration::days(7),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TokenType::EmailVerification => "email_verification",
            TokenType::EmailVerificationCode => "email_verification_code",
            TokenType::PasswordRecovery => "password_recovery",
            TokenType::PasswordRecoveryCode => "password_recovery_code",
            TokenType::FamilyInvite => "family_invite",
        }
    }
}

/// Payload tagged by token type: a token with a payload that does not
/// match its declared type is unrepresentable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "token_type", rename_all = "snake_case")]
pub enum TokenPayload {
    EmailVerification {
        user_id: String,
    },
    EmailVerificationCode {
        user_id: String,
        code: String,
    },
    /// Snapshot of the account's password hash at challenge time, so a
    /// leaked token is dead after the user has already recovered once.
    PasswordRecovery {
        old_password_hash: String,
    },
    PasswordRecoveryCode {
        code: String,
    },
    FamilyInvite {
        inviter: String,
        inviter_name: String,
        relation: String,
        permission: SharePermission,
    },
}

impl TokenPayload {
    pub fn token_type(&self) -> TokenType {
        match self {
            TokenPayload::EmailVerification { .. } => TokenType::EmailVerification,
            TokenPayload::EmailVerificationCode { .. } => TokenType::EmailVerificationCode,
            TokenPayload::PasswordRecovery { .. } => TokenType::PasswordRecovery,
            TokenPayload::PasswordRecoveryCode { .. } => TokenType::PasswordRecoveryCode,
            TokenPayload::FamilyInvite { .. } => TokenType::FamilyInvite,
        }
    }
}

/// A single-use verification token gating one sensitive state transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationToken {
    /// Opaque unguessable token string; also the storage key.
    pub token: String,
    pub email_hash: String,
    #[serde(flatten)]
    pub payload: TokenPayload,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl VerificationToken {
    pub fn token_type(&self) -> TokenType {
        self.payload.token_type()
    }

    /// Expiry dominates the `used` flag: an expired token is expired
    /// even if never consumed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// True when the token expires within `margin` of `now`. Lets a
    /// caller prompt for re-issue before the token actually dies.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        now + margin > self.expires_at
    }
}
