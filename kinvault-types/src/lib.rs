//! Shared domain types for KinVault's encrypted-sharing core.
//!
//! A [`Relative`] record owns one encrypted blob and an insertion-ordered
//! wrapped-key directory. Authorization spreads through [`Invite`]s, each
//! gated by a single-use [`VerificationToken`]. [`AccountKeyMaterial`]
//! holds the server's half of the account-recovery secret split.

mod invite;
mod record;
mod token;

pub use invite::{Invite, InviteStatus, SharePermission};
pub use record::{AccountKeyMaterial, Relative, RelativeMetadata, Visibility};
pub use token::{TokenPayload, TokenType, VerificationToken};
