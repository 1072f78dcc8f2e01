//! Encrypted-sharing and key-distribution core for KinVault.
//!
//! Orchestrates the lifecycle around per-record DEKs without ever
//! holding one in plaintext:
//! - [`WrappedKeyDirectory`] maintains each record's per-recipient
//!   wrapped-DEK entries
//! - [`VerificationTokenManager`] issues and consumes the single-use
//!   tokens gating every sensitive state transition
//! - [`InviteProtocol`] drives the `pending → accepted | declined`
//!   invite state machine, committing acceptance atomically through
//!   the storage port
//! - [`RecoveryService`] runs the account-recovery ceremony over the
//!   server-held secret share
//!
//! All services are generic over the injected
//! [`RegistryStore`](kinvault_storage::RegistryStore) port.

mod directory;
mod error;
mod identity;
mod invites;
mod recovery;
mod tokens;

pub use directory::WrappedKeyDirectory;
pub use error::{ProtocolError, ProtocolResult};
pub use identity::IdentityResolver;
pub use invites::{AcceptTarget, CreateInvite, InviteProtocol, NewRelative};
pub use recovery::{RecoveryService, RecoveryUpdate};
pub use tokens::VerificationTokenManager;
