//! Protocol error taxonomy.
//!
//! `Expired`, `AlreadyUsed`, and `Conflict` are terminal for the token or
//! invite at hand: the caller must restart the flow, never retry the same
//! token. `Storage` failures during a commit leave no partial effect and
//! are safe to retry. Messages never carry token strings, wrap bytes, or
//! key material.

use kinvault_crypto::EnvelopeError;
use kinvault_storage::{StorageError, TxOutcome};
use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors surfaced by the sharing core.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error(transparent)]
    Format(#[from] EnvelopeError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("token has expired")]
    Expired,

    #[error("token has already been used")]
    AlreadyUsed,

    #[error("conflict: {0}")]
    Conflict(&'static str),

    #[error("a pending invite already exists for this invitee")]
    DuplicatePendingInvite,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Maps a store transaction outcome onto the taxonomy. `conflict` names
/// the precondition that can fail for this particular commit.
pub(crate) fn tx_result(outcome: TxOutcome, conflict: &'static str) -> ProtocolResult<()> {
    match outcome {
        TxOutcome::Committed => Ok(()),
        TxOutcome::TokenNotFound => Err(ProtocolError::NotFound("verification token")),
        TxOutcome::TokenExpired => Err(ProtocolError::Expired),
        TxOutcome::TokenUsed => Err(ProtocolError::AlreadyUsed),
        TxOutcome::Conflict => Err(ProtocolError::Conflict(conflict)),
        // Retry-minded callers intercept this before mapping.
        TxOutcome::StaleVersion => Err(ProtocolError::Conflict("record changed concurrently")),
    }
}
