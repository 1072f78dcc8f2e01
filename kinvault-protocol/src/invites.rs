//! Invite state machine: `pending → accepted | declined`, exactly once.
//!
//! Creation mints a `family_invite` verification token and records the
//! invite as pending. Acceptance validates the token, validates any new
//! record payload at the envelope boundary, and commits token
//! consumption, invite transition, and directory update through one
//! atomic store operation — a half-applied acceptance is never visible.

use crate::error::{tx_result, ProtocolError, ProtocolResult};
use crate::identity::IdentityResolver;
use crate::tokens::VerificationTokenManager;
use chrono::Utc;
use kinvault_crypto::{decode_blob, EncryptedBlobWire, WrapMeta, WrappedDek, WrappedDekEntry};
use kinvault_storage::{AcceptanceCommit, DeclineCommit, RegistryStore, TxOutcome};
use kinvault_types::{
    Invite, InviteStatus, Relative, RelativeMetadata, SharePermission, TokenPayload, Visibility,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Request to invite a new person into a record's circle.
#[derive(Clone, Debug)]
pub struct CreateInvite {
    pub inviter: String,
    pub inviter_name: String,
    /// Wrap key snapshot; acceptance is refused if it rotates.
    pub inviter_public_key: [u8; 32],
    pub invitee_email_hash: String,
    pub relation: String,
    pub permission: SharePermission,
}

/// A record created at acceptance time, owned by the acceptor.
///
/// The acceptor encrypted the blob client-side with a fresh DEK and
/// wrapped that DEK for themself; the inviter's wrap is installed by the
/// acceptance transaction.
#[derive(Clone, Debug)]
pub struct NewRelative {
    pub owner: String,
    pub blob: EncryptedBlobWire,
    pub owner_wrap: WrappedDek,
    pub owner_wrap_meta: WrapMeta,
    pub visibility: Visibility,
    pub metadata: RelativeMetadata,
}

/// Where the inviter's wrap lands on acceptance.
#[derive(Clone, Debug)]
pub enum AcceptTarget {
    /// An existing record, typically one the acceptor created earlier.
    Existing { relative_id: String },
    /// A record created as part of this acceptance.
    New(Box<NewRelative>),
}

/// Drives the invite lifecycle over the storage and identity ports.
pub struct InviteProtocol<S, R> {
    store: Arc<S>,
    identity: Arc<R>,
    tokens: VerificationTokenManager<S>,
}

impl<S: RegistryStore, R: IdentityResolver> InviteProtocol<S, R> {
    pub fn new(store: Arc<S>, identity: Arc<R>) -> Self {
        let tokens = VerificationTokenManager::new(Arc::clone(&store));
        Self {
            store,
            identity,
            tokens,
        }
    }

    /// Creates a pending invite gated by a fresh `family_invite` token.
    ///
    /// A second invite for the same (inviter, invitee) pair while one is
    /// pending is rejected rather than superseding it.
    pub async fn create_invite(&self, req: CreateInvite) -> ProtocolResult<Invite> {
        let now = Utc::now();
        if self
            .store
            .has_pending_invite(&req.inviter, &req.invitee_email_hash, now)
            .await?
        {
            return Err(ProtocolError::DuplicatePendingInvite);
        }

        let token = self
            .tokens
            .issue(
                req.invitee_email_hash.clone(),
                TokenPayload::FamilyInvite {
                    inviter: req.inviter.clone(),
                    inviter_name: req.inviter_name,
                    relation: req.relation.clone(),
                    permission: req.permission,
                },
                None,
            )
            .await?;

        let invite = Invite {
            invite_token: token.token.clone(),
            inviter: req.inviter,
            inviter_public_key: req.inviter_public_key,
            invitee_email_hash: req.invitee_email_hash,
            relation: req.relation,
            permission: req.permission,
            status: InviteStatus::Pending,
            created_at: now,
            resolved_at: None,
        };
        self.store.put_invite(invite.clone()).await?;
        info!(
            inviter = %invite.inviter,
            relation = %invite.relation,
            "family invite created"
        );
        Ok(invite)
    }

    /// Accepts an invite: validates the token, installs the inviter's
    /// wrap on the target record, and commits token consumption, invite
    /// transition, and directory update together or not at all.
    pub async fn accept_invite(
        &self,
        token: &str,
        wrapped_dek_for_inviter: WrappedDek,
        wrap_meta: WrapMeta,
        target: AcceptTarget,
    ) -> ProtocolResult<Relative> {
        let invite = self.pending_invite_for(token).await?;

        // Key rotation policy: the snapshot taken at invite time must
        // still be the inviter's live key, otherwise the invitee would
        // wrap the DEK for a key they never agreed to.
        match self.identity.current_public_key(&invite.inviter).await {
            Some(pk) if pk == invite.inviter_public_key => {}
            _ => {
                warn!(inviter = %invite.inviter, "inviter key rotated since invite creation");
                return Err(ProtocolError::Conflict(
                    "inviter key rotated since invite creation",
                ));
            }
        }

        let now = Utc::now();
        let inviter_entry = WrappedDekEntry {
            recipient: invite.inviter.clone(),
            wrapped: wrapped_dek_for_inviter,
            meta: wrap_meta,
            added_at: now,
        };

        match target {
            AcceptTarget::New(payload) => {
                // Envelope boundary check before anything is persisted.
                let blob = decode_blob(&payload.blob)?;
                blob.validate()?;
                if payload.visibility != Visibility::Shared {
                    return Err(ProtocolError::Conflict(
                        "a record created through an invite must be shared",
                    ));
                }
                let owner = payload.owner.clone();
                let mut relative = Relative::new(
                    payload.owner,
                    invite.relation.clone(),
                    payload.visibility,
                    payload.metadata,
                    blob,
                    WrappedDekEntry {
                        recipient: owner.clone(),
                        wrapped: payload.owner_wrap,
                        meta: payload.owner_wrap_meta,
                        added_at: now,
                    },
                );
                relative.linked_recipient = Some(owner);
                relative.upsert_wrap(inviter_entry);

                let outcome = self
                    .store
                    .commit_acceptance(AcceptanceCommit {
                        token: token.to_string(),
                        invite_token: invite.invite_token.clone(),
                        accepted_at: now,
                        relative: relative.clone(),
                        expected_version: None,
                    })
                    .await?;
                tx_result(outcome, "invite was concurrently resolved")?;

                info!(relative_id = %relative.id, "invite accepted");
                Ok(relative)
            }
            AcceptTarget::Existing { relative_id } => {
                // Optimistic concurrency against other acceptances and
                // directory writers on the same record: the commit aborts
                // on a stale version and we rerun from a fresh read, so a
                // committed acceptance can never lose its wrap.
                loop {
                    let mut relative = self
                        .store
                        .relative(&relative_id)
                        .await?
                        .ok_or(ProtocolError::NotFound("relative record"))?;
                    if relative.visibility == Visibility::Private {
                        return Err(ProtocolError::Conflict(
                            "private record admits only the owner's wrap",
                        ));
                    }

                    let expected = relative.version;
                    relative.upsert_wrap(inviter_entry.clone());
                    relative.updated_at = now;
                    relative.version += 1;

                    let outcome = self
                        .store
                        .commit_acceptance(AcceptanceCommit {
                            token: token.to_string(),
                            invite_token: invite.invite_token.clone(),
                            accepted_at: now,
                            relative: relative.clone(),
                            expected_version: Some(expected),
                        })
                        .await?;
                    if outcome == TxOutcome::StaleVersion {
                        continue;
                    }
                    tx_result(outcome, "invite was concurrently resolved")?;

                    info!(relative_id = %relative.id, "invite accepted");
                    return Ok(relative);
                }
            }
        }
    }

    /// Declines an invite, consuming its token. No directory change.
    pub async fn decline_invite(&self, token: &str) -> ProtocolResult<()> {
        let invite = self.pending_invite_for(token).await?;

        let outcome = self
            .store
            .commit_decline(DeclineCommit {
                token: token.to_string(),
                invite_token: invite.invite_token,
                declined_at: Utc::now(),
            })
            .await?;
        tx_result(outcome, "invite was concurrently resolved")?;

        info!("invite declined");
        Ok(())
    }

    /// Validates the token as a live `family_invite` and loads its
    /// still-pending invite.
    async fn pending_invite_for(&self, token: &str) -> ProtocolResult<Invite> {
        let stored = self.tokens.validate(token).await?;
        if !matches!(stored.payload, TokenPayload::FamilyInvite { .. }) {
            // A token of another type is indistinguishable, to the
            // caller, from an absent invite token.
            return Err(ProtocolError::NotFound("family invite token"));
        }

        let invite = self
            .store
            .invite(token)
            .await?
            .ok_or(ProtocolError::NotFound("invite"))?;
        if !invite.is_pending() {
            return Err(ProtocolError::Conflict("invite already resolved"));
        }
        Ok(invite)
    }
}
