//! Per-record wrapped-key directory operations.

use crate::error::{tx_result, ProtocolError, ProtocolResult};
use chrono::Utc;
use kinvault_crypto::{WrapMeta, WrappedDek, WrappedDekEntry};
use kinvault_storage::{RegistryStore, TxOutcome};
use kinvault_types::{Relative, Visibility};
use std::sync::Arc;
use tracing::{debug, info};

/// Maintains the (recipient → wrapped DEK) directory of each record.
pub struct WrappedKeyDirectory<S> {
    store: Arc<S>,
}

impl<S: RegistryStore> WrappedKeyDirectory<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Idempotent upsert keyed by recipient. A `private` record admits
    /// only the owner's wrap.
    ///
    /// Optimistic concurrency: the write commits only against the version
    /// we read. On a stale version the whole check-and-mutate reruns from
    /// a fresh read, so a concurrent revoke is never silently undone.
    pub async fn add_or_replace(
        &self,
        relative_id: &str,
        recipient: String,
        wrapped: WrappedDek,
        meta: WrapMeta,
    ) -> ProtocolResult<Relative> {
        loop {
            let mut relative = self.load(relative_id).await?;
            if relative.visibility == Visibility::Private && recipient != relative.owner {
                return Err(ProtocolError::Conflict(
                    "private record admits only the owner's wrap",
                ));
            }

            let expected = relative.version;
            let now = Utc::now();
            relative.upsert_wrap(WrappedDekEntry {
                recipient: recipient.clone(),
                wrapped: wrapped.clone(),
                meta: meta.clone(),
                added_at: now,
            });
            relative.updated_at = now;
            relative.version += 1;
            match self.store.put_relative_if(relative.clone(), expected).await? {
                TxOutcome::StaleVersion => continue,
                outcome => {
                    tx_result(outcome, "record changed concurrently")?;
                    debug!(relative_id, "wrap entry upserted");
                    return Ok(relative);
                }
            }
        }
    }

    /// Removes a recipient's wrap. The owner entry can only disappear
    /// through record deletion, never through revocation.
    pub async fn revoke(&self, relative_id: &str, recipient: &str) -> ProtocolResult<Relative> {
        loop {
            let mut relative = self.load(relative_id).await?;
            if recipient == relative.owner {
                return Err(ProtocolError::Conflict(
                    "owner wrap cannot be revoked; delete the record instead",
                ));
            }
            if !relative.remove_wrap(recipient) {
                return Err(ProtocolError::NotFound("wrap entry"));
            }

            let expected = relative.version;
            relative.updated_at = Utc::now();
            relative.version += 1;
            match self.store.put_relative_if(relative.clone(), expected).await? {
                TxOutcome::StaleVersion => continue,
                outcome => {
                    tx_result(outcome, "record changed concurrently")?;
                    info!(relative_id, "wrap entry revoked");
                    return Ok(relative);
                }
            }
        }
    }

    /// The wrap for one recipient.
    pub async fn wrap_for(
        &self,
        relative_id: &str,
        recipient: &str,
    ) -> ProtocolResult<WrappedDekEntry> {
        let relative = self.load(relative_id).await?;
        relative
            .wrap_for(recipient)
            .cloned()
            .ok_or(ProtocolError::NotFound("wrap entry"))
    }

    /// Recipient handles in insertion order (audit view).
    pub async fn recipients(&self, relative_id: &str) -> ProtocolResult<Vec<String>> {
        Ok(self.load(relative_id).await?.recipients())
    }

    /// Deletes the record. This is the immediate revocation of every
    /// wrap, the owner's included.
    pub async fn delete_record(&self, relative_id: &str) -> ProtocolResult<()> {
        if !self.store.delete_relative(relative_id).await? {
            return Err(ProtocolError::NotFound("relative record"));
        }
        info!(relative_id, "relative record deleted, all wraps revoked");
        Ok(())
    }

    async fn load(&self, relative_id: &str) -> ProtocolResult<Relative> {
        self.store
            .relative(relative_id)
            .await?
            .ok_or(ProtocolError::NotFound("relative record"))
    }
}
