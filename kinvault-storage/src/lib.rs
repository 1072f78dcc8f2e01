//! Storage port for KinVault's sharing core.
//!
//! The durable store is the only shared resource of the whole subsystem,
//! so it is modeled as an injected port rather than a process-wide
//! singleton: [`RegistryStore`] exposes get/put plus the atomic commit
//! operations every multi-field mutation needs. [`MemoryStore`] is the
//! in-process implementation used by tests and single-node deployments;
//! a database-backed implementation satisfies the same trait with a
//! transactional write per commit method.

mod error;
mod memory;
mod port;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use port::{AcceptanceCommit, DeclineCommit, RecoveryCommit, RegistryStore, TxOutcome};
