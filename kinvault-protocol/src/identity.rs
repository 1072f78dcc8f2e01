//! Identity resolution port.

/// Maps an opaque user handle to their current wrap public key.
///
/// Consulted at invite acceptance: if the inviter's key rotated since
/// the invite snapshotted it, acceptance is refused and the invite must
/// be re-issued.
#[allow(async_fn_in_trait)]
pub trait IdentityResolver {
    async fn current_public_key(&self, identity: &str) -> Option<[u8; 32]>;
}
