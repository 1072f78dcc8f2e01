//! Recovery ceremony tests: share handout, the password-hash replay
//! guard, and atomic completion.

mod support;

use kinvault_protocol::{ProtocolError, RecoveryService, RecoveryUpdate};
use kinvault_storage::{MemoryStore, RegistryStore};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use support::{account, wire_blob};

const EMAIL_HASH: &str = "account-email-hash";

async fn service_with_account() -> (RecoveryService<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store
        .put_account(account(EMAIL_HASH, "pw-hash-v1"))
        .await
        .unwrap();
    (RecoveryService::new(Arc::clone(&store)), store)
}

fn update(new_hash: &str) -> RecoveryUpdate {
    RecoveryUpdate {
        server_share: vec![0x33; 32],
        encrypted_private_key: wire_blob(),
        master_salt: vec![0x44; 16],
        new_password_hash: new_hash.into(),
    }
}

#[tokio::test]
async fn challenge_for_unknown_account_is_not_found() {
    let svc = RecoveryService::new(Arc::new(MemoryStore::new()));
    let err = svc.issue_challenge("nobody").await.unwrap_err();
    assert!(matches!(err, ProtocolError::NotFound("account")));
}

#[tokio::test]
async fn share_handout_leaves_token_consumable() {
    let (svc, store) = service_with_account().await;
    let token = svc.issue_challenge(EMAIL_HASH).await.unwrap();

    // Read-only twice, then the token still completes.
    let share = svc.server_share(&token.token).await.unwrap();
    assert_eq!(share, vec![0x11; 32]);
    svc.server_share(&token.token).await.unwrap();

    svc.complete_recovery(&token.token, update("pw-hash-v2"))
        .await
        .unwrap();
    assert!(store.token(&token.token).await.unwrap().unwrap().used);
}

#[tokio::test]
async fn completion_replaces_all_account_artifacts() {
    let (svc, store) = service_with_account().await;
    let token = svc.issue_challenge(EMAIL_HASH).await.unwrap();

    svc.complete_recovery(&token.token, update("pw-hash-v2"))
        .await
        .unwrap();

    let stored = store.account(EMAIL_HASH).await.unwrap().unwrap();
    assert_eq!(stored.password_hash, "pw-hash-v2");
    assert_eq!(stored.server_share, vec![0x33; 32]);
    assert_eq!(stored.master_salt, vec![0x44; 16]);
}

#[tokio::test]
async fn completed_challenge_cannot_be_replayed() {
    let (svc, _store) = service_with_account().await;
    let token = svc.issue_challenge(EMAIL_HASH).await.unwrap();

    svc.complete_recovery(&token.token, update("pw-hash-v2"))
        .await
        .unwrap();

    let err = svc
        .complete_recovery(&token.token, update("pw-hash-v3"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::AlreadyUsed));
    let err = svc.server_share(&token.token).await.unwrap_err();
    assert!(matches!(err, ProtocolError::AlreadyUsed));
}

#[tokio::test]
async fn password_change_invalidates_outstanding_challenge() {
    let (svc, store) = service_with_account().await;
    let token = svc.issue_challenge(EMAIL_HASH).await.unwrap();

    // The password changes while the (still unexpired) token is out.
    store
        .put_account(account(EMAIL_HASH, "pw-hash-rotated"))
        .await
        .unwrap();

    let err = svc.server_share(&token.token).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Conflict(_)));
    let err = svc
        .complete_recovery(&token.token, update("pw-hash-v2"))
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Conflict(_)));

    // The stale token was refused, not consumed.
    assert!(!store.token(&token.token).await.unwrap().unwrap().used);
}

#[tokio::test]
async fn malformed_key_envelope_fails_before_any_write() {
    let (svc, store) = service_with_account().await;
    let token = svc.issue_challenge(EMAIL_HASH).await.unwrap();

    let mut bad = update("pw-hash-v2");
    bad.encrypted_private_key.iv = "@@not-base64@@".into();

    let err = svc
        .complete_recovery(&token.token, bad)
        .await
        .unwrap_err();
    assert!(matches!(err, ProtocolError::Format(_)));

    // Account untouched, token still live.
    let stored = store.account(EMAIL_HASH).await.unwrap().unwrap();
    assert_eq!(stored.password_hash, "pw-hash-v1");
    assert!(!store.token(&token.token).await.unwrap().unwrap().used);
}

#[tokio::test]
async fn non_recovery_token_is_refused() {
    let (svc, store) = service_with_account().await;

    let tokens = kinvault_protocol::VerificationTokenManager::new(Arc::clone(&store));
    let token = tokens
        .issue(
            EMAIL_HASH.into(),
            kinvault_types::TokenPayload::EmailVerification {
                user_id: "user-1".into(),
            },
            None,
        )
        .await
        .unwrap();

    let err = svc.server_share(&token.token).await.unwrap_err();
    assert!(matches!(err, ProtocolError::NotFound("recovery token")));
}
