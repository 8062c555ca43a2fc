//! Login round trips against an issuer whose ID tokens cannot be verified

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use oidc_login::{
    CoordinationError, ErrorKind, InMemoryUserStore, MemorySession, ProviderError, SessionStore,
    TokenVerificationError,
};
use serde_json::json;

use crate::common::*;

struct Harness {
    issuer: MockIssuer,
    users: Arc<InMemoryUserStore>,
    orchestrator: oidc_login::AuthOrchestrator,
    session: MemorySession,
}

async fn setup() -> Harness {
    let issuer = MockIssuer::start().await;
    let users = Arc::new(InMemoryUserStore::new());
    let orchestrator = orchestrator(relaxed_provider(&issuer), users.clone());

    Harness {
        issuer,
        users,
        orchestrator,
        session: MemorySession::new(),
    }
}

fn provider_error(err: CoordinationError) -> ProviderError {
    match err {
        CoordinationError::Provider(e) => e,
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_paypal_login_uses_userinfo_subject() {
    let h = setup().await;
    let pending = begin_login(&h.orchestrator, &h.session).await;

    // Signed with a key nobody publishes; the signature is never checked
    let claims = id_token_claims("unreliable-sub", &pending.nonce, Some("Ignored"));
    h.issuer.set_id_token(&sign_id_token(KEY_B_PEM, KID_B, &claims));
    h.issuer.set_userinfo(json!({
        "user_id": "https://www.paypal.com/webapps/auth/identity/user/abc123",
        "name": "Bob"
    }));

    let user = h
        .orchestrator
        .callback(&callback_params(Some("c1"), Some(&pending.state)), &h.session)
        .await
        .expect("callback succeeds");

    assert_eq!(
        user.external_identity,
        "paypal:https://www.paypal.com/webapps/auth/identity/user/abc123"
    );
    assert_eq!(user.username, "");
    assert_eq!(h.session.user_id().await.unwrap(), Some(user.id));
    assert!(!h.session.has_pending_auth("paypal").await);
    assert_eq!(h.issuer.jwks_requests(), 0);
    assert_eq!(h.issuer.userinfo_requests(), 1);
}

#[tokio::test]
async fn test_paypal_token_exchange_uses_basic_auth() {
    let h = setup().await;
    let pending = begin_login(&h.orchestrator, &h.session).await;

    let claims = id_token_claims("x", &pending.nonce, None);
    h.issuer.set_id_token(&sign_id_token(KEY_A_PEM, KID_A, &claims));
    h.issuer.set_userinfo(json!({ "user_id": "u-1" }));

    h.orchestrator
        .callback(&callback_params(Some("c1"), Some(&pending.state)), &h.session)
        .await
        .expect("callback succeeds");

    let expected = format!(
        "Basic {}",
        STANDARD.encode(format!("{CLIENT_ID}:{CLIENT_SECRET}"))
    );
    assert_eq!(h.issuer.last_token_authorization(), Some(expected));

    let form = h.issuer.last_token_form();
    assert_eq!(
        form.get("grant_type").map(String::as_str),
        Some("authorization_code")
    );
    assert_eq!(form.get("code").map(String::as_str), Some("c1"));
    assert_eq!(
        form.get("redirect_uri").map(String::as_str),
        Some(REDIRECT_URI)
    );
    assert!(!form.contains_key("client_secret"));

    assert_eq!(
        h.issuer.last_userinfo_authorization().as_deref(),
        Some("Bearer mock-access-token")
    );
}

#[tokio::test]
async fn test_userinfo_without_user_id_is_rejected() {
    let h = setup().await;
    let pending = begin_login(&h.orchestrator, &h.session).await;

    let claims = id_token_claims("x", &pending.nonce, None);
    h.issuer.set_id_token(&sign_id_token(KEY_A_PEM, KID_A, &claims));
    h.issuer.set_userinfo(json!({ "name": "Bob" }));

    let err = h
        .orchestrator
        .callback(&callback_params(Some("c1"), Some(&pending.state)), &h.session)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(
        matches!(provider_error(err), ProviderError::Validation(msg) if msg == "no unique identifier")
    );
    assert!(h.users.is_empty().await);
    assert_eq!(h.session.user_id().await.unwrap(), None);
}

#[tokio::test]
async fn test_userinfo_with_empty_user_id_is_rejected() {
    let h = setup().await;
    let pending = begin_login(&h.orchestrator, &h.session).await;

    let claims = id_token_claims("x", &pending.nonce, None);
    h.issuer.set_id_token(&sign_id_token(KEY_A_PEM, KID_A, &claims));
    h.issuer.set_userinfo(json!({ "user_id": "" }));

    let err = h
        .orchestrator
        .callback(&callback_params(Some("c1"), Some(&pending.state)), &h.session)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(h.users.is_empty().await);
}

#[tokio::test]
async fn test_malformed_token_is_rejected_before_userinfo() {
    let h = setup().await;
    let pending = begin_login(&h.orchestrator, &h.session).await;
    h.issuer.set_id_token("garbage");
    h.issuer.set_userinfo(json!({ "user_id": "u-1" }));

    let err = h
        .orchestrator
        .callback(&callback_params(Some("c1"), Some(&pending.state)), &h.session)
        .await
        .unwrap_err();

    assert!(matches!(
        provider_error(err),
        ProviderError::IdToken(TokenVerificationError::Malformed(_))
    ));
    assert_eq!(h.issuer.userinfo_requests(), 0);
    assert!(h.users.is_empty().await);
}

#[tokio::test]
async fn test_nonce_is_still_checked() {
    let h = setup().await;
    let pending = begin_login(&h.orchestrator, &h.session).await;

    let claims = id_token_claims("x", "replayed-nonce", None);
    h.issuer.set_id_token(&unsigned_id_token(&claims));
    h.issuer.set_userinfo(json!({ "user_id": "u-1" }));

    let err = h
        .orchestrator
        .callback(&callback_params(Some("c1"), Some(&pending.state)), &h.session)
        .await
        .unwrap_err();

    assert!(
        matches!(provider_error(err), ProviderError::Protocol(msg) if msg == "csrf nonce mismatch")
    );
    assert_eq!(h.issuer.userinfo_requests(), 0);
}

#[tokio::test]
async fn test_audience_is_still_checked() {
    let h = setup().await;
    let pending = begin_login(&h.orchestrator, &h.session).await;

    let mut claims = id_token_claims("x", &pending.nonce, None);
    claims["aud"] = json!("another-client");
    h.issuer.set_id_token(&unsigned_id_token(&claims));
    h.issuer.set_userinfo(json!({ "user_id": "u-1" }));

    let err = h
        .orchestrator
        .callback(&callback_params(Some("c1"), Some(&pending.state)), &h.session)
        .await
        .unwrap_err();

    assert!(
        matches!(provider_error(err), ProviderError::Validation(msg) if msg == "audience mismatch")
    );
}

#[tokio::test]
async fn test_missing_code_makes_no_network_calls() {
    let h = setup().await;
    let pending = begin_login(&h.orchestrator, &h.session).await;

    let err = h
        .orchestrator
        .callback(&callback_params(Some(""), Some(&pending.state)), &h.session)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(h.issuer.total_requests(), 0);
    assert!(!h.session.has_pending_auth("paypal").await);
}
