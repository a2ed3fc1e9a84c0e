mod support;

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use futures_util::future::{join, join_all};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::time::Duration;
use support::{hits, serve, Harness};
use wallet_client::{
    hooks::{AuthHook, AuthOutcome, FetchOutcome, SubmitOutcome, TransferHook, WalletHook},
    ApiError, RequestOptions,
};

fn expired_session_router() -> Router {
    Router::new()
        .route(
            "/wallet",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(30)).await;
                (StatusCode::UNAUTHORIZED, Json(json!({ "detail": "Token expired" })))
            }),
        )
        .route("/transfer", post(|| async { StatusCode::UNAUTHORIZED }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                StatusCode::UNAUTHORIZED
            }),
        )
        .route(
            "/auth/login",
            post(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "message": "Invalid credentials" })),
                )
            }),
        )
}

#[tokio::test]
async fn a_401_clears_the_session_and_redirects_once() {
    let base = serve(expired_session_router()).await;
    let harness = Harness::signed_in(&base);
    let redirects = harness.count_sign_in_redirects();
    let wallet = WalletHook::new(harness.api.clone());

    let outcome = wallet.fetch().await;

    assert_eq!(outcome, FetchOutcome::Failed);
    assert!(!harness.session.is_authenticated());
    assert_eq!(hits(&redirects), 1);
    assert_eq!(harness.coordinator.events(), 1);

    let state = wallet.state();
    assert_eq!(state.error, None, "401 is not shown as a banner");
    assert!(!state.is_loading);
}

#[tokio::test]
async fn parallel_401s_redirect_only_once() {
    let base = serve(expired_session_router()).await;
    let harness = Harness::signed_in(&base);
    let redirects = harness.count_sign_in_redirects();

    let results = join_all(
        (0..4).map(|_| harness.http.get::<Value>("/wallet", RequestOptions::new())),
    )
    .await;

    assert!(results
        .iter()
        .all(|r| matches!(r, Err(ApiError::Unauthorized))));
    assert_eq!(harness.coordinator.events(), 4);
    assert_eq!(hits(&redirects), 1);
    assert!(!harness.session.is_authenticated());
}

#[tokio::test]
async fn transfer_rejected_with_401_reports_failure_without_a_message() {
    let base = serve(expired_session_router()).await;
    let harness = Harness::signed_in(&base);
    let redirects = harness.count_sign_in_redirects();
    let transfer = TransferHook::new(harness.api.clone());

    let outcome = transfer
        .submit("bob@example.com", Decimal::new(1000, 2))
        .await;

    assert_eq!(outcome, SubmitOutcome::Failed);
    assert_eq!(transfer.state().error, None);
    assert!(!transfer.is_submitting());
    assert_eq!(hits(&redirects), 1);
}

#[tokio::test]
async fn bad_credentials_on_login_do_not_end_the_current_session() {
    let base = serve(expired_session_router()).await;
    let harness = Harness::signed_in(&base);
    let redirects = harness.count_sign_in_redirects();
    let auth = AuthHook::new(harness.api.clone());

    let outcome = auth.login("ann@example.com", "wrong-password").await;

    assert_eq!(outcome, AuthOutcome::Failed);
    assert_eq!(auth.state().error.as_deref(), Some("Invalid credentials"));
    assert!(harness.session.is_authenticated());
    assert_eq!(harness.coordinator.events(), 0);
    assert_eq!(hits(&redirects), 0);
}

#[tokio::test]
async fn cleared_handler_still_clears_the_session() {
    let base = serve(expired_session_router()).await;
    let harness = Harness::signed_in(&base);
    let redirects = harness.count_sign_in_redirects();
    harness.coordinator.register(None);

    let err = harness
        .http
        .get::<Value>("/wallet", RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err, ApiError::Unauthorized);
    assert!(!harness.session.is_authenticated());
    assert_eq!(hits(&redirects), 0);
}

#[tokio::test]
async fn late_401_for_an_old_token_keeps_the_new_session() {
    let base = serve(expired_session_router()).await;
    let harness = Harness::signed_in(&base);
    let redirects = harness.count_sign_in_redirects();

    let (result, ()) = join(
        harness.http.get::<Value>("/slow", RequestOptions::new()),
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            harness.session.clear();
            harness
                .session
                .set_session("fresh-token", "ann@example.com")
                .unwrap();
        },
    )
    .await;

    assert_eq!(result.unwrap_err(), ApiError::Unauthorized);
    assert_eq!(harness.coordinator.events(), 1);
    assert_eq!(harness.session.token().as_deref(), Some("fresh-token"));
    assert_eq!(hits(&redirects), 0);
}
