mod support;

use axum::{
    http::{HeaderMap, StatusCode},
    routing::get,
    Router,
};
use std::sync::{Arc, Mutex};
use support::{hits, serve, Harness};
use wallet_client::{ApiError, Connectivity};

#[tokio::test]
async fn healthy_server_is_reachable_without_credentials() {
    let seen_auth: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let router = Router::new().route(
        "/health",
        get({
            let seen_auth = Arc::clone(&seen_auth);
            move |headers: HeaderMap| {
                *seen_auth.lock().unwrap() = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned);
                async { "OK" }
            }
        }),
    );
    let base = serve(router).await;
    let harness = Harness::signed_in(&base);

    let result = harness.api.health().await;

    assert_eq!(result, Connectivity::Reachable { status: 200 });
    assert!(result.is_reachable());
    assert_eq!(*seen_auth.lock().unwrap(), None);
}

#[tokio::test]
async fn error_status_is_reported_with_its_message() {
    let router = Router::new().route("/health", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
    let base = serve(router).await;
    let harness = Harness::signed_in(&base);

    assert_eq!(
        harness.api.health().await,
        Connectivity::ErrorStatus {
            status: 503,
            message: "HTTP error! status: 503".to_string(),
        }
    );
}

#[tokio::test]
async fn rejected_health_check_never_ends_the_session() {
    let router = Router::new().route("/health", get(|| async { StatusCode::UNAUTHORIZED }));
    let base = serve(router).await;
    let harness = Harness::signed_in(&base);
    let redirects = harness.count_sign_in_redirects();

    let result = harness.api.health().await;

    assert!(matches!(result, Connectivity::ErrorStatus { status: 401, .. }));
    assert!(harness.session.is_authenticated());
    assert_eq!(harness.coordinator.events(), 0);
    assert_eq!(hits(&redirects), 0);
}

#[tokio::test]
async fn refused_connection_is_unreachable() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let harness = Harness::signed_out(&format!("http://127.0.0.1:{port}"));

    let result = harness.api.health().await;

    assert!(matches!(
        result,
        Connectivity::Unreachable {
            error: ApiError::NetworkUnavailable { .. }
        }
    ));
    assert!(!result.is_reachable());
}
