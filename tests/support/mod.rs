//! Stub backend and client wiring shared by the integration tests.
#![allow(dead_code)]

use axum::Router;
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use wallet_client::{
    config::Config, HttpClient, SessionStore, UnauthorizedCoordinator, UnauthorizedHandler,
    WalletApi,
};

pub const USER: &str = "ann@example.com";
pub const TOKEN: &str = "tok-123";

/// Serve `router` on an ephemeral port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub backend");
    let addr = listener.local_addr().expect("stub backend address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{addr}")
}

pub struct Harness {
    pub session: Arc<SessionStore>,
    pub coordinator: Arc<UnauthorizedCoordinator>,
    pub http: Arc<HttpClient>,
    pub api: WalletApi,
}

impl Harness {
    pub fn signed_out(base_url: &str) -> Self {
        Self::with_config(Config::with_base_url(base_url))
    }

    pub fn signed_in(base_url: &str) -> Self {
        let harness = Self::signed_out(base_url);
        harness
            .session
            .set_session(TOKEN, USER)
            .expect("test session");
        harness
    }

    pub fn with_config(cfg: Config) -> Self {
        let session = Arc::new(SessionStore::in_memory());
        let coordinator = Arc::new(UnauthorizedCoordinator::new(Arc::clone(&session)));
        let http = Arc::new(HttpClient::new(&cfg, Arc::clone(&coordinator)).expect("http client"));
        let api = WalletApi::new(Arc::clone(&http));
        Self {
            session,
            coordinator,
            http,
            api,
        }
    }

    /// Register a handler that only counts its invocations.
    pub fn count_sign_in_redirects(&self) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let handler: UnauthorizedHandler = {
            let calls = Arc::clone(&calls);
            Arc::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };
        self.coordinator.register(Some(handler));
        calls
    }
}

pub fn record(id: u64) -> Value {
    json!({
        "id": format!("t-{id}"),
        "fromParticipant": { "serviceType": "WALLET", "serviceName": "bags", "email": "bob@example.com" },
        "toParticipant": { "serviceType": "WALLET", "serviceName": "bags", "email": USER },
        "timestamp": "2024-05-01T10:00:00",
        "amount": 10.5,
        "type": "IN"
    })
}

/// One page of a history with `total` records, ids counting down (newest first).
pub fn page(number: u64, size: u64, total: u64) -> Value {
    let start = number * size;
    let end = (start + size).min(total);
    let content: Vec<Value> = (start..end).map(|i| record(total - i)).collect();
    let total_pages = total.div_ceil(size);
    json!({
        "content": content,
        "totalElements": total,
        "totalPages": total_pages,
        "number": number,
        "size": size
    })
}

pub fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

pub fn hits(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}
