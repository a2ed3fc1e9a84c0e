//! The single chokepoint for every network call.

use reqwest::{header, Client, Method, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::{debug, warn};

use crate::{
    cancel::{CancelToken, Interrupted, RequestTracker},
    config::{Config, Timeouts},
    error::{ApiError, Result},
    session::SessionStore,
    unauthorized::UnauthorizedCoordinator,
};

/// Decoded 2xx response.
#[derive(Debug, Clone)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: u16,
}

/// Per-call knobs. Requests are authenticated unless told otherwise.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub body: Option<Value>,
    pub query: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub authenticated: bool,
    pub cancel: Option<CancelToken>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            body: None,
            query: Vec::new(),
            timeout: None,
            authenticated: true,
            cancel: None,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(mut self, body: &impl Serialize) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Validation(format!("request body could not be encoded: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Send without the bearer token; a 401 is then an ordinary HTTP error.
    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    pub fn cancel_with(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

pub struct HttpClient {
    client: Client,
    base_url: String,
    timeouts: Timeouts,
    coordinator: Arc<UnauthorizedCoordinator>,
    tracker: RequestTracker,
}

impl HttpClient {
    /// The session is read through the coordinator so both always see the same store.
    pub fn new(cfg: &Config, coordinator: Arc<UnauthorizedCoordinator>) -> Result<Self> {
        Url::parse(&cfg.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", cfg.base_url)))?;

        let client = Client::builder()
            .build()
            .map_err(|e| ApiError::NetworkUnavailable {
                reason: format!("http client init: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            timeouts: cfg.timeouts,
            coordinator,
            tracker: RequestTracker::default(),
        })
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.coordinator.session()
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    /// Requests currently between send and the end of their deadline handling.
    pub fn in_flight(&self) -> usize {
        self.tracker.in_flight()
    }

    pub fn resolve_url(&self, path: &str, query: &[(String, String)]) -> Result<Url> {
        let joined = if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        };

        let mut url =
            Url::parse(&joined).map_err(|e| ApiError::InvalidUrl(format!("{joined}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        opts: RequestOptions,
    ) -> Result<ApiResponse<T>> {
        self.request(Method::GET, path, opts).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
        opts: RequestOptions,
    ) -> Result<ApiResponse<T>> {
        self.request(Method::POST, path, opts.json(body)?).await
    }

    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        opts: RequestOptions,
    ) -> Result<ApiResponse<T>> {
        let (status, body) = self.exchange(method, path, opts).await?;
        let data = decode_body(&body)?;
        Ok(ApiResponse { data, status })
    }

    /// GET whose 2xx body is returned as text rather than decoded as JSON.
    pub async fn get_text(&self, path: &str, opts: RequestOptions) -> Result<ApiResponse<String>> {
        let (status, body) = self.exchange(Method::GET, path, opts).await?;
        Ok(ApiResponse {
            data: String::from_utf8_lossy(&body).into_owned(),
            status,
        })
    }

    /// Send one request and return the status and raw body of a 2xx response.
    async fn exchange(
        &self,
        method: Method,
        path: &str,
        opts: RequestOptions,
    ) -> Result<(u16, Vec<u8>)> {
        let url = self.resolve_url(path, &opts.query)?;
        let token = if opts.authenticated {
            self.session().token()
        } else {
            None
        };

        let mut builder = self
            .client
            .request(method.clone(), url.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json");
        if let Some(token) = &token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &opts.body {
            let bytes = serde_json::to_vec(body).map_err(|e| {
                ApiError::Validation(format!("request body could not be encoded: {e}"))
            })?;
            builder = builder.body(bytes);
        }

        let timeout = opts.timeout.unwrap_or(self.timeouts.default);
        debug!(
            %method,
            %url,
            bearer = token.is_some(),
            ?timeout,
            "api request"
        );

        let started = Instant::now();
        let pending = self.tracker.begin(timeout, opts.cancel.clone());
        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let (status, body) = match pending.run(exchange).await {
            Ok(Ok(exchanged)) => exchanged,
            Ok(Err(e)) => {
                let err = map_transport_error(e);
                warn!(%method, %url, error = ?err, "api request failed before the body was read");
                return Err(err);
            }
            Err(Interrupted::TimedOut) => {
                warn!(%method, %url, ?timeout, "api request timed out");
                return Err(ApiError::Timeout);
            }
            Err(Interrupted::Cancelled) => {
                debug!(%method, %url, "api request cancelled");
                return Err(ApiError::Cancelled);
            }
        };
        let elapsed = started.elapsed();

        if status == StatusCode::UNAUTHORIZED && opts.authenticated {
            warn!(%method, %url, ?elapsed, "api request rejected with 401");
            self.coordinator.handle_unauthorized(token.as_deref());
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let err = ApiError::from_response(status.as_u16(), &body);
            warn!(
                %method,
                %url,
                status = status.as_u16(),
                ?elapsed,
                error = %err,
                "api error response"
            );
            return Err(err);
        }

        debug!(
            %method,
            %url,
            status = status.as_u16(),
            ?elapsed,
            bytes = body.len(),
            "api response"
        );
        Ok((status.as_u16(), body.to_vec()))
    }
}

/// Empty bodies decode as JSON `null`, so `()` and `Option<T>` responses work.
fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let body: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"null"
    } else {
        body
    };
    serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn map_transport_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::Timeout
    } else if e.is_builder() {
        ApiError::InvalidUrl(e.to_string())
    } else {
        ApiError::NetworkUnavailable {
            reason: e.to_string(),
        }
    }
}
