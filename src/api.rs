//! Typed calls for each backend endpoint.

use serde::de::IgnoredAny;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    cancel::CancelToken,
    error::{ApiError, Result},
    http::{HttpClient, RequestOptions},
    models::{
        AuthResponse, Credentials, DebinSubmission, TransferHistoryPage, TransferSubmission,
        WalletInfoDto, WalletSnapshot,
    },
};

pub mod endpoints {
    pub const REGISTER: &str = "/auth/register";
    pub const LOGIN: &str = "/auth/login";
    pub const WALLET: &str = "/wallet";
    pub const TRANSFER: &str = "/transfer";
    pub const DEBIN: &str = "/debin";
    pub const HEALTH: &str = "/health";
}

/// Result of a connectivity check against the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Connectivity {
    Reachable { status: u16 },
    /// The server answered, but not with success.
    ErrorStatus { status: u16, message: String },
    Unreachable { error: ApiError },
}

impl Connectivity {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Connectivity::Reachable { .. })
    }
}

/// Thin, cloneable facade over the HTTP client.
#[derive(Clone)]
pub struct WalletApi {
    http: Arc<HttpClient>,
}

impl WalletApi {
    pub fn new(http: Arc<HttpClient>) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &Arc<HttpClient> {
        &self.http
    }

    pub async fn register(&self, credentials: &Credentials) -> Result<AuthResponse> {
        debug!(email = %credentials.email, "register");
        let opts = RequestOptions::new().unauthenticated();
        Ok(self
            .http
            .post::<Option<AuthResponse>>(endpoints::REGISTER, credentials, opts)
            .await?
            .data
            .unwrap_or_default())
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse> {
        debug!(email = %credentials.email, "login");
        let opts = RequestOptions::new().unauthenticated();
        Ok(self
            .http
            .post::<Option<AuthResponse>>(endpoints::LOGIN, credentials, opts)
            .await?
            .data
            .unwrap_or_default())
    }

    pub async fn wallet(&self, cancel: CancelToken) -> Result<WalletSnapshot> {
        let opts = RequestOptions::new().cancel_with(cancel);
        let response = self.http.get::<WalletInfoDto>(endpoints::WALLET, opts).await?;
        Ok(response.data.into())
    }

    pub async fn transfer_history(
        &self,
        page: u32,
        size: u32,
        cancel: CancelToken,
    ) -> Result<TransferHistoryPage> {
        let opts = RequestOptions::new()
            .query("page", page)
            .query("size", size)
            .cancel_with(cancel);
        Ok(self.http.get(endpoints::TRANSFER, opts).await?.data)
    }

    pub async fn create_transfer(
        &self,
        submission: &TransferSubmission,
        cancel: CancelToken,
    ) -> Result<()> {
        let opts = RequestOptions::new().cancel_with(cancel);
        self.http
            .post::<IgnoredAny>(endpoints::TRANSFER, submission, opts)
            .await?;
        Ok(())
    }

    /// Debin requests round-trip through the external party, so they get the long deadline.
    pub async fn request_debin(&self, submission: &DebinSubmission, cancel: CancelToken) -> Result<()> {
        let opts = RequestOptions::new()
            .timeout(self.http.timeouts().upload)
            .cancel_with(cancel);
        self.http
            .post::<IgnoredAny>(endpoints::DEBIN, submission, opts)
            .await?;
        Ok(())
    }

    /// Probe `/health` without credentials, so a 401 never ends the session.
    pub async fn health(&self) -> Connectivity {
        let opts = RequestOptions::new().unauthenticated();
        match self.http.get_text(endpoints::HEALTH, opts).await {
            Ok(response) => {
                info!(status = response.status, "server is reachable");
                Connectivity::Reachable {
                    status: response.status,
                }
            }
            Err(ApiError::Http {
                status, message, ..
            }) => {
                warn!(status, %message, "server responded with an error status");
                Connectivity::ErrorStatus { status, message }
            }
            Err(error) => {
                warn!(%error, "connectivity check failed");
                Connectivity::Unreachable { error }
            }
        }
    }
}
