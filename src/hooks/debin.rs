use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use super::{lock, SubmitOutcome};
use crate::{api::WalletApi, cancel::CancelToken, error::ApiError, models::DebinSubmission, validation};

#[derive(Debug, Clone, Default)]
pub struct DebinState {
    pub is_submitting: bool,
    pub error: Option<String>,
}

/// Deposit request against an external party (bank, processor).
#[derive(Clone)]
pub struct DebinHook {
    api: WalletApi,
    state: Arc<Mutex<DebinState>>,
    cancel: CancelToken,
}

impl DebinHook {
    pub fn new(api: WalletApi) -> Self {
        Self {
            api,
            state: Arc::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn state(&self) -> DebinState {
        lock(&self.state).clone()
    }

    /// True while a submission is in flight; a second submit is refused.
    pub fn is_submitting(&self) -> bool {
        lock(&self.state).is_submitting
    }

    pub fn clear_error(&self) {
        lock(&self.state).error = None;
    }

    pub fn dispose(&self) {
        self.cancel.cancel();
    }

    pub async fn submit(&self, request: DebinSubmission) -> SubmitOutcome {
        if self.cancel.is_cancelled() {
            return SubmitOutcome::Cancelled;
        }

        let request = DebinSubmission {
            external_service_name: request.external_service_name.trim().to_string(),
            service_type: request.service_type.trim().to_string(),
            external_email: request.external_email.trim().to_string(),
            amount: request.amount,
        };

        {
            let mut state = lock(&self.state);
            if state.is_submitting {
                return SubmitOutcome::AlreadySubmitting;
            }
            let checked = validation::required("Service name", &request.external_service_name)
                .and_then(|_| validation::required("Service type", &request.service_type))
                .and_then(|_| validation::email("External email", &request.external_email))
                .and_then(|_| validation::amount(request.amount));
            if let Err(e) = checked {
                state.error = Some(e.to_string());
                return SubmitOutcome::Failed;
            }
            if !self.api.http().session().is_authenticated() {
                state.error = Some("Authentication token required".to_string());
                return SubmitOutcome::Failed;
            }
            state.is_submitting = true;
            state.error = None;
        }

        info!(
            service = %request.external_service_name,
            service_type = %request.service_type,
            external_email = %request.external_email,
            amount = %request.amount,
            "submitting debin request"
        );
        let result = self.api.request_debin(&request, self.cancel.clone()).await;

        let mut state = lock(&self.state);
        state.is_submitting = false;
        match result {
            Ok(()) => {
                info!(amount = %request.amount, "debin request accepted");
                SubmitOutcome::Succeeded
            }
            Err(ApiError::Unauthorized) => SubmitOutcome::Failed,
            Err(ApiError::Cancelled) => SubmitOutcome::Cancelled,
            Err(e) => {
                warn!(error = %e, "debin request failed");
                state.error = Some(e.to_string());
                SubmitOutcome::Failed
            }
        }
    }
}
