use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use super::{lock, SubmitOutcome};
use crate::{
    api::WalletApi, cancel::CancelToken, error::ApiError, models::TransferSubmission, validation,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferErrorKind {
    /// Banner-style failure.
    Generic,
    /// Belongs on the recipient field.
    RecipientNotFound,
    /// Rejected before dispatch; nothing was sent.
    Validation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferError {
    pub message: String,
    pub kind: TransferErrorKind,
    pub recipient_identity: Option<String>,
}

impl TransferError {
    fn generic(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: TransferErrorKind::Generic,
            recipient_identity: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransferState {
    pub is_submitting: bool,
    pub error: Option<TransferError>,
}

/// Peer-to-peer transfer submission.
///
/// Does not refresh wallet or history on success; the caller composes that.
#[derive(Clone)]
pub struct TransferHook {
    api: WalletApi,
    state: Arc<Mutex<TransferState>>,
    cancel: CancelToken,
}

impl TransferHook {
    pub fn new(api: WalletApi) -> Self {
        Self {
            api,
            state: Arc::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn state(&self) -> TransferState {
        lock(&self.state).clone()
    }

    pub fn is_submitting(&self) -> bool {
        lock(&self.state).is_submitting
    }

    pub fn clear_error(&self) {
        lock(&self.state).error = None;
    }

    pub fn dispose(&self) {
        self.cancel.cancel();
    }

    pub async fn submit(&self, to_identity: &str, amount: Decimal) -> SubmitOutcome {
        if self.cancel.is_cancelled() {
            return SubmitOutcome::Cancelled;
        }
        let to_email = to_identity.trim().to_string();

        {
            let mut state = lock(&self.state);
            if state.is_submitting {
                return SubmitOutcome::AlreadySubmitting;
            }
            let checked = validation::email("Recipient email", &to_email)
                .and_then(|_| validation::transfer_amount(amount));
            if let Err(e) = checked {
                state.error = Some(TransferError {
                    message: e.to_string(),
                    kind: TransferErrorKind::Validation,
                    recipient_identity: None,
                });
                return SubmitOutcome::Failed;
            }
            if !self.api.http().session().is_authenticated() {
                state.error = Some(TransferError::generic("Authentication token required"));
                return SubmitOutcome::Failed;
            }
            state.is_submitting = true;
            state.error = None;
        }

        info!(to = %to_email, %amount, "submitting transfer");
        let submission = TransferSubmission {
            to_email: to_email.clone(),
            amount,
        };
        let result = self
            .api
            .create_transfer(&submission, self.cancel.clone())
            .await;

        let mut state = lock(&self.state);
        state.is_submitting = false;
        match result {
            Ok(()) => {
                info!(to = %to_email, %amount, "transfer accepted");
                SubmitOutcome::Succeeded
            }
            Err(ApiError::Http { status: 404, .. }) => {
                warn!(to = %to_email, "transfer recipient not found");
                state.error = Some(TransferError {
                    message: format!("No wallet with email {to_email} found"),
                    kind: TransferErrorKind::RecipientNotFound,
                    recipient_identity: Some(to_email),
                });
                SubmitOutcome::Failed
            }
            Err(ApiError::Unauthorized) => SubmitOutcome::Failed,
            Err(ApiError::Cancelled) => SubmitOutcome::Cancelled,
            Err(e) => {
                warn!(to = %to_email, error = %e, "transfer failed");
                state.error = Some(TransferError::generic(e.to_string()));
                SubmitOutcome::Failed
            }
        }
    }
}
