use std::sync::{Arc, Mutex};
use tracing::{info, warn};

use super::lock;
use crate::{
    api::WalletApi,
    error::ApiError,
    models::{AuthResponse, Credentials},
    session::Session,
    validation,
};

#[derive(Debug, Clone, Default)]
pub struct AuthState {
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    SignedIn(Session),
    /// Account created but the server handed out no token.
    Registered,
    Failed,
    AlreadyInProgress,
}

#[derive(Clone, Copy)]
enum Flow {
    Register,
    Login,
}

impl Flow {
    fn fallback_message(self) -> &'static str {
        match self {
            Flow::Register => "Registration failed",
            Flow::Login => "Login failed",
        }
    }
}

/// Register, sign in and sign out. The only writer of a new session.
#[derive(Clone)]
pub struct AuthHook {
    api: WalletApi,
    state: Arc<Mutex<AuthState>>,
}

impl AuthHook {
    pub fn new(api: WalletApi) -> Self {
        Self {
            api,
            state: Arc::default(),
        }
    }

    pub fn state(&self) -> AuthState {
        lock(&self.state).clone()
    }

    pub fn clear_error(&self) {
        lock(&self.state).error = None;
    }

    pub async fn register(&self, email: &str, password: &str) -> AuthOutcome {
        self.run(Flow::Register, email, password).await
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthOutcome {
        self.run(Flow::Login, email, password).await
    }

    /// Explicit sign-out. Does not go through the unauthorized handler.
    pub fn sign_out(&self) {
        self.api.http().session().clear();
        lock(&self.state).error = None;
    }

    async fn run(&self, flow: Flow, email: &str, password: &str) -> AuthOutcome {
        let credentials = Credentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };

        {
            let mut state = lock(&self.state);
            if state.is_loading {
                return AuthOutcome::AlreadyInProgress;
            }
            let checked = validation::email("Email", &credentials.email).and_then(|_| {
                validation::password(&credentials.password, matches!(flow, Flow::Register))
            });
            if let Err(e) = checked {
                state.error = Some(e.to_string());
                return AuthOutcome::Failed;
            }
            state.is_loading = true;
            state.error = None;
        }

        let result = match flow {
            Flow::Register => self.api.register(&credentials).await,
            Flow::Login => self.api.login(&credentials).await,
        };

        let outcome = match result {
            Ok(response) => self.establish(flow, &credentials.email, &response),
            Err(e) => Err(failure_message(flow, &e)),
        };

        let mut state = lock(&self.state);
        state.is_loading = false;
        match outcome {
            Ok(outcome) => outcome,
            Err(message) => {
                warn!(email = %credentials.email, error = %message, "authentication failed");
                state.error = Some(message);
                AuthOutcome::Failed
            }
        }
    }

    fn establish(
        &self,
        flow: Flow,
        email: &str,
        response: &AuthResponse,
    ) -> Result<AuthOutcome, String> {
        let Some(token) = response.session_token() else {
            return match flow {
                Flow::Register => {
                    info!(email, "registered, no session issued");
                    Ok(AuthOutcome::Registered)
                }
                Flow::Login => Err(flow.fallback_message().to_string()),
            };
        };

        let identity = response
            .user
            .as_ref()
            .and_then(|u| u.email.as_deref())
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(email);

        self.api
            .http()
            .session()
            .set_session(token, identity)
            .map(AuthOutcome::SignedIn)
            .map_err(|e| e.to_string())
    }
}

fn failure_message(flow: Flow, err: &ApiError) -> String {
    match err {
        ApiError::Http { detail: None, .. } => flow.fallback_message().to_string(),
        other => other.to_string(),
    }
}
