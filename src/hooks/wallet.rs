use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::{lock, FetchOutcome};
use crate::{api::WalletApi, cancel::CancelToken, error::ApiError, models::WalletSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Errored,
}

#[derive(Debug, Clone, Default)]
pub struct WalletState {
    pub wallet: Option<WalletSnapshot>,
    pub phase: LoadPhase,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Default)]
struct Shared {
    state: WalletState,
    generation: u64,
}

/// Balance of the signed-in wallet, kept in sync by explicit (re)fetches.
#[derive(Clone)]
pub struct WalletHook {
    api: WalletApi,
    shared: Arc<Mutex<Shared>>,
    cancel: CancelToken,
}

impl WalletHook {
    pub fn new(api: WalletApi) -> Self {
        Self {
            api,
            shared: Arc::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn state(&self) -> WalletState {
        lock(&self.shared).state.clone()
    }

    /// Fetch the wallet, replacing the snapshot on success.
    ///
    /// On failure the previous snapshot stays visible. Only the most recently
    /// started fetch may write its result.
    pub async fn fetch(&self) -> FetchOutcome {
        if self.cancel.is_cancelled() {
            return FetchOutcome::Cancelled;
        }
        if !self.api.http().session().is_authenticated() {
            debug!("no session, skipping wallet fetch");
            return FetchOutcome::Skipped;
        }

        let generation = {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            shared.state.is_loading = true;
            shared.state.phase = LoadPhase::Loading;
            shared.state.error = None;
            shared.generation
        };
        debug!(generation, "wallet fetch started");

        let result = self.api.wallet(self.cancel.clone()).await;

        let mut shared = lock(&self.shared);
        if shared.generation != generation {
            debug!(generation, latest = shared.generation, "dropping superseded wallet response");
            return FetchOutcome::Superseded;
        }

        let state = &mut shared.state;
        state.is_loading = false;
        match result {
            Ok(snapshot) => {
                if snapshot.balance_amount < Decimal::ZERO {
                    warn!(balance = %snapshot.balance_amount, "server reported a negative balance");
                }
                info!(
                    balance = %snapshot.balance_amount,
                    currency = %snapshot.currency_code,
                    "wallet loaded"
                );
                state.wallet = Some(snapshot);
                state.phase = LoadPhase::Ready;
                FetchOutcome::Updated
            }
            Err(ApiError::Cancelled) => {
                state.phase = settled_phase(state);
                FetchOutcome::Cancelled
            }
            Err(ApiError::Unauthorized) => {
                state.phase = settled_phase(state);
                FetchOutcome::Failed
            }
            Err(e) => {
                warn!(error = %e, "wallet fetch failed");
                state.error = Some(e.to_string());
                state.phase = LoadPhase::Errored;
                FetchOutcome::Failed
            }
        }
    }

    /// Manual refresh (pull-to-refresh).
    pub async fn refetch(&self) -> FetchOutcome {
        debug!("manual wallet refetch");
        self.fetch().await
    }

    /// Forget everything, e.g. after sign-out. In-flight results are dropped.
    pub fn reset(&self) {
        let mut shared = lock(&self.shared);
        shared.generation += 1;
        shared.state = WalletState::default();
    }

    /// Abort outstanding requests; later actions do nothing.
    pub fn dispose(&self) {
        self.cancel.cancel();
    }
}

fn settled_phase(state: &WalletState) -> LoadPhase {
    if state.wallet.is_some() {
        LoadPhase::Ready
    } else {
        LoadPhase::Idle
    }
}
