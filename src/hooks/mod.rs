//! Stateful handles the presentation layer drives and renders from.
//!
//! Each hook is a cheap `Clone` over shared state. State is read with
//! `state()`, which returns a snapshot; actions are async and may be awaited
//! concurrently. No lock is held across an `.await`.

mod auth;
mod debin;
mod history;
mod transfer;
mod wallet;

pub use auth::{AuthHook, AuthOutcome, AuthState};
pub use debin::{DebinHook, DebinState};
pub use history::{TransferHistoryHook, TransferHistoryState};
pub use transfer::{TransferError, TransferErrorKind, TransferHook, TransferState};
pub use wallet::{LoadPhase, WalletHook, WalletState};

use std::sync::{Mutex, MutexGuard};

/// What a fetch-style action did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// New data was applied to the state.
    Updated,
    /// No session, nothing to fetch yet.
    Skipped,
    /// Guard rejected the call (nothing more to load, or a load already running).
    Ignored,
    /// A newer request started meanwhile; this result was dropped.
    Superseded,
    /// The request failed. The state's `error` says why, unless it was a 401.
    Failed,
    /// The hook was disposed.
    Cancelled,
}

/// What a submission did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Succeeded,
    Failed,
    /// Another submission from this hook is still running; nothing was sent.
    AlreadySubmitting,
    Cancelled,
}

impl SubmitOutcome {
    pub fn is_success(self) -> bool {
        self == SubmitOutcome::Succeeded
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
