//! Process-wide reaction to an expired or revoked session.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};
use tracing::{debug, info};

use crate::session::SessionStore;

pub type UnauthorizedHandler = Arc<dyn Fn() + Send + Sync>;

/// Single-slot registry for the "session expired" handler.
///
/// Owned by the composition root and shared by reference with the HTTP client.
pub struct UnauthorizedCoordinator {
    session: Arc<SessionStore>,
    handler: Mutex<Option<UnauthorizedHandler>>,
    events: AtomicU64,
}

impl UnauthorizedCoordinator {
    pub fn new(session: Arc<SessionStore>) -> Self {
        Self {
            session,
            handler: Mutex::new(None),
            events: AtomicU64::new(0),
        }
    }

    /// Install `handler`, replacing any previous one. `None` clears the slot.
    pub fn register(&self, handler: Option<UnauthorizedHandler>) {
        let mut slot = self
            .handler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        debug!(
            replacing = slot.is_some(),
            installing = handler.is_some(),
            "unauthorized handler registration"
        );
        *slot = handler;
    }

    /// React to one observed 401 for a request sent with `sent_token`.
    ///
    /// The session is cleared only while it still holds the token the request
    /// carried, so a late 401 cannot end a session established afterwards.
    /// The handler runs only for the call that actually ended the session,
    /// so parallel 401s navigate once.
    pub fn handle_unauthorized(&self, sent_token: Option<&str>) {
        let event = self.events.fetch_add(1, Ordering::AcqRel) + 1;

        let Some(sent_token) = sent_token else {
            debug!(event, "401 on a request sent without a session, nothing to clear");
            return;
        };
        if !self.session.clear_if_token(sent_token) {
            debug!(event, "401 for a session that is no longer current, nothing to do");
            return;
        }

        let handler = self
            .handler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        match handler {
            Some(handler) => {
                info!(event, "session expired, signalling sign-in");
                handler();
            }
            None => info!(event, "session expired, no handler registered"),
        }
    }

    /// Number of 401 events observed so far.
    pub fn events(&self) -> u64 {
        self.events.load(Ordering::Acquire)
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }
}
