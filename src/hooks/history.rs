use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::{lock, FetchOutcome};
use crate::{api::WalletApi, cancel::CancelToken, error::ApiError, models::TransferRecord};

#[derive(Debug, Clone, Default)]
pub struct TransferHistoryState {
    /// Accumulated pages, newest first.
    pub items: Vec<TransferRecord>,
    pub page_index: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_elements: u64,
    pub has_more: bool,
    pub is_loading: bool,
    pub is_loading_more: bool,
    pub error: Option<String>,
}

struct Shared {
    state: TransferHistoryState,
    generation: u64,
}

#[derive(Clone, Copy)]
enum Merge {
    Replace,
    Append,
}

/// Paginated transfer history with load-more and refresh.
#[derive(Clone)]
pub struct TransferHistoryHook {
    api: WalletApi,
    shared: Arc<Mutex<Shared>>,
    cancel: CancelToken,
}

impl TransferHistoryHook {
    pub fn new(api: WalletApi, page_size: u32) -> Self {
        let state = TransferHistoryState {
            page_size: page_size.max(1),
            ..TransferHistoryState::default()
        };
        Self {
            api,
            shared: Arc::new(Mutex::new(Shared {
                state,
                generation: 0,
            })),
            cancel: CancelToken::new(),
        }
    }

    pub fn state(&self) -> TransferHistoryState {
        lock(&self.shared).state.clone()
    }

    pub fn has_more(&self) -> bool {
        lock(&self.shared).state.has_more
    }

    /// Fetch one page and replace everything accumulated so far.
    pub async fn fetch(&self, page: u32, size: u32) -> FetchOutcome {
        if let Some(outcome) = self.precheck() {
            return outcome;
        }

        let size = size.max(1);
        let generation = {
            let mut shared = lock(&self.shared);
            shared.generation += 1;
            let state = &mut shared.state;
            state.is_loading = true;
            // A replace supersedes any running load-more.
            state.is_loading_more = false;
            state.error = None;
            shared.generation
        };

        self.load(page, size, generation, Merge::Replace).await
    }

    /// Back to page 0 with the current page size; replaces, never appends.
    pub async fn refetch(&self) -> FetchOutcome {
        let size = lock(&self.shared).state.page_size;
        debug!(size, "manual transfer history refetch");
        self.fetch(0, size).await
    }

    /// Append the next page.
    ///
    /// Ignored (not queued) when there is nothing more or any load is running,
    /// so a double trigger appends one page only.
    pub async fn load_more(&self) -> FetchOutcome {
        if let Some(outcome) = self.precheck() {
            return outcome;
        }

        let (next, size, generation) = {
            let mut shared = lock(&self.shared);
            let generation = shared.generation;
            let state = &mut shared.state;
            if !state.has_more || state.is_loading || state.is_loading_more {
                debug!(
                    has_more = state.has_more,
                    loading = state.is_loading || state.is_loading_more,
                    page = state.page_index,
                    "load more skipped"
                );
                return FetchOutcome::Ignored;
            }
            let Some(next) = state.page_index.checked_add(1) else {
                debug!(page = state.page_index, "no page after the last addressable one");
                return FetchOutcome::Ignored;
            };
            state.is_loading_more = true;
            state.error = None;
            (next, state.page_size, generation)
        };

        self.load(next, size, generation, Merge::Append).await
    }

    pub fn reset(&self) {
        let mut shared = lock(&self.shared);
        shared.generation += 1;
        let page_size = shared.state.page_size;
        shared.state = TransferHistoryState {
            page_size,
            ..TransferHistoryState::default()
        };
    }

    pub fn dispose(&self) {
        self.cancel.cancel();
    }

    fn precheck(&self) -> Option<FetchOutcome> {
        if self.cancel.is_cancelled() {
            return Some(FetchOutcome::Cancelled);
        }
        if !self.api.http().session().is_authenticated() {
            debug!("no session, skipping transfer history fetch");
            return Some(FetchOutcome::Skipped);
        }
        None
    }

    async fn load(&self, page: u32, size: u32, generation: u64, merge: Merge) -> FetchOutcome {
        debug!(page, size, generation, "transfer history fetch started");
        let result = self
            .api
            .transfer_history(page, size, self.cancel.clone())
            .await;

        let mut shared = lock(&self.shared);
        if shared.generation != generation {
            debug!(page, generation, "dropping superseded transfer history page");
            return FetchOutcome::Superseded;
        }

        let state = &mut shared.state;
        match merge {
            Merge::Replace => state.is_loading = false,
            Merge::Append => state.is_loading_more = false,
        }

        let data = match result {
            Ok(data) => data,
            Err(ApiError::Cancelled) => return FetchOutcome::Cancelled,
            Err(ApiError::Unauthorized) => return FetchOutcome::Failed,
            Err(e) => {
                warn!(page, size, error = %e, "transfer history fetch failed");
                state.error = Some(e.to_string());
                return FetchOutcome::Failed;
            }
        };

        if data.content.len() > size as usize {
            warn!(
                page,
                requested = size,
                received = data.content.len(),
                "server returned more items than requested"
            );
        }
        if data.number != page {
            warn!(requested = page, received = data.number, "server returned a different page");
        }

        let received = data.content.len();
        match merge {
            Merge::Replace => state.items = data.content,
            Merge::Append => state.items.extend(data.content),
        }
        state.page_index = page;
        state.page_size = size;
        state.total_pages = data.total_pages;
        state.total_elements = data.total_elements;
        state.has_more = has_next_page(page, data.total_pages);

        info!(
            page,
            received,
            accumulated = state.items.len(),
            total = state.total_elements,
            has_more = state.has_more,
            "transfer history updated"
        );
        FetchOutcome::Updated
    }
}

fn has_next_page(page: u32, total_pages: u32) -> bool {
    page.checked_add(1).is_some_and(|next| next < total_pages)
}
