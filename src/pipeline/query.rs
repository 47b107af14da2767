//! Paginated property query with stale-response suppression.
//!
//! Every request is stamped with a generation number taken when it is issued.
//! Issuing a new request bumps the generation, and a response is applied only
//! if its generation is still the latest one. A slow response for an older
//! keyword or filter combination therefore never overwrites a newer one.

use crate::api::traits::RentalApi;
use crate::api::types::SearchParams;
use crate::error::Result;
use crate::models::{PropertyPage, PropertySummary};
use crate::pipeline::filters::FilterState;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// New page replaces the current list
    Replace,
    /// "Load more": new page is appended
    Append,
}

/// A request that has been issued against the feed but not yet applied
#[derive(Debug, Clone)]
pub struct PendingQuery {
    generation: u64,
    keyword: String,
    filters: FilterState,
    params: SearchParams,
    mode: LoadMode,
    previous_offset: u32,
}

impl PendingQuery {
    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn mode(&self) -> LoadMode {
        self.mode
    }
}

/// What a renderer needs from the feed
#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
    pub items: Vec<PropertySummary>,
    pub total: u64,
    pub offset: u32,
    pub limit: u32,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct FeedState {
    keyword: String,
    filters: FilterState,
    offset: u32,
    items: Vec<PropertySummary>,
    total: u64,
    loading: bool,
    error: Option<String>,
    generation: u64,
    /// Keyword and filters the shown items were fetched for
    shown: Option<(String, FilterState)>,
    disabled: bool,
    closed: bool,
}

impl FeedState {
    fn begin(&mut self, mode: LoadMode, offset: u32, limit: u32) -> Option<PendingQuery> {
        if self.disabled || self.closed {
            return None;
        }
        self.generation += 1;
        let previous_offset = self.offset;
        self.offset = offset;
        self.loading = true;
        self.error = None;
        Some(PendingQuery {
            generation: self.generation,
            keyword: self.keyword.clone(),
            filters: self.filters.clone(),
            params: self.filters.search_params(&self.keyword, offset, limit),
            mode,
            previous_offset,
        })
    }

    /// A query for the current keyword and filters failed, so the items on
    /// screen still belong to an older combination
    fn is_stale(&self) -> bool {
        self.shown.as_ref().is_some_and(|(keyword, filters)| {
            *keyword != self.keyword || *filters != self.filters
        })
    }

    /// Invalidate whatever is in flight
    fn supersede(&mut self) {
        self.generation += 1;
        self.loading = false;
    }
}

pub struct PropertyFeed {
    limit: u32,
    state: Mutex<FeedState>,
}

impl PropertyFeed {
    pub fn new(limit: u32) -> Self {
        Self {
            limit: limit.max(1),
            state: Mutex::new(FeedState::default()),
        }
    }

    /// Start with filters and keyword already set (e.g. restored from a link)
    pub fn with_query(limit: u32, keyword: &str, filters: FilterState) -> Self {
        let feed = Self::new(limit);
        {
            let mut state = feed.lock();
            state.keyword = keyword.to_string();
            state.filters = filters;
        }
        feed
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FeedState> {
        // State stays consistent even if a holder panicked: every update is a
        // plain field assignment
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let state = self.lock();
        FeedSnapshot {
            items: state.items.clone(),
            total: state.total,
            offset: state.offset,
            limit: self.limit,
            loading: state.loading,
            error: state.error.clone(),
        }
    }

    pub fn offset(&self) -> u32 {
        self.lock().offset
    }

    pub fn keyword(&self) -> String {
        self.lock().keyword.clone()
    }

    pub fn filters(&self) -> FilterState {
        self.lock().filters.clone()
    }

    /// Query for the current keyword and filters from the first page
    pub fn refresh(&self) -> Option<PendingQuery> {
        self.lock().begin(LoadMode::Replace, 0, self.limit)
    }

    /// New committed keyword. Resets to the first page.
    pub fn set_search(&self, keyword: &str) -> Option<PendingQuery> {
        let mut state = self.lock();
        if state.keyword == keyword {
            return None;
        }
        state.keyword = keyword.to_string();
        state.begin(LoadMode::Replace, 0, self.limit)
    }

    /// New filter combination. Resets to the first page.
    pub fn set_filters(&self, filters: &FilterState) -> Option<PendingQuery> {
        let mut state = self.lock();
        if state.filters == *filters {
            return None;
        }
        state.filters = filters.clone();
        state.begin(LoadMode::Replace, 0, self.limit)
    }

    /// Pause or resume querying (e.g. while prerequisite ids are unknown).
    /// Pausing discards in-flight responses; resuming issues a fresh query.
    pub fn set_enabled(&self, enabled: bool) -> Option<PendingQuery> {
        let mut state = self.lock();
        if state.disabled != enabled {
            return None;
        }
        state.disabled = !enabled;
        if enabled {
            state.begin(LoadMode::Replace, 0, self.limit)
        } else {
            state.supersede();
            None
        }
    }

    /// Next page, appended to the list. `None` while a request is in flight
    /// or when everything has been loaded. If the shown items are stale the
    /// first page of the current query is fetched instead.
    pub fn load_more(&self) -> Option<PendingQuery> {
        let mut state = self.lock();
        if state.loading {
            return None;
        }
        if state.is_stale() {
            return state.begin(LoadMode::Replace, 0, self.limit);
        }
        if state.items.len() as u64 >= state.total {
            return None;
        }
        let next = state.offset + self.limit;
        state.begin(LoadMode::Append, next, self.limit)
    }

    /// Jump to a zero-based page, replacing the list
    pub fn go_to_page(&self, page: u32) -> Option<PendingQuery> {
        let mut state = self.lock();
        let last = page_count(state.total, self.limit).saturating_sub(1);
        let offset = page.min(last) * self.limit;
        state.begin(LoadMode::Replace, offset, self.limit)
    }

    pub fn current_page(&self) -> u32 {
        self.lock().offset / self.limit
    }

    pub fn page_count(&self) -> u32 {
        page_count(self.lock().total, self.limit)
    }

    pub fn has_more(&self) -> bool {
        let state = self.lock();
        state.is_stale() || (state.items.len() as u64) < state.total
    }

    /// Whether the shown items predate the current keyword and filters
    pub fn is_stale(&self) -> bool {
        self.lock().is_stale()
    }

    /// Apply a response. Returns false when the response was stale and
    /// discarded.
    pub fn apply(&self, pending: PendingQuery, result: Result<PropertyPage>) -> bool {
        let mut state = self.lock();
        if state.closed || pending.generation != state.generation {
            debug!(
                generation = pending.generation,
                current = state.generation,
                "Discarding stale property page"
            );
            return false;
        }

        state.loading = false;
        match result {
            Ok(page) => {
                let total = page.total;
                match pending.mode {
                    LoadMode::Replace => {
                        state.items = page.items;
                        state.items.truncate(self.limit as usize);
                    }
                    LoadMode::Append => {
                        let seen: HashSet<_> =
                            state.items.iter().map(|p| p.property_id).collect();
                        state.items.extend(
                            page.items
                                .into_iter()
                                .filter(|p| !seen.contains(&p.property_id)),
                        );
                    }
                }
                state.total = total;
                state.items.truncate(total as usize);
                if pending.mode == LoadMode::Replace {
                    state.shown = Some((pending.keyword, pending.filters));
                }
                debug!(
                    offset = pending.params.offset,
                    shown = state.items.len(),
                    total,
                    "Applied property page"
                );
            }
            Err(e) => {
                warn!(offset = pending.params.offset, error = %e, "Property query failed");
                // Offset keeps describing the items still on screen
                state.offset = pending.previous_offset;
                state.error = Some(e.user_message());
            }
        }
        true
    }

    /// Issue `pending` against the backend and apply the outcome
    pub async fn run(&self, api: &dyn RentalApi, pending: PendingQuery) -> bool {
        let result = api.search_properties(&pending.params).await;
        self.apply(pending, result)
    }

    /// The owning view is gone: nothing in flight may touch the state anymore
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        state.supersede();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

fn page_count(total: u64, limit: u32) -> u32 {
    total.div_ceil(limit as u64) as u32
}
