//! One discovery page: debounced search, filters and the paginated feed wired
//! together, with the shared wishlist and the comparison selection alongside.
//!
//! Queries run as spawned tasks so a slow response never blocks newer input.
//! Closing (or dropping) the session closes the feed and aborts every task,
//! so nothing in flight can write into it afterwards.

use crate::api::traits::RentalApi;
use crate::api::types::{SortField, SortOrder};
use crate::config::SearchConfig;
use crate::models::{LocationId, PropertyId};
use crate::pipeline::debounce::Debounced;
use crate::pipeline::filters::{sort_label, FilterState, LocationLevel};
use crate::pipeline::location::LocationCascade;
use crate::pipeline::query::{FeedSnapshot, PendingQuery, PropertyFeed};
use crate::pipeline::selection::ComparisonSelection;
use crate::pipeline::wishlist::{WishlistSet, WishlistToggle};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// In-flight query tasks
#[derive(Default)]
struct QueryTasks {
    handles: Mutex<Vec<JoinHandle<bool>>>,
}

impl QueryTasks {
    fn lock(&self) -> MutexGuard<'_, Vec<JoinHandle<bool>>> {
        self.handles.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn spawn(&self, api: Arc<dyn RentalApi>, feed: Arc<PropertyFeed>, pending: PendingQuery) {
        debug!(
            offset = pending.params().offset,
            mode = ?pending.mode(),
            "Issuing property query"
        );
        let handle = tokio::spawn(async move { feed.run(api.as_ref(), pending).await });
        let mut handles = self.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    fn take(&self) -> Vec<JoinHandle<bool>> {
        self.lock().drain(..).collect()
    }

    fn abort_all(&self) {
        for handle in self.take() {
            handle.abort();
        }
    }
}

pub struct DiscoverySession {
    api: Arc<dyn RentalApi>,
    search: Debounced<String>,
    filters: FilterState,
    locations: LocationCascade,
    feed: Arc<PropertyFeed>,
    wishlist: Arc<WishlistSet>,
    selection: ComparisonSelection,
    queries: Arc<QueryTasks>,
    watcher: Option<JoinHandle<()>>,
}

impl DiscoverySession {
    /// Must be called inside a tokio runtime
    pub fn new(api: Arc<dyn RentalApi>, config: &SearchConfig) -> Self {
        Self::restored(api, config, "", FilterState::default())
    }

    /// Session for a shared search link (`keyword`, `city_id`, ... pairs)
    pub fn from_query_pairs<K, V>(
        api: Arc<dyn RentalApi>,
        config: &SearchConfig,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let (filters, keyword) = FilterState::from_query_pairs(pairs);
        Self::restored(api, config, &keyword, filters)
    }

    fn restored(
        api: Arc<dyn RentalApi>,
        config: &SearchConfig,
        keyword: &str,
        filters: FilterState,
    ) -> Self {
        let search = Debounced::new(keyword.to_string(), config.debounce());
        let feed = Arc::new(PropertyFeed::with_query(
            config.page_size(),
            keyword,
            filters.clone(),
        ));
        let queries = Arc::new(QueryTasks::default());

        let watcher = {
            let mut committed = search.subscribe();
            let (api, feed, queries) = (api.clone(), feed.clone(), queries.clone());
            tokio::spawn(async move {
                while committed.changed().await.is_ok() {
                    let keyword = committed.borrow_and_update().clone();
                    if let Some(pending) = feed.set_search(&keyword) {
                        queries.spawn(api.clone(), feed.clone(), pending);
                    }
                }
            })
        };

        Self {
            locations: LocationCascade::new(api.clone()),
            wishlist: Arc::new(WishlistSet::new(api.clone())),
            api,
            search,
            filters,
            feed,
            selection: ComparisonSelection::new(),
            queries,
            watcher: Some(watcher),
        }
    }

    /// Load option lists and the wishlist, then issue the first query
    pub async fn open(&mut self) {
        self.locations.load_roots().await;
        self.locations.restore(&self.filters).await;
        if let Err(e) = self.wishlist.refresh().await {
            warn!(error = %e, "Wishlist unavailable");
        }
        if let Some(pending) = self.feed.refresh() {
            self.spawn(pending);
        }
    }

    fn spawn(&self, pending: PendingQuery) {
        self.queries
            .spawn(self.api.clone(), self.feed.clone(), pending);
    }

    fn apply_filters(&mut self) {
        if let Some(pending) = self.feed.set_filters(&self.filters) {
            self.spawn(pending);
        }
    }

    /// A keystroke: the query follows once typing pauses
    pub fn type_search(&mut self, text: &str) {
        self.search.set(text.to_string());
    }

    /// Commit the typed text now (enter key)
    pub fn submit_search(&mut self) {
        self.search.flush();
    }

    pub fn search_text(&self) -> &str {
        self.search.live()
    }

    pub fn committed_search(&self) -> String {
        self.search.committed()
    }

    pub async fn select_location(
        &mut self,
        level: LocationLevel,
        value: Option<LocationId>,
    ) -> bool {
        if !self.locations.select(&mut self.filters, level, value).await {
            return false;
        }
        self.apply_filters();
        true
    }

    pub fn set_category(&mut self, category_id: Option<i64>) {
        self.filters.set_category(category_id);
        self.apply_filters();
    }

    pub fn set_sort(&mut self, field: SortField, order: SortOrder) {
        self.filters.set_sort(field, order);
        self.apply_filters();
    }

    /// Drop every filter and the search text
    pub async fn clear_filters(&mut self) {
        self.locations
            .select(&mut self.filters, LocationLevel::City, None)
            .await;
        self.filters.clear();
        self.search.reset(String::new());
        self.apply_filters();
    }

    pub fn load_more(&self) -> bool {
        match self.feed.load_more() {
            Some(pending) => {
                self.spawn(pending);
                true
            }
            None => false,
        }
    }

    pub fn go_to_page(&self, page: u32) -> bool {
        match self.feed.go_to_page(page) {
            Some(pending) => {
                self.spawn(pending);
                true
            }
            None => false,
        }
    }

    /// Wait until every issued query has been applied or discarded
    pub async fn settle(&self) {
        loop {
            let handles = self.queries.take();
            if handles.is_empty() {
                break;
            }
            for handle in handles {
                if let Err(e) = handle.await {
                    if !e.is_cancelled() {
                        warn!(error = %e, "Property query task failed");
                    }
                }
            }
        }
    }

    /// Current results. An empty list also drops the comparison selection.
    pub fn snapshot(&mut self) -> FeedSnapshot {
        let snapshot = self.feed.snapshot();
        if !snapshot.loading {
            self.selection.on_results_changed(snapshot.items.len());
        }
        snapshot
    }

    pub fn feed(&self) -> &Arc<PropertyFeed> {
        &self.feed
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn locations(&self) -> &LocationCascade {
        &self.locations
    }

    pub fn wishlist(&self) -> &Arc<WishlistSet> {
        &self.wishlist
    }

    /// Heart button for one card
    pub fn wishlist_toggle(&self, property_id: PropertyId) -> WishlistToggle {
        WishlistToggle::new(self.wishlist.clone(), property_id)
    }

    pub fn selection(&self) -> &ComparisonSelection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut ComparisonSelection {
        &mut self.selection
    }

    /// Logged out: the wishlist is someone else's now
    pub fn sign_out(&mut self) {
        self.wishlist.reset();
    }

    /// Pairs for a shareable link of the committed search
    pub fn share_query(&self) -> Vec<(String, String)> {
        self.filters.to_query_pairs(&self.search.committed())
    }

    pub fn location_text(&self) -> String {
        self.locations.selected_location_text(&self.filters)
    }

    pub fn category_text(&self) -> String {
        self.locations.selected_category_text(&self.filters)
    }

    pub fn sort_text(&self) -> &'static str {
        sort_label(&self.filters)
    }

    pub fn close(&mut self) {
        self.feed.close();
        self.search.cancel();
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        self.queries.abort_all();
    }
}

impl Drop for DiscoverySession {
    fn drop(&mut self) {
        self.close();
    }
}
