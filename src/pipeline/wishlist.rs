//! Shared wishlist membership with optimistic mutations.
//!
//! One `WishlistSet` is shared (via `Arc`) by every renderer on a page, so all
//! cards showing the same property observe the same membership. Mutations
//! update the set before the network call and roll back if it fails.

use crate::api::traits::RentalApi;
use crate::error::{Result, ScoutError};
use crate::models::{PropertyId, WishlistEntry};
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct WishlistState {
    entries: BTreeMap<PropertyId, WishlistEntry>,
    /// Sequence number of the latest user action per property
    intents: HashMap<PropertyId, u64>,
    in_flight: HashMap<PropertyId, usize>,
    seq: u64,
    error: Option<String>,
}

impl WishlistState {
    fn ids(&self) -> BTreeSet<PropertyId> {
        self.entries.keys().copied().collect()
    }
}

pub struct WishlistSet {
    api: Arc<dyn RentalApi>,
    state: Mutex<WishlistState>,
    changes: watch::Sender<BTreeSet<PropertyId>>,
}

impl WishlistSet {
    pub fn new(api: Arc<dyn RentalApi>) -> Self {
        let (changes, _rx) = watch::channel(BTreeSet::new());
        Self {
            api,
            state: Mutex::new(WishlistState::default()),
            changes,
        }
    }

    fn lock(&self) -> MutexGuard<'_, WishlistState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, state: &WishlistState) {
        let ids = state.ids();
        self.changes.send_if_modified(|current| {
            if *current == ids {
                false
            } else {
                *current = ids;
                true
            }
        });
    }

    /// Membership updates for every renderer on the page
    pub fn subscribe(&self) -> watch::Receiver<BTreeSet<PropertyId>> {
        self.changes.subscribe()
    }

    pub fn contains(&self, property_id: PropertyId) -> bool {
        self.lock().entries.contains_key(&property_id)
    }

    pub fn ids(&self) -> BTreeSet<PropertyId> {
        self.lock().ids()
    }

    pub fn entries(&self) -> Vec<WishlistEntry> {
        self.lock().entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    /// Whether any mutation for this property is awaiting the server
    pub fn is_pending(&self, property_id: PropertyId) -> bool {
        self.lock()
            .in_flight
            .get(&property_id)
            .is_some_and(|n| *n > 0)
    }

    /// Last mutation or refresh error, for display
    pub fn last_error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Reload from the server. Properties with a mutation in flight keep
    /// their optimistic membership. Anonymous users get an empty set.
    pub async fn refresh(&self) -> Result<()> {
        if self.api.current_user().is_none() {
            self.reset();
            return Ok(());
        }

        let fetched = match self.api.wishlist().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Failed to load wishlist");
                self.lock().error = Some(e.user_message());
                return Err(e);
            }
        };

        let mut state = self.lock();
        let mut entries: BTreeMap<_, _> = fetched
            .into_iter()
            .map(|entry| (entry.property_id, entry))
            .collect();
        for (id, count) in &state.in_flight {
            if *count == 0 {
                continue;
            }
            match state.entries.get(id) {
                Some(entry) => {
                    entries.insert(*id, entry.clone());
                }
                None => {
                    entries.remove(id);
                }
            }
        }
        state.entries = entries;
        state.error = None;
        info!(count = state.entries.len(), "Wishlist loaded");
        self.publish(&state);
        Ok(())
    }

    /// Forget everything locally (e.g. on logout)
    pub fn reset(&self) {
        let mut state = self.lock();
        *state = WishlistState::default();
        self.publish(&state);
    }

    pub async fn add(&self, property_id: PropertyId) -> Result<()> {
        self.mutate(property_id, true).await
    }

    pub async fn remove(&self, property_id: PropertyId) -> Result<()> {
        self.mutate(property_id, false).await
    }

    /// Flip membership; returns the membership the user asked for
    pub async fn toggle(&self, property_id: PropertyId) -> Result<bool> {
        let wanted = !self.contains(property_id);
        self.mutate(property_id, wanted).await?;
        Ok(wanted)
    }

    async fn mutate(&self, property_id: PropertyId, wanted: bool) -> Result<()> {
        let user_id = self.api.current_user().ok_or(ScoutError::AuthRequired)?;

        let mut guard = {
            let mut state = self.lock();
            let prior = state.entries.get(&property_id).cloned();
            state.seq += 1;
            let seq = state.seq;
            state.intents.insert(property_id, seq);
            *state.in_flight.entry(property_id).or_default() += 1;

            if wanted {
                state
                    .entries
                    .entry(property_id)
                    .or_insert_with(|| WishlistEntry {
                        property_id,
                        user_id,
                        added_at: Utc::now(),
                    });
            } else {
                state.entries.remove(&property_id);
            }
            self.publish(&state);
            MutationGuard {
                set: self,
                property_id,
                seq,
                prior,
                settled: false,
            }
        };
        debug!(property_id, wanted, seq = guard.seq, "Optimistic wishlist update");

        let result = if wanted {
            self.api.add_to_wishlist(property_id).await.map(Some)
        } else {
            self.api.remove_from_wishlist(property_id).await.map(|_| None)
        };

        guard.settled = true;
        let mut state = self.lock();
        let latest = guard.release(&mut state);

        match result {
            Ok(confirmed) => {
                if latest {
                    if let Some(entry) = confirmed {
                        state.entries.insert(property_id, entry);
                    }
                    state.error = None;
                }
                Ok(())
            }
            Err(e) => {
                warn!(property_id, wanted, error = %e, "Wishlist update failed");
                if latest {
                    guard.roll_back(&mut state);
                } else {
                    debug!(property_id, seq = guard.seq, "Newer action supersedes failed update");
                }
                state.error = Some(e.user_message());
                Err(e)
            }
        }
    }
}

/// Bookkeeping for one in-flight mutation. If the mutation future is dropped
/// before the server answers, the in-flight slot is released and the
/// optimistic change is undone.
struct MutationGuard<'a> {
    set: &'a WishlistSet,
    property_id: PropertyId,
    seq: u64,
    prior: Option<WishlistEntry>,
    settled: bool,
}

impl MutationGuard<'_> {
    /// Give back the in-flight slot; true if this was the latest intent
    fn release(&self, state: &mut WishlistState) -> bool {
        let latest = state.intents.get(&self.property_id) == Some(&self.seq);
        let remaining = state.in_flight.get_mut(&self.property_id).map(|count| {
            *count = count.saturating_sub(1);
            *count
        });
        if remaining == Some(0) {
            state.in_flight.remove(&self.property_id);
            state.intents.remove(&self.property_id);
        }
        latest
    }

    fn roll_back(&self, state: &mut WishlistState) {
        match &self.prior {
            Some(entry) => {
                state.entries.insert(self.property_id, entry.clone());
            }
            None => {
                state.entries.remove(&self.property_id);
            }
        }
        self.set.publish(state);
    }
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = self.set.lock();
        if self.release(&mut state) {
            self.roll_back(&mut state);
        }
        debug!(property_id = self.property_id, seq = self.seq, "Wishlist update cancelled");
    }
}

/// Clears the card's busy flag however the press ends
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A single heart button. Ignores presses while its own request is pending.
pub struct WishlistToggle {
    set: Arc<WishlistSet>,
    property_id: PropertyId,
    busy: AtomicBool,
}

impl WishlistToggle {
    pub fn new(set: Arc<WishlistSet>, property_id: PropertyId) -> Self {
        Self {
            set,
            property_id,
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_active(&self) -> bool {
        self.set.contains(self.property_id)
    }

    pub fn is_disabled(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// `Ok(None)` when the press was ignored because the control is disabled
    pub async fn press(&self) -> Result<Option<bool>> {
        if self.busy.swap(true, Ordering::AcqRel) {
            return Ok(None);
        }
        let _busy = BusyGuard(&self.busy);
        self.set.toggle(self.property_id).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{offline, FakeApi};

    fn set_for(api: &Arc<FakeApi>) -> Arc<WishlistSet> {
        Arc::new(WishlistSet::new(api.clone()))
    }

    #[tokio::test]
    async fn anonymous_mutation_fails_fast() {
        let api = Arc::new(FakeApi::new());
        let set = set_for(&api);
        let err = set.add(42).await.unwrap_err();
        assert!(matches!(err, ScoutError::AuthRequired));
        assert!(api.calls().is_empty());
        assert!(!set.contains(42));
    }

    #[tokio::test]
    async fn refresh_loads_server_membership() {
        let api = Arc::new(FakeApi::logged_in(7).with_wishlist(&[3, 5]));
        let set = set_for(&api);
        set.refresh().await.unwrap();
        assert_eq!(set.ids(), BTreeSet::from([3, 5]));
        assert_eq!(set.len(), 2);
    }

    #[tokio::test]
    async fn anonymous_refresh_is_empty() {
        let api = Arc::new(FakeApi::new());
        let set = set_for(&api);
        set.refresh().await.unwrap();
        assert!(set.is_empty());
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn add_is_visible_before_confirmation() {
        let api = Arc::new(FakeApi::logged_in(7));
        let set = set_for(&api);
        let gate = api.gate_wishlist_mutation();

        let task = {
            let set = set.clone();
            tokio::spawn(async move { set.add(42).await })
        };
        tokio::task::yield_now().await;
        assert!(set.contains(42));
        assert!(set.is_pending(42));

        gate.send(Ok(())).unwrap();
        task.await.unwrap().unwrap();
        assert!(set.contains(42));
        assert!(!set.is_pending(42));
        assert_eq!(api.server_wishlist(), vec![42]);
    }

    #[tokio::test]
    async fn offline_add_rolls_back() {
        let api = Arc::new(FakeApi::logged_in(7));
        let set = set_for(&api);
        let gate = api.gate_wishlist_mutation();
        let mut rx = set.subscribe();

        let task = {
            let set = set.clone();
            tokio::spawn(async move { set.add(42).await })
        };
        tokio::task::yield_now().await;
        assert!(rx.borrow_and_update().contains(&42));

        gate.send(Err(offline())).unwrap();
        assert!(task.await.unwrap().is_err());
        assert!(!set.contains(42));
        assert!(!rx.borrow_and_update().contains(&42));
        assert_eq!(set.last_error().as_deref(), Some("offline"));
    }

    #[tokio::test]
    async fn failed_remove_restores_entry() {
        let api = Arc::new(FakeApi::logged_in(7).with_wishlist(&[9]));
        let set = set_for(&api);
        set.refresh().await.unwrap();
        let added_at = set.entries()[0].added_at;

        api.script_wishlist_mutation(Err(offline()));
        assert!(set.remove(9).await.is_err());
        assert!(set.contains(9));
        assert_eq!(set.entries()[0].added_at, added_at);
    }

    #[tokio::test]
    async fn latest_action_wins_when_older_succeeds_late() {
        let api = Arc::new(FakeApi::logged_in(7));
        let set = set_for(&api);
        let slow_add = api.gate_wishlist_mutation();

        let add = {
            let set = set.clone();
            tokio::spawn(async move { set.add(1).await })
        };
        tokio::task::yield_now().await;

        set.remove(1).await.unwrap();
        assert!(!set.contains(1));

        slow_add.send(Ok(())).unwrap();
        add.await.unwrap().unwrap();
        assert!(!set.contains(1));
    }

    #[tokio::test]
    async fn older_failure_does_not_undo_newer_action() {
        let api = Arc::new(FakeApi::logged_in(7).with_wishlist(&[1]));
        let set = set_for(&api);
        set.refresh().await.unwrap();
        let slow_remove = api.gate_wishlist_mutation();

        let remove = {
            let set = set.clone();
            tokio::spawn(async move { set.remove(1).await })
        };
        tokio::task::yield_now().await;
        assert!(!set.contains(1));

        set.add(1).await.unwrap();
        slow_remove.send(Err(offline())).unwrap();
        assert!(remove.await.unwrap().is_err());
        assert!(set.contains(1));
    }

    #[tokio::test]
    async fn toggle_button_ignores_presses_while_busy() {
        let api = Arc::new(FakeApi::logged_in(7));
        let set = set_for(&api);
        let card = Arc::new(WishlistToggle::new(set.clone(), 5));
        let other_card = WishlistToggle::new(set.clone(), 5);
        let gate = api.gate_wishlist_mutation();

        let first = {
            let card = card.clone();
            tokio::spawn(async move { card.press().await })
        };
        tokio::task::yield_now().await;
        assert!(card.is_disabled());
        assert_eq!(card.press().await.unwrap(), None);
        // Another renderer of the same property sees the same truth
        assert!(other_card.is_active());

        gate.send(Ok(())).unwrap();
        assert_eq!(first.await.unwrap().unwrap(), Some(true));
        assert!(!card.is_disabled());
        assert!(card.is_active());
    }

    #[tokio::test]
    async fn reset_clears_and_notifies() {
        let api = Arc::new(FakeApi::logged_in(7).with_wishlist(&[1, 2]));
        let set = set_for(&api);
        set.refresh().await.unwrap();
        let rx = set.subscribe();
        set.reset();
        assert!(rx.has_changed().unwrap());
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn cancelled_add_is_undone() {
        let api = Arc::new(FakeApi::logged_in(7));
        let set = set_for(&api);
        let _gate = api.gate_wishlist_mutation();

        let task = {
            let set = set.clone();
            tokio::spawn(async move { set.add(42).await })
        };
        tokio::task::yield_now().await;
        assert!(set.contains(42));
        assert!(set.is_pending(42));

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(!set.contains(42));
        assert!(!set.is_pending(42));

        set.refresh().await.unwrap();
        assert!(!set.contains(42));
        assert!(api.server_wishlist().is_empty());
    }

    #[tokio::test]
    async fn cancelled_press_reenables_button() {
        let api = Arc::new(FakeApi::logged_in(7));
        let set = set_for(&api);
        let card = Arc::new(WishlistToggle::new(set.clone(), 5));
        let _gate = api.gate_wishlist_mutation();

        let press = {
            let card = card.clone();
            tokio::spawn(async move { card.press().await })
        };
        tokio::task::yield_now().await;
        assert!(card.is_disabled());

        press.abort();
        assert!(press.await.unwrap_err().is_cancelled());
        assert!(!card.is_disabled());
        assert!(!card.is_active());
    }
}
