//! In-memory backend for pipeline tests

use crate::api::traits::RentalApi;
use crate::api::types::{OptionKind, SearchParams};
use crate::error::{Result, ScoutError};
use crate::models::{
    Comparison, ComparisonItem, FilterOption, NewViewingRequest, PropertyId, PropertyPage,
    PropertyStatus, PropertySummary, RequestId, UserId, ViewingRequest, ViewingStatus,
    WishlistEntry,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use tokio::sync::oneshot;

pub fn offline() -> ScoutError {
    ScoutError::Server {
        status: 503,
        message: "offline".into(),
    }
}

pub fn property(id: PropertyId, title: &str) -> PropertySummary {
    PropertySummary {
        property_id: id,
        title: title.to_string(),
        description: None,
        bedrooms: 2,
        bathrooms: 1,
        floor_area: 60.0,
        status: PropertyStatus::Available,
        listed_at: None,
        category_name: None,
        rating: None,
        pricing: None,
        location: None,
        media: Vec::new(),
    }
}

pub fn options(names: &[(i64, &str)]) -> Vec<FilterOption> {
    names
        .iter()
        .map(|(id, name)| FilterOption {
            id: *id,
            name: name.to_string(),
        })
        .collect()
}

enum Scripted<T> {
    Ready(Result<T>),
    Gated(oneshot::Receiver<Result<T>>),
}

impl<T> Scripted<T> {
    async fn resolve(self) -> Result<T> {
        match self {
            Scripted::Ready(result) => result,
            Scripted::Gated(rx) => rx.await.unwrap_or_else(|_| Err(offline())),
        }
    }
}

#[derive(Default)]
pub struct FakeApi {
    user: Mutex<Option<UserId>>,
    catalogue: Mutex<Vec<PropertySummary>>,
    search_script: Mutex<VecDeque<Scripted<PropertyPage>>>,
    options: Mutex<HashMap<OptionKind, Vec<FilterOption>>>,
    failing_options: Mutex<HashSet<OptionKind>>,
    wishlist: Mutex<Vec<WishlistEntry>>,
    wishlist_script: Mutex<VecDeque<Scripted<()>>>,
    requests: Mutex<Vec<ViewingRequest>>,
    fail_requests: Mutex<bool>,
    calls: Mutex<Vec<String>>,
    search_calls: Mutex<Vec<SearchParams>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logged_in(user_id: UserId) -> Self {
        let api = Self::default();
        *api.user.lock().unwrap() = Some(user_id);
        api
    }

    pub fn set_user(&self, user: Option<UserId>) {
        *self.user.lock().unwrap() = user;
    }

    pub fn with_catalogue(self, items: Vec<PropertySummary>) -> Self {
        *self.catalogue.lock().unwrap() = items;
        self
    }

    pub fn with_options(self, kind: OptionKind, list: Vec<FilterOption>) -> Self {
        self.options.lock().unwrap().insert(kind, list);
        self
    }

    pub fn fail_options(&self, kind: OptionKind) {
        self.failing_options.lock().unwrap().insert(kind);
    }

    pub fn with_wishlist(self, ids: &[PropertyId]) -> Self {
        let user_id = self.user.lock().unwrap().unwrap_or_default();
        *self.wishlist.lock().unwrap() = ids
            .iter()
            .map(|id| WishlistEntry {
                property_id: *id,
                user_id,
                added_at: Utc::now(),
            })
            .collect();
        self
    }

    pub fn with_requests(self, requests: Vec<ViewingRequest>) -> Self {
        *self.requests.lock().unwrap() = requests;
        self
    }

    pub fn fail_viewing_requests(&self, fail: bool) {
        *self.fail_requests.lock().unwrap() = fail;
    }

    /// Next search answers immediately with `result`
    pub fn script_search(&self, result: Result<PropertyPage>) {
        self.search_script
            .lock()
            .unwrap()
            .push_back(Scripted::Ready(result));
    }

    /// Next search waits until the returned sender fires
    pub fn gate_search(&self) -> oneshot::Sender<Result<PropertyPage>> {
        let (tx, rx) = oneshot::channel();
        self.search_script
            .lock()
            .unwrap()
            .push_back(Scripted::Gated(rx));
        tx
    }

    pub fn script_wishlist_mutation(&self, result: Result<()>) {
        self.wishlist_script
            .lock()
            .unwrap()
            .push_back(Scripted::Ready(result));
    }

    pub fn gate_wishlist_mutation(&self) -> oneshot::Sender<Result<()>> {
        let (tx, rx) = oneshot::channel();
        self.wishlist_script
            .lock()
            .unwrap()
            .push_back(Scripted::Gated(rx));
        tx
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn search_calls(&self) -> Vec<SearchParams> {
        self.search_calls.lock().unwrap().clone()
    }

    pub fn server_wishlist(&self) -> Vec<PropertyId> {
        self.wishlist
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.property_id)
            .collect()
    }

    pub fn set_request_status(&self, request_id: RequestId, status: ViewingStatus) {
        if let Some(r) = self
            .requests
            .lock()
            .unwrap()
            .iter_mut()
            .find(|r| r.request_id == request_id)
        {
            r.status = status;
        }
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn require_user(&self) -> Result<UserId> {
        self.user.lock().unwrap().ok_or(ScoutError::AuthRequired)
    }

    fn catalogue_page(&self, params: &SearchParams) -> PropertyPage {
        let catalogue = self.catalogue.lock().unwrap();
        let keyword = params.keyword.clone().unwrap_or_default().to_lowercase();
        let matching: Vec<_> = catalogue
            .iter()
            .filter(|p| keyword.is_empty() || p.title.to_lowercase().contains(&keyword))
            .cloned()
            .collect();
        let items = matching
            .iter()
            .skip(params.offset as usize)
            .take(params.limit as usize)
            .cloned()
            .collect();
        PropertyPage {
            items,
            total: matching.len() as u64,
        }
    }

    fn next_wishlist_script(&self) -> Option<Scripted<()>> {
        self.wishlist_script.lock().unwrap().pop_front()
    }

    fn request_failure(&self) -> Result<()> {
        if *self.fail_requests.lock().unwrap() {
            Err(offline())
        } else {
            Ok(())
        }
    }

    fn transition(&self, request_id: RequestId, status: ViewingStatus) -> Result<ViewingRequest> {
        self.request_failure()?;
        let mut requests = self.requests.lock().unwrap();
        let request = requests
            .iter_mut()
            .find(|r| r.request_id == request_id)
            .ok_or_else(|| ScoutError::Server {
                status: 404,
                message: "Viewing request not found".into(),
            })?;
        request.status = status;
        Ok(request.clone())
    }
}

#[async_trait]
impl RentalApi for FakeApi {
    fn current_user(&self) -> Option<UserId> {
        *self.user.lock().unwrap()
    }

    async fn search_properties(&self, params: &SearchParams) -> Result<PropertyPage> {
        self.record(format!("search offset={}", params.offset));
        self.search_calls.lock().unwrap().push(params.clone());
        let scripted = self.search_script.lock().unwrap().pop_front();
        match scripted {
            Some(scripted) => scripted.resolve().await,
            None => Ok(self.catalogue_page(params)),
        }
    }

    async fn filter_options(&self, kind: OptionKind) -> Result<Vec<FilterOption>> {
        self.record(match kind.parent() {
            Some((key, id)) => format!("options {} {}={}", kind.path(), key, id),
            None => format!("options {}", kind.path()),
        });
        if self.failing_options.lock().unwrap().contains(&kind) {
            return Err(offline());
        }
        Ok(self
            .options
            .lock()
            .unwrap()
            .get(&kind)
            .cloned()
            .unwrap_or_default())
    }

    async fn compare_properties(&self, ids: &[PropertyId]) -> Result<Comparison> {
        self.record(format!("compare {:?}", ids));
        let properties = ids
            .iter()
            .map(|id| ComparisonItem {
                property_id: *id,
                title: format!("Property {id}"),
                rent_price: 500.0,
                city_name: "Phnom Penh".into(),
                district_name: "Chamkar Mon".into(),
                bedrooms: 2,
                bathrooms: 1,
                floor_area: 60.0,
                features: Vec::new(),
                media_url: None,
                status: PropertyStatus::Available,
            })
            .collect();
        Ok(Comparison { properties })
    }

    async fn wishlist(&self) -> Result<Vec<WishlistEntry>> {
        self.require_user()?;
        self.record("wishlist".into());
        Ok(self.wishlist.lock().unwrap().clone())
    }

    async fn add_to_wishlist(&self, property_id: PropertyId) -> Result<WishlistEntry> {
        let user_id = self.require_user()?;
        self.record(format!("wishlist add {property_id}"));
        if let Some(scripted) = self.next_wishlist_script() {
            scripted.resolve().await?;
        }
        let entry = WishlistEntry {
            property_id,
            user_id,
            added_at: Utc::now(),
        };
        let mut wishlist = self.wishlist.lock().unwrap();
        wishlist.retain(|e| e.property_id != property_id);
        wishlist.push(entry.clone());
        Ok(entry)
    }

    async fn remove_from_wishlist(&self, property_id: PropertyId) -> Result<()> {
        self.require_user()?;
        self.record(format!("wishlist remove {property_id}"));
        if let Some(scripted) = self.next_wishlist_script() {
            scripted.resolve().await?;
        }
        self.wishlist
            .lock()
            .unwrap()
            .retain(|e| e.property_id != property_id);
        Ok(())
    }

    async fn create_viewing_request(&self, request: &NewViewingRequest) -> Result<ViewingRequest> {
        let user_id = self.require_user()?;
        self.record(format!("viewing create {}", request.property_id));
        self.request_failure()?;
        let mut requests = self.requests.lock().unwrap();
        let created = ViewingRequest {
            request_id: requests.len() as RequestId + 1,
            property_id: request.property_id,
            user_id,
            requested_time: request.requested_time,
            status: ViewingStatus::Pending,
            created_at: Some(Utc::now()),
            message: request.message.clone(),
        };
        requests.push(created.clone());
        Ok(created)
    }

    async fn my_viewing_requests(&self) -> Result<Vec<ViewingRequest>> {
        let user_id = self.require_user()?;
        self.record("viewing mine".into());
        self.request_failure()?;
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn owner_viewing_requests(&self) -> Result<Vec<ViewingRequest>> {
        self.require_user()?;
        self.record("viewing owner".into());
        self.request_failure()?;
        Ok(self.requests.lock().unwrap().clone())
    }

    async fn property_viewing_requests(
        &self,
        property_id: PropertyId,
    ) -> Result<Vec<ViewingRequest>> {
        self.require_user()?;
        self.record(format!("viewing property {property_id}"));
        self.request_failure()?;
        Ok(self
            .requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.property_id == property_id)
            .cloned()
            .collect())
    }

    async fn accept_viewing_request(&self, request_id: RequestId) -> Result<ViewingRequest> {
        self.require_user()?;
        self.record(format!("viewing accept {request_id}"));
        self.transition(request_id, ViewingStatus::Accepted)
    }

    async fn deny_viewing_request(&self, request_id: RequestId) -> Result<ViewingRequest> {
        self.require_user()?;
        self.record(format!("viewing deny {request_id}"));
        self.transition(request_id, ViewingStatus::Denied)
    }
}
