use crate::api::types::{OptionKind, SearchParams};
use crate::error::Result;
use crate::models::{
    Comparison, FilterOption, NewViewingRequest, PropertyId, PropertyPage, RequestId, UserId,
    ViewingRequest, WishlistEntry,
};
use async_trait::async_trait;

/// Everything the discovery pipeline needs from the rental backend.
/// Components only see this trait, so tests can swap in an in-memory backend.
#[async_trait]
pub trait RentalApi: Send + Sync {
    /// Logged-in user, if any. Mutators check this before touching the network.
    fn current_user(&self) -> Option<UserId>;

    async fn search_properties(&self, params: &SearchParams) -> Result<PropertyPage>;

    async fn filter_options(&self, kind: OptionKind) -> Result<Vec<FilterOption>>;

    async fn compare_properties(&self, ids: &[PropertyId]) -> Result<Comparison>;

    async fn wishlist(&self) -> Result<Vec<WishlistEntry>>;

    async fn add_to_wishlist(&self, property_id: PropertyId) -> Result<WishlistEntry>;

    async fn remove_from_wishlist(&self, property_id: PropertyId) -> Result<()>;

    async fn create_viewing_request(&self, request: &NewViewingRequest) -> Result<ViewingRequest>;

    async fn my_viewing_requests(&self) -> Result<Vec<ViewingRequest>>;

    async fn owner_viewing_requests(&self) -> Result<Vec<ViewingRequest>>;

    /// Requests made for one property, as seen by its owner
    async fn property_viewing_requests(
        &self,
        property_id: PropertyId,
    ) -> Result<Vec<ViewingRequest>>;

    async fn accept_viewing_request(&self, request_id: RequestId) -> Result<ViewingRequest>;

    async fn deny_viewing_request(&self, request_id: RequestId) -> Result<ViewingRequest>;
}
