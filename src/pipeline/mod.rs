pub mod booking;
pub mod debounce;
pub mod filters;
pub mod location;
pub mod query;
pub mod selection;
pub mod session;
pub mod wishlist;

pub use booking::{BookingFlow, BookingState, OwnerDesk, ViewingWindow};
pub use debounce::{Debounced, SEARCH_DEBOUNCE};
pub use filters::{sort_label, FilterState, LocationLevel, SortPreset, SORT_PRESETS};
pub use location::{FilterOptions, LocationCascade};
pub use query::{FeedSnapshot, LoadMode, PendingQuery, PropertyFeed};
pub use selection::{ComparisonSelection, ComparisonView, MIN_COMPARE};
pub use session::DiscoverySession;
pub use wishlist::{WishlistSet, WishlistToggle};
