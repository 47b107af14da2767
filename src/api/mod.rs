pub mod client;
pub mod traits;
pub mod types;

#[cfg(test)]
pub mod fake;

pub use client::HttpRentalApi;
pub use traits::RentalApi;
pub use types::{Credentials, OptionKind, SearchParams, SortField, SortOrder};
