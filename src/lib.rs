//! Property rental discovery client: search, filters, paging, wishlist,
//! comparison and viewing requests against the rental backend.

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod storage;

pub use error::{Result, ScoutError, ValidationError};
