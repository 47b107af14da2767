use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub type PropertyId = i64;
pub type UserId = i64;
pub type RequestId = i64;
pub type LocationId = i64;

/// Availability of a listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    #[default]
    Available,
    Rented,
}

/// Location names attached to a listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub city_id: Option<LocationId>,
    #[serde(default)]
    pub district_id: Option<LocationId>,
    #[serde(default)]
    pub commune_id: Option<LocationId>,
    #[serde(default)]
    pub city_name: Option<String>,
    #[serde(default)]
    pub district_name: Option<String>,
    #[serde(default)]
    pub commune_name: Option<String>,
    #[serde(default)]
    pub street_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pricing {
    #[serde(deserialize_with = "decimal")]
    pub rent_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Media {
    pub media_url: String,
    #[serde(default)]
    pub media_type: Option<String>,
}

/// Core property data model, as rendered in result lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertySummary {
    pub property_id: PropertyId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub bedrooms: u32,
    #[serde(default)]
    pub bathrooms: u32,
    #[serde(default, deserialize_with = "decimal")]
    pub floor_area: f64,
    #[serde(default)]
    pub status: PropertyStatus,
    #[serde(default)]
    pub listed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(default, deserialize_with = "optional_decimal")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub pricing: Option<Pricing>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub media: Vec<Media>,
}

impl PropertySummary {
    pub fn rent_price(&self) -> Option<f64> {
        self.pricing.as_ref().map(|p| p.rent_price)
    }

    /// First image, if any
    pub fn cover_image(&self) -> Option<&str> {
        self.media.first().map(|m| m.media_url.as_str())
    }
}

/// One page of search results
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyPage {
    #[serde(alias = "properties")]
    pub items: Vec<PropertySummary>,
    pub total: u64,
}

/// A selectable dropdown entry (city, district, commune, category, feature)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub property_id: PropertyId,
    pub user_id: UserId,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonItem {
    pub property_id: PropertyId,
    pub title: String,
    #[serde(deserialize_with = "decimal")]
    pub rent_price: f64,
    pub city_name: String,
    pub district_name: String,
    pub bedrooms: u32,
    pub bathrooms: u32,
    #[serde(deserialize_with = "decimal")]
    pub floor_area: f64,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub media_url: Option<String>,
    pub status: PropertyStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Comparison {
    pub properties: Vec<ComparisonItem>,
}

/// Server-side lifecycle of a viewing request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ViewingStatus {
    Pending,
    Accepted,
    Denied,
}

impl ViewingStatus {
    /// Pending and accepted requests block a second booking
    pub fn is_active(self) -> bool {
        matches!(self, ViewingStatus::Pending | ViewingStatus::Accepted)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewingRequest {
    pub request_id: RequestId,
    pub property_id: PropertyId,
    pub user_id: UserId,
    pub requested_time: DateTime<Utc>,
    pub status: ViewingStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewViewingRequest {
    pub property_id: PropertyId,
    pub requested_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Owner-entered denial reason. Kept only on this machine; the backend has
/// no field for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DenialReason {
    pub request_id: RequestId,
    pub reason: String,
    pub denied_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DecimalRepr {
    Number(f64),
    Text(String),
}

impl DecimalRepr {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            DecimalRepr::Number(n) => Ok(n),
            DecimalRepr::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid decimal: {s}"))),
        }
    }
}

// Decimal columns serialize as strings on the backend
fn decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    DecimalRepr::deserialize(deserializer)?.into_f64()
}

fn optional_decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Option::<DecimalRepr>::deserialize(deserializer)?
        .map(DecimalRepr::into_f64)
        .transpose()
}
