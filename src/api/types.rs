use crate::models::{LocationId, UserId};
use serde::{Deserialize, Serialize};

/// Server-side sort column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    ListedAt,
    RentPrice,
    Bedrooms,
    FloorArea,
}

impl SortField {
    pub fn as_str(self) -> &'static str {
        match self {
            SortField::ListedAt => "listed_at",
            SortField::RentPrice => "rent_price",
            SortField::Bedrooms => "bedrooms",
            SortField::FloorArea => "floor_area",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "listed_at" => Some(SortField::ListedAt),
            "rent_price" => Some(SortField::RentPrice),
            "bedrooms" => Some(SortField::Bedrooms),
            "floor_area" => Some(SortField::FloorArea),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// Search parameters sent to `GET /api/properties`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Free-text keyword (the debounced value)
    pub keyword: Option<String>,
    pub city_id: Option<LocationId>,
    pub district_id: Option<LocationId>,
    pub commune_id: Option<LocationId>,
    pub category_id: Option<i64>,
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortOrder>,
    /// Pagination offset
    pub offset: u32,
    /// Page size (server accepts 1..=50)
    pub limit: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            keyword: None,
            city_id: None,
            district_id: None,
            commune_id: None,
            category_id: None,
            sort_by: None,
            sort_order: None,
            offset: 0,
            limit: 10,
        }
    }
}

impl SearchParams {
    /// Query pairs in the backend's parameter names; unset fields are omitted
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(keyword) = self.keyword.as_deref().filter(|k| !k.is_empty()) {
            pairs.push(("keyword", keyword.to_string()));
        }
        let ids = [
            ("city_id", self.city_id),
            ("district_id", self.district_id),
            ("commune_id", self.commune_id),
            ("category_id", self.category_id),
        ];
        for (key, id) in ids {
            if let Some(id) = id {
                pairs.push((key, id.to_string()));
            }
        }
        if let Some(sort_by) = self.sort_by {
            pairs.push(("sort_by", sort_by.as_str().to_string()));
        }
        if let Some(order) = self.sort_order {
            pairs.push(("sort_order", order.as_str().to_string()));
        }
        pairs.push(("offset", self.offset.to_string()));
        pairs.push(("limit", self.limit.to_string()));
        pairs
    }
}

/// Which option list to fetch from `/api/properties/filters/...`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    Cities,
    Districts { city_id: LocationId },
    Communes { district_id: LocationId },
    Categories,
    Features,
}

impl OptionKind {
    pub fn path(self) -> &'static str {
        match self {
            OptionKind::Cities => "cities",
            OptionKind::Districts { .. } => "districts",
            OptionKind::Communes { .. } => "communes",
            OptionKind::Categories => "categories",
            OptionKind::Features => "features",
        }
    }

    /// Parent scope as a query pair, if the list is scoped
    pub fn parent(self) -> Option<(&'static str, LocationId)> {
        match self {
            OptionKind::Districts { city_id } => Some(("city_id", city_id)),
            OptionKind::Communes { district_id } => Some(("district_id", district_id)),
            _ => None,
        }
    }

    /// Field prefix the backend uses in its `{prefix}_id` / `{prefix}_name` keys
    pub fn field_prefix(self) -> &'static str {
        match self {
            OptionKind::Cities => "city",
            OptionKind::Districts { .. } => "district",
            OptionKind::Communes { .. } => "commune",
            OptionKind::Categories => "category",
            OptionKind::Features => "feature",
        }
    }
}

/// Bearer credentials for the logged-in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub user_id: UserId,
}
