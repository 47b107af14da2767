//! Filter and sort state for the property search.

use crate::api::types::{SearchParams, SortField, SortOrder};
use crate::models::LocationId;

/// Position in the city → district → commune hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LocationLevel {
    City,
    District,
    Commune,
}

impl LocationLevel {
    /// The level whose option list is scoped by this one
    pub fn child(self) -> Option<LocationLevel> {
        match self {
            LocationLevel::City => Some(LocationLevel::District),
            LocationLevel::District => Some(LocationLevel::Commune),
            LocationLevel::Commune => None,
        }
    }

    pub fn parent(self) -> Option<LocationLevel> {
        match self {
            LocationLevel::City => None,
            LocationLevel::District => Some(LocationLevel::City),
            LocationLevel::Commune => Some(LocationLevel::District),
        }
    }
}

/// Flat filter record sent with every search.
///
/// `district_id` is only set while `city_id` is, and `commune_id` only while
/// `district_id` is. Setting a location level clears every level below it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub city_id: Option<LocationId>,
    pub district_id: Option<LocationId>,
    pub commune_id: Option<LocationId>,
    pub category_id: Option<i64>,
    pub sort_by: Option<SortField>,
    pub sort_order: Option<SortOrder>,
}

const QUERY_KEYS: [&str; 7] = [
    "keyword",
    "city_id",
    "district_id",
    "commune_id",
    "category_id",
    "sort_by",
    "sort_order",
];

impl FilterState {
    pub fn location(&self, level: LocationLevel) -> Option<LocationId> {
        match level {
            LocationLevel::City => self.city_id,
            LocationLevel::District => self.district_id,
            LocationLevel::Commune => self.commune_id,
        }
    }

    /// Set one location level and clear everything below it.
    ///
    /// Returns false (and changes nothing) when the parent level is unset,
    /// since a district without a city has no meaning.
    pub fn set_location(&mut self, level: LocationLevel, value: Option<LocationId>) -> bool {
        if value.is_some() {
            if let Some(parent) = level.parent() {
                if self.location(parent).is_none() {
                    return false;
                }
            }
        }

        match level {
            LocationLevel::City => {
                self.city_id = value;
                self.district_id = None;
                self.commune_id = None;
            }
            LocationLevel::District => {
                self.district_id = value;
                self.commune_id = None;
            }
            LocationLevel::Commune => self.commune_id = value,
        }
        true
    }

    pub fn set_category(&mut self, category_id: Option<i64>) {
        self.category_id = category_id;
    }

    pub fn set_sort(&mut self, field: SortField, order: SortOrder) {
        self.sort_by = Some(field);
        self.sort_order = Some(order);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn search_params(&self, keyword: &str, offset: u32, limit: u32) -> SearchParams {
        let keyword = keyword.trim();
        SearchParams {
            keyword: (!keyword.is_empty()).then(|| keyword.to_string()),
            city_id: self.city_id,
            district_id: self.district_id,
            commune_id: self.commune_id,
            category_id: self.category_id,
            sort_by: self.sort_by,
            sort_order: self.sort_order,
            offset,
            limit,
        }
    }

    /// Shareable link parameters (keyword included, pagination excluded)
    pub fn to_query_pairs(&self, keyword: &str) -> Vec<(String, String)> {
        self.search_params(keyword, 0, 1)
            .to_query()
            .into_iter()
            .filter(|(key, _)| QUERY_KEYS.contains(key))
            .map(|(key, value)| (key.to_string(), value))
            .collect()
    }

    /// Restore filters and keyword from link parameters. Unknown keys and
    /// unparsable values are ignored; orphaned child levels are dropped.
    pub fn from_query_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> (Self, String)
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filters = Self::default();
        let mut keyword = String::new();
        let (mut city, mut district, mut commune) = (None, None, None);

        for (key, value) in pairs {
            let value = value.as_ref().trim();
            match key.as_ref() {
                "keyword" => keyword = value.to_string(),
                "city_id" => city = value.parse().ok(),
                "district_id" => district = value.parse().ok(),
                "commune_id" => commune = value.parse().ok(),
                "category_id" => filters.category_id = value.parse().ok(),
                "sort_by" => filters.sort_by = SortField::parse(value),
                "sort_order" => filters.sort_order = SortOrder::parse(value),
                _ => {}
            }
        }

        filters.set_location(LocationLevel::City, city);
        filters.set_location(LocationLevel::District, district);
        filters.set_location(LocationLevel::Commune, commune);
        (filters, keyword)
    }
}

/// A labelled sort choice as offered in the sort dropdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortPreset {
    pub field: SortField,
    pub order: SortOrder,
    pub label: &'static str,
}

pub const SORT_PRESETS: [SortPreset; 8] = [
    SortPreset {
        field: SortField::ListedAt,
        order: SortOrder::Desc,
        label: "Latest Listed",
    },
    SortPreset {
        field: SortField::ListedAt,
        order: SortOrder::Asc,
        label: "Oldest Listed",
    },
    SortPreset {
        field: SortField::RentPrice,
        order: SortOrder::Asc,
        label: "Price: Low to High",
    },
    SortPreset {
        field: SortField::RentPrice,
        order: SortOrder::Desc,
        label: "Price: High to Low",
    },
    SortPreset {
        field: SortField::Bedrooms,
        order: SortOrder::Asc,
        label: "Bedrooms: Low to High",
    },
    SortPreset {
        field: SortField::Bedrooms,
        order: SortOrder::Desc,
        label: "Bedrooms: High to Low",
    },
    SortPreset {
        field: SortField::FloorArea,
        order: SortOrder::Asc,
        label: "Floor Area: Small to Large",
    },
    SortPreset {
        field: SortField::FloorArea,
        order: SortOrder::Desc,
        label: "Floor Area: Large to Small",
    },
];

/// Label for the current sort; unsorted searches use the backend's default
/// (newest first)
pub fn sort_label(filters: &FilterState) -> &'static str {
    SORT_PRESETS
        .iter()
        .find(|p| Some(p.field) == filters.sort_by && Some(p.order) == filters.sort_order)
        .map(|p| p.label)
        .unwrap_or(SORT_PRESETS[0].label)
}
