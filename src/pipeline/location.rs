//! Cascading city → district → commune selectors and their option lists.

use crate::api::traits::RentalApi;
use crate::api::types::OptionKind;
use crate::models::{FilterOption, LocationId};
use crate::pipeline::filters::{FilterState, LocationLevel};
use std::sync::Arc;
use tracing::{debug, warn};

/// Dropdown contents for the search filters
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    pub cities: Vec<FilterOption>,
    pub districts: Vec<FilterOption>,
    pub communes: Vec<FilterOption>,
    pub categories: Vec<FilterOption>,
    pub features: Vec<FilterOption>,
}

pub struct LocationCascade {
    api: Arc<dyn RentalApi>,
    options: FilterOptions,
}

impl LocationCascade {
    pub fn new(api: Arc<dyn RentalApi>) -> Self {
        Self {
            api,
            options: FilterOptions::default(),
        }
    }

    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    pub fn level_options(&self, level: LocationLevel) -> &[FilterOption] {
        match level {
            LocationLevel::City => &self.options.cities,
            LocationLevel::District => &self.options.districts,
            LocationLevel::Commune => &self.options.communes,
        }
    }

    fn level_options_mut(&mut self, level: LocationLevel) -> &mut Vec<FilterOption> {
        match level {
            LocationLevel::City => &mut self.options.cities,
            LocationLevel::District => &mut self.options.districts,
            LocationLevel::Commune => &mut self.options.communes,
        }
    }

    /// Unscoped lists: cities, categories and features
    pub async fn load_roots(&mut self) {
        let (cities, categories, features) = tokio::join!(
            fetch_or_empty(self.api.as_ref(), OptionKind::Cities),
            fetch_or_empty(self.api.as_ref(), OptionKind::Categories),
            fetch_or_empty(self.api.as_ref(), OptionKind::Features),
        );
        self.options.cities = cities;
        self.options.categories = categories;
        self.options.features = features;
    }

    /// Select a value at `level`. Clears the selections and option lists of
    /// every lower level, then fetches the next level's options scoped to the
    /// new value. Returns false if the selection was rejected (no parent).
    pub async fn select(
        &mut self,
        filters: &mut FilterState,
        level: LocationLevel,
        value: Option<LocationId>,
    ) -> bool {
        if !filters.set_location(level, value) {
            debug!(?level, ?value, "Ignoring location without a parent selection");
            return false;
        }

        let mut below = level.child();
        while let Some(child) = below {
            self.level_options_mut(child).clear();
            below = child.child();
        }

        if let (Some(child), Some(parent_id)) = (level.child(), value) {
            self.load_children(child, parent_id).await;
        }
        true
    }

    /// Refill scoped lists for filters restored from a link, keeping the
    /// selections as they are
    pub async fn restore(&mut self, filters: &FilterState) {
        self.options.districts.clear();
        self.options.communes.clear();
        if let Some(city_id) = filters.city_id {
            self.load_children(LocationLevel::District, city_id).await;
        }
        if let Some(district_id) = filters.district_id {
            self.load_children(LocationLevel::Commune, district_id).await;
        }
    }

    async fn load_children(&mut self, child: LocationLevel, parent_id: LocationId) {
        let kind = match child {
            LocationLevel::District => OptionKind::Districts { city_id: parent_id },
            LocationLevel::Commune => OptionKind::Communes {
                district_id: parent_id,
            },
            LocationLevel::City => return,
        };
        let list = fetch_or_empty(self.api.as_ref(), kind).await;
        *self.level_options_mut(child) = list;
    }

    /// "Commune, District, City", a shorter prefix, or "All Locations"
    pub fn selected_location_text(&self, filters: &FilterState) -> String {
        let levels = [
            LocationLevel::Commune,
            LocationLevel::District,
            LocationLevel::City,
        ];
        let names: Vec<&str> = levels
            .iter()
            .filter_map(|level| {
                let id = filters.location(*level)?;
                Some(name_of(self.level_options(*level), id).unwrap_or("Unknown"))
            })
            .collect();

        if names.is_empty() {
            "All Locations".to_string()
        } else {
            names.join(", ")
        }
    }

    pub fn selected_category_text(&self, filters: &FilterState) -> String {
        filters
            .category_id
            .map(|id| {
                name_of(&self.options.categories, id)
                    .unwrap_or("Unknown")
                    .to_string()
            })
            .unwrap_or_else(|| "All Categories".to_string())
    }
}

fn name_of(options: &[FilterOption], id: i64) -> Option<&str> {
    options.iter().find(|o| o.id == id).map(|o| o.name.as_str())
}

/// Option-list failures leave the dropdown empty instead of failing the page
async fn fetch_or_empty(api: &dyn RentalApi, kind: OptionKind) -> Vec<FilterOption> {
    match api.filter_options(kind).await {
        Ok(list) => {
            debug!(kind = kind.path(), count = list.len(), "Loaded filter options");
            list
        }
        Err(e) => {
            warn!(kind = kind.path(), error = %e, "Failed to load filter options");
            Vec::new()
        }
    }
}
