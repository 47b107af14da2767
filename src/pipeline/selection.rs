//! Page-local multi-select for side-by-side comparison.

use crate::api::traits::RentalApi;
use crate::error::{Result, ValidationError};
use crate::models::{Comparison, PropertyId};
use tracing::{debug, warn};

/// Fewest properties a comparison makes sense for
pub const MIN_COMPARE: usize = 2;

/// Selection is independent of the wishlist. Entering selection mode selects
/// nothing; leaving it clears the selection.
#[derive(Debug, Default)]
pub struct ComparisonSelection {
    active: bool,
    selected: Vec<PropertyId>,
}

impl ComparisonSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn enter(&mut self) {
        self.active = true;
    }

    pub fn leave(&mut self) {
        self.active = false;
        self.selected.clear();
    }

    /// Flip selection mode, returning the new state
    pub fn toggle_mode(&mut self) -> bool {
        if self.active {
            self.leave();
        } else {
            self.enter();
        }
        self.active
    }

    /// Flip membership of one property; returns whether it is now selected.
    /// Enters selection mode if needed.
    pub fn toggle(&mut self, property_id: PropertyId) -> bool {
        self.active = true;
        if let Some(pos) = self.selected.iter().position(|id| *id == property_id) {
            self.selected.remove(pos);
            false
        } else {
            self.selected.push(property_id);
            true
        }
    }

    pub fn contains(&self, property_id: PropertyId) -> bool {
        self.selected.contains(&property_id)
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Selected ids in the order they were picked
    pub fn selected(&self) -> &[PropertyId] {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// The underlying result list changed; an empty list drops the selection
    pub fn on_results_changed(&mut self, result_count: usize) {
        if result_count == 0 {
            self.selected.clear();
        }
    }

    pub fn can_compare(&self) -> bool {
        self.selected.len() >= MIN_COMPARE
    }

    /// Ids to hand to the comparison view, or a validation error below the
    /// threshold
    pub fn compare_ids(&self) -> std::result::Result<Vec<PropertyId>, ValidationError> {
        if !self.can_compare() {
            return Err(ValidationError::TooFewToCompare {
                selected: self.selected.len(),
                required: MIN_COMPARE,
            });
        }
        Ok(self.selected.clone())
    }

    /// Link to the comparison view (`ids` comma separated)
    pub fn compare_link(&self) -> std::result::Result<String, ValidationError> {
        let ids = self.compare_ids()?;
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        Ok(format!("/user/compare?ids={joined}"))
    }
}

/// Comparison view data: loading, error and refetch over a fixed id list
#[derive(Debug, Default)]
pub struct ComparisonView {
    ids: Vec<PropertyId>,
    data: Option<Comparison>,
    loading: bool,
    error: Option<String>,
}

impl ComparisonView {
    /// Ids usually come from `compare_ids` or a parsed link
    pub fn new(ids: Vec<PropertyId>) -> Self {
        Self {
            ids,
            ..Self::default()
        }
    }

    /// Parse the `ids` link parameter; junk entries are skipped
    pub fn from_link_param(raw: &str) -> Self {
        Self::new(
            raw.split(',')
                .filter_map(|part| part.trim().parse().ok())
                .collect(),
        )
    }

    pub fn ids(&self) -> &[PropertyId] {
        &self.ids
    }

    pub fn data(&self) -> Option<&Comparison> {
        self.data.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Fetch (or refetch) the comparison. Fewer than two ids are rejected
    /// without a network call.
    pub async fn load(&mut self, api: &dyn RentalApi) -> Result<()> {
        if self.ids.len() < MIN_COMPARE {
            let err = ValidationError::TooFewToCompare {
                selected: self.ids.len(),
                required: MIN_COMPARE,
            };
            self.error = Some(err.to_string());
            self.data = None;
            return Err(err.into());
        }

        self.loading = true;
        self.error = None;
        let result = api.compare_properties(&self.ids).await;
        self.loading = false;

        match result {
            Ok(data) => {
                debug!(count = data.properties.len(), "Loaded comparison");
                self.data = Some(data);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Comparison failed");
                self.error = Some(e.user_message());
                self.data = None;
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use crate::error::ScoutError;

    #[test]
    fn entering_mode_selects_nothing() {
        let mut selection = ComparisonSelection::new();
        selection.enter();
        assert!(selection.is_active());
        assert!(selection.is_empty());
    }

    #[test]
    fn leaving_mode_clears() {
        let mut selection = ComparisonSelection::new();
        selection.toggle(1);
        selection.toggle(2);
        assert!(!selection.toggle_mode());
        assert!(selection.is_empty());
        assert!(selection.toggle_mode());
        assert!(selection.is_empty());
    }

    #[test]
    fn toggle_flips_membership() {
        let mut selection = ComparisonSelection::new();
        assert!(selection.toggle(4));
        assert!(selection.contains(4));
        assert!(!selection.toggle(4));
        assert!(!selection.contains(4));
    }

    #[test]
    fn compare_requires_two() {
        let mut selection = ComparisonSelection::new();
        selection.toggle(1);
        assert!(!selection.can_compare());
        assert_eq!(
            selection.compare_ids(),
            Err(ValidationError::TooFewToCompare {
                selected: 1,
                required: 2
            })
        );

        selection.toggle(3);
        assert!(selection.can_compare());
        assert_eq!(selection.compare_ids().unwrap(), vec![1, 3]);
        assert_eq!(selection.compare_link().unwrap(), "/user/compare?ids=1,3");
    }

    #[test]
    fn empty_results_drop_selection() {
        let mut selection = ComparisonSelection::new();
        selection.toggle(1);
        selection.on_results_changed(5);
        assert_eq!(selection.len(), 1);
        selection.on_results_changed(0);
        assert!(selection.is_empty());
    }

    #[tokio::test]
    async fn view_rejects_single_id_without_network() {
        let api = FakeApi::new();
        let mut view = ComparisonView::from_link_param("7");
        let err = view.load(&api).await.unwrap_err();
        assert!(matches!(err, ScoutError::Validation(_)));
        assert!(api.calls().is_empty());
        assert!(view.error().is_some());
    }

    #[tokio::test]
    async fn view_loads_comparison() {
        let api = FakeApi::new();
        let mut view = ComparisonView::from_link_param("7, 9,x");
        assert_eq!(view.ids(), &[7, 9]);
        view.load(&api).await.unwrap();
        assert_eq!(view.data().unwrap().properties.len(), 2);
        assert!(!view.is_loading());
        assert_eq!(api.calls(), vec!["compare [7, 9]".to_string()]);
    }
}
