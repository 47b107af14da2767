//! Viewing-request booking for a property, and the owner's accept/deny desk.

use crate::api::traits::RentalApi;
use crate::error::{Result, ScoutError, ValidationError};
use crate::models::{
    DenialReason, NewViewingRequest, PropertyId, PropertyStatus, RequestId, ViewingRequest,
    ViewingStatus,
};
use crate::storage::DenialLog;
use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Utc};
use tracing::{info, warn};

/// When viewings may be booked
#[derive(Debug, Clone)]
pub struct ViewingWindow {
    pub max_ahead: Duration,
    pub opens: NaiveTime,
    pub closes: NaiveTime,
}

impl Default for ViewingWindow {
    fn default() -> Self {
        Self {
            max_ahead: Duration::days(90),
            opens: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            closes: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl ViewingWindow {
    /// `slot` carries the requester's local offset, which is what the opening
    /// hours refer to
    pub fn check(
        &self,
        slot: DateTime<FixedOffset>,
        now: DateTime<Utc>,
    ) -> std::result::Result<(), ValidationError> {
        let at = slot.with_timezone(&Utc);
        if at <= now {
            return Err(ValidationError::SlotInPast);
        }
        if at > now + self.max_ahead {
            return Err(ValidationError::SlotTooFarAhead {
                max_days: self.max_ahead.num_days(),
            });
        }
        let time = slot.time();
        if time < self.opens || time > self.closes {
            return Err(ValidationError::OutsideViewingHours {
                open: self.opens.format("%H:%M").to_string(),
                close: self.closes.format("%H:%M").to_string(),
            });
        }
        Ok(())
    }
}

/// What the property page shows in its booking panel
#[derive(Debug, Clone, PartialEq)]
pub enum BookingState {
    /// No request yet (or only denied ones): the form is offered
    None,
    Pending(ViewingRequest),
    Accepted(ViewingRequest),
    /// Latest request was denied; a new one may be made
    Denied(ViewingRequest),
}

impl BookingState {
    pub fn shows_form(&self) -> bool {
        matches!(self, BookingState::None | BookingState::Denied(_))
    }
}

/// Booking panel for one property and the logged-in user
pub struct BookingFlow {
    property_id: PropertyId,
    property_status: PropertyStatus,
    window: ViewingWindow,
    requests: Vec<ViewingRequest>,
}

impl BookingFlow {
    pub fn new(property_id: PropertyId, property_status: PropertyStatus) -> Self {
        Self {
            property_id,
            property_status,
            window: ViewingWindow::default(),
            requests: Vec::new(),
        }
    }

    pub fn with_window(mut self, window: ViewingWindow) -> Self {
        self.window = window;
        self
    }

    pub fn property_id(&self) -> PropertyId {
        self.property_id
    }

    /// Re-read the user's requests; this is how owner decisions show up
    pub async fn refresh(&mut self, api: &dyn RentalApi) -> Result<()> {
        if api.current_user().is_none() {
            return Err(ScoutError::AuthRequired);
        }
        let mine = api.my_viewing_requests().await?;
        self.requests = mine
            .into_iter()
            .filter(|r| r.property_id == self.property_id)
            .collect();
        Ok(())
    }

    pub fn active_request(&self) -> Option<&ViewingRequest> {
        self.requests.iter().find(|r| r.status.is_active())
    }

    pub fn state(&self) -> BookingState {
        if let Some(active) = self.active_request() {
            return match active.status {
                ViewingStatus::Accepted => BookingState::Accepted(active.clone()),
                _ => BookingState::Pending(active.clone()),
            };
        }
        self.requests
            .iter()
            .max_by_key(|r| (r.created_at, r.request_id))
            .map(|r| BookingState::Denied(r.clone()))
            .unwrap_or(BookingState::None)
    }

    /// Validate locally, then create a pending request
    pub async fn submit(
        &mut self,
        api: &dyn RentalApi,
        slot: DateTime<FixedOffset>,
        message: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ViewingRequest> {
        if api.current_user().is_none() {
            return Err(ScoutError::AuthRequired);
        }
        if let Some(active) = self.active_request() {
            return Err(ValidationError::ActiveRequestExists {
                request_id: active.request_id,
            }
            .into());
        }
        if self.property_status != PropertyStatus::Available {
            return Err(ValidationError::PropertyUnavailable.into());
        }
        self.window.check(slot, now)?;

        let request = NewViewingRequest {
            property_id: self.property_id,
            requested_time: slot.with_timezone(&Utc),
            message: message
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string),
        };
        let created = api.create_viewing_request(&request).await?;
        info!(
            request_id = created.request_id,
            property_id = self.property_id,
            "Viewing request created"
        );
        self.requests.push(created.clone());
        Ok(created)
    }
}

/// Owner-side list of incoming viewing requests, either across all owned
/// properties or scoped to one
pub struct OwnerDesk {
    denials: DenialLog,
    property_id: Option<PropertyId>,
    requests: Vec<ViewingRequest>,
}

impl OwnerDesk {
    pub fn new(denials: DenialLog) -> Self {
        Self {
            denials,
            property_id: None,
            requests: Vec::new(),
        }
    }

    pub fn for_property(mut self, property_id: PropertyId) -> Self {
        self.property_id = Some(property_id);
        self
    }

    pub fn requests(&self) -> &[ViewingRequest] {
        &self.requests
    }

    pub async fn refresh(&mut self, api: &dyn RentalApi) -> Result<()> {
        self.requests = match self.property_id {
            Some(id) => api.property_viewing_requests(id).await?,
            None => api.owner_viewing_requests().await?,
        };
        Ok(())
    }

    pub async fn accept(&mut self, api: &dyn RentalApi, request_id: RequestId) -> Result<()> {
        api.accept_viewing_request(request_id).await?;
        info!(request_id, "Viewing request accepted");
        self.refresh(api).await
    }

    /// Deny with a reason. The reason is kept only in the local denial log;
    /// failing to write it does not undo the denial.
    pub async fn deny(
        &mut self,
        api: &dyn RentalApi,
        request_id: RequestId,
        reason: &str,
    ) -> Result<Option<DenialReason>> {
        if reason.trim().is_empty() {
            return Err(ValidationError::MissingDenialReason.into());
        }
        api.deny_viewing_request(request_id).await?;
        info!(request_id, "Viewing request denied");

        let recorded = match self.denials.record(request_id, reason).await {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(request_id, error = %e, "Denial reason not saved locally");
                None
            }
        };
        self.refresh(api).await?;
        Ok(recorded)
    }

    pub async fn denial_reason(&self, request_id: RequestId) -> Option<DenialReason> {
        self.denials.get(request_id).await
    }
}
