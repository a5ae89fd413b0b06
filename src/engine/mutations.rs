use chrono::Duration;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::conflict::{conflicting_booking, validate_request, validate_rule, validate_start};
use super::{Engine, EngineError};

impl Engine {
    /// Validate and persist a public booking request.
    ///
    /// The conflict window is `[start, start + 30min)`: any non-canceled
    /// booking starting inside it wins the slot. Check and insert share one
    /// write-lock hold, so concurrent submissions for the same slot cannot
    /// both pass. Public bookings always land as `Pending`; staff confirm
    /// them out of band.
    pub async fn create_public_booking(&self, req: &BookingRequest) -> Result<Booking, EngineError> {
        let valid = validate_request(req).inspect_err(|_| {
            metrics::counter!(observability::BOOKING_VALIDATION_FAILURES_TOTAL).increment(1);
        })?;

        let booking = Booking {
            id: Ulid::new(),
            name: valid.name,
            phone: valid.phone,
            matter_type: valid.matter_type,
            description: valid.description,
            start: valid.start,
            duration_minutes: SLOT_MINUTES,
            status: BookingStatus::Pending,
        };
        self.insert_checked(booking).await
    }

    /// Staff-initiated booking: caller picks duration and initial status.
    /// The conflict window widens to the booking's full slot span.
    pub async fn create_staff_booking(
        &self,
        req: &BookingRequest,
        duration_minutes: i64,
        status: BookingStatus,
    ) -> Result<Booking, EngineError> {
        let valid = validate_request(req)?;
        if !(SLOT_MINUTES..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
            return Err(EngineError::LimitExceeded("duration out of range"));
        }

        let booking = Booking {
            id: Ulid::new(),
            name: valid.name,
            phone: valid.phone,
            matter_type: valid.matter_type,
            description: valid.description,
            start: valid.start,
            duration_minutes,
            status,
        };
        self.insert_checked(booking).await
    }

    async fn insert_checked(&self, booking: Booking) -> Result<Booking, EngineError> {
        let mut state = self.state.write().await;
        if state.booking_count() >= MAX_BOOKINGS {
            return Err(EngineError::LimitExceeded("too many bookings"));
        }

        // Search backwards by the maximum duration so a long booking that
        // started earlier but spills into the window is still seen.
        let window_end = booking.start + Duration::minutes(booking.slot_count() * SLOT_MINUTES);
        let search_start = booking.start - Duration::minutes(MAX_DURATION_MINUTES);
        let in_window = state.bookings_in_range(search_start, window_end);
        if let Some(existing) = conflicting_booking(in_window, booking.start, booking.slot_count()) {
            metrics::counter!(observability::BOOKING_CONFLICTS_TOTAL).increment(1);
            return Err(EngineError::Conflict(existing.id));
        }

        self.persist_and_apply(&mut state, Event::BookingCreated { booking: booking.clone() })
            .await?;
        metrics::counter!(observability::BOOKINGS_CREATED_TOTAL).increment(1);
        tracing::info!("booking {} created for {}", booking.id, booking.start);
        Ok(booking)
    }

    /// Staff-driven status transition. Canceling releases the occupied slots
    /// because occupancy reads skip canceled bookings; the row itself stays.
    pub async fn set_booking_status(
        &self,
        id: Ulid,
        status: BookingStatus,
    ) -> Result<Booking, EngineError> {
        let mut state = self.state.write().await;
        if state.get_booking(&id).is_none() {
            return Err(EngineError::NotFound(id));
        }
        self.persist_and_apply(&mut state, Event::BookingStatusChanged { id, status })
            .await?;
        state.get_booking(&id).cloned().ok_or(EngineError::NotFound(id))
    }

    pub async fn add_blackout_rule(&self, rule: BlackoutRule) -> Result<BlackoutRule, EngineError> {
        validate_rule(&rule)?;
        if let Some(date) = rule.start_date {
            validate_start(date.and_hms_opt(0, 0, 0).unwrap_or_default())?;
        }
        let mut state = self.state.write().await;
        if state.blackout_count() >= MAX_BLACKOUT_RULES {
            return Err(EngineError::LimitExceeded("too many blackout rules"));
        }
        self.persist_and_apply(&mut state, Event::BlackoutAdded { rule: rule.clone() })
            .await?;
        Ok(rule)
    }

    /// Replace an existing rule wholesale. The id must already exist.
    pub async fn update_blackout_rule(&self, rule: BlackoutRule) -> Result<BlackoutRule, EngineError> {
        validate_rule(&rule)?;
        let mut state = self.state.write().await;
        if state.get_blackout(&rule.id).is_none() {
            return Err(EngineError::NotFound(rule.id));
        }
        self.persist_and_apply(&mut state, Event::BlackoutUpdated { rule: rule.clone() })
            .await?;
        Ok(rule)
    }

    /// Explicit deactivation; rules never expire on their own. Idempotent on
    /// an already-inactive rule.
    pub async fn deactivate_blackout_rule(&self, id: Ulid) -> Result<(), EngineError> {
        let mut state = self.state.write().await;
        if state.get_blackout(&id).is_none() {
            return Err(EngineError::NotFound(id));
        }
        self.persist_and_apply(&mut state, Event::BlackoutDeactivated { id })
            .await
    }
}
