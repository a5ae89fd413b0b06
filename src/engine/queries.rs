use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::availability::{bookable_day, day_slots, month_occupancy};
use super::{Engine, EngineError};

impl Engine {
    /// Month snapshot for the public availability feed. Read-committed: the
    /// result can be stale as soon as it is returned; the booking path does
    /// its own re-check.
    pub async fn month_snapshot(
        &self,
        year: i32,
        month: u32,
    ) -> Result<AvailabilitySnapshot, EngineError> {
        let mut bad: Vec<&'static str> = Vec::new();
        if !(1..=12).contains(&month) {
            bad.push("month");
        }
        if !(MIN_VALID_YEAR..=MAX_VALID_YEAR).contains(&year) {
            bad.push("year");
        }
        if !bad.is_empty() {
            return Err(EngineError::Validation(bad));
        }
        let (Some(first), Some(next)) = (
            NaiveDate::from_ymd_opt(year, month, 1),
            next_month_start(year, month),
        ) else {
            return Err(EngineError::Validation(vec!["month"]));
        };

        metrics::counter!(observability::AVAILABILITY_QUERIES_TOTAL).increment(1);
        let state = self.state.read().await;
        let bookings = state.bookings_in_range(
            first.and_time(NaiveTime::MIN),
            next.and_time(NaiveTime::MIN),
        );
        let rules = state.active_blackouts();
        Ok(month_occupancy(year, month, bookings, &rules))
    }

    /// Bookable slots for one day. Empty when the day is in the past, a
    /// weekend, fully blocked, or every slot is excluded. `now` is the
    /// caller's business-local civil time.
    pub async fn day_slots(
        &self,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<NaiveTime>, EngineError> {
        let snapshot = self.month_snapshot(date.year(), date.month()).await?;
        if !bookable_day(date, &snapshot, now.date()) {
            return Ok(Vec::new());
        }
        Ok(day_slots(date, &snapshot, now))
    }

    pub async fn get_booking(&self, id: Ulid) -> Option<Booking> {
        self.state.read().await.get_booking(&id).cloned()
    }

    /// Every rule, active or not, for the staff surface.
    pub async fn list_blackout_rules(&self) -> Vec<BlackoutRule> {
        self.state.read().await.blackout_rules().to_vec()
    }

    pub async fn get_blackout_rule(&self, id: Ulid) -> Option<BlackoutRule> {
        self.state.read().await.get_blackout(&id).cloned()
    }
}

fn next_month_start(year: i32, month: u32) -> Option<NaiveDate> {
    if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
}
