use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use ulid::Ulid;

/// Length of one bookable slot in minutes. Everything in the engine is
/// aligned to this granularity.
pub const SLOT_MINUTES: i64 = 30;

/// The fixed daily slot catalog: 08:00 through 11:30 and 13:30 through 17:30
/// in 30-minute steps, lunch hour excluded. 17 slots per day.
pub fn slot_catalog() -> Vec<NaiveTime> {
    let mut slots = Vec::with_capacity(17);
    push_slot_range(&mut slots, (8, 0), (11, 30));
    push_slot_range(&mut slots, (13, 30), (17, 30));
    slots
}

fn push_slot_range(slots: &mut Vec<NaiveTime>, from: (u32, u32), to: (u32, u32)) {
    let (Some(mut t), Some(last)) = (
        NaiveTime::from_hms_opt(from.0, from.1, 0),
        NaiveTime::from_hms_opt(to.0, to.1, 0),
    ) else {
        return;
    };
    while t <= last {
        slots.push(t);
        t += Duration::minutes(SLOT_MINUTES);
    }
}

/// Booking lifecycle. Only `Canceled` releases the occupied slots; every
/// other status keeps them held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Scheduled,
    Confirmed,
    Pending,
    Completed,
    Canceled,
    Rescheduled,
}

impl BookingStatus {
    pub fn occupies(&self) -> bool {
        !matches!(self, BookingStatus::Canceled)
    }
}

/// A reserved appointment. `start` is business-local civil time and marks the
/// first occupied slot; `duration_minutes` may span several slots.
///
/// Canceled bookings are kept for history and simply drop out of occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Ulid,
    pub name: String,
    pub phone: String,
    pub matter_type: String,
    pub description: Option<String>,
    pub start: NaiveDateTime,
    pub duration_minutes: i64,
    pub status: BookingStatus,
}

impl Booking {
    /// Number of consecutive slots this booking holds: `ceil(duration / 30)`,
    /// at least one.
    pub fn slot_count(&self) -> i64 {
        self.duration_minutes.div_ceil(SLOT_MINUTES).max(1)
    }

    /// Times-of-day occupied by this booking, starting at its start slot.
    /// Slots past the end of the daily catalog are emitted as-is.
    pub fn occupied_times(&self) -> Vec<NaiveTime> {
        (0..self.slot_count())
            .map(|i| self.start.time() + Duration::minutes(i * SLOT_MINUTES))
            .collect()
    }

    pub fn day(&self) -> NaiveDate {
        self.start.date()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlackoutKind {
    /// Blocks every slot of the matching days.
    FullDay,
    /// Blocks only `[start_time, end_time)` on the matching days.
    PartialDay,
}

/// Time the office is unavailable. A rule is either recurring (`weekday` set,
/// no dates) or one-off (`start_date` set, optional `end_date`, no weekday);
/// partial rules additionally carry a time-of-day window.
///
/// Rules never expire on their own. Staff deactivate them explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackoutRule {
    pub id: Ulid,
    pub kind: BlackoutKind,
    pub weekday: Option<Weekday>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub reason: Option<String>,
    pub active: bool,
}

impl BlackoutRule {
    pub fn is_recurring(&self) -> bool {
        self.weekday.is_some()
    }

    /// Whether this rule applies on the given calendar day. A one-off rule
    /// without `end_date` covers exactly its `start_date`.
    pub fn applies_on(&self, date: NaiveDate) -> bool {
        if let Some(weekday) = self.weekday {
            return date.weekday() == weekday;
        }
        match self.start_date {
            Some(start) => start <= date && date <= self.end_date.unwrap_or(start),
            None => false,
        }
    }
}

/// One partial-blackout window on a concrete day, half-open in time:
/// a slot at `start_time` is blocked, a slot at `end_time` is not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialBlock {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub reason: Option<String>,
}

/// Derived month view for the public availability feed. Computed fresh on
/// every request, never persisted, and deliberately free of any identity:
/// only days and times-of-day, no names, phones, or booking ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilitySnapshot {
    /// Calendar day to the sorted times-of-day taken by bookings.
    pub occupied: BTreeMap<NaiveDate, Vec<NaiveTime>>,
    /// Days with no bookable slots at all (set semantics, deduplicated).
    pub fully_blocked: BTreeSet<NaiveDate>,
    /// Per-day partial windows, in rule order.
    pub partial_blocks: Vec<PartialBlock>,
}

/// A raw public booking request before validation. `start` is `None` when
/// the instant was absent or failed to parse.
#[derive(Debug, Clone, Default)]
pub struct BookingRequest {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub matter_type: Option<String>,
    pub description: Option<String>,
    pub start: Option<NaiveDateTime>,
}

/// The event types. This is the WAL record format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    BookingCreated {
        booking: Booking,
    },
    BookingStatusChanged {
        id: Ulid,
        status: BookingStatus,
    },
    BlackoutAdded {
        rule: BlackoutRule,
    },
    BlackoutUpdated {
        rule: BlackoutRule,
    },
    BlackoutDeactivated {
        id: Ulid,
    },
}
