use chrono::NaiveDateTime;
use ulid::Ulid;

use crate::model::*;

/// In-memory calendar state, rebuilt from the WAL on startup.
///
/// Bookings are kept sorted by start so range queries (month reads, conflict
/// windows) are two binary searches and a slice. Canceled bookings stay in
/// the vector; occupancy filtering happens at read time.
pub struct CalendarState {
    bookings: Vec<Booking>,
    blackouts: Vec<BlackoutRule>,
}

impl Default for CalendarState {
    fn default() -> Self {
        Self::new()
    }
}

impl CalendarState {
    pub fn new() -> Self {
        Self {
            bookings: Vec::new(),
            blackouts: Vec::new(),
        }
    }

    // ── Bookings ─────────────────────────────────────────────

    pub fn booking_count(&self) -> usize {
        self.bookings.len()
    }

    /// Insert maintaining sort order by start.
    pub fn insert_booking(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.start, |b| b.start)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn get_booking(&self, id: &Ulid) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == *id)
    }

    fn set_booking_status(&mut self, id: &Ulid, status: BookingStatus) {
        if let Some(b) = self.bookings.iter_mut().find(|b| b.id == *id) {
            b.status = status;
        }
    }

    /// Bookings whose start falls within `[start, end)`.
    pub fn bookings_in_range(&self, start: NaiveDateTime, end: NaiveDateTime) -> &[Booking] {
        let lo = self.bookings.partition_point(|b| b.start < start);
        let hi = self.bookings.partition_point(|b| b.start < end);
        &self.bookings[lo..hi]
    }

    // ── Blackout rules ───────────────────────────────────────

    pub fn blackout_count(&self) -> usize {
        self.blackouts.len()
    }

    pub fn get_blackout(&self, id: &Ulid) -> Option<&BlackoutRule> {
        self.blackouts.iter().find(|r| r.id == *id)
    }

    pub fn blackout_rules(&self) -> &[BlackoutRule] {
        &self.blackouts
    }

    /// Active rules only, cloned for the pure availability functions.
    pub fn active_blackouts(&self) -> Vec<BlackoutRule> {
        self.blackouts.iter().filter(|r| r.active).cloned().collect()
    }

    // ── Event application ────────────────────────────────────

    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::BookingCreated { booking } => self.insert_booking(booking.clone()),
            Event::BookingStatusChanged { id, status } => self.set_booking_status(id, *status),
            Event::BlackoutAdded { rule } => self.blackouts.push(rule.clone()),
            Event::BlackoutUpdated { rule } => {
                if let Some(existing) = self.blackouts.iter_mut().find(|r| r.id == rule.id) {
                    *existing = rule.clone();
                }
            }
            Event::BlackoutDeactivated { id } => {
                if let Some(rule) = self.blackouts.iter_mut().find(|r| r.id == *id) {
                    rule.active = false;
                }
            }
        }
    }

    /// Minimal event set recreating this state, for WAL compaction. Statuses
    /// and rule edits are already folded into the structs, so one creation
    /// event per row suffices.
    pub fn snapshot_events(&self) -> Vec<Event> {
        let mut events = Vec::with_capacity(self.bookings.len() + self.blackouts.len());
        for booking in &self.bookings {
            events.push(Event::BookingCreated { booking: booking.clone() });
        }
        for rule in &self.blackouts {
            events.push(Event::BlackoutAdded { rule: rule.clone() });
        }
        events
    }
}
