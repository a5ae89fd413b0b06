use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::model::*;

// ── Availability Algorithm ────────────────────────────────────────

/// Minimum advance notice for same-day bookings, in minutes.
pub const LEAD_TIME_MINUTES: i64 = 60;

/// All calendar days of the given month, in order. Empty for an invalid
/// year/month pair.
pub fn month_days(year: i32, month: u32) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(31);
    let mut day = NaiveDate::from_ymd_opt(year, month, 1);
    while let Some(d) = day
        && d.month() == month
    {
        days.push(d);
        day = d.succ_opt();
    }
    days
}

/// Compute the month snapshot for the public availability feed.
///
/// Occupancy: every non-canceled booking starting inside the month emits its
/// start slot plus its follow-on slots under its calendar day. A booking that
/// runs past the last catalog slot is taken at face value; the office-hours
/// fit is the caller's business assumption, not enforced here.
///
/// Blackouts: full-day rules mark whole days (recurring by weekday, one-off
/// by date range, both intersected with the month); partial rules emit one
/// window tuple per matching day.
///
/// Pure: identical inputs give identical snapshots, and nothing is mutated.
pub fn month_occupancy(
    year: i32,
    month: u32,
    bookings: &[Booking],
    rules: &[BlackoutRule],
) -> AvailabilitySnapshot {
    let mut snapshot = AvailabilitySnapshot::default();
    let days = month_days(year, month);
    let (Some(&first), Some(&last)) = (days.first(), days.last()) else {
        return snapshot;
    };

    for booking in bookings {
        if !booking.status.occupies() {
            continue;
        }
        let day = booking.day();
        if day < first || day > last {
            continue;
        }
        let times = snapshot.occupied.entry(day).or_default();
        for t in booking.occupied_times() {
            if !times.contains(&t) {
                times.push(t);
            }
        }
    }
    for times in snapshot.occupied.values_mut() {
        times.sort();
    }

    for rule in rules {
        if !rule.active {
            continue;
        }
        match rule.kind {
            BlackoutKind::FullDay => {
                for &day in &days {
                    if rule.applies_on(day) {
                        snapshot.fully_blocked.insert(day);
                    }
                }
            }
            BlackoutKind::PartialDay => {
                let (Some(start_time), Some(end_time)) = (rule.start_time, rule.end_time) else {
                    continue; // malformed rule, rejected at creation
                };
                for &day in &days {
                    if rule.applies_on(day) {
                        snapshot.partial_blocks.push(PartialBlock {
                            date: day,
                            start_time,
                            end_time,
                            reason: rule.reason.clone(),
                        });
                    }
                }
            }
        }
    }

    snapshot
}

/// Bookable slots for one day, in catalog order.
///
/// Removes occupied slots, slots inside a partial window (half-open: a slot
/// exactly at the window end survives), and, when `date` is `now`'s civil
/// day, every slot starting less than [`LEAD_TIME_MINUTES`] after `now`.
/// That same rule covers slots already in the past.
///
/// `now` is injected by the caller in business-local time so the function
/// stays deterministic.
pub fn day_slots(
    date: NaiveDate,
    snapshot: &AvailabilitySnapshot,
    now: NaiveDateTime,
) -> Vec<NaiveTime> {
    if snapshot.fully_blocked.contains(&date) {
        return Vec::new();
    }
    let occupied = snapshot.occupied.get(&date);
    let windows: Vec<&PartialBlock> = snapshot
        .partial_blocks
        .iter()
        .filter(|w| w.date == date)
        .collect();
    let cutoff = (date == now.date()).then(|| now + Duration::minutes(LEAD_TIME_MINUTES));

    slot_catalog()
        .into_iter()
        .filter(|&t| {
            if occupied.is_some_and(|times| times.contains(&t)) {
                return false;
            }
            if windows.iter().any(|w| w.start_time <= t && t < w.end_time) {
                return false;
            }
            if let Some(cutoff) = cutoff
                && date.and_time(t) < cutoff
            {
                return false;
            }
            true
        })
        .collect()
}

/// Whether a day can take bookings at all: not in the past, not a weekend,
/// not fully blacked out.
pub fn bookable_day(date: NaiveDate, snapshot: &AvailabilitySnapshot, today: NaiveDate) -> bool {
    if date < today {
        return false;
    }
    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }
    !snapshot.fully_blocked.contains(&date)
}
