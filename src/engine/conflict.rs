use chrono::{Datelike, Duration, NaiveDateTime};

use crate::limits::*;
use crate::model::*;

use super::EngineError;

/// Find a non-canceled booking whose occupied span overlaps
/// `[start, start + slots * 30min)`. Spans are half-open, so a booking that
/// begins exactly where the window ends does not conflict. For two
/// single-slot bookings this reduces to "existing start within
/// `[start, start + 30min)`"; for longer bookings it also protects their
/// follow-on slots.
///
/// `bookings` should be pre-narrowed by the store's sorted range lookup
/// (search backwards by the maximum duration to catch long bookings that
/// started earlier); the overlap test here is safe on any slice.
pub(crate) fn conflicting_booking(
    bookings: &[Booking],
    start: NaiveDateTime,
    slots: i64,
) -> Option<&Booking> {
    let end = start + Duration::minutes(slots * SLOT_MINUTES);
    bookings.iter().find(|b| {
        if !b.status.occupies() {
            return false;
        }
        let b_end = b.start + Duration::minutes(b.slot_count() * SLOT_MINUTES);
        b.start < end && start < b_end
    })
}

/// A public booking request with every required field present and parsed.
#[derive(Debug)]
pub(crate) struct ValidRequest {
    pub name: String,
    pub phone: String,
    pub matter_type: String,
    pub description: Option<String>,
    pub start: NaiveDateTime,
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// Validate a raw booking request. Missing or unparseable fields are all
/// enumerated in one `Validation` error so the caller can correct the form
/// in a single round trip; size and range checks come after.
pub(crate) fn validate_request(req: &BookingRequest) -> Result<ValidRequest, EngineError> {
    let mut bad: Vec<&'static str> = Vec::new();
    if !present(&req.name) {
        bad.push("name");
    }
    if !present(&req.phone) {
        bad.push("phone");
    }
    if !present(&req.matter_type) {
        bad.push("type");
    }
    if req.start.is_none() {
        bad.push("startInstant");
    }
    if !bad.is_empty() {
        return Err(EngineError::Validation(bad));
    }
    let (Some(name), Some(phone), Some(matter_type), Some(start)) = (
        req.name.clone(),
        req.phone.clone(),
        req.matter_type.clone(),
        req.start,
    ) else {
        return Err(EngineError::Validation(vec!["startInstant"]));
    };

    validate_start(start)?;
    if name.len() > MAX_NAME_LEN {
        return Err(EngineError::LimitExceeded("name too long"));
    }
    if phone.len() > MAX_PHONE_LEN {
        return Err(EngineError::LimitExceeded("phone too long"));
    }
    if matter_type.len() > MAX_MATTER_TYPE_LEN {
        return Err(EngineError::LimitExceeded("type too long"));
    }
    if req.description.as_deref().is_some_and(|d| d.len() > MAX_DESCRIPTION_LEN) {
        return Err(EngineError::LimitExceeded("description too long"));
    }

    Ok(ValidRequest {
        name,
        phone,
        matter_type,
        description: req.description.clone(),
        start,
    })
}

pub(crate) fn validate_start(start: NaiveDateTime) -> Result<(), EngineError> {
    if !(MIN_VALID_YEAR..=MAX_VALID_YEAR).contains(&start.year()) {
        return Err(EngineError::LimitExceeded("start instant out of range"));
    }
    Ok(())
}

/// Enforce the blackout shape invariant: recurring rules carry a weekday and
/// no dates, one-off rules carry dates and no weekday, and partial rules
/// carry a non-empty time window.
pub(crate) fn validate_rule(rule: &BlackoutRule) -> Result<(), EngineError> {
    match (rule.weekday, rule.start_date) {
        (Some(_), Some(_)) => {
            return Err(EngineError::InvalidRule("recurring rule must not carry a date range"));
        }
        (None, None) => {
            return Err(EngineError::InvalidRule("rule needs a weekday or a start date"));
        }
        _ => {}
    }
    if rule.weekday.is_some() && rule.end_date.is_some() {
        return Err(EngineError::InvalidRule("recurring rule must not carry a date range"));
    }
    if let (Some(start), Some(end)) = (rule.start_date, rule.end_date)
        && end < start
    {
        return Err(EngineError::InvalidRule("end date before start date"));
    }
    match rule.kind {
        BlackoutKind::PartialDay => {
            let (Some(start), Some(end)) = (rule.start_time, rule.end_time) else {
                return Err(EngineError::InvalidRule("partial rule needs a time window"));
            };
            if end <= start {
                return Err(EngineError::InvalidRule("empty time window"));
            }
        }
        BlackoutKind::FullDay => {
            if rule.start_time.is_some() || rule.end_time.is_some() {
                return Err(EngineError::InvalidRule("full-day rule must not carry a time window"));
            }
        }
    }
    if rule.reason.as_deref().is_some_and(|r| r.len() > MAX_REASON_LEN) {
        return Err(EngineError::LimitExceeded("reason too long"));
    }
    Ok(())
}
