use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use ulid::Ulid;

use super::*;
use crate::model::*;

fn test_wal_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join("docket_test_engine");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    let _ = std::fs::remove_file(&path);
    path
}

fn engine(name: &str) -> Engine {
    Engine::new(&test_wal_path(name), 1000).unwrap()
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
    date(day).and_time(time(h, m))
}

fn request(day: u32, h: u32, m: u32) -> BookingRequest {
    BookingRequest {
        name: Some("Ada Lovelace".into()),
        phone: Some("555-0100".into()),
        matter_type: Some("family".into()),
        description: Some("initial consultation".into()),
        start: Some(at(day, h, m)),
    }
}

fn wednesday_blackout() -> BlackoutRule {
    BlackoutRule {
        id: Ulid::new(),
        kind: BlackoutKind::FullDay,
        weekday: Some(Weekday::Wed),
        start_date: None,
        end_date: None,
        start_time: None,
        end_time: None,
        reason: Some("court day".into()),
        active: true,
    }
}

// ── Booking transaction ──────────────────────────────────

#[tokio::test]
async fn public_booking_lands_as_pending() {
    let engine = engine("public_pending.wal");
    let booking = engine.create_public_booking(&request(5, 9, 0)).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.duration_minutes, SLOT_MINUTES);
    assert_eq!(booking.start, at(5, 9, 0));
}

#[tokio::test]
async fn same_slot_conflicts_next_slot_succeeds() {
    let engine = engine("conflict_pair.wal");
    engine.create_public_booking(&request(5, 10, 0)).await.unwrap();

    let result = engine.create_public_booking(&request(5, 10, 0)).await;
    assert!(matches!(result, Err(EngineError::Conflict(_))));

    engine.create_public_booking(&request(5, 10, 30)).await.unwrap();
}

#[tokio::test]
async fn canceled_slot_can_be_rebooked() {
    let engine = engine("rebook_canceled.wal");
    let first = engine.create_public_booking(&request(5, 10, 0)).await.unwrap();
    engine
        .set_booking_status(first.id, BookingStatus::Canceled)
        .await
        .unwrap();

    let snap = engine.month_snapshot(2025, 3).await.unwrap();
    assert!(!snap.occupied.contains_key(&date(5)));

    engine.create_public_booking(&request(5, 10, 0)).await.unwrap();
}

#[tokio::test]
async fn validation_error_names_the_fields() {
    let engine = engine("validation.wal");
    let req = BookingRequest {
        name: Some("Ada".into()),
        ..Default::default()
    };
    match engine.create_public_booking(&req).await {
        Err(EngineError::Validation(fields)) => {
            assert_eq!(fields, vec!["phone", "type", "startInstant"]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_submissions_for_one_slot_produce_one_booking() {
    let engine = std::sync::Arc::new(engine("concurrent_slot.wal"));
    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine.create_public_booking(&request(5, 10, 0)).await
        }));
    }
    let mut won = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(EngineError::Conflict(_)) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(won, 1);
    assert_eq!(conflicts, 7);
}

#[tokio::test]
async fn staff_booking_takes_duration_and_status() {
    let engine = engine("staff_booking.wal");
    let booking = engine
        .create_staff_booking(&request(5, 9, 0), 90, BookingStatus::Confirmed)
        .await
        .unwrap();
    assert_eq!(booking.slot_count(), 3);

    // 10:00 is the third occupied slot; a new public request there loses.
    let result = engine.create_public_booking(&request(5, 10, 0)).await;
    assert!(matches!(result, Err(EngineError::Conflict(_))));
    engine.create_public_booking(&request(5, 10, 30)).await.unwrap();
}

#[tokio::test]
async fn staff_booking_rejects_silly_durations() {
    let engine = engine("staff_duration.wal");
    let too_long = engine
        .create_staff_booking(&request(5, 9, 0), 9999, BookingStatus::Scheduled)
        .await;
    assert!(matches!(too_long, Err(EngineError::LimitExceeded(_))));
    let too_short = engine
        .create_staff_booking(&request(5, 9, 0), 10, BookingStatus::Scheduled)
        .await;
    assert!(matches!(too_short, Err(EngineError::LimitExceeded(_))));
}

#[tokio::test]
async fn status_change_on_unknown_booking_fails() {
    let engine = engine("unknown_status.wal");
    let result = engine
        .set_booking_status(Ulid::new(), BookingStatus::Confirmed)
        .await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}

// ── Availability queries ─────────────────────────────────

#[tokio::test]
async fn march_2025_end_to_end() {
    let engine = engine("march_2025.wal");
    engine.add_blackout_rule(wednesday_blackout()).await.unwrap();
    engine
        .create_staff_booking(&request(5, 9, 0), 30, BookingStatus::Confirmed)
        .await
        .unwrap();

    let snap = engine.month_snapshot(2025, 3).await.unwrap();

    let wednesdays: Vec<NaiveDate> = [5, 12, 19, 26].into_iter().map(date).collect();
    assert_eq!(snap.fully_blocked.iter().copied().collect::<Vec<_>>(), wednesdays);
    assert_eq!(snap.occupied[&date(5)], vec![time(9, 0)]);
    assert_eq!(snap.occupied.len(), 1);
}

#[tokio::test]
async fn snapshot_carries_no_identities() {
    let engine = engine("no_pii.wal");
    let booking = engine.create_public_booking(&request(5, 9, 0)).await.unwrap();
    let snap = engine.month_snapshot(2025, 3).await.unwrap();

    // The snapshot type only holds days and times; make sure nothing about
    // the booking beyond its slot is observable.
    assert_eq!(snap.occupied[&date(5)], vec![time(9, 0)]);
    let debug = format!("{snap:?}");
    assert!(!debug.contains("Ada"));
    assert!(!debug.contains("555-0100"));
    assert!(!debug.contains(&booking.id.to_string()));
}

#[tokio::test]
async fn month_snapshot_rejects_bad_arguments() {
    let engine = engine("bad_month.wal");
    match engine.month_snapshot(2025, 13).await {
        Err(EngineError::Validation(fields)) => assert_eq!(fields, vec!["month"]),
        other => panic!("expected validation error, got {other:?}"),
    }
    match engine.month_snapshot(1850, 0).await {
        Err(EngineError::Validation(fields)) => assert_eq!(fields, vec!["month", "year"]),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[tokio::test]
async fn day_slots_empty_for_weekend_past_and_blocked() {
    let engine = engine("day_slots_empty.wal");
    engine.add_blackout_rule(wednesday_blackout()).await.unwrap();
    let now = at(10, 8, 0); // Monday 2025-03-10

    assert!(engine.day_slots(date(15), now).await.unwrap().is_empty()); // Saturday
    assert!(engine.day_slots(date(16), now).await.unwrap().is_empty()); // Sunday
    assert!(engine.day_slots(date(7), now).await.unwrap().is_empty()); // past Friday
    assert!(engine.day_slots(date(12), now).await.unwrap().is_empty()); // Wednesday
    assert_eq!(engine.day_slots(date(11), now).await.unwrap().len(), 17);
}

#[tokio::test]
async fn day_slots_applies_lead_time_today() {
    let engine = engine("day_slots_lead.wal");
    let now = at(11, 8, 31); // Tuesday, 09:30 slot is 59 minutes out
    let slots = engine.day_slots(date(11), now).await.unwrap();
    assert!(!slots.contains(&time(9, 30)));
    assert!(slots.contains(&time(10, 0)));
}

#[tokio::test]
async fn partial_blackout_filters_day_slots() {
    let engine = engine("partial_day.wal");
    engine
        .add_blackout_rule(BlackoutRule {
            id: Ulid::new(),
            kind: BlackoutKind::PartialDay,
            weekday: None,
            start_date: Some(date(11)),
            end_date: None,
            start_time: Some(time(9, 0)),
            end_time: Some(time(10, 30)),
            reason: Some("deposition".into()),
            active: true,
        })
        .await
        .unwrap();

    let now = at(3, 8, 0);
    let slots = engine.day_slots(date(11), now).await.unwrap();
    assert!(!slots.contains(&time(9, 0)));
    assert!(!slots.contains(&time(10, 0)));
    assert!(slots.contains(&time(10, 30))); // half-open window end
    assert!(slots.contains(&time(8, 0)));
}

// ── Blackout rule lifecycle ──────────────────────────────

#[tokio::test]
async fn deactivated_rule_stops_blocking() {
    let engine = engine("deactivate_rule.wal");
    let rule = engine.add_blackout_rule(wednesday_blackout()).await.unwrap();

    let snap = engine.month_snapshot(2025, 3).await.unwrap();
    assert_eq!(snap.fully_blocked.len(), 4);

    engine.deactivate_blackout_rule(rule.id).await.unwrap();
    let snap = engine.month_snapshot(2025, 3).await.unwrap();
    assert!(snap.fully_blocked.is_empty());

    // The rule is kept, just inactive.
    let rules = engine.list_blackout_rules().await;
    assert_eq!(rules.len(), 1);
    assert!(!rules[0].active);
}

#[tokio::test]
async fn update_replaces_rule_fields() {
    let engine = engine("update_rule.wal");
    let mut rule = engine.add_blackout_rule(wednesday_blackout()).await.unwrap();
    rule.weekday = Some(Weekday::Fri);
    engine.update_blackout_rule(rule.clone()).await.unwrap();

    let snap = engine.month_snapshot(2025, 3).await.unwrap();
    let fridays: Vec<NaiveDate> = [7, 14, 21, 28].into_iter().map(date).collect();
    assert_eq!(snap.fully_blocked.iter().copied().collect::<Vec<_>>(), fridays);
}

#[tokio::test]
async fn update_unknown_rule_fails() {
    let engine = engine("update_unknown_rule.wal");
    let result = engine.update_blackout_rule(wednesday_blackout()).await;
    assert!(matches!(result, Err(EngineError::NotFound(_))));
}

#[tokio::test]
async fn malformed_rule_is_rejected() {
    let engine = engine("malformed_rule.wal");
    let mut rule = wednesday_blackout();
    rule.start_date = Some(date(5)); // recurring and one-off at once
    let result = engine.add_blackout_rule(rule).await;
    assert!(matches!(result, Err(EngineError::InvalidRule(_))));
}

// ── Durability ───────────────────────────────────────────

#[tokio::test]
async fn state_survives_restart() {
    let path = test_wal_path("restart.wal");
    let booking_id;
    let rule_id;
    {
        let engine = Engine::new(&path, 1000).unwrap();
        let booking = engine.create_public_booking(&request(5, 9, 0)).await.unwrap();
        engine
            .set_booking_status(booking.id, BookingStatus::Confirmed)
            .await
            .unwrap();
        let rule = engine.add_blackout_rule(wednesday_blackout()).await.unwrap();
        booking_id = booking.id;
        rule_id = rule.id;
    }

    let engine = Engine::new(&path, 1000).unwrap();
    let booking = engine.get_booking(booking_id).await.unwrap();
    assert_eq!(booking.status, BookingStatus::Confirmed);
    assert_eq!(engine.list_blackout_rules().await[0].id, rule_id);

    let snap = engine.month_snapshot(2025, 3).await.unwrap();
    assert_eq!(snap.occupied[&date(5)], vec![time(9, 0)]);
    assert_eq!(snap.fully_blocked.len(), 4);
}

#[tokio::test]
async fn compaction_preserves_state() {
    let path = test_wal_path("compaction.wal");
    {
        // Threshold 1: every append triggers a compaction pass.
        let engine = Engine::new(&path, 1).unwrap();
        let booking = engine.create_public_booking(&request(5, 9, 0)).await.unwrap();
        engine
            .set_booking_status(booking.id, BookingStatus::Canceled)
            .await
            .unwrap();
        engine.create_public_booking(&request(5, 9, 0)).await.unwrap();
    }

    let engine = Engine::new(&path, 1).unwrap();
    let snap = engine.month_snapshot(2025, 3).await.unwrap();
    assert_eq!(snap.occupied[&date(5)], vec![time(9, 0)]);
}
