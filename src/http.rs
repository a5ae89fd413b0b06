use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use ulid::Ulid;

use crate::auth;
use crate::calendar::{self, CalendarSync};
use crate::config::Config;
use crate::engine::{Engine, EngineError};
use crate::model::*;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub calendar: Arc<dyn CalendarSync>,
    pub config: Arc<Config>,
}

/// Public endpoints are open (the booking widget is served cross-origin);
/// everything under /staff requires the bearer token.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/availability", get(get_availability))
        .route("/availability/day", get(get_day_slots))
        .route("/bookings", post(post_booking))
        .route("/staff/bookings", post(post_staff_booking))
        .route("/staff/bookings/:id/status", patch(patch_booking_status))
        .route("/staff/blackouts", get(get_blackouts).post(post_blackout))
        .route(
            "/staff/blackouts/:id",
            patch(patch_blackout).delete(delete_blackout),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ── Errors ───────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    Engine(EngineError),
    Unauthorized,
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        ApiError::Engine(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            // The conflicting booking's id stays internal; the public body
            // only tells the caller what to do next.
            ApiError::Engine(EngineError::Conflict(_)) => (
                StatusCode::CONFLICT,
                "slot already taken; refresh availability and choose another time".to_string(),
            ),
            ApiError::Engine(e @ EngineError::Validation(_))
            | ApiError::Engine(e @ EngineError::InvalidRule(_))
            | ApiError::Engine(e @ EngineError::LimitExceeded(_)) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Engine(e @ EngineError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, e.to_string())
            }
            ApiError::Engine(EngineError::WalError(e)) => {
                tracing::error!("request failed on WAL: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "staff token required".to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

// ── Public availability ──────────────────────────────────

#[derive(Deserialize)]
struct AvailabilityParams {
    month: u32,
    year: i32,
}

async fn get_availability(
    State(state): State<AppState>,
    Query(params): Query<AvailabilityParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = state.engine.month_snapshot(params.year, params.month).await?;
    Ok(Json(availability_body(&snapshot)))
}

/// Shape the snapshot for the public feed: day and time strings only, no
/// identities, no booking ids.
fn availability_body(snapshot: &AvailabilitySnapshot) -> serde_json::Value {
    let occupied: BTreeMap<String, Vec<String>> = snapshot
        .occupied
        .iter()
        .map(|(day, times)| (fmt_date(*day), times.iter().map(|t| fmt_time(*t)).collect()))
        .collect();
    let fully_blocked: Vec<String> = snapshot.fully_blocked.iter().map(|d| fmt_date(*d)).collect();
    let partial: Vec<serde_json::Value> = snapshot
        .partial_blocks
        .iter()
        .map(|w| {
            json!({
                "date": fmt_date(w.date),
                "startTime": fmt_time(w.start_time),
                "endTime": fmt_time(w.end_time),
                "reason": w.reason,
            })
        })
        .collect();
    json!({
        "occupied": occupied,
        "fullyBlockedDays": fully_blocked,
        "partialBlocks": partial,
    })
}

#[derive(Deserialize)]
struct DayParams {
    date: NaiveDate,
}

async fn get_day_slots(
    State(state): State<AppState>,
    Query(params): Query<DayParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let now = state.config.local_now();
    let slots = state.engine.day_slots(params.date, now).await?;
    let slots: Vec<String> = slots.into_iter().map(fmt_time).collect();
    Ok(Json(json!({ "date": fmt_date(params.date), "slots": slots })))
}

// ── Public booking ───────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct BookingPayload {
    name: Option<String>,
    phone: Option<String>,
    #[serde(rename = "type")]
    matter_type: Option<String>,
    description: Option<String>,
    start_instant: Option<String>,
}

impl BookingPayload {
    fn into_request(self, utc_offset_minutes: i32) -> BookingRequest {
        let start = self
            .start_instant
            .as_deref()
            .and_then(|raw| parse_start_instant(raw, utc_offset_minutes));
        BookingRequest {
            name: self.name,
            phone: self.phone,
            matter_type: self.matter_type,
            description: self.description,
            start,
        }
    }
}

/// Accepts RFC 3339 (converted to office-local time via the configured
/// offset) or a bare civil date-time taken as office-local already.
fn parse_start_instant(raw: &str, utc_offset_minutes: i32) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc() + Duration::minutes(utc_offset_minutes as i64));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()
}

async fn post_booking(
    State(state): State<AppState>,
    Json(payload): Json<BookingPayload>,
) -> Result<Response, ApiError> {
    let request = payload.into_request(state.config.utc_offset_minutes);
    let booking = state.engine.create_public_booking(&request).await?;

    // Mirror after commit, detached: a calendar outage must not block or
    // invalidate the booking.
    calendar::spawn_mirror(state.calendar.clone(), booking.clone());

    let body = json!({
        "bookingId": booking.id.to_string(),
        "startInstant": fmt_datetime(booking.start),
    });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

// ── Staff surface ────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct StaffBookingPayload {
    #[serde(flatten)]
    booking: BookingPayload,
    duration_minutes: Option<i64>,
    status: Option<BookingStatus>,
}

async fn post_staff_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<StaffBookingPayload>,
) -> Result<Response, ApiError> {
    require_staff(&state, &headers)?;
    let duration = payload.duration_minutes.unwrap_or(SLOT_MINUTES);
    let status = payload.status.unwrap_or(BookingStatus::Scheduled);
    let request = payload.booking.into_request(state.config.utc_offset_minutes);
    let booking = state
        .engine
        .create_staff_booking(&request, duration, status)
        .await?;
    calendar::spawn_mirror(state.calendar.clone(), booking.clone());

    let body = json!({
        "bookingId": booking.id.to_string(),
        "startInstant": fmt_datetime(booking.start),
        "durationMinutes": booking.duration_minutes,
        "status": booking.status,
    });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

#[derive(Deserialize)]
struct StatusPayload {
    status: BookingStatus,
}

async fn patch_booking_status(
    State(state): State<AppState>,
    Path(id): Path<Ulid>,
    headers: HeaderMap,
    Json(payload): Json<StatusPayload>,
) -> Result<Json<serde_json::Value>, ApiError> {
    require_staff(&state, &headers)?;
    let booking = state.engine.set_booking_status(id, payload.status).await?;
    Ok(Json(json!({
        "bookingId": booking.id.to_string(),
        "status": booking.status,
    })))
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct BlackoutPayload {
    kind: Option<BlackoutKind>,
    weekday: Option<Weekday>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    start_time: Option<String>,
    end_time: Option<String>,
    reason: Option<String>,
    active: Option<bool>,
}

impl BlackoutPayload {
    fn into_rule(self, id: Ulid, default_active: bool) -> Result<BlackoutRule, ApiError> {
        let Some(kind) = self.kind else {
            return Err(EngineError::Validation(vec!["kind"]).into());
        };
        Ok(BlackoutRule {
            id,
            kind,
            weekday: self.weekday,
            start_date: self.start_date,
            end_date: self.end_date,
            start_time: parse_time_opt(self.start_time.as_deref()),
            end_time: parse_time_opt(self.end_time.as_deref()),
            reason: self.reason,
            active: self.active.unwrap_or(default_active),
        })
    }
}

fn parse_time_opt(raw: Option<&str>) -> Option<NaiveTime> {
    let raw = raw?;
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

async fn get_blackouts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<BlackoutRule>>, ApiError> {
    require_staff(&state, &headers)?;
    Ok(Json(state.engine.list_blackout_rules().await))
}

async fn post_blackout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<BlackoutPayload>,
) -> Result<Response, ApiError> {
    require_staff(&state, &headers)?;
    let rule = payload.into_rule(Ulid::new(), true)?;
    let rule = state.engine.add_blackout_rule(rule).await?;
    Ok((StatusCode::CREATED, Json(rule)).into_response())
}

/// Wholesale replace of the rule's fields, except that an omitted `active`
/// keeps the stored value so editing a deactivated rule does not quietly
/// re-enable it.
async fn patch_blackout(
    State(state): State<AppState>,
    Path(id): Path<Ulid>,
    headers: HeaderMap,
    Json(payload): Json<BlackoutPayload>,
) -> Result<Json<BlackoutRule>, ApiError> {
    require_staff(&state, &headers)?;
    let Some(existing) = state.engine.get_blackout_rule(id).await else {
        return Err(EngineError::NotFound(id).into());
    };
    let rule = payload.into_rule(id, existing.active)?;
    Ok(Json(state.engine.update_blackout_rule(rule).await?))
}

async fn delete_blackout(
    State(state): State<AppState>,
    Path(id): Path<Ulid>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    require_staff(&state, &headers)?;
    state.engine.deactivate_blackout_rule(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn require_staff(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    if auth::staff_authorized(headers, &state.config.staff_token) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

// ── Formatting ───────────────────────────────────────────

fn fmt_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn fmt_time(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

fn fmt_datetime(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}
