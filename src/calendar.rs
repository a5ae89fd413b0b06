use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::model::Booking;
use crate::observability;

/// Failure to mirror a booking into the external calendar. Logged and
/// counted only; a booking caller never sees this.
#[derive(Debug)]
pub struct SyncError(pub String);

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "calendar sync failed: {}", self.0)
    }
}

impl std::error::Error for SyncError {}

/// External calendar collaborator. One method, best-effort by contract:
/// callers go through [`spawn_mirror`] and never await this for correctness.
#[async_trait]
pub trait CalendarSync: Send + Sync {
    async fn create_remote_event(&self, booking: &Booking) -> Result<String, SyncError>;
}

/// Mirrors bookings to a calendar webhook as a JSON POST. The remote is
/// expected to answer 2xx with `{"eventId": "..."}`.
pub struct WebhookCalendar {
    client: reqwest::Client,
    url: String,
}

impl WebhookCalendar {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl CalendarSync for WebhookCalendar {
    async fn create_remote_event(&self, booking: &Booking) -> Result<String, SyncError> {
        let body = json!({
            "summary": format!("{}: {}", booking.matter_type, booking.name),
            "description": booking.description,
            "phone": booking.phone,
            "start": booking.start.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "durationMinutes": booking.duration_minutes,
        });
        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError(e.to_string()))?;
        if !response.status().is_success() {
            return Err(SyncError(format!("remote answered {}", response.status())));
        }
        let parsed: serde_json::Value =
            response.json().await.map_err(|e| SyncError(e.to_string()))?;
        Ok(parsed
            .get("eventId")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }
}

/// Used when no calendar URL is configured, and in tests.
pub struct NoopCalendar;

#[async_trait]
impl CalendarSync for NoopCalendar {
    async fn create_remote_event(&self, _booking: &Booking) -> Result<String, SyncError> {
        Ok(String::new())
    }
}

/// Fire-and-forget mirror of a committed booking. Runs detached from the
/// request: failure is logged and counted, never propagated, never retried,
/// and never rolls the booking back.
pub fn spawn_mirror(sync: Arc<dyn CalendarSync>, booking: Booking) {
    tokio::spawn(async move {
        match sync.create_remote_event(&booking).await {
            Ok(event_id) => {
                tracing::info!("booking {} mirrored as remote event {event_id:?}", booking.id);
            }
            Err(e) => {
                metrics::counter!(observability::CALENDAR_SYNC_FAILURES_TOTAL).increment(1);
                tracing::warn!("booking {} not mirrored: {e}", booking.id);
            }
        }
    });
}
