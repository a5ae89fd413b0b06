use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: availability month queries served.
pub const AVAILABILITY_QUERIES_TOTAL: &str = "docket_availability_queries_total";

/// Counter: bookings accepted (public and staff).
pub const BOOKINGS_CREATED_TOTAL: &str = "docket_bookings_created_total";

/// Counter: booking attempts rejected because the slot was taken.
pub const BOOKING_CONFLICTS_TOTAL: &str = "docket_booking_conflicts_total";

/// Counter: booking attempts rejected at validation.
pub const BOOKING_VALIDATION_FAILURES_TOTAL: &str = "docket_booking_validation_failures_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Counter: external calendar mirror attempts that failed. Sync failures are
/// observability events only, never booking failures.
pub const CALENDAR_SYNC_FAILURES_TOTAL: &str = "docket_calendar_sync_failures_total";

/// Histogram: WAL append (fsync included) duration in seconds.
pub const WAL_APPEND_DURATION_SECONDS: &str = "docket_wal_append_duration_seconds";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
