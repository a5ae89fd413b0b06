use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use docket::calendar::{CalendarSync, NoopCalendar, WebhookCalendar};
use docket::config::Config;
use docket::engine::Engine;
use docket::http::{self, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    docket::observability::init(config.metrics_port);

    std::fs::create_dir_all(&config.data_dir)?;
    let wal_path = config.data_dir.join("docket.wal");
    let engine = Arc::new(Engine::new(&wal_path, config.compact_threshold)?);

    let calendar: Arc<dyn CalendarSync> = match &config.calendar_url {
        Some(url) => Arc::new(WebhookCalendar::new(url.clone())),
        None => Arc::new(NoopCalendar),
    };

    let addr = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("docket listening on {addr}");
    info!("  data_dir: {}", config.data_dir.display());
    info!("  utc_offset_minutes: {}", config.utc_offset_minutes);
    info!(
        "  calendar sync: {}",
        if config.calendar_url.is_some() { "enabled" } else { "disabled" }
    );
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let state = AppState {
        engine,
        calendar,
        config: Arc::new(config),
    };
    let app = http::router(state);

    // Graceful shutdown: stop accepting on SIGTERM/ctrl-c, drain in-flight requests
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    info!("shutdown signal received");
}
