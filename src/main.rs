//! # Nyhedsbro — Binary Entrypoint
//! One-shot pipeline run: Danish RSS in, bilingual Telegram digest out.
//! Meant to be invoked by a scheduler (cron, systemd timer, CI job); the
//! sent-store carries the at-most-once guarantee between invocations.

use tracing_subscriber::EnvFilter;

use nyhedsbro::app;
use nyhedsbro::config::Config;
use nyhedsbro::monitor::{self, HealthState};
use nyhedsbro::telemetry::Metrics;

#[tokio::main]
async fn main() {
    init_tracing();

    let cfg = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = ?e, "configuration error");
            std::process::exit(1);
        }
    };
    tracing::info!(
        mode = ?cfg.bot_mode,
        max_news = cfg.max_news_limit,
        backend = ?cfg.cache_backend,
        "configuration loaded"
    );

    let metrics = Metrics::init();
    let health = HealthState::new();
    if cfg.enable_http_monitoring {
        monitor::spawn(&metrics, health.clone(), cfg.monitoring_port);
    }

    match app::run(&cfg).await {
        Ok(summary) if summary.cancelled => {
            tracing::warn!("run cancelled");
            health.mark_error();
            std::process::exit(130);
        }
        Ok(summary) => {
            health.mark_run();
            tracing::info!(published = summary.published, "done");
        }
        Err(e) => {
            health.mark_error();
            tracing::error!(error = ?e, "run failed");
            std::process::exit(1);
        }
    }
}

/// RUST_LOG wins; DEBUG=true is a compatibility switch for debug level.
fn init_tracing() {
    let default_level = if std::env::var("DEBUG").map(|v| v == "true").unwrap_or(false) {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();
}
