// src/monitor.rs
//! Optional monitoring HTTP surface: `/health` and `/metrics`. Enabled with
//! ENABLE_HTTP_MONITORING=true; runs alongside the pipeline so schedulers
//! and uptime probes can watch a long-lived deployment.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::json;

use crate::telemetry::Metrics;

/// Health snapshot shared between the pipeline and the HTTP surface.
#[derive(Debug, Default)]
pub struct HealthState {
    pub healthy: AtomicBool,
    pub last_run_unix: AtomicI64,
}

impl HealthState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            healthy: AtomicBool::new(true),
            last_run_unix: AtomicI64::new(0),
        })
    }

    pub fn mark_run(&self) {
        self.healthy.store(true, Ordering::Relaxed);
        self.last_run_unix
            .store(chrono::Utc::now().timestamp(), Ordering::Relaxed);
    }

    pub fn mark_error(&self) {
        self.healthy.store(false, Ordering::Relaxed);
    }
}

/// Spawn the monitoring server on `port`. Returns immediately; the server
/// lives until the process exits.
pub fn spawn(metrics: &Metrics, health: Arc<HealthState>, port: u16) {
    let app: Router = Router::new()
        .route(
            "/health",
            get(move || {
                let health = Arc::clone(&health);
                async move {
                    let healthy = health.healthy.load(Ordering::Relaxed);
                    let last_run = health.last_run_unix.load(Ordering::Relaxed);
                    Json(json!({
                        "status": if healthy { "ok" } else { "error" },
                        "last_run_unix": last_run,
                    }))
                }
            }),
        )
        .merge(metrics.router());

    tokio::spawn(async move {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        tracing::info!(%addr, "monitoring server listening");
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => {
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::warn!(error = ?e, "monitoring server error");
                }
            }
            Err(e) => tracing::warn!(error = ?e, port, "monitoring server failed to bind"),
        }
    });
}
