// src/telemetry.rs
//! Prometheus metrics. Series are described once so they show up on
//! /metrics even before the first increment.

use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and register series descriptions.
    pub fn init() -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");
        describe_all();
        Self { handle }
    }

    /// Router exposing `/metrics` in Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time registration of every series the pipeline emits.
pub fn describe_all() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("news_processed_total", "Feed items examined by the pipeline.");
        describe_counter!("news_dropped_age_total", "Items dropped for exceeding max age.");
        describe_counter!("duplicates_filtered_total", "Items rejected by the deduper.");
        describe_counter!("candidates_total", "Items that passed scoring and dedup.");
        describe_counter!("feed_fetch_errors_total", "Feed fetch/parse failures.");
        describe_counter!("scrape_failures_total", "Article scrape failures.");
        describe_counter!("primary_ai_calls_total", "Calls attempted against the primary provider.");
        describe_counter!("primary_ai_failures_total", "Primary provider failures.");
        describe_counter!("fallback_summaries_total", "Summaries produced by the fallback chain.");
        describe_counter!("rule_based_summaries_total", "Summaries produced by the rule-based fallback.");
        describe_counter!("messages_sent_total", "Messages delivered to the channel.");
        describe_counter!("publish_skipped_duplicate_total", "Items skipped by the sent-store pre-checks.");
        describe_counter!("store_write_failures_total", "mark_sent failures after a successful send.");
        describe_gauge!("pipeline_last_run_ts", "Unix timestamp of the last completed run.");
        describe_histogram!("pipeline_run_seconds", "Wall-clock duration of a full run.");
    });
}

/// Stamp the last-run gauge; called when a run completes.
pub fn mark_run_complete() {
    let now = chrono::Utc::now().timestamp().max(0) as f64;
    gauge!("pipeline_last_run_ts").set(now);
}
