// src/metrics.rs
//! Metric names used across the relay. A recorder is optional; without one
//! every call is a no-op.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;

/// Install the Prometheus recorder with a scrape listener on `addr`.
/// Must run inside the tokio runtime.
pub fn install_exporter(addr: SocketAddr) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .with_context(|| format!("installing prometheus exporter on {addr}"))?;
    ensure_described();
    tracing::info!(%addr, "prometheus exporter listening");
    Ok(())
}

/// One-time metrics registration (so series show up in exporters).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "relay_articles_fetched_total",
            "Articles returned by the news source (after the per-run cap)."
        );
        describe_counter!(
            "relay_articles_filtered_total",
            "Articles whose source is on neither allow-list."
        );
        describe_counter!(
            "relay_articles_seen_total",
            "Articles skipped because the ledger already has them."
        );
        describe_counter!("relay_provider_errors_total", "News source fetch/parse errors.");
        describe_counter!("relay_translate_calls_total", "Calls made to the text model.");
        describe_counter!(
            "relay_translate_rate_limited_total",
            "Text model calls answered with HTTP 429."
        );
        describe_counter!(
            "relay_publish_total",
            "Publish outcomes, labelled by sink and status."
        );
        describe_counter!("relay_ledger_written_total", "Entries appended to the ledger.");
        describe_gauge!("relay_last_run_ts", "Unix ts when the last run finished.");
    });
}

pub fn mark_run_finished() {
    gauge!("relay_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
}
