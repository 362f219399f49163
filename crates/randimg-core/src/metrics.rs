//! Prometheus metrics helpers.
//!
//! # Usage
//!
//! ```rust,ignore
//! use randimg_core::metrics::{init_metrics, start_metrics_server};
//!
//! let handle = init_metrics();
//! start_metrics_server(9091, handle).await?;
//! ```
//!
//! # Metric Naming Conventions
//!
//! - Prefix: `randimg_`
//! - Suffix: unit or type (`_total` for counters)
//! - Labels: `outcome`, `type`, `result` only, to keep cardinality fixed

use axum::{Router, routing::get};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

use crate::device::DeviceType;

/// Initialize the Prometheus metrics recorder.
///
/// # Panics
///
/// Panics if called more than once (the recorder can only be installed once).
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    register_metrics();

    handle
}

/// Like [`init_metrics`] but returns `None` if a recorder is already installed.
pub fn try_init_metrics() -> Option<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder().ok()?;
    register_metrics();
    Some(handle)
}

/// Serve `/metrics` on `port` from a background task.
///
/// The listener is bound before returning so bind failures surface here.
pub async fn start_metrics_server(
    port: u16,
    handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Metrics server listening on http://{}/metrics", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "metrics server stopped");
        }
    });

    Ok(())
}

fn register_metrics() {
    describe_counter!(
        "randimg_requests_total",
        "API requests by outcome (label: outcome)"
    );
    describe_counter!(
        "randimg_images_served_total",
        "Image URLs returned (label: type)"
    );
    describe_counter!(
        "randimg_library_refresh_total",
        "Image library reloads (label: result)"
    );
    describe_gauge!(
        "randimg_library_images",
        "Images currently available (label: type)"
    );
}

// =============================================================================
// Metric Recording Helpers
// =============================================================================

/// Count one API request. `outcome` is e.g. `ok`, `help`, `bad_request`.
#[inline]
pub fn record_request(outcome: &'static str) {
    metrics::counter!("randimg_requests_total", "outcome" => outcome).increment(1);
}

/// Count image URLs handed out for a device type.
#[inline]
pub fn record_served(device: DeviceType, images: usize) {
    metrics::counter!("randimg_images_served_total", "type" => device.as_str())
        .increment(images as u64);
}

/// Count a library reload attempt. `result` is `ok`, `stale` or `error`.
#[inline]
pub fn record_refresh(result: &'static str) {
    metrics::counter!("randimg_library_refresh_total", "result" => result).increment(1);
}

/// Publish the current library size for a device type.
#[inline]
pub fn set_library_size(device: DeviceType, images: usize) {
    metrics::gauge!("randimg_library_images", "type" => device.as_str()).set(images as f64);
}
