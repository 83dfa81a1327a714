// SPDX-FileCopyrightText: 2026 Otomo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prometheus metrics recorder installation.
//!
//! Uses the metrics-rs facade with the Prometheus exporter. When
//! `metrics.listen` is configured, a scrape endpoint is served on that
//! address; otherwise the counters stay unrecorded and cost nothing.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

use otomo_config::model::MetricsConfig;
use otomo_core::OtomoError;

/// Install the Prometheus recorder if a scrape address is configured.
///
/// Only one recorder can be installed per process.
pub fn install_metrics(config: &MetricsConfig) -> Result<(), OtomoError> {
    let Some(listen) = config.listen.as_deref() else {
        info!("metrics exporter disabled (set metrics.listen to enable)");
        return Ok(());
    };
    let addr = parse_listen(listen)?;
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| {
            OtomoError::Internal(format!("failed to install Prometheus recorder: {e}"))
        })?;
    info!(%addr, "prometheus metrics exporter listening");
    Ok(())
}

fn parse_listen(value: &str) -> Result<SocketAddr, OtomoError> {
    value.parse().map_err(|e| {
        OtomoError::Config(format!("metrics.listen `{value}` is not a socket address: {e}"))
    })
}
