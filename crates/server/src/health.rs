use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::anyhow;
use axum::{Json, Router, routing::get};
use config::{HealthConfig, TlsServerConfig};
use http::StatusCode;
use rate_limit::RateLimiter;

#[derive(Debug, serde::Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub(crate) enum HealthState {
    /// The gate is serving decisions.
    Healthy {
        /// Live token buckets.
        buckets: usize,
    },
}

/// Reports the gate as healthy along with the number of tracked buckets.
async fn health(limiter: Arc<RateLimiter>) -> (StatusCode, Json<HealthState>) {
    let state = HealthState::Healthy {
        buckets: limiter.len(),
    };

    (StatusCode::OK, Json(state))
}

pub(crate) fn router(config: &HealthConfig, limiter: Arc<RateLimiter>) -> Router {
    Router::new().route(&config.path, get(move || health(limiter.clone())))
}

/// Serves the health endpoint on its own listener.
pub(super) async fn bind_health_endpoint(
    addr: SocketAddr,
    tls_config: Option<TlsServerConfig>,
    health_config: HealthConfig,
    limiter: Arc<RateLimiter>,
) -> anyhow::Result<()> {
    let scheme = if tls_config.is_some() { "https" } else { "http" };
    let path = &health_config.path;
    let app = router(&health_config, limiter).into_make_service();

    log::info!("Health check endpoint exposed at {scheme}://{addr}{path}");

    match tls_config {
        Some(tls) => {
            let rustls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.certificate, &tls.key)
                .await
                .map_err(|e| anyhow!("Failed to load TLS certificate and key: {e}"))?;

            axum_server::bind_rustls(addr, rustls_config)
                .serve(app)
                .await
                .map_err(|e| anyhow!("Failed to start HTTPS server in the health endpoint: {e}"))?;
        }
        None => axum_server::bind(addr)
            .serve(app)
            .await
            .map_err(|e| anyhow!("Failed to start HTTP server in the health endpoint: {e}"))?,
    }

    Ok(())
}
