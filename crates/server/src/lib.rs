//! Permit gate server library.
//!
//! Provides a reusable server function to serve the gate either for the binary, or for the integration tests.

#![deny(missing_docs)]

mod gate;
mod health;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::anyhow;
use axum::{Router, routing::post};
use axum_server::tls_rustls::RustlsConfig;
use config::Config;
use gate::GateLayer;
use rate_limit::RateLimiter;
use tokio::net::TcpListener;

/// Configuration for serving the permit gate.
pub struct ServeConfig {
    /// The socket address (IP and port) the server will bind to
    pub listen_address: SocketAddr,
    /// The deserialized permit-gate TOML configuration.
    pub config: Config,
}

/// Starts and runs the permit gate with the provided configuration.
pub async fn serve(ServeConfig { listen_address, config }: ServeConfig) -> anyhow::Result<()> {
    let limiter = Arc::new(RateLimiter::new(&config.rate_limit)?);
    let mut app = gate_router(&config, limiter.clone())?;

    // Health is added after the gates, so it is never rate limited.
    if config.server.health.enabled {
        if let Some(listen) = config.server.health.listen {
            let health = health::bind_health_endpoint(
                listen,
                config.server.tls.clone(),
                config.server.health.clone(),
                limiter.clone(),
            );

            tokio::spawn(async move {
                if let Err(e) = health.await {
                    log::error!("Health endpoint on {listen} stopped: {e}");
                }
            });
        } else {
            app = app.merge(health::router(&config.server.health, limiter.clone()));
        }
    }

    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(|e| anyhow!("Failed to bind to {listen_address}: {e}"))?;

    let scheme = if config.server.tls.is_some() { "https" } else { "http" };

    for action in &config.gate.actions {
        log::info!(
            "Permits for '{action}' available at: {scheme}://{listen_address}{}",
            config.gate.action_path(action)
        );
    }

    match &config.server.tls {
        Some(tls_config) => {
            let rustls_config = RustlsConfig::from_pem_file(&tls_config.certificate, &tls_config.key)
                .await
                .map_err(|e| anyhow!("Failed to load TLS certificate and key: {e}"))?;

            axum_server::from_tcp_rustls(listener.into_std()?, rustls_config)
                .serve(app.into_make_service())
                .await
                .map_err(|e| anyhow!("Failed to start HTTPS server: {e}"))?;
        }
        None => {
            axum::serve(listener, app)
                .await
                .map_err(|e| anyhow!("Failed to start HTTP server: {e}"))?;
        }
    }

    Ok(())
}

/// One `POST` route per action class, each behind its own gate.
fn gate_router(config: &Config, limiter: Arc<RateLimiter>) -> anyhow::Result<Router> {
    let mut router = Router::new();

    for action in &config.gate.actions {
        let path = config.gate.action_path(action);
        log::debug!("Gating {path} as action class '{action}'");

        let layer = GateLayer::new(limiter.clone(), &config.gate, action)?;
        let route = Router::new().route(&path, post(gate::permit).route_layer(layer));

        router = router.merge(route);
    }

    Ok(router)
}
