//! Permit gate configuration structures to map the permit-gate.toml configuration.

#![deny(missing_docs)]

mod gate;
mod health;
mod loader;
mod rate_limit;
mod server;
mod tls;

use std::path::Path;

pub use gate::GateConfig;
pub use health::HealthConfig;
pub use rate_limit::RateLimitConfig;
pub use server::ServerConfig;
pub use tls::TlsServerConfig;

use serde::Deserialize;

/// Main configuration structure for the permit gate.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Token bucket settings shared by every action class.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    /// Which requests are gated and how callers are identified.
    #[serde(default)]
    pub gate: GateConfig,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
        loader::load(path)
    }

    /// Validates rate limit and gate settings.
    pub fn validate(&self) -> anyhow::Result<()> {
        loader::validate(self)
    }
}
