use std::path::Path;

use anyhow::{Context, bail};
use http::HeaderName;
use indoc::indoc;

use crate::{Config, GateConfig, RateLimitConfig, ServerConfig};

pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref();

    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read configuration file {}", path.display()))?;

    let config: Config =
        toml::from_str(&content).with_context(|| format!("Failed to parse configuration file {}", path.display()))?;

    validate(&config)?;

    for warning in rate_limit_warnings(&config.rate_limit) {
        log::warn!("{warning}");
    }

    Ok(config)
}

pub(crate) fn validate(config: &Config) -> anyhow::Result<()> {
    validate_server(&config.server)?;
    validate_rate_limit(&config.rate_limit)?;
    validate_gate(&config.gate)?;

    Ok(())
}

fn validate_server(config: &ServerConfig) -> anyhow::Result<()> {
    if config.health.enabled {
        validate_route_path("server.health.path", &config.health.path)?;
    }

    Ok(())
}

fn validate_rate_limit(config: &RateLimitConfig) -> anyhow::Result<()> {
    if !config.rate_per_second.is_finite() || config.rate_per_second <= 0.0 {
        bail!(
            "rate_limit.rate_per_second must be a positive number, got {}",
            config.rate_per_second
        );
    }

    if config.burst == 0 {
        bail!("rate_limit.burst must be at least 1");
    }

    if config.sweep_interval.is_zero() {
        bail!("rate_limit.sweep_interval must be greater than zero");
    }

    Ok(())
}

fn validate_gate(config: &GateConfig) -> anyhow::Result<()> {
    validate_route_path("gate.path_prefix", &config.path_prefix)?;

    if config.actions.is_empty() {
        bail!(indoc! {r#"
            No action classes configured. The gate needs at least one action to protect.

            Example configuration:

              [gate]
              actions = ["ai-outreach"]
        "#});
    }

    for (i, action) in config.actions.iter().enumerate() {
        if action.is_empty() {
            bail!("gate.actions must not contain empty names");
        }

        if !action.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            bail!("Action class '{action}' may only contain ASCII letters, digits, '-' and '_'");
        }

        if config.actions[..i].contains(action) {
            bail!("Action class '{action}' is configured more than once");
        }
    }

    for (field, header) in [
        ("organization_header", &config.organization_header),
        ("user_header", &config.user_header),
    ] {
        HeaderName::from_bytes(header.as_bytes())
            .with_context(|| format!("gate.{field} is not a valid HTTP header name: '{header}'"))?;
    }

    if config.organization_header.eq_ignore_ascii_case(&config.user_header) {
        bail!("gate.organization_header and gate.user_header must be different headers");
    }

    Ok(())
}

/// Paths are handed to the router as-is, so they must be absolute and free of route parameters.
fn validate_route_path(field: &str, path: &str) -> anyhow::Result<()> {
    if !path.starts_with('/') {
        bail!("{field} must start with '/', got '{path}'");
    }

    if path.contains(['{', '}']) {
        bail!("{field} must not contain '{{' or '}}', got '{path}'");
    }

    Ok(())
}

fn rate_limit_warnings(config: &RateLimitConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.idle_timeout < config.full_refill() {
        warnings.push(format!(
            "rate_limit.idle_timeout ({:?}) is shorter than the full refill time ({:?}); buckets are kept until they are full again",
            config.idle_timeout,
            config.full_refill()
        ));
    }

    warnings
}
