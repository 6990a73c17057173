use std::{borrow::Cow, fmt, io::IsTerminal, net::SocketAddr, path::PathBuf, str::FromStr};

use clap::{Parser, ValueEnum};
use config::Config;
use logforth::filter::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "Permit Gate", version, long_about = concat!("Permit Gate v", env!("CARGO_PKG_VERSION")))]
pub struct Args {
    /// IP address on which the server will listen for incoming connections.
    /// Default: 127.0.0.1:8000
    #[arg(short, long, env = "PERMIT_GATE_LISTEN_ADDRESS")]
    pub listen_address: Option<SocketAddr>,
    /// Path to the TOML configuration file
    #[arg(long, short, env = "PERMIT_GATE_CONFIG_PATH", default_value = "./permit-gate.toml")]
    pub config: PathBuf,
    /// Tokens added to every bucket per second. Overrides the configuration file.
    #[arg(long, env = "PERMIT_GATE_RATE_PER_SECOND")]
    pub rate_per_second: Option<f64>,
    /// Bucket capacity, the largest instantaneous burst. Overrides the configuration file.
    #[arg(long, env = "PERMIT_GATE_BURST")]
    pub burst: Option<u32>,
    /// Set the logging level, this applies to all log events.
    #[arg(long = "log", env = "PERMIT_GATE_LOG", default_value_t = LogLevel::default())]
    pub log_level: LogLevel,
    /// Set the style of log output
    #[arg(long, env = "PERMIT_GATE_LOG_STYLE", default_value_t = LogStyle::default())]
    pub log_style: LogStyle,
}

impl Args {
    /// Loads the configuration file, if present, and applies the command line overrides.
    pub fn config(&self) -> anyhow::Result<Config> {
        let mut config = if self.config.exists() {
            Config::load(&self.config)?
        } else {
            log::debug!(
                "No configuration file at {}, using defaults",
                self.config.display()
            );

            Config::default()
        };

        if let Some(rate_per_second) = self.rate_per_second {
            config.rate_limit.rate_per_second = rate_per_second;
        }

        if let Some(burst) = self.burst {
            config.rate_limit.burst = burst;
        }

        config.validate()?;

        Ok(config)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogStyle {
    /// Colorized text, used as the default with TTY output
    Color,
    /// Standard text, used as the default with non-TTY output
    Text,
    /// JSON objects
    Json,
}

impl Default for LogStyle {
    fn default() -> Self {
        if std::io::stdout().is_terminal() {
            LogStyle::Color
        } else {
            LogStyle::Text
        }
    }
}

impl AsRef<str> for LogStyle {
    fn as_ref(&self) -> &str {
        match self {
            LogStyle::Color => "color",
            LogStyle::Text => "text",
            LogStyle::Json => "json",
        }
    }
}

impl fmt::Display for LogStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub(crate) enum LogLevel {
    /// Disable logging
    Off,
    /// Only log errors
    Error,
    /// Log errors, and warnings
    Warn,
    /// Log errors, warnings, and info messages
    #[default]
    Info,
    /// Log errors, warnings, info, and debug messages
    Debug,
    /// Log errors, warnings, info, debug, and trace messages
    Trace,
}

impl LogLevel {
    pub fn env_filter(self) -> EnvFilter {
        let filter_str = match self {
            LogLevel::Off => Cow::Borrowed("off"),
            // Dependencies stay at 'warn', workspace crates use the selected level.
            level => Cow::Owned(format!(
                "warn,permit_gate={level},server={level},rate_limit={level},config={level}"
            )),
        };

        EnvFilter::from_str(&filter_str).expect("These all are valid env filters.")
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_ref().fmt(f)
    }
}

impl AsRef<str> for LogLevel {
    fn as_ref(&self) -> &str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Args;

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let args = Args::parse_from([
            "permit-gate",
            "--config",
            "/nonexistent/permit-gate.toml",
            "--rate-per-second",
            "2.5",
            "--burst",
            "8",
        ]);

        let config = args.config().unwrap();

        assert_eq!(config.rate_limit.rate_per_second, 2.5);
        assert_eq!(config.rate_limit.burst, 8);
        assert_eq!(config.gate.actions, vec!["ai-outreach".to_string()]);
    }

    #[test]
    fn invalid_override_is_rejected() {
        let args = Args::parse_from(["permit-gate", "--config", "/nonexistent/permit-gate.toml", "--burst", "0"]);

        let error = args.config().unwrap_err().to_string();
        assert_eq!(error, "rate_limit.burst must be at least 1");
    }
}
