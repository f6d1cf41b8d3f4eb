//! Tracing subscriber setup for the `pim` binary.
//!
//! `PIM_LOG` takes an `EnvFilter` directive (default `warn`); setting
//! `PIM_LOG_FORMAT=json` switches to one JSON object per event. Logs go to
//! stderr so they never mix with command output.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const ENV_LOG: &str = "PIM_LOG";
pub const ENV_LOG_FORMAT: &str = "PIM_LOG_FORMAT";
const DEFAULT_DIRECTIVE: &str = "warn";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Text,
        }
    }
}

fn filter_from(value: Option<&str>) -> EnvFilter {
    let directive = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_DIRECTIVE);
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Install the global subscriber. Safe to call once per process; later
/// calls are ignored.
pub fn init() {
    let filter = filter_from(std::env::var(ENV_LOG).ok().as_deref());
    let format = LogFormat::from_env_value(std::env::var(ENV_LOG_FORMAT).ok().as_deref());

    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };
    if let Err(err) = result {
        tracing::debug!(error = %err, "tracing subscriber already installed");
    }
}
