//! Log output setup for the `docpass` binary.
//!
//! Lines go to stderr so they never interleave with the package list and
//! error report printed on stdout. `RUST_LOG` overrides the level picked on
//! the command line.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    /// Newline-delimited JSON, one object per event.
    Json,
}

impl LogFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Filter honouring `RUST_LOG`, falling back to `default_level`.
pub fn log_filter(default_level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level.as_str()))
}

fn output_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    match format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init_tracing(format: LogFormat, level: Level) -> bool {
    tracing_subscriber::registry()
        .with(output_layer(format))
        .with(log_filter(level))
        .try_init()
        .is_ok()
}
