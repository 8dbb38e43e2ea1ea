//! Error types for the command-backed runner.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while discovering, selecting or preparing packages.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration in {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("command template '{name}' is empty")]
    EmptyCommand { name: String },

    #[error("invalid package filter '{pattern}': {detail}")]
    InvalidFilter { pattern: String, detail: String },

    #[error("no packages match the filters {patterns:?}")]
    NoPackagesSelected { patterns: Vec<String> },

    #[error("documentation root not found: {0}")]
    DocsRootMissing(PathBuf),

    /// Generated API output exists but is empty: the toctree would reference
    /// documents that are no longer there. A clean build is required.
    #[error("stale generated output for package '{package}': {path} is empty; run a clean build")]
    StaleGeneratedOutput { package: String, path: PathBuf },
}

/// Convenience result alias.
pub type RunnerResult<T> = std::result::Result<T, RunnerError>;

impl RunnerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RunnerError::Io {
            path: path.into(),
            source,
        }
    }
}
