//! Runner configuration.
//!
//! Settings come from a TOML file (`docpass.toml` by default); every field is
//! optional and falls back to the defaults below. Paths are taken as given,
//! relative paths resolve against the working directory.
//!
//! ```toml
//! docs_root = "docs"
//! build_dir = "docs/_build"
//! jobs = 8
//! job_timeout_secs = 1800
//! build_command = ["sphinx-build", "-W", "--keep-going", "-b", "html", "{source_dir}", "{out_dir}"]
//! retry_signatures = ["Error loading providers"]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use docpass_core::PackageId;
use serde::Deserialize;

use crate::error::{RunnerError, RunnerResult};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "docpass.toml";

/// Configuration of the command-backed builder and package catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Directory holding one subdirectory per package.
    pub docs_root: PathBuf,

    /// File whose presence marks a subdirectory of `docs_root` as a package.
    pub marker_file: String,

    /// Root of rendered output.
    pub build_dir: PathBuf,

    /// Root of per-package build and spell-check logs.
    pub log_dir: PathBuf,

    /// Local cache of published inventories, one subdirectory per package.
    pub inventory_dir: PathBuf,

    /// Inventory file name inside a package's inventory directory.
    pub inventory_file: String,

    /// Generated API sources, checked for stale (empty) `_api` directories.
    pub generated_api_dir: Option<PathBuf>,

    /// Renderer invocation; see [`crate::command::CommandTemplate`].
    pub build_command: Vec<String>,

    /// Spell checker invocation.
    pub spellcheck_command: Vec<String>,

    /// Parallel jobs, 0 = one per CPU.
    pub jobs: usize,

    /// Per-job timeout in seconds, 0 = none.
    pub job_timeout_secs: u64,

    /// Extra retry-eligible message fragments on top of the built-in set.
    pub retry_signatures: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            docs_root: PathBuf::from("docs"),
            marker_file: "conf.py".to_string(),
            build_dir: PathBuf::from("docs/_build"),
            log_dir: PathBuf::from("docs/_build/logs"),
            inventory_dir: PathBuf::from("docs/_inventory_cache"),
            inventory_file: "objects.inv".to_string(),
            generated_api_dir: None,
            build_command: [
                "sphinx-build",
                "-W",
                "--keep-going",
                "-b",
                "html",
                "{source_dir}",
                "{out_dir}",
            ]
            .map(String::from)
            .to_vec(),
            spellcheck_command: [
                "sphinx-build",
                "-W",
                "--keep-going",
                "-b",
                "spelling",
                "{source_dir}",
                "{out_dir}",
            ]
            .map(String::from)
            .to_vec(),
            jobs: 0,
            job_timeout_secs: 0,
            retry_signatures: Vec::new(),
        }
    }
}

impl RunnerConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str, origin: &Path) -> RunnerResult<Self> {
        let config: RunnerConfig =
            toml::from_str(content).map_err(|source| RunnerError::ConfigParse {
                path: origin.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file that must exist.
    pub fn load(path: &Path) -> RunnerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RunnerError::io(path, e))?;
        Self::from_toml_str(&content, path)
    }

    /// Load `path` if given, else [`DEFAULT_CONFIG_FILE`] if present, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> RunnerResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> RunnerResult<()> {
        if self.build_command.is_empty() {
            return Err(RunnerError::EmptyCommand {
                name: "build_command".to_string(),
            });
        }
        if self.spellcheck_command.is_empty() {
            return Err(RunnerError::EmptyCommand {
                name: "spellcheck_command".to_string(),
            });
        }
        if self.marker_file.trim().is_empty() {
            return Err(RunnerError::InvalidConfig(
                "marker_file must not be empty".to_string(),
            ));
        }
        if self.inventory_file.trim().is_empty() {
            return Err(RunnerError::InvalidConfig(
                "inventory_file must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }

    pub fn source_dir(&self, package: &PackageId) -> PathBuf {
        self.docs_root.join(package.as_str())
    }

    pub fn docs_output_dir(&self, package: &PackageId) -> PathBuf {
        self.build_dir.join("docs").join(package.as_str())
    }

    pub fn spelling_output_dir(&self, package: &PackageId) -> PathBuf {
        self.build_dir.join("spelling").join(package.as_str())
    }

    pub fn build_log_path(&self, package: &PackageId) -> PathBuf {
        self.log_dir.join(package.as_str()).join("build.log")
    }

    pub fn spelling_log_path(&self, package: &PackageId) -> PathBuf {
        self.log_dir.join(package.as_str()).join("spelling.log")
    }

    pub fn inventory_path(&self, package: &PackageId) -> PathBuf {
        self.inventory_dir
            .join(package.as_str())
            .join(&self.inventory_file)
    }
}
