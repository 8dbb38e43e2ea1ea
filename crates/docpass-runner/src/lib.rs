//! Command-backed collaborators for the docpass orchestrator.
//!
//! Discovers documentation packages on disk, selects them by glob, runs the
//! configured renderer and spell checker per package and parses their output
//! into the diagnostics the core aggregates.

pub mod builder;
pub mod catalog;
pub mod command;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod filter;
pub mod process;

pub use builder::CommandDocsBuilder;
pub use catalog::{check_generated_outputs, FsInventoryProbe, PackageCatalog};
pub use command::{CommandTemplate, TemplateVars};
pub use config::{RunnerConfig, DEFAULT_CONFIG_FILE};
pub use diagnostics::{DiagnosticsParser, DiagnosticsParserConfig};
pub use error::{RunnerError, RunnerResult};
pub use filter::PackageFilter;
pub use process::ProcessOutput;
