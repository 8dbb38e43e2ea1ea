//! Jobs dispatched to the documentation builder and their results.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::domain::diagnostic::{BuildError, SpellingError};
use crate::domain::package::PackageId;

/// What a run is asked to do for each package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    /// Build documentation, then spell-check it.
    #[default]
    Full,
    /// Only build documentation.
    DocsOnly,
    /// Only spell-check.
    SpellcheckOnly,
}

impl BuildMode {
    /// Map the two CLI toggles onto a mode. Both at once is rejected.
    pub fn from_flags(docs_only: bool, spellcheck_only: bool) -> Option<Self> {
        match (docs_only, spellcheck_only) {
            (false, false) => Some(BuildMode::Full),
            (true, false) => Some(BuildMode::DocsOnly),
            (false, true) => Some(BuildMode::SpellcheckOnly),
            (true, true) => None,
        }
    }

    pub fn builds_docs(&self) -> bool {
        !matches!(self, BuildMode::SpellcheckOnly)
    }

    pub fn checks_spelling(&self) -> bool {
        !matches!(self, BuildMode::DocsOnly)
    }

    /// Mode used by retry passes: they always build documentation, and
    /// spell-check unless the run is docs-only.
    pub fn for_retry(&self) -> BuildMode {
        match self {
            BuildMode::DocsOnly => BuildMode::DocsOnly,
            _ => BuildMode::Full,
        }
    }
}

/// Kind of work a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Build,
    SpellCheck,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::Build => f.write_str("build"),
            JobKind::SpellCheck => f.write_str("spellcheck"),
        }
    }
}

/// One unit of work, built fresh for each dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    pub package: PackageId,
    pub kind: JobKind,
    pub verbose: bool,
}

impl JobSpec {
    pub fn build(package: PackageId, verbose: bool) -> Self {
        Self {
            package,
            kind: JobKind::Build,
            verbose,
        }
    }

    pub fn spellcheck(package: PackageId, verbose: bool) -> Self {
        Self {
            package,
            kind: JobKind::SpellCheck,
            verbose,
        }
    }
}

/// What the builder reports back from a documentation build.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub errors: Vec<BuildError>,
    pub log_path: Option<PathBuf>,
    /// The tool failed without producing recognisable diagnostics; `errors`
    /// holds a description of the failure instead.
    pub failed: bool,
}

/// What the builder reports back from a spell check.
#[derive(Debug, Clone, Default)]
pub struct SpellcheckReport {
    pub spelling_errors: Vec<SpellingError>,
    pub build_errors: Vec<BuildError>,
    pub log_path: Option<PathBuf>,
    /// The spell checker failed without producing recognisable diagnostics;
    /// `build_errors` holds a description of the failure instead.
    pub failed: bool,
}

/// Result of one dispatched job, always tied to the package it was run for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub package: PackageId,
    pub kind: JobKind,
    pub build_errors: Vec<BuildError>,
    pub spelling_errors: Vec<SpellingError>,
    pub log_path: Option<PathBuf>,
    /// The job did not run to a normal report: the builder returned `Err`,
    /// timed out, or the tool failed without diagnostics.
    #[serde(default)]
    pub failed: bool,
}

impl JobResult {
    pub fn from_build(spec: &JobSpec, report: BuildReport) -> Self {
        Self {
            package: spec.package.clone(),
            kind: spec.kind,
            build_errors: report.errors,
            spelling_errors: Vec::new(),
            log_path: report.log_path,
            failed: report.failed,
        }
    }

    pub fn from_spellcheck(spec: &JobSpec, report: SpellcheckReport) -> Self {
        Self {
            package: spec.package.clone(),
            kind: spec.kind,
            build_errors: report.build_errors,
            spelling_errors: report.spelling_errors,
            log_path: report.log_path,
            failed: report.failed,
        }
    }

    /// A job that could not complete; the failure is reported as a build error
    /// against the package so the pass carries on.
    pub fn failed(spec: &JobSpec, message: impl Into<String>) -> Self {
        Self {
            package: spec.package.clone(),
            kind: spec.kind,
            build_errors: vec![BuildError::new(spec.package.clone(), message)],
            spelling_errors: Vec::new(),
            log_path: None,
            failed: true,
        }
    }

    /// Whether the job failed, judged by the errors its kind produces.
    pub fn has_errors(&self) -> bool {
        match self.kind {
            JobKind::Build => !self.build_errors.is_empty(),
            JobKind::SpellCheck => {
                !self.spelling_errors.is_empty() || !self.build_errors.is_empty()
            }
        }
    }
}
