//! Per-pass and cumulative error maps.
//!
//! [`PassErrors`] collects the results of a single pass; [`ErrorMaps`] is the
//! run's authoritative record, updated only by the pass controller between
//! pool invocations. A package with no entry built cleanly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::{BuildError, BuildMode, JobKind, JobResult, PackageId, SpellingError};

/// Errors produced by one pass, keyed by package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassErrors {
    pub build: BTreeMap<PackageId, Vec<BuildError>>,
    pub spelling: BTreeMap<PackageId, Vec<SpellingError>>,
}

impl PassErrors {
    /// Gather the errors of one pass.
    ///
    /// Build jobs contribute build errors. Spell-check jobs contribute their
    /// spelling errors and, in a spellcheck-only pass, the build errors the
    /// spell checker ran into as well. A spell-check job that failed outright
    /// always contributes its build errors.
    pub fn collect(results: &[JobResult], mode: BuildMode) -> Self {
        let mut pass = PassErrors::default();
        for result in results {
            match result.kind {
                JobKind::Build => {
                    if !result.build_errors.is_empty() {
                        pass.build
                            .entry(result.package.clone())
                            .or_default()
                            .extend(result.build_errors.iter().cloned());
                    }
                }
                JobKind::SpellCheck => {
                    let misspelled = !result.spelling_errors.is_empty();
                    if misspelled {
                        pass.spelling
                            .entry(result.package.clone())
                            .or_default()
                            .extend(result.spelling_errors.iter().cloned());
                    }
                    let keep_build_errors =
                        result.failed || (misspelled && mode == BuildMode::SpellcheckOnly);
                    if keep_build_errors && !result.build_errors.is_empty() {
                        pass.build
                            .entry(result.package.clone())
                            .or_default()
                            .extend(result.build_errors.iter().cloned());
                    }
                }
            }
        }
        pass
    }

    pub fn is_empty(&self) -> bool {
        self.build.is_empty() && self.spelling.is_empty()
    }
}

/// Cumulative per-package errors across all passes of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMaps {
    pub build: BTreeMap<PackageId, Vec<BuildError>>,
    pub spelling: BTreeMap<PackageId, Vec<SpellingError>>,
}

/// Error counts for one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageErrorCount {
    pub package: PackageId,
    pub build_errors: usize,
    pub spelling_errors: usize,
}

impl ErrorMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a pass into the cumulative maps. A package present in the pass
    /// replaces whatever entry it had; absent packages are left untouched.
    pub fn merge(&mut self, pass: PassErrors) {
        for (package, errors) in pass.build {
            if !errors.is_empty() {
                self.build.insert(package, errors);
            }
        }
        for (package, errors) in pass.spelling {
            if !errors.is_empty() {
                self.spelling.insert(package, errors);
            }
        }
    }

    /// Drop every entry for `packages`. Called before a retry dispatch so the
    /// retried packages end up reflecting only their latest attempt.
    pub fn clear(&mut self, packages: &[PackageId]) {
        for package in packages {
            self.build.remove(package);
            self.spelling.remove(package);
        }
    }

    pub fn is_clean(&self) -> bool {
        self.build.is_empty() && self.spelling.is_empty()
    }

    /// Packages with any recorded error, sorted by name.
    pub fn package_names(&self) -> Vec<PackageId> {
        let mut names: Vec<PackageId> = self
            .build
            .keys()
            .chain(self.spelling.keys())
            .cloned()
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn counts(&self) -> Vec<PackageErrorCount> {
        self.package_names()
            .into_iter()
            .map(|package| PackageErrorCount {
                build_errors: self.build.get(&package).map_or(0, Vec::len),
                spelling_errors: self.spelling.get(&package).map_or(0, Vec::len),
                package,
            })
            .collect()
    }

    pub fn total_build_errors(&self) -> usize {
        self.build.values().map(Vec::len).sum()
    }

    pub fn total_spelling_errors(&self) -> usize {
        self.spelling.values().map(Vec::len).sum()
    }
}
