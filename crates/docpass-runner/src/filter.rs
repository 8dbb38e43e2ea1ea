//! Package selection by glob patterns.

use docpass_core::PackageId;
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::{RunnerError, RunnerResult};

/// Selects packages whose names match any of a set of glob patterns.
///
/// An empty filter selects everything.
#[derive(Debug, Clone)]
pub struct PackageFilter {
    patterns: Vec<String>,
    set: Option<GlobSet>,
}

impl PackageFilter {
    pub fn new(patterns: &[String]) -> RunnerResult<Self> {
        if patterns.is_empty() {
            return Ok(Self::all());
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| RunnerError::InvalidFilter {
                pattern: pattern.clone(),
                detail: e.to_string(),
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|e| RunnerError::InvalidFilter {
            pattern: patterns.join(","),
            detail: e.to_string(),
        })?;

        Ok(Self {
            patterns: patterns.to_vec(),
            set: Some(set),
        })
    }

    pub fn all() -> Self {
        Self {
            patterns: Vec::new(),
            set: None,
        }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn matches(&self, package: &PackageId) -> bool {
        self.set
            .as_ref()
            .map_or(true, |set| set.is_match(package.as_str()))
    }

    /// Matching packages in their original order. Selecting nothing is an error.
    pub fn apply(&self, available: &[PackageId]) -> RunnerResult<Vec<PackageId>> {
        let selected: Vec<PackageId> = available
            .iter()
            .filter(|p| self.matches(p))
            .cloned()
            .collect();
        if selected.is_empty() {
            return Err(RunnerError::NoPackagesSelected {
                patterns: self.patterns.clone(),
            });
        }
        Ok(selected)
    }
}
