//! In-memory fakes for the collaborator traits (testing only)
//!
//! `ScriptedBuilder` replays per-package error scripts attempt by attempt and
//! records every call; `StaticInventory` answers inventory probes from a fixed
//! set.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::builder::{DocsBuilder, InventoryProbe};
use crate::domain::{
    BuildError, BuildReport, JobKind, PackageId, SpellcheckReport, SpellingError,
};

type Script = Vec<Vec<String>>;

/// A [`DocsBuilder`] that replays scripted outcomes.
///
/// Each script is a list of attempts; attempt `n` of a package uses entry `n`,
/// and the last entry repeats once the script runs out. Unscripted packages
/// build cleanly.
#[derive(Debug, Default)]
pub struct ScriptedBuilder {
    build: HashMap<PackageId, Script>,
    spelling: HashMap<PackageId, Script>,
    spellcheck_build: HashMap<PackageId, Script>,
    failures: HashMap<PackageId, String>,
    crashed_spellchecks: HashMap<PackageId, String>,
    delays: HashMap<PackageId, Duration>,
    attempts: Mutex<HashMap<(JobKind, PackageId), usize>>,
    calls: Mutex<Vec<(JobKind, PackageId)>>,
    cleaned: Mutex<Vec<PackageId>>,
}

fn to_script(attempts: Vec<Vec<&str>>) -> Script {
    attempts
        .into_iter()
        .map(|a| a.into_iter().map(str::to_string).collect())
        .collect()
}

fn pick(script: Option<&Script>, attempt: usize) -> Vec<String> {
    match script {
        Some(s) if !s.is_empty() => s[attempt.min(s.len() - 1)].clone(),
        _ => Vec::new(),
    }
}

impl ScriptedBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build error messages per build attempt.
    pub fn with_build_errors(mut self, package: &str, attempts: Vec<Vec<&str>>) -> Self {
        self.build.insert(PackageId::new(package), to_script(attempts));
        self
    }

    /// Misspelled words per spell-check attempt.
    pub fn with_spelling_errors(mut self, package: &str, attempts: Vec<Vec<&str>>) -> Self {
        self.spelling
            .insert(PackageId::new(package), to_script(attempts));
        self
    }

    /// Build errors the spell checker reports, per spell-check attempt.
    pub fn with_spellcheck_build_errors(
        mut self,
        package: &str,
        attempts: Vec<Vec<&str>>,
    ) -> Self {
        self.spellcheck_build
            .insert(PackageId::new(package), to_script(attempts));
        self
    }

    /// Every job for `package` returns `Err(message)`.
    pub fn with_failure(mut self, package: &str, message: &str) -> Self {
        self.failures
            .insert(PackageId::new(package), message.to_string());
        self
    }

    /// Every spell check of `package` reports a tool failure with no
    /// diagnostics, described by `message`.
    pub fn with_crashed_spellcheck(mut self, package: &str, message: &str) -> Self {
        self.crashed_spellchecks
            .insert(PackageId::new(package), message.to_string());
        self
    }

    /// Every job for `package` sleeps before reporting.
    pub fn with_delay(mut self, package: &str, delay: Duration) -> Self {
        self.delays.insert(PackageId::new(package), delay);
        self
    }

    /// All calls in the order they started.
    pub fn calls(&self) -> Vec<(JobKind, PackageId)> {
        self.calls.lock().unwrap().clone()
    }

    /// Packages built (not spell-checked), in call order.
    pub fn built(&self) -> Vec<PackageId> {
        self.calls_of(JobKind::Build)
    }

    pub fn spellchecked(&self) -> Vec<PackageId> {
        self.calls_of(JobKind::SpellCheck)
    }

    pub fn cleaned(&self) -> Vec<PackageId> {
        self.cleaned.lock().unwrap().clone()
    }

    pub fn attempts(&self, kind: JobKind, package: &str) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .get(&(kind, PackageId::new(package)))
            .copied()
            .unwrap_or(0)
    }

    fn calls_of(&self, kind: JobKind) -> Vec<PackageId> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, p)| p.clone())
            .collect()
    }

    async fn begin(&self, kind: JobKind, package: &PackageId) -> anyhow::Result<usize> {
        let attempt = {
            self.calls.lock().unwrap().push((kind, package.clone()));
            let mut attempts = self.attempts.lock().unwrap();
            let counter = attempts.entry((kind, package.clone())).or_insert(0);
            let attempt = *counter;
            *counter += 1;
            attempt
        };
        if let Some(delay) = self.delays.get(package) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(message) = self.failures.get(package) {
            anyhow::bail!("{}", message);
        }
        Ok(attempt)
    }

    fn log_path(kind: JobKind, package: &PackageId) -> PathBuf {
        PathBuf::from(format!("logs/{}/{}.log", package, kind))
    }
}

#[async_trait]
impl DocsBuilder for ScriptedBuilder {
    async fn build(&self, package: &PackageId, _verbose: bool) -> anyhow::Result<BuildReport> {
        let attempt = self.begin(JobKind::Build, package).await?;
        let errors = pick(self.build.get(package), attempt)
            .into_iter()
            .map(|m| BuildError::new(package.clone(), m))
            .collect();
        Ok(BuildReport {
            errors,
            log_path: Some(Self::log_path(JobKind::Build, package)),
            failed: false,
        })
    }

    async fn spellcheck(
        &self,
        package: &PackageId,
        _verbose: bool,
    ) -> anyhow::Result<SpellcheckReport> {
        let attempt = self.begin(JobKind::SpellCheck, package).await?;
        if let Some(message) = self.crashed_spellchecks.get(package) {
            return Ok(SpellcheckReport {
                build_errors: vec![BuildError::new(package.clone(), message.clone())],
                log_path: Some(Self::log_path(JobKind::SpellCheck, package)),
                failed: true,
                ..SpellcheckReport::default()
            });
        }
        let spelling_errors = pick(self.spelling.get(package), attempt)
            .into_iter()
            .map(|word| {
                SpellingError::new(package.clone(), "Spelling error").with_spelling(word, vec![])
            })
            .collect();
        let build_errors = pick(self.spellcheck_build.get(package), attempt)
            .into_iter()
            .map(|m| BuildError::new(package.clone(), m))
            .collect();
        Ok(SpellcheckReport {
            spelling_errors,
            build_errors,
            log_path: Some(Self::log_path(JobKind::SpellCheck, package)),
            failed: false,
        })
    }

    async fn clean(&self, package: &PackageId) -> anyhow::Result<()> {
        self.cleaned.lock().unwrap().push(package.clone());
        Ok(())
    }
}

/// An [`InventoryProbe`] backed by a fixed set of packages without inventory.
#[derive(Debug, Default, Clone)]
pub struct StaticInventory {
    missing: HashSet<PackageId>,
}

impl StaticInventory {
    /// Every package has an inventory.
    pub fn complete() -> Self {
        Self::default()
    }

    pub fn missing<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            missing: packages
                .into_iter()
                .map(|p| PackageId::new(p.into()))
                .collect(),
        }
    }
}

impl InventoryProbe for StaticInventory {
    fn missing_inventory(&self, package: &PackageId) -> bool {
        self.missing.contains(package)
    }
}
