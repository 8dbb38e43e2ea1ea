//! Collaborator traits the orchestrator drives.
//!
//! The renderer, the spell checker and the inventory store live outside the
//! core. Production implementations come from `docpass-runner`; tests plug in
//! the fakes from [`crate::fakes`].

use async_trait::async_trait;

use crate::domain::{BuildReport, PackageId, SpellcheckReport};

/// Builds and spell-checks a single documentation package.
///
/// Each call writes a log to a location derivable from the package id and
/// returns its path in the report. An `Err` means the job machinery failed
/// for that package; the worker pool turns it into an error result.
#[async_trait]
pub trait DocsBuilder: Send + Sync {
    /// Render the package's documentation.
    async fn build(&self, package: &PackageId, verbose: bool) -> anyhow::Result<BuildReport>;

    /// Spell-check the package's documentation.
    async fn spellcheck(
        &self,
        package: &PackageId,
        verbose: bool,
    ) -> anyhow::Result<SpellcheckReport>;

    /// Remove previous build output. Idempotent.
    async fn clean(&self, package: &PackageId) -> anyhow::Result<()>;
}

/// Answers whether a package lacks a previously published inventory.
///
/// Packages without one are built first, in their own pass.
pub trait InventoryProbe: Send + Sync {
    fn missing_inventory(&self, package: &PackageId) -> bool;
}
