//! Domain model for docpass runs.
//!
//! Packages, the errors reported against them, and the jobs dispatched to
//! build or spell-check them.

pub mod diagnostic;
pub mod error;
pub mod job;
pub mod package;

pub use diagnostic::{BuildError, SpellingError};
pub use error::{OrchestratorError, Result};
pub use job::{BuildMode, BuildReport, JobKind, JobResult, JobSpec, SpellcheckReport};
pub use package::PackageId;
