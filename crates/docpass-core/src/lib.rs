//! docpass Core Library
//!
//! Orchestrates multi-pass documentation builds: dispatches build and
//! spell-check jobs to a bounded worker pool, classifies failures that are
//! caused by references into not-yet-built sibling packages, and re-drives
//! those packages until the reference graph settles or the pass budget runs
//! out.

pub mod aggregator;
pub mod builder;
pub mod classifier;
pub mod controller;
pub mod domain;
pub mod fakes;
pub mod obs;
pub mod pool;
pub mod reporting;
pub mod telemetry;

pub use aggregator::{ErrorMaps, PackageErrorCount, PassErrors};
pub use builder::{DocsBuilder, InventoryProbe};
pub use classifier::{ErrorClassifier, DEFAULT_RETRY_SIGNATURES};
pub use controller::{
    PassBudget, PassController, PassKind, PassRecord, PassState, RunOutcome, RunRequest,
    RETRY_PASSES, SPELLCHECK_ONLY_RETRY_PASSES,
};
pub use domain::{
    BuildError, BuildMode, BuildReport, JobKind, JobResult, JobSpec, OrchestratorError,
    PackageId, Result, SpellcheckReport, SpellingError,
};
pub use pool::{resolve_concurrency, WorkerPool};
pub use reporting::{
    exit_code, render_error_details, render_summary_table, write_run_report_json,
    PassSummaryArtifact, RunReportArtifact,
};
pub use obs::run_span;
pub use telemetry::{init_tracing, LogFormat};

/// docpass version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
