//! Multi-pass build control.
//!
//! A run goes through:
//!
//! 1. an optional priority pass over packages that have no published
//!    inventory yet (likely new or changed, so others may depend on them),
//! 2. the main pass,
//! 3. a bounded number of retry passes over packages whose build errors look
//!    like unresolved references into sibling packages.
//!
//! Passes are strictly sequential: the retry set of pass *k + 1* is computed
//! from the results of pass *k*. The cumulative [`ErrorMaps`] are only
//! written here, between pool invocations.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{warn, Instrument};
use uuid::Uuid;

use crate::aggregator::{ErrorMaps, PassErrors};
use crate::builder::{DocsBuilder, InventoryProbe};
use crate::classifier::ErrorClassifier;
use crate::domain::{BuildMode, JobResult, JobSpec, OrchestratorError, PackageId, Result};
use crate::obs;
use crate::pool::WorkerPool;
use crate::reporting;

/// Retry passes allowed after the main pass.
pub const RETRY_PASSES: u8 = 2;

/// Spellcheck-only runs never attempt a content build in their main pass,
/// so references only start resolving in the first retry; they get one more.
pub const SPELLCHECK_ONLY_RETRY_PASSES: u8 = 3;

/// How many passes a run may take and how the first retry is scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassBudget {
    pub retry_passes: u8,
    /// Rebuild every requested package in the first retry pass instead of
    /// only the failed ones.
    pub full_rebuild_on_first_retry: bool,
}

impl PassBudget {
    pub fn for_mode(mode: BuildMode) -> Self {
        match mode {
            BuildMode::SpellcheckOnly => Self {
                retry_passes: SPELLCHECK_ONLY_RETRY_PASSES,
                full_rebuild_on_first_retry: true,
            },
            _ => Self {
                retry_passes: RETRY_PASSES,
                full_rebuild_on_first_retry: false,
            },
        }
    }

    /// Main pass plus retries. The priority pass is not counted.
    pub fn pass_ceiling(&self) -> usize {
        1 + self.retry_passes as usize
    }
}

/// Where the controller is in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    /// Priority and main passes.
    Initial,
    /// The n-th retry pass, starting at 1.
    Retry(u8),
    Done,
}

impl PassState {
    /// State after the current pass, given whether its results leave any
    /// retry-eligible package.
    pub fn next(self, budget: &PassBudget, retry_pending: bool) -> PassState {
        if !retry_pending {
            return PassState::Done;
        }
        match self {
            PassState::Initial if budget.retry_passes >= 1 => PassState::Retry(1),
            PassState::Retry(n) if n < budget.retry_passes => PassState::Retry(n + 1),
            _ => PassState::Done,
        }
    }
}

/// Which pass a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassKind {
    Priority,
    Main,
    Retry(u8),
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassKind::Priority => f.write_str("priority"),
            PassKind::Main => f.write_str("main"),
            PassKind::Retry(n) => write!(f, "retry-{}", n),
        }
    }
}

/// What happened in one pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassRecord {
    pub kind: PassKind,
    pub mode: BuildMode,
    pub packages: Vec<PackageId>,
    /// Results of jobs that reported errors, in dispatch order.
    pub failed: Vec<JobResult>,
    pub duration_ms: u64,
}

/// Parameters of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    /// Packages to build, in request order.
    pub packages: Vec<PackageId>,
    pub mode: BuildMode,
    /// Skip retry passes entirely.
    pub one_pass_only: bool,
    pub verbose: bool,
}

impl RunRequest {
    pub fn new(packages: Vec<PackageId>) -> Self {
        Self {
            packages,
            mode: BuildMode::Full,
            one_pass_only: false,
            verbose: false,
        }
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn one_pass_only(mut self, one_pass_only: bool) -> Self {
        self.one_pass_only = one_pass_only;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Final state of a run. The error maps are no longer mutated.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    pub mode: BuildMode,
    pub priority_packages: Vec<PackageId>,
    pub errors: ErrorMaps,
    pub passes: Vec<PassRecord>,
}

impl RunOutcome {
    pub fn success(&self) -> bool {
        self.errors.is_clean()
    }

    pub fn exit_code(&self) -> i32 {
        reporting::exit_code(&self.errors)
    }

    /// Passes counted against the budget (main and retries).
    pub fn budgeted_passes(&self) -> usize {
        self.passes
            .iter()
            .filter(|p| p.kind != PassKind::Priority)
            .count()
    }
}

/// Drives a run through its passes.
pub struct PassController {
    pool: WorkerPool,
    builder: Arc<dyn DocsBuilder>,
    inventory: Arc<dyn InventoryProbe>,
    classifier: ErrorClassifier,
}

impl PassController {
    pub fn new(
        pool: WorkerPool,
        builder: Arc<dyn DocsBuilder>,
        inventory: Arc<dyn InventoryProbe>,
    ) -> Self {
        Self {
            pool,
            builder,
            inventory,
            classifier: ErrorClassifier::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: ErrorClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    /// Split `packages` into `(normal, priority)`, keeping their order.
    /// Priority packages are those without a published inventory.
    pub fn partition(&self, packages: &[PackageId]) -> (Vec<PackageId>, Vec<PackageId>) {
        packages
            .iter()
            .cloned()
            .partition(|p| !self.inventory.missing_inventory(p))
    }

    /// Execute a full run.
    ///
    /// Content and spelling errors never fail this call; they end up in
    /// [`RunOutcome::errors`]. `Err` means the worker pool broke down or the
    /// request itself is invalid.
    pub async fn run(&self, request: &RunRequest) -> Result<RunOutcome> {
        validate(request)?;
        let run_id = Uuid::new_v4().to_string();
        let span = obs::run_span(&run_id);
        self.execute(run_id, request).instrument(span).await
    }

    async fn execute(&self, run_id: String, request: &RunRequest) -> Result<RunOutcome> {
        obs::emit_run_started(
            &run_id,
            request.packages.len(),
            &format!("{:?}", request.mode),
            self.pool.concurrency(),
        );

        self.clean_all(&request.packages).await;

        let mut errors = ErrorMaps::new();
        let mut passes = Vec::new();

        let (normal, priority) = self.partition(&request.packages);
        if !priority.is_empty() {
            let pass = self
                .run_pass(PassKind::Priority, &priority, request, request.mode, &mut passes)
                .await?;
            errors.merge(pass);
        }

        // One missing inventory means the others are likely still valid.
        // More than one suggests broad drift, so everything is rebuilt.
        let mut scope = if priority.len() > 1 {
            request.packages.clone()
        } else {
            normal
        };
        let mut last = self
            .run_pass(PassKind::Main, &scope, request, request.mode, &mut passes)
            .await?;
        errors.merge(last.clone());

        let budget = PassBudget::for_mode(request.mode);
        let mut state = PassState::Initial;
        while !request.one_pass_only {
            let after = passes
                .last()
                .map_or_else(|| PassKind::Main.to_string(), |p| p.kind.to_string());
            let retry_set = self.classifier.retry_set(&scope, &last);
            state = state.next(&budget, !retry_set.is_empty());

            let PassState::Retry(n) = state else {
                if retry_set.is_empty() {
                    obs::emit_no_retry_needed(&after);
                } else {
                    warn!(
                        packages = retry_set.len(),
                        ceiling = budget.pass_ceiling(),
                        "pass budget exhausted, remaining errors are final"
                    );
                }
                break;
            };

            let full_rebuild = n == 1 && budget.full_rebuild_on_first_retry;
            scope = if full_rebuild {
                request.packages.clone()
            } else {
                retry_set
            };
            let kind = PassKind::Retry(n);
            obs::emit_retry_scheduled(
                &kind.to_string(),
                &scope.iter().map(PackageId::to_string).collect::<Vec<_>>(),
                full_rebuild,
            );

            errors.clear(&scope);
            last = self
                .run_pass(kind, &scope, request, request.mode.for_retry(), &mut passes)
                .await?;
            errors.merge(last.clone());
        }

        obs::emit_run_finished(
            &run_id,
            passes.len(),
            errors.total_build_errors(),
            errors.total_spelling_errors(),
            errors.is_clean(),
        );

        Ok(RunOutcome {
            run_id,
            mode: request.mode,
            priority_packages: priority,
            errors,
            passes,
        })
    }

    async fn clean_all(&self, packages: &[PackageId]) {
        for package in packages {
            if let Err(e) = self.builder.clean(package).await {
                obs::emit_clean_failed(package.as_str(), &e);
            }
        }
    }

    async fn run_pass(
        &self,
        kind: PassKind,
        packages: &[PackageId],
        request: &RunRequest,
        mode: BuildMode,
        records: &mut Vec<PassRecord>,
    ) -> Result<PassErrors> {
        if packages.is_empty() {
            return Ok(PassErrors::default());
        }

        let started = Instant::now();
        let label = kind.to_string();
        obs::emit_pass_started(&label, packages.len());

        let mut results = Vec::new();
        if mode.builds_docs() {
            let jobs = packages
                .iter()
                .map(|p| JobSpec::build(p.clone(), request.verbose))
                .collect();
            results.extend(self.pool.run_batch(Arc::clone(&self.builder), jobs).await?);
        }
        if mode.checks_spelling() {
            let jobs = packages
                .iter()
                .map(|p| JobSpec::spellcheck(p.clone(), request.verbose))
                .collect();
            results.extend(self.pool.run_batch(Arc::clone(&self.builder), jobs).await?);
        }

        let pass = PassErrors::collect(&results, mode);
        let failed: Vec<JobResult> = results.into_iter().filter(JobResult::has_errors).collect();
        let duration_ms = started.elapsed().as_millis() as u64;

        let failed_packages: HashSet<&PackageId> =
            pass.build.keys().chain(pass.spelling.keys()).collect();
        obs::emit_pass_finished(&label, failed_packages.len(), duration_ms);

        records.push(PassRecord {
            kind,
            mode,
            packages: packages.to_vec(),
            failed,
            duration_ms,
        });
        Ok(pass)
    }
}

fn validate(request: &RunRequest) -> Result<()> {
    let mut seen = HashSet::new();
    for package in &request.packages {
        if !seen.insert(package) {
            return Err(OrchestratorError::InvalidRequest(format!(
                "package {} requested more than once",
                package
            )));
        }
    }
    Ok(())
}
