//! Bounded-concurrency execution of build and spell-check jobs.
//!
//! A batch is submitted as a whole and joined as a whole: the pool returns
//! only once every job has produced a result. Results come back in
//! submission order whatever order the jobs finish in.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, instrument, warn};

use crate::builder::DocsBuilder;
use crate::domain::{JobKind, JobResult, JobSpec, OrchestratorError, Result};

/// Number of workers to use for a requested level; `0` means one per CPU.
pub fn resolve_concurrency(requested: usize) -> usize {
    if requested == 0 {
        std::thread::available_parallelism().map_or(1, |n| n.get())
    } else {
        requested
    }
}

/// Executes batches of jobs against a [`DocsBuilder`].
#[derive(Debug, Clone)]
pub struct WorkerPool {
    concurrency: usize,
    job_timeout: Option<Duration>,
}

impl WorkerPool {
    /// A pool running at most `concurrency` jobs at once (`0` = CPU count).
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: resolve_concurrency(concurrency),
            job_timeout: None,
        }
    }

    pub fn sequential() -> Self {
        Self::new(1)
    }

    /// Give up on any single job after `timeout`; the job is reported as failed.
    pub fn with_job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout
    }

    pub fn is_sequential(&self) -> bool {
        self.concurrency <= 1
    }

    /// Run `jobs` and return one result per job, in submission order.
    ///
    /// A job whose builder fails is reported as a result with a build error.
    /// `Err` is returned only when the pool itself breaks down (a task panics
    /// or cannot be scheduled); the run cannot continue after that.
    #[instrument(skip(self, builder, jobs), fields(jobs = jobs.len(), concurrency = self.concurrency))]
    pub async fn run_batch(
        &self,
        builder: Arc<dyn DocsBuilder>,
        jobs: Vec<JobSpec>,
    ) -> Result<Vec<JobResult>> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        if self.is_sequential() {
            let mut results = Vec::with_capacity(jobs.len());
            for spec in jobs {
                let builder = Arc::clone(&builder);
                let timeout = self.job_timeout;
                let handle =
                    tokio::spawn(async move { run_job(builder.as_ref(), &spec, timeout).await });
                results.push(handle.await.map_err(join_error)?);
            }
            return Ok(results);
        }

        let sem = Arc::new(Semaphore::new(self.concurrency));
        let mut join_set = JoinSet::new();

        for (idx, spec) in jobs.iter().cloned().enumerate() {
            let builder = Arc::clone(&builder);
            let sem = Arc::clone(&sem);
            let timeout = self.job_timeout;
            join_set.spawn(async move {
                let _permit = sem
                    .acquire_owned()
                    .await
                    .map_err(|e| OrchestratorError::Dispatch {
                        package: spec.package.to_string(),
                        kind: spec.kind.to_string(),
                        detail: format!("could not acquire worker slot: {e}"),
                    })?;
                let result = run_job(builder.as_ref(), &spec, timeout).await;
                Ok::<(usize, JobResult), OrchestratorError>((idx, result))
            });
        }

        let mut slots: Vec<Option<JobResult>> = vec![None; jobs.len()];
        while let Some(joined) = join_set.join_next().await {
            let (idx, result) = joined.map_err(join_error)??;
            slots[idx] = Some(result);
        }

        jobs.iter()
            .zip(slots)
            .map(|(spec, slot)| {
                slot.ok_or_else(|| OrchestratorError::Dispatch {
                    package: spec.package.to_string(),
                    kind: spec.kind.to_string(),
                    detail: "job produced no result".to_string(),
                })
            })
            .collect()
    }
}

fn join_error(e: tokio::task::JoinError) -> OrchestratorError {
    OrchestratorError::Pool(format!("job task join error: {e}"))
}

async fn run_job(builder: &dyn DocsBuilder, spec: &JobSpec, timeout: Option<Duration>) -> JobResult {
    debug!(package = %spec.package, kind = %spec.kind, "job started");

    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, dispatch(builder, spec)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(package = %spec.package, kind = %spec.kind, timeout = ?limit, "job timed out");
                return JobResult::failed(
                    spec,
                    format!("{} job timed out after {:?}", spec.kind, limit),
                );
            }
        },
        None => dispatch(builder, spec).await,
    };

    match outcome {
        Ok(result) => {
            debug!(
                package = %spec.package,
                kind = %spec.kind,
                build_errors = result.build_errors.len(),
                spelling_errors = result.spelling_errors.len(),
                "job finished"
            );
            result
        }
        Err(e) => {
            warn!(package = %spec.package, kind = %spec.kind, error = %e, "job failed");
            JobResult::failed(spec, format!("{} job failed: {e:#}", spec.kind))
        }
    }
}

async fn dispatch(builder: &dyn DocsBuilder, spec: &JobSpec) -> anyhow::Result<JobResult> {
    match spec.kind {
        JobKind::Build => builder
            .build(&spec.package, spec.verbose)
            .await
            .map(|report| JobResult::from_build(spec, report)),
        JobKind::SpellCheck => builder
            .spellcheck(&spec.package, spec.verbose)
            .await
            .map(|report| JobResult::from_spellcheck(spec, report)),
    }
}
