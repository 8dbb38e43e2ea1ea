//! Structured lifecycle events for docpass runs.
//!
//! Every event is an `info!` (or `warn!`) line with an `event` field so log
//! pipelines can filter on it. Attach [`run_span`] with `tracing::Instrument`
//! to tag everything a run emits with its id.

use tracing::{info, warn};

/// The span all events of a run are recorded under.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("docpass.run", run_id = %run_id)
}

pub fn emit_run_started(run_id: &str, packages: usize, mode: &str, concurrency: usize) {
    info!(
        event = "run.started",
        run_id = %run_id,
        packages = packages,
        mode = %mode,
        concurrency = concurrency,
    );
}

pub fn emit_pass_started(pass: &str, packages: usize) {
    info!(event = "pass.started", pass = %pass, packages = packages);
}

pub fn emit_pass_finished(pass: &str, failed_packages: usize, duration_ms: u64) {
    info!(
        event = "pass.finished",
        pass = %pass,
        failed_packages = failed_packages,
        duration_ms = duration_ms,
    );
}

/// A retry pass has been scheduled for `packages`.
pub fn emit_retry_scheduled(pass: &str, packages: &[String], full_rebuild: bool) {
    warn!(
        event = "retry.scheduled",
        pass = %pass,
        packages = ?packages,
        full_rebuild = full_rebuild,
    );
}

pub fn emit_no_retry_needed(after_pass: &str) {
    info!(event = "retry.none", after_pass = %after_pass);
}

pub fn emit_run_finished(
    run_id: &str,
    passes: usize,
    build_errors: usize,
    spelling_errors: usize,
    success: bool,
) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        passes = passes,
        build_errors = build_errors,
        spelling_errors = spelling_errors,
        success = success,
    );
}

pub fn emit_clean_failed(package: &str, error: &dyn std::fmt::Display) {
    warn!(event = "package.clean_failed", package = %package, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_inside_run_span() {
        let span = run_span("test-run-id");
        let _entered = span.enter();
        emit_pass_started("main", 3);
        emit_retry_scheduled("retry-1", &["core".to_string()], false);
    }
}
