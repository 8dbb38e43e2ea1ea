//! Multi-pass run behaviour against scripted builders.

use std::sync::Arc;
use std::time::Duration;

use docpass_core::fakes::{ScriptedBuilder, StaticInventory};
use docpass_core::{
    BuildMode, DocsBuilder, ErrorMaps, InventoryProbe, JobKind, PackageId, PassController,
    PassKind, RunOutcome, RunRequest, WorkerPool,
};

fn ids(names: &[&str]) -> Vec<PackageId> {
    names.iter().map(|n| PackageId::new(*n)).collect()
}

fn controller(
    builder: Arc<ScriptedBuilder>,
    inventory: StaticInventory,
    concurrency: usize,
) -> PassController {
    let builder: Arc<dyn DocsBuilder> = builder;
    let inventory: Arc<dyn InventoryProbe> = Arc::new(inventory);
    PassController::new(WorkerPool::new(concurrency), builder, inventory)
}

async fn run(
    builder: Arc<ScriptedBuilder>,
    inventory: StaticInventory,
    request: RunRequest,
) -> RunOutcome {
    controller(builder, inventory, 1)
        .run(&request)
        .await
        .expect("run should not fail")
}

fn build_messages(errors: &ErrorMaps, package: &str) -> Vec<String> {
    errors
        .build
        .get(&PackageId::new(package))
        .map(|errs| errs.iter().map(|e| e.message.clone()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_forward_reference_is_retried_and_terminal_error_kept() {
    let builder = Arc::new(
        ScriptedBuilder::new()
            .with_build_errors("A", vec![vec!["unknown document: B.api"], vec![]])
            .with_build_errors("C", vec![vec!["typo in text"]]),
    );

    let outcome = run(
        builder.clone(),
        StaticInventory::complete(),
        RunRequest::new(ids(&["A", "B", "C"])).with_mode(BuildMode::DocsOnly),
    )
    .await;

    assert_eq!(outcome.passes.len(), 2);
    assert_eq!(outcome.passes[0].kind, PassKind::Main);
    assert_eq!(outcome.passes[1].kind, PassKind::Retry(1));
    assert_eq!(outcome.passes[1].packages, ids(&["A"]));
    assert_eq!(builder.built(), ids(&["A", "B", "C", "A"]));

    assert_eq!(outcome.errors.build.len(), 1);
    assert_eq!(build_messages(&outcome.errors, "C"), vec!["typo in text"]);
    assert!(outcome.errors.spelling.is_empty());
    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test]
async fn test_fixed_package_leaves_no_stale_entry() {
    let builder = Arc::new(
        ScriptedBuilder::new()
            .with_build_errors("A", vec![vec!["undefined label: setup"], vec![]])
            .with_spelling_errors("A", vec![vec!["recieve"], vec![]]),
    );

    let outcome = run(
        builder,
        StaticInventory::complete(),
        RunRequest::new(ids(&["A", "B"])),
    )
    .await;

    assert!(outcome.errors.is_clean());
    assert!(outcome.success());
    assert_eq!(outcome.exit_code(), 0);
}

#[tokio::test]
async fn test_clean_run_is_single_pass() {
    let builder = Arc::new(ScriptedBuilder::new());

    let outcome = run(
        builder.clone(),
        StaticInventory::complete(),
        RunRequest::new(ids(&["A", "B"])),
    )
    .await;

    assert_eq!(outcome.passes.len(), 1);
    assert_eq!(builder.built(), ids(&["A", "B"]));
    assert_eq!(builder.spellchecked(), ids(&["A", "B"]));
    assert!(outcome.success());
}

#[tokio::test]
async fn test_more_than_one_missing_inventory_rebuilds_everything() {
    let builder = Arc::new(ScriptedBuilder::new());
    let packages = ids(&["n1", "p1", "n2", "n3", "p2", "n4", "n5"]);

    let outcome = run(
        builder.clone(),
        StaticInventory::missing(["p1", "p2"]),
        RunRequest::new(packages.clone()).with_mode(BuildMode::DocsOnly),
    )
    .await;

    assert_eq!(outcome.priority_packages, ids(&["p1", "p2"]));
    assert_eq!(outcome.passes[0].kind, PassKind::Priority);
    assert_eq!(outcome.passes[0].packages, ids(&["p1", "p2"]));
    assert_eq!(outcome.passes[1].kind, PassKind::Main);
    assert_eq!(outcome.passes[1].packages.len(), 7);
    assert_eq!(outcome.passes[1].packages, packages);
    assert_eq!(builder.built().len(), 9);
}

#[tokio::test]
async fn test_single_missing_inventory_builds_only_normal_packages_after() {
    let builder = Arc::new(ScriptedBuilder::new());

    let outcome = run(
        builder.clone(),
        StaticInventory::missing(["p1"]),
        RunRequest::new(ids(&["n1", "p1", "n2"])).with_mode(BuildMode::DocsOnly),
    )
    .await;

    assert_eq!(outcome.passes[0].packages, ids(&["p1"]));
    assert_eq!(outcome.passes[1].packages, ids(&["n1", "n2"]));
    assert_eq!(builder.built(), ids(&["p1", "n1", "n2"]));
}

#[tokio::test]
async fn test_priority_errors_survive_main_pass() {
    let builder = Arc::new(
        ScriptedBuilder::new().with_build_errors("p1", vec![vec!["bad directive"]]),
    );

    let outcome = run(
        builder,
        StaticInventory::missing(["p1"]),
        RunRequest::new(ids(&["p1", "n1"])).with_mode(BuildMode::DocsOnly),
    )
    .await;

    assert_eq!(build_messages(&outcome.errors, "p1"), vec!["bad directive"]);
}

#[tokio::test]
async fn test_mutual_references_stop_at_pass_ceiling() {
    let builder = Arc::new(
        ScriptedBuilder::new()
            .with_build_errors("A", vec![vec!["undefined label: b-intro"]])
            .with_build_errors("B", vec![vec!["undefined label: a-intro"]]),
    );

    let outcome = run(
        builder.clone(),
        StaticInventory::complete(),
        RunRequest::new(ids(&["A", "B"])),
    )
    .await;

    assert_eq!(outcome.budgeted_passes(), 3);
    assert_eq!(builder.attempts(JobKind::Build, "A"), 3);
    assert_eq!(outcome.errors.build.len(), 2);
    assert_eq!(outcome.exit_code(), 1);
}

#[tokio::test]
async fn test_spellcheck_only_first_retry_rebuilds_all_and_gets_extra_pass() {
    let builder = Arc::new(
        ScriptedBuilder::new()
            .with_spelling_errors("A", vec![vec!["teh"]])
            .with_spellcheck_build_errors("A", vec![vec!["unknown document: B.index"]])
            .with_build_errors("A", vec![vec!["unknown document: B.index"]]),
    );

    let outcome = run(
        builder.clone(),
        StaticInventory::complete(),
        RunRequest::new(ids(&["A", "B", "C"])).with_mode(BuildMode::SpellcheckOnly),
    )
    .await;

    let kinds: Vec<PassKind> = outcome.passes.iter().map(|p| p.kind).collect();
    assert_eq!(
        kinds,
        vec![
            PassKind::Main,
            PassKind::Retry(1),
            PassKind::Retry(2),
            PassKind::Retry(3)
        ]
    );
    assert_eq!(outcome.passes[0].mode, BuildMode::SpellcheckOnly);
    assert_eq!(outcome.passes[1].packages, ids(&["A", "B", "C"]));
    assert_eq!(outcome.passes[1].mode, BuildMode::Full);
    assert_eq!(outcome.passes[2].packages, ids(&["A"]));
    assert_eq!(outcome.passes[3].packages, ids(&["A"]));
    // The main pass never builds in spellcheck-only mode.
    assert_eq!(builder.attempts(JobKind::Build, "A"), 3);
    assert_eq!(outcome.budgeted_passes(), 4);
}

#[tokio::test]
async fn test_one_pass_only_skips_retries() {
    let builder = Arc::new(
        ScriptedBuilder::new().with_build_errors("A", vec![vec!["unknown document: B"], vec![]]),
    );

    let outcome = run(
        builder.clone(),
        StaticInventory::complete(),
        RunRequest::new(ids(&["A", "B"])).one_pass_only(true),
    )
    .await;

    assert_eq!(outcome.passes.len(), 1);
    assert_eq!(build_messages(&outcome.errors, "A"), vec!["unknown document: B"]);
}

#[tokio::test]
async fn test_packages_are_cleaned_once_before_passes() {
    let builder = Arc::new(
        ScriptedBuilder::new().with_build_errors("B", vec![vec!["undefined label: x"]]),
    );

    run(
        builder.clone(),
        StaticInventory::missing(["A"]),
        RunRequest::new(ids(&["A", "B"])),
    )
    .await;

    assert_eq!(builder.cleaned(), ids(&["A", "B"]));
}

#[tokio::test]
async fn test_builder_failure_is_recorded_not_fatal() {
    let builder = Arc::new(ScriptedBuilder::new().with_failure("A", "renderer exited abnormally"));

    let outcome = run(
        builder,
        StaticInventory::complete(),
        RunRequest::new(ids(&["A", "B"])).with_mode(BuildMode::DocsOnly),
    )
    .await;

    let messages = build_messages(&outcome.errors, "A");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("renderer exited abnormally"));
    assert_eq!(outcome.passes.len(), 1);
}

#[tokio::test]
async fn test_parallelism_does_not_change_outcome() {
    fn scripted() -> Arc<ScriptedBuilder> {
        Arc::new(
            ScriptedBuilder::new()
                .with_delay("A", Duration::from_millis(30))
                .with_build_errors("A", vec![vec!["unknown document: D.api"], vec![]])
                .with_build_errors("B", vec![vec!["undefined label: c", "typo"], vec!["typo"]])
                .with_build_errors("C", vec![vec!["bad indentation"]])
                .with_spelling_errors("D", vec![vec!["recieve", "teh"]])
                .with_delay("E", Duration::from_millis(10)),
        )
    }
    let request = RunRequest::new(ids(&["A", "B", "C", "D", "E"]));
    let inventory = StaticInventory::missing(["E"]);

    let sequential = controller(scripted(), inventory.clone(), 1)
        .run(&request)
        .await
        .expect("sequential run");
    let parallel = controller(scripted(), inventory, 4)
        .run(&request)
        .await
        .expect("parallel run");

    assert_eq!(sequential.errors, parallel.errors);
    assert_eq!(build_messages(&parallel.errors, "B"), vec!["typo"]);
    assert!(!parallel.errors.build.contains_key(&PackageId::new("A")));
}

#[tokio::test]
async fn test_duplicate_request_is_rejected() {
    let builder = Arc::new(ScriptedBuilder::new());
    let result = controller(builder, StaticInventory::complete(), 2)
        .run(&RunRequest::new(ids(&["A", "A"])))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_spellcheck_job_error_fails_the_run() {
    let builder =
        Arc::new(ScriptedBuilder::new().with_failure("A", "spell checker not installed"));

    let outcome = run(
        builder,
        StaticInventory::complete(),
        RunRequest::new(ids(&["A", "B"])).with_mode(BuildMode::SpellcheckOnly),
    )
    .await;

    assert!(!outcome.success());
    assert_eq!(outcome.exit_code(), 1);
    let messages = build_messages(&outcome.errors, "A");
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("spell checker not installed"));
    assert!(outcome.errors.spelling.is_empty());
}

#[tokio::test]
async fn test_spellcheck_timeout_fails_the_run() {
    let builder = Arc::new(ScriptedBuilder::new().with_delay("A", Duration::from_millis(500)));
    let inventory: Arc<dyn InventoryProbe> = Arc::new(StaticInventory::complete());
    let pool = WorkerPool::new(2).with_job_timeout(Duration::from_millis(50));

    let outcome = PassController::new(pool, builder, inventory)
        .run(&RunRequest::new(ids(&["A", "B"])).with_mode(BuildMode::SpellcheckOnly))
        .await
        .expect("run should not fail");

    assert_eq!(outcome.exit_code(), 1);
    assert!(build_messages(&outcome.errors, "A")[0].contains("timed out"));
    assert!(build_messages(&outcome.errors, "B").is_empty());
}

#[tokio::test]
async fn test_spell_checker_crash_without_diagnostics_fails_full_run() {
    let builder = Arc::new(
        ScriptedBuilder::new()
            .with_crashed_spellcheck("A", "spell check failed: exited with code 2"),
    );

    let outcome = run(
        builder.clone(),
        StaticInventory::complete(),
        RunRequest::new(ids(&["A", "B"])),
    )
    .await;

    assert!(!outcome.success());
    assert_eq!(
        build_messages(&outcome.errors, "A"),
        vec!["spell check failed: exited with code 2"]
    );
    assert_eq!(outcome.passes.len(), 1);
    assert_eq!(builder.attempts(JobKind::Build, "A"), 1);
}
