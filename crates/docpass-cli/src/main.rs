//! docpass - multi-pass documentation build orchestrator
//!
//! The `docpass` command builds and spell-checks documentation packages,
//! re-driving packages that fail on cross-package references until the
//! reference graph settles.
//!
//! ## Commands
//!
//! - `build`: Build and/or spell-check the selected packages
//! - `list`: Show the packages discovered under the documentation root

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};

use docpass_core::{
    render_error_details, render_summary_table, write_run_report_json, BuildMode,
    ErrorClassifier, LogFormat, PassController, RunOutcome, RunReportArtifact, RunRequest,
    WorkerPool,
};
use docpass_runner::{
    check_generated_outputs, CommandDocsBuilder, FsInventoryProbe, PackageCatalog,
    PackageFilter, RunnerConfig,
};

#[derive(Parser)]
#[command(name = "docpass")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Multi-pass documentation build orchestrator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and spell-check documentation packages
    Build(BuildArgs),

    /// List available documentation packages
    List {
        /// Configuration file (default: docpass.toml if present)
        #[arg(long, env = "DOCPASS_CONFIG")]
        config: Option<PathBuf>,

        /// Only list packages matching this glob (repeatable)
        #[arg(long = "package-filter")]
        package_filter: Vec<String>,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct BuildArgs {
    /// Only build packages matching this glob (repeatable)
    #[arg(long = "package-filter")]
    package_filter: Vec<String>,

    /// Build documentation without spell checking
    #[arg(long, conflicts_with = "spellcheck_only")]
    docs_only: bool,

    /// Spell-check documentation without building it
    #[arg(long)]
    spellcheck_only: bool,

    /// Parallel jobs (0 = one per CPU)
    #[arg(short, long, env = "DOCPASS_JOBS")]
    jobs: Option<usize>,

    /// Run the main pass only, without retries
    #[arg(long)]
    one_pass_only: bool,

    /// Configuration file (default: docpass.toml if present)
    #[arg(long, env = "DOCPASS_CONFIG")]
    config: Option<PathBuf>,

    /// Per-job timeout in seconds (0 = none)
    #[arg(long)]
    job_timeout_secs: Option<u64>,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    docpass_core::init_tracing(LogFormat::from_json_flag(cli.json), level);

    let code = match cli.command {
        Commands::Build(args) => cmd_build(&args, cli.verbose).await?,
        Commands::List {
            config,
            package_filter,
        } => cmd_list(config.as_deref(), &package_filter)?,
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn load_config(args: &BuildArgs) -> Result<RunnerConfig> {
    let mut config =
        RunnerConfig::load_or_default(args.config.as_deref()).context("loading configuration")?;
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
    }
    if let Some(secs) = args.job_timeout_secs {
        config.job_timeout_secs = secs;
    }
    Ok(config)
}

async fn cmd_build(args: &BuildArgs, verbose: bool) -> Result<i32> {
    let mode = BuildMode::from_flags(args.docs_only, args.spellcheck_only)
        .context("--docs-only and --spellcheck-only cannot be used together")?;
    let config = load_config(args)?;

    let catalog = PackageCatalog::discover(&config)?;
    check_generated_outputs(&config, catalog.packages())?;
    let packages = PackageFilter::new(&args.package_filter)?.apply(catalog.packages())?;

    println!("{}", render_package_list(&packages, mode));

    let mut pool = WorkerPool::new(config.jobs);
    if let Some(timeout) = config.job_timeout() {
        pool = pool.with_job_timeout(timeout);
    }
    info!(
        jobs = pool.concurrency(),
        timeout_secs = config.job_timeout().map(|t| t.as_secs()),
        "starting documentation run"
    );

    let classifier =
        ErrorClassifier::default().with_signatures(config.retry_signatures.iter().cloned());
    let builder = Arc::new(CommandDocsBuilder::new(config.clone())?);
    let probe = Arc::new(FsInventoryProbe::new(&config));
    let controller = PassController::new(pool, builder, probe).with_classifier(classifier);

    let request = RunRequest::new(packages)
        .with_mode(mode)
        .one_pass_only(args.one_pass_only)
        .verbose(verbose);
    let outcome = controller
        .run(&request)
        .await
        .context("documentation run failed")?;

    print!("{}", render_failed_job_logs(&outcome));

    if let Some(path) = &args.report {
        write_run_report_json(path, &RunReportArtifact::from_outcome(&outcome))?;
        println!("Run report written to {}", path.display());
    }

    if outcome.success() {
        println!("{}", success_message(mode));
    } else {
        println!();
        print!("{}", render_error_details(&outcome.errors, mode));
        println!();
        print!("{}", render_summary_table(&outcome.errors));
    }

    Ok(outcome.exit_code())
}

fn cmd_list(config_path: Option<&Path>, package_filter: &[String]) -> Result<i32> {
    let config = RunnerConfig::load_or_default(config_path).context("loading configuration")?;
    let catalog = PackageCatalog::discover(&config)?;
    let packages = PackageFilter::new(package_filter)?.apply(catalog.packages())?;
    for package in &packages {
        println!("{}", package);
    }
    Ok(0)
}

fn render_package_list(packages: &[docpass_core::PackageId], mode: BuildMode) -> String {
    let action = match mode {
        BuildMode::Full => "build and spell-check",
        BuildMode::DocsOnly => "build",
        BuildMode::SpellcheckOnly => "spell-check",
    };
    let mut out = format!("Documentation packages to {} ({}):\n", action, packages.len());
    for (i, package) in packages.iter().enumerate() {
        out.push_str(&format!("{:>4}. {}\n", i + 1, package));
    }
    out
}

/// Logs of every job that reported errors, grouped by pass.
fn render_failed_job_logs(outcome: &RunOutcome) -> String {
    let mut out = String::new();
    for pass in &outcome.passes {
        for result in &pass.failed {
            let Some(log_path) = &result.log_path else {
                continue;
            };
            out.push_str(&format!(
                "\n==== {} output of {} ({} pass) ====\n",
                result.kind, result.package, pass.kind
            ));
            match std::fs::read_to_string(log_path) {
                Ok(content) => out.push_str(&content),
                Err(e) => out.push_str(&format!("<unable to read {}: {}>\n", log_path.display(), e)),
            }
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }
    }
    out
}

fn success_message(mode: BuildMode) -> &'static str {
    match mode {
        BuildMode::Full => "The documentation has been built and spell-checked successfully.",
        BuildMode::DocsOnly => "The documentation has been built successfully.",
        BuildMode::SpellcheckOnly => "The documentation spell check passed.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use docpass_core::PackageId;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_build_flags_parse() {
        let cli = Cli::try_parse_from([
            "docpass",
            "-v",
            "build",
            "--package-filter",
            "providers-*",
            "--package-filter",
            "core",
            "--docs-only",
            "-j",
            "4",
            "--one-pass-only",
            "--job-timeout-secs",
            "600",
        ])
        .expect("parse");
        assert!(cli.verbose);
        let Commands::Build(args) = cli.command else {
            panic!("expected build command");
        };
        assert_eq!(args.package_filter, vec!["providers-*", "core"]);
        assert!(args.docs_only);
        assert!(!args.spellcheck_only);
        assert_eq!(args.jobs, Some(4));
        assert!(args.one_pass_only);
        assert_eq!(args.job_timeout_secs, Some(600));
    }

    #[test]
    fn test_docs_only_conflicts_with_spellcheck_only() {
        let result =
            Cli::try_parse_from(["docpass", "build", "--docs-only", "--spellcheck-only"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let args = BuildArgs {
            jobs: Some(3),
            job_timeout_secs: Some(10),
            config: Some(PathBuf::from("/nonexistent/docpass.toml")),
            ..BuildArgs::default()
        };
        assert!(load_config(&args).is_err());

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("docpass.toml");
        std::fs::write(&path, "jobs = 8\njob_timeout_secs = 99\n").expect("write");
        let args = BuildArgs {
            config: Some(path),
            jobs: Some(3),
            ..BuildArgs::default()
        };
        let config = load_config(&args).expect("config");
        assert_eq!(config.jobs, 3);
        assert_eq!(config.job_timeout_secs, 99);
    }

    #[test]
    fn test_package_list_is_numbered() {
        let packages = vec![PackageId::new("core"), PackageId::new("providers-http")];
        let rendered = render_package_list(&packages, BuildMode::DocsOnly);
        assert_eq!(
            rendered,
            "Documentation packages to build (2):\n   1. core\n   2. providers-http\n"
        );
    }

    #[test]
    fn test_success_message_follows_mode() {
        assert!(success_message(BuildMode::DocsOnly).contains("built"));
        assert!(success_message(BuildMode::SpellcheckOnly).contains("spell check"));
    }

    #[cfg(unix)]
    fn write_project(root: &Path, build_script: &str, spell_script: &str) -> PathBuf {
        for name in ["alpha", "beta"] {
            let dir = root.join("docs").join(name);
            std::fs::create_dir_all(&dir).expect("mkdir");
            std::fs::write(dir.join("conf.py"), "").expect("write");
            let inv = root.join("inventory").join(name);
            std::fs::create_dir_all(&inv).expect("mkdir");
            std::fs::write(inv.join("objects.inv"), "").expect("write");
        }
        let config = format!(
            "docs_root = {:?}\nbuild_dir = {:?}\nlog_dir = {:?}\ninventory_dir = {:?}\n\
             build_command = [\"sh\", \"-c\", {:?}]\nspellcheck_command = [\"sh\", \"-c\", {:?}]\n",
            root.join("docs").display().to_string(),
            root.join("_build").display().to_string(),
            root.join("_build/logs").display().to_string(),
            root.join("inventory").display().to_string(),
            build_script,
            spell_script,
        );
        let path = root.join("docpass.toml");
        std::fs::write(&path, config).expect("write config");
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_build_clean_run_exits_zero_and_writes_report() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = write_project(dir.path(), "exit 0", "exit 0");
        let report = dir.path().join("run_report.json");
        let args = BuildArgs {
            config: Some(config),
            jobs: Some(2),
            report: Some(report.clone()),
            ..BuildArgs::default()
        };

        let code = cmd_build(&args, false).await.expect("run");
        assert_eq!(code, 0);

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report).expect("read report"))
                .expect("parse report");
        assert_eq!(json["success"], true);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_build_with_spelling_errors_exits_one() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = write_project(
            dir.path(),
            "exit 0",
            "if [ {package} = beta ]; then echo 'index.rst:2: (teh) teh end'; exit 1; fi",
        );
        let args = BuildArgs {
            config: Some(config),
            package_filter: vec!["*".to_string()],
            ..BuildArgs::default()
        };

        let code = cmd_build(&args, false).await.expect("run");
        assert_eq!(code, 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_build_filter_matching_nothing_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = write_project(dir.path(), "exit 0", "exit 0");
        let args = BuildArgs {
            config: Some(config),
            package_filter: vec!["gamma-*".to_string()],
            ..BuildArgs::default()
        };
        assert!(cmd_build(&args, false).await.is_err());
    }
}
