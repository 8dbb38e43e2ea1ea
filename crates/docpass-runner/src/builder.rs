//! [`DocsBuilder`] backed by external renderer and spell-checker commands.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use docpass_core::{BuildReport, DocsBuilder, PackageId, SpellcheckReport};
use tracing::{debug, info};

use crate::command::{display_argv, CommandTemplate, TemplateVars};
use crate::config::RunnerConfig;
use crate::diagnostics::{synthesize_failure, DiagnosticsParser, DiagnosticsParserConfig};
use crate::error::RunnerResult;
use crate::process::{self, ProcessOutput};

/// Runs the configured commands once per job and parses their output.
///
/// Every job writes a log at `log_dir/<package>/{build,spelling}.log` holding
/// the command line, its combined output and the exit code.
#[derive(Debug, Clone)]
pub struct CommandDocsBuilder {
    config: RunnerConfig,
    build: CommandTemplate,
    spellcheck: CommandTemplate,
    parser: DiagnosticsParser,
}

impl CommandDocsBuilder {
    pub fn new(config: RunnerConfig) -> RunnerResult<Self> {
        config.validate()?;
        let build = CommandTemplate::new("build_command", config.build_command.clone())?;
        let spellcheck =
            CommandTemplate::new("spellcheck_command", config.spellcheck_command.clone())?;
        let parser = DiagnosticsParser::new(DiagnosticsParserConfig::default())?;
        Ok(Self {
            config,
            build,
            spellcheck,
            parser,
        })
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    async fn run_command(
        &self,
        package: &PackageId,
        template: &CommandTemplate,
        out_dir: &Path,
        log_path: &Path,
        verbose: bool,
    ) -> anyhow::Result<ProcessOutput> {
        let source_dir = self.config.source_dir(package);
        tokio::fs::create_dir_all(out_dir)
            .await
            .with_context(|| format!("creating {}", out_dir.display()))?;
        if let Some(parent) = log_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let argv = template.render(&TemplateVars {
            package: package.as_str(),
            source_dir: &source_dir,
            out_dir,
            docs_root: &self.config.docs_root,
        });
        debug!(package = %package, command = %display_argv(&argv), "running {}", template.name);

        let output = process::execute(&argv, None)
            .await
            .with_context(|| format!("{} for {}", template.name, package))?;

        let log = format!(
            "$ {}\n{}\n[exit code {} after {} ms]\n",
            display_argv(&argv),
            output.combined(),
            output.exit_code,
            output.duration_ms
        );
        tokio::fs::write(log_path, log)
            .await
            .with_context(|| format!("writing {}", log_path.display()))?;

        if verbose {
            for line in output.combined().lines() {
                info!(package = %package, "{}", line);
            }
        }
        Ok(output)
    }
}

#[async_trait]
impl DocsBuilder for CommandDocsBuilder {
    async fn build(&self, package: &PackageId, verbose: bool) -> anyhow::Result<BuildReport> {
        let out_dir = self.config.docs_output_dir(package);
        let log_path = self.config.build_log_path(package);
        let output = self
            .run_command(package, &self.build, &out_dir, &log_path, verbose)
            .await?;

        let source_dir = self.config.source_dir(package);
        let mut errors =
            self.parser
                .parse_build_errors(package, &output.combined(), Some(source_dir.as_path()));
        let failed = errors.is_empty() && !output.success();
        if failed {
            errors.push(synthesize_failure(package, "docs build", &output));
        }

        Ok(BuildReport {
            errors,
            log_path: Some(log_path),
            failed,
        })
    }

    async fn spellcheck(
        &self,
        package: &PackageId,
        verbose: bool,
    ) -> anyhow::Result<SpellcheckReport> {
        let out_dir = self.config.spelling_output_dir(package);
        let log_path = self.config.spelling_log_path(package);
        let output = self
            .run_command(package, &self.spellcheck, &out_dir, &log_path, verbose)
            .await?;

        let combined = output.combined();
        let source_dir = self.config.source_dir(package);
        let spelling_errors =
            self.parser
                .parse_spelling_errors(package, &combined, Some(source_dir.as_path()));
        let mut build_errors = self
            .parser
            .parse_build_errors(package, &combined, Some(source_dir.as_path()));
        let failed = spelling_errors.is_empty() && build_errors.is_empty() && !output.success();
        if failed {
            build_errors.push(synthesize_failure(package, "spell check", &output));
        }

        Ok(SpellcheckReport {
            spelling_errors,
            build_errors,
            log_path: Some(log_path),
            failed,
        })
    }

    async fn clean(&self, package: &PackageId) -> anyhow::Result<()> {
        for dir in [
            self.config.docs_output_dir(package),
            self.config.spelling_output_dir(package),
        ] {
            remove_dir_if_present(&dir).await?;
        }
        debug!(package = %package, "cleaned build output");
        Ok(())
    }
}

async fn remove_dir_if_present(dir: &Path) -> anyhow::Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing {}", dir.display())),
    }
}
