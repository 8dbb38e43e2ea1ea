use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::aggregator::{ErrorMaps, PackageErrorCount};
use crate::controller::{PassKind, RunOutcome};
use crate::domain::{BuildMode, PackageId};

const TABLE_HEADERS: [&str; 3] = [
    "Package name",
    "Count of doc build errors",
    "Count of spelling errors",
];

/// Process exit code for a finished run: 0 only if no package has errors.
pub fn exit_code(errors: &ErrorMaps) -> i32 {
    if errors.is_clean() {
        0
    } else {
        1
    }
}

/// Full error detail grouped by package, packages sorted by name.
///
/// In spellcheck-only runs build errors are not detailed: the spell checker
/// only sees them as a side effect, so a single warning line is emitted.
pub fn render_error_details(errors: &ErrorMaps, mode: BuildMode) -> String {
    let mut out = String::new();

    if !errors.build.is_empty() {
        if mode == BuildMode::SpellcheckOnly {
            out.push_str("WARNING: there were some build errors remaining.\n\n");
        } else {
            out.push_str(&format!(
                "{} documentation build error(s) in {} package(s)\n",
                errors.total_build_errors(),
                errors.build.len()
            ));
            for (package, package_errors) in &errors.build {
                out.push_str(&section_header(package, "build errors"));
                for (idx, error) in package_errors.iter().enumerate() {
                    out.push_str(&format!("{:>4}. {}\n", idx + 1, error));
                }
            }
            out.push('\n');
        }
    }

    if !errors.spelling.is_empty() {
        out.push_str(&format!(
            "{} spelling error(s) in {} package(s)\n",
            errors.total_spelling_errors(),
            errors.spelling.len()
        ));
        for (package, package_errors) in &errors.spelling {
            out.push_str(&section_header(package, "spelling errors"));
            for (idx, error) in package_errors.iter().enumerate() {
                out.push_str(&format!("{:>4}. {}\n", idx + 1, error));
                if let Some(context) = &error.context_line {
                    out.push_str(&format!("      > {}\n", context.trim()));
                }
            }
        }
        out.push('\n');
    }

    out
}

fn section_header(package: &PackageId, what: &str) -> String {
    format!("== {} ({}) ==\n", package, what)
}

/// Summary table of error counts per package.
pub fn render_summary_table(errors: &ErrorMaps) -> String {
    let rows: Vec<[String; 3]> = errors
        .counts()
        .into_iter()
        .map(|c| {
            [
                c.package.to_string(),
                c.build_errors.to_string(),
                c.spelling_errors.to_string(),
            ]
        })
        .collect();

    let mut widths = TABLE_HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "{} Packages errors summary {}\n",
        "#".repeat(20),
        "#".repeat(20)
    ));
    out.push_str(&format!(
        "{:<w0$}  {:>w1$}  {:>w2$}\n",
        TABLE_HEADERS[0],
        TABLE_HEADERS[1],
        TABLE_HEADERS[2],
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2]
    ));
    out.push_str(&format!(
        "{}  {}  {}\n",
        "-".repeat(widths[0]),
        "-".repeat(widths[1]),
        "-".repeat(widths[2])
    ));
    for row in &rows {
        out.push_str(&format!(
            "{:<w0$}  {:>w1$}  {:>w2$}\n",
            row[0],
            row[1],
            row[2],
            w0 = widths[0],
            w1 = widths[1],
            w2 = widths[2]
        ));
    }
    out.push_str(&"#".repeat(50));
    out.push('\n');
    out
}

/// One pass in the persisted run report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PassSummaryArtifact {
    pub kind: PassKind,
    pub packages: Vec<PackageId>,
    pub failed_packages: Vec<PackageId>,
    pub duration_ms: u64,
}

/// Machine-readable record of a finished run (run_report.json).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReportArtifact {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub run_id: String,
    pub mode: BuildMode,
    pub success: bool,
    pub priority_packages: Vec<PackageId>,
    pub passes: Vec<PassSummaryArtifact>,
    pub packages: Vec<PackageErrorCount>,
    pub errors: ErrorMaps,
}

impl RunReportArtifact {
    pub fn from_outcome(outcome: &RunOutcome) -> Self {
        let passes = outcome
            .passes
            .iter()
            .map(|p| {
                let mut seen = HashSet::new();
                let failed_packages: Vec<PackageId> = p
                    .failed
                    .iter()
                    .filter(|r| seen.insert(&r.package))
                    .map(|r| r.package.clone())
                    .collect();
                PassSummaryArtifact {
                    kind: p.kind,
                    packages: p.packages.clone(),
                    failed_packages,
                    duration_ms: p.duration_ms,
                }
            })
            .collect();

        Self {
            schema_version: "1.0".to_string(),
            generated_at: Utc::now(),
            run_id: outcome.run_id.clone(),
            mode: outcome.mode,
            success: outcome.success(),
            priority_packages: outcome.priority_packages.clone(),
            passes,
            packages: outcome.errors.counts(),
            errors: outcome.errors.clone(),
        }
    }
}

/// Write run_report.json in pretty JSON format.
pub fn write_run_report_json(path: &Path, artifact: &RunReportArtifact) -> Result<()> {
    let content = serde_json::to_string_pretty(artifact).context("serialize run report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}
