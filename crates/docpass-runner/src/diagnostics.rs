//! Diagnostics parser for renderer and spell-checker output.
//!
//! Recognised line shapes:
//!
//! ```text
//! <file>:<line>: WARNING: <message>
//! <file>: ERROR: <message>
//! WARNING: <message>
//! <file>:<line>: (<word>) <context>
//! <file>:<line>: Spell check: <word>: Suggested: <a>, <b>: <context>
//! ```
//!
//! A failed command that produced no recognisable line still yields one
//! synthesized build error so the failure is never silent.

use std::path::{Path, PathBuf};

use docpass_core::{BuildError, PackageId, SpellingError};
use regex::Regex;

use crate::error::{RunnerError, RunnerResult};
use crate::process::ProcessOutput;

const BUILD_LINE: &str = r"^(?:(?P<file>.+?):(?:(?P<line>\d+):)?\s+)?(?P<level>WARNING|ERROR|CRITICAL|SEVERE):\s*(?P<message>.*\S)\s*$";
const SPELLING_LINE: &str = r"^(?P<file>.+?):(?P<line>\d+):\s*\((?P<word>[^)\s]+)\)\s*(?P<context>.*?)\s*$";
const SPELLING_LINE_VERBOSE: &str = r"^(?P<file>.+?):(?P<line>\d+):\s*(?:WARNING:\s*)?Spell check:\s*(?P<word>[^:\s]+):\s*(?:Suggested:\s*(?P<suggestions>[^:]*):\s*)?(?P<context>.*?)\s*$";

/// Configuration for the diagnostics parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsParserConfig {
    /// Maximum number of diagnostics of each kind retained per job.
    pub max_per_job: usize,
}

impl Default for DiagnosticsParserConfig {
    fn default() -> Self {
        Self { max_per_job: 500 }
    }
}

/// Line-oriented parser with precompiled patterns.
#[derive(Debug, Clone)]
pub struct DiagnosticsParser {
    config: DiagnosticsParserConfig,
    build_line: Regex,
    spelling_line: Regex,
    spelling_line_verbose: Regex,
}

impl DiagnosticsParser {
    pub fn new(config: DiagnosticsParserConfig) -> RunnerResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| RunnerError::InvalidConfig(e.to_string()))
        };
        Ok(Self {
            config,
            build_line: compile(BUILD_LINE)?,
            spelling_line: compile(SPELLING_LINE)?,
            spelling_line_verbose: compile(SPELLING_LINE_VERBOSE)?,
        })
    }

    /// Extract build diagnostics. File paths under `source_dir` are made relative to it.
    pub fn parse_build_errors(
        &self,
        package: &PackageId,
        output: &str,
        source_dir: Option<&Path>,
    ) -> Vec<BuildError> {
        let mut errors = Vec::new();
        for line in output.lines() {
            if errors.len() >= self.config.max_per_job {
                break;
            }
            let Some(caps) = self.build_line.captures(line.trim_end()) else {
                continue;
            };
            let message = caps
                .name("message")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            // Misspellings reported as warnings belong to the spelling parser.
            if message.starts_with("Spell check:") {
                continue;
            }
            let mut error = BuildError::new(package.clone(), message);
            error.file_path = caps
                .name("file")
                .map(|m| relativize(Path::new(m.as_str().trim()), source_dir));
            error.line_no = caps.name("line").and_then(|m| m.as_str().parse().ok());
            errors.push(error);
        }
        errors
    }

    /// Extract misspellings from spell-checker output.
    pub fn parse_spelling_errors(
        &self,
        package: &PackageId,
        output: &str,
        source_dir: Option<&Path>,
    ) -> Vec<SpellingError> {
        let mut errors = Vec::new();
        for line in output.lines() {
            if errors.len() >= self.config.max_per_job {
                break;
            }
            let line = line.trim_end();
            let caps = match self.spelling_line_verbose.captures(line) {
                Some(caps) => caps,
                None => match self.spelling_line.captures(line) {
                    Some(caps) => caps,
                    None => continue,
                },
            };
            let word = caps.name("word").map(|m| m.as_str()).unwrap_or_default();
            let suggestions = caps
                .name("suggestions")
                .map(|m| {
                    m.as_str()
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default();
            let file = caps
                .name("file")
                .map(|m| relativize(Path::new(m.as_str().trim()), source_dir));
            let line_no = caps.name("line").and_then(|m| m.as_str().parse().ok());

            let mut error =
                SpellingError::new(package.clone(), format!("incorrect spelling '{word}'"))
                    .with_spelling(word, suggestions);
            error.file_path = file;
            error.line_no = line_no;
            if let Some(context) = caps.name("context").filter(|m| !m.as_str().is_empty()) {
                error = error.with_context(context.as_str());
            }
            errors.push(error);
        }
        errors
    }
}

/// Build a single error describing a failed command whose output had no
/// recognisable diagnostics.
pub fn synthesize_failure(package: &PackageId, what: &str, output: &ProcessOutput) -> BuildError {
    let combined = output.combined();
    let detail = combined
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| {
            let lower = l.to_ascii_lowercase();
            lower.contains("error") || lower.contains("exception")
        })
        .map(String::from)
        .unwrap_or_else(|| format!("exited with code {}", output.exit_code));
    BuildError::new(package.clone(), format!("{what} failed: {detail}"))
}

fn relativize(path: &Path, base: Option<&Path>) -> PathBuf {
    match base.and_then(|b| path.strip_prefix(b).ok()) {
        Some(rel) if !rel.as_os_str().is_empty() => rel.to_path_buf(),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> DiagnosticsParser {
        DiagnosticsParser::new(DiagnosticsParserConfig::default()).expect("patterns compile")
    }

    fn pkg() -> PackageId {
        PackageId::new("core")
    }

    #[test]
    fn test_build_warning_with_file_and_line() {
        let out = "reading sources... [100%] index\n\
                   docs/core/index.rst:12: WARNING: undefined label: intro\n\
                   build finished with problems.\n";
        let errors = parser().parse_build_errors(&pkg(), out, Some(Path::new("docs/core")));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "undefined label: intro");
        assert_eq!(errors[0].file_path, Some(PathBuf::from("index.rst")));
        assert_eq!(errors[0].line_no, Some(12));
    }

    #[test]
    fn test_build_warning_without_location() {
        let out = "WARNING: failed to reach any of the inventories with the following issues:\n";
        let errors = parser().parse_build_errors(&pkg(), out, None);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].file_path.is_none());
        assert!(errors[0].line_no.is_none());
        assert!(errors[0].message.starts_with("failed to reach any of the inventories"));
    }

    #[test]
    fn test_build_warning_with_docstring_location() {
        let out = "src/core/api.rst:docstring of core.api.Client:3: ERROR: Unexpected indentation.\n";
        let errors = parser().parse_build_errors(&pkg(), out, None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line_no, Some(3));
        assert_eq!(errors[0].message, "Unexpected indentation.");
    }

    #[test]
    fn test_build_file_without_line() {
        let out = "docs/core/changelog.rst: WARNING: document isn't included in any toctree\n";
        let errors = parser().parse_build_errors(&pkg(), out, None);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].file_path,
            Some(PathBuf::from("docs/core/changelog.rst"))
        );
        assert!(errors[0].line_no.is_none());
    }

    #[test]
    fn test_plain_lines_are_ignored() {
        let out = "loading pickled environment... done\nbuilding [html]: targets for 3 source files\n";
        assert!(parser().parse_build_errors(&pkg(), out, None).is_empty());
    }

    #[test]
    fn test_max_per_job_caps_results() {
        let parser = DiagnosticsParser::new(DiagnosticsParserConfig { max_per_job: 2 })
            .expect("patterns compile");
        let out = "WARNING: a\nWARNING: b\nWARNING: c\n";
        assert_eq!(parser.parse_build_errors(&pkg(), out, None).len(), 2);
    }

    #[test]
    fn test_spelling_short_form() {
        let out = "index.rst:7: (recieve) we recieve data from the hook\n";
        let errors = parser().parse_spelling_errors(&pkg(), out, None);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].spelling.as_deref(), Some("recieve"));
        assert_eq!(errors[0].line_no, Some(7));
        assert_eq!(
            errors[0].context_line.as_deref(),
            Some("we recieve data from the hook")
        );
        assert!(errors[0].suggestions.is_empty());
    }

    #[test]
    fn test_spelling_verbose_form_with_suggestions() {
        let out = "docs/core/index.rst:4: Spell check: teh: Suggested: the, tech: fix teh docs.\n";
        let errors = parser().parse_spelling_errors(&pkg(), out, Some(Path::new("docs/core")));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].spelling.as_deref(), Some("teh"));
        assert_eq!(errors[0].suggestions, vec!["the", "tech"]);
        assert_eq!(errors[0].file_path, Some(PathBuf::from("index.rst")));
        assert_eq!(errors[0].context_line.as_deref(), Some("fix teh docs."));
    }

    #[test]
    fn test_spelling_warning_is_not_a_build_error() {
        let out = "index.rst:9: WARNING: Spell check: wrod: Suggested: word: the wrod.\n";
        let parser = parser();
        assert!(parser.parse_build_errors(&pkg(), out, None).is_empty());
        let spelling = parser.parse_spelling_errors(&pkg(), out, None);
        assert_eq!(spelling.len(), 1);
        assert_eq!(spelling[0].spelling.as_deref(), Some("wrod"));
        assert_eq!(spelling[0].suggestions, vec!["word"]);
    }

    #[test]
    fn test_synthesize_failure_prefers_error_line() {
        let output = ProcessOutput {
            exit_code: 2,
            stdout: "Running Sphinx\n".to_string(),
            stderr: "Exception occurred: ConfigError: bad conf\n".to_string(),
            duration_ms: 0,
        };
        let err = synthesize_failure(&pkg(), "docs build", &output);
        assert!(err.message.starts_with("docs build failed: "));
        assert!(err.message.contains("ConfigError"));
    }

    #[test]
    fn test_synthesize_failure_falls_back_to_exit_code() {
        let output = ProcessOutput {
            exit_code: 137,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms: 0,
        };
        let err = synthesize_failure(&pkg(), "spell check", &output);
        assert_eq!(err.message, "spell check failed: exited with code 137");
    }
}
