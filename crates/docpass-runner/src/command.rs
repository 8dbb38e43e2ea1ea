//! Command templates for the renderer and spell checker.
//!
//! A template is an argv whose elements may contain placeholders:
//!
//! | placeholder    | value                                   |
//! |----------------|-----------------------------------------|
//! | `{package}`    | package name                            |
//! | `{source_dir}` | `docs_root/<package>`                   |
//! | `{out_dir}`    | output directory for this job           |
//! | `{docs_root}`  | the documentation root                  |

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RunnerError, RunnerResult};

/// Values substituted into a [`CommandTemplate`].
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    pub package: &'a str,
    pub source_dir: &'a Path,
    pub out_dir: &'a Path,
    pub docs_root: &'a Path,
}

/// A named argv template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    /// Human-readable name used in errors and logs.
    pub name: String,

    /// Command to execute (first element is executable).
    pub argv: Vec<String>,
}

impl CommandTemplate {
    pub fn new(name: impl Into<String>, argv: Vec<String>) -> RunnerResult<Self> {
        let name = name.into();
        if argv.is_empty() || argv[0].trim().is_empty() {
            return Err(RunnerError::EmptyCommand { name });
        }
        Ok(Self { name, argv })
    }

    /// Substitute placeholders in every argument.
    pub fn render(&self, vars: &TemplateVars<'_>) -> Vec<String> {
        let source_dir = vars.source_dir.display().to_string();
        let out_dir = vars.out_dir.display().to_string();
        let docs_root = vars.docs_root.display().to_string();
        self.argv
            .iter()
            .map(|arg| {
                arg.replace("{package}", vars.package)
                    .replace("{source_dir}", &source_dir)
                    .replace("{out_dir}", &out_dir)
                    .replace("{docs_root}", &docs_root)
            })
            .collect()
    }
}

/// Render an argv for display in logs, quoting arguments with whitespace.
pub fn display_argv(argv: &[String]) -> String {
    argv.iter()
        .map(|arg| {
            if arg.chars().any(char::is_whitespace) {
                format!("'{arg}'")
            } else {
                arg.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
