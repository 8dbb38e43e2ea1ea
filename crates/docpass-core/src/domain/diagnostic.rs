//! Errors reported by documentation builds and spell checks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::domain::package::PackageId;

/// A problem in a package's content or cross-references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildError {
    pub package: PackageId,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_no: Option<u32>,
}

impl BuildError {
    pub fn new(package: PackageId, message: impl Into<String>) -> Self {
        Self {
            package,
            message: message.into(),
            file_path: None,
            line_no: None,
        }
    }

    /// Attach the source location the renderer reported.
    pub fn at(mut self, file_path: impl Into<PathBuf>, line_no: Option<u32>) -> Self {
        self.file_path = Some(file_path.into());
        self.line_no = line_no;
        self
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_location(f, self.file_path.as_ref(), self.line_no)?;
        f.write_str(&self.message)
    }
}

/// A misspelled word found by the spell checker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellingError {
    pub package: PackageId,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_no: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spelling: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_line: Option<String>,
}

impl SpellingError {
    pub fn new(package: PackageId, message: impl Into<String>) -> Self {
        Self {
            package,
            message: message.into(),
            file_path: None,
            line_no: None,
            spelling: None,
            suggestions: Vec::new(),
            context_line: None,
        }
    }

    pub fn at(mut self, file_path: impl Into<PathBuf>, line_no: Option<u32>) -> Self {
        self.file_path = Some(file_path.into());
        self.line_no = line_no;
        self
    }

    pub fn with_spelling(mut self, word: impl Into<String>, suggestions: Vec<String>) -> Self {
        self.spelling = Some(word.into());
        self.suggestions = suggestions;
        self
    }

    pub fn with_context(mut self, context_line: impl Into<String>) -> Self {
        self.context_line = Some(context_line.into());
        self
    }
}

impl fmt::Display for SpellingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_location(f, self.file_path.as_ref(), self.line_no)?;
        match &self.spelling {
            Some(word) => write!(f, "incorrect spelling '{}'", word)?,
            None => f.write_str(&self.message)?,
        }
        if !self.suggestions.is_empty() {
            write!(f, " (suggestions: {})", self.suggestions.join(", "))?;
        }
        Ok(())
    }
}

fn write_location(
    f: &mut fmt::Formatter<'_>,
    file_path: Option<&PathBuf>,
    line_no: Option<u32>,
) -> fmt::Result {
    match (file_path, line_no) {
        (Some(path), Some(line)) => write!(f, "{}:{}: ", path.display(), line),
        (Some(path), None) => write!(f, "{}: ", path.display()),
        _ => Ok(()),
    }
}
