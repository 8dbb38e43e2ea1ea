//! Retry eligibility of build errors.
//!
//! Some build failures only mean that a package references a document in a
//! sibling package that has not been built yet in this run. Those resolve
//! once the sibling exists, so they are worth another pass. Everything else
//! is a genuine content error.

use crate::aggregator::PassErrors;
use crate::domain::{BuildError, PackageId};

/// Message fragments that mark a transient cross-package dependency failure.
pub const DEFAULT_RETRY_SIGNATURES: &[&str] = &[
    "failed to reach any of the inventories",
    "toctree contains reference to nonexisting document",
    "undefined label:",
    "unknown document:",
    "unresolved external reference",
    "error loading dependent package",
];

/// Decides which failed packages are worth rebuilding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorClassifier {
    signatures: Vec<String>,
}

impl Default for ErrorClassifier {
    fn default() -> Self {
        Self {
            signatures: DEFAULT_RETRY_SIGNATURES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ErrorClassifier {
    /// A classifier with no signatures; nothing is ever retried.
    pub fn empty() -> Self {
        Self {
            signatures: Vec::new(),
        }
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        let signature = signature.into();
        if !signature.is_empty() && !self.signatures.contains(&signature) {
            self.signatures.push(signature);
        }
        self
    }

    pub fn with_signatures<I, S>(self, signatures: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        signatures
            .into_iter()
            .fold(self, |classifier, s| classifier.with_signature(s))
    }

    pub fn signatures(&self) -> &[String] {
        &self.signatures
    }

    /// The first signature contained in the error's message, if any.
    pub fn matching_signature(&self, error: &BuildError) -> Option<&str> {
        self.signatures
            .iter()
            .find(|sig| error.message.contains(sig.as_str()))
            .map(String::as_str)
    }

    /// True iff at least one error matches at least one signature.
    pub fn is_retry_eligible(&self, errors: &[BuildError]) -> bool {
        errors.iter().any(|e| self.matching_signature(e).is_some())
    }

    /// Packages of `order` whose build errors in `pass` are retry-eligible,
    /// in `order`'s order.
    pub fn retry_set(&self, order: &[PackageId], pass: &PassErrors) -> Vec<PackageId> {
        order
            .iter()
            .filter(|package| {
                pass.build
                    .get(*package)
                    .is_some_and(|errors| self.is_retry_eligible(errors))
            })
            .cloned()
            .collect()
    }
}
