//! Pluggable survey validation.
//!
//! The crate enforces its own hard preconditions (GPS fix, at least one
//! photo) before submission. Anything beyond that is deployment policy, so
//! hosts inject a [`SurveyValidator`] when they need one.

use std::fmt;

use crate::model::SurveyDraft;

/// One field-level problem found during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Deployment-specific submission rules.
pub trait SurveyValidator: Send + Sync {
    /// Returns every issue found, or `Ok(())` when the draft may be
    /// submitted.
    fn validate(&self, survey: &SurveyDraft) -> Result<(), Vec<ValidationIssue>>;
}
