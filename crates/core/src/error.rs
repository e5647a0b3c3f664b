//! Error types for template deck assembly.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors that abort a run before any output is written.
///
/// Non-fatal conditions (unmatched keys, missing images, layout skips) are not
/// errors; they are collected in a [`crate::RunSummary`].
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open or read an input file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// The content plan as a whole is unusable (empty, malformed JSON).
    #[error("Invalid content plan: {0}")]
    InvalidPlan(String),

    /// One entry of the content plan is invalid. `index` is 1-based.
    #[error("Invalid content plan entry {index}: {message}")]
    InvalidPlanEntry { index: usize, message: String },

    /// The template package is missing parts required for assembly.
    #[error("Template package is incomplete: {0}")]
    PackageIntegrity(String),

    /// ZIP archive error.
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing or writing error.
    #[error("XML error: {0}")]
    XmlError(String),
}

impl Error {
    /// Whether this error is a content plan validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::InvalidPlan(_) | Error::InvalidPlanEntry { .. })
    }

    /// The 1-based plan index this error refers to, if any.
    pub fn plan_index(&self) -> Option<usize> {
        match self {
            Error::InvalidPlanEntry { index, .. } => Some(*index),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_grouping() {
        assert!(Error::InvalidPlan("empty".into()).is_validation());
        let entry = Error::InvalidPlanEntry {
            index: 3,
            message: "out of range".into(),
        };
        assert!(entry.is_validation());
        assert_eq!(entry.plan_index(), Some(3));
        assert!(!Error::PackageIntegrity("no slides".into()).is_validation());
    }

    #[test]
    fn test_entry_message_names_index() {
        let err = Error::InvalidPlanEntry {
            index: 1,
            message: "template page 9 does not exist".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid content plan entry 1: template page 9 does not exist"
        );
    }
}
