//! Non-fatal outcomes of content binding and layout adjustment.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a content value was applied to a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingKind {
    /// Text written into the shape's text body.
    Text,
    /// Text body cleared because the value was empty.
    Cleared,
    /// Placeholder replaced by a picture.
    Picture,
    /// Placeholder removed because no usable image was given.
    Removed,
}

/// How a content key was resolved to its shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchMethod {
    /// Normalized structural path equality.
    Path,
    /// Alias of the key matched an alias of the shape name.
    Alias,
    /// Resolved through the legacy name table.
    NameTable,
    /// Took the next free generic placeholder.
    Placeholder,
}

/// One successful binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedBinding {
    /// Content path joined with `/`.
    pub key: String,
    /// Name of the shape that received the value.
    pub shape: String,
    pub kind: BindingKind,
    pub method: MatchMethod,
}

/// A content value that could not be bound as requested.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BindingWarning {
    #[error("slide {slide}: no shape matches \"{key}\"; value ignored")]
    UnmatchedKey { slide: usize, key: String },

    #[error("slide {slide}: image for \"{key}\" not found at {path}; placeholder removed")]
    MissingImage { slide: usize, key: String, path: String },

    #[error("slide {slide}: image for \"{key}\" at {path} is unreadable ({reason}); placeholder removed")]
    UnreadableImage {
        slide: usize,
        key: String,
        path: String,
        reason: String,
    },

    #[error("slide {slide}: shape \"{shape}\" for \"{key}\" holds neither text nor a picture")]
    UnsupportedShape { slide: usize, key: String, shape: String },
}

impl BindingWarning {
    /// Output slide number the warning belongs to.
    pub fn slide(&self) -> usize {
        match self {
            BindingWarning::UnmatchedKey { slide, .. }
            | BindingWarning::MissingImage { slide, .. }
            | BindingWarning::UnreadableImage { slide, .. }
            | BindingWarning::UnsupportedShape { slide, .. } => *slide,
        }
    }
}

/// A shape the layout adjuster had to leave alone.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("slide {slide}: layout of \"{shape}\" skipped: {reason}")]
pub struct LayoutSkip {
    pub slide: usize,
    pub shape: String,
    pub reason: String,
}

/// Result of binding one slide.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingReport {
    pub applied: Vec<AppliedBinding>,
    pub warnings: Vec<BindingWarning>,
}

impl BindingReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether every value found a home.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Look up the binding for a content key (path joined with `/`).
    pub fn applied_to(&self, key: &str) -> Option<&AppliedBinding> {
        self.applied.iter().find(|a| a.key == key)
    }
}

/// Everything non-fatal that happened during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Number of slides in the output.
    pub slides: usize,
    /// Number of values bound to shapes.
    pub bound: usize,
    pub warnings: Vec<BindingWarning>,
    pub layout_skips: Vec<LayoutSkip>,
}

impl RunSummary {
    pub fn new(slides: usize) -> Self {
        Self {
            slides,
            ..Self::default()
        }
    }

    /// Fold one slide's binding report into the summary.
    pub fn absorb(&mut self, report: BindingReport) {
        self.bound += report.applied.len();
        self.warnings.extend(report.warnings);
    }

    /// Whether the run finished without any warning or skip.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.layout_skips.is_empty()
    }
}
