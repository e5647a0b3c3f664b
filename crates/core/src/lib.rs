//! Core domain types, name-matching rules and text metrics for building
//! presentations from PowerPoint templates.

pub mod collaborators;
pub mod error;
pub mod metrics;
pub mod name_table;
pub mod naming;
pub mod report;
pub mod types;

pub use error::{Error, Result};
pub use metrics::CharWidthTable;
pub use name_table::LegacyNameTable;
pub use report::{
    AppliedBinding, BindingKind, BindingReport, BindingWarning, LayoutSkip, MatchMethod,
    RunSummary,
};
pub use types::{ContentNode, ContentPlan, ContentTree, SlidePlan};
