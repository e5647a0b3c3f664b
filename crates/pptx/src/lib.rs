//! PPTX template assembly.
//!
//! Builds a presentation from a PowerPoint template and a content plan: the
//! template slides named by the plan are cloned at the package level, plan
//! values are bound to shapes by name, title boxes are fitted to their new
//! text and connectors are carried through unchanged.

pub mod assembler;
pub mod binder;
pub mod connectors;
pub mod constants;
pub mod content_types;
pub mod generator;
pub mod layout;
pub mod package;
pub mod picture;
pub mod presentation;
pub mod rels;
pub mod selector;
pub mod shapes;
pub mod slide;
pub mod text;
pub mod xml;

#[cfg(test)]
pub(crate) mod fixtures;

pub use assembler::Assembler;
pub use binder::ShapeBinder;
pub use connectors::{restore, restore_package, snapshot, snapshot_package, ConnectorSnapshot};
pub use generator::{generate, BuildOptions, BuildOutput, DeckBuilder};
pub use layout::LayoutAdjuster;
pub use package::Package;
pub use slide::Slide;
