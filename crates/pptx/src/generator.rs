//! The whole build: assemble, bind, adjust layout, restore connectors.

use crate::assembler::Assembler;
use crate::binder::ShapeBinder;
use crate::connectors::{restore_package, snapshot_package, ConnectorSnapshot};
use crate::constants::PRESENTATION_PART;
use crate::layout::LayoutAdjuster;
use crate::package::Package;
use crate::presentation::slide_width;
use crate::slide::Slide;
use deck_core::{ContentPlan, LegacyNameTable, Result, RunSummary};
use std::path::{Path, PathBuf};

/// Options for one build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Directory relative image paths are resolved against.
    pub image_root: Option<PathBuf>,
    /// Widen or shrink title boxes to fit their new text.
    pub adjust_layout: bool,
    /// Put the template's connectors back after editing.
    pub preserve_connectors: bool,
    /// Clear template captions left on shapes that received no value.
    pub clear_placeholder_text: bool,
    /// Legacy shape-name overrides used when a key matches no shape directly.
    pub name_table: LegacyNameTable,
    /// Layout settings used when `adjust_layout` is on.
    pub layout: LayoutAdjuster,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildOptions {
    /// Every pass enabled, the built-in name table and default layout settings.
    pub fn new() -> Self {
        Self {
            image_root: None,
            adjust_layout: true,
            preserve_connectors: true,
            clear_placeholder_text: true,
            name_table: LegacyNameTable::builtin(),
            layout: LayoutAdjuster::new(),
        }
    }

    /// Directory relative image paths are resolved against.
    pub fn with_image_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.image_root = Some(root.into());
        self
    }

    /// Turn title box resizing on or off.
    pub fn with_layout_adjustment(mut self, enabled: bool) -> Self {
        self.adjust_layout = enabled;
        self
    }

    /// Turn connector restore on or off.
    pub fn with_connector_preservation(mut self, enabled: bool) -> Self {
        self.preserve_connectors = enabled;
        self
    }

    /// Turn clearing of leftover template captions on or off.
    pub fn with_placeholder_cleanup(mut self, enabled: bool) -> Self {
        self.clear_placeholder_text = enabled;
        self
    }

    /// Replace the built-in legacy name table.
    pub fn with_name_table(mut self, table: LegacyNameTable) -> Self {
        self.name_table = table;
        self
    }

    /// Replace the layout settings.
    pub fn with_layout(mut self, layout: LayoutAdjuster) -> Self {
        self.layout = layout;
        self
    }
}

/// A finished deck and what happened while building it.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub bytes: Vec<u8>,
    pub summary: RunSummary,
}

/// Builds decks from a template and content plans.
#[derive(Debug, Clone)]
pub struct DeckBuilder {
    options: BuildOptions,
    binder: ShapeBinder,
}

impl Default for DeckBuilder {
    fn default() -> Self {
        Self::new(BuildOptions::default())
    }
}

impl DeckBuilder {
    /// A builder whose binder is configured from `options`.
    pub fn new(options: BuildOptions) -> Self {
        let mut binder = ShapeBinder::new()
            .with_name_table(options.name_table.clone())
            .with_placeholder_cleanup(options.clear_placeholder_text);
        if let Some(root) = &options.image_root {
            binder = binder.with_image_root(root);
        }
        Self { options, binder }
    }

    /// Options this builder was created with.
    pub fn options(&self) -> &BuildOptions {
        &self.options
    }

    /// Build the output archive.
    pub fn build(&self, template_bytes: &[u8], plan: &ContentPlan) -> Result<BuildOutput> {
        let template = Package::from_bytes(template_bytes)?;
        let (package, summary) = self.build_package(&template, plan)?;
        Ok(BuildOutput {
            bytes: package.to_bytes()?,
            summary,
        })
    }

    /// Build and write the output to `path`.
    ///
    /// Nothing is written when the build fails.
    pub fn build_to_path(&self, template_bytes: &[u8], plan: &ContentPlan, path: &Path) -> Result<RunSummary> {
        let output = self.build(template_bytes, plan)?;
        std::fs::write(path, &output.bytes)?;
        log::info!("Wrote {} ({} bytes)", path.display(), output.bytes.len());
        Ok(output.summary)
    }

    /// Build the output package in memory.
    pub fn build_package(&self, template: &Package, plan: &ContentPlan) -> Result<(Package, RunSummary)> {
        let mut package = Assembler::new().assemble_package(template, plan)?;

        let connectors = if self.options.preserve_connectors {
            snapshot_package(&package)?
        } else {
            ConnectorSnapshot::new()
        };
        let width = slide_width(&package.xml(PRESENTATION_PART)?);
        let mut summary = RunSummary::new(plan.len());

        for (i, page) in plan.pages().enumerate() {
            let mut slide = Slide::load(&package, i + 1)?;
            log::debug!(
                "Binding slide {} ({}, {} values)",
                slide.number,
                page.page_type_label(),
                page.content.len()
            );
            let report = self.binder.bind(&mut package, &mut slide, &page.content)?;

            if self.options.adjust_layout {
                let shapes = slide.shapes();
                let skips = self.options.layout.adjust(&mut slide, &shapes, width);
                summary.layout_skips.extend(skips);
            }

            slide.store(&mut package)?;
            summary.absorb(report);
        }

        if !connectors.is_empty() {
            restore_package(&mut package, &connectors)?;
        }

        log::info!(
            "Built {} slides: {} values bound, {} warnings, {} layout skips",
            summary.slides,
            summary.bound,
            summary.warnings.len(),
            summary.layout_skips.len()
        );
        Ok((package, summary))
    }
}

/// Build a deck with the given options.
pub fn generate(template_bytes: &[u8], plan: &ContentPlan, options: &BuildOptions) -> Result<BuildOutput> {
    DeckBuilder::new(options.clone()).build(template_bytes, plan)
}
