//! Binding content values to the shapes of a cloned slide.
//!
//! Shapes are matched first by structural path (group names down to the
//! shape's own name, with the slide's page prefix and decorative segments
//! removed). Top-level keys that find no shape that way go through alias
//! matching, the legacy name table and finally the generic placeholders of the
//! slide, in that order.

use crate::package::Package;
use crate::picture::{add_media_part, fit_within, picture_element, register_image_types, ImageData, ImageProblem};
use crate::shapes::{leaf_shapes, shape_paths, ShapeNode};
use crate::slide::Slide;
use crate::text::{clear_text, set_text};
use deck_core::naming::{
    candidate_keys, detect_prefix, is_default_caption, is_text_placeholder, normalize_name,
    normalize_path, shape_aliases, wants_picture_slot, wants_text_placeholder,
};
use deck_core::{
    AppliedBinding, BindingKind, BindingReport, BindingWarning, ContentTree, LegacyNameTable,
    MatchMethod, Result,
};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

/// Binds content trees to slides.
#[derive(Debug, Clone)]
pub struct ShapeBinder {
    image_root: Option<PathBuf>,
    name_table: LegacyNameTable,
    clear_placeholder_text: bool,
}

impl Default for ShapeBinder {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeBinder {
    /// A binder using the built-in name table, with placeholder cleanup on.
    pub fn new() -> Self {
        Self {
            image_root: None,
            name_table: LegacyNameTable::builtin(),
            clear_placeholder_text: true,
        }
    }

    /// Directory that relative image paths are resolved against.
    pub fn with_image_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.image_root = Some(root.into());
        self
    }

    /// Legacy shape-name overrides tried after direct and alias matches.
    pub fn with_name_table(mut self, table: LegacyNameTable) -> Self {
        self.name_table = table;
        self
    }

    /// Whether leftover template captions are cleared from unbound shapes.
    pub fn with_placeholder_cleanup(mut self, enabled: bool) -> Self {
        self.clear_placeholder_text = enabled;
        self
    }

    /// Bind `content` to the shapes of `slide`.
    ///
    /// Image parts and their content types are added to `package`; the slide
    /// itself is only edited in memory and must be stored by the caller.
    /// Problems with individual values are collected in the report.
    pub fn bind(
        &self,
        package: &mut Package,
        slide: &mut Slide,
        content: &ContentTree,
    ) -> Result<BindingReport> {
        let shapes = slide.shapes();
        let paths: Vec<(Vec<String>, &ShapeNode)> = shape_paths(&shapes)
            .into_iter()
            .map(|(path, shape)| (path.iter().map(|s| normalize_name(s)).collect(), shape))
            .collect();
        let prefix = detect_prefix(paths.iter().map(|(path, _)| path.as_slice()));
        log::debug!(
            "Slide {}: {} shapes, page prefix {:?}",
            slide.number,
            paths.len(),
            prefix
        );

        let values: Vec<(Vec<String>, String)> = content
            .flatten()
            .into_iter()
            .map(|(path, value)| (path.iter().map(|s| normalize_name(s)).collect(), value))
            .collect();

        let mut pass = BindingPass::new(self, slide.number);
        let mut consumed: HashSet<Vec<String>> = HashSet::new();

        for (raw, shape) in &paths {
            let normalized = normalize_path(raw, prefix.as_deref());
            if normalized.is_empty() || !is_bindable(shape) {
                continue;
            }
            let Some((key, value)) = values.iter().find(|(key, _)| *key == normalized) else {
                continue;
            };
            if pass.apply(package, slide, shape, &key.join("/"), value, MatchMethod::Path)? {
                consumed.insert(key.clone());
            }
        }

        let leaves = leaf_shapes(&shapes);
        let aliases: Vec<BTreeSet<String>> = leaves
            .iter()
            .map(|shape| shape_aliases(&normalize_name(&shape.name)))
            .collect();

        for (label, value) in content.leaves() {
            let key = normalize_name(label);
            if consumed.contains(std::slice::from_ref(&key)) {
                continue;
            }

            let Some((shape, method)) = self.fallback_shape(&key, &leaves, &aliases, &pass) else {
                pass.warn(BindingWarning::UnmatchedKey {
                    slide: slide.number,
                    key: key.clone(),
                });
                continue;
            };

            if pass.apply(package, slide, shape, &key, value, method)? {
                consumed.insert(vec![key]);
            } else {
                pass.warn(BindingWarning::UnsupportedShape {
                    slide: slide.number,
                    key,
                    shape: shape.name.clone(),
                });
            }
        }

        for (key, _) in values.iter().filter(|(key, _)| key.len() > 1) {
            if !consumed.contains(key) {
                pass.warn(BindingWarning::UnmatchedKey {
                    slide: slide.number,
                    key: key.join("/"),
                });
            }
        }

        if self.clear_placeholder_text {
            let number = slide.number;
            for shape in &leaves {
                if !shape.is_text() || pass.used.contains(&shape.locator) {
                    continue;
                }
                if is_default_caption(&shape.text) {
                    if let Some(element) = slide.element_mut(&shape.locator) {
                        log::debug!("Slide {}: clearing template text of \"{}\"", number, shape.name);
                        clear_text(element);
                    }
                }
            }
        }

        pass.finish(package, slide)
    }

    /// Pick a shape for a top-level key that matched nothing structurally.
    fn fallback_shape<'s>(
        &self,
        key: &str,
        leaves: &[&'s ShapeNode],
        aliases: &[BTreeSet<String>],
        pass: &BindingPass,
    ) -> Option<(&'s ShapeNode, MatchMethod)> {
        let free = |i: &usize| !pass.used.contains(&leaves[*i].locator);

        for candidate in candidate_keys(key) {
            if let Some(i) = (0..leaves.len()).filter(free).find(|&i| aliases[i].contains(&candidate)) {
                return Some((leaves[i], MatchMethod::Alias));
            }
        }

        for name in self.name_table.candidates(key) {
            let name = normalize_name(name);
            if let Some(i) = (0..leaves.len())
                .filter(free)
                .find(|&i| normalize_name(&leaves[i].name) == name)
            {
                return Some((leaves[i], MatchMethod::NameTable));
            }
        }

        if wants_text_placeholder(key) {
            let found = (0..leaves.len())
                .filter(free)
                .find(|&i| leaves[i].is_text() && is_text_placeholder(&leaves[i].name, leaves[i].text.trim()));
            if let Some(i) = found {
                return Some((leaves[i], MatchMethod::Placeholder));
            }
        }
        if wants_picture_slot(key) {
            let found = (0..leaves.len())
                .filter(free)
                .find(|&i| leaves[i].is_picture_target());
            if let Some(i) = found {
                return Some((leaves[i], MatchMethod::Placeholder));
            }
        }
        None
    }

    fn resolve_image(&self, value: &str) -> PathBuf {
        let path = Path::new(value);
        match &self.image_root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

/// Shapes that can take a value: pictures and text bodies, never whole groups.
fn is_bindable(shape: &ShapeNode) -> bool {
    !shape.is_group() && (shape.is_picture_target() || shape.is_text())
}

/// State of one `bind` call.
struct BindingPass<'b> {
    binder: &'b ShapeBinder,
    slide_number: usize,
    /// Locators of shapes that already took a value.
    used: HashSet<Vec<usize>>,
    /// Shapes to delete once binding is done.
    removals: Vec<Vec<usize>>,
    image_types: Vec<(&'static str, &'static str)>,
    report: BindingReport,
}

impl<'b> BindingPass<'b> {
    fn new(binder: &'b ShapeBinder, slide_number: usize) -> Self {
        Self {
            binder,
            slide_number,
            used: HashSet::new(),
            removals: Vec::new(),
            image_types: Vec::new(),
            report: BindingReport::new(),
        }
    }

    fn warn(&mut self, warning: BindingWarning) {
        log::warn!("{}", warning);
        self.report.warnings.push(warning);
    }

    fn record(&mut self, key: &str, shape: &ShapeNode, kind: BindingKind, method: MatchMethod) {
        log::debug!(
            "Slide {}: \"{}\" -> \"{}\" ({:?}, {:?})",
            self.slide_number,
            key,
            shape.name,
            kind,
            method
        );
        self.used.insert(shape.locator.clone());
        self.report.applied.push(AppliedBinding {
            key: key.to_string(),
            shape: shape.name.clone(),
            kind,
            method,
        });
    }

    /// Apply one value. Returns `false` if the shape cannot take it.
    fn apply(
        &mut self,
        package: &mut Package,
        slide: &mut Slide,
        shape: &ShapeNode,
        key: &str,
        value: &str,
        method: MatchMethod,
    ) -> Result<bool> {
        if self.used.contains(&shape.locator) || shape.is_group() {
            return Ok(false);
        }

        if shape.is_picture_target() {
            self.apply_picture(package, slide, shape, key, value, method);
            return Ok(true);
        }

        if !shape.is_text() {
            return Ok(false);
        }
        let Some(element) = slide.element_mut(&shape.locator) else {
            return Ok(false);
        };
        let kind = if value.is_empty() {
            clear_text(element);
            BindingKind::Cleared
        } else {
            set_text(element, value);
            BindingKind::Text
        };
        self.record(key, shape, kind, method);
        Ok(true)
    }

    fn apply_picture(
        &mut self,
        package: &mut Package,
        slide: &mut Slide,
        shape: &ShapeNode,
        key: &str,
        value: &str,
        method: MatchMethod,
    ) {
        let value = value.trim();
        let path = self.binder.resolve_image(value);
        let image = if value.is_empty() {
            Err(ImageProblem::Missing)
        } else {
            ImageData::load(&path)
        };

        let image = match image {
            Ok(image) => image,
            Err(problem) => {
                let path = path.display().to_string();
                let warning = match problem {
                    ImageProblem::Missing => BindingWarning::MissingImage {
                        slide: self.slide_number,
                        key: key.to_string(),
                        path,
                    },
                    ImageProblem::Unreadable(reason) => BindingWarning::UnreadableImage {
                        slide: self.slide_number,
                        key: key.to_string(),
                        path,
                        reason,
                    },
                };
                self.warn(warning);
                self.removals.push(shape.locator.clone());
                self.record(key, shape, BindingKind::Removed, method);
                return;
            }
        };

        let Some(frame) = shape.geometry else {
            self.warn(BindingWarning::UnsupportedShape {
                slide: self.slide_number,
                key: key.to_string(),
                shape: shape.name.clone(),
            });
            self.used.insert(shape.locator.clone());
            return;
        };

        let media_part = add_media_part(package, &image);
        if !self.image_types.contains(&(image.extension, image.content_type)) {
            self.image_types.push((image.extension, image.content_type));
        }

        let description = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let geometry = fit_within(&frame, image.width, image.height);
        let picture = picture_element(slide, &media_part, &shape.name, &description, &geometry);
        slide.replace_element(&shape.locator, picture);
        self.record(key, shape, BindingKind::Picture, method);
    }

    /// Delete removed placeholders and register image content types.
    fn finish(mut self, package: &mut Package, slide: &mut Slide) -> Result<BindingReport> {
        // Later siblings first, so earlier locators stay valid.
        self.removals.sort();
        for locator in self.removals.iter().rev() {
            slide.remove_element(locator);
        }
        register_image_types(package, &self.image_types)?;
        Ok(self.report)
    }
}
