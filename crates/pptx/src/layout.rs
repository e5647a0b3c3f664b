//! Width adjustment of title-like text boxes after binding.
//!
//! A box that got more text than its template width allows is widened up to
//! the next shape on its right (or the slide edge). When even that is not
//! enough, its font sizes are scaled down, never below a fixed share of the
//! template size.

use crate::shapes::{leaf_shapes, paragraph_text, write_geometry, Geometry, ShapeNode};
use crate::slide::Slide;
use crate::text::{paragraph_font_size, scale_font_sizes};
use crate::xml::XmlElement;
use deck_core::metrics::DEFAULT_FONT_SIZE_PT;
use deck_core::naming::is_expandable;
use deck_core::{CharWidthTable, LayoutSkip};

/// Horizontal padding kept between a text box and its neighbours, in EMU.
pub const H_PADDING: i64 = 20_000;

/// Smallest share of the template font size a shrink may go down to.
pub const MIN_FONT_SCALE: f64 = 0.6;

/// Share of the text box height a background must cover to grow with it.
const BACKGROUND_OVERLAP: f64 = 0.6;

#[derive(Debug, Clone)]
pub struct LayoutAdjuster {
    padding: i64,
    min_scale: f64,
    default_font_size: f64,
    widths: CharWidthTable,
}

impl Default for LayoutAdjuster {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutAdjuster {
    /// Default padding, minimum font scale, default font size and width table.
    pub fn new() -> Self {
        Self {
            padding: H_PADDING,
            min_scale: MIN_FONT_SCALE,
            default_font_size: DEFAULT_FONT_SIZE_PT,
            widths: CharWidthTable::DEFAULT,
        }
    }

    /// Horizontal gap in EMU kept between a box and its right neighbour.
    pub fn with_padding(mut self, padding: i64) -> Self {
        self.padding = padding.max(0);
        self
    }

    /// Lower bound for font scaling, as a share of the original size.
    pub fn with_min_scale(mut self, min_scale: f64) -> Self {
        self.min_scale = min_scale.clamp(0.0, 1.0);
        self
    }

    /// Size in points assumed for paragraphs without an explicit run size.
    pub fn with_default_font_size(mut self, points: f64) -> Self {
        self.default_font_size = points;
        self
    }

    /// Per-character widths used to estimate text width.
    pub fn with_width_table(mut self, widths: CharWidthTable) -> Self {
        self.widths = widths;
        self
    }

    /// Adjust every expandable text box of `slide`.
    ///
    /// `shapes` is the slide's shape tree as read after binding. Shapes that
    /// could not be measured are returned as skips; everything else is edited
    /// in place.
    ///
    /// A box whose padded text fits in the space before its right neighbour
    /// (or the slide edge) grows to fit. Otherwise it is widened to all of that
    /// space and its fonts are scaled by `available / needed`, never below the
    /// minimum scale. Shrinking therefore also widens the box.
    pub fn adjust(&self, slide: &mut Slide, shapes: &[ShapeNode], slide_width: i64) -> Vec<LayoutSkip> {
        let leaves = leaf_shapes(shapes);
        let mut frames: Vec<Option<Geometry>> = leaves.iter().map(|s| s.geometry).collect();
        let drawing_prefix = slide.drawing_prefix();
        let mut skips = Vec::new();

        for (i, shape) in leaves.iter().enumerate() {
            if !shape.is_text() || !is_expandable(&shape.name) {
                continue;
            }
            let Some(frame) = frames[i] else {
                skips.push(self.skip(slide.number, shape, "shape has no position or size"));
                continue;
            };
            let Some(needed) = slide.element(&shape.locator).map(|el| self.needed_width(el, frame)) else {
                skips.push(self.skip(slide.number, shape, "shape element not found"));
                continue;
            };
            if needed <= frame.width {
                continue;
            }

            let limit = leaves
                .iter()
                .zip(&frames)
                .enumerate()
                .filter(|(j, _)| *j != i)
                .filter_map(|(_, (_, g))| *g)
                .filter(|g| g.vertical_overlap(&frame) > 0 && g.left > frame.left)
                .map(|g| g.left)
                .fold(slide_width, i64::min)
                - self.padding;
            let available = frame.width.max(limit - frame.left);

            let wanted = needed + self.padding;
            let (new_width, ratio) = if wanted <= available {
                (frame.width.max(wanted), 1.0)
            } else {
                (available, available as f64 / needed as f64)
            };

            if new_width != frame.width {
                let grown = Geometry {
                    width: new_width,
                    ..frame
                };
                if let Some(el) = slide.element_mut(&shape.locator) {
                    write_geometry(el, &grown, &drawing_prefix);
                }
                frames[i] = Some(grown);
                log::debug!(
                    "Slide {}: widened \"{}\" from {} to {} EMU",
                    slide.number,
                    shape.name,
                    frame.width,
                    new_width
                );

                if let Some(b) = self.background_of(&leaves, &frames, i) {
                    let background = frames[b].unwrap_or(grown);
                    let left = background.left.min(grown.left);
                    let right = background.right().max(grown.right() + self.padding);
                    let resized = Geometry::new(left, background.top, right - left, background.height);
                    if resized != background {
                        if let Some(el) = slide.element_mut(&leaves[b].locator) {
                            write_geometry(el, &resized, &drawing_prefix);
                        }
                        frames[b] = Some(resized);
                    }
                }
            }

            if ratio < 1.0 {
                let changed = slide
                    .element_mut(&shape.locator)
                    .map(|el| scale_font_sizes(el, ratio, self.min_scale))
                    .unwrap_or(0);
                log::debug!(
                    "Slide {}: scaled {} runs of \"{}\" by {:.2}",
                    slide.number,
                    changed,
                    shape.name,
                    ratio.max(self.min_scale)
                );
            }
        }
        skips
    }

    /// Estimated width of the widest paragraph, never less than the box.
    fn needed_width(&self, element: &XmlElement, frame: Geometry) -> i64 {
        let widest = element
            .child("txBody")
            .map(|body| {
                body.children_named("p")
                    .map(|p| {
                        let size = paragraph_font_size(p).unwrap_or(self.default_font_size);
                        paragraph_text(p)
                            .split('\n')
                            .map(|line| self.widths.line_width_emu(line, size))
                            .fold(0.0, f64::max)
                    })
                    .fold(0.0, f64::max)
            })
            .unwrap_or(0.0);
        frame.width.max(widest.ceil() as i64)
    }

    /// The widest plain shape sitting behind the text box at `target`,
    /// starting at or before its left edge.
    fn background_of(&self, leaves: &[&ShapeNode], frames: &[Option<Geometry>], target: usize) -> Option<usize> {
        let frame = frames[target]?;
        leaves
            .iter()
            .enumerate()
            .filter(|(j, s)| {
                *j != target && !s.is_text() && !s.is_picture_target() && !s.is_group() && !s.is_connector
            })
            .filter_map(|(j, _)| Some((j, frames[j]?)))
            .filter(|(_, g)| {
                g.left <= frame.left
                    && frame.height > 0
                    && g.vertical_overlap(&frame) as f64 / frame.height as f64 >= BACKGROUND_OVERLAP
            })
            .max_by_key(|(_, g)| g.width)
            .map(|(j, _)| j)
    }

    fn skip(&self, slide: usize, shape: &ShapeNode, reason: &str) -> LayoutSkip {
        let skip = LayoutSkip {
            slide,
            shape: shape.name.clone(),
            reason: reason.to_string(),
        };
        log::warn!("{}", skip);
        skip
    }
}
