//! One slide of an output package, parsed for editing.

use crate::constants::{ns, rel_types, rels_part_for, slide_part};
use crate::package::Package;
use crate::rels::{part_dir, resolve_target, Relationships};
use crate::shapes::{leaf_shapes, read_shape_tree, Geometry, PlaceholderRef, ShapeNode};
use crate::xml::{XmlDocument, XmlElement, XmlNode};
use deck_core::Result;

/// A slide part with its relationships, loaded from a package.
#[derive(Debug, Clone)]
pub struct Slide {
    /// 1-based slide number in the output.
    pub number: usize,
    pub part: String,
    pub doc: XmlDocument,
    pub rels: Relationships,
    /// Placeholder geometry declared on the slide layout.
    layout_placeholders: Vec<(PlaceholderRef, Geometry)>,
}

impl Slide {
    /// Load output slide `number` from a package.
    pub fn load(package: &Package, number: usize) -> Result<Self> {
        let part = slide_part(number);
        let doc = package.xml(&part)?;
        let rels = match package.part(&rels_part_for(&part)) {
            Some(bytes) => Relationships::parse(bytes)?,
            None => Relationships::new(),
        };
        let layout_placeholders = load_layout_placeholders(package, &part, &rels);

        Ok(Self {
            number,
            part,
            doc,
            rels,
            layout_placeholders,
        })
    }

    /// Write the slide and its relationships back into the package.
    pub fn store(&self, package: &mut Package) -> Result<()> {
        package.insert_xml(self.part.as_str(), &self.doc)?;
        if !self.rels.is_empty() || package.contains(&rels_part_for(&self.part)) {
            package.insert(rels_part_for(&self.part), self.rels.to_bytes()?);
        }
        Ok(())
    }

    pub fn shape_tree(&self) -> Option<&XmlElement> {
        self.doc.root.find_path(&["cSld", "spTree"])
    }

    pub fn shape_tree_mut(&mut self) -> Option<&mut XmlElement> {
        self.doc.root.find_path_mut(&["cSld", "spTree"])
    }

    /// Read the shape tree. Placeholders without geometry of their own get the
    /// geometry of their slide layout placeholder.
    pub fn shapes(&self) -> Vec<ShapeNode> {
        let Some(tree) = self.shape_tree() else {
            return Vec::new();
        };
        let mut shapes = read_shape_tree(tree);
        self.inherit_geometry(&mut shapes);
        shapes
    }

    fn inherit_geometry(&self, shapes: &mut [ShapeNode]) {
        for shape in shapes {
            if shape.geometry.is_none() {
                if let Some(ph) = &shape.placeholder {
                    shape.geometry = self.layout_geometry(ph);
                }
            }
            self.inherit_geometry(&mut shape.children);
        }
    }

    /// Geometry of the layout placeholder matching `ph`, by index and then by type.
    pub fn layout_geometry(&self, ph: &PlaceholderRef) -> Option<Geometry> {
        if let Some(idx) = &ph.idx {
            let by_idx = self
                .layout_placeholders
                .iter()
                .find(|(candidate, _)| candidate.idx.as_ref() == Some(idx));
            if let Some((_, geometry)) = by_idx {
                return Some(*geometry);
            }
        }
        self.layout_placeholders
            .iter()
            .find(|(candidate, _)| candidate.kind() == ph.kind())
            .map(|(_, geometry)| *geometry)
    }

    /// The element at a shape locator.
    pub fn element(&self, locator: &[usize]) -> Option<&XmlElement> {
        let mut current = self.shape_tree()?;
        for &i in locator {
            current = match current.children.get(i)? {
                XmlNode::Element(e) => e,
                _ => return None,
            };
        }
        Some(current)
    }

    pub fn element_mut(&mut self, locator: &[usize]) -> Option<&mut XmlElement> {
        let mut current = self.shape_tree_mut()?;
        for &i in locator {
            current = match current.children.get_mut(i)? {
                XmlNode::Element(e) => e,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Replace the element at a locator, keeping its position among its siblings.
    pub fn replace_element(&mut self, locator: &[usize], element: XmlElement) -> bool {
        let Some((&last, parent)) = locator.split_last() else {
            return false;
        };
        match self.element_mut(parent).and_then(|p| p.children.get_mut(last)) {
            Some(slot) => {
                *slot = XmlNode::Element(element);
                true
            }
            None => false,
        }
    }

    /// Remove the element at a locator. Later siblings shift down by one.
    pub fn remove_element(&mut self, locator: &[usize]) -> Option<XmlElement> {
        let (&last, parent) = locator.split_last()?;
        let parent = self.element_mut(parent)?;
        if last >= parent.children.len() {
            return None;
        }
        match parent.children.remove(last) {
            XmlNode::Element(e) => Some(e),
            other => {
                parent.children.insert(last, other);
                None
            }
        }
    }

    /// A `cNvPr/@id` not used on this slide.
    pub fn next_shape_id(&self) -> u32 {
        self.doc
            .root
            .descendants_named("cNvPr")
            .iter()
            .filter_map(|e| e.attr("id")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Prefix bound to `uri` on the slide root, declaring `fallback` if unbound.
    pub fn namespace_prefix(&mut self, uri: &str, fallback: &str) -> String {
        if let Some(prefix) = self.doc.root.prefix_for_namespace(uri) {
            return prefix.to_string();
        }
        self.doc.root.set_attr(format!("xmlns:{}", fallback), uri);
        fallback.to_string()
    }

    /// Prefix of the DrawingML namespace (`a` in every Office-written slide).
    pub fn drawing_prefix(&self) -> String {
        self.doc
            .root
            .prefix_for_namespace(ns::DRAWING)
            .unwrap_or("a")
            .to_string()
    }
}

fn load_layout_placeholders(
    package: &Package,
    slide_part: &str,
    rels: &Relationships,
) -> Vec<(PlaceholderRef, Geometry)> {
    let Some(layout_rel) = rels.first_of_type(rel_types::SLIDE_LAYOUT) else {
        return Vec::new();
    };
    let layout_part = resolve_target(part_dir(slide_part), &layout_rel.target);
    let layout = match package.xml(&layout_part) {
        Ok(doc) => doc,
        Err(e) => {
            log::debug!("Slide layout '{}' unavailable: {}", layout_part, e);
            return Vec::new();
        }
    };
    let Some(tree) = layout.root.find_path(&["cSld", "spTree"]) else {
        return Vec::new();
    };

    let shapes = read_shape_tree(tree);
    leaf_shapes(&shapes)
        .into_iter()
        .filter_map(|shape| Some((shape.placeholder.clone()?, shape.geometry?)))
        .collect()
}
