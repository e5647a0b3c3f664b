//! Shape tree of one slide.
//!
//! A light view over the slide XML: one [`ShapeNode`] per shape element of
//! `p:spTree`, with groups holding their members. Each node remembers where
//! its element lives (a child-index locator from the shape tree) so that the
//! binder and layout adjuster can go back and edit it.

use crate::xml::{prefix_of, XmlElement, XmlNode};
use deck_core::naming::{is_picture_name, UNNAMED_LABEL};

/// Element names that are shapes in a shape tree.
const SHAPE_ELEMENTS: &[&str] = &["sp", "pic", "grpSp", "cxnSp", "graphicFrame"];

/// Position and size in EMU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl Geometry {
    pub fn new(left: i64, top: i64, width: i64, height: i64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> i64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i64 {
        self.top + self.height
    }

    /// Height of the band shared with `other`; zero or negative when apart.
    pub fn vertical_overlap(&self, other: &Geometry) -> i64 {
        self.bottom().min(other.bottom()) - self.top.max(other.top)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    /// A shape with a text body.
    Text,
    /// A native picture.
    Picture,
    Group,
    /// Anything else: connectors, tables, charts, shapes without text bodies.
    Other,
}

/// The `p:ph` reference of a placeholder shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderRef {
    pub ph_type: Option<String>,
    pub idx: Option<String>,
}

impl PlaceholderRef {
    /// Placeholder type, with the schema default applied.
    pub fn kind(&self) -> &str {
        self.ph_type.as_deref().unwrap_or("obj")
    }

    pub fn is_picture(&self) -> bool {
        self.kind() == "pic"
    }
}

/// One shape of a slide.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeNode {
    /// Trimmed `cNvPr/@name`, or `元素{n}` for unnamed shapes.
    pub name: String,
    pub kind: ShapeKind,
    pub geometry: Option<Geometry>,
    /// Child indices from `p:spTree` down to the element.
    pub locator: Vec<usize>,
    pub children: Vec<ShapeNode>,
    pub placeholder: Option<PlaceholderRef>,
    /// Visible text, paragraphs separated by `\n`.
    pub text: String,
    pub is_connector: bool,
}

impl ShapeNode {
    /// Read one shape element. `position` is the 1-based position among its
    /// sibling shapes and names unnamed shapes.
    pub fn from_element(element: &XmlElement, locator: Vec<usize>, position: usize) -> Self {
        let props = non_visual_props(element);
        let name = props
            .and_then(|nv| nv.child("cNvPr"))
            .and_then(|c| c.attr("name"))
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}{}", UNNAMED_LABEL, position));

        let placeholder = props
            .and_then(|nv| nv.find_path(&["nvPr", "ph"]))
            .map(|ph| PlaceholderRef {
                ph_type: ph.attr("type").map(str::to_string),
                idx: ph.attr("idx").map(str::to_string),
            });

        let kind = match element.local_name() {
            "sp" if element.child("txBody").is_some() => ShapeKind::Text,
            "pic" => ShapeKind::Picture,
            "grpSp" => ShapeKind::Group,
            _ => ShapeKind::Other,
        };

        let children = if kind == ShapeKind::Group {
            read_children(element, &locator)
        } else {
            Vec::new()
        };

        Self {
            name,
            kind,
            geometry: read_geometry(element),
            text: shape_text(element),
            is_connector: element.is("cxnSp"),
            locator,
            children,
            placeholder,
        }
    }

    pub fn is_text(&self) -> bool {
        self.kind == ShapeKind::Text
    }

    pub fn is_group(&self) -> bool {
        self.kind == ShapeKind::Group
    }

    /// Whether content bound to this shape is a picture.
    pub fn is_picture_target(&self) -> bool {
        is_picture_name(&self.name)
            || self.kind == ShapeKind::Picture
            || self.placeholder.as_ref().is_some_and(PlaceholderRef::is_picture)
    }
}

/// Read every shape below a shape tree (or group) element.
pub fn read_shape_tree(sp_tree: &XmlElement) -> Vec<ShapeNode> {
    read_children(sp_tree, &[])
}

fn read_children(parent: &XmlElement, base: &[usize]) -> Vec<ShapeNode> {
    let mut shapes = Vec::new();
    for (i, node) in parent.children.iter().enumerate() {
        let XmlNode::Element(element) = node else {
            continue;
        };
        if !SHAPE_ELEMENTS.contains(&element.local_name()) {
            continue;
        }
        let mut locator = base.to_vec();
        locator.push(i);
        shapes.push(ShapeNode::from_element(element, locator, shapes.len() + 1));
    }
    shapes
}

/// Every shape with its structural path (ancestor group names, then its own
/// name), depth first with each group before its members.
pub fn shape_paths(shapes: &[ShapeNode]) -> Vec<(Vec<String>, &ShapeNode)> {
    fn walk<'a>(shapes: &'a [ShapeNode], parent: &[String], out: &mut Vec<(Vec<String>, &'a ShapeNode)>) {
        for shape in shapes {
            let mut path = parent.to_vec();
            path.push(shape.name.clone());
            out.push((path.clone(), shape));
            walk(&shape.children, &path, out);
        }
    }
    let mut out = Vec::new();
    walk(shapes, &[], &mut out);
    out
}

/// Every shape that is not a group, depth first.
pub fn leaf_shapes(shapes: &[ShapeNode]) -> Vec<&ShapeNode> {
    fn walk<'a>(shapes: &'a [ShapeNode], out: &mut Vec<&'a ShapeNode>) {
        for shape in shapes {
            if shape.is_group() {
                walk(&shape.children, out);
            } else {
                out.push(shape);
            }
        }
    }
    let mut out = Vec::new();
    walk(shapes, &mut out);
    out
}

/// The `p:nv*Pr` block of a shape element.
pub fn non_visual_props(element: &XmlElement) -> Option<&XmlElement> {
    element
        .elements()
        .find(|e| e.local_name().starts_with("nv") && e.local_name().ends_with("Pr"))
}

/// The `a:xfrm` (or `p:xfrm` on graphic frames) of a shape element.
fn transform(element: &XmlElement) -> Option<&XmlElement> {
    element.child("xfrm").or_else(|| {
        element
            .child("spPr")
            .or_else(|| element.child("grpSpPr"))?
            .child("xfrm")
    })
}

/// Geometry stored on the element itself.
pub fn read_geometry(element: &XmlElement) -> Option<Geometry> {
    let xfrm = transform(element)?;
    let off = xfrm.child("off")?;
    let ext = xfrm.child("ext")?;
    let num = |el: &XmlElement, key: &str| el.attr(key)?.parse::<i64>().ok();
    Some(Geometry::new(
        num(off, "x")?,
        num(off, "y")?,
        num(ext, "cx")?,
        num(ext, "cy")?,
    ))
}

/// Write geometry onto a shape element, creating the transform if needed.
///
/// `drawing_prefix` is the slide's prefix for the DrawingML namespace.
pub fn write_geometry(element: &mut XmlElement, geometry: &Geometry, drawing_prefix: &str) {
    let xfrm = if element.child("xfrm").is_some() {
        element.child_mut("xfrm")
    } else {
        let props_name = if element.is("grpSp") { "grpSpPr" } else { "spPr" };
        if element.child(props_name).is_none() {
            let prefix = prefix_of(&element.name).unwrap_or("p");
            let at = non_visual_props(element)
                .and_then(|nv| element.position_of(nv.local_name()))
                .map(|i| i + 1)
                .unwrap_or(0);
            element.children.insert(
                at,
                XmlNode::Element(XmlElement::new(format!("{}:{}", prefix, props_name))),
            );
        }
        let props = element.child_mut(props_name);
        match props {
            Some(props) => {
                if props.child("xfrm").is_none() {
                    props
                        .children
                        .insert(0, XmlNode::Element(XmlElement::new(format!("{}:xfrm", drawing_prefix))));
                }
                props.child_mut("xfrm")
            }
            None => None,
        }
    };
    let Some(xfrm) = xfrm else {
        return;
    };

    let prefix = prefix_of(&xfrm.name)
        .map(str::to_string)
        .filter(|p| p != "p")
        .unwrap_or_else(|| drawing_prefix.to_string());

    if xfrm.child("off").is_none() {
        xfrm.children
            .insert(0, XmlNode::Element(XmlElement::new(format!("{}:off", prefix))));
    }
    if let Some(off) = xfrm.child_mut("off") {
        off.set_attr("x", geometry.left.to_string());
        off.set_attr("y", geometry.top.to_string());
    }
    if xfrm.child("ext").is_none() {
        let at = xfrm.position_of("off").map(|i| i + 1).unwrap_or(0);
        xfrm.children
            .insert(at, XmlNode::Element(XmlElement::new(format!("{}:ext", prefix))));
    }
    if let Some(ext) = xfrm.child_mut("ext") {
        ext.set_attr("cx", geometry.width.to_string());
        ext.set_attr("cy", geometry.height.to_string());
    }
}

/// Visible text of a shape's text body, paragraphs separated by `\n`.
pub fn shape_text(element: &XmlElement) -> String {
    let Some(body) = element.child("txBody") else {
        return String::new();
    };
    body.children_named("p")
        .map(paragraph_text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Text of one `a:p`, line breaks included.
pub fn paragraph_text(paragraph: &XmlElement) -> String {
    let mut out = String::new();
    for child in paragraph.elements() {
        match child.local_name() {
            "r" | "fld" => {
                if let Some(t) = child.child("t") {
                    out.push_str(&t.text());
                }
            }
            "br" => out.push('\n'),
            _ => {}
        }
    }
    out
}
