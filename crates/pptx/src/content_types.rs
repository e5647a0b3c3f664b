//! `[Content_Types].xml` rewriting.

use crate::xml::{XmlDocument, XmlElement, XmlNode};
use deck_core::Result;

/// The package's content type declarations.
#[derive(Debug, Clone)]
pub struct ContentTypes {
    doc: XmlDocument,
}

impl ContentTypes {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            doc: XmlDocument::parse(bytes)?,
        })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.doc.to_bytes()
    }

    /// `PartName`s of all overrides, in document order.
    pub fn override_part_names(&self) -> Vec<&str> {
        self.doc
            .root
            .children_named("Override")
            .filter_map(|e| e.attr("PartName"))
            .collect()
    }

    /// Content type declared for a part, by override or by extension default.
    pub fn content_type_of(&self, part_name: &str) -> Option<&str> {
        let part_name = normalize_part_name(part_name);
        if let Some(ct) = self
            .doc
            .root
            .children_named("Override")
            .find(|e| e.attr("PartName") == Some(part_name.as_str()))
            .and_then(|e| e.attr("ContentType"))
        {
            return Some(ct);
        }
        let ext = part_name.rsplit_once('.')?.1;
        self.doc
            .root
            .children_named("Default")
            .find(|e| e.attr("Extension").is_some_and(|x| x.eq_ignore_ascii_case(ext)))
            .and_then(|e| e.attr("ContentType"))
    }

    /// Remove every override whose part name starts with `prefix` (`/ppt/slides/slide`).
    pub fn remove_overrides_with_prefix(&mut self, prefix: &str) -> usize {
        let before = self.doc.root.children.len();
        self.doc.root.children.retain(|n| match n {
            XmlNode::Element(e) if e.is("Override") => {
                !e.attr("PartName").is_some_and(|p| p.starts_with(prefix))
            }
            _ => true,
        });
        before - self.doc.root.children.len()
    }

    /// Declare the content type of one part.
    pub fn add_override(&mut self, part_name: &str, content_type: &str) {
        let part_name = normalize_part_name(part_name);
        self.doc.root.children.retain(|n| match n {
            XmlNode::Element(e) if e.is("Override") => {
                e.attr("PartName") != Some(part_name.as_str())
            }
            _ => true,
        });
        self.doc.root.push(
            XmlElement::new("Override")
                .with_attr("PartName", part_name)
                .with_attr("ContentType", content_type),
        );
    }

    /// Declare a default content type for an extension unless one exists.
    ///
    /// Defaults are kept ahead of overrides, as Office writes them.
    pub fn ensure_default(&mut self, extension: &str, content_type: &str) {
        let exists = self
            .doc
            .root
            .children_named("Default")
            .any(|e| e.attr("Extension").is_some_and(|x| x.eq_ignore_ascii_case(extension)));
        if exists {
            return;
        }
        let element = XmlElement::new("Default")
            .with_attr("Extension", extension)
            .with_attr("ContentType", content_type);
        let pos = self
            .doc
            .root
            .position_of("Override")
            .unwrap_or(self.doc.root.children.len());
        self.doc
            .root
            .children
            .insert(pos, XmlNode::Element(element));
    }
}

/// Part names in content types always start with `/`.
fn normalize_part_name(part: &str) -> String {
    if part.starts_with('/') {
        part.to_string()
    } else {
        format!("/{}", part)
    }
}
