//! Relationship (`.rels`) parts.

use crate::constants::ns;
use crate::xml::{XmlDocument, XmlElement};
use deck_core::Result;
use std::collections::HashSet;

/// One `Relationship` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    /// `External` for links outside the package.
    pub target_mode: Option<String>,
}

impl Relationship {
    pub fn new(id: impl Into<String>, rel_type: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rel_type: rel_type.into(),
            target: target.into(),
            target_mode: None,
        }
    }

    pub fn is_external(&self) -> bool {
        self.target_mode.as_deref() == Some("External")
    }
}

/// The relationships of one source part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Relationships {
    entries: Vec<Relationship>,
}

impl Relationships {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `.rels` part.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let doc = XmlDocument::parse(bytes)?;
        let entries = doc
            .root
            .children_named("Relationship")
            .map(|e| Relationship {
                id: e.attr("Id").unwrap_or_default().to_string(),
                rel_type: e.attr("Type").unwrap_or_default().to_string(),
                target: e.attr("Target").unwrap_or_default().to_string(),
                target_mode: e.attr("TargetMode").map(str::to_string),
            })
            .collect();
        Ok(Self { entries })
    }

    /// Serialize as a `.rels` part.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut root = XmlElement::new("Relationships").with_attr("xmlns", ns::PACKAGE_RELS);
        for rel in &self.entries {
            let mut el = XmlElement::new("Relationship")
                .with_attr("Id", rel.id.as_str())
                .with_attr("Type", rel.rel_type.as_str())
                .with_attr("Target", rel.target.as_str());
            if let Some(mode) = &rel.target_mode {
                el.set_attr("TargetMode", mode.as_str());
            }
            root.push(el);
        }
        XmlDocument::new(root).to_bytes()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Relationship> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.entries.iter().find(|r| r.id == id)
    }

    /// First relationship of a given type.
    pub fn first_of_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.entries.iter().find(|r| r.rel_type == rel_type)
    }

    /// Highest numeric suffix among `rIdN` ids, or 0.
    pub fn max_numeric_id(&self) -> u32 {
        self.entries
            .iter()
            .filter_map(|r| r.id.strip_prefix("rId")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
    }

    /// An id not used by any entry, above every numeric id when there is room.
    pub fn next_id(&self) -> String {
        let next = match self.max_numeric_id().checked_add(1) {
            Some(n) => n,
            None => self.lowest_free_id(),
        };
        format!("rId{}", next)
    }

    fn lowest_free_id(&self) -> u32 {
        let used: HashSet<&str> = self.entries.iter().map(|r| r.id.as_str()).collect();
        (1..=u32::MAX)
            .find(|n| !used.contains(format!("rId{}", n).as_str()))
            .unwrap_or(u32::MAX)
    }

    pub fn push(&mut self, rel: Relationship) {
        self.entries.push(rel);
    }

    /// Add a relationship under a fresh id and return that id.
    pub fn add(&mut self, rel_type: &str, target: &str) -> String {
        let id = self.next_id();
        self.entries.push(Relationship::new(id.clone(), rel_type, target));
        id
    }

    /// Remove every relationship of a given type.
    pub fn remove_type(&mut self, rel_type: &str) {
        self.entries.retain(|r| r.rel_type != rel_type);
    }
}

/// Resolve a relationship target against the directory of its source part.
///
/// `("ppt/slides", "../tags/tag1.xml")` → `ppt/tags/tag1.xml`. Absolute
/// targets (`/ppt/...`) are taken from the package root.
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    let mut segments: Vec<&str> = if target.starts_with('/') {
        Vec::new()
    } else {
        base_dir.split('/').filter(|s| !s.is_empty()).collect()
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Express `part` relative to the directory `from_dir`.
///
/// `("ppt/slides", "ppt/tags/tag4.xml")` → `../tags/tag4.xml`.
pub fn relative_target(from_dir: &str, part: &str) -> String {
    let from: Vec<&str> = from_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = part.split('/').filter(|s| !s.is_empty()).collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out: Vec<&str> = std::iter::repeat("..").take(from.len() - common).collect();
    out.extend(&to[common..]);
    out.join("/")
}

/// Directory of a part path (`ppt/slides/slide1.xml` → `ppt/slides`).
pub fn part_dir(part: &str) -> &str {
    part.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::rel_types;

    const RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/tags" Target="../tags/tag1.xml"/><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout2.xml"/><Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/></Relationships>"#;

    #[test]
    fn test_parse_and_ids() {
        let rels = Relationships::parse(RELS.as_bytes()).unwrap();
        assert_eq!(rels.len(), 3);
        assert_eq!(rels.max_numeric_id(), 9);
        assert_eq!(rels.next_id(), "rId10");
        assert!(rels.get("rId9").unwrap().is_external());
        assert_eq!(
            rels.first_of_type(rel_types::SLIDE_LAYOUT).unwrap().target,
            "../slideLayouts/slideLayout2.xml"
        );
    }

    #[test]
    fn test_next_id_after_largest_id() {
        let mut rels = Relationships::parse(RELS.as_bytes()).unwrap();
        rels.push(Relationship::new("rId4294967295", rel_types::IMAGE, "../media/image1.png"));
        assert_eq!(rels.next_id(), "rId2");
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut rels = Relationships::parse(RELS.as_bytes()).unwrap();
        let id = rels.add(rel_types::IMAGE, "../media/image1.png");
        assert_eq!(id, "rId10");
        rels.remove_type(rel_types::TAGS);
        let again = Relationships::parse(&rels.to_bytes().unwrap()).unwrap();
        assert_eq!(again, rels);
        assert_eq!(again.len(), 3);
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("ppt/slides", "../tags/tag1.xml"), "ppt/tags/tag1.xml");
        assert_eq!(resolve_target("ppt", "slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(resolve_target("ppt/slides", "/ppt/media/a.png"), "ppt/media/a.png");
        assert_eq!(resolve_target("ppt/slides", "./x.xml"), "ppt/slides/x.xml");
    }

    #[test]
    fn test_relative_target() {
        assert_eq!(relative_target("ppt/slides", "ppt/tags/tag4.xml"), "../tags/tag4.xml");
        assert_eq!(relative_target("ppt", "ppt/slides/slide2.xml"), "slides/slide2.xml");
        assert_eq!(
            relative_target("ppt/notesSlides", "ppt/slides/slide1.xml"),
            "../slides/slide1.xml"
        );
    }

    #[test]
    fn test_part_dir() {
        assert_eq!(part_dir("ppt/slides/slide1.xml"), "ppt/slides");
        assert_eq!(part_dir("root.xml"), "");
    }
}
