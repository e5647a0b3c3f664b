//! Connector preservation.
//!
//! Connectors (`p:cxnSp`) carry start/end references to the shapes they join.
//! Editing a slide can leave those references or the connector geometry in a
//! state PowerPoint redraws differently, so the top-level connectors of every
//! slide are captured as raw XML before editing and put back afterwards.

use crate::constants::slide_part;
use crate::package::Package;
use crate::xml::{parse_fragment, XmlElement, XmlNode};
use deck_core::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// Raw connector XML per slide number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectorSnapshot {
    slides: BTreeMap<usize, Vec<String>>,
}

impl ConnectorSnapshot {
    /// An empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether no slide had a connector.
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    /// Number of slides with at least one connector.
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    /// Connectors captured for slide `n`.
    pub fn connectors(&self, n: usize) -> &[String] {
        self.slides.get(&n).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Slide numbers with their captured connectors, in slide order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.slides.iter().map(|(n, xml)| (*n, xml.as_slice()))
    }
}

/// Capture the connectors of every slide of a package archive.
pub fn snapshot(package_bytes: &[u8]) -> Result<ConnectorSnapshot> {
    snapshot_package(&Package::from_bytes(package_bytes)?)
}

/// Capture the connectors of every slide of an in-memory package.
pub fn snapshot_package(package: &Package) -> Result<ConnectorSnapshot> {
    let mut snapshot = ConnectorSnapshot::new();
    for (n, part) in package.slide_parts() {
        let doc = package.xml(part)?;
        let Some(tree) = doc.root.find_path(&["cSld", "spTree"]) else {
            continue;
        };
        let connectors = tree
            .elements()
            .filter(|e| e.is("cxnSp"))
            .map(XmlElement::to_xml_string)
            .collect::<Result<Vec<_>>>()?;
        if !connectors.is_empty() {
            log::debug!("Slide {}: captured {} connectors", n, connectors.len());
            snapshot.slides.insert(n, connectors);
        }
    }
    Ok(snapshot)
}

/// Put captured connectors back into the matching slides.
///
/// The top-level connectors now on each captured slide are replaced by the
/// snapshot. Returns the number of slides rewritten.
pub fn restore_package(package: &mut Package, snapshot: &ConnectorSnapshot) -> Result<usize> {
    let mut restored = 0;
    for (n, connectors) in snapshot.iter() {
        let part = slide_part(n);
        if !package.contains(&part) {
            log::debug!("Slide {} not in output; connectors dropped", n);
            continue;
        }
        let mut doc = package.xml(&part)?;
        let Some(tree) = doc.root.find_path_mut(&["cSld", "spTree"]) else {
            continue;
        };

        tree.children
            .retain(|node| !matches!(node, XmlNode::Element(e) if e.is("cxnSp")));
        let mut at = tree.position_of("extLst").unwrap_or(tree.children.len());
        for xml in connectors {
            tree.children.insert(at, XmlNode::Element(parse_fragment(xml)?));
            at += 1;
        }

        package.insert_xml(part, &doc)?;
        restored += 1;
    }
    if restored > 0 {
        log::info!("Restored connectors on {} slides", restored);
    }
    Ok(restored)
}

/// Restore connectors into the package file at `path`.
///
/// The file is only rewritten when a slide was changed; returns whether it was.
pub fn restore(path: &Path, snapshot: &ConnectorSnapshot) -> Result<bool> {
    if snapshot.is_empty() {
        return Ok(false);
    }
    let mut package = Package::from_bytes(&std::fs::read(path)?)?;
    if restore_package(&mut package, snapshot)? == 0 {
        return Ok(false);
    }
    std::fs::write(path, package.to_bytes()?)?;
    Ok(true)
}
