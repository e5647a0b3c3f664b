//! `ppt/presentation.xml`: slide order, slide-ID list and slide size.

use crate::constants::{
    ns, rel_types, DEFAULT_SLIDE_WIDTH, PRESENTATION_PART, PRESENTATION_RELS_PART, SLIDE_ID_BASE,
};
use crate::package::Package;
use crate::rels::{part_dir, resolve_target, Relationships};
use crate::xml::{prefix_of, XmlDocument, XmlElement, XmlNode};
use deck_core::Result;

/// Children of `p:presentation` that precede `p:sldIdLst` in schema order.
const BEFORE_SLIDE_ID_LIST: &[&str] = &["sldMasterIdLst", "notesMasterIdLst", "handoutMasterIdLst"];

/// Slide part paths in presentation order.
///
/// Follows `p:sldIdLst` through the presentation relationships. Templates
/// without a slide-ID list fall back to slide part numbering.
pub fn slide_order(package: &Package) -> Result<Vec<String>> {
    let pres = package.xml(PRESENTATION_PART)?;
    let rels = Relationships::parse(package.require(PRESENTATION_RELS_PART)?)?;
    let base = part_dir(PRESENTATION_PART);

    let mut order = Vec::new();
    if let Some(list) = pres.root.child("sldIdLst") {
        for sld_id in list.children_named("sldId") {
            let Some(rid) = relationship_id(sld_id) else {
                continue;
            };
            match rels.get(rid) {
                Some(rel) if rel.rel_type == rel_types::SLIDE => {
                    let path = resolve_target(base, &rel.target);
                    if package.contains(&path) {
                        order.push(path);
                    } else {
                        log::warn!("Slide list entry {} points at missing part '{}'", rid, path);
                    }
                }
                _ => log::warn!("Slide list entry {} has no slide relationship", rid),
            }
        }
    }

    if order.is_empty() {
        order = package
            .slide_parts()
            .into_iter()
            .map(|(_, path)| path.to_string())
            .collect();
    }
    Ok(order)
}

/// The relationship id (`r:id`) of a `p:sldId`, whatever prefix it uses.
fn relationship_id(sld_id: &XmlElement) -> Option<&str> {
    sld_id
        .attributes
        .iter()
        .find(|(k, _)| k.contains(':') && k.ends_with(":id"))
        .map(|(_, v)| v.as_str())
}

/// Slide width in EMU from `p:sldSz`.
pub fn slide_width(pres: &XmlDocument) -> i64 {
    pres.root
        .child("sldSz")
        .and_then(|e| e.attr("cx"))
        .and_then(|cx| cx.parse().ok())
        .unwrap_or(DEFAULT_SLIDE_WIDTH)
}

/// Replace the slide-ID list with one entry per relationship id, in order.
pub fn rebuild_slide_id_list(pres: &mut XmlDocument, rel_ids: &[String]) {
    let root = &mut pres.root;
    let p = prefix_of(&root.name).map(str::to_string);
    let r = match root.prefix_for_namespace(ns::OFFICE_RELS) {
        Some(prefix) => prefix.to_string(),
        None => {
            root.set_attr("xmlns:r", ns::OFFICE_RELS);
            "r".to_string()
        }
    };

    let mut list = XmlElement::new(qualify(&p, "sldIdLst"));
    for (i, rid) in rel_ids.iter().enumerate() {
        list.push(
            XmlElement::new(qualify(&p, "sldId"))
                .with_attr("id", (SLIDE_ID_BASE + i as u32).to_string())
                .with_attr(format!("{}:id", r), rid.as_str()),
        );
    }

    if let Some(pos) = root.position_of("sldIdLst") {
        root.children[pos] = XmlNode::Element(list);
        return;
    }

    let insert_at = root
        .children
        .iter()
        .rposition(|n| matches!(n, XmlNode::Element(e) if BEFORE_SLIDE_ID_LIST.contains(&e.local_name())))
        .map(|i| i + 1)
        .unwrap_or(0);
    root.children.insert(insert_at, XmlNode::Element(list));
}

/// Drop structures that refer to template slide IDs: custom shows and section lists.
pub fn drop_slide_references(pres: &mut XmlDocument) {
    let root = &mut pres.root;
    if root.child("custShowLst").is_some() {
        log::debug!("Dropping custom shows that reference template slides");
        root.remove_children("custShowLst");
    }

    let mut empty_ext_list = false;
    if let Some(ext_list) = root.child_mut("extLst") {
        let before = ext_list.elements().count();
        ext_list.children.retain(|n| match n {
            XmlNode::Element(ext) if ext.is("ext") => ext.child("sectionLst").is_none(),
            _ => true,
        });
        let after = ext_list.elements().count();
        if after < before {
            log::debug!("Dropping section list that references template slides");
        }
        empty_ext_list = after == 0;
    }
    if empty_ext_list {
        root.remove_children("extLst");
    }
}

fn qualify(prefix: &Option<String>, local: &str) -> String {
    match prefix {
        Some(p) => format!("{}:{}", p, local),
        None => local.to_string(),
    }
}
