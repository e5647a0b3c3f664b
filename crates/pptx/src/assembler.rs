//! Package-level slide cloning.
//!
//! Builds a new package holding the template slides named by a content plan,
//! in plan order, working directly on the zip parts. Relationship ids, the
//! slide-ID list and content-type overrides are regenerated so the result
//! opens without a repair prompt:
//!
//! - slides are renumbered `slide1..slideN`, repeats become independent copies
//! - presentation slide relationships get fresh ids above every existing one
//! - every tag part referenced by a cloned slide is copied to a new unique part
//! - notes slides are copied per output slide and pointed back at their slide

use crate::constants::{
    content_types as ct, rel_types, rels_part_for, slide_part, slide_rels_part, CONTENT_TYPES_PART,
    NOTES_SLIDES_DIR, PRESENTATION_PART, PRESENTATION_RELS_PART, SLIDES_DIR, TAGS_DIR,
};
use crate::content_types::ContentTypes;
use crate::package::{slide_number, tag_number, Package, PackagePart};
use crate::presentation::{drop_slide_references, rebuild_slide_id_list, slide_order};
use crate::rels::{part_dir, relative_target, resolve_target, Relationship, Relationships};
use crate::selector::{select_slides, SelectedSlide};
use deck_core::{ContentPlan, Error, Result};
use std::collections::HashMap;

/// Assembles output packages from a template and a content plan.
pub struct Assembler;

impl Assembler {
    /// Create a new assembler.
    pub fn new() -> Self {
        Self
    }

    /// Build the output archive bytes.
    ///
    /// Fails before producing any output if the plan or template is invalid.
    pub fn assemble(&self, template_bytes: &[u8], plan: &ContentPlan) -> Result<Vec<u8>> {
        let template = Package::from_bytes(template_bytes)?;
        self.assemble_package(&template, plan)?.to_bytes()
    }

    /// Build the output package in memory. The template is not modified.
    pub fn assemble_package(&self, template: &Package, plan: &ContentPlan) -> Result<Package> {
        if plan.is_empty() {
            return Err(Error::InvalidPlan("the plan contains no pages".to_string()));
        }
        for required in [CONTENT_TYPES_PART, PRESENTATION_PART, PRESENTATION_RELS_PART] {
            if !template.contains(required) {
                return Err(Error::PackageIntegrity(format!(
                    "template is missing '{}'",
                    required
                )));
            }
        }

        let order = slide_order(template)?;
        let selected = select_slides(plan, &order)?;
        let slide_total = selected.len();

        let mut pres_rels = Relationships::parse(template.require(PRESENTATION_RELS_PART)?)?;
        let first_id = pres_rels.max_numeric_id();
        let rel_ids = (1..=slide_total)
            .map(|i| {
                u32::try_from(i)
                    .ok()
                    .and_then(|i| first_id.checked_add(i))
                    .map(|id| format!("rId{}", id))
                    .ok_or_else(|| {
                        Error::PackageIntegrity(format!(
                            "no relationship ids left above rId{} in '{}'",
                            first_id, PRESENTATION_RELS_PART
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        pres_rels.remove_type(rel_types::SLIDE);
        for (i, rid) in rel_ids.iter().enumerate() {
            pres_rels.push(Relationship::new(
                rid.as_str(),
                rel_types::SLIDE,
                relative_target(part_dir(PRESENTATION_PART), &slide_part(i + 1)),
            ));
        }

        let mut pres = template.xml(PRESENTATION_PART)?;
        rebuild_slide_id_list(&mut pres, &rel_ids);
        drop_slide_references(&mut pres);

        let mut cloner = SlideCloner::new(template, &selected);
        for sel in &selected {
            cloner.clone_slide(sel)?;
        }

        let mut types = ContentTypes::parse(template.require(CONTENT_TYPES_PART)?)?;
        types.remove_overrides_with_prefix(&format!("/{}/slide", SLIDES_DIR));
        types.remove_overrides_with_prefix(&format!("/{}/", NOTES_SLIDES_DIR));
        for i in 1..=slide_total {
            types.add_override(&slide_part(i), ct::SLIDE);
        }
        for part in &cloner.new_tags {
            types.add_override(part, ct::TAGS);
        }
        for part in &cloner.new_notes {
            types.add_override(part, ct::NOTES_SLIDE);
        }

        let mut output = Package::new();
        for part in template.parts() {
            let path = part.path.as_str();
            if is_replaced_part(path) {
                continue;
            }
            match path {
                CONTENT_TYPES_PART => output.insert(path, types.to_bytes()?),
                PRESENTATION_RELS_PART => output.insert(path, pres_rels.to_bytes()?),
                PRESENTATION_PART => output.insert(path, pres.to_bytes()?),
                _ => output.insert(path, part.bytes.clone()),
            }
        }
        for part in cloner.parts {
            output.insert(part.path, part.bytes);
        }

        log::info!(
            "Assembled {} slides ({} tag parts, {} notes slides cloned)",
            slide_total,
            cloner.new_tags.len(),
            cloner.new_notes.len()
        );
        Ok(output)
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

/// Template parts that the output replaces wholesale.
fn is_replaced_part(path: &str) -> bool {
    slide_number(path).is_some()
        || path.starts_with(&format!("{}/_rels/", SLIDES_DIR))
        || path.starts_with(&format!("{}/", NOTES_SLIDES_DIR))
}

/// Copies selected slides and their per-slide parts into fresh part names.
struct SlideCloner<'a> {
    template: &'a Package,
    /// First output slide cloned from each template slide part.
    first_copy: HashMap<&'a str, usize>,
    next_tag: usize,
    next_notes: usize,
    parts: Vec<PackagePart>,
    new_tags: Vec<String>,
    new_notes: Vec<String>,
}

impl<'a> SlideCloner<'a> {
    fn new(template: &'a Package, selected: &'a [SelectedSlide]) -> Self {
        let mut first_copy = HashMap::new();
        for sel in selected {
            first_copy
                .entry(sel.source_part.as_str())
                .or_insert(sel.plan_index);
        }
        Self {
            template,
            first_copy,
            next_tag: template.max_part_number(tag_number),
            next_notes: 0,
            parts: Vec::new(),
            new_tags: Vec::new(),
            new_notes: Vec::new(),
        }
    }

    fn clone_slide(&mut self, sel: &SelectedSlide) -> Result<()> {
        let out_part = slide_part(sel.plan_index);
        let slide_bytes = self.template.require(&sel.source_part)?.to_vec();
        self.parts.push(PackagePart::new(out_part.clone(), slide_bytes));

        let rels_path = rels_part_for(&sel.source_part);
        let Some(rel_bytes) = self.template.part(&rels_path) else {
            return Ok(());
        };

        let mut rels = Relationships::parse(rel_bytes)?;
        let source_dir = part_dir(&sel.source_part).to_string();
        for rel in rels.iter_mut() {
            if rel.is_external() {
                continue;
            }
            let source_target = resolve_target(&source_dir, &rel.target);
            match rel.rel_type.as_str() {
                rel_types::TAGS => self.clone_tag(rel, &source_target),
                rel_types::NOTES_SLIDE => self.clone_notes(rel, &source_target, &out_part)?,
                rel_types::SLIDE => self.retarget_slide_link(rel, &source_target, sel.plan_index),
                _ => {}
            }
        }

        self.parts
            .push(PackagePart::new(slide_rels_part(sel.plan_index), rels.to_bytes()?));
        Ok(())
    }

    /// Each tag relationship needs its own tag part; shared tag parts trigger a repair.
    fn clone_tag(&mut self, rel: &mut Relationship, source: &str) {
        let template = self.template;
        let Some(bytes) = template.part(source) else {
            log::warn!("Tag relationship {} points at missing part '{}'", rel.id, source);
            return;
        };
        self.next_tag += 1;
        let new_part = format!("{}/tag{}.xml", TAGS_DIR, self.next_tag);
        rel.target = relative_target(SLIDES_DIR, &new_part);
        self.parts.push(PackagePart::new(new_part.clone(), bytes.to_vec()));
        self.new_tags.push(new_part);
    }

    fn clone_notes(&mut self, rel: &mut Relationship, source: &str, out_slide: &str) -> Result<()> {
        let template = self.template;
        let Some(bytes) = template.part(source) else {
            log::warn!("Notes relationship {} points at missing part '{}'", rel.id, source);
            return Ok(());
        };
        self.next_notes += 1;
        let new_part = format!("{}/notesSlide{}.xml", NOTES_SLIDES_DIR, self.next_notes);
        rel.target = relative_target(SLIDES_DIR, &new_part);
        self.parts.push(PackagePart::new(new_part.clone(), bytes.to_vec()));

        if let Some(notes_rels) = template.part(&rels_part_for(source)) {
            let mut notes_rels = Relationships::parse(notes_rels)?;
            for back in notes_rels.iter_mut() {
                if back.rel_type == rel_types::SLIDE {
                    back.target = relative_target(NOTES_SLIDES_DIR, out_slide);
                }
            }
            self.parts
                .push(PackagePart::new(rels_part_for(&new_part), notes_rels.to_bytes()?));
        }
        self.new_notes.push(new_part);
        Ok(())
    }

    /// Slide-to-slide links follow their target to its first copy in the output.
    fn retarget_slide_link(&self, rel: &mut Relationship, source: &str, own_index: usize) {
        let index = match self.first_copy.get(source) {
            Some(&index) => index,
            None => {
                log::warn!(
                    "Slide {} links to '{}', which is not part of the output; linking to itself",
                    own_index,
                    source
                );
                own_index
            }
        };
        rel.target = relative_target(SLIDES_DIR, &slide_part(index));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TemplateBuilder;
    use deck_core::SlidePlan;
    use std::collections::HashSet;

    fn plan(pages: &[i64]) -> ContentPlan {
        ContentPlan::new(pages.iter().map(|&n| SlidePlan::new(n, "图文页")).collect())
    }

    fn slide_rel_targets(pkg: &Package) -> Vec<String> {
        Relationships::parse(pkg.part(PRESENTATION_RELS_PART).unwrap())
            .unwrap()
            .iter()
            .filter(|r| r.rel_type == rel_types::SLIDE)
            .map(|r| r.target.clone())
            .collect()
    }

    #[test]
    fn test_output_has_plan_slides_in_order() {
        let template = TemplateBuilder::numbered(5).build();
        let out = Assembler::new()
            .assemble_package(&template, &plan(&[3, 1, 5]))
            .unwrap();

        assert_eq!(out.slide_parts().len(), 3);
        for (i, marker) in ["页面3", "页面1", "页面5"].iter().enumerate() {
            let xml = String::from_utf8(out.part(&slide_part(i + 1)).unwrap().to_vec()).unwrap();
            assert!(xml.contains(marker), "slide {} should come from {}", i + 1, marker);
        }
        assert_eq!(
            slide_rel_targets(&out),
            vec!["slides/slide1.xml", "slides/slide2.xml", "slides/slide3.xml"]
        );
    }

    #[test]
    fn test_presentation_rels_ids_are_fresh_and_unique() {
        let template = TemplateBuilder::numbered(5).build();
        let out = Assembler::new()
            .assemble_package(&template, &plan(&[2, 2, 4]))
            .unwrap();
        let rels = Relationships::parse(out.part(PRESENTATION_RELS_PART).unwrap()).unwrap();
        let ids: Vec<&str> = rels.iter().map(|r| r.id.as_str()).collect();
        let unique: HashSet<&str> = ids.iter().copied().collect();
        assert_eq!(ids.len(), unique.len());

        let template_rels =
            Relationships::parse(template.part(PRESENTATION_RELS_PART).unwrap()).unwrap();
        let floor = template_rels.max_numeric_id();
        for rel in rels.iter().filter(|r| r.rel_type == rel_types::SLIDE) {
            let n: u32 = rel.id.trim_start_matches("rId").parse().unwrap();
            assert!(n > floor);
        }
    }

    #[test]
    fn test_exhausted_relationship_ids_are_rejected() {
        let mut template = TemplateBuilder::numbered(2).build();
        let mut rels = Relationships::parse(template.part(PRESENTATION_RELS_PART).unwrap()).unwrap();
        rels.push(Relationship::new("rId4294967295", rel_types::TAGS, "tags/tag9.xml"));
        template.insert(PRESENTATION_RELS_PART, rels.to_bytes().unwrap());

        let err = Assembler::new()
            .assemble_package(&template, &plan(&[1]))
            .unwrap_err();
        assert!(matches!(err, Error::PackageIntegrity(_)));
    }

    #[test]
    fn test_slide_id_list_matches_relationships() {
        let template = TemplateBuilder::numbered(3).build();
        let out = Assembler::new()
            .assemble_package(&template, &plan(&[1, 3]))
            .unwrap();
        let pres = out.xml(PRESENTATION_PART).unwrap();
        let rels = Relationships::parse(out.part(PRESENTATION_RELS_PART).unwrap()).unwrap();
        let ids: Vec<(String, String)> = pres
            .root
            .child("sldIdLst")
            .unwrap()
            .children_named("sldId")
            .map(|e| (e.attr("id").unwrap().to_string(), e.attr("r:id").unwrap().to_string()))
            .collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0].0, "256");
        assert_eq!(ids[1].0, "257");
        assert_eq!(rels.get(&ids[1].1).unwrap().target, "slides/slide2.xml");
    }

    #[test]
    fn test_content_type_overrides_are_rebuilt() {
        let template = TemplateBuilder::numbered(5).with_tag(2).build();
        let out = Assembler::new()
            .assemble_package(&template, &plan(&[2, 2, 4]))
            .unwrap();
        let types = ContentTypes::parse(out.part(CONTENT_TYPES_PART).unwrap()).unwrap();
        let names = types.override_part_names();
        let slides: Vec<&&str> = names.iter().filter(|n| n.starts_with("/ppt/slides/")).collect();
        assert_eq!(slides.len(), 3);
        assert!(names.contains(&"/ppt/slides/slide3.xml"));
        assert!(!names.contains(&"/ppt/slides/slide4.xml"));
        assert!(names.contains(&"/ppt/tags/tag2.xml"));
        assert!(names.contains(&"/ppt/tags/tag3.xml"));
    }

    #[test]
    fn test_assembly_is_idempotent() {
        let template = TemplateBuilder::numbered(5).with_tag(2).build();
        let bytes = template.to_bytes().unwrap();
        let plan = plan(&[2, 5, 2]);

        let first = Package::from_bytes(&Assembler::new().assemble(&bytes, &plan).unwrap()).unwrap();
        let second = Package::from_bytes(&Assembler::new().assemble(&bytes, &plan).unwrap()).unwrap();

        let overrides = |pkg: &Package| -> HashSet<String> {
            ContentTypes::parse(pkg.part(CONTENT_TYPES_PART).unwrap())
                .unwrap()
                .override_part_names()
                .into_iter()
                .map(str::to_string)
                .collect()
        };
        assert_eq!(overrides(&first), overrides(&second));
        assert_eq!(first.slide_parts().len(), second.slide_parts().len());
    }

    #[test]
    fn test_tag_parts_are_unique_per_clone() {
        let template = TemplateBuilder::numbered(5).with_tag(2).build();
        let out = Assembler::new()
            .assemble_package(&template, &plan(&[2, 2, 2]))
            .unwrap();

        let mut targets = HashSet::new();
        for i in 1..=3 {
            let rels = Relationships::parse(out.part(&slide_rels_part(i)).unwrap()).unwrap();
            let tag = rels.first_of_type(rel_types::TAGS).unwrap();
            let resolved = resolve_target(SLIDES_DIR, &tag.target);
            assert!(out.contains(&resolved));
            assert!(targets.insert(resolved));
        }
        assert_eq!(targets.len(), 3);
        // the template's own tag part is kept, clones are numbered after it
        assert!(out.contains("ppt/tags/tag1.xml"));
        assert!(targets.contains("ppt/tags/tag4.xml"));
    }

    #[test]
    fn test_duplicate_slides_are_independent() {
        let template = TemplateBuilder::numbered(5).build();
        let mut out = Assembler::new()
            .assemble_package(&template, &plan(&[2, 2, 4]))
            .unwrap();
        assert_eq!(out.part(&slide_part(1)), out.part(&slide_part(2)));

        out.insert(slide_part(1), b"<p:sld/>".to_vec());
        assert_ne!(out.part(&slide_part(1)), out.part(&slide_part(2)));
        let xml = String::from_utf8(out.part(&slide_part(2)).unwrap().to_vec()).unwrap();
        assert!(xml.contains("页面2"));
    }

    #[test]
    fn test_notes_slides_are_cloned_and_repointed() {
        let template = TemplateBuilder::numbered(3).with_notes(2).build();
        let out = Assembler::new()
            .assemble_package(&template, &plan(&[2, 1, 2]))
            .unwrap();

        assert!(out.contains("ppt/notesSlides/notesSlide1.xml"));
        assert!(out.contains("ppt/notesSlides/notesSlide2.xml"));
        assert!(!out.contains("ppt/notesSlides/notesSlide3.xml"));

        let back = Relationships::parse(
            out.part("ppt/notesSlides/_rels/notesSlide2.xml.rels").unwrap(),
        )
        .unwrap();
        assert_eq!(
            back.first_of_type(rel_types::SLIDE).unwrap().target,
            "../slides/slide3.xml"
        );
        let slide3 = Relationships::parse(out.part(&slide_rels_part(3)).unwrap()).unwrap();
        assert_eq!(
            slide3.first_of_type(rel_types::NOTES_SLIDE).unwrap().target,
            "../notesSlides/notesSlide2.xml"
        );
    }

    #[test]
    fn test_template_is_untouched() {
        let template = TemplateBuilder::numbered(2).with_tag(1).build();
        let before = template.to_bytes().unwrap();
        Assembler::new()
            .assemble_package(&template, &plan(&[1, 1]))
            .unwrap();
        assert_eq!(template.to_bytes().unwrap(), before);
    }

    #[test]
    fn test_invalid_plans_fail_before_output() {
        let template = TemplateBuilder::numbered(5).build();
        let err = Assembler::new()
            .assemble_package(&template, &plan(&[1, 9]))
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.plan_index(), Some(2));

        let err = Assembler::new()
            .assemble_package(&template, &ContentPlan::default())
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_zero_slide_template() {
        let template = TemplateBuilder::numbered(0).build();
        let err = Assembler::new()
            .assemble_package(&template, &plan(&[1]))
            .unwrap_err();
        assert!(matches!(err, Error::PackageIntegrity(_)));
    }

    #[test]
    fn test_missing_required_part() {
        let mut template = TemplateBuilder::numbered(2).build();
        template.remove(PRESENTATION_RELS_PART);
        let err = Assembler::new()
            .assemble_package(&template, &plan(&[1]))
            .unwrap_err();
        assert!(matches!(err, Error::PackageIntegrity(_)));
    }

    #[test]
    fn test_template_page_follows_presentation_order() {
        // slide parts listed in reverse in the slide-ID list
        let template = TemplateBuilder::numbered(3).reversed_order().build();
        let out = Assembler::new()
            .assemble_package(&template, &plan(&[1]))
            .unwrap();
        let xml = String::from_utf8(out.part(&slide_part(1)).unwrap().to_vec()).unwrap();
        assert!(xml.contains("页面3"));
    }
}
