//! Content plan validation against the template's slides.

use deck_core::{ContentPlan, Error, Result};
use std::collections::HashSet;

/// A template slide chosen for one output position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedSlide {
    /// 1-based position in the plan, which is also the output slide number.
    pub plan_index: usize,
    /// 1-based template page number.
    pub template_page: usize,
    /// Part path of the template slide.
    pub source_part: String,
    pub page_type: String,
}

/// Resolve every plan entry to a template slide, in plan order.
///
/// `slide_order` lists the template's slide parts in presentation order.
/// Nothing is selected unless every entry is valid.
pub fn select_slides(plan: &ContentPlan, slide_order: &[String]) -> Result<Vec<SelectedSlide>> {
    if plan.is_empty() {
        return Err(Error::InvalidPlan("the plan contains no pages".to_string()));
    }
    if slide_order.is_empty() {
        return Err(Error::PackageIntegrity(
            "the template contains no slides".to_string(),
        ));
    }

    let slide_count = slide_order.len();
    let mut seen = HashSet::new();
    let mut selected = Vec::with_capacity(plan.len());

    for (i, page) in plan.pages().enumerate() {
        let plan_index = i + 1;
        let num = page.template_page_num.ok_or_else(|| Error::InvalidPlanEntry {
            index: plan_index,
            message: "missing template_page_num".to_string(),
        })?;

        if num < 1 || num as u64 > slide_count as u64 {
            return Err(Error::InvalidPlanEntry {
                index: plan_index,
                message: format!(
                    "template page {} does not exist ({}; template has {} slides)",
                    num,
                    page.page_type_label(),
                    slide_count
                ),
            });
        }

        let template_page = num as usize;
        if !seen.insert(template_page) {
            log::debug!(
                "Template page {} is used more than once; entry {} gets its own copy",
                template_page,
                plan_index
            );
        }

        log::debug!(
            "Slide {}: {} (template page {})",
            plan_index,
            page.page_type_label(),
            template_page
        );
        selected.push(SelectedSlide {
            plan_index,
            template_page,
            source_part: slide_order[template_page - 1].clone(),
            page_type: page.page_type.clone(),
        });
    }

    Ok(selected)
}
