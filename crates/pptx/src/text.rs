//! Editing of DrawingML text bodies (`p:txBody`).
//!
//! Text is written paragraph by paragraph, one line per paragraph, keeping the
//! formatting the template author gave the existing runs.

use crate::xml::{prefix_of, XmlElement, XmlNode};

/// Properties copied onto paragraphs and runs created for extra lines.
struct ParagraphTemplate {
    para_props: Option<XmlElement>,
    run_props: Option<XmlElement>,
    end_props: Option<XmlElement>,
}

impl ParagraphTemplate {
    /// Last paragraph's properties, first run's properties.
    fn from_body(body: &XmlElement, a: &str) -> Self {
        let paragraphs: Vec<&XmlElement> = body.children_named("p").collect();
        let last = paragraphs.last();

        let run_props = paragraphs
            .iter()
            .find_map(|p| p.child("r").and_then(|r| r.child("rPr")))
            .cloned()
            .or_else(|| {
                last.and_then(|p| p.child("endParaRPr")).map(|end| XmlElement {
                    name: format!("{}:rPr", a),
                    attributes: end.attributes.clone(),
                    children: end.children.clone(),
                })
            });

        Self {
            para_props: last.and_then(|p| p.child("pPr")).cloned(),
            run_props,
            end_props: last.and_then(|p| p.child("endParaRPr")).cloned(),
        }
    }

    fn run(&self, line: &str, a: &str) -> XmlElement {
        let mut run = XmlElement::new(format!("{}:r", a));
        if let Some(props) = &self.run_props {
            run.push(props.clone());
        }
        run.push(XmlElement::new(format!("{}:t", a)).with_text(line));
        run
    }

    fn paragraph(&self, line: &str, a: &str) -> XmlElement {
        let mut paragraph = XmlElement::new(format!("{}:p", a));
        if let Some(props) = &self.para_props {
            paragraph.push(props.clone());
        }
        paragraph.push(self.run(line, a));
        if let Some(end) = &self.end_props {
            paragraph.push(end.clone());
        }
        paragraph
    }
}

/// Write `value` into a shape's text body, one paragraph per line.
///
/// Returns `false` when the shape has no text body.
pub fn set_text(shape: &mut XmlElement, value: &str) -> bool {
    let Some(body) = shape.child_mut("txBody") else {
        return false;
    };
    let a = drawing_prefix(body);
    let lines: Vec<&str> = value
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    enable_word_wrap(body, &a);

    if body.position_of("p").is_none() {
        body.push(XmlElement::new(format!("{}:p", a)));
    }
    let template = ParagraphTemplate::from_body(body, &a);
    let positions = paragraph_positions(body);

    for (i, line) in lines.iter().enumerate() {
        if let Some(&pos) = positions.get(i) {
            if let XmlNode::Element(paragraph) = &mut body.children[pos] {
                fill_paragraph(paragraph, line, &template, &a);
            }
        }
    }

    // Lines beyond the existing paragraphs go after the last one.
    let mut insert_at = positions.last().map(|p| p + 1).unwrap_or(body.children.len());
    for line in lines.iter().skip(positions.len()) {
        body.children
            .insert(insert_at, XmlNode::Element(template.paragraph(line, &a)));
        insert_at += 1;
    }

    for &pos in positions.iter().skip(lines.len()) {
        if let XmlNode::Element(paragraph) = &mut body.children[pos] {
            clear_runs(paragraph);
        }
    }
    true
}

/// Clear a shape's text body down to one empty paragraph.
///
/// Returns `false` when the shape has no text body.
pub fn clear_text(shape: &mut XmlElement) -> bool {
    let Some(body) = shape.child_mut("txBody") else {
        return false;
    };
    let a = drawing_prefix(body);

    let mut seen_first = false;
    body.children.retain(|n| match n {
        XmlNode::Element(e) if e.is("p") => !std::mem::replace(&mut seen_first, true),
        _ => true,
    });

    match body.child_mut("p") {
        Some(paragraph) => paragraph
            .children
            .retain(|n| !matches!(n, XmlNode::Element(e) if matches!(e.local_name(), "r" | "br" | "fld"))),
        None => body.push(XmlElement::new(format!("{}:p", a))),
    }
    true
}

/// Font size in points of a paragraph's first run with an explicit size.
pub fn paragraph_font_size(paragraph: &XmlElement) -> Option<f64> {
    paragraph
        .children_named("r")
        .find_map(|r| r.child("rPr")?.attr("sz")?.parse::<f64>().ok())
        .map(|sz| sz / 100.0)
}

/// Scale every explicit run size of a shape by `ratio`, never below
/// `min_ratio` of the original size. Returns the number of runs changed.
pub fn scale_font_sizes(shape: &mut XmlElement, ratio: f64, min_ratio: f64) -> usize {
    let Some(body) = shape.child_mut("txBody") else {
        return 0;
    };
    let ratio = ratio.max(min_ratio);
    let mut changed = 0;
    body.for_each_descendant_mut(&mut |el: &mut XmlElement| {
        if !el.is("r") {
            return;
        }
        let Some(props) = el.child_mut("rPr") else {
            return;
        };
        let Some(sz) = props.attr("sz").and_then(|s| s.parse::<f64>().ok()) else {
            return;
        };
        let floor = (sz * min_ratio - 1e-6).ceil();
        let scaled = (sz * ratio).round().max(floor) as i64;
        props.set_attr("sz", scaled.to_string());
        changed += 1;
    });
    changed
}

fn fill_paragraph(paragraph: &mut XmlElement, line: &str, template: &ParagraphTemplate, a: &str) {
    paragraph.remove_children("br");

    let mut first = true;
    for run in paragraph.elements_mut().filter(|e| e.is("r")) {
        set_run_text(run, if first { line } else { "" }, a);
        first = false;
    }
    if !first {
        return;
    }

    let run = XmlNode::Element(template.run(line, a));
    match paragraph.position_of("endParaRPr") {
        Some(pos) => paragraph.children.insert(pos, run),
        None => paragraph.children.push(run),
    }
}

fn set_run_text(run: &mut XmlElement, text: &str, a: &str) {
    match run.child_mut("t") {
        Some(t) => t.set_text(text),
        None => run.push(XmlElement::new(format!("{}:t", a)).with_text(text)),
    }
}

fn clear_runs(paragraph: &mut XmlElement) {
    paragraph.remove_children("br");
    for run in paragraph.elements_mut().filter(|e| e.is("r")) {
        if let Some(t) = run.child_mut("t") {
            t.children.clear();
        }
    }
}

fn enable_word_wrap(body: &mut XmlElement, a: &str) {
    if body.child("bodyPr").is_none() {
        body.children
            .insert(0, XmlNode::Element(XmlElement::new(format!("{}:bodyPr", a))));
    }
    if let Some(body_pr) = body.child_mut("bodyPr") {
        body_pr.set_attr("wrap", "square");
    }
}

fn paragraph_positions(body: &XmlElement) -> Vec<usize> {
    body.children
        .iter()
        .enumerate()
        .filter(|(_, n)| matches!(n, XmlNode::Element(e) if e.is("p")))
        .map(|(i, _)| i)
        .collect()
}

/// Prefix used by the body's DrawingML children, `a` when there are none.
fn drawing_prefix(body: &XmlElement) -> String {
    body.elements()
        .find_map(|e| prefix_of(&e.name))
        .unwrap_or("a")
        .to_string()
}
