//! Minimal template packages built in memory for tests.

use crate::constants::{content_types as ct, ns, rel_types};
use crate::package::Package;
use image::ImageFormat;
use std::io::Cursor;

const SLIDE_MASTER_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
const OFFICE_DOCUMENT_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

/// A picture placeholder without geometry of its own (inherits from the layout).
pub const PIC_PLACEHOLDER_SHAPE: &str = r#"<p:sp><p:nvSpPr><p:cNvPr id="7" name="Picture Placeholder 5"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="pic" idx="13"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>"#;

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// A text shape with one run and no explicit font size.
pub fn text_shape(id: u32, name: &str, text: &str, x: i64, y: i64, cx: i64, cy: i64) -> String {
    sized_text_shape(id, name, text, None, x, y, cx, cy)
}

/// A text shape, one paragraph per line of `text`, runs sized in hundredths of a point.
#[allow(clippy::too_many_arguments)]
pub fn sized_text_shape(
    id: u32,
    name: &str,
    text: &str,
    size: Option<u32>,
    x: i64,
    y: i64,
    cx: i64,
    cy: i64,
) -> String {
    let run_props = match size {
        Some(sz) => format!(r#"<a:rPr lang="zh-CN" altLang="en-US" sz="{}"/>"#, sz),
        None => r#"<a:rPr lang="zh-CN" altLang="en-US"/>"#.to_string(),
    };
    let paragraphs: String = text
        .split('\n')
        .map(|line| format!("<a:p><a:r>{}<a:t>{}</a:t></a:r></a:p>", run_props, escape(line)))
        .collect();
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr><p:txBody><a:bodyPr wrap="none"/><a:lstStyle/>{paragraphs}</p:txBody></p:sp>"#,
        id = id,
        name = escape(name),
        x = x,
        y = y,
        cx = cx,
        cy = cy,
        paragraphs = paragraphs,
    )
}

/// A filled rectangle without a text body.
pub fn rect_shape(id: u32, name: &str, x: i64, y: i64, cx: i64, cy: i64) -> String {
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom><a:solidFill><a:srgbClr val="1F4E79"/></a:solidFill></p:spPr></p:sp>"#,
        id,
        escape(name),
        x,
        y,
        cx,
        cy
    )
}

/// A straight connector.
pub fn connector_shape(id: u32, name: &str, x: i64, y: i64, cx: i64, cy: i64) -> String {
    format!(
        r#"<p:cxnSp><p:nvCxnSpPr><p:cNvPr id="{}" name="{}"/><p:cNvCxnSpPr/><p:nvPr/></p:nvCxnSpPr><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm><a:prstGeom prst="line"><a:avLst/></a:prstGeom><a:ln w="12700"/></p:spPr></p:cxnSp>"#,
        id,
        escape(name),
        x,
        y,
        cx,
        cy
    )
}

/// A complete slide part holding the given shape elements.
pub fn slide_xml(shapes: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        a = ns::DRAWING,
        r = ns::OFFICE_RELS,
        p = ns::PRESENTATION,
        shapes = shapes
    )
}

fn rels_xml(entries: &[(String, &str, String)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, rel_type, target)| {
            format!(r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#, id, rel_type, target)
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{}">{}</Relationships>"#,
        ns::PACKAGE_RELS,
        body
    )
}

/// A small PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

/// Builds a template with `n` numbered slides, each holding one text shape
/// named and reading `页面{n}`.
pub struct TemplateBuilder {
    slides: Vec<String>,
    tagged: Vec<usize>,
    with_notes: Vec<usize>,
    reversed: bool,
}

impl TemplateBuilder {
    pub fn numbered(count: usize) -> Self {
        let slides = (1..=count)
            .map(|n| {
                let label = format!("页面{}", n);
                slide_xml(&text_shape(2, &label, &label, 457_200, 274_638, 8_229_600, 1_143_000))
            })
            .collect();
        Self {
            slides,
            tagged: Vec::new(),
            with_notes: Vec::new(),
            reversed: false,
        }
    }

    /// Replace the shapes of slide `n` (1-based).
    pub fn with_slide(mut self, n: usize, shapes: &str) -> Self {
        self.slides[n - 1] = slide_xml(shapes);
        self
    }

    /// Attach a tag part to slide `n`.
    pub fn with_tag(mut self, n: usize) -> Self {
        self.tagged.push(n);
        self
    }

    /// Attach a notes slide to slide `n`.
    pub fn with_notes(mut self, n: usize) -> Self {
        self.with_notes.push(n);
        self
    }

    /// List the slides in reverse part order in the slide-ID list.
    pub fn reversed_order(mut self) -> Self {
        self.reversed = true;
        self
    }

    pub fn build(&self) -> Package {
        let mut package = Package::new();
        let count = self.slides.len();

        let mut overrides = vec![
            ("/ppt/presentation.xml".to_string(), "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"),
            ("/ppt/slideMasters/slideMaster1.xml".to_string(), "application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"),
            ("/ppt/slideLayouts/slideLayout1.xml".to_string(), "application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"),
        ];
        for n in 1..=count {
            overrides.push((format!("/ppt/slides/slide{}.xml", n), ct::SLIDE));
        }
        for (i, _) in self.tagged.iter().enumerate() {
            overrides.push((format!("/ppt/tags/tag{}.xml", i + 1), ct::TAGS));
        }
        for (i, _) in self.with_notes.iter().enumerate() {
            overrides.push((format!("/ppt/notesSlides/notesSlide{}.xml", i + 1), ct::NOTES_SLIDE));
        }
        let override_xml: String = overrides
            .iter()
            .map(|(part, content_type)| {
                format!(r#"<Override PartName="{}" ContentType="{}"/>"#, part, content_type)
            })
            .collect();
        package.insert(
            "[Content_Types].xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="{}"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>{}</Types>"#,
                ns::CONTENT_TYPES,
                override_xml
            )
            .into_bytes(),
        );

        package.insert(
            "_rels/.rels",
            rels_xml(&[("rId1".to_string(), OFFICE_DOCUMENT_TYPE, "ppt/presentation.xml".to_string())])
                .into_bytes(),
        );

        let mut pres_rels = vec![(
            "rId1".to_string(),
            SLIDE_MASTER_TYPE,
            "slideMasters/slideMaster1.xml".to_string(),
        )];
        let mut slide_ids: Vec<String> = Vec::new();
        for n in 1..=count {
            let rid = format!("rId{}", n + 1);
            pres_rels.push((rid.clone(), rel_types::SLIDE, format!("slides/slide{}.xml", n)));
            slide_ids.push(rid);
        }
        if self.reversed {
            slide_ids.reverse();
        }
        let id_list: String = slide_ids
            .iter()
            .enumerate()
            .map(|(i, rid)| format!(r#"<p:sldId id="{}" r:id="{}"/>"#, 256 + i, rid))
            .collect();

        package.insert(
            "ppt/presentation.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}" saveSubsetFonts="1"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{ids}</p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
                a = ns::DRAWING,
                r = ns::OFFICE_RELS,
                p = ns::PRESENTATION,
                ids = id_list
            )
            .into_bytes(),
        );
        package.insert("ppt/_rels/presentation.xml.rels", rels_xml(&pres_rels).into_bytes());

        package.insert(
            "ppt/slideMasters/slideMaster1.xml",
            slide_xml("").replace("p:sld ", "p:sldMaster ").replace("</p:sld>", "</p:sldMaster>").into_bytes(),
        );
        package.insert(
            "ppt/slideLayouts/slideLayout1.xml",
            slide_xml(&format!(
                r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="457200" y="274638"/><a:ext cx="8229600" cy="1143000"/></a:xfrm></p:spPr></p:sp><p:sp><p:nvSpPr><p:cNvPr id="3" name="Picture Placeholder 2"/><p:cNvSpPr/><p:nvPr><p:ph type="pic" idx="13"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="{}" y="{}"/><a:ext cx="{}" cy="{}"/></a:xfrm></p:spPr></p:sp>"#,
                1_000_000, 1_500_000, 4_000_000, 3_000_000
            ))
            .replace("p:sld ", "p:sldLayout ")
            .replace("</p:sld>", "</p:sldLayout>")
            .into_bytes(),
        );
        package.insert(
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            rels_xml(&[("rId1".to_string(), SLIDE_MASTER_TYPE, "../slideMasters/slideMaster1.xml".to_string())])
                .into_bytes(),
        );

        for (i, xml) in self.slides.iter().enumerate() {
            let n = i + 1;
            package.insert(format!("ppt/slides/slide{}.xml", n), xml.clone().into_bytes());

            let mut rels = vec![(
                "rId1".to_string(),
                rel_types::SLIDE_LAYOUT,
                "../slideLayouts/slideLayout1.xml".to_string(),
            )];
            if let Some(tag) = self.tagged.iter().position(|&t| t == n) {
                rels.push(("rId2".to_string(), rel_types::TAGS, format!("../tags/tag{}.xml", tag + 1)));
            }
            if let Some(notes) = self.with_notes.iter().position(|&t| t == n) {
                rels.push((
                    "rId3".to_string(),
                    rel_types::NOTES_SLIDE,
                    format!("../notesSlides/notesSlide{}.xml", notes + 1),
                ));
            }
            package.insert(format!("ppt/slides/_rels/slide{}.xml.rels", n), rels_xml(&rels).into_bytes());
        }

        for (i, _) in self.tagged.iter().enumerate() {
            package.insert(
                format!("ppt/tags/tag{}.xml", i + 1),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:tagLst xmlns:p="{}"><p:tag name="KSO_WM_UNIT_INDEX" val="{}"/></p:tagLst>"#,
                    ns::PRESENTATION,
                    i + 1
                )
                .into_bytes(),
            );
        }

        for (i, &slide) in self.with_notes.iter().enumerate() {
            let n = i + 1;
            package.insert(
                format!("ppt/notesSlides/notesSlide{}.xml", n),
                slide_xml(&text_shape(2, "Notes Placeholder 1", &format!("备注{}", slide), 0, 0, 100, 100))
                    .replace("p:sld ", "p:notes ")
                    .replace("</p:sld>", "</p:notes>")
                    .into_bytes(),
            );
            package.insert(
                format!("ppt/notesSlides/_rels/notesSlide{}.xml.rels", n),
                rels_xml(&[("rId2".to_string(), rel_types::SLIDE, format!("../slides/slide{}.xml", slide))])
                    .into_bytes(),
            );
        }

        package
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presentation::slide_order;

    #[test]
    fn test_fixture_is_consistent() {
        let package = TemplateBuilder::numbered(3).with_tag(2).with_notes(1).build();
        assert_eq!(package.slide_parts().len(), 3);
        assert!(package.contains("ppt/tags/tag1.xml"));
        assert!(package.contains("ppt/notesSlides/_rels/notesSlide1.xml.rels"));
        assert_eq!(
            slide_order(&package).unwrap(),
            vec!["ppt/slides/slide1.xml", "ppt/slides/slide2.xml", "ppt/slides/slide3.xml"]
        );
        for part in package.paths().filter(|p| p.ends_with(".xml") || p.ends_with(".rels")) {
            package.xml(part).unwrap();
        }
    }
}
