//! Part names, relationship types and content types of a PPTX package.

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const PRESENTATION_PART: &str = "ppt/presentation.xml";
pub const PRESENTATION_RELS_PART: &str = "ppt/_rels/presentation.xml.rels";
pub const SLIDES_DIR: &str = "ppt/slides";
pub const TAGS_DIR: &str = "ppt/tags";
pub const NOTES_SLIDES_DIR: &str = "ppt/notesSlides";
pub const MEDIA_DIR: &str = "ppt/media";

/// Relationship type URIs.
pub mod rel_types {
    pub const SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    pub const SLIDE_LAYOUT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
    pub const TAGS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/tags";
    pub const NOTES_SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/notesSlide";
    pub const IMAGE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
}

/// Content type strings.
pub mod content_types {
    pub const SLIDE: &str = "application/vnd.openxmlformats-officedocument.presentationml.slide+xml";
    pub const TAGS: &str = "application/vnd.ms-powerpoint.tags+xml";
    pub const NOTES_SLIDE: &str =
        "application/vnd.openxmlformats-officedocument.presentationml.notesSlide+xml";
}

/// XML namespaces.
pub mod ns {
    pub const PACKAGE_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
    pub const OFFICE_RELS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
    pub const CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
    pub const PRESENTATION: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
    pub const DRAWING: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
}

/// First `p:sldId/@id` PowerPoint accepts; later slides count up from here.
pub const SLIDE_ID_BASE: u32 = 256;

/// Slide width used when `p:sldSz` is missing (16:9, 13.333 in).
pub const DEFAULT_SLIDE_WIDTH: i64 = 12_192_000;

/// Part name of output slide `n`.
pub fn slide_part(n: usize) -> String {
    format!("{}/slide{}.xml", SLIDES_DIR, n)
}

/// Relationship part of output slide `n`.
pub fn slide_rels_part(n: usize) -> String {
    format!("{}/_rels/slide{}.xml.rels", SLIDES_DIR, n)
}

/// Relationship part belonging to any part.
pub fn rels_part_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}
