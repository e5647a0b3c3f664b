//! Picture placement: image loading, media parts and `p:pic` elements.

use crate::constants::{ns, rel_types, CONTENT_TYPES_PART, MEDIA_DIR};
use crate::content_types::ContentTypes;
use crate::package::{media_image_number, Package};
use crate::rels::{part_dir, relative_target};
use crate::shapes::Geometry;
use crate::slide::Slide;
use crate::xml::XmlElement;
use deck_core::Result;
use image::{ImageFormat, ImageReader};
use std::io::{Cursor, ErrorKind};
use std::path::Path;

/// An image file read into memory.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    /// File extension used for the media part.
    pub extension: &'static str,
    pub content_type: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Why an image could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageProblem {
    Missing,
    Unreadable(String),
}

impl ImageData {
    /// Read an image file and its pixel dimensions.
    pub fn load(path: &Path) -> std::result::Result<Self, ImageProblem> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(ImageProblem::Missing),
            Err(e) => return Err(ImageProblem::Unreadable(e.to_string())),
        };
        Self::from_bytes(bytes)
    }

    /// Identify an in-memory image.
    pub fn from_bytes(bytes: Vec<u8>) -> std::result::Result<Self, ImageProblem> {
        let reader = ImageReader::new(Cursor::new(bytes.as_slice()))
            .with_guessed_format()
            .map_err(|e| ImageProblem::Unreadable(e.to_string()))?;

        let (extension, content_type) = match reader.format() {
            Some(ImageFormat::Png) => ("png", "image/png"),
            Some(ImageFormat::Jpeg) => ("jpeg", "image/jpeg"),
            Some(ImageFormat::Gif) => ("gif", "image/gif"),
            Some(ImageFormat::Bmp) => ("bmp", "image/bmp"),
            Some(other) => {
                return Err(ImageProblem::Unreadable(format!(
                    "unsupported image format {:?}",
                    other
                )))
            }
            None => return Err(ImageProblem::Unreadable("unknown image format".to_string())),
        };

        let (width, height) = reader
            .into_dimensions()
            .map_err(|e| ImageProblem::Unreadable(e.to_string()))?;
        if width == 0 || height == 0 {
            return Err(ImageProblem::Unreadable("image has no pixels".to_string()));
        }

        Ok(Self {
            bytes,
            extension,
            content_type,
            width,
            height,
        })
    }
}

/// Largest box with the image's aspect ratio that fits `frame`, centered in it.
pub fn fit_within(frame: &Geometry, width: u32, height: u32) -> Geometry {
    let image_ratio = width as f64 / height as f64;
    let frame_ratio = frame.width as f64 / frame.height.max(1) as f64;

    let (new_width, new_height) = if image_ratio > frame_ratio {
        (frame.width as f64, frame.width as f64 / image_ratio)
    } else {
        (frame.height as f64 * image_ratio, frame.height as f64)
    };

    Geometry::new(
        (frame.left as f64 + (frame.width as f64 - new_width) / 2.0) as i64,
        (frame.top as f64 + (frame.height as f64 - new_height) / 2.0) as i64,
        new_width as i64,
        new_height as i64,
    )
}

/// Store image bytes as a new `ppt/media/imageK.ext` part and return its path.
pub fn add_media_part(package: &mut Package, image: &ImageData) -> String {
    let next = package.max_part_number(media_image_number) + 1;
    let path = format!("{}/image{}.{}", MEDIA_DIR, next, image.extension);
    package.insert(path.clone(), image.bytes.clone());
    path
}

/// Declare default content types for the given image extensions.
pub fn register_image_types(package: &mut Package, types: &[(&str, &str)]) -> Result<()> {
    if types.is_empty() {
        return Ok(());
    }
    let mut content_types = ContentTypes::parse(package.require(CONTENT_TYPES_PART)?)?;
    for (extension, content_type) in types {
        content_types.ensure_default(extension, content_type);
    }
    package.insert(CONTENT_TYPES_PART, content_types.to_bytes()?);
    Ok(())
}

/// Build a `p:pic` showing `media_part` on `slide`, and add its relationship.
pub fn picture_element(
    slide: &mut Slide,
    media_part: &str,
    name: &str,
    description: &str,
    geometry: &Geometry,
) -> XmlElement {
    let p = slide.namespace_prefix(ns::PRESENTATION, "p");
    let a = slide.namespace_prefix(ns::DRAWING, "a");
    let r = slide.namespace_prefix(ns::OFFICE_RELS, "r");

    let target = relative_target(part_dir(&slide.part), media_part);
    let rid = slide.rels.add(rel_types::IMAGE, &target);
    let id = slide.next_shape_id();

    let q = |prefix: &str, local: &str| format!("{}:{}", prefix, local);

    let non_visual = XmlElement::new(q(&p, "nvPicPr"))
        .with_child(
            XmlElement::new(q(&p, "cNvPr"))
                .with_attr("id", id.to_string())
                .with_attr("name", name)
                .with_attr("descr", description),
        )
        .with_child(
            XmlElement::new(q(&p, "cNvPicPr"))
                .with_child(XmlElement::new(q(&a, "picLocks")).with_attr("noChangeAspect", "1")),
        )
        .with_child(XmlElement::new(q(&p, "nvPr")));

    let blip_fill = XmlElement::new(q(&p, "blipFill"))
        .with_child(XmlElement::new(q(&a, "blip")).with_attr(q(&r, "embed"), rid))
        .with_child(XmlElement::new(q(&a, "stretch")).with_child(XmlElement::new(q(&a, "fillRect"))));

    let shape_props = XmlElement::new(q(&p, "spPr"))
        .with_child(
            XmlElement::new(q(&a, "xfrm"))
                .with_child(
                    XmlElement::new(q(&a, "off"))
                        .with_attr("x", geometry.left.to_string())
                        .with_attr("y", geometry.top.to_string()),
                )
                .with_child(
                    XmlElement::new(q(&a, "ext"))
                        .with_attr("cx", geometry.width.to_string())
                        .with_attr("cy", geometry.height.to_string()),
                ),
        )
        .with_child(
            XmlElement::new(q(&a, "prstGeom"))
                .with_attr("prst", "rect")
                .with_child(XmlElement::new(q(&a, "avLst"))),
        );

    XmlElement::new(q(&p, "pic"))
        .with_child(non_visual)
        .with_child(blip_fill)
        .with_child(shape_props)
}
