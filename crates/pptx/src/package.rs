//! In-memory package store.
//!
//! Every part of a PPTX archive is loaded eagerly into an ordered table of
//! (path → bytes). XML parts are parsed only when a caller asks for them.

use crate::xml::XmlDocument;
use deck_core::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};
use std::sync::LazyLock;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Largest buffer reserved up front for one entry; the declared size may lie.
const PREALLOC_LIMIT: u64 = 16 * 1024 * 1024;

static SLIDE_PART_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ppt/slides/slide(\d+)\.xml$").unwrap());

static TAG_PART_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ppt/tags/tag(\d+)\.xml$").unwrap());

static MEDIA_IMAGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^ppt/media/image(\d+)\.[A-Za-z0-9]+$").unwrap());

/// Number of a `ppt/slides/slideN.xml` part.
pub fn slide_number(path: &str) -> Option<usize> {
    capture_number(&SLIDE_PART_REGEX, path)
}

/// Number of a `ppt/tags/tagN.xml` part.
pub fn tag_number(path: &str) -> Option<usize> {
    capture_number(&TAG_PART_REGEX, path)
}

/// Number of a `ppt/media/imageN.ext` part.
pub fn media_image_number(path: &str) -> Option<usize> {
    capture_number(&MEDIA_IMAGE_REGEX, path)
}

fn capture_number(regex: &Regex, path: &str) -> Option<usize> {
    regex.captures(path)?.get(1)?.as_str().parse().ok()
}

/// One file of the package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagePart {
    pub path: String,
    pub bytes: Vec<u8>,
}

impl PackagePart {
    pub fn new(path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            bytes,
        }
    }
}

/// All parts of a package, in archive order.
#[derive(Debug, Clone, Default)]
pub struct Package {
    parts: Vec<PackagePart>,
    index: HashMap<String, usize>,
}

impl Package {
    /// Create an empty package.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a package from archive bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    /// Load every part of a package from a reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut package = Package::new();
        for i in 0..archive.len() {
            let mut file = archive
                .by_index(i)
                .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", i, e)))?;
            if file.is_dir() {
                continue;
            }
            let path = file.name().to_string();
            let capacity = usize::try_from(file.size().min(PREALLOC_LIMIT)).unwrap_or(0);
            let mut bytes = Vec::with_capacity(capacity);
            file.read_to_end(&mut bytes)
                .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;
            package.insert(path, bytes);
        }

        log::debug!("Loaded package with {} parts", package.len());
        Ok(package)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// Part paths in archive order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|p| p.path.as_str())
    }

    /// Parts in archive order.
    pub fn parts(&self) -> &[PackagePart] {
        &self.parts
    }

    /// Raw bytes of a part.
    pub fn part(&self, path: &str) -> Option<&[u8]> {
        self.index.get(path).map(|&i| self.parts[i].bytes.as_slice())
    }

    /// Raw bytes of a part that must exist.
    pub fn require(&self, path: &str) -> Result<&[u8]> {
        self.part(path)
            .ok_or_else(|| Error::PackageIntegrity(format!("Missing part '{}'", path)))
    }

    /// Parse a part as XML.
    pub fn xml(&self, path: &str) -> Result<XmlDocument> {
        let bytes = self.require(path)?;
        XmlDocument::parse(bytes)
            .map_err(|e| Error::XmlError(format!("Failed to parse '{}': {}", path, e)))
    }

    /// Insert or replace a part. Replacing keeps the archive position.
    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        let path = path.into();
        match self.index.get(&path) {
            Some(&i) => self.parts[i].bytes = bytes,
            None => {
                self.index.insert(path.clone(), self.parts.len());
                self.parts.push(PackagePart::new(path, bytes));
            }
        }
    }

    /// Serialize an XML document into a part.
    pub fn insert_xml(&mut self, path: impl Into<String>, doc: &XmlDocument) -> Result<()> {
        self.insert(path, doc.to_bytes()?);
        Ok(())
    }

    /// Remove a part, returning its bytes.
    pub fn remove(&mut self, path: &str) -> Option<Vec<u8>> {
        let i = self.index.remove(path)?;
        let part = self.parts.remove(i);
        for slot in self.index.values_mut() {
            if *slot > i {
                *slot -= 1;
            }
        }
        Some(part.bytes)
    }

    /// Slide parts by file number, sorted.
    pub fn slide_parts(&self) -> Vec<(usize, &str)> {
        let mut slides: Vec<(usize, &str)> = self
            .paths()
            .filter_map(|p| slide_number(p).map(|n| (n, p)))
            .collect();
        slides.sort_by_key(|(n, _)| *n);
        slides
    }

    /// Highest number among parts matching `number_of`, or 0.
    pub fn max_part_number(&self, number_of: fn(&str) -> Option<usize>) -> usize {
        self.paths().filter_map(number_of).max().unwrap_or(0)
    }

    /// Write the package as a ZIP archive.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for part in &self.parts {
            zip.start_file(part.path.as_str(), options)
                .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", part.path, e)))?;
            zip.write_all(&part.bytes)?;
        }

        zip.finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish archive: {}", e)))
    }

    /// Serialize the package into archive bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.write_to(Cursor::new(Vec::new()))?.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_numbers() {
        assert_eq!(slide_number("ppt/slides/slide12.xml"), Some(12));
        assert_eq!(slide_number("ppt/slides/_rels/slide12.xml.rels"), None);
        assert_eq!(slide_number("ppt/slideLayouts/slideLayout1.xml"), None);
        assert_eq!(tag_number("ppt/tags/tag3.xml"), Some(3));
        assert_eq!(tag_number("ppt/notesSlides/notesSlide2.xml"), None);
        assert_eq!(media_image_number("ppt/media/image10.jpeg"), Some(10));
        assert_eq!(media_image_number("ppt/media/media1.mp4"), None);
    }

    #[test]
    fn test_insert_replace_remove() {
        let mut pkg = Package::new();
        pkg.insert("a.xml", b"1".to_vec());
        pkg.insert("b.xml", b"2".to_vec());
        pkg.insert("c.xml", b"3".to_vec());
        pkg.insert("a.xml", b"4".to_vec());
        assert_eq!(pkg.paths().collect::<Vec<_>>(), vec!["a.xml", "b.xml", "c.xml"]);
        assert_eq!(pkg.part("a.xml"), Some(&b"4"[..]));

        assert_eq!(pkg.remove("b.xml"), Some(b"2".to_vec()));
        assert_eq!(pkg.part("c.xml"), Some(&b"3"[..]));
        assert!(!pkg.contains("b.xml"));
        assert!(pkg.require("b.xml").is_err());
    }

    #[test]
    fn test_zip_round_trip() {
        let mut pkg = Package::new();
        pkg.insert("[Content_Types].xml", b"<Types/>".to_vec());
        pkg.insert("ppt/slides/slide2.xml", b"<p:sld/>".to_vec());
        pkg.insert("ppt/slides/slide1.xml", b"<p:sld/>".to_vec());

        let bytes = pkg.to_bytes().unwrap();
        let loaded = Package::from_bytes(&bytes).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded.paths().next(), Some("[Content_Types].xml"));
        assert_eq!(
            loaded.slide_parts(),
            vec![(1, "ppt/slides/slide1.xml"), (2, "ppt/slides/slide2.xml")]
        );
        assert_eq!(loaded.max_part_number(slide_number), 2);
        assert_eq!(loaded.max_part_number(tag_number), 0);
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            Package::from_bytes(b"definitely not a zip"),
            Err(Error::ZipError(_))
        ));
    }
}
