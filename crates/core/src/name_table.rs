//! Lookup table for legacy content keys whose shapes carry generic names.
//!
//! Older templates were authored before the `<page>_<field>` naming scheme and
//! still use PowerPoint's automatic names (`文本框 9`). Content plans written
//! for them use descriptive keys. The table maps those keys to the exact shape
//! names, and is kept apart from the matching rules so it can be extended per
//! template family.

use std::collections::BTreeMap;

/// Key whose shape list also serves every key that mentions a subtitle.
pub const SUBTITLE_KEY: &str = "字幕";

/// A versioned mapping from content key to candidate shape names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyNameTable {
    version: u32,
    entries: BTreeMap<String, Vec<String>>,
}

impl Default for LegacyNameTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LegacyNameTable {
    /// Version of the built-in table. Bump when entries change.
    pub const BUILTIN_VERSION: u32 = 1;

    /// The table shipped with the crate.
    pub fn builtin() -> Self {
        let mut table = Self::empty(Self::BUILTIN_VERSION);
        table.insert("目录内容区1", ["文本框 9"]);
        table.insert("目录内容区2", ["文本框 14"]);
        table.insert("目录内容区3", ["文本框 17"]);
        table.insert("目录内容区4", ["文本框 20"]);
        table.insert(
            SUBTITLE_KEY,
            ["文本框 10", "文本框 32", "文本框 36", "文本框 58", "文本框 121"],
        );
        table
    }

    /// An empty table with the given version.
    pub fn empty(version: u32) -> Self {
        Self {
            version,
            entries: BTreeMap::new(),
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Add or replace the shape names for a key.
    pub fn insert<I, S>(&mut self, key: impl Into<String>, shapes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .insert(key.into(), shapes.into_iter().map(Into::into).collect());
    }

    /// Candidate shape names for a key, in priority order.
    ///
    /// Exact entries come first; any key mentioning a subtitle additionally
    /// gets the subtitle shapes.
    pub fn candidates(&self, key: &str) -> Vec<&str> {
        let mut out: Vec<&str> = self
            .entries
            .get(key)
            .map(|names| names.iter().map(String::as_str).collect())
            .unwrap_or_default();

        if key != SUBTITLE_KEY && key.contains(SUBTITLE_KEY) {
            if let Some(names) = self.entries.get(SUBTITLE_KEY) {
                out.extend(names.iter().map(String::as_str));
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
