//! Shape-name and content-key normalization for content binding.
//!
//! Template authors name shapes `<page prefix>_<field>` (for example
//! `图文页1_文字内容区1`) and nest them in named groups. Content plans use the
//! bare field names, possibly nested the same way as the groups. This module
//! turns both sides into comparable paths and alias sets.

use std::collections::{BTreeSet, HashMap};
use unicode_normalization::UnicodeNormalization;

/// Character that marks a page-type prefix (`封面页`, `图文页1`, ...).
pub const PAGE_MARKER: char = '页';

/// Label used for shapes without a name; the 1-based sibling position is appended.
pub const UNNAMED_LABEL: &str = "元素";

/// Trailing words that name the kind of region rather than the field.
pub const NAME_SUFFIXES: &[&str] = &["区", "框", "栏"];

/// Path segments containing any of these are decoration and never carry content.
pub const DECORATIVE_KEYWORDS: &[&str] = &[
    "背景", "矩形", "圆角", "椭圆", "形状", "图形", "遮罩", "底色",
];

/// Text that marks a shape as a generic, still-unfilled placeholder.
pub const PLACEHOLDER_KEYWORDS: &[&str] = &["文字内容", "字幕", "标题名称", "内容内容"];

/// Instructional captions shipped in templates that must not survive into output.
pub const DEFAULT_CAPTIONS: &[&str] =
    &["字幕18pt，白色字体深色描边，悬浮阴影。确保在任何底色上都能明确显示"];

/// Name prefix of text boxes PowerPoint names automatically.
pub const GENERIC_TEXT_BOX: &str = "文本框";

/// Shape names containing any of these may be resized to fit their text.
pub const EXPANDABLE_KEYWORDS: &[&str] = &["标题", "名称", "课题", "栏目"];

/// Content keys containing these fall back to the next free text placeholder.
pub const TEXT_FALLBACK_MARKERS: &[&str] = &["内容", "字幕"];

/// Content keys containing this fall back to the next free picture slot.
pub const PICTURE_MARKER: &str = "图片";

/// Shape names containing this are picture regions.
pub const PICTURE_REGION_MARKER: &str = "图片区";

/// Canonical form used for every name comparison: NFC, trimmed.
pub fn normalize_name(name: &str) -> String {
    name.trim().nfc().collect()
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Page prefix of one path segment: the part before the first `_`, if it
/// contains the page marker.
pub fn extract_prefix(segment: &str) -> Option<&str> {
    let (prefix, _) = segment.split_once('_')?;
    if prefix.contains(PAGE_MARKER) {
        Some(prefix)
    } else {
        None
    }
}

/// Detect the slide's page prefix from all of its shape paths.
///
/// The most frequent prefix wins; ties go to the longest prefix, then to the
/// lexicographically smallest one.
pub fn detect_prefix<'a, I>(paths: I) -> Option<String>
where
    I: IntoIterator<Item = &'a [String]>,
{
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for path in paths {
        for segment in path {
            if let Some(prefix) = extract_prefix(segment) {
                *counts.entry(prefix).or_insert(0) += 1;
            }
        }
    }

    counts
        .into_iter()
        .max_by(|(a, ca), (b, cb)| {
            ca.cmp(cb)
                .then_with(|| a.chars().count().cmp(&b.chars().count()))
                .then_with(|| b.cmp(a))
        })
        .map(|(prefix, _)| prefix.to_string())
}

/// Clean one path segment. Returns `None` for blank or decorative segments.
pub fn clean_segment(segment: &str, prefix: Option<&str>) -> Option<String> {
    let mut seg = segment.trim();
    if seg.is_empty() {
        return None;
    }
    if let Some(prefix) = prefix {
        if let Some(rest) = seg.strip_prefix(prefix).and_then(|r| r.strip_prefix('_')) {
            seg = rest;
        }
    }
    if seg.is_empty() || DECORATIVE_KEYWORDS.iter().any(|k| seg.contains(k)) {
        return None;
    }
    Some(seg.to_string())
}

/// Normalize a shape path against the detected page prefix.
///
/// Everything before the first segment containing the prefix is dropped; a
/// path without such a segment normalizes to nothing and cannot be bound.
pub fn normalize_path(path: &[String], prefix: Option<&str>) -> Vec<String> {
    let start = match prefix {
        Some(p) => match path.iter().position(|seg| seg.contains(p)) {
            Some(idx) => idx,
            None => return Vec::new(),
        },
        None => 0,
    };

    path[start..]
        .iter()
        .filter_map(|seg| clean_segment(seg, prefix))
        .collect()
}

/// Alias set of a shape name: raw, whitespace-free, `_`/`-` parts, and each of
/// those with a trailing region suffix removed.
pub fn shape_aliases(name: &str) -> BTreeSet<String> {
    let mut aliases = BTreeSet::new();
    let clean = name.trim();
    if clean.is_empty() {
        return aliases;
    }

    aliases.insert(clean.to_string());
    aliases.insert(strip_whitespace(clean));

    for separator in ['_', '-'] {
        if clean.contains(separator) {
            for part in clean.split(separator).filter(|p| !p.is_empty()) {
                aliases.insert(part.to_string());
                aliases.insert(strip_whitespace(part));
            }
        }
    }

    let mut trimmed = BTreeSet::new();
    for alias in &aliases {
        for suffix in NAME_SUFFIXES {
            if let Some(stem) = alias.strip_suffix(suffix) {
                trimmed.insert(stem.to_string());
                trimmed.insert(strip_whitespace(stem));
            }
        }
    }
    aliases.extend(trimmed);
    aliases.retain(|a| !a.is_empty());
    aliases
}

/// Candidate lookups for a content key, most specific first.
pub fn candidate_keys(key: &str) -> Vec<String> {
    let key = key.trim();
    let mut variants = vec![key.to_string(), strip_whitespace(key)];
    for suffix in NAME_SUFFIXES {
        if let Some(stem) = key.strip_suffix(suffix) {
            variants.push(stem.to_string());
            variants.push(strip_whitespace(stem));
        }
    }

    let mut seen = BTreeSet::new();
    variants
        .into_iter()
        .filter(|v| !v.is_empty() && seen.insert(v.clone()))
        .collect()
}

/// Whether a shape name designates a picture region.
pub fn is_picture_name(name: &str) -> bool {
    name.contains(PICTURE_REGION_MARKER) || name.trim_start().starts_with(PICTURE_MARKER)
}

/// Whether a text shape is a generic placeholder available for fallback binding.
pub fn is_text_placeholder(name: &str, text: &str) -> bool {
    name.trim_start().starts_with(GENERIC_TEXT_BOX)
        || PLACEHOLDER_KEYWORDS.iter().any(|k| text.contains(k))
}

/// Whether leftover template text should be cleared after binding.
pub fn is_default_caption(text: &str) -> bool {
    let text = text.trim();
    DEFAULT_CAPTIONS.contains(&text) || PLACEHOLDER_KEYWORDS.iter().any(|k| text.contains(k))
}

/// Whether a shape may be resized to fit its text.
pub fn is_expandable(name: &str) -> bool {
    EXPANDABLE_KEYWORDS.iter().any(|k| name.contains(k))
}

/// Whether an unmatched key may take the next free text placeholder.
pub fn wants_text_placeholder(key: &str) -> bool {
    TEXT_FALLBACK_MARKERS.iter().any(|m| key.contains(m))
}

/// Whether an unmatched key may take the next free picture slot.
pub fn wants_picture_slot(key: &str) -> bool {
    key.contains(PICTURE_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extract_prefix() {
        assert_eq!(extract_prefix("图文页1_文字内容区1"), Some("图文页1"));
        assert_eq!(extract_prefix("标题_1"), None);
        assert_eq!(extract_prefix("封面页"), None);
    }

    #[test]
    fn test_detect_prefix_most_frequent() {
        let paths = vec![
            path(&["图文页1_组合", "图文页1_标题"]),
            path(&["图文页1_正文"]),
            path(&["封面页_标题"]),
        ];
        let prefix = detect_prefix(paths.iter().map(|p| p.as_slice()));
        assert_eq!(prefix.as_deref(), Some("图文页1"));
    }

    #[test]
    fn test_detect_prefix_tie_prefers_longest() {
        let paths = vec![path(&["目录页_标题"]), path(&["图文页12_标题"])];
        let prefix = detect_prefix(paths.iter().map(|p| p.as_slice()));
        assert_eq!(prefix.as_deref(), Some("图文页12"));
    }

    #[test]
    fn test_detect_prefix_none() {
        let paths = vec![path(&["标题 1", "文本框 3"])];
        assert_eq!(detect_prefix(paths.iter().map(|p| p.as_slice())), None);
    }

    #[test]
    fn test_normalize_path_strips_prefix() {
        let normalized = normalize_path(&path(&["图文页1_文字内容区1"]), Some("图文页1"));
        assert_eq!(normalized, vec!["文字内容区1"]);
    }

    #[test]
    fn test_normalize_path_drops_leading_and_decorative_segments() {
        let normalized = normalize_path(
            &path(&["组合 5", "图文页1_要点区", "矩形 3", "要点1"]),
            Some("图文页1"),
        );
        assert_eq!(normalized, vec!["要点区", "要点1"]);
    }

    #[test]
    fn test_normalize_path_without_prefix_segment_is_empty() {
        assert!(normalize_path(&path(&["标题 1"]), Some("图文页1")).is_empty());
        assert_eq!(normalize_path(&path(&["标题"]), None), vec!["标题"]);
    }

    #[test]
    fn test_shape_aliases() {
        let aliases = shape_aliases("图文页1_文字内容区1");
        assert!(aliases.contains("图文页1_文字内容区1"));
        assert!(aliases.contains("文字内容区1"));
        assert!(aliases.contains("图文页1"));

        let aliases = shape_aliases("封面页_课程名称 区");
        assert!(aliases.contains("课程名称 区"));
        assert!(aliases.contains("课程名称区"));
        assert!(aliases.contains("课程名称"));
    }

    #[test]
    fn test_candidate_keys() {
        assert_eq!(candidate_keys("目录内容区"), vec!["目录内容区", "目录内容"]);
        assert_eq!(candidate_keys(" 讲师 名称 "), vec!["讲师 名称", "讲师名称"]);
    }

    #[test]
    fn test_picture_and_placeholder_rules() {
        assert!(is_picture_name("图文页1_图片区1"));
        assert!(is_picture_name("图片 7"));
        assert!(!is_picture_name("文字内容区1"));
        assert!(is_text_placeholder("文本框 9", ""));
        assert!(is_text_placeholder("任意名", "这里是文字内容"));
        assert!(!is_text_placeholder("标题", "第一章"));
        assert!(is_expandable("封面页_课程标题"));
        assert!(wants_text_placeholder("目录内容区1"));
        assert!(wants_picture_slot("图片区2"));
    }

    #[test]
    fn test_normalize_name_is_nfc() {
        // "é" written as e + combining acute
        assert_eq!(normalize_name(" e\u{301} "), "\u{e9}");
    }
}
