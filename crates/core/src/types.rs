//! Domain types for content plans.
//!
//! A content plan names which template slides to reuse, in what order, and
//! what values to bind into each of them:
//!
//! ```json
//! { "ppt_pages": [
//!     { "page_type": "图文页", "template_page_num": 2,
//!       "content": { "标题": "…", "图片区1": "images/a.png" } }
//! ] }
//! ```

use crate::error::{Error, Result};
use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered list of slides to build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentPlan {
    /// Slides in output order.
    #[serde(default)]
    pub ppt_pages: Vec<SlidePlan>,
}

impl ContentPlan {
    /// Create a plan from a list of slides.
    pub fn new(pages: Vec<SlidePlan>) -> Self {
        Self { ppt_pages: pages }
    }

    /// Parse a plan from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidPlan(e.to_string()))
    }

    /// Parse a plan from JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| Error::InvalidPlan(e.to_string()))
    }

    /// Number of slides the plan produces.
    pub fn len(&self) -> usize {
        self.ppt_pages.len()
    }

    /// Whether the plan has no slides.
    pub fn is_empty(&self) -> bool {
        self.ppt_pages.is_empty()
    }

    /// Iterate over the slides in output order.
    pub fn pages(&self) -> impl Iterator<Item = &SlidePlan> {
        self.ppt_pages.iter()
    }
}

/// One output slide: which template page to clone and what to put on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlidePlan {
    /// Free-form layout label, used for diagnostics only.
    #[serde(default, deserialize_with = "deserialize_page_type")]
    pub page_type: String,

    /// 1-based template page number. `None` when the key is missing.
    #[serde(default, deserialize_with = "deserialize_page_num")]
    pub template_page_num: Option<i64>,

    /// Values to bind into the cloned slide.
    #[serde(default)]
    pub content: ContentTree,
}

impl SlidePlan {
    /// Create a slide plan for the given template page.
    pub fn new(template_page_num: i64, page_type: impl Into<String>) -> Self {
        Self {
            page_type: page_type.into(),
            template_page_num: Some(template_page_num),
            content: ContentTree::new(),
        }
    }

    /// Attach content to this slide plan.
    pub fn with_content(mut self, content: ContentTree) -> Self {
        self.content = content;
        self
    }

    /// Page type label, or a placeholder when the plan left it blank.
    pub fn page_type_label(&self) -> &str {
        if self.page_type.trim().is_empty() {
            "unknown layout"
        } else {
            &self.page_type
        }
    }
}

/// Treat a `null` page type like a missing one.
fn deserialize_page_type<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept page numbers written as integers or numeric strings.
fn deserialize_page_num<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PageNum {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match Option::<PageNum>::deserialize(deserializer)? {
        None => Ok(None),
        Some(PageNum::Int(n)) => Ok(Some(n)),
        Some(PageNum::Float(f)) if f.fract() == 0.0 => Ok(Some(f as i64)),
        Some(PageNum::Float(f)) => Err(de::Error::custom(format!(
            "template_page_num must be an integer, got {}",
            f
        ))),
        Some(PageNum::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("template_page_num is not a number: {:?}", s))),
    }
}

/// A value in a content tree: either a leaf string or a nested tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentNode {
    Leaf(String),
    Tree(ContentTree),
}

/// Recursive label → value mapping that keeps the document's key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTree {
    entries: Vec<(String, ContentNode)>,
}

impl ContentTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a leaf value, builder style.
    pub fn with_leaf(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(label, ContentNode::Leaf(value.into()));
        self
    }

    /// Add a nested tree, builder style.
    pub fn with_tree(mut self, label: impl Into<String>, tree: ContentTree) -> Self {
        self.insert(label, ContentNode::Tree(tree));
        self
    }

    /// Insert or replace a value. Replacing keeps the original position.
    pub fn insert(&mut self, label: impl Into<String>, node: ContentNode) {
        let label = label.into();
        if let Some(slot) = self.entries.iter_mut().find(|(k, _)| *k == label) {
            slot.1 = node;
        } else {
            self.entries.push((label, node));
        }
    }

    /// Look up a direct child.
    pub fn get(&self, label: &str) -> Option<&ContentNode> {
        self.entries.iter().find(|(k, _)| k == label).map(|(_, v)| v)
    }

    /// Entries in document order.
    pub fn entries(&self) -> &[(String, ContentNode)] {
        &self.entries
    }

    /// Top-level leaf entries in document order.
    pub fn leaves(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|(k, v)| match v {
            ContentNode::Leaf(s) => Some((k.as_str(), s.as_str())),
            ContentNode::Tree(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten into `(path, value)` pairs, depth first, in document order.
    pub fn flatten(&self) -> Vec<(Vec<String>, String)> {
        fn walk(tree: &ContentTree, prefix: &mut Vec<String>, out: &mut Vec<(Vec<String>, String)>) {
            for (label, node) in &tree.entries {
                prefix.push(label.clone());
                match node {
                    ContentNode::Leaf(value) => out.push((prefix.clone(), value.clone())),
                    ContentNode::Tree(child) => walk(child, prefix, out),
                }
                prefix.pop();
            }
        }

        let mut out = Vec::new();
        walk(self, &mut Vec::new(), &mut out);
        out
    }
}

impl Serialize for ContentTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, node) in &self.entries {
            map.serialize_entry(label, node)?;
        }
        map.end()
    }
}

impl Serialize for ContentNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ContentNode::Leaf(value) => serializer.serialize_str(value),
            ContentNode::Tree(tree) => tree.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for ContentTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TreeVisitor;

        impl<'de> Visitor<'de> for TreeVisitor {
            type Value = ContentTree;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of content values")
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
                Ok(ContentTree::new())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Self::Value, A::Error> {
                let mut tree = ContentTree::new();
                while let Some((label, node)) = map.next_entry::<String, ContentNode>()? {
                    tree.insert(label, node);
                }
                Ok(tree)
            }
        }

        deserializer.deserialize_any(TreeVisitor)
    }
}

impl<'de> Deserialize<'de> for ContentNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct NodeVisitor;

        impl<'de> Visitor<'de> for NodeVisitor {
            type Value = ContentNode;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a string, number, list of strings or nested object")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
                Ok(ContentNode::Leaf(v.to_string()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Self::Value, E> {
                Ok(ContentNode::Leaf(v))
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Self::Value, E> {
                Ok(ContentNode::Leaf(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
                Ok(ContentNode::Leaf(v.to_string()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
                Ok(ContentNode::Leaf(v.to_string()))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
                Ok(ContentNode::Leaf(v.to_string()))
            }

            fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
                Ok(ContentNode::Leaf(String::new()))
            }

            fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
                Ok(ContentNode::Leaf(String::new()))
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error> {
                let mut lines = Vec::new();
                while let Some(item) = seq.next_element::<ContentNode>()? {
                    match item {
                        ContentNode::Leaf(line) => lines.push(line),
                        ContentNode::Tree(_) => {
                            return Err(de::Error::custom("lists may only contain plain values"));
                        }
                    }
                }
                Ok(ContentNode::Leaf(lines.join("\n")))
            }

            fn visit_map<A: MapAccess<'de>>(self, map: A) -> std::result::Result<Self::Value, A::Error> {
                let tree = ContentTree::deserialize(de::value::MapAccessDeserializer::new(map))?;
                Ok(ContentNode::Tree(tree))
            }
        }

        deserializer.deserialize_any(NodeVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plan_keeps_key_order() {
        let json = r#"{
            "ppt_pages": [
                {
                    "page_type": "图文页",
                    "template_page_num": 2,
                    "content": { "标题": "A", "正文区": { "z": "1", "a": "2" }, "图片区1": "x.png" }
                }
            ]
        }"#;
        let plan = ContentPlan::from_json(json).unwrap();
        assert_eq!(plan.len(), 1);
        let page = &plan.ppt_pages[0];
        assert_eq!(page.template_page_num, Some(2));
        let labels: Vec<&str> = page.content.entries().iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(labels, vec!["标题", "正文区", "图片区1"]);

        let flat = page.content.flatten();
        assert_eq!(flat[1].0, vec!["正文区".to_string(), "z".to_string()]);
        assert_eq!(flat[2].0, vec!["正文区".to_string(), "a".to_string()]);
        assert_eq!(flat.len(), 4);
    }

    #[test]
    fn test_scalar_leaves_are_stringified() {
        let json = r#"{ "ppt_pages": [ { "template_page_num": "3",
            "content": { "n": 5, "b": true, "empty": null, "lines": ["a", "b"] } } ] }"#;
        let plan = ContentPlan::from_json(json).unwrap();
        let page = &plan.ppt_pages[0];
        assert_eq!(page.template_page_num, Some(3));
        let leaves: Vec<(&str, &str)> = page.content.leaves().collect();
        assert_eq!(
            leaves,
            vec![("n", "5"), ("b", "true"), ("empty", ""), ("lines", "a\nb")]
        );
        assert_eq!(page.page_type_label(), "unknown layout");
    }

    #[test]
    fn test_null_page_type_is_unknown_layout() {
        let plan = ContentPlan::from_json(
            r#"{ "ppt_pages": [ { "page_type": null, "template_page_num": 1 } ] }"#,
        )
        .unwrap();
        let page = &plan.ppt_pages[0];
        assert_eq!(page.page_type, "");
        assert_eq!(page.page_type_label(), "unknown layout");
        assert_eq!(page.template_page_num, Some(1));
    }

    #[test]
    fn test_missing_page_number_is_none() {
        let plan = ContentPlan::from_json(r#"{ "ppt_pages": [ { "page_type": "封面" } ] }"#).unwrap();
        assert_eq!(plan.ppt_pages[0].template_page_num, None);
        assert!(plan.ppt_pages[0].content.is_empty());
    }

    #[test]
    fn test_malformed_json_is_validation_error() {
        let err = ContentPlan::from_json("{ not json").unwrap_err();
        assert!(err.is_validation());
        let err = ContentPlan::from_json(r#"{ "ppt_pages": [ { "template_page_num": 1.5 } ] }"#)
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_tree_serializes_in_order() {
        let tree = ContentTree::new()
            .with_leaf("b", "1")
            .with_tree("a", ContentTree::new().with_leaf("x", "2"));
        let json = serde_json::to_string(&tree).unwrap();
        assert_eq!(json, r#"{"b":"1","a":{"x":"2"}}"#);
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut tree = ContentTree::new().with_leaf("a", "1").with_leaf("b", "2");
        tree.insert("a", ContentNode::Leaf("3".into()));
        assert_eq!(tree.get("a"), Some(&ContentNode::Leaf("3".into())));
        assert_eq!(tree.entries()[0].0, "a");
    }
}
