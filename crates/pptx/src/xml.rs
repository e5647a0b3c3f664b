//! A small owned XML element tree on top of quick-xml.
//!
//! Parts are parsed on demand, edited in place and written back. Names are
//! kept exactly as they appear (`p:sp`, `a:t`); lookups compare local names so
//! unusual prefixes still resolve. Whitespace text is preserved.

use deck_core::{Error, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

/// A node in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
    CData(String),
    Comment(String),
}

/// An element with its attributes (in document order) and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

/// A parsed part: the root element of an XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub root: XmlElement,
}

/// Extract the local name from a potentially namespaced XML name.
pub fn local_name(name: &str) -> &str {
    match name.split_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

/// The namespace prefix of a name, if any.
pub fn prefix_of(name: &str) -> Option<&str> {
    name.split_once(':').map(|(p, _)| p)
}

impl XmlElement {
    /// Create an element with no attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute, builder style.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Add a child element, builder style.
    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// Add a text child, builder style.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }

    pub fn is(&self, local: &str) -> bool {
        self.local_name() == local
    }

    /// Attribute value by exact (qualified) name.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, keeping its position when it already exists.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Child elements in order.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
    }

    /// First child element with the given local name.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.is(local))
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|e| e.is(local))
    }

    /// All child elements with the given local name.
    pub fn children_named<'a>(&'a self, local: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |e| e.is(local))
    }

    /// Follow a chain of local names through first matching children.
    pub fn find_path(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter().try_fold(self, |el, local| el.child(local))
    }

    pub fn find_path_mut(&mut self, path: &[&str]) -> Option<&mut XmlElement> {
        let mut current = self;
        for local in path {
            current = current.child_mut(local)?;
        }
        Some(current)
    }

    /// First descendant (depth first, excluding self) with the given local name.
    pub fn descendant(&self, local: &str) -> Option<&XmlElement> {
        for child in self.elements() {
            if child.is(local) {
                return Some(child);
            }
            if let Some(found) = child.descendant(local) {
                return Some(found);
            }
        }
        None
    }

    /// All descendants with the given local name, in document order.
    pub fn descendants_named(&self, local: &str) -> Vec<&XmlElement> {
        fn walk<'a>(el: &'a XmlElement, local: &str, out: &mut Vec<&'a XmlElement>) {
            for child in el.elements() {
                if child.is(local) {
                    out.push(child);
                }
                walk(child, local, out);
            }
        }
        let mut out = Vec::new();
        walk(self, local, &mut out);
        out
    }

    /// Visit every descendant element mutably.
    pub fn for_each_descendant_mut(&mut self, f: &mut dyn FnMut(&mut XmlElement)) {
        for child in self.elements_mut() {
            f(child);
            child.for_each_descendant_mut(f);
        }
    }

    /// Concatenated text of this element and its descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(t) | XmlNode::CData(t) => out.push_str(t),
                XmlNode::Element(e) => e.collect_text(out),
                XmlNode::Comment(_) => {}
            }
        }
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.children = vec![XmlNode::Text(text.into())];
    }

    /// Append a child element.
    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Remove all child elements with the given local name.
    pub fn remove_children(&mut self, local: &str) {
        self.children
            .retain(|n| !matches!(n, XmlNode::Element(e) if e.is(local)));
    }

    /// Index in `children` of the first element with the given local name.
    pub fn position_of(&self, local: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|n| matches!(n, XmlNode::Element(e) if e.is(local)))
    }

    /// Namespace prefix bound to `uri` by an `xmlns:*` attribute on this element.
    pub fn prefix_for_namespace(&self, uri: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, v)| k.starts_with("xmlns:") && v == uri)
            .map(|(k, _)| &k["xmlns:".len()..])
    }

    /// Serialize this element alone, without an XML declaration.
    pub fn to_xml_string(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        write_element(&mut writer, self)?;
        String::from_utf8(writer.into_inner())
            .map_err(|e| Error::XmlError(format!("Serialized XML is not UTF-8: {}", e)))
    }
}

impl XmlDocument {
    pub fn new(root: XmlElement) -> Self {
        Self { root }
    }

    /// Parse a complete XML document.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let mut nodes = parse_nodes(bytes)?;
        let pos = nodes
            .iter()
            .position(|n| matches!(n, XmlNode::Element(_)))
            .ok_or_else(|| Error::XmlError("Document has no root element".to_string()))?;
        match nodes.swap_remove(pos) {
            XmlNode::Element(root) => Ok(Self { root }),
            _ => Err(Error::XmlError("Document has no root element".to_string())),
        }
    }

    /// Serialize with a standalone UTF-8 declaration, as Office writes its parts.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(xml_err)?;
        writer
            .write_event(Event::Text(BytesText::from_escaped("\r\n")))
            .map_err(xml_err)?;
        write_element(&mut writer, &self.root)?;
        Ok(writer.into_inner())
    }
}

/// Parse an XML fragment holding a single element, such as a snapshot of one shape.
pub fn parse_fragment(xml: &str) -> Result<XmlElement> {
    parse_nodes(xml.as_bytes())?
        .into_iter()
        .find_map(|n| match n {
            XmlNode::Element(e) => Some(e),
            _ => None,
        })
        .ok_or_else(|| Error::XmlError("Fragment has no element".to_string()))
}

fn xml_err(e: quick_xml::Error) -> Error {
    Error::XmlError(e.to_string())
}

fn start_to_element(e: &BytesStart) -> Result<XmlElement> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut element = XmlElement::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| Error::XmlError(format!("Bad attribute: {}", e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_err)?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

/// Parse a byte slice into top-level nodes.
fn parse_nodes(bytes: &[u8]) -> Result<Vec<XmlNode>> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(false);

    let mut top: Vec<XmlNode> = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();

    fn attach(stack: &mut [XmlElement], top: &mut Vec<XmlNode>, node: XmlNode) {
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => top.push(node),
        }
    }

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(start_to_element(e)?),
            Ok(Event::Empty(ref e)) => {
                let element = start_to_element(e)?;
                attach(&mut stack, &mut top, XmlNode::Element(element));
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::XmlError("Unbalanced end tag".to_string()))?;
                attach(&mut stack, &mut top, XmlNode::Element(element));
            }
            Ok(Event::Text(ref e)) => {
                // Whitespace outside the root carries nothing.
                if stack.is_empty() {
                    continue;
                }
                let text = e.unescape().map_err(xml_err)?.into_owned();
                attach(&mut stack, &mut top, XmlNode::Text(text));
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                attach(&mut stack, &mut top, XmlNode::CData(text));
            }
            Ok(Event::Comment(ref e)) => {
                let text = String::from_utf8_lossy(e).into_owned();
                attach(&mut stack, &mut top, XmlNode::Comment(text));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    if !stack.is_empty() {
        return Err(Error::XmlError("Unexpected end of document".to_string()));
    }
    Ok(top)
}

fn write_element<W: std::io::Write>(writer: &mut Writer<W>, element: &XmlElement) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() {
        return writer.write_event(Event::Empty(start)).map_err(xml_err);
    }

    writer.write_event(Event::Start(start)).map_err(xml_err)?;
    for child in &element.children {
        match child {
            XmlNode::Element(e) => write_element(writer, e)?,
            XmlNode::Text(t) => writer
                .write_event(Event::Text(BytesText::new(t)))
                .map_err(xml_err)?,
            XmlNode::CData(t) => writer
                .write_event(Event::CData(quick_xml::events::BytesCData::new(t.as_str())))
                .map_err(xml_err)?,
            XmlNode::Comment(t) => writer
                .write_event(Event::Comment(BytesText::from_escaped(t.as_str())))
                .map_err(xml_err)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name.as_str())))
        .map_err(xml_err)
}
