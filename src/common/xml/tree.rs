//! Owned XML element tree used for every XML part of a package.
//!
//! The tree keeps enough of the source to serialize a content-equivalent
//! document: comments, processing instructions and CDATA sections survive,
//! and character data is stored in its escaped form so entity and character
//! references are written back exactly as read. Attribute values are stored
//! unescaped.

use super::escape::{escape_attr, unescape_text};
use super::namespace::{NamespaceScope, split_qname};
use crate::common::bom::decode_text;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use std::borrow::Cow;
use std::io;
use std::sync::Arc;

/// Failure to parse an XML payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (at byte {offset})")]
pub struct XmlError {
    /// Byte offset into the payload where the problem was detected
    pub offset: u64,
    pub message: String,
}

impl XmlError {
    fn new(offset: u64, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// An attribute with its qualified name and unescaped value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttr {
    pub name: String,
    pub value: String,
    ns: Option<Arc<str>>,
}

impl XmlAttr {
    /// Create an attribute without a namespace (plain or `xmlns` declaration).
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ns: None,
        }
    }

    /// Create a prefixed attribute bound to `ns`.
    pub fn with_namespace(ns: &str, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ns: Some(Arc::from(ns)),
        }
    }

    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    #[inline]
    pub fn local_name(&self) -> &str {
        split_qname(&self.name).1
    }

    #[inline]
    pub fn is(&self, ns: &str, local: &str) -> bool {
        self.namespace() == Some(ns) && self.local_name() == local
    }

    /// Namespace declarations (`xmlns`, `xmlns:p`) are not data attributes.
    #[inline]
    pub fn is_declaration(&self) -> bool {
        self.name == "xmlns" || self.name.starts_with("xmlns:")
    }
}

/// A node in element content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    /// Character data, escaped as it appears in the source
    Text(String),
    CData(String),
    Comment(String),
    ProcessingInstruction(String),
    DocType(String),
}

/// An element with resolved namespace, attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    ns: Option<Arc<str>>,
    pub attrs: Vec<XmlAttr>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an element outside any namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ns: None,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create an element in namespace `ns`.
    ///
    /// The caller is responsible for the prefix of `name` being declared in
    /// the document the element ends up in.
    pub fn with_namespace(ns: &str, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ns: Some(Arc::from(ns)),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create an element that shares the namespace of `self`.
    pub fn sibling(&self, local: &str) -> Self {
        let name = match split_qname(&self.name).0 {
            Some(prefix) => format!("{prefix}:{local}"),
            None => local.to_string(),
        };
        Self {
            name,
            ns: self.ns.clone(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    #[inline]
    pub fn namespace(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    #[inline]
    pub fn local_name(&self) -> &str {
        split_qname(&self.name).1
    }

    /// Check namespace and local name.
    #[inline]
    pub fn is(&self, ns: &str, local: &str) -> bool {
        self.local_name() == local && self.namespace() == Some(ns)
    }

    /// Get an attribute by qualified name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Get an attribute by namespace and local name.
    pub fn attr_ns(&self, ns: &str, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.is(ns, local))
            .map(|a| a.value.as_str())
    }

    /// Set an attribute by qualified name, replacing an existing value.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|a| a.name == name) {
            Some(attr) => attr.value = value,
            None => self.attrs.push(XmlAttr::new(name, value)),
        }
    }

    /// Set a namespaced attribute, replacing an existing value.
    pub fn set_attr_ns(&mut self, ns: &str, name: &str, value: impl Into<String>) {
        let value = value.into();
        let local = split_qname(name).1;
        match self.attrs.iter_mut().find(|a| a.is(ns, local)) {
            Some(attr) => attr.value = value,
            None => self.attrs.push(XmlAttr::with_namespace(ns, name, value)),
        }
    }

    /// Remove an attribute by qualified name.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let pos = self.attrs.iter().position(|a| a.name == name)?;
        Some(self.attrs.remove(pos).value)
    }

    /// Iterate over child elements.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    /// Iterate mutably over child elements.
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    /// First child element with the given name.
    pub fn child(&self, ns: &str, local: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.is(ns, local))
    }

    /// First child element with the given name, mutably.
    pub fn child_mut(&mut self, ns: &str, local: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|el| el.is(ns, local))
    }

    /// All child elements with the given name.
    pub fn children_named<'a>(
        &'a self,
        ns: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.elements().filter(move |el| el.is(ns, local))
    }

    /// Position of the first child node that is an element with the given name.
    pub fn position_of(&self, ns: &str, local: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|node| matches!(node, XmlNode::Element(el) if el.is(ns, local)))
    }

    pub fn push_element(&mut self, el: XmlElement) {
        self.children.push(XmlNode::Element(el));
    }

    /// Keep only the child elements matching `keep`; other nodes are kept.
    pub fn retain_elements(&mut self, mut keep: impl FnMut(&XmlElement) -> bool) {
        self.children.retain(|node| match node {
            XmlNode::Element(el) => keep(el),
            _ => true,
        });
    }

    /// Pre-order iterator over this element and all descendant elements.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Visit this element and every descendant element mutably, pre-order.
    pub fn for_each_element_mut(&mut self, f: &mut impl FnMut(&mut XmlElement)) {
        f(self);
        for child in self.elements_mut() {
            child.for_each_element_mut(f);
        }
    }

    /// Concatenated, unescaped character data of all descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(raw) => out.push_str(&unescape_text(raw)),
                XmlNode::CData(data) => out.push_str(data),
                XmlNode::Element(el) => el.collect_text(out),
                _ => {},
            }
        }
    }
}

/// Pre-order traversal of an element subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a XmlElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        let el = self.stack.pop()?;
        let start = self.stack.len();
        self.stack.extend(el.elements());
        self.stack[start..].reverse();
        Some(el)
    }
}

/// The `<?xml ...?>` declaration of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDeclaration {
    pub version: String,
    pub standalone: Option<String>,
}

impl Default for XmlDeclaration {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            standalone: Some("yes".to_string()),
        }
    }
}

/// A parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    pub declaration: Option<XmlDeclaration>,
    /// Comments, processing instructions and doctype before the root
    pub prolog: Vec<XmlNode>,
    pub root: XmlElement,
    /// Comments and processing instructions after the root
    pub epilog: Vec<XmlNode>,
}

impl XmlDocument {
    /// Create a document with a standalone declaration around `root`.
    pub fn new(root: XmlElement) -> Self {
        Self {
            declaration: Some(XmlDeclaration::default()),
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
        }
    }

    /// Parse a document from raw part bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self, XmlError> {
        let text = decode_text(bytes).map_err(|e| {
            XmlError::new(e.valid_up_to() as u64, format!("invalid UTF-8: {e}"))
        })?;
        TreeBuilder::default().build(&text)
    }

    /// Serialize as UTF-8.
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut writer = Writer::new(Vec::with_capacity(4096));
        if let Some(decl) = &self.declaration {
            writer.write_event(Event::Decl(BytesDecl::new(
                &decl.version,
                Some("UTF-8"),
                decl.standalone.as_deref(),
            )))?;
            writer.get_mut().extend_from_slice(b"\r\n");
        }
        for node in &self.prolog {
            write_node(&mut writer, node)?;
        }
        write_element(&mut writer, &self.root)?;
        for node in &self.epilog {
            write_node(&mut writer, node)?;
        }
        Ok(writer.into_inner())
    }
}

#[derive(Default)]
struct TreeBuilder {
    declaration: Option<XmlDeclaration>,
    prolog: Vec<XmlNode>,
    epilog: Vec<XmlNode>,
    root: Option<XmlElement>,
    open: Vec<XmlElement>,
}

impl TreeBuilder {
    fn build(mut self, text: &str) -> Result<XmlDocument, XmlError> {
        let mut reader = Reader::from_str(text);
        let mut scope = NamespaceScope::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|e| XmlError::new(reader.error_position() as u64, e.to_string()))?;
            let offset = reader.buffer_position() as u64;
            match event {
                Event::Decl(decl) => {
                    let version = decl
                        .version()
                        .map(|v| String::from_utf8_lossy(&v).into_owned())
                        .unwrap_or_else(|_| "1.0".to_string());
                    let standalone = decl
                        .standalone()
                        .and_then(|s| s.ok())
                        .map(|s| String::from_utf8_lossy(&s).into_owned());
                    self.declaration = Some(XmlDeclaration {
                        version,
                        standalone,
                    });
                },
                Event::Start(start) => {
                    let el = open_element(&start, &mut scope, offset)?;
                    self.open.push(el);
                },
                Event::Empty(start) => {
                    let el = open_element(&start, &mut scope, offset)?;
                    scope.pop();
                    self.close(el, offset)?;
                },
                Event::End(_) => {
                    let el = self
                        .open
                        .pop()
                        .ok_or_else(|| XmlError::new(offset, "unexpected end tag"))?;
                    scope.pop();
                    self.close(el, offset)?;
                },
                Event::Text(raw) => self.text(&String::from_utf8_lossy(&raw), offset)?,
                Event::GeneralRef(name) => {
                    let raw = format!("&{};", String::from_utf8_lossy(&name));
                    self.text(&raw, offset)?;
                },
                Event::CData(data) => {
                    let data = String::from_utf8_lossy(&data).into_owned();
                    self.misc(XmlNode::CData(data), offset)?;
                },
                Event::Comment(raw) => {
                    let raw = String::from_utf8_lossy(&raw).into_owned();
                    self.misc(XmlNode::Comment(raw), offset)?;
                },
                Event::PI(pi) => {
                    let raw = String::from_utf8_lossy(&pi).into_owned();
                    self.misc(XmlNode::ProcessingInstruction(raw), offset)?;
                },
                Event::DocType(raw) => {
                    let raw = String::from_utf8_lossy(&raw).into_owned();
                    self.misc(XmlNode::DocType(raw), offset)?;
                },
                Event::Eof => break,
            }
        }

        if !self.open.is_empty() {
            return Err(XmlError::new(text.len() as u64, "unclosed element at end of input"));
        }
        let root = self
            .root
            .ok_or_else(|| XmlError::new(text.len() as u64, "document has no root element"))?;
        Ok(XmlDocument {
            declaration: self.declaration,
            prolog: self.prolog,
            root,
            epilog: self.epilog,
        })
    }

    fn close(&mut self, el: XmlElement, offset: u64) -> Result<(), XmlError> {
        if let Some(parent) = self.open.last_mut() {
            parent.children.push(XmlNode::Element(el));
            return Ok(());
        }
        if self.root.is_some() {
            return Err(XmlError::new(offset, "more than one root element"));
        }
        self.root = Some(el);
        Ok(())
    }

    fn text(&mut self, raw: &str, offset: u64) -> Result<(), XmlError> {
        match self.open.last_mut() {
            Some(parent) => {
                if let Some(XmlNode::Text(prev)) = parent.children.last_mut() {
                    prev.push_str(raw);
                } else {
                    parent.children.push(XmlNode::Text(raw.to_string()));
                }
                Ok(())
            },
            None if raw.trim().is_empty() => Ok(()),
            None => Err(XmlError::new(offset, "character data outside the root element")),
        }
    }

    fn misc(&mut self, node: XmlNode, offset: u64) -> Result<(), XmlError> {
        if let Some(parent) = self.open.last_mut() {
            parent.children.push(node);
        } else if matches!(node, XmlNode::CData(_)) {
            return Err(XmlError::new(offset, "CDATA outside the root element"));
        } else if self.root.is_none() {
            self.prolog.push(node);
        } else {
            self.epilog.push(node);
        }
        Ok(())
    }
}

fn open_element(
    start: &BytesStart<'_>,
    scope: &mut NamespaceScope,
    offset: u64,
) -> Result<XmlElement, XmlError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::new(offset, e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| XmlError::new(offset, e.to_string()))?
            .into_owned();
        attrs.push(XmlAttr::new(key, value));
    }

    scope.push(attrs.iter().map(|a| (a.name.as_str(), a.value.as_str())));
    for attr in &mut attrs {
        attr.ns = scope.resolve_attr(&attr.name);
    }
    let ns = scope.resolve_element(&name);
    Ok(XmlElement {
        name,
        ns,
        attrs,
        children: Vec::new(),
    })
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &XmlElement) -> io::Result<()> {
    let mut start = BytesStart::new(el.name.as_str());
    for attr in &el.attrs {
        start.push_attribute(Attribute {
            key: QName(attr.name.as_bytes()),
            value: Cow::Owned(escape_attr(&attr.value).into_bytes()),
        });
    }
    if el.children.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for child in &el.children {
        write_node(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(el.name.as_str())))?;
    Ok(())
}

fn write_node(writer: &mut Writer<Vec<u8>>, node: &XmlNode) -> io::Result<()> {
    match node {
        XmlNode::Element(el) => write_element(writer, el),
        XmlNode::Text(raw) => writer.write_event(Event::Text(BytesText::from_escaped(raw.as_str()))),
        XmlNode::CData(data) => writer.write_event(Event::CData(BytesCData::new(data.as_str()))),
        XmlNode::Comment(raw) => {
            writer.write_event(Event::Comment(BytesText::from_escaped(raw.as_str())))
        },
        XmlNode::ProcessingInstruction(raw) => {
            writer.write_event(Event::PI(BytesPI::new(raw.as_str())))
        },
        XmlNode::DocType(raw) => {
            writer.write_event(Event::DocType(BytesText::from_escaped(raw.as_str())))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    const SAMPLE: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        "\r\n",
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
        r#"<w:body><!-- note --><w:p><w:r><w:t xml:space="preserve"> A &amp; B &#8364; </w:t></w:r></w:p>"#,
        r#"<w:p w:rsidR="00A1"><w:pPr><w:pStyle w:val="Heading1"/></w:pPr></w:p></w:body></w:document>"#
    );

    #[test]
    fn test_parse_resolves_namespaces() {
        let doc = XmlDocument::parse(SAMPLE.as_bytes()).unwrap();
        assert!(doc.root.is(W, "document"));
        let body = doc.root.child(W, "body").unwrap();
        assert_eq!(body.elements().count(), 2);
        let style = body
            .descendants()
            .find(|el| el.is(W, "pStyle"))
            .unwrap();
        assert_eq!(style.attr_ns(W, "val"), Some("Heading1"));
        assert_eq!(style.attr("w:val"), Some("Heading1"));
    }

    #[test]
    fn test_text_is_unescaped_on_read() {
        let doc = XmlDocument::parse(SAMPLE.as_bytes()).unwrap();
        let body = doc.root.child(W, "body").unwrap();
        let first = body.elements().next().unwrap();
        assert_eq!(first.text(), " A & B \u{20ac} ");
    }

    #[test]
    fn test_serialize_round_trip() {
        let doc = XmlDocument::parse(SAMPLE.as_bytes()).unwrap();
        let bytes = doc.to_bytes().unwrap();
        let reparsed = XmlDocument::parse(&bytes).unwrap();
        assert_eq!(doc, reparsed);
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("A &amp; B &#8364;"));
        assert!(text.contains("<!-- note -->"));
    }

    #[test]
    fn test_attribute_whitespace_survives() {
        let mut root = XmlElement::new("root");
        root.set_attr("v", "a\tb\nc");
        let bytes = XmlDocument::new(root).to_bytes().unwrap();
        let reparsed = XmlDocument::parse(&bytes).unwrap();
        assert_eq!(reparsed.root.attr("v"), Some("a\tb\nc"));
    }

    #[test]
    fn test_malformed_reports_offset() {
        let err = XmlDocument::parse(b"<a><b></a>").unwrap_err();
        assert!(err.offset > 0);
    }

    #[test]
    fn test_two_roots_rejected() {
        assert!(XmlDocument::parse(b"<a/><b/>").is_err());
    }

    #[test]
    fn test_descendants_preorder() {
        let doc = XmlDocument::parse(b"<a><b><c/></b><d/></a>").unwrap();
        let names: Vec<&str> = doc.root.descendants().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_sibling_shares_prefix() {
        let doc = XmlDocument::parse(SAMPLE.as_bytes()).unwrap();
        let p = doc.root.sibling("p");
        assert_eq!(p.name, "w:p");
        assert!(p.is(W, "p"));
    }
}
