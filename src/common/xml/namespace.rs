//! In-scope namespace tracking while building an element tree.

use std::sync::Arc;

/// The namespace permanently bound to the `xml` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Split a qualified name into its optional prefix and local part.
#[inline]
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

/// Stack of prefix bindings, one frame per open element.
///
/// The default namespace is stored under the empty prefix; an empty URI
/// undeclares it.
#[derive(Debug)]
pub(crate) struct NamespaceScope {
    bindings: Vec<(String, Arc<str>)>,
    frames: Vec<usize>,
}

impl NamespaceScope {
    pub(crate) fn new() -> Self {
        Self {
            bindings: vec![("xml".to_string(), Arc::from(XML_NS))],
            frames: Vec::new(),
        }
    }

    /// Open a frame holding the `xmlns` declarations among `attrs`.
    pub(crate) fn push<'a>(&mut self, attrs: impl Iterator<Item = (&'a str, &'a str)>) {
        self.frames.push(self.bindings.len());
        for (name, value) in attrs {
            if name == "xmlns" {
                self.bindings.push((String::new(), Arc::from(value)));
            } else if let Some(prefix) = name.strip_prefix("xmlns:") {
                self.bindings.push((prefix.to_string(), Arc::from(value)));
            }
        }
    }

    /// Close the innermost frame.
    pub(crate) fn pop(&mut self) {
        if let Some(mark) = self.frames.pop() {
            self.bindings.truncate(mark);
        }
    }

    fn lookup(&self, prefix: &str) -> Option<Arc<str>> {
        self.bindings
            .iter()
            .rev()
            .find(|(bound, _)| bound == prefix)
            .map(|(_, uri)| uri.clone())
            .filter(|uri| !uri.is_empty())
    }

    /// Resolve an element name; unprefixed names take the default namespace.
    pub(crate) fn resolve_element(&self, qname: &str) -> Option<Arc<str>> {
        match split_qname(qname) {
            (Some(prefix), _) => self.lookup(prefix),
            (None, _) => self.lookup(""),
        }
    }

    /// Resolve an attribute name; unprefixed attributes have no namespace.
    pub(crate) fn resolve_attr(&self, qname: &str) -> Option<Arc<str>> {
        match split_qname(qname) {
            (Some("xmlns"), _) => None,
            (Some(prefix), _) => self.lookup(prefix),
            (None, _) => None,
        }
    }
}
