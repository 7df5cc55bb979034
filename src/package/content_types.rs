//! The `[Content_Types].xml` map.

use super::constants::{CONTENT_TYPES_MEMBER, content_type, namespace};
use super::packuri::PackURI;
use crate::common::FormatError;
use crate::common::xml::{XmlAttr, XmlDocument, XmlElement};

/// Default (by extension) and Override (by part name) content types, in
/// source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTypes {
    defaults: Vec<(String, String)>,
    overrides: Vec<(PackURI, String)>,
}

impl ContentTypes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(doc: &XmlDocument) -> Result<Self, FormatError> {
        if doc.root.local_name() != "Types" {
            return Err(FormatError::malformed(CONTENT_TYPES_MEMBER, "root element is not Types"));
        }
        let mut types = ContentTypes::new();
        for el in doc.root.elements() {
            match (el.local_name(), el.attr("ContentType")) {
                ("Default", Some(ct)) => {
                    if let Some(ext) = el.attr("Extension") {
                        types.add_default(ext, ct);
                    }
                },
                ("Override", Some(ct)) => {
                    if let Some(name) = el.attr("PartName").and_then(PackURI::new) {
                        types.add_override(name, ct);
                    }
                },
                _ => {},
            }
        }
        Ok(types)
    }

    pub fn add_default(&mut self, ext: &str, content_type: &str) {
        if self.default_for(ext).is_none() {
            self.defaults.push((ext.to_string(), content_type.to_string()));
        }
    }

    pub fn add_override(&mut self, part: PackURI, content_type: &str) {
        let key = part.key();
        match self.overrides.iter_mut().find(|(name, _)| name.key() == key) {
            Some((_, ct)) => *ct = content_type.to_string(),
            None => self.overrides.push((part, content_type.to_string())),
        }
    }

    fn default_for(&self, ext: &str) -> Option<&str> {
        self.defaults
            .iter()
            .find(|(e, _)| e.eq_ignore_ascii_case(ext))
            .map(|(_, ct)| ct.as_str())
    }

    /// Content type of a part: its Override, else the Default for its extension.
    pub fn content_type_of(&self, part: &PackURI) -> Option<&str> {
        self.overrides
            .iter()
            .find(|(name, _)| name.as_str().eq_ignore_ascii_case(part.as_str()))
            .map(|(_, ct)| ct.as_str())
            .or_else(|| self.default_for(part.ext()))
    }

    /// Content types restricted to `parts`: Overrides of listed parts and
    /// Defaults of the extensions they use. `rels` and `xml` Defaults are
    /// always kept.
    pub fn restricted_to<'a>(&self, parts: impl IntoIterator<Item = &'a PackURI>) -> ContentTypes {
        let parts: Vec<&PackURI> = parts.into_iter().collect();
        let keys: Vec<String> = parts.iter().map(|p| p.key()).collect();

        let defaults = self
            .defaults
            .iter()
            .filter(|(ext, _)| {
                ext.eq_ignore_ascii_case("rels")
                    || ext.eq_ignore_ascii_case("xml")
                    || parts.iter().any(|p| p.ext().eq_ignore_ascii_case(ext))
            })
            .cloned()
            .collect();
        let overrides = self
            .overrides
            .iter()
            .filter(|(name, _)| keys.contains(&name.key()))
            .cloned()
            .collect();
        ContentTypes {
            defaults,
            overrides,
        }
    }

    /// Serialize as `[Content_Types].xml`.
    pub fn to_xml(&self) -> XmlDocument {
        let mut root = XmlElement::with_namespace(namespace::OPC_CONTENT_TYPES, "Types");
        root.attrs
            .push(XmlAttr::new("xmlns", namespace::OPC_CONTENT_TYPES));

        let mut defaults = self.defaults.clone();
        if !defaults.iter().any(|(ext, _)| ext.eq_ignore_ascii_case("rels")) {
            defaults.insert(0, ("rels".to_string(), content_type::OPC_RELATIONSHIPS.to_string()));
        }
        for (ext, ct) in &defaults {
            let mut el = XmlElement::with_namespace(namespace::OPC_CONTENT_TYPES, "Default");
            el.attrs.push(XmlAttr::new("Extension", ext.as_str()));
            el.attrs.push(XmlAttr::new("ContentType", ct.as_str()));
            root.push_element(el);
        }
        for (name, ct) in &self.overrides {
            let mut el = XmlElement::with_namespace(namespace::OPC_CONTENT_TYPES, "Override");
            el.attrs.push(XmlAttr::new("PartName", name.as_str()));
            el.attrs.push(XmlAttr::new("ContentType", ct.as_str()));
            root.push_element(el);
        }
        XmlDocument::new(root)
    }
}
