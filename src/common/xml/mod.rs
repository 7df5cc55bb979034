//! XML tree, namespace and escaping helpers shared by every XML part.

mod escape;
mod namespace;
mod tree;

pub use escape::{escape_attr, unescape_text};
pub use namespace::{XML_NS, split_qname};
pub use tree::{Descendants, XmlAttr, XmlDeclaration, XmlDocument, XmlElement, XmlError, XmlNode};
