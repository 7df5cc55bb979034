//! Constant values of the Open Packaging Conventions and the three document
//! vocabularies the splitter understands.
//!
//! Namespaces identify elements and attributes; relationship types decide
//! which relationships travel with content and which belong to every fragment.

/// Member holding the content type map.
pub const CONTENT_TYPES_MEMBER: &str = "[Content_Types].xml";

/// Content type URIs (like MIME-types) that specify a part's format
pub mod content_type {
    pub const OPC_RELATIONSHIPS: &str = "application/vnd.openxmlformats-package.relationships+xml";
}

/// XML namespace URIs
pub mod namespace {
    /// OPC relationships namespace
    pub const OPC_RELATIONSHIPS: &str =
        "http://schemas.openxmlformats.org/package/2006/relationships";

    /// OPC content types namespace
    pub const OPC_CONTENT_TYPES: &str =
        "http://schemas.openxmlformats.org/package/2006/content-types";

    /// Office relationships namespace (`r:` attributes)
    pub const R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    /// VML office namespace (`o:relid`)
    pub const O: &str = "urn:schemas-microsoft-com:office:office";

    /// WordprocessingML main namespace
    pub const W: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

    /// SpreadsheetML main namespace
    pub const S: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

    /// PresentationML main namespace
    pub const P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";

    /// DrawingML main namespace
    pub const A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";

    /// PowerPoint 2010 extensions (sections)
    pub const P14: &str = "http://schemas.microsoft.com/office/powerpoint/2010/main";
}

/// Open XML relationship target modes
pub mod target_mode {
    /// External relationship target mode (e.g., hyperlinks to external URLs)
    pub const EXTERNAL: &str = "External";
}

/// Relationship type URIs
pub mod relationship_type {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    /// Strict Open XML flavor of the main document relationship
    pub const OFFICE_DOCUMENT_STRICT: &str =
        "http://purl.oclc.org/ooxml/officeDocument/relationships/officeDocument";

    pub const STYLES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
}

/// Last path segment of a relationship type (`.../relationships/image` -> `image`).
///
/// Transitional and strict vocabularies share these suffixes, so layouts
/// classify relationships by suffix.
#[inline]
pub fn reltype_suffix(reltype: &str) -> &str {
    reltype.rsplit('/').next().unwrap_or(reltype)
}

/// Whether a relationship type names the main document.
pub fn is_office_document(reltype: &str) -> bool {
    reltype == relationship_type::OFFICE_DOCUMENT || reltype == relationship_type::OFFICE_DOCUMENT_STRICT
}
