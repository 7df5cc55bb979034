//! The package: parts, content types, relationships and the content index.

use super::constants::{CONTENT_TYPES_MEMBER, is_office_document};
use super::content_types::ContentTypes;
use super::node::{ContentIndex, ContentNode};
use super::packuri::{PackURI, percent_decode};
use super::pool::{PoolKind, RefList, ResourceRef};
use super::rel::{RelationshipGraph, Relationships};
use crate::backend::{self, BackendKind, ElementTree, FormatBackend, Payload};
use crate::common::FormatError;
use crate::common::xml::XmlDocument;
use crate::layout::{self, DocumentLayout};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// A named unit of content owned by a package.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    name: PackURI,
    content_type: String,
    payload: Payload,
}

impl Part {
    pub fn new(name: PackURI, content_type: impl Into<String>, payload: Payload) -> Self {
        Self {
            name,
            content_type: content_type.into(),
            payload,
        }
    }

    #[inline]
    pub fn name(&self) -> &PackURI {
        &self.name
    }

    #[inline]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Parsed XML of the part, if it is an XML part.
    #[inline]
    pub fn xml(&self) -> Option<&Arc<XmlDocument>> {
        self.payload.as_xml()
    }

    /// Same part with a new payload.
    pub fn with_payload(&self, payload: Payload) -> Self {
        Self {
            name: self.name.clone(),
            content_type: self.content_type.clone(),
            payload,
        }
    }
}

/// An office document package.
///
/// Loaded once from bytes and read-only afterwards: fragments are built as
/// new packages that share untouched part payloads with their source.
#[derive(Debug)]
pub struct Package {
    backend: BackendKind,
    parts: Vec<Part>,
    /// Lower-cased part name -> position in `parts`
    index: HashMap<String, usize>,
    content_types: ContentTypes,
    relationships: RelationshipGraph,
    main: usize,
    layout: &'static dyn DocumentLayout,
    content: OnceLock<ContentIndex>,
}

impl Package {
    /// Load a package, picking the backend from the container signature.
    pub fn load(bytes: &[u8]) -> Result<Self, FormatError> {
        let backend = backend::detect(bytes)?;
        Self::load_with(bytes, backend)
    }

    /// Load a package through a specific backend.
    pub fn load_with(bytes: &[u8], backend: &dyn FormatBackend) -> Result<Self, FormatError> {
        let tree = backend.decode(bytes)?;
        let package = Self::from_tree(backend.kind(), tree)?;
        let content = package.content_index()?;
        tracing::info!(
            backend = %package.backend,
            layout = %package.layout.kind(),
            parts = package.parts.len(),
            nodes = content.len(),
            units = content.units.len(),
            "package loaded"
        );
        Ok(package)
    }

    /// Build the package model from a decoded member tree.
    pub fn from_tree(backend: BackendKind, tree: ElementTree) -> Result<Self, FormatError> {
        let mut content_types = None;
        let mut rels_parts: Vec<(PackURI, PackURI, Payload)> = Vec::new();
        let mut members: Vec<(PackURI, Payload)> = Vec::new();

        for entry in tree.into_entries() {
            if entry.name.eq_ignore_ascii_case(CONTENT_TYPES_MEMBER) {
                let doc = entry
                    .payload
                    .as_xml()
                    .ok_or_else(|| FormatError::malformed(CONTENT_TYPES_MEMBER, "not XML"))?;
                content_types = Some(ContentTypes::parse(doc)?);
                continue;
            }
            let name = PackURI::from_member(&entry.name);
            match name.rels_source() {
                Some(source) => rels_parts.push((name, source, entry.payload)),
                None => members.push((name, entry.payload)),
            }
        }
        let content_types = content_types.ok_or(FormatError::MissingContentTypes)?;

        let mut parts = Vec::with_capacity(members.len());
        let mut index = HashMap::with_capacity(members.len());
        for (name, payload) in members {
            let content_type = content_types
                .content_type_of(&name)
                .ok_or_else(|| FormatError::MissingContentType(name.to_string()))?
                .to_string();
            index.insert(name.key(), parts.len());
            parts.push(Part::new(name, content_type, payload));
        }

        let mut relationships = RelationshipGraph::new();
        for (rels_name, source, payload) in rels_parts {
            let source = if source.is_package() {
                source
            } else {
                match index.get(&source.key()) {
                    Some(&pos) => parts[pos].name.clone(),
                    None => {
                        tracing::warn!(part = %rels_name, "relationship part without source ignored");
                        continue;
                    },
                }
            };
            let doc = payload
                .as_xml()
                .ok_or_else(|| FormatError::malformed(&rels_name, "not XML"))?;
            relationships.insert(Relationships::parse(source, doc)?);
        }

        relationships.validate(|target| {
            let found = index.get(&target.key()).or_else(|| {
                let decoded = percent_decode(target.as_str());
                index.get(&decoded.to_ascii_lowercase())
            });
            found.map(|&pos| parts[pos].name.clone())
        })?;

        let main_name = relationships
            .get(&PackURI::package())
            .and_then(|rels| {
                rels.iter()
                    .find(|rel| is_office_document(rel.reltype()) && !rel.is_external())
            })
            .and_then(|rel| rel.target_part())
            .ok_or(FormatError::MissingMainDocument)?;
        let main = index
            .get(&main_name.key())
            .copied()
            .ok_or(FormatError::MissingMainDocument)?;

        let main_type = parts[main].content_type();
        let layout = layout::layout_for(main_type)
            .ok_or_else(|| FormatError::UnsupportedDocument(main_type.to_string()))?;

        Ok(Package {
            backend,
            parts,
            index,
            content_types,
            relationships,
            main,
            layout,
            content: OnceLock::new(),
        })
    }

    /// Assemble a package from already-validated pieces.
    pub(crate) fn from_parts(
        backend: BackendKind,
        parts: Vec<Part>,
        content_types: ContentTypes,
        relationships: RelationshipGraph,
        main: &PackURI,
        layout: &'static dyn DocumentLayout,
    ) -> Result<Self, FormatError> {
        let index: HashMap<String, usize> = parts
            .iter()
            .enumerate()
            .map(|(pos, part)| (part.name.key(), pos))
            .collect();
        let main = index
            .get(&main.key())
            .copied()
            .ok_or(FormatError::MissingMainDocument)?;
        Ok(Package {
            backend,
            parts,
            index,
            content_types,
            relationships,
            main,
            layout,
            content: OnceLock::new(),
        })
    }

    /// Container family this package was decoded from.
    #[inline]
    pub fn backend_kind(&self) -> BackendKind {
        self.backend
    }

    /// All parts, relationship parts and the content type map excluded.
    #[inline]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Look up a part by name (case-insensitive).
    pub fn part(&self, name: &PackURI) -> Option<&Part> {
        self.index.get(&name.key()).map(|&pos| &self.parts[pos])
    }

    /// Parsed XML of a part, or a format error naming the part.
    pub fn xml_part(&self, name: &PackURI) -> Result<&Arc<XmlDocument>, FormatError> {
        let part = self
            .part(name)
            .ok_or_else(|| FormatError::malformed(name, "part is missing"))?;
        part.xml()
            .ok_or_else(|| FormatError::malformed(name, "part is not XML"))
    }

    /// Relationships whose source is `part` (`/` for the package).
    pub fn relationships_of(&self, part: &PackURI) -> Option<&Relationships> {
        self.relationships.get(part)
    }

    #[inline]
    pub fn relationships(&self) -> &RelationshipGraph {
        &self.relationships
    }

    #[inline]
    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    /// The main document part.
    #[inline]
    pub fn main_part(&self) -> &Part {
        &self.parts[self.main]
    }

    #[inline]
    pub fn layout(&self) -> &'static dyn DocumentLayout {
        self.layout
    }

    /// The content nodes of the main content stream, in document order.
    pub fn main_content_stream(&self) -> Result<&[ContentNode], FormatError> {
        Ok(&self.content_index()?.nodes)
    }

    /// Content nodes, units and pools, discovered on first use.
    pub fn content_index(&self) -> Result<&ContentIndex, FormatError> {
        if let Some(content) = self.content.get() {
            return Ok(content);
        }
        let built = self.layout.index(self)?;
        Ok(self.content.get_or_init(|| built))
    }

    /// Part and Relationship pools plus package-level roots.
    ///
    /// A part depends on the targets of its internal relationships. The
    /// main part's relationships are the Relationship pool instead, each
    /// depending on its target part, so only referenced ones are followed.
    pub(crate) fn base_index(&self) -> ContentIndex {
        let mut content = ContentIndex::default();
        let main = self.main_part().name();

        let parts = content.pools.get_mut(PoolKind::Part);
        for part in &self.parts {
            let mut deps = RefList::new();
            if part.name() != main
                && let Some(rels) = self.relationships.get(part.name())
            {
                deps.extend(
                    rels.iter()
                        .filter_map(|rel| rel.target_part())
                        .map(|target| ResourceRef::new(PoolKind::Part, target.as_str())),
                );
            }
            parts.insert(part.name().as_str(), deps);
        }

        if let Some(rels) = self.relationships.get(main) {
            let pool = content.pools.get_mut(PoolKind::Relationship);
            for rel in rels {
                let deps = rel
                    .target_part()
                    .map(|target| ResourceRef::new(PoolKind::Part, target.as_str()))
                    .into_iter()
                    .collect();
                pool.insert(rel.r_id(), deps);
            }
        }

        if let Some(rels) = self.relationships.get(&PackURI::package()) {
            content.ambient.extend(
                rels.iter()
                    .filter_map(|rel| rel.target_part())
                    .map(|target| ResourceRef::new(PoolKind::Part, target.as_str())),
            );
        }
        content
    }
}
