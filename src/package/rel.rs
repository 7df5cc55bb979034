//! Relationships between parts.
//!
//! Each `.rels` part lists the relationships of one source part. They are
//! lifted into a [`RelationshipGraph`] keyed by source, with the targets of
//! internal relationships resolved to part names at load time.

use super::constants::{namespace, target_mode};
use super::packuri::PackURI;
use crate::common::FormatError;
use crate::common::xml::{XmlAttr, XmlDocument, XmlElement};
use std::collections::HashMap;

/// A single relationship from a source part to a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Relationship ID (e.g., "rId1", "rId2")
    r_id: String,

    /// Relationship type URI
    reltype: String,

    /// Target reference as written - a relative part reference or external URL
    target_ref: String,

    /// Resolved target part for internal relationships
    target: Option<PackURI>,
}

impl Relationship {
    pub fn internal(r_id: String, reltype: String, target_ref: String, target: PackURI) -> Self {
        Self {
            r_id,
            reltype,
            target_ref,
            target: Some(target),
        }
    }

    pub fn external(r_id: String, reltype: String, target_ref: String) -> Self {
        Self {
            r_id,
            reltype,
            target_ref,
            target: None,
        }
    }

    /// Same relationship under a different id.
    pub fn with_id(&self, r_id: String) -> Self {
        Self {
            r_id,
            ..self.clone()
        }
    }

    #[inline]
    pub fn r_id(&self) -> &str {
        &self.r_id
    }

    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// Target reference as written in the relationship part.
    #[inline]
    pub fn target_ref(&self) -> &str {
        &self.target_ref
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.target.is_none()
    }

    /// Target part of an internal relationship.
    #[inline]
    pub fn target_part(&self) -> Option<&PackURI> {
        self.target.as_ref()
    }

    fn to_element(&self) -> XmlElement {
        let mut el = XmlElement::with_namespace(namespace::OPC_RELATIONSHIPS, "Relationship");
        el.attrs.push(XmlAttr::new("Id", self.r_id.as_str()));
        el.attrs.push(XmlAttr::new("Type", self.reltype.as_str()));
        el.attrs.push(XmlAttr::new("Target", self.target_ref.as_str()));
        if self.is_external() {
            el.attrs.push(XmlAttr::new("TargetMode", target_mode::EXTERNAL));
        }
        el
    }
}

/// Relationships of one source part, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationships {
    source: PackURI,
    rels: Vec<Relationship>,
    by_id: HashMap<String, usize>,
}

impl Relationships {
    pub fn new(source: PackURI) -> Self {
        Self {
            source,
            rels: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    /// Parse a relationship part.
    ///
    /// Targets are resolved against the source directory but not checked
    /// for existence; see [`RelationshipGraph::validate`].
    pub fn parse(source: PackURI, doc: &XmlDocument) -> Result<Self, FormatError> {
        let rels_name = source.rels_uri();
        if doc.root.local_name() != "Relationships" {
            return Err(FormatError::malformed(&rels_name, "root element is not Relationships"));
        }

        let mut rels = Relationships::new(source);
        for el in doc.root.elements() {
            if el.local_name() != "Relationship" {
                continue;
            }
            let (Some(r_id), Some(reltype), Some(target_ref)) =
                (el.attr("Id"), el.attr("Type"), el.attr("Target"))
            else {
                return Err(FormatError::malformed(
                    &rels_name,
                    "Relationship lacks Id, Type or Target",
                ));
            };

            let rel = if el.attr("TargetMode") == Some(target_mode::EXTERNAL) {
                Relationship::external(r_id.to_string(), reltype.to_string(), target_ref.to_string())
            } else {
                let target = PackURI::from_rel_ref(rels.source.base_uri(), target_ref);
                Relationship::internal(
                    r_id.to_string(),
                    reltype.to_string(),
                    target_ref.to_string(),
                    target,
                )
            };
            rels.insert(rel)?;
        }
        Ok(rels)
    }

    /// Add a relationship.
    ///
    /// Re-adding an id with the same target is ignored; binding an id to a
    /// second target is an error.
    pub fn insert(&mut self, rel: Relationship) -> Result<(), FormatError> {
        if let Some(&pos) = self.by_id.get(rel.r_id()) {
            let existing = &self.rels[pos];
            if existing.target_ref == rel.target_ref && existing.target == rel.target {
                tracing::warn!(
                    source = %self.source,
                    id = rel.r_id(),
                    "duplicate relationship ignored"
                );
                return Ok(());
            }
            return Err(FormatError::ConflictingRelationshipId {
                source_part: self.source.to_string(),
                id: rel.r_id.clone(),
                first: existing.target_ref.clone(),
                second: rel.target_ref,
            });
        }
        self.by_id.insert(rel.r_id.clone(), self.rels.len());
        self.rels.push(rel);
        Ok(())
    }

    /// Add an internal relationship under the next free `rIdN` and return the id.
    pub fn add(&mut self, reltype: &str, target: &PackURI) -> String {
        let r_id = self.next_r_id();
        let rel = Relationship::internal(
            r_id.clone(),
            reltype.to_string(),
            target.relative_ref(self.source.base_uri()),
            target.clone(),
        );
        self.by_id.insert(r_id.clone(), self.rels.len());
        self.rels.push(rel);
        r_id
    }

    /// Add a copy of `rel` under the next free `rIdN` and return the id.
    pub fn add_copy(&mut self, rel: &Relationship) -> String {
        let r_id = self.next_r_id();
        self.by_id.insert(r_id.clone(), self.rels.len());
        self.rels.push(rel.with_id(r_id.clone()));
        r_id
    }

    /// Lowest `rIdN` not yet taken.
    fn next_r_id(&self) -> String {
        let mut used: Vec<u32> = self
            .by_id
            .keys()
            .filter_map(|r_id| {
                let digits = r_id.strip_prefix("rId")?;
                atoi_simd::parse::<u32, false, false>(digits.as_bytes()).ok()
            })
            .collect();
        used.sort_unstable();

        let mut next = 1u32;
        for num in used {
            match num.cmp(&next) {
                std::cmp::Ordering::Equal => next += 1,
                std::cmp::Ordering::Greater => break,
                std::cmp::Ordering::Less => {},
            }
        }
        format!("rId{next}")
    }

    #[inline]
    pub fn source(&self) -> &PackURI {
        &self.source
    }

    #[inline]
    pub fn get(&self, r_id: &str) -> Option<&Relationship> {
        self.by_id.get(r_id).map(|&pos| &self.rels[pos])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Relationship> {
        self.rels.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Keep only the relationships matching `keep`.
    pub fn retain(&mut self, mut keep: impl FnMut(&Relationship) -> bool) {
        self.rels.retain(|rel| keep(rel));
        self.by_id = self
            .rels
            .iter()
            .enumerate()
            .map(|(pos, rel)| (rel.r_id.clone(), pos))
            .collect();
    }

    /// Serialize as a relationship part.
    pub fn to_xml(&self) -> XmlDocument {
        let mut root = XmlElement::with_namespace(namespace::OPC_RELATIONSHIPS, "Relationships");
        root.attrs
            .push(XmlAttr::new("xmlns", namespace::OPC_RELATIONSHIPS));
        for rel in &self.rels {
            root.push_element(rel.to_element());
        }
        XmlDocument::new(root)
    }
}

impl<'a> IntoIterator for &'a Relationships {
    type Item = &'a Relationship;
    type IntoIter = std::slice::Iter<'a, Relationship>;

    fn into_iter(self) -> Self::IntoIter {
        self.rels.iter()
    }
}

/// All relationships of a package, keyed by source part (`/` for the package).
#[derive(Debug, Clone, Default)]
pub struct RelationshipGraph {
    by_source: HashMap<PackURI, Relationships>,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rels: Relationships) {
        self.by_source.insert(rels.source.clone(), rels);
    }

    /// Relationships whose source is `source`, if it has any.
    #[inline]
    pub fn get(&self, source: &PackURI) -> Option<&Relationships> {
        self.by_source.get(source)
    }

    /// Target of relationship `r_id` of `source`.
    pub fn resolve(&self, source: &PackURI, r_id: &str) -> Option<&Relationship> {
        self.get(source)?.get(r_id)
    }

    pub fn sources(&self) -> impl Iterator<Item = &PackURI> {
        self.by_source.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationships> {
        self.by_source.values()
    }

    /// Check every internal target against `resolve_part`, which returns
    /// the canonical name of an existing part. Targets are rewritten to
    /// the canonical names.
    pub fn validate(
        &mut self,
        mut resolve_part: impl FnMut(&PackURI) -> Option<PackURI>,
    ) -> Result<(), FormatError> {
        for rels in self.by_source.values_mut() {
            for rel in &mut rels.rels {
                let Some(target) = &rel.target else {
                    continue;
                };
                match resolve_part(target) {
                    Some(canonical) => rel.target = Some(canonical),
                    None => {
                        return Err(FormatError::DanglingRelationship {
                            source_part: rels.source.to_string(),
                            id: rel.r_id.clone(),
                            target: target.to_string(),
                        });
                    },
                }
            }
        }
        Ok(())
    }
}
