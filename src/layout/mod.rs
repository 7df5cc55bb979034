//! Document layouts.
//!
//! A layout knows where the content of one document vocabulary lives: which
//! elements are content nodes, which attributes reference shared pools, and
//! how a fragment's main part and pool parts are reassembled. The package
//! picks a layout from the content type of its main part, so the rest of the
//! pipeline never branches on document or container kind.

pub mod presentation;
pub mod spreadsheet;
pub mod wordprocessing;

use crate::common::FormatError;
use crate::common::xml::XmlDocument;
use crate::package::constants::reltype_suffix;
use crate::package::rules::{RefRule, collect_refs, rewrite_refs};
use crate::package::{ContentIndex, PackURI, Package, PoolKind, RefList, Relationship, ResourceRef};
use crate::split::{Fragment, FragmentPlan};
use phf::phf_map;
use std::fmt;

/// Document vocabularies with a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Wordprocessing,
    Spreadsheet,
    Presentation,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Wordprocessing => f.write_str("wordprocessing"),
            DocumentKind::Spreadsheet => f.write_str("spreadsheet"),
            DocumentKind::Presentation => f.write_str("presentation"),
        }
    }
}

/// Main part content type -> document kind.
static LAYOUTS: phf::Map<&'static str, DocumentKind> = phf_map! {
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml" => DocumentKind::Wordprocessing,
    "application/vnd.openxmlformats-officedocument.wordprocessingml.template.main+xml" => DocumentKind::Wordprocessing,
    "application/vnd.ms-word.document.macroEnabled.main+xml" => DocumentKind::Wordprocessing,
    "application/vnd.ms-word.template.macroEnabledTemplate.main+xml" => DocumentKind::Wordprocessing,
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml" => DocumentKind::Spreadsheet,
    "application/vnd.openxmlformats-officedocument.spreadsheetml.template.main+xml" => DocumentKind::Spreadsheet,
    "application/vnd.ms-excel.sheet.macroEnabled.main+xml" => DocumentKind::Spreadsheet,
    "application/vnd.ms-excel.template.macroEnabled.main+xml" => DocumentKind::Spreadsheet,
    "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml" => DocumentKind::Presentation,
    "application/vnd.openxmlformats-officedocument.presentationml.slideshow.main+xml" => DocumentKind::Presentation,
    "application/vnd.openxmlformats-officedocument.presentationml.template.main+xml" => DocumentKind::Presentation,
    "application/vnd.ms-powerpoint.presentation.macroEnabled.main+xml" => DocumentKind::Presentation,
    "application/vnd.ms-powerpoint.slideshow.macroEnabled.main+xml" => DocumentKind::Presentation,
    "application/vnd.ms-powerpoint.template.macroEnabled.main+xml" => DocumentKind::Presentation,
};

/// Layout for a main part content type.
pub fn layout_for(content_type: &str) -> Option<&'static dyn DocumentLayout> {
    let layout: &'static dyn DocumentLayout = match LAYOUTS.get(content_type)? {
        DocumentKind::Wordprocessing => &wordprocessing::WordprocessingLayout,
        DocumentKind::Spreadsheet => &spreadsheet::SpreadsheetLayout,
        DocumentKind::Presentation => &presentation::PresentationLayout,
    };
    Some(layout)
}

/// How fragment-local ids of a pool are assigned, in closure order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdScheme {
    /// `prefix` followed by a counter (`S1`, `S2`, ... or `rId1`, ...)
    Prefixed { prefix: &'static str, start: u32 },
    /// A bare counter; positional pools start at 0
    Numeric { start: u32 },
    /// Ids are kept as they are
    Preserve,
}

/// Content discovery and reassembly for one document vocabulary.
pub trait DocumentLayout: Send + Sync + fmt::Debug {
    fn kind(&self) -> DocumentKind;

    /// Discover content nodes, units, pools and roots of a package.
    fn index(&self, package: &Package) -> Result<ContentIndex, FormatError>;

    /// Extra roots of a fragment beyond its nodes and units.
    fn fragment_roots(
        &self,
        _package: &Package,
        _fragment: &Fragment,
    ) -> Result<Vec<ResourceRef>, FormatError> {
        Ok(Vec::new())
    }

    /// Id assignment for a pool.
    fn id_scheme(&self, pool: PoolKind) -> IdScheme {
        match pool {
            PoolKind::Relationship => IdScheme::Prefixed {
                prefix: "rId",
                start: 1,
            },
            _ => IdScheme::Preserve,
        }
    }

    /// Rebuilt parts of a fragment: always the main part, plus every pool
    /// part whose content depends on the closure. Parts not returned are
    /// carried over unchanged.
    fn rebuild(&self, plan: &FragmentPlan<'_>) -> Result<Vec<(PackURI, XmlDocument)>, FormatError>;
}

/// Relationships of the main part.
pub(crate) fn main_relationships(package: &Package) -> impl Iterator<Item = &Relationship> {
    package
        .relationships_of(package.main_part().name())
        .into_iter()
        .flat_map(|rels| rels.iter())
}

/// First internal target of a main-part relationship with the given type suffix.
pub(crate) fn main_target(package: &Package, suffix: &str) -> Option<PackURI> {
    main_relationships(package)
        .find(|rel| reltype_suffix(rel.reltype()) == suffix)
        .and_then(|rel| rel.target_part().cloned())
}

/// Relationship roots for every main-part relationship `keep` accepts.
pub(crate) fn relationship_roots(
    package: &Package,
    mut keep: impl FnMut(&Relationship) -> bool,
) -> Vec<ResourceRef> {
    main_relationships(package)
        .filter(|rel| keep(rel))
        .map(|rel| ResourceRef::new(PoolKind::Relationship, rel.r_id()))
        .collect()
}

/// Record the pool references of XML parts reached through main-part
/// relationships of the given types as dependencies of those parts.
pub(crate) fn scan_parts(
    package: &Package,
    content: &mut ContentIndex,
    suffixes: &[&str],
    rules: &[RefRule],
) {
    let targets: Vec<PackURI> = main_relationships(package)
        .filter(|rel| suffixes.contains(&reltype_suffix(rel.reltype())))
        .filter_map(|rel| rel.target_part().cloned())
        .collect();
    for target in targets {
        let Some(doc) = package.part(&target).and_then(|part| part.xml()) else {
            continue;
        };
        let mut refs = RefList::new();
        collect_refs(&doc.root, rules, &mut refs);
        if !refs.is_empty() {
            content
                .pools
                .get_mut(PoolKind::Part)
                .add_deps(target.as_str(), refs);
        }
    }
}

/// Rewrite pool references of the scanned parts that survive in a fragment.
pub(crate) fn rewrite_scanned_parts(
    plan: &FragmentPlan<'_>,
    suffixes: &[&str],
    rules: &[RefRule],
    out: &mut Vec<(PackURI, XmlDocument)>,
) {
    let lookup = plan.lookup();
    for rel in main_relationships(plan.package) {
        if !suffixes.contains(&reltype_suffix(rel.reltype())) {
            continue;
        }
        let Some(target) = rel.target_part() else {
            continue;
        };
        if !plan.keeps(PoolKind::Part, target.as_str()) || out.iter().any(|(name, _)| name == target) {
            continue;
        }
        let Some(doc) = plan.package.part(target).and_then(|part| part.xml()) else {
            continue;
        };
        let mut doc = XmlDocument::clone(doc);
        rewrite_refs(&mut doc.root, rules, &lookup);
        out.push((target.clone(), doc));
    }
}

/// Parse a non-negative decimal index.
#[inline]
pub(crate) fn parse_index(value: &str) -> Option<usize> {
    atoi_simd::parse::<usize, false, false>(value.trim().as_bytes()).ok()
}
