//! Resource rewriting: turn a fragment into a self-contained package.
//!
//! The fragment's closure decides which pool entries and parts survive.
//! Surviving pool ids are renumbered per pool in closure order, the layout
//! rebuilds the main part and every pool part whose content depends on the
//! closure, and all other surviving parts are carried over unchanged.

use super::closure::Closure;
use super::partition::Fragment;
use crate::backend::Payload;
use crate::common::xml::XmlDocument;
use crate::common::{Referrer, Result};
use crate::layout::IdScheme;
use crate::package::{
    ContentIndex, ContentNode, PackURI, Package, Part, PoolKind, RelationshipGraph, Relationships, ResourceRef,
};
use std::collections::HashMap;
use std::sync::Arc;

/// Old id -> fragment-local id, per pool.
#[derive(Debug, Clone, Default)]
pub struct IdRemap {
    maps: Vec<HashMap<String, String>>,
}

impl IdRemap {
    /// Assign fragment-local ids to every closure member, in closure order.
    pub fn assign(closure: &Closure<'_>, scheme: impl Fn(PoolKind) -> IdScheme) -> Self {
        let mut maps = vec![HashMap::new(); PoolKind::ALL.len()];
        for pool in PoolKind::ALL {
            let map = &mut maps[pool.index()];
            let mut buf = itoa::Buffer::new();
            match scheme(pool) {
                IdScheme::Prefixed { prefix, start } => {
                    for (n, id) in (start..).zip(closure.members(pool)) {
                        map.insert(id.to_string(), format!("{prefix}{}", buf.format(n)));
                    }
                },
                IdScheme::Numeric { start } => {
                    for (n, id) in (start..).zip(closure.members(pool)) {
                        map.insert(id.to_string(), buf.format(n).to_string());
                    }
                },
                IdScheme::Preserve => {},
            }
        }
        Self { maps }
    }

    /// New id of `id`, if the pool is renumbered and holds it.
    #[inline]
    pub fn get(&self, pool: PoolKind, id: &str) -> Option<&str> {
        self.maps
            .get(pool.index())
            .and_then(|map| map.get(id))
            .map(String::as_str)
    }
}

/// Everything a layout needs to rebuild one fragment.
pub struct FragmentPlan<'a> {
    pub package: &'a Package,
    pub index: &'a ContentIndex,
    pub fragment: &'a Fragment,
    pub closure: Closure<'a>,
    pub remap: IdRemap,
}

impl<'a> FragmentPlan<'a> {
    /// The fragment's content nodes.
    #[inline]
    pub fn nodes(&self) -> &'a [ContentNode] {
        &self.index.nodes[self.fragment.nodes.clone()]
    }

    /// Whether the fragment keeps `id` of `pool`.
    #[inline]
    pub fn keeps(&self, pool: PoolKind, id: &str) -> bool {
        self.closure.contains(pool, id)
    }

    /// Surviving ids of `pool`, in the order they receive new ids.
    pub fn members(&self, pool: PoolKind) -> impl Iterator<Item = &'a str> + '_ {
        self.closure.members(pool)
    }

    /// Remapping function for reference rewriting.
    pub fn lookup(&self) -> impl Fn(PoolKind, &str) -> Option<String> + '_ {
        move |pool: PoolKind, id: &str| self.remap.get(pool, id).map(str::to_string)
    }
}

/// Closure roots of a fragment with the referrer to blame for each.
///
/// Pinned resources come first so they keep the lowest ids, followed by
/// the main part's frame, the fragment's units and nodes, layout extras
/// and the ambient relationships.
fn roots(package: &Package, index: &ContentIndex, fragment: &Fragment) -> Result<Vec<(Referrer, ResourceRef)>> {
    let main = Referrer::Part(package.main_part().name().to_string());
    let mut roots = Vec::new();

    roots.extend(index.pinned.iter().map(|r| (main.clone(), r.clone())));
    roots.extend(index.skeleton.iter().map(|r| (main.clone(), r.clone())));
    for &u in &fragment.units {
        let unit = &index.units[u];
        let referrer = Referrer::Part(unit.part.to_string());
        roots.extend(unit.refs.iter().map(|r| (referrer.clone(), r.clone())));
    }
    for node in &index.nodes[fragment.nodes.clone()] {
        roots.extend(node.refs.iter().map(|r| (Referrer::Node(node.index), r.clone())));
    }
    let extra = package.layout().fragment_roots(package, fragment)?;
    roots.extend(extra.into_iter().map(|r| (main.clone(), r)));
    roots.extend(index.ambient.iter().map(|r| (main.clone(), r.clone())));
    Ok(roots)
}

/// Build the self-contained package of one fragment.
pub fn rewrite(package: &Package, fragment: &Fragment) -> Result<Package> {
    let index = package.content_index()?;
    let roots = roots(package, index, fragment)?;
    let closure = Closure::compute(index, &roots)?;
    let layout = package.layout();
    let remap = IdRemap::assign(&closure, |pool| layout.id_scheme(pool));
    let plan = FragmentPlan {
        package,
        index,
        fragment,
        closure,
        remap,
    };

    let rebuilt = layout.rebuild(&plan)?;
    let result = assemble(&plan, rebuilt)?;
    tracing::debug!(
        fragment = fragment.index,
        nodes = fragment.len(),
        parts = result.parts().len(),
        closure = ?plan.closure.sizes(),
        "fragment rewritten"
    );
    Ok(result)
}

/// Put surviving parts, relationships and content types together.
fn assemble(plan: &FragmentPlan<'_>, rebuilt: Vec<(PackURI, XmlDocument)>) -> Result<Package> {
    let package = plan.package;
    let main = package.main_part().name();
    let mut rebuilt: HashMap<String, Arc<XmlDocument>> = rebuilt
        .into_iter()
        .map(|(name, doc)| (name.key(), Arc::new(doc)))
        .collect();

    let parts: Vec<Part> = package
        .parts()
        .iter()
        .filter(|part| part.name() == main || plan.keeps(PoolKind::Part, part.name().as_str()))
        .map(|part| match rebuilt.remove(&part.name().key()) {
            Some(doc) => part.with_payload(Payload::Xml(doc)),
            None => part.clone(),
        })
        .collect();

    let mut relationships = RelationshipGraph::new();
    if let Some(source) = package.relationships_of(&PackURI::package()) {
        let mut rels = source.clone();
        rels.retain(|rel| {
            rel.target_part()
                .is_none_or(|target| plan.keeps(PoolKind::Part, target.as_str()))
        });
        relationships.insert(rels);
    }

    let mut main_rels = Relationships::new(main.clone());
    if let Some(source) = package.relationships_of(main) {
        for id in plan.members(PoolKind::Relationship) {
            let Some(rel) = source.get(id) else {
                continue;
            };
            let new_id = plan.remap.get(PoolKind::Relationship, id).unwrap_or(id);
            main_rels.insert(rel.with_id(new_id.to_string()))?;
        }
    }
    relationships.insert(main_rels);

    // Parts keep their relationships, minus targets that stayed behind
    for part in &parts {
        if part.name() == main {
            continue;
        }
        if let Some(source) = package.relationships_of(part.name()) {
            let mut rels = source.clone();
            rels.retain(|rel| {
                rel.target_part()
                    .is_none_or(|target| target == main || plan.keeps(PoolKind::Part, target.as_str()))
            });
            relationships.insert(rels);
        }
    }

    let content_types = package
        .content_types()
        .restricted_to(parts.iter().map(Part::name));
    Ok(Package::from_parts(
        package.backend_kind(),
        parts,
        content_types,
        relationships,
        main,
        package.layout(),
    )?)
}
