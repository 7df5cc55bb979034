//! Reference rules.
//!
//! A rule names an attribute that holds a resource id. The same table drives
//! discovery (which ids a subtree references) and rewriting (replacing those
//! ids with fragment-local ones), so the two can never disagree.

use super::pool::{PoolKind, RefList, ResourceRef};
use crate::common::xml::{XmlAttr, XmlElement};

/// Which attribute a rule reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrMatch {
    /// A specific attribute; `None` namespace means unprefixed
    Named(Option<&'static str>, &'static str),
    /// Every attribute bound to a namespace
    AnyInNamespace(&'static str),
}

/// An attribute holding a resource id.
#[derive(Debug, Clone, Copy)]
pub struct RefRule {
    /// Element carrying the attribute; `None` matches every element
    pub element: Option<(&'static str, &'static str)>,
    pub attr: AttrMatch,
    pub pool: PoolKind,
    /// Values that are not references (sentinels, built-in ids)
    pub skip: fn(&str) -> bool,
}

fn never(_: &str) -> bool {
    false
}

impl RefRule {
    /// `element/@attr` within one namespace, e.g. `w:pStyle/@w:val`.
    pub const fn element(ns: &'static str, element: &'static str, attr: &'static str, pool: PoolKind) -> Self {
        Self {
            element: Some((ns, element)),
            attr: AttrMatch::Named(Some(ns), attr),
            pool,
            skip: never,
        }
    }

    /// An unprefixed attribute of an element, e.g. `c/@s`.
    pub const fn plain(ns: &'static str, element: &'static str, attr: &'static str, pool: PoolKind) -> Self {
        Self {
            element: Some((ns, element)),
            attr: AttrMatch::Named(None, attr),
            pool,
            skip: never,
        }
    }

    /// A namespaced attribute on any element, e.g. `o:relid`.
    pub const fn attribute(ns: &'static str, attr: &'static str, pool: PoolKind) -> Self {
        Self {
            element: None,
            attr: AttrMatch::Named(Some(ns), attr),
            pool,
            skip: never,
        }
    }

    /// Every attribute in a namespace, e.g. all `r:` attributes.
    pub const fn namespace(ns: &'static str, pool: PoolKind) -> Self {
        Self {
            element: None,
            attr: AttrMatch::AnyInNamespace(ns),
            pool,
            skip: never,
        }
    }

    pub const fn skipping(mut self, skip: fn(&str) -> bool) -> Self {
        self.skip = skip;
        self
    }

    fn matches_element(&self, el: &XmlElement) -> bool {
        match self.element {
            Some((ns, local)) => el.is(ns, local),
            None => true,
        }
    }

    fn matches_attr(&self, attr: &XmlAttr) -> bool {
        if attr.is_declaration() {
            return false;
        }
        match self.attr {
            AttrMatch::Named(Some(ns), local) => attr.is(ns, local),
            AttrMatch::Named(None, local) => attr.namespace().is_none() && attr.name == local,
            AttrMatch::AnyInNamespace(ns) => attr.namespace() == Some(ns),
        }
    }
}

/// References made by `el` itself, children excluded.
pub fn collect_element_refs(el: &XmlElement, rules: &[RefRule], out: &mut RefList) {
    for rule in rules {
        if !rule.matches_element(el) {
            continue;
        }
        for attr in &el.attrs {
            if rule.matches_attr(attr) && !(rule.skip)(&attr.value) {
                out.push(ResourceRef::new(rule.pool, attr.value.as_str()));
            }
        }
    }
}

/// References made anywhere in the subtree of `el`, in document order.
pub fn collect_refs(el: &XmlElement, rules: &[RefRule], out: &mut RefList) {
    collect_refs_pruned(el, rules, &|_| false, out);
}

/// Like [`collect_refs`], but skips subtrees for which `prune` holds.
pub fn collect_refs_pruned(
    el: &XmlElement,
    rules: &[RefRule],
    prune: &dyn Fn(&XmlElement) -> bool,
    out: &mut RefList,
) {
    if prune(el) {
        return;
    }
    collect_element_refs(el, rules, out);
    for child in el.elements() {
        collect_refs_pruned(child, rules, prune, out);
    }
}

/// Replace every referenced id in the subtree of `el` through `remap`.
///
/// Ids `remap` does not know are left untouched.
pub fn rewrite_refs(
    el: &mut XmlElement,
    rules: &[RefRule],
    remap: &dyn Fn(PoolKind, &str) -> Option<String>,
) {
    el.for_each_element_mut(&mut |el: &mut XmlElement| rewrite_element_refs(el, rules, remap));
}

/// Replace the ids referenced by `el` itself.
pub fn rewrite_element_refs(
    el: &mut XmlElement,
    rules: &[RefRule],
    remap: &dyn Fn(PoolKind, &str) -> Option<String>,
) {
    for rule in rules {
        if !rule.matches_element(el) {
            continue;
        }
        for attr in &mut el.attrs {
            if rule.matches_attr(attr)
                && !(rule.skip)(&attr.value)
                && let Some(new_id) = remap(rule.pool, &attr.value)
            {
                attr.value = new_id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::xml::XmlDocument;

    const W: &str = "urn:w";
    const R: &str = "urn:r";

    fn is_zero(value: &str) -> bool {
        value == "0"
    }

    const RULES: &[RefRule] = &[
        RefRule::element(W, "pStyle", "val", PoolKind::Style),
        RefRule::element(W, "numId", "val", PoolKind::Numbering).skipping(is_zero),
        RefRule::namespace(R, PoolKind::Relationship),
    ];

    fn doc() -> XmlDocument {
        XmlDocument::parse(
            br#"<w:p xmlns:w="urn:w" xmlns:r="urn:r"><w:pPr><w:pStyle w:val="Heading1"/><w:numPr><w:numId w:val="0"/></w:numPr></w:pPr><w:hyperlink r:id="rId4"><w:r/></w:hyperlink><w:numId w:val="3"/></w:p>"#,
        )
        .unwrap()
    }

    #[test]
    fn test_collect_in_document_order() {
        let mut refs = RefList::new();
        collect_refs(&doc().root, RULES, &mut refs);
        assert_eq!(
            refs.as_slice(),
            &[
                ResourceRef::new(PoolKind::Style, "Heading1"),
                ResourceRef::new(PoolKind::Relationship, "rId4"),
                ResourceRef::new(PoolKind::Numbering, "3"),
            ]
        );
    }

    #[test]
    fn test_namespace_declarations_are_not_references() {
        let mut refs = RefList::new();
        collect_element_refs(&doc().root, RULES, &mut refs);
        assert!(refs.is_empty());
    }

    #[test]
    fn test_pruned_subtrees_are_skipped() {
        let mut refs = RefList::new();
        collect_refs_pruned(&doc().root, RULES, &|el| el.is(W, "pPr"), &mut refs);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].pool, PoolKind::Relationship);
    }

    #[test]
    fn test_rewrite_uses_same_rules() {
        let mut doc = doc();
        rewrite_refs(&mut doc.root, RULES, &|pool, id| match (pool, id) {
            (PoolKind::Style, "Heading1") => Some("S2".to_string()),
            (PoolKind::Relationship, "rId4") => Some("rId1".to_string()),
            _ => None,
        });
        let mut refs = RefList::new();
        collect_refs(&doc.root, RULES, &mut refs);
        assert_eq!(refs[0].id, "S2");
        assert_eq!(refs[1].id, "rId1");
        // Unknown ids are left alone, sentinels are never touched
        assert_eq!(refs[2].id, "3");
        let text = String::from_utf8(doc.to_bytes().unwrap()).unwrap();
        assert!(text.contains(r#"<w:numId w:val="0"/>"#));
    }
}
