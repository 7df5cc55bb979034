//! WordprocessingML layout.
//!
//! Content nodes are the block-level children of `w:body`. Styles and
//! numbering definitions are pooled from `styles.xml` and `numbering.xml`;
//! each fragment's body is closed by the section properties that govern its
//! last node, so page setup, headers and footers carry over. Header and
//! footer references a section inherits from earlier sections are written
//! into those properties explicitly. A table of contents content control is
//! replaced by a fresh TOC field, since its entries link to headings that
//! may end up in other fragments.

use super::{
    DocumentKind, DocumentLayout, IdScheme, main_target, relationship_roots, rewrite_scanned_parts,
    scan_parts,
};
use crate::common::FormatError;
use crate::common::xml::{XmlDocument, XmlElement, XmlNode};
use crate::package::constants::{namespace, reltype_suffix};
use crate::package::rules::{RefRule, collect_refs, collect_refs_pruned, rewrite_refs};
use crate::package::{
    BreakMarkers, ContentIndex, PackURI, Package, PoolKind, RefList, ResourceRef,
};
use crate::split::{Fragment, FragmentPlan};
use std::collections::HashSet;

use namespace::{O, R, W};

fn is_zero(value: &str) -> bool {
    value == "0"
}

/// References made by body content and the document frame.
const BODY_RULES: &[RefRule] = &[
    RefRule::element(W, "pStyle", "val", PoolKind::Style),
    RefRule::element(W, "rStyle", "val", PoolKind::Style),
    RefRule::element(W, "tblStyle", "val", PoolKind::Style),
    RefRule::element(W, "numId", "val", PoolKind::Numbering).skipping(is_zero),
    RefRule::namespace(R, PoolKind::Relationship),
    RefRule::attribute(O, "relid", PoolKind::Relationship),
];

/// References between style and numbering definitions, and from parts that
/// have their own relationships (headers, notes, settings).
const DEFINITION_RULES: &[RefRule] = &[
    RefRule::element(W, "pStyle", "val", PoolKind::Style),
    RefRule::element(W, "rStyle", "val", PoolKind::Style),
    RefRule::element(W, "tblStyle", "val", PoolKind::Style),
    RefRule::element(W, "basedOn", "val", PoolKind::Style),
    RefRule::element(W, "next", "val", PoolKind::Style),
    RefRule::element(W, "link", "val", PoolKind::Style),
    RefRule::element(W, "styleLink", "val", PoolKind::Style),
    RefRule::element(W, "numStyleLink", "val", PoolKind::Style),
    RefRule::element(W, "clickAndTypeStyle", "val", PoolKind::Style),
    RefRule::element(W, "defaultTableStyle", "val", PoolKind::Style),
    RefRule::element(W, "numId", "val", PoolKind::Numbering).skipping(is_zero),
    RefRule::element(W, "abstractNumId", "val", PoolKind::AbstractNumbering),
];

/// Main-part relationships that belong to the content that references them.
const CONTENT_SCOPED: &[&str] = &[
    "image",
    "hyperlink",
    "header",
    "footer",
    "oleObject",
    "package",
    "chart",
    "diagramData",
    "diagramLayout",
    "diagramQuickStyle",
    "diagramColors",
    "diagramDrawing",
    "video",
    "audio",
    "media",
    "control",
    "subDocument",
    "aFChunk",
];

/// Parts outside the body that reference styles or numbering.
const SCANNED_PARTS: &[&str] = &["header", "footer", "footnotes", "endnotes", "comments", "settings"];

/// Section property children a section inherits when it leaves them out.
const HEADER_FOOTER_REFERENCES: [&str; 2] = ["headerReference", "footerReference"];
const HEADER_FOOTER_TYPES: [&str; 3] = ["default", "first", "even"];

/// Instruction of a regenerated table of contents field.
const TOC_INSTRUCTION: &str = r#" TOC \o "1-3" \h \z \u "#;

/// Layout of `word/document.xml` and friends.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordprocessingLayout;

impl DocumentLayout for WordprocessingLayout {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Wordprocessing
    }

    fn index(&self, package: &Package) -> Result<ContentIndex, FormatError> {
        let mut content = package.base_index();
        let main = package.main_part().name().clone();
        let doc = package.xml_part(&main)?;
        let body = body_of(&doc.root, &main)?;

        let headings = index_styles(package, &mut content)?;
        index_numbering(package, &mut content)?;
        scan_parts(package, &mut content, SCANNED_PARTS, DEFINITION_RULES);

        let mut skeleton = RefList::new();
        collect_refs_pruned(&doc.root, BODY_RULES, &|el| el.is(W, "body"), &mut skeleton);
        content.skeleton.extend(skeleton);
        content
            .ambient
            .extend(relationship_roots(package, |rel| {
                !CONTENT_SCOPED.contains(&reltype_suffix(rel.reltype()))
            }));

        content.begin_unit("", main.clone(), RefList::new(), 0);
        let mut page_break_before = Vec::new();
        for (position, el) in body.elements().enumerate() {
            if el.is(W, "sectPr") {
                continue;
            }
            let mut refs = RefList::new();
            // A table of contents is regenerated, so its content references nothing
            if !is_table_of_contents(el) {
                collect_refs(el, BODY_RULES, &mut refs);
            }

            let mut markers = BreakMarkers::empty();
            if has_page_break(el) {
                markers |= BreakMarkers::PAGE;
            }
            if section_properties(el).is_some() {
                markers |= BreakMarkers::SECTION;
            }
            let title = if is_heading(el, &headings) {
                markers |= BreakMarkers::HEADING;
                heading_text(el)
            } else {
                None
            };
            page_break_before.push(starts_on_new_page(el));
            content.push_node(markers, refs, title, position);
        }
        for i in 1..page_break_before.len() {
            if page_break_before[i] {
                content.nodes[i - 1].markers |= BreakMarkers::PAGE;
            }
        }
        Ok(content)
    }

    fn fragment_roots(
        &self,
        package: &Package,
        fragment: &Fragment,
    ) -> Result<Vec<ResourceRef>, FormatError> {
        let main = package.main_part().name();
        let doc = package.xml_part(main)?;
        let body = body_of(&doc.root, main)?;
        let content = package.content_index()?;

        let mut refs = RefList::new();
        if let Some((sect_pr, _)) = governing_section(body, content, fragment) {
            collect_refs(&sect_pr, BODY_RULES, &mut refs);
        }
        Ok(refs.into_vec())
    }

    fn id_scheme(&self, pool: PoolKind) -> IdScheme {
        match pool {
            PoolKind::Style => IdScheme::Prefixed { prefix: "S", start: 1 },
            PoolKind::Numbering => IdScheme::Numeric { start: 1 },
            PoolKind::AbstractNumbering => IdScheme::Numeric { start: 0 },
            PoolKind::Relationship => IdScheme::Prefixed {
                prefix: "rId",
                start: 1,
            },
            _ => IdScheme::Preserve,
        }
    }

    fn rebuild(&self, plan: &FragmentPlan<'_>) -> Result<Vec<(PackURI, XmlDocument)>, FormatError> {
        let main = plan.package.main_part().name();
        let source = plan.package.xml_part(main)?;
        let body = body_of(&source.root, main)?;
        let lookup = plan.lookup();

        let elements: Vec<&XmlElement> = body.elements().collect();
        let mut children: Vec<XmlNode> = Vec::with_capacity(plan.nodes().len() + 1);
        for el in plan.nodes().iter().filter_map(|node| elements.get(node.position)) {
            if is_table_of_contents(el) {
                children.extend(table_of_contents(body).map(XmlNode::Element));
            } else {
                children.push(XmlNode::Element(XmlElement::clone(el)));
            }
        }

        match governing_section(body, plan.index, plan.fragment) {
            Some((sect_pr, true)) => {
                // The last node closes its own section: lift its sectPr to body level
                if let Some(XmlNode::Element(last)) = children.last_mut()
                    && let Some(p_pr) = last.child_mut(W, "pPr")
                {
                    p_pr.retain_elements(|el| !el.is(W, "sectPr"));
                }
                children.push(XmlNode::Element(sect_pr));
            },
            Some((sect_pr, false)) => {
                if children.is_empty() {
                    children.push(XmlNode::Element(body.sibling("p")));
                }
                children.push(XmlNode::Element(sect_pr));
            },
            None => {
                if children.is_empty() {
                    children.push(XmlNode::Element(body.sibling("p")));
                }
            },
        }

        let mut doc = XmlDocument::clone(source);
        if let Some(new_body) = doc.root.child_mut(W, "body") {
            new_body.children = children;
        }
        rewrite_refs(&mut doc.root, BODY_RULES, &lookup);

        let mut out = vec![(main.clone(), doc)];
        if let Some(styles) = main_target(plan.package, "styles")
            && plan.keeps(PoolKind::Part, styles.as_str())
        {
            let doc = plan.package.xml_part(&styles)?;
            out.push((styles, rebuild_styles(doc, plan)));
        }
        if let Some(numbering) = main_target(plan.package, "numbering")
            && plan.keeps(PoolKind::Part, numbering.as_str())
        {
            let doc = plan.package.xml_part(&numbering)?;
            out.push((numbering, rebuild_numbering(doc, plan)));
        }
        rewrite_scanned_parts(plan, SCANNED_PARTS, DEFINITION_RULES, &mut out);
        Ok(out)
    }
}

fn body_of<'a>(root: &'a XmlElement, main: &PackURI) -> Result<&'a XmlElement, FormatError> {
    root.child(W, "body")
        .ok_or_else(|| FormatError::malformed(main, "document has no w:body"))
}

/// Fill the Style pool and return the ids of heading styles.
fn index_styles(package: &Package, content: &mut ContentIndex) -> Result<HashSet<String>, FormatError> {
    let mut headings = HashSet::new();
    let Some(styles) = main_target(package, "styles") else {
        return Ok(headings);
    };
    let doc = package.xml_part(&styles)?;
    for style in doc.root.children_named(W, "style") {
        let Some(id) = style.attr_ns(W, "styleId") else {
            continue;
        };
        let mut deps = RefList::new();
        collect_refs(style, DEFINITION_RULES, &mut deps);
        content.pools.get_mut(PoolKind::Style).insert(id, deps);

        if matches!(style.attr_ns(W, "default"), Some("1" | "true" | "on")) {
            content.pinned.push(ResourceRef::new(PoolKind::Style, id));
        }
        let name = style
            .child(W, "name")
            .and_then(|name| name.attr_ns(W, "val"))
            .unwrap_or("");
        if is_heading_style_id(id) || name.to_ascii_lowercase().starts_with("heading") {
            headings.insert(id.to_string());
        }
    }
    Ok(headings)
}

fn index_numbering(package: &Package, content: &mut ContentIndex) -> Result<(), FormatError> {
    let Some(numbering) = main_target(package, "numbering") else {
        return Ok(());
    };
    let doc = package.xml_part(&numbering)?;
    for el in doc.root.elements() {
        let (pool, id) = if el.is(W, "abstractNum") {
            (PoolKind::AbstractNumbering, el.attr_ns(W, "abstractNumId"))
        } else if el.is(W, "num") {
            (PoolKind::Numbering, el.attr_ns(W, "numId"))
        } else {
            continue;
        };
        let Some(id) = id else {
            continue;
        };
        let mut deps = RefList::new();
        collect_refs(el, DEFINITION_RULES, &mut deps);
        content.pools.get_mut(pool).insert(id, deps);
    }
    Ok(())
}

fn is_heading_style_id(id: &str) -> bool {
    let lower = id.to_ascii_lowercase();
    if lower.starts_with("heading") {
        return true;
    }
    let bytes = lower.as_bytes();
    bytes.len() == 2 && bytes[0] == b'h' && (b'1'..=b'9').contains(&bytes[1])
}

fn paragraph_properties(el: &XmlElement) -> Option<&XmlElement> {
    if el.is(W, "p") { el.child(W, "pPr") } else { None }
}

/// Paragraph-level section properties of a node.
fn section_properties(el: &XmlElement) -> Option<&XmlElement> {
    paragraph_properties(el)?.child(W, "sectPr")
}

fn has_page_break(el: &XmlElement) -> bool {
    el.descendants()
        .any(|d| d.is(W, "br") && d.attr_ns(W, "type") == Some("page"))
}

fn starts_on_new_page(el: &XmlElement) -> bool {
    paragraph_properties(el)
        .and_then(|p_pr| p_pr.child(W, "pageBreakBefore"))
        .is_some_and(|flag| !matches!(flag.attr_ns(W, "val"), Some("0" | "false" | "off")))
}

fn is_heading(el: &XmlElement, headings: &HashSet<String>) -> bool {
    paragraph_properties(el)
        .and_then(|p_pr| p_pr.child(W, "pStyle"))
        .and_then(|style| style.attr_ns(W, "val"))
        .is_some_and(|id| headings.contains(id) || is_heading_style_id(id))
}

fn heading_text(el: &XmlElement) -> Option<String> {
    let text: String = el
        .descendants()
        .filter(|d| d.is(W, "t"))
        .map(XmlElement::text)
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Section properties governing the last node of a fragment, completed
/// with inherited header and footer references, and whether they belong to
/// that node itself.
///
/// The first section break at or after the last node closes its section;
/// without one the body-level `w:sectPr` governs.
fn governing_section(
    body: &XmlElement,
    content: &ContentIndex,
    fragment: &Fragment,
) -> Option<(XmlElement, bool)> {
    let elements: Vec<&XmlElement> = body.elements().collect();
    let last = fragment.nodes.end.max(fragment.nodes.start + 1) - 1;
    let mut earlier = Vec::new();
    for node in content.nodes.iter().filter(|node| node.markers.contains(BreakMarkers::SECTION)) {
        let Some(sect_pr) = elements.get(node.position).and_then(|el| section_properties(el)) else {
            continue;
        };
        if node.index >= last {
            let own = !fragment.nodes.is_empty() && node.index == last;
            return Some((with_inherited_references(sect_pr, &earlier), own));
        }
        earlier.push(sect_pr);
    }
    body.children_named(W, "sectPr")
        .last()
        .map(|sect_pr| (with_inherited_references(sect_pr, &earlier), false))
}

fn reference_type(reference: &XmlElement) -> &str {
    reference.attr_ns(W, "type").unwrap_or("default")
}

/// Copy of `sect_pr` holding every header and footer reference it inherits
/// from `earlier` sections (document order, nearest last).
fn with_inherited_references(sect_pr: &XmlElement, earlier: &[&XmlElement]) -> XmlElement {
    let mut inherited = Vec::new();
    for kind in HEADER_FOOTER_REFERENCES {
        for ty in HEADER_FOOTER_TYPES {
            if sect_pr.children_named(W, kind).any(|r| reference_type(r) == ty) {
                continue;
            }
            let nearest = earlier
                .iter()
                .rev()
                .find_map(|section| section.children_named(W, kind).find(|r| reference_type(r) == ty));
            if let Some(reference) = nearest {
                inherited.push(XmlNode::Element(reference.clone()));
            }
        }
    }
    let mut sect_pr = sect_pr.clone();
    sect_pr.children.splice(0..0, inherited);
    sect_pr
}

/// A block-level content control holding a table of contents.
fn is_table_of_contents(el: &XmlElement) -> bool {
    if !el.is(W, "sdt") {
        return false;
    }
    let Some(sdt_pr) = el.child(W, "sdtPr") else {
        return false;
    };
    let gallery = sdt_pr
        .child(W, "docPartObj")
        .and_then(|obj| obj.child(W, "docPartGallery"))
        .and_then(|gallery| gallery.attr_ns(W, "val"));
    if gallery == Some("Table of Contents") {
        return true;
    }
    sdt_pr
        .child(W, "tag")
        .and_then(|tag| tag.attr_ns(W, "val"))
        .is_some_and(|tag| tag.to_ascii_lowercase().contains("toc"))
}

/// A title paragraph and an unpopulated TOC field, marked dirty so the
/// entries are rebuilt from the fragment's own headings on the next update.
fn table_of_contents(body: &XmlElement) -> [XmlElement; 2] {
    let attr = |local: &str| body.sibling(local).name;
    let with_child = |mut parent: XmlElement, child: XmlElement| {
        parent.push_element(child);
        parent
    };
    let field_char = |kind: &str| {
        let mut fld_char = body.sibling("fldChar");
        fld_char.set_attr_ns(W, &attr("fldCharType"), kind);
        if kind == "begin" {
            fld_char.set_attr_ns(W, &attr("dirty"), "true");
        }
        with_child(body.sibling("r"), fld_char)
    };

    let mut size = body.sibling("sz");
    size.set_attr_ns(W, &attr("val"), "28");
    let run_props = with_child(with_child(body.sibling("rPr"), body.sibling("b")), size);
    let mut text = body.sibling("t");
    text.children.push(XmlNode::Text("Table of Contents".to_string()));
    let title = with_child(
        body.sibling("p"),
        with_child(with_child(body.sibling("r"), run_props), text),
    );

    let mut instruction = body.sibling("instrText");
    instruction.set_attr("xml:space", "preserve");
    instruction.children.push(XmlNode::Text(TOC_INSTRUCTION.to_string()));
    let mut field = body.sibling("p");
    field.push_element(field_char("begin"));
    field.push_element(with_child(body.sibling("r"), instruction));
    field.push_element(field_char("end"));
    [title, field]
}

fn rebuild_styles(doc: &XmlDocument, plan: &FragmentPlan<'_>) -> XmlDocument {
    let lookup = plan.lookup();
    let mut doc = doc.clone();
    doc.root.retain_elements(|el| {
        !el.is(W, "style")
            || el
                .attr_ns(W, "styleId")
                .is_some_and(|id| plan.keeps(PoolKind::Style, id))
    });
    for style in doc.root.elements_mut().filter(|el| el.is(W, "style")) {
        if let Some(new_id) = style
            .attr_ns(W, "styleId")
            .and_then(|id| lookup(PoolKind::Style, id))
        {
            style.set_attr_ns(W, "styleId", new_id);
        }
    }
    rewrite_refs(&mut doc.root, DEFINITION_RULES, &lookup);
    doc
}

fn rebuild_numbering(doc: &XmlDocument, plan: &FragmentPlan<'_>) -> XmlDocument {
    let lookup = plan.lookup();
    let mut doc = doc.clone();
    doc.root.retain_elements(|el| {
        if el.is(W, "abstractNum") {
            el.attr_ns(W, "abstractNumId")
                .is_some_and(|id| plan.keeps(PoolKind::AbstractNumbering, id))
        } else if el.is(W, "num") {
            el.attr_ns(W, "numId")
                .is_some_and(|id| plan.keeps(PoolKind::Numbering, id))
        } else {
            !el.is(W, "numIdMacAtCleanup")
        }
    });
    for el in doc.root.elements_mut() {
        let (pool, attr) = if el.is(W, "abstractNum") {
            (PoolKind::AbstractNumbering, "abstractNumId")
        } else if el.is(W, "num") {
            (PoolKind::Numbering, "numId")
        } else {
            continue;
        };
        if let Some(new_id) = el.attr_ns(W, attr).and_then(|id| lookup(pool, id)) {
            el.set_attr_ns(W, attr, new_id);
        }
    }
    rewrite_refs(&mut doc.root, DEFINITION_RULES, &lookup);
    doc
}
