//! PresentationML layout.
//!
//! Every slide is a unit holding one content node. Slides carry no pooled
//! ids of their own: layouts, masters, notes and media follow from the
//! slide part's relationships.

use super::{DocumentKind, DocumentLayout, relationship_roots};
use crate::common::FormatError;
use crate::common::xml::{XmlDocument, XmlElement};
use crate::package::constants::{namespace, reltype_suffix};
use crate::package::rules::{RefRule, collect_refs_pruned, rewrite_refs};
use crate::package::{BreakMarkers, ContentIndex, PackURI, Package, PoolKind, RefList, ResourceRef};
use crate::split::FragmentPlan;
use smallvec::smallvec;
use std::collections::{HashMap, HashSet};

use namespace::{A, P, P14, R};

const PRESENTATION_RULES: &[RefRule] = &[RefRule::namespace(R, PoolKind::Relationship)];

/// Layout of `ppt/presentation.xml` and its slides.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresentationLayout;

impl DocumentLayout for PresentationLayout {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Presentation
    }

    fn index(&self, package: &Package) -> Result<ContentIndex, FormatError> {
        let mut content = package.base_index();
        let main = package.main_part().name().clone();
        let doc = package.xml_part(&main)?;

        let mut skeleton = RefList::new();
        collect_refs_pruned(
            &doc.root,
            PRESENTATION_RULES,
            &|el| el.is(P, "sldIdLst") || el.is(P, "custShowLst"),
            &mut skeleton,
        );
        content.skeleton.extend(skeleton);
        content.ambient.extend(relationship_roots(package, |rel| {
            reltype_suffix(rel.reltype()) != "slide"
        }));

        let section_ends = section_ends(&doc.root);
        let Some(slides) = doc.root.child(P, "sldIdLst") else {
            return Ok(content);
        };
        for (position, slide) in slides.children_named(P, "sldId").enumerate() {
            let Some(r_id) = slide.attr_ns(R, "id") else {
                return Err(FormatError::malformed(&main, "slide entry lacks r:id"));
            };
            let Some(part) = package
                .relationships()
                .resolve(&main, r_id)
                .and_then(|rel| rel.target_part())
            else {
                return Err(FormatError::malformed(
                    &main,
                    format!("slide entry references unknown relationship '{r_id}'"),
                ));
            };

            let mut markers = BreakMarkers::PAGE;
            if slide.attr("id").is_some_and(|id| section_ends.contains(id)) {
                markers |= BreakMarkers::SECTION;
            }
            let title = package
                .part(part)
                .and_then(|part| part.xml())
                .and_then(|doc| slide_title(&doc.root));

            content.begin_unit(part.stem(), part.clone(), RefList::new(), position);
            content.push_node(
                markers,
                smallvec![ResourceRef::new(PoolKind::Relationship, r_id)],
                title,
                position,
            );
        }
        Ok(content)
    }

    fn rebuild(&self, plan: &FragmentPlan<'_>) -> Result<Vec<(PackURI, XmlDocument)>, FormatError> {
        let main = plan.package.main_part().name();
        let source = plan.package.xml_part(main)?;
        let lookup = plan.lookup();

        let positions: HashSet<usize> = plan.nodes().iter().map(|node| node.position).collect();
        let mut doc = XmlDocument::clone(source);
        let mut kept_rels = HashSet::new();
        let mut kept_ids = HashSet::new();
        if let Some(slides) = doc.root.child_mut(P, "sldIdLst") {
            let mut position = 0;
            slides.retain_elements(|slide| {
                if !slide.is(P, "sldId") {
                    return true;
                }
                let keep = positions.contains(&position);
                position += 1;
                if keep {
                    kept_rels.extend(slide.attr_ns(R, "id").map(str::to_string));
                    kept_ids.extend(slide.attr("id").map(str::to_string));
                }
                keep
            });
        }

        filter_custom_shows(&mut doc.root, &kept_rels);
        filter_sections(&mut doc.root, &kept_ids);
        rewrite_refs(&mut doc.root, PRESENTATION_RULES, &lookup);
        Ok(vec![(main.clone(), doc)])
    }
}

/// Slide ids that close a section.
fn section_ends(root: &XmlElement) -> HashSet<String> {
    let mut ends = HashSet::new();
    let order: HashMap<&str, usize> = root
        .child(P, "sldIdLst")
        .into_iter()
        .flat_map(|list| list.children_named(P, "sldId"))
        .enumerate()
        .filter_map(|(i, slide)| slide.attr("id").map(|id| (id, i)))
        .collect();

    for list in root.descendants().filter(|el| el.is(P14, "sectionLst")) {
        for section in list.children_named(P14, "section") {
            let last = section
                .descendants()
                .filter(|el| el.is(P14, "sldId"))
                .filter_map(|el| el.attr("id"))
                .max_by_key(|id| order.get(id).copied());
            if let Some(id) = last {
                ends.insert(id.to_string());
            }
        }
    }
    ends
}

/// Text of the title placeholder of a slide.
fn slide_title(root: &XmlElement) -> Option<String> {
    let title = root.descendants().filter(|el| el.is(P, "sp")).find(|sp| {
        sp.child(P, "nvSpPr")
            .and_then(|nv| nv.child(P, "nvPr"))
            .and_then(|nv| nv.child(P, "ph"))
            .and_then(|ph| ph.attr("type"))
            .is_some_and(|kind| kind == "title" || kind == "ctrTitle")
    })?;
    let paragraphs: Vec<String> = title
        .descendants()
        .filter(|el| el.is(A, "p"))
        .map(|p| {
            p.descendants()
                .filter(|el| el.is(A, "t"))
                .map(XmlElement::text)
                .collect::<String>()
        })
        .filter(|text| !text.trim().is_empty())
        .collect();
    let text = paragraphs.join(" ");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Keep custom show entries of surviving slides; drop shows left empty.
fn filter_custom_shows(root: &mut XmlElement, kept_rels: &HashSet<String>) {
    let Some(shows) = root.child_mut(P, "custShowLst") else {
        return;
    };
    for show in shows.elements_mut() {
        if let Some(list) = show.child_mut(P, "sldLst") {
            list.retain_elements(|sld| {
                sld.attr_ns(R, "id")
                    .is_some_and(|r_id| kept_rels.contains(r_id))
            });
        }
    }
    shows.retain_elements(|show| {
        show.child(P, "sldLst")
            .is_some_and(|list| list.elements().next().is_some())
    });
    root.retain_elements(|el| !el.is(P, "custShowLst") || el.elements().next().is_some());
}

/// Keep section entries of surviving slides; drop sections left empty.
fn filter_sections(root: &mut XmlElement, kept_ids: &HashSet<String>) {
    let Some(ext_list) = root.child_mut(P, "extLst") else {
        return;
    };
    for ext in ext_list.elements_mut() {
        let Some(sections) = ext.child_mut(P14, "sectionLst") else {
            continue;
        };
        for section in sections.elements_mut() {
            if let Some(list) = section.child_mut(P14, "sldIdLst") {
                list.retain_elements(|sld| sld.attr("id").is_some_and(|id| kept_ids.contains(id)));
            }
        }
        sections.retain_elements(|section| {
            section
                .child(P14, "sldIdLst")
                .is_some_and(|list| list.elements().next().is_some())
        });
    }
    ext_list.retain_elements(|ext| {
        ext.child(P14, "sectionLst")
            .is_none_or(|sections| sections.elements().next().is_some())
    });
    root.retain_elements(|el| !el.is(P, "extLst") || el.elements().next().is_some());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::PptxBuilder;

    #[test]
    fn test_index_slides_and_sections() {
        let bytes = PptxBuilder::new()
            .slide("Welcome")
            .slide("Agenda")
            .slide("Details")
            .section("Opening", &[0, 1])
            .section("Body", &[2])
            .build();
        let package = Package::load(&bytes).unwrap();
        let content = package.content_index().unwrap();

        assert_eq!(content.len(), 3);
        assert_eq!(content.units.len(), 3);
        assert_eq!(content.units[1].name, "slide2");
        assert_eq!(content.nodes[0].title.as_deref(), Some("Welcome"));
        assert!(content.nodes.iter().all(|n| n.markers.contains(BreakMarkers::PAGE)));
        assert!(!content.nodes[0].markers.contains(BreakMarkers::SECTION));
        assert!(content.nodes[1].markers.contains(BreakMarkers::SECTION));
        assert!(content.nodes[2].markers.contains(BreakMarkers::SECTION));
    }

    #[test]
    fn test_title_joins_paragraphs() {
        let doc = XmlDocument::parse(
            br#"<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"><p:cSld><p:spTree><p:sp><p:nvSpPr><p:cNvPr id="2" name="Title"/><p:cNvSpPr/><p:nvPr><p:ph type="ctrTitle"/></p:nvPr></p:nvSpPr><p:txBody><a:p><a:r><a:t>Quarterly</a:t></a:r><a:r><a:t> Review</a:t></a:r></a:p><a:p><a:r><a:t>2024</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
        )
        .unwrap();
        assert_eq!(slide_title(&doc.root).as_deref(), Some("Quarterly Review 2024"));
    }
}
