//! SpreadsheetML layout.
//!
//! Worksheets are units and their rows are content nodes. Cell formats,
//! fonts, fills, borders, number formats and shared strings are positional
//! pools; a fragment renumbers them densely and rebuilds `styles.xml` and
//! `sharedStrings.xml` in the new order. A table travels with the row that
//! holds its header and its range is cut back to the rows its fragment keeps.

use super::{
    DocumentKind, DocumentLayout, IdScheme, main_target, parse_index, relationship_roots,
};
use crate::common::FormatError;
use crate::common::xml::{XmlDocument, XmlElement, XmlNode};
use crate::package::constants::{namespace, reltype_suffix};
use crate::package::rules::{
    RefRule, collect_element_refs, collect_refs, collect_refs_pruned, rewrite_element_refs,
    rewrite_refs,
};
use crate::package::{
    BreakMarkers, ContentIndex, ContentUnit, PackURI, Package, PoolKind, RefList, Relationships, ResourceRef,
};
use crate::split::FragmentPlan;
use std::collections::{HashMap, HashSet};

use namespace::{R, S};

/// Number formats below this id are built in and never defined in `numFmts`.
const FIRST_CUSTOM_NUMBER_FORMAT: u32 = 164;

fn is_builtin_number_format(value: &str) -> bool {
    atoi_simd::parse::<u32, false, false>(value.as_bytes()).is_ok_and(|id| id < FIRST_CUSTOM_NUMBER_FORMAT)
}

/// Style references of rows, cells and column ranges.
const CELL_RULES: &[RefRule] = &[
    RefRule::plain(S, "c", "s", PoolKind::CellFormat),
    RefRule::plain(S, "row", "s", PoolKind::CellFormat),
    RefRule::plain(S, "col", "style", PoolKind::CellFormat),
];

/// References of a cell format record.
const XF_RULES: &[RefRule] = &[
    RefRule::plain(S, "xf", "numFmtId", PoolKind::NumberFormat).skipping(is_builtin_number_format),
    RefRule::plain(S, "xf", "fontId", PoolKind::Font),
    RefRule::plain(S, "xf", "fillId", PoolKind::Fill),
    RefRule::plain(S, "xf", "borderId", PoolKind::Border),
    RefRule::plain(S, "xf", "xfId", PoolKind::CellStyleFormat),
];

const WORKBOOK_RULES: &[RefRule] = &[RefRule::namespace(R, PoolKind::Relationship)];

/// Main-part relationships that are never carried as a whole.
const SHEET_SCOPED: &[&str] = &[
    "worksheet",
    "chartsheet",
    "dialogsheet",
    "xlMacrosheet",
    "xlIntlMacrosheet",
    "calcChain",
];

/// Positional pools defined in `styles.xml`: container, record, pool.
const POSITIONAL: &[(&str, &str, PoolKind)] = &[
    ("fonts", "font", PoolKind::Font),
    ("fills", "fill", PoolKind::Fill),
    ("borders", "border", PoolKind::Border),
    ("cellStyleXfs", "xf", PoolKind::CellStyleFormat),
    ("cellXfs", "xf", PoolKind::CellFormat),
];

/// Entries consumers expect at fixed positions.
const REQUIRED: &[(PoolKind, &str)] = &[
    (PoolKind::Font, "0"),
    (PoolKind::Fill, "0"),
    (PoolKind::Fill, "1"),
    (PoolKind::Border, "0"),
    (PoolKind::CellStyleFormat, "0"),
    (PoolKind::CellFormat, "0"),
];

/// Layout of `xl/workbook.xml` and its worksheets.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetLayout;

impl DocumentLayout for SpreadsheetLayout {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Spreadsheet
    }

    fn index(&self, package: &Package) -> Result<ContentIndex, FormatError> {
        let mut content = package.base_index();
        let main = package.main_part().name().clone();
        let workbook = package.xml_part(&main)?;

        if let Some(styles) = main_target(package, "styles") {
            index_styles(package.xml_part(&styles)?, &mut content);
        }
        if let Some(strings) = main_target(package, "sharedStrings") {
            let doc = package.xml_part(&strings)?;
            let pool = content.pools.get_mut(PoolKind::SharedString);
            for (i, _) in doc.root.children_named(S, "si").enumerate() {
                pool.insert(index_id(i), RefList::new());
            }
        }
        for &(pool, id) in REQUIRED {
            if content.pool(pool).contains(id) {
                content.pinned.push(ResourceRef::new(pool, id));
            }
        }

        let mut skeleton = RefList::new();
        collect_refs_pruned(&workbook.root, WORKBOOK_RULES, &|el| el.is(S, "sheets"), &mut skeleton);
        content.skeleton.extend(skeleton);
        content.ambient.extend(relationship_roots(package, |rel| {
            !SHEET_SCOPED.contains(&reltype_suffix(rel.reltype()))
        }));

        let Some(sheets) = workbook.root.child(S, "sheets") else {
            return Err(FormatError::malformed(&main, "workbook has no sheets"));
        };
        for (position, sheet) in sheets.elements().enumerate() {
            let (Some(name), Some(r_id)) = (sheet.attr("name"), sheet.attr_ns(R, "id")) else {
                return Err(FormatError::malformed(&main, "sheet lacks name or r:id"));
            };
            let Some(rel) = package.relationships().resolve(&main, r_id) else {
                return Err(FormatError::malformed(
                    &main,
                    format!("sheet '{name}' references unknown relationship '{r_id}'"),
                ));
            };
            if reltype_suffix(rel.reltype()) != "worksheet" {
                tracing::debug!(sheet = name, "non-worksheet sheet left out of content");
                continue;
            }
            let Some(part) = rel.target_part().cloned() else {
                continue;
            };
            index_worksheet(package, &mut content, name, r_id, part, position)?;
        }
        Ok(content)
    }

    fn id_scheme(&self, pool: PoolKind) -> IdScheme {
        match pool {
            PoolKind::NumberFormat => IdScheme::Numeric {
                start: FIRST_CUSTOM_NUMBER_FORMAT,
            },
            PoolKind::Relationship => IdScheme::Prefixed {
                prefix: "rId",
                start: 1,
            },
            PoolKind::Part => IdScheme::Preserve,
            _ => IdScheme::Numeric { start: 0 },
        }
    }

    fn rebuild(&self, plan: &FragmentPlan<'_>) -> Result<Vec<(PackURI, XmlDocument)>, FormatError> {
        let main = plan.package.main_part().name();
        let mut out = vec![(main.clone(), rebuild_workbook(plan.package.xml_part(main)?, plan))];

        for &unit in &plan.fragment.units {
            let unit = &plan.index.units[unit];
            let doc = plan.package.xml_part(&unit.part)?;
            let rows = kept_rows(plan, unit);
            let rels = plan.package.relationships_of(&unit.part);
            out.push((unit.part.clone(), rebuild_worksheet(doc, plan, &rows, rels)));

            let row_numbers: Vec<usize> = doc
                .root
                .child(S, "sheetData")
                .map(|sheet_data| {
                    numbered_rows(sheet_data)
                        .filter(|(position, _, _)| rows.contains(position))
                        .map(|(_, number, _)| number)
                        .collect()
                })
                .unwrap_or_default();
            for table in table_targets(rels) {
                if plan.keeps(PoolKind::Part, table.as_str()) && out.iter().all(|(name, _)| name != table) {
                    let doc = plan.package.xml_part(table)?;
                    out.push((table.clone(), clip_table(doc, &row_numbers)));
                }
            }
        }
        if let Some(styles) = main_target(plan.package, "styles")
            && plan.keeps(PoolKind::Part, styles.as_str())
        {
            let doc = plan.package.xml_part(&styles)?;
            out.push((styles, rebuild_styles(doc, plan)));
        }
        if let Some(strings) = main_target(plan.package, "sharedStrings")
            && plan.keeps(PoolKind::Part, strings.as_str())
        {
            let doc = plan.package.xml_part(&strings)?;
            out.push((strings, rebuild_shared_strings(doc, plan)));
        }
        Ok(out)
    }
}

fn index_id(i: usize) -> String {
    itoa::Buffer::new().format(i).to_string()
}

fn index_styles(doc: &XmlDocument, content: &mut ContentIndex) {
    if let Some(num_fmts) = doc.root.child(S, "numFmts") {
        let pool = content.pools.get_mut(PoolKind::NumberFormat);
        for fmt in num_fmts.children_named(S, "numFmt") {
            if let Some(id) = fmt.attr("numFmtId") {
                pool.insert(id, RefList::new());
            }
        }
    }
    for &(container, record, kind) in POSITIONAL {
        let Some(container) = doc.root.child(S, container) else {
            continue;
        };
        let pool = content.pools.get_mut(kind);
        for (i, el) in container.children_named(S, record).enumerate() {
            let mut deps = RefList::new();
            collect_element_refs(el, XF_RULES, &mut deps);
            pool.insert(index_id(i), deps);
        }
    }
}

fn index_worksheet(
    package: &Package,
    content: &mut ContentIndex,
    name: &str,
    r_id: &str,
    part: PackURI,
    position: usize,
) -> Result<(), FormatError> {
    let doc = package.xml_part(&part)?;
    let mut unit_refs = RefList::new();
    unit_refs.push(ResourceRef::new(PoolKind::Relationship, r_id));
    if let Some(cols) = doc.root.child(S, "cols") {
        collect_refs(cols, CELL_RULES, &mut unit_refs);
    }

    // Tables hang off the row holding their first line instead of the sheet
    let mut tables = Vec::new();
    for table in table_targets(package.relationships_of(&part)) {
        let rows = package
            .xml_part(table)?
            .root
            .attr("ref")
            .and_then(parse_range)
            .map(|((_, first), (_, last))| first..=last);
        tables.push((table.clone(), rows, false));
    }
    if !tables.is_empty() {
        content.pools.get_mut(PoolKind::Part).retain_deps(part.as_str(), |dep| {
            !tables.iter().any(|(table, ..)| table.as_str() == dep.id)
        });
    }
    content.begin_unit(name, part.clone(), unit_refs, position);

    let breaks: HashSet<usize> = doc
        .root
        .child(S, "rowBreaks")
        .into_iter()
        .flat_map(|breaks| breaks.children_named(S, "brk"))
        .filter_map(|brk| brk.attr("id").and_then(parse_index))
        .collect();

    if let Some(sheet_data) = doc.root.child(S, "sheetData") {
        for (position, row_number, row) in numbered_rows(sheet_data) {
            let markers = if breaks.contains(&row_number) {
                BreakMarkers::PAGE
            } else {
                BreakMarkers::empty()
            };
            let mut refs = row_refs(row);
            for (table, rows, anchored) in &mut tables {
                if !*anchored && rows.as_ref().is_some_and(|rows| rows.contains(&row_number)) {
                    refs.push(ResourceRef::new(PoolKind::Part, table.as_str()));
                    *anchored = true;
                }
            }
            content.push_node(markers, refs, None, position);
        }
    }
    // A table without rows of its own goes wherever the sheet goes
    if let Some(unit) = content.units.last_mut() {
        unit.refs.extend(
            tables
                .iter()
                .filter(|(_, _, anchored)| !anchored)
                .map(|(table, ..)| ResourceRef::new(PoolKind::Part, table.as_str())),
        );
    }
    Ok(())
}

/// Child position, 1-based row number and element of every row.
fn numbered_rows(sheet_data: &XmlElement) -> impl Iterator<Item = (usize, usize, &XmlElement)> {
    let mut row_number = 0;
    sheet_data
        .elements()
        .enumerate()
        .filter(|(_, row)| row.is(S, "row"))
        .map(move |(position, row)| {
            row_number = row.attr("r").and_then(parse_index).unwrap_or(row_number + 1);
            (position, row_number, row)
        })
}

/// Table parts related from a worksheet.
fn table_targets(rels: Option<&Relationships>) -> impl Iterator<Item = &PackURI> {
    rels.into_iter()
        .flat_map(|rels| rels.iter())
        .filter(|rel| reltype_suffix(rel.reltype()) == "table")
        .filter_map(|rel| rel.target_part())
}

/// Column letters and row number of a cell reference such as `B12`.
fn split_cell_ref(cell: &str) -> Option<(&str, usize)> {
    let cell = cell.trim();
    let digits = cell.find(|c: char| c.is_ascii_digit())?;
    if digits == 0 || !cell[..digits].bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    Some((&cell[..digits], parse_index(&cell[digits..])?))
}

/// Corners of an `A1:C4` range.
fn parse_range(range: &str) -> Option<((&str, usize), (&str, usize))> {
    let (start, end) = range.split_once(':')?;
    Some((split_cell_ref(start)?, split_cell_ref(end)?))
}

/// References of a row and its cells, in document order.
fn row_refs(row: &XmlElement) -> RefList {
    let mut refs = RefList::new();
    collect_element_refs(row, CELL_RULES, &mut refs);
    for cell in row.children_named(S, "c") {
        collect_element_refs(cell, CELL_RULES, &mut refs);
        if let Some(index) = shared_string_index(cell) {
            refs.push(ResourceRef::new(PoolKind::SharedString, index));
        }
    }
    refs
}

fn shared_string_index(cell: &XmlElement) -> Option<String> {
    if cell.attr("t") != Some("s") {
        return None;
    }
    Some(cell.child(S, "v")?.text().trim().to_string())
}

fn rebuild_workbook(doc: &XmlDocument, plan: &FragmentPlan<'_>) -> XmlDocument {
    let lookup = plan.lookup();
    let kept: HashSet<usize> = plan
        .fragment
        .units
        .iter()
        .map(|&unit| plan.index.units[unit].position)
        .collect();

    let mut doc = doc.clone();
    let mut new_positions = HashMap::new();
    let mut dropped = Vec::new();
    if let Some(sheets) = doc.root.child_mut(S, "sheets") {
        let mut position = 0;
        sheets.retain_elements(|sheet| {
            let keep = kept.contains(&position);
            if keep {
                new_positions.insert(position, new_positions.len());
            } else if let Some(name) = sheet.attr("name") {
                dropped.push(name.to_string());
            }
            position += 1;
            keep
        });
    }

    if let Some(names) = doc.root.child_mut(S, "definedNames") {
        names.retain_elements(|name| {
            let local_ok = match name.attr("localSheetId").and_then(parse_index) {
                Some(old) => new_positions.contains_key(&old),
                None => true,
            };
            let formula = name.text();
            local_ok && !dropped.iter().any(|sheet| references_sheet(&formula, sheet))
        });
        for name in names.elements_mut() {
            if let Some(new) = name
                .attr("localSheetId")
                .and_then(parse_index)
                .and_then(|old| new_positions.get(&old))
            {
                name.set_attr("localSheetId", index_id(*new));
            }
        }
    }
    doc.root
        .retain_elements(|el| !el.is(S, "definedNames") || el.elements().next().is_some());

    if let Some(views) = doc.root.child_mut(S, "bookViews") {
        for view in views.elements_mut() {
            for attr in ["activeTab", "firstSheet"] {
                if view.attr(attr).is_some() {
                    view.set_attr(attr, "0");
                }
            }
        }
    }
    rewrite_refs(&mut doc.root, WORKBOOK_RULES, &lookup);
    doc
}

/// Whether a defined name formula points into the named sheet.
fn references_sheet(formula: &str, sheet: &str) -> bool {
    let quoted = format!("'{}'!", sheet.replace('\'', "''"));
    if formula.contains(&quoted) {
        return true;
    }
    let plain = format!("{sheet}!");
    formula.match_indices(&plain).any(|(i, _)| {
        !formula[..i].ends_with(|c: char| c.is_alphanumeric() || c == '_' || c == '.')
    })
}

/// Child positions in `sheetData` of the unit's rows that the fragment keeps.
fn kept_rows(plan: &FragmentPlan<'_>, unit: &ContentUnit) -> HashSet<usize> {
    let nodes = unit.nodes();
    let start = plan.fragment.nodes.start.max(nodes.start);
    let end = plan.fragment.nodes.end.min(nodes.end);
    plan.index
        .nodes
        .get(start..end)
        .unwrap_or_default()
        .iter()
        .map(|node| node.position)
        .collect()
}

fn rebuild_worksheet(
    doc: &XmlDocument,
    plan: &FragmentPlan<'_>,
    rows: &HashSet<usize>,
    rels: Option<&Relationships>,
) -> XmlDocument {
    let lookup = plan.lookup();
    let mut doc = doc.clone();
    doc.root.retain_elements(|el| !el.is(S, "dimension"));
    if let Some(sheet_data) = doc.root.child_mut(S, "sheetData") {
        let mut position = 0;
        sheet_data.retain_elements(|_| {
            let keep = rows.contains(&position);
            position += 1;
            keep
        });
        drop_orphan_shared_formulas(sheet_data);
        sheet_data.for_each_element_mut(&mut |cell: &mut XmlElement| {
            if !cell.is(S, "c") {
                return;
            }
            let Some(new) = shared_string_index(cell).and_then(|old| lookup(PoolKind::SharedString, &old))
            else {
                return;
            };
            if let Some(value) = cell.child_mut(S, "v") {
                value.children = vec![XmlNode::Text(new)];
            }
        });
    }
    if let Some(table_parts) = doc.root.child_mut(S, "tableParts") {
        table_parts.retain_elements(|table_part| {
            table_part
                .attr_ns(R, "id")
                .and_then(|id| rels.and_then(|rels| rels.get(id)))
                .and_then(|rel| rel.target_part())
                .is_none_or(|table| plan.keeps(PoolKind::Part, table.as_str()))
        });
        let count = table_parts.elements().count();
        set_count(table_parts, count);
    }
    doc.root
        .retain_elements(|el| !el.is(S, "tableParts") || el.elements().next().is_some());
    rewrite_refs(&mut doc.root, CELL_RULES, &lookup);
    doc
}

/// Cut a table's range back to the last of `kept` rows inside it.
///
/// The header row stays, along with at least one data row; a totals row
/// that was left behind is dropped, and so is a sort state that may point
/// past the new range.
fn clip_table(doc: &XmlDocument, kept: &[usize]) -> XmlDocument {
    let Some(((first_col, first), (last_col, last))) = doc.root.attr("ref").and_then(parse_range) else {
        return doc.clone();
    };
    let Some(kept_last) = kept.iter().copied().filter(|row| (first..=last).contains(row)).max() else {
        return doc.clone();
    };
    if kept_last >= last {
        return doc.clone();
    }
    let header_rows = doc.root.attr("headerRowCount").and_then(parse_index).unwrap_or(1);
    let end = kept_last.max(first + header_rows.min(1));
    let range = format!("{first_col}{first}:{last_col}{end}");

    let mut doc = doc.clone();
    doc.root.set_attr("ref", range.as_str());
    doc.root.remove_attr("totalsRowCount");
    doc.root.retain_elements(|el| !el.is(S, "sortState"));
    if let Some(filter) = doc.root.child_mut(S, "autoFilter") {
        filter.set_attr("ref", range.as_str());
        filter.retain_elements(|el| !el.is(S, "sortState"));
    }
    doc
}

/// Remove shared formulas whose master cell was left behind; the cached
/// value stays.
fn drop_orphan_shared_formulas(sheet_data: &mut XmlElement) {
    let is_shared = |f: &XmlElement| f.is(S, "f") && f.attr("t") == Some("shared");
    let masters: HashSet<String> = sheet_data
        .descendants()
        .filter(|f| is_shared(f) && f.attr("ref").is_some())
        .filter_map(|f| f.attr("si").map(str::to_string))
        .collect();
    for row in sheet_data.elements_mut() {
        for cell in row.elements_mut() {
            cell.retain_elements(|f| {
                !is_shared(f) || f.attr("ref").is_some() || f.attr("si").is_some_and(|si| masters.contains(si))
            });
        }
    }
}

fn rebuild_styles(doc: &XmlDocument, plan: &FragmentPlan<'_>) -> XmlDocument {
    let lookup = plan.lookup();
    let mut doc = doc.clone();

    if let Some(num_fmts) = doc.root.child_mut(S, "numFmts") {
        num_fmts.retain_elements(|fmt| {
            fmt.attr("numFmtId")
                .is_some_and(|id| plan.keeps(PoolKind::NumberFormat, id))
        });
        for fmt in num_fmts.elements_mut() {
            if let Some(new) = fmt.attr("numFmtId").and_then(|id| lookup(PoolKind::NumberFormat, id)) {
                fmt.set_attr("numFmtId", new);
            }
        }
        let count = num_fmts.elements().count();
        set_count(num_fmts, count);
    }
    doc.root
        .retain_elements(|el| !el.is(S, "numFmts") || el.elements().next().is_some());

    for &(container, record, kind) in POSITIONAL {
        let Some(container) = doc.root.child_mut(S, container) else {
            continue;
        };
        let source: Vec<XmlElement> = container.children_named(S, record).cloned().collect();
        let mut kept: Vec<XmlNode> = Vec::new();
        for id in plan.members(kind) {
            if let Some(el) = parse_index(id).and_then(|i| source.get(i)) {
                let mut el = el.clone();
                rewrite_element_refs(&mut el, XF_RULES, &lookup);
                kept.push(XmlNode::Element(el));
            }
        }
        set_count(container, kept.len());
        container.children = kept;
    }

    if let Some(cell_styles) = doc.root.child_mut(S, "cellStyles") {
        cell_styles.retain_elements(|style| {
            style
                .attr("xfId")
                .is_some_and(|id| plan.keeps(PoolKind::CellStyleFormat, id))
        });
        for style in cell_styles.elements_mut() {
            if let Some(new) = style.attr("xfId").and_then(|id| lookup(PoolKind::CellStyleFormat, id)) {
                style.set_attr("xfId", new);
            }
        }
        let count = cell_styles.elements().count();
        set_count(cell_styles, count);
    }
    doc
}

fn rebuild_shared_strings(doc: &XmlDocument, plan: &FragmentPlan<'_>) -> XmlDocument {
    let source: Vec<&XmlElement> = doc.root.children_named(S, "si").collect();
    let kept: Vec<XmlNode> = plan
        .members(PoolKind::SharedString)
        .filter_map(|id| parse_index(id).and_then(|i| source.get(i)))
        .map(|si| XmlNode::Element(XmlElement::clone(si)))
        .collect();
    let total = plan
        .nodes()
        .iter()
        .flat_map(|node| node.refs.iter())
        .filter(|r| r.pool == PoolKind::SharedString)
        .count();

    let mut root = doc.root.clone();
    root.set_attr("count", index_id(total));
    root.set_attr("uniqueCount", index_id(kept.len()));
    root.children = kept;
    XmlDocument {
        root,
        ..doc.clone()
    }
}

fn set_count(container: &mut XmlElement, count: usize) {
    if container.attr("count").is_some() {
        container.set_attr("count", index_id(count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::XlsxBuilder;

    #[test]
    fn test_references_sheet() {
        assert!(references_sheet("Data!$A$1:$B$4", "Data"));
        assert!(references_sheet("'My Sheet'!$A$1", "My Sheet"));
        assert!(references_sheet("'It''s'!A1", "It's"));
        assert!(!references_sheet("OldData!A1", "Data"));
        assert!(!references_sheet("Summary!A1", "Data"));
    }

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("A1:C4"), Some((("A", 1), ("C", 4))));
        assert_eq!(parse_range("AB12:AC300"), Some((("AB", 12), ("AC", 300))));
        assert_eq!(parse_range("A1"), None);
        assert_eq!(parse_range("1A:C4"), None);
    }

    #[test]
    fn test_clip_table_keeps_header_and_a_data_row() {
        let doc = XmlDocument::parse(
            format!(
                r#"<table xmlns="{S}" ref="B2:D9" totalsRowCount="1"><autoFilter ref="B2:D8"><sortState ref="B3:D8"/></autoFilter></table>"#
            )
            .as_bytes(),
        )
        .unwrap();

        let clipped = clip_table(&doc, &[1, 2]);
        assert_eq!(clipped.root.attr("ref"), Some("B2:D3"));
        assert_eq!(clipped.root.attr("totalsRowCount"), None);
        let filter = clipped.root.child(S, "autoFilter").unwrap();
        assert_eq!(filter.attr("ref"), Some("B2:D3"));
        assert!(filter.child(S, "sortState").is_none());

        assert_eq!(clip_table(&doc, &[2, 3, 4, 5]).root.attr("ref"), Some("B2:D5"));
        let whole: Vec<usize> = (2..=9).collect();
        assert_eq!(clip_table(&doc, &whole).root, doc.root);
    }

    #[test]
    fn test_builtin_number_formats_are_not_references() {
        assert!(is_builtin_number_format("0"));
        assert!(is_builtin_number_format("49"));
        assert!(!is_builtin_number_format("164"));
    }

    #[test]
    fn test_index_sheets_and_rows() {
        let bytes = XlsxBuilder::new()
            .sheet("First", &[&["a", "b"], &["c"]])
            .sheet("Second", &[&["a"], &["d"], &["e"]])
            .row_break("Second", 2)
            .build();
        let package = Package::load(&bytes).unwrap();
        let content = package.content_index().unwrap();

        assert_eq!(content.units.len(), 2);
        assert_eq!(content.units[0].name, "First");
        assert_eq!(content.units[1].nodes(), 2..5);
        assert_eq!(content.len(), 5);
        assert!(content.nodes[3].markers.contains(BreakMarkers::PAGE));
        // The shared string "a" is pooled once and referenced from both sheets
        assert_eq!(content.pool(PoolKind::SharedString).len(), 5);
        assert!(content.nodes[2].refs.contains(&ResourceRef::new(PoolKind::SharedString, "0")));
    }

    #[test]
    fn test_required_entries_are_pinned() {
        let bytes = XlsxBuilder::new().sheet("Only", &[&["x"]]).build();
        let package = Package::load(&bytes).unwrap();
        let content = package.content_index().unwrap();
        assert!(content.pinned.contains(&ResourceRef::new(PoolKind::Fill, "1")));
        assert!(content.pinned.contains(&ResourceRef::new(PoolKind::CellFormat, "0")));
        let xf = content.pool(PoolKind::CellFormat).get("1").unwrap();
        assert!(xf.deps.contains(&ResourceRef::new(PoolKind::Font, "1")));
    }
}
