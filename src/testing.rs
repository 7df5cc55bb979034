//! In-memory fixture packages for tests.

use crate::backend::{CompoundBinaryBackend, FormatBackend, ZipBackend};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const S_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const P_NS: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
const A_NS: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const P14_NS: &str = "http://schemas.microsoft.com/office/powerpoint/2010/main";
const REL_BASE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/";
const CORE_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";

/// A zip archive holding `members` in order.
pub fn zip_bytes(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, data) in members {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// The same package stored in a compound binary container.
pub fn to_compound(zip: &[u8]) -> Vec<u8> {
    let tree = ZipBackend.decode(zip).unwrap();
    CompoundBinaryBackend.encode(&tree).unwrap()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn rels_xml(rels: &[(String, String, String)]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (id, reltype, target) in rels {
        xml.push_str(&format!(r#"<Relationship Id="{id}" Type="{reltype}" Target="{target}"/>"#));
    }
    xml.push_str("</Relationships>");
    xml
}

fn rel(id: impl Into<String>, suffix: &str, target: impl Into<String>) -> (String, String, String) {
    (id.into(), format!("{REL_BASE}{suffix}"), target.into())
}

/// Members shared by every fixture: content types, package relationships
/// and core properties.
struct Members {
    defaults: Vec<(&'static str, &'static str)>,
    overrides: Vec<(String, String)>,
    files: Vec<(String, Vec<u8>)>,
}

impl Members {
    fn new(main: &str, main_type: &str) -> Self {
        let mut members = Members {
            defaults: vec![
                ("rels", "application/vnd.openxmlformats-package.relationships+xml"),
                ("xml", "application/xml"),
                ("png", "image/png"),
            ],
            overrides: Vec::new(),
            files: Vec::new(),
        };
        members.add(
            "_rels/.rels",
            None,
            rels_xml(&[
                rel("rId1", "officeDocument", main),
                ("rId2".into(), CORE_REL.into(), "docProps/core.xml".into()),
            ]),
        );
        members.add(
            "docProps/core.xml",
            Some("application/vnd.openxmlformats-package.core-properties+xml"),
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>Fixture</dc:title></cp:coreProperties>"#,
        );
        members.overrides.push((format!("/{main}"), main_type.to_string()));
        members
    }

    fn add(&mut self, name: &str, content_type: Option<&str>, data: impl Into<Vec<u8>>) {
        if let Some(content_type) = content_type {
            self.overrides.push((format!("/{name}"), content_type.to_string()));
        }
        self.files.push((name.to_string(), data.into()));
    }

    fn build(self) -> Vec<u8> {
        let mut types = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        );
        for (ext, ct) in &self.defaults {
            types.push_str(&format!(r#"<Default Extension="{ext}" ContentType="{ct}"/>"#));
        }
        for (name, ct) in &self.overrides {
            types.push_str(&format!(r#"<Override PartName="{name}" ContentType="{ct}"/>"#));
        }
        types.push_str("</Types>");

        let mut members: Vec<(&str, &[u8])> = vec![("[Content_Types].xml", types.as_bytes())];
        members.extend(self.files.iter().map(|(name, data)| (name.as_str(), data.as_slice())));
        zip_bytes(&members)
    }
}

/// A WordprocessingML document.
///
/// Styles: `Normal` (default), `DefaultParagraphFont` (default), `Heading1`,
/// `Quote`, `ListParagraph` and `Header`, all based on `Normal`. Numbering:
/// num `1` -> abstract `0`. Main relationships: `rId1` styles, `rId2`
/// numbering, then headers, images and extras in call order.
#[derive(Debug, Default)]
pub struct DocxBuilder {
    body: Vec<String>,
    rels: Vec<(String, String, String)>,
    members: Vec<(String, Option<&'static str>, Vec<u8>)>,
    header: Option<String>,
}

impl DocxBuilder {
    pub fn new() -> Self {
        Self {
            rels: vec![rel("rId1", "styles", "styles.xml"), rel("rId2", "numbering", "numbering.xml")],
            ..Default::default()
        }
    }

    fn next_rel_id(&self) -> String {
        format!("rId{}", self.rels.len() + 1)
    }

    fn run(text: &str) -> String {
        format!("<w:r><w:t>{}</w:t></w:r>", escape(text))
    }

    pub fn paragraph(mut self, text: &str) -> Self {
        self.body.push(format!("<w:p>{}</w:p>", Self::run(text)));
        self
    }

    pub fn styled_paragraph(mut self, style: &str, text: &str) -> Self {
        self.body.push(format!(
            r#"<w:p><w:pPr><w:pStyle w:val="{style}"/></w:pPr>{}</w:p>"#,
            Self::run(text)
        ));
        self
    }

    pub fn heading(self, text: &str) -> Self {
        self.styled_paragraph("Heading1", text)
    }

    pub fn list_item(mut self, num_id: u32, text: &str) -> Self {
        self.body.push(format!(
            r#"<w:p><w:pPr><w:pStyle w:val="ListParagraph"/><w:numPr><w:ilvl w:val="0"/><w:numId w:val="{num_id}"/></w:numPr></w:pPr>{}</w:p>"#,
            Self::run(text)
        ));
        self
    }

    /// A paragraph holding only a hard page break.
    pub fn page_break(mut self) -> Self {
        self.body.push(r#"<w:p><w:r><w:br w:type="page"/></w:r></w:p>"#.to_string());
        self
    }

    /// A paragraph of text ending with a hard page break.
    pub fn paragraph_with_break(mut self, text: &str) -> Self {
        self.body.push(format!(
            r#"<w:p>{}<w:r><w:br w:type="page"/></w:r></w:p>"#,
            Self::run(text)
        ));
        self
    }

    pub fn paragraph_with_page_break_before(mut self, text: &str) -> Self {
        self.body.push(format!(
            "<w:p><w:pPr><w:pageBreakBefore/></w:pPr>{}</w:p>",
            Self::run(text)
        ));
        self
    }

    /// A paragraph closing a landscape section.
    pub fn section_break(mut self, text: &str) -> Self {
        self.body.push(format!(
            r#"<w:p><w:pPr><w:sectPr><w:pgSz w:w="15840" w:h="12240" w:orient="landscape"/></w:sectPr></w:pPr>{}</w:p>"#,
            Self::run(text)
        ));
        self
    }

    /// A paragraph with an embedded image part.
    pub fn image(mut self, file: &str) -> Self {
        let id = self.next_rel_id();
        self.body.push(format!(
            r#"<w:p><w:r><w:drawing><a:blip xmlns:a="{A_NS}" r:embed="{id}"/></w:drawing></w:r></w:p>"#
        ));
        self.rels.push(rel(id, "image", format!("media/{file}")));
        self.members
            .push((format!("word/media/{file}"), None, b"\x89PNG\r\n\x1a\n".to_vec()));
        self
    }

    /// Add a header part styled `Header` and return its relationship id.
    /// Parts are named `word/headerN.xml` in call order.
    fn add_header(&mut self, text: &str) -> String {
        let id = self.next_rel_id();
        let n = self.members.iter().filter(|(name, ..)| name.starts_with("word/header")).count() + 1;
        self.rels.push(rel(id.clone(), "header", format!("header{n}.xml")));
        self.members.push((
            format!("word/header{n}.xml"),
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"),
            format!(
                r#"<w:hdr xmlns:w="{W_NS}" xmlns:r="{R_NS}"><w:p><w:pPr><w:pStyle w:val="Header"/></w:pPr>{}</w:p></w:hdr>"#,
                Self::run(text)
            )
            .into_bytes(),
        ));
        id
    }

    /// A default header in the body-level section, styled `Header`.
    pub fn with_header(mut self, text: &str) -> Self {
        let id = self.add_header(text);
        self.header = Some(id);
        self
    }

    /// A paragraph closing a section that defines its own default header.
    /// Sections after it that name no header inherit this one.
    pub fn section_break_with_header(mut self, text: &str, header: &str) -> Self {
        let id = self.add_header(header);
        self.body.push(format!(
            r#"<w:p><w:pPr><w:sectPr><w:headerReference w:type="default" r:id="{id}"/><w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:pPr>{}</w:p>"#,
            Self::run(text)
        ));
        self
    }

    /// A table of contents content control with one hyperlinked entry per
    /// `(text, bookmark)`. Entries use the undefined style `TOC1`.
    pub fn table_of_contents(mut self, entries: &[(&str, &str)]) -> Self {
        let items: String = entries
            .iter()
            .map(|(text, anchor)| {
                format!(
                    r#"<w:p><w:pPr><w:pStyle w:val="TOC1"/></w:pPr><w:hyperlink w:anchor="{anchor}" w:history="1">{}</w:hyperlink></w:p>"#,
                    Self::run(text)
                )
            })
            .collect();
        self.body.push(format!(
            r#"<w:sdt><w:sdtPr><w:docPartObj><w:docPartGallery w:val="Table of Contents"/><w:docPartUnique/></w:docPartObj></w:sdtPr><w:sdtContent>{items}</w:sdtContent></w:sdt>"#
        ));
        self
    }

    /// A heading paragraph wrapped in a bookmark.
    pub fn bookmarked_heading(mut self, text: &str, bookmark: &str) -> Self {
        let id = self.body.len();
        self.body.push(format!(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:bookmarkStart w:id="{id}" w:name="{bookmark}"/>{}<w:bookmarkEnd w:id="{id}"/></w:p>"#,
            Self::run(text)
        ));
        self
    }

    pub fn extra_relationship(mut self, id: &str, reltype: &str, target: &str) -> Self {
        self.rels.push((id.to_string(), reltype.to_string(), target.to_string()));
        self
    }

    pub fn extra_member(mut self, name: &str, data: &[u8]) -> Self {
        self.members.push((name.to_string(), None, data.to_vec()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let header_ref = self
            .header
            .as_deref()
            .map(|id| format!(r#"<w:headerReference w:type="default" r:id="{id}"/>"#))
            .unwrap_or_default();
        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="{W_NS}" xmlns:r="{R_NS}"><w:body>{}<w:sectPr>{header_ref}<w:pgSz w:w="12240" w:h="15840"/></w:sectPr></w:body></w:document>"#,
            self.body.concat()
        );

        let mut members = Members::new(
            "word/document.xml",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
        );
        members.add("word/document.xml", None, document);
        members.add("word/_rels/document.xml.rels", None, rels_xml(&self.rels));
        members.add(
            "word/styles.xml",
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"),
            styles_xml(),
        );
        members.add(
            "word/numbering.xml",
            Some("application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"),
            format!(
                r#"<w:numbering xmlns:w="{W_NS}"><w:abstractNum w:abstractNumId="0"><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="decimal"/><w:lvlText w:val="%1."/></w:lvl></w:abstractNum><w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num></w:numbering>"#
            ),
        );
        for (name, content_type, data) in self.members {
            members.add(&name, content_type, data);
        }
        members.build()
    }
}

fn styles_xml() -> String {
    let style = |kind: &str, id: &str, name: &str, default: bool, based_on: Option<&str>| {
        let default = if default { r#" w:default="1""# } else { "" };
        let based_on = based_on
            .map(|base| format!(r#"<w:basedOn w:val="{base}"/>"#))
            .unwrap_or_default();
        format!(
            r#"<w:style w:type="{kind}"{default} w:styleId="{id}"><w:name w:val="{name}"/>{based_on}</w:style>"#
        )
    };
    format!(
        r#"<w:styles xmlns:w="{W_NS}">{}{}{}{}{}{}</w:styles>"#,
        style("paragraph", "Normal", "Normal", true, None),
        style("character", "DefaultParagraphFont", "Default Paragraph Font", true, None),
        style("paragraph", "Heading1", "heading 1", false, Some("Normal")),
        style("paragraph", "Quote", "Quote", false, Some("Normal")),
        style("paragraph", "ListParagraph", "List Paragraph", false, Some("Normal")),
        style("paragraph", "Header", "header", false, Some("Normal")),
    )
}

/// A SpreadsheetML workbook of string cells.
///
/// Strings are shared in first-seen order across sheets. Column A cells use
/// cell format 1 (font 1); other cells use the default format. Styles hold
/// custom number format 164, two fonts, two fills, one border, one cell
/// style format and three cell formats.
#[derive(Debug, Default)]
pub struct XlsxBuilder {
    sheets: Vec<(String, Vec<Vec<String>>)>,
    breaks: Vec<(String, usize)>,
    defined_names: Vec<(String, Option<usize>, String)>,
    tables: Vec<(String, String, String, Vec<String>)>,
}

impl XlsxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(mut self, name: &str, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        self.sheets.push((name.to_string(), rows));
        self
    }

    /// Manual page break after 1-based `row` of `sheet`.
    pub fn row_break(mut self, sheet: &str, row: usize) -> Self {
        self.breaks.push((sheet.to_string(), row));
        self
    }

    /// A table over `range` of `sheet` with an autofilter; tables are
    /// `xl/tables/tableN.xml` in call order.
    pub fn table(mut self, sheet: &str, name: &str, range: &str, columns: &[&str]) -> Self {
        self.tables.push((
            sheet.to_string(),
            name.to_string(),
            range.to_string(),
            columns.iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    pub fn defined_name(mut self, name: &str, local_sheet_id: Option<usize>, formula: &str) -> Self {
        self.defined_names
            .push((name.to_string(), local_sheet_id, formula.to_string()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut strings: Vec<&str> = Vec::new();
        let mut members = Members::new(
            "xl/workbook.xml",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
        );

        let mut sheet_list = String::new();
        let mut rels = Vec::new();
        let mut sheet_files = Vec::new();
        let mut sheet_rel_files = Vec::new();
        let mut table_files = Vec::new();
        for (i, (name, rows)) in self.sheets.iter().enumerate() {
            let n = i + 1;
            sheet_list.push_str(&format!(
                r#"<sheet name="{}" sheetId="{n}" r:id="rId{n}"/>"#,
                escape(name)
            ));
            rels.push(rel(format!("rId{n}"), "worksheet", format!("worksheets/sheet{n}.xml")));

            let mut data = String::new();
            for (r, row) in rows.iter().enumerate() {
                let r = r + 1;
                data.push_str(&format!(r#"<row r="{r}">"#));
                for (c, value) in row.iter().enumerate() {
                    let index = match strings.iter().position(|s| *s == value.as_str()) {
                        Some(index) => index,
                        None => {
                            strings.push(value);
                            strings.len() - 1
                        },
                    };
                    let column = (b'A' + c as u8) as char;
                    let style = if c == 0 { r#" s="1""# } else { "" };
                    data.push_str(&format!(r#"<c r="{column}{r}"{style} t="s"><v>{index}</v></c>"#));
                }
                data.push_str("</row>");
            }
            let breaks: Vec<usize> = self
                .breaks
                .iter()
                .filter(|(sheet, _)| sheet == name)
                .map(|&(_, row)| row)
                .collect();
            let row_breaks = if breaks.is_empty() {
                String::new()
            } else {
                let brks: String = breaks
                    .iter()
                    .map(|row| format!(r#"<brk id="{row}" max="16383" man="1"/>"#))
                    .collect();
                format!(
                    r#"<rowBreaks count="{0}" manualBreakCount="{0}">{brks}</rowBreaks>"#,
                    breaks.len()
                )
            };
            let mut sheet_rels = Vec::new();
            let mut table_parts = String::new();
            for (t, (_, table, range, columns)) in self.tables.iter().enumerate().filter(|(_, t)| &t.0 == name) {
                let id = format!("rId{}", sheet_rels.len() + 1);
                table_parts.push_str(&format!(r#"<tablePart r:id="{id}"/>"#));
                sheet_rels.push(rel(id, "table", format!("../tables/table{}.xml", t + 1)));
                let column_count = columns.len();
                let columns: String = columns
                    .iter()
                    .enumerate()
                    .map(|(c, column)| format!(r#"<tableColumn id="{}" name="{}"/>"#, c + 1, escape(column)))
                    .collect();
                table_files.push((
                    format!("xl/tables/table{}.xml", t + 1),
                    format!(
                        r#"<table xmlns="{S_NS}" id="{}" name="{table}" displayName="{table}" ref="{range}" totalsRowShown="0"><autoFilter ref="{range}"/><tableColumns count="{}">{columns}</tableColumns><tableStyleInfo name="TableStyleMedium2" showRowStripes="1"/></table>"#,
                        t + 1,
                        column_count
                    ),
                ));
            }
            if !sheet_rels.is_empty() {
                table_parts = format!(r#"<tableParts count="{}">{table_parts}</tableParts>"#, sheet_rels.len());
                sheet_rel_files.push((format!("xl/worksheets/_rels/sheet{n}.xml.rels"), rels_xml(&sheet_rels)));
            }
            sheet_files.push((
                format!("xl/worksheets/sheet{n}.xml"),
                format!(
                    r#"<worksheet xmlns="{S_NS}" xmlns:r="{R_NS}"><dimension ref="A1"/><cols><col min="1" max="1" width="12" style="1" customWidth="1"/></cols><sheetData>{data}</sheetData>{row_breaks}{table_parts}</worksheet>"#
                ),
            ));
        }
        let n = self.sheets.len();
        rels.push(rel(format!("rId{}", n + 1), "styles", "styles.xml"));
        rels.push(rel(format!("rId{}", n + 2), "sharedStrings", "sharedStrings.xml"));

        let defined_names = if self.defined_names.is_empty() {
            String::new()
        } else {
            let names: String = self
                .defined_names
                .iter()
                .map(|(name, local, formula)| {
                    let local = local
                        .map(|id| format!(r#" localSheetId="{id}""#))
                        .unwrap_or_default();
                    format!(r#"<definedName name="{name}"{local}>{}</definedName>"#, escape(formula))
                })
                .collect();
            format!("<definedNames>{names}</definedNames>")
        };
        members.add(
            "xl/workbook.xml",
            None,
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{S_NS}" xmlns:r="{R_NS}"><bookViews><workbookView activeTab="{}"/></bookViews><sheets>{sheet_list}</sheets>{defined_names}</workbook>"#,
                n.saturating_sub(1)
            ),
        );
        members.add("xl/_rels/workbook.xml.rels", None, rels_xml(&rels));
        for (name, xml) in sheet_files {
            members.add(
                &name,
                Some("application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"),
                xml,
            );
        }
        for (name, xml) in sheet_rel_files {
            members.add(&name, None, xml);
        }
        for (name, xml) in table_files {
            members.add(
                &name,
                Some("application/vnd.openxmlformats-officedocument.spreadsheetml.table+xml"),
                xml,
            );
        }
        members.add(
            "xl/styles.xml",
            Some("application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"),
            format!(
                r#"<styleSheet xmlns="{S_NS}"><numFmts count="1"><numFmt numFmtId="164" formatCode="0.000"/></numFmts><fonts count="2"><font><sz val="11"/><name val="Calibri"/></font><font><b/><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="1" fillId="0" borderId="0" xfId="0" applyFont="1"/><xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#
            ),
        );
        let total: usize = self
            .sheets
            .iter()
            .map(|(_, rows)| rows.iter().map(Vec::len).sum::<usize>())
            .sum();
        let items: String = strings
            .iter()
            .map(|s| format!("<si><t>{}</t></si>", escape(s)))
            .collect();
        members.add(
            "xl/sharedStrings.xml",
            Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"),
            format!(
                r#"<sst xmlns="{S_NS}" count="{total}" uniqueCount="{}">{items}</sst>"#,
                strings.len()
            ),
        );
        members.build()
    }
}

/// A PresentationML deck of titled slides.
///
/// One master, one layout and one theme; slide ids start at 256 and slide
/// parts are `ppt/slides/slideN.xml`. Presentation relationships: `rId1`
/// master, `rId2` theme, `rId3` presProps, then one per slide.
#[derive(Debug, Default)]
pub struct PptxBuilder {
    slides: Vec<String>,
    sections: Vec<(String, Vec<usize>)>,
    links: Vec<(usize, usize)>,
    images: Vec<usize>,
}

impl PptxBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slide(mut self, title: &str) -> Self {
        self.slides.push(title.to_string());
        self
    }

    /// A section over the given 0-based slide indices.
    pub fn section(mut self, name: &str, slides: &[usize]) -> Self {
        self.sections.push((name.to_string(), slides.to_vec()));
        self
    }

    /// A hyperlink from slide `from` to slide `to` (0-based).
    pub fn slide_link(mut self, from: usize, to: usize) -> Self {
        self.links.push((from, to));
        self
    }

    /// A picture on slide `slide` (0-based) with its own media part.
    pub fn slide_image(mut self, slide: usize) -> Self {
        self.images.push(slide);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut members = Members::new(
            "ppt/presentation.xml",
            "application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml",
        );
        let mut rels = vec![
            rel("rId1", "slideMaster", "slideMasters/slideMaster1.xml"),
            rel("rId2", "theme", "theme/theme1.xml"),
            rel("rId3", "presProps", "presProps.xml"),
        ];
        let mut slide_list = String::new();
        for i in 0..self.slides.len() {
            let r_id = format!("rId{}", i + 4);
            slide_list.push_str(&format!(r#"<p:sldId id="{}" r:id="{r_id}"/>"#, 256 + i));
            rels.push(rel(r_id, "slide", format!("slides/slide{}.xml", i + 1)));
        }
        let ext = if self.sections.is_empty() {
            String::new()
        } else {
            let sections: String = self
                .sections
                .iter()
                .enumerate()
                .map(|(n, (name, slides))| {
                    let ids: String = slides
                        .iter()
                        .map(|s| format!(r#"<p14:sldId id="{}"/>"#, 256 + s))
                        .collect();
                    format!(
                        r#"<p14:section name="{name}" id="{{00000000-0000-0000-0000-{n:012}}}"><p14:sldIdLst>{ids}</p14:sldIdLst></p14:section>"#
                    )
                })
                .collect();
            format!(
                r#"<p:extLst><p:ext uri="{{521415D9-36F7-43E2-AB2F-B90AF26B5E84}}"><p14:sectionLst xmlns:p14="{P14_NS}">{sections}</p14:sectionLst></p:ext></p:extLst>"#
            )
        };
        members.add(
            "ppt/presentation.xml",
            None,
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation xmlns:a="{A_NS}" xmlns:r="{R_NS}" xmlns:p="{P_NS}"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst>{slide_list}</p:sldIdLst><p:sldSz cx="9144000" cy="6858000"/><p:notesSz cx="6858000" cy="9144000"/>{ext}</p:presentation>"#
            ),
        );
        members.add("ppt/_rels/presentation.xml.rels", None, rels_xml(&rels));

        for (i, title) in self.slides.iter().enumerate() {
            let n = i + 1;
            let mut slide_rels = vec![rel("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml")];
            let mut link = String::new();
            for &(_, to) in self.links.iter().filter(|&&(from, _)| from == i) {
                let id = format!("rId{}", slide_rels.len() + 1);
                link = format!(r#"<a:rPr><a:hlinkClick r:id="{id}" action="ppaction://hlinksldjump"/></a:rPr>"#);
                slide_rels.push(rel(id, "slide", format!("slide{}.xml", to + 1)));
            }
            let mut pictures = String::new();
            if self.images.contains(&i) {
                let id = format!("rId{}", slide_rels.len() + 1);
                pictures = format!(
                    r#"<p:pic><p:nvPicPr><p:cNvPr id="3" name="Picture"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="{id}"/></p:blipFill><p:spPr/></p:pic>"#
                );
                slide_rels.push(rel(id, "image", format!("../media/image{n}.png")));
                members.add(&format!("ppt/media/image{n}.png"), None, b"\x89PNG\r\n\x1a\n".to_vec());
            }
            members.add(
                &format!("ppt/slides/slide{n}.xml"),
                Some("application/vnd.openxmlformats-officedocument.presentationml.slide+xml"),
                format!(
                    r#"<p:sld xmlns:a="{A_NS}" xmlns:r="{R_NS}" xmlns:p="{P_NS}"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r>{link}<a:t>{}</a:t></a:r></a:p></p:txBody></p:sp>{pictures}</p:spTree></p:cSld></p:sld>"#,
                    escape(title)
                ),
            );
            members.add(&format!("ppt/slides/_rels/slide{n}.xml.rels"), None, rels_xml(&slide_rels));
        }

        members.add(
            "ppt/slideMasters/slideMaster1.xml",
            Some("application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"),
            format!(
                r#"<p:sldMaster xmlns:a="{A_NS}" xmlns:r="{R_NS}" xmlns:p="{P_NS}"><p:cSld><p:spTree/></p:cSld><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst></p:sldMaster>"#
            ),
        );
        members.add(
            "ppt/slideMasters/_rels/slideMaster1.xml.rels",
            None,
            rels_xml(&[
                rel("rId1", "slideLayout", "../slideLayouts/slideLayout1.xml"),
                rel("rId2", "theme", "../theme/theme1.xml"),
            ]),
        );
        members.add(
            "ppt/slideLayouts/slideLayout1.xml",
            Some("application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"),
            format!(r#"<p:sldLayout xmlns:a="{A_NS}" xmlns:r="{R_NS}" xmlns:p="{P_NS}"><p:cSld><p:spTree/></p:cSld></p:sldLayout>"#),
        );
        members.add(
            "ppt/slideLayouts/_rels/slideLayout1.xml.rels",
            None,
            rels_xml(&[rel("rId1", "slideMaster", "../slideMasters/slideMaster1.xml")]),
        );
        members.add(
            "ppt/theme/theme1.xml",
            Some("application/vnd.openxmlformats-officedocument.theme+xml"),
            format!(r#"<a:theme xmlns:a="{A_NS}" name="Office"><a:themeElements/></a:theme>"#),
        );
        members.add(
            "ppt/presProps.xml",
            Some("application/vnd.openxmlformats-officedocument.presentationml.presProps+xml"),
            format!(r#"<p:presentationPr xmlns:p="{P_NS}"/>"#),
        );
        members.build()
    }
}
