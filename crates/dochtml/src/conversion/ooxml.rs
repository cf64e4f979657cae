//! Minimal WordprocessingML reader
//!
//! Reads `word/document.xml`, `word/styles.xml` and the document
//! relationships straight from the zip package into a small block model
//! shared by both DOCX conversion stages.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use crate::error::{Error, Result};

const STRATEGY: &str = "ooxml";
const IMAGE_REL_SUFFIX: &str = "/image";

/// Parsed document body
#[derive(Debug, Clone, Default)]
pub struct DocxDocument {
    pub blocks: Vec<Block>,
    /// Images referenced from the document relationships, in relationship order
    pub images: Vec<PackageImage>,
}

impl DocxDocument {
    pub fn has_tables(&self) -> bool {
        self.blocks.iter().any(|b| matches!(b, Block::Table(_)))
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            _ => None,
        })
    }

    /// Text of every paragraph and table cell, one line each
    pub fn raw_text(&self) -> String {
        let mut lines = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Paragraph(p) => lines.push(p.text()),
                Block::Table(t) => {
                    for row in &t.rows {
                        lines.push(row.join("\t"));
                    }
                }
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, Clone)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

#[derive(Debug, Clone, Default)]
pub struct Paragraph {
    /// Style display name (`Heading 1`), falling back to the style id
    pub style: Option<String>,
    /// `w:jc` value
    pub alignment: Option<String>,
    /// Paragraph carries list numbering
    pub numbered: bool,
    pub runs: Vec<Run>,
}

impl Paragraph {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    /// Hex color without `#`
    pub color: Option<String>,
    pub size_pt: Option<f32>,
    /// Character style display name
    pub style: Option<String>,
}

/// Table as rows of cell text
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct PackageImage {
    /// Part name inside the package (`word/media/image1.png`)
    pub part: String,
    pub data: Vec<u8>,
}

/// Normalized style key: lowercase without whitespace, so `Heading 1`,
/// `heading 1` and `Heading1` compare equal
pub fn style_key(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Zip-backed DOCX package
pub struct DocxPackage {
    archive: ZipArchive<File>,
}

impl DocxPackage {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let archive = ZipArchive::new(file)
            .map_err(|e| Error::strategy(STRATEGY, format!("Not a DOCX package: {}", e)))?;
        Ok(Self { archive })
    }

    /// Read and parse the whole document
    pub fn read(path: &Path) -> Result<DocxDocument> {
        let mut package = Self::open(path)?;
        let styles = match package.read_part("word/styles.xml")? {
            Some(xml) => parse_styles(&xml),
            None => HashMap::new(),
        };
        let document = package
            .read_part("word/document.xml")?
            .ok_or_else(|| Error::strategy(STRATEGY, "word/document.xml is missing"))?;

        let blocks = parse_document(&document, &styles)?;
        let images = package.read_images()?;

        Ok(DocxDocument { blocks, images })
    }

    fn read_part(&mut self, name: &str) -> Result<Option<String>> {
        let Ok(mut part) = self.archive.by_name(name) else {
            return Ok(None);
        };
        let mut content = String::new();
        part.read_to_string(&mut content)?;
        Ok(Some(content))
    }

    fn read_binary_part(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let Ok(mut part) = self.archive.by_name(name) else {
            return Ok(None);
        };
        let mut content = Vec::new();
        part.read_to_end(&mut content)?;
        Ok(Some(content))
    }

    fn read_images(&mut self) -> Result<Vec<PackageImage>> {
        let Some(rels) = self.read_part("word/_rels/document.xml.rels")? else {
            return Ok(Vec::new());
        };

        let mut images = Vec::new();
        for rel in parse_relationships(&rels) {
            if !rel.rel_type.ends_with(IMAGE_REL_SUFFIX) || rel.external {
                continue;
            }
            let part = resolve_part(&rel.target);
            match self.read_binary_part(&part)? {
                Some(data) => images.push(PackageImage { part, data }),
                None => tracing::debug!("Image relationship {} points at missing part {}", rel.id, part),
            }
        }
        Ok(images)
    }
}

/// Relationship targets are relative to `word/` unless absolute
fn resolve_part(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("word/{}", target.trim_start_matches("./")),
    }
}

/// Extract an attribute value by local name
fn get_attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.local_name().as_ref() == key)
        .map(|a| {
            a.unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).into_owned())
        })
}

/// Toggle properties are on unless `w:val` is explicitly off
fn toggle_on(e: &BytesStart) -> bool {
    !matches!(get_attr(e, b"val").as_deref(), Some("0") | Some("false") | Some("none"))
}

#[derive(Debug)]
struct Relationship {
    id: String,
    rel_type: String,
    target: String,
    external: bool,
}

fn parse_relationships(xml: &str) -> Vec<Relationship> {
    let mut reader = Reader::from_str(xml);
    let mut rels = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"Relationship" => {
                let (Some(id), Some(target)) = (get_attr(&e, b"Id"), get_attr(&e, b"Target")) else {
                    continue;
                };
                rels.push(Relationship {
                    id,
                    rel_type: get_attr(&e, b"Type").unwrap_or_default(),
                    target,
                    external: get_attr(&e, b"TargetMode").as_deref() == Some("External"),
                });
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::warn!("Malformed relationships part: {}", e);
                break;
            }
            _ => {}
        }
    }
    rels
}

/// Style id -> display name
fn parse_styles(xml: &str) -> HashMap<String, String> {
    let mut reader = Reader::from_str(xml);
    let mut styles = HashMap::new();
    let mut current_id: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"style" => {
                current_id = get_attr(&e, b"styleId");
            }
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"name" => {
                if let (Some(id), Some(name)) = (current_id.as_ref(), get_attr(&e, b"val")) {
                    styles.insert(id.clone(), name);
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"style" => {
                current_id = None;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::warn!("Malformed styles part: {}", e);
                break;
            }
            _ => {}
        }
    }
    styles
}

/// Walk state for `document.xml`
///
/// Paragraphs and runs nest through text boxes (`w:txbxContent`), so both
/// are stacks. An inner paragraph becomes its own block and the enclosing
/// one resumes when it closes.
#[derive(Default)]
struct BodyWalker {
    blocks: Vec<Block>,
    paragraphs: Vec<Paragraph>,
    runs: Vec<Run>,
    in_ppr: bool,
    in_rpr: bool,
    in_text: bool,
    table_depth: usize,
    table: Table,
    row: Vec<String>,
    cell: Vec<String>,
}

impl BodyWalker {
    fn open(&mut self, e: &BytesStart, styles: &HashMap<String, String>) {
        match e.local_name().as_ref() {
            b"tbl" => {
                self.table_depth += 1;
                if self.table_depth == 1 {
                    self.table = Table::default();
                }
            }
            b"tr" if self.table_depth == 1 => self.row.clear(),
            b"tc" if self.table_depth == 1 => self.cell.clear(),
            b"p" => self.paragraphs.push(Paragraph::default()),
            b"pPr" => self.in_ppr = true,
            b"r" => self.runs.push(Run::default()),
            b"rPr" => self.in_rpr = true,
            b"t" => self.in_text = true,
            _ => self.property(e, styles),
        }
    }

    /// Self-closing elements carry most run and paragraph properties
    fn property(&mut self, e: &BytesStart, styles: &HashMap<String, String>) {
        let name = e.local_name();
        let name = name.as_ref();

        if self.in_ppr && !self.in_rpr {
            let Some(paragraph) = self.paragraphs.last_mut() else {
                return;
            };
            match name {
                b"pStyle" => {
                    paragraph.style = get_attr(e, b"val").map(|id| styles.get(&id).cloned().unwrap_or(id));
                }
                b"jc" => paragraph.alignment = get_attr(e, b"val"),
                b"numPr" => paragraph.numbered = true,
                _ => {}
            }
            return;
        }

        let Some(run) = self.runs.last_mut() else {
            return;
        };

        if self.in_rpr {
            match name {
                b"b" => run.bold = toggle_on(e),
                b"i" => run.italic = toggle_on(e),
                b"u" => run.underline = toggle_on(e),
                b"color" => {
                    run.color = get_attr(e, b"val").filter(|v| !v.eq_ignore_ascii_case("auto"));
                }
                b"sz" => {
                    run.size_pt = get_attr(e, b"val")
                        .and_then(|v| v.parse::<f32>().ok())
                        .map(|half_points| half_points / 2.0);
                }
                b"rStyle" => {
                    run.style = get_attr(e, b"val").map(|id| styles.get(&id).cloned().unwrap_or(id));
                }
                _ => {}
            }
            return;
        }

        match name {
            b"tab" => run.text.push('\t'),
            b"br" | b"cr" => run.text.push('\n'),
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(run) = self.runs.last_mut() {
            run.text.push_str(text);
        }
    }

    fn close(&mut self, local_name: &[u8]) {
        match local_name {
            b"t" => self.in_text = false,
            b"rPr" => self.in_rpr = false,
            b"pPr" => self.in_ppr = false,
            b"r" => {
                if let (Some(run), Some(paragraph)) = (self.runs.pop(), self.paragraphs.last_mut()) {
                    if !run.text.is_empty() {
                        paragraph.runs.push(run);
                    }
                }
            }
            b"p" => {
                let Some(paragraph) = self.paragraphs.pop() else {
                    return;
                };
                if self.table_depth > 0 {
                    let text = paragraph.text();
                    if !text.trim().is_empty() {
                        self.cell.push(text);
                    }
                } else {
                    self.blocks.push(Block::Paragraph(paragraph));
                }
            }
            b"tc" if self.table_depth == 1 => {
                let text = self.cell.join("\n").trim().to_string();
                self.row.push(text);
            }
            b"tr" if self.table_depth == 1 => {
                let row = std::mem::take(&mut self.row);
                self.table.rows.push(row);
            }
            b"tbl" => {
                self.table_depth = self.table_depth.saturating_sub(1);
                if self.table_depth == 0 {
                    self.blocks.push(Block::Table(std::mem::take(&mut self.table)));
                }
            }
            _ => {}
        }
    }
}

fn parse_document(xml: &str, styles: &HashMap<String, String>) -> Result<Vec<Block>> {
    let mut reader = Reader::from_str(xml);
    let mut walker = BodyWalker::default();
    // Depth inside `mc:Fallback`, the legacy copy of an `mc:Choice`
    let mut fallback_depth = 0usize;

    loop {
        let event = reader.read_event();
        if fallback_depth > 0 {
            match event {
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"Fallback" => fallback_depth += 1,
                Ok(Event::End(e)) if e.local_name().as_ref() == b"Fallback" => fallback_depth -= 1,
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::strategy(
                        STRATEGY,
                        format!("Malformed document.xml at {}: {}", reader.buffer_position(), e),
                    ))
                }
                _ => {}
            }
            continue;
        }

        match event {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"Fallback" => fallback_depth = 1,
            Ok(Event::Start(e)) => walker.open(&e, styles),
            Ok(Event::Empty(e)) => {
                let local = e.local_name();
                match local.as_ref() {
                    // empty containers: nothing to collect
                    b"p" | b"r" | b"t" | b"tbl" | b"tr" | b"tc" | b"pPr" | b"rPr" => {}
                    _ => walker.property(&e, styles),
                }
            }
            Ok(Event::Text(t)) if walker.in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| Error::strategy(STRATEGY, format!("Bad text node: {}", e)))?;
                walker.push_text(&text);
            }
            Ok(Event::CData(t)) if walker.in_text => {
                walker.push_text(&String::from_utf8_lossy(&t));
            }
            Ok(Event::End(e)) => walker.close(e.local_name().as_ref()),
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::strategy(
                    STRATEGY,
                    format!("Malformed document.xml at {}: {}", reader.buffer_position(), e),
                ))
            }
            _ => {}
        }
    }

    Ok(walker.blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style>
  <w:style w:type="character" w:styleId="Strong"><w:name w:val="Strong"/></w:style>
</w:styles>"#;

    const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:pPr><w:pStyle w:val="Heading1"/><w:rPr><w:b/></w:rPr></w:pPr><w:r><w:t>Experience</w:t></w:r></w:p>
    <w:p><w:pPr><w:jc w:val="center"/></w:pPr>
      <w:r><w:rPr><w:b/><w:color w:val="FF0000"/><w:sz w:val="28"/></w:rPr><w:t xml:space="preserve">Lead &amp; </w:t></w:r>
      <w:r><w:rPr><w:i/><w:b w:val="0"/><w:u w:val="single"/></w:rPr><w:t>Engineer</w:t></w:r>
      <w:r><w:rPr><w:rStyle w:val="Strong"/></w:rPr><w:t>!</w:t></w:r>
    </w:p>
    <w:p/>
    <w:tbl>
      <w:tr><w:tc><w:p><w:r><w:t>Year</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Role</w:t></w:r></w:p></w:tc></w:tr>
      <w:tr><w:tc><w:p><w:r><w:t>2021</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Lead</w:t></w:r></w:p></w:tc></w:tr>
    </w:tbl>
  </w:body>
</w:document>"#;

    #[test]
    fn test_style_key() {
        assert_eq!(style_key("Heading 1"), "heading1");
        assert_eq!(style_key("heading 1"), "heading1");
        assert_eq!(style_key("List Paragraph"), "listparagraph");
    }

    #[test]
    fn test_parse_styles() {
        let styles = parse_styles(STYLES);
        assert_eq!(styles.get("Heading1").map(String::as_str), Some("heading 1"));
        assert_eq!(styles.get("Strong").map(String::as_str), Some("Strong"));
    }

    #[test]
    fn test_parse_document_blocks() {
        let blocks = parse_document(DOCUMENT, &parse_styles(STYLES)).unwrap();
        assert_eq!(blocks.len(), 3);

        let Block::Paragraph(heading) = &blocks[0] else { panic!("expected paragraph") };
        assert_eq!(heading.style.as_deref(), Some("heading 1"));
        assert_eq!(heading.text(), "Experience");
        // paragraph-mark formatting is not run formatting
        assert!(!heading.runs[0].bold);

        let Block::Paragraph(body) = &blocks[1] else { panic!("expected paragraph") };
        assert_eq!(body.alignment.as_deref(), Some("center"));
        assert_eq!(body.runs.len(), 3);
        assert_eq!(body.runs[0].text, "Lead & ");
        assert!(body.runs[0].bold);
        assert_eq!(body.runs[0].color.as_deref(), Some("FF0000"));
        assert_eq!(body.runs[0].size_pt, Some(14.0));
        assert!(body.runs[1].italic && body.runs[1].underline && !body.runs[1].bold);
        assert_eq!(body.runs[2].style.as_deref(), Some("Strong"));

        let Block::Table(table) = &blocks[2] else { panic!("expected table") };
        assert_eq!(table.rows, vec![vec!["Year", "Role"], vec!["2021", "Lead"]]);
    }

    #[test]
    fn test_text_box_paragraphs_keep_the_enclosing_paragraph() {
        let xml = r#"<w:document xmlns:w="w" xmlns:mc="mc" xmlns:wps="wps"><w:body>
<w:p>
  <w:r><w:t>Before</w:t></w:r>
  <w:r><mc:AlternateContent>
    <mc:Choice Requires="wps"><w:drawing><wps:txbx><w:txbxContent>
      <w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Inside</w:t></w:r></w:p>
    </w:txbxContent></wps:txbx></w:drawing></mc:Choice>
    <mc:Fallback><w:pict><v:textbox><w:txbxContent>
      <w:p><w:r><w:t>Inside</w:t></w:r></w:p>
    </w:txbxContent></v:textbox></w:pict></mc:Fallback>
  </mc:AlternateContent></w:r>
  <w:r><w:t xml:space="preserve"> After</w:t></w:r>
</w:p>
</w:body></w:document>"#;

        let blocks = parse_document(xml, &HashMap::new()).unwrap();
        let texts: Vec<String> = blocks
            .iter()
            .map(|b| match b {
                Block::Paragraph(p) => p.text(),
                Block::Table(_) => panic!("unexpected table"),
            })
            .collect();
        assert_eq!(texts, vec!["Inside", "Before After"]);

        let Block::Paragraph(inner) = &blocks[0] else { panic!("expected paragraph") };
        assert!(inner.runs[0].bold);
        let Block::Paragraph(outer) = &blocks[1] else { panic!("expected paragraph") };
        assert!(outer.runs.iter().all(|r| !r.bold));
    }

    #[test]
    fn test_resolve_part() {
        assert_eq!(resolve_part("media/image1.png"), "word/media/image1.png");
        assert_eq!(resolve_part("/word/media/image2.jpeg"), "word/media/image2.jpeg");
    }

    #[test]
    fn test_parse_relationships_flags_external() {
        let rels = parse_relationships(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
</Relationships>"#,
        );
        assert_eq!(rels.len(), 2);
        assert!(rels[0].rel_type.ends_with(IMAGE_REL_SUFFIX));
        assert!(rels[1].external);
    }
}
