//! Reads the text of Word `.docx` feedback sheets.
//!
//! Only `word/document.xml` is consulted. Body paragraphs and table cells are
//! kept apart so the extractor can look for labelled cells such as
//! `Student Name: ...` on sheets whose filename carries no name.

use crate::error::DocxError;
use roxmltree::{Document, Node};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::result::ZipError;
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";

const NAME_LABELS: &[&str] = &["Student Name:", "Student:", "Name:"];
const TOPIC_LABELS: &[&str] = &["Topic:", "Motion:"];
const COMMENT_MARKERS: &[&str] = &["BEST thing", "NEEDS IMPROVEMENT", "Teacher comments:"];
const LONG_COMMENT_CHARS: usize = 50;

/// Anything that can turn a path into document content.
pub trait DocumentSource {
    fn read(&self, path: &Path) -> Result<DocxContent, DocxError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocxContent {
    pub paragraphs: Vec<String>,
    /// tables -> rows -> non-empty cell texts
    pub tables: Vec<Vec<Vec<String>>>,
}

impl DocxContent {
    pub fn cells(&self) -> impl Iterator<Item = &str> {
        self.tables
            .iter()
            .flat_map(|table| table.iter())
            .flat_map(|row| row.iter())
            .map(String::as_str)
    }

    /// Paragraphs followed by table cells, one per line.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(String::as_str)
            .chain(self.cells())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The first labelled cell with a value wins, in document order.
    pub fn labeled_student_name(&self) -> Option<String> {
        self.cells().find_map(|cell| {
            let label = NAME_LABELS.iter().find(|label| cell.starts_with(*label))?;
            let name = cell[label.len()..].trim();
            (!name.is_empty()).then(|| name.to_string())
        })
    }

    pub fn topic(&self) -> Option<String> {
        self.cells().find_map(|cell| {
            let label = TOPIC_LABELS.iter().find(|label| cell.contains(*label))?;
            let start = cell.find(label)? + label.len();
            let topic = cell[start..].trim();
            (!topic.is_empty()).then(|| topic.to_string())
        })
    }

    /// Cells that read like teacher comments rather than form labels.
    pub fn feedback_comments(&self) -> Vec<String> {
        self.cells()
            .filter(|cell| {
                COMMENT_MARKERS.iter().any(|marker| cell.contains(marker))
                    || cell.chars().count() > LONG_COMMENT_CHARS
            })
            .map(str::to_string)
            .collect()
    }
}

pub struct DocxReader {
    include_tables: bool,
}

impl DocxReader {
    pub fn new(include_tables: bool) -> Self {
        Self { include_tables }
    }

    fn parse_document_xml(&self, xml: &str) -> Result<DocxContent, DocxError> {
        let doc = Document::parse(xml)?;
        let mut content = DocxContent::default();

        let Some(body) = doc
            .root_element()
            .children()
            .find(|n| n.tag_name().name() == "body")
        else {
            return Ok(content);
        };

        for node in body.children().filter(Node::is_element) {
            match node.tag_name().name() {
                "p" => {
                    let text = paragraph_text(&node);
                    let text = text.trim();
                    if !text.is_empty() {
                        content.paragraphs.push(text.to_string());
                    }
                }
                "tbl" if self.include_tables => {
                    let table = table_rows(&node);
                    if !table.is_empty() {
                        content.tables.push(table);
                    }
                }
                _ => {}
            }
        }

        Ok(content)
    }
}

impl DocumentSource for DocxReader {
    fn read(&self, path: &Path) -> Result<DocxContent, DocxError> {
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)?;

        let mut xml = String::new();
        match archive.by_name(DOCUMENT_PART) {
            Ok(mut part) => {
                part.read_to_string(&mut xml)?;
            }
            Err(ZipError::FileNotFound) => return Err(DocxError::MissingPart(DOCUMENT_PART)),
            Err(e) => return Err(e.into()),
        }

        self.parse_document_xml(&xml)
    }
}

fn paragraph_text(para: &Node) -> String {
    let mut text = String::new();
    for node in para.descendants().filter(Node::is_element) {
        match node.tag_name().name() {
            "t" => text.push_str(node.text().unwrap_or("")),
            "tab" => text.push('\t'),
            "br" | "cr" => text.push('\n'),
            _ => {}
        }
    }
    text
}

fn table_rows(tbl: &Node) -> Vec<Vec<String>> {
    tbl.children()
        .filter(|n| n.tag_name().name() == "tr")
        .filter_map(|tr| {
            let cells: Vec<String> = tr
                .children()
                .filter(|n| n.tag_name().name() == "tc")
                .map(|tc| cell_text(&tc))
                .filter(|text| !text.is_empty())
                .collect();
            (!cells.is_empty()).then_some(cells)
        })
        .collect()
}

fn cell_text(tc: &Node) -> String {
    tc.children()
        .filter(|n| n.tag_name().name() == "p")
        .map(|p| paragraph_text(&p))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
