//! Document structure: paragraph-level decomposition and reassembly of `.docx` resumes.
//!
//! Flow: extract_structure → (blocks drive the rewrite) → rebuild_document.
//! Block order and style never change between the two ends; only text may.

pub mod extractor;
pub mod rebuilder;
pub mod text;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use extractor::extract_structure;
pub use rebuilder::rebuild_document;
pub use text::extract_resume_text;

/// Style applied to paragraphs that carry no explicit `w:pStyle`.
pub const DEFAULT_STYLE: &str = "Normal";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("not a readable .docx archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("malformed document XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document is missing required part '{0}'")]
    MissingPart(&'static str),

    #[error("text encoding error: {0}")]
    Encoding(String),

    #[error("PDF text extraction failed: {0}")]
    Pdf(String),

    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
}

/// One paragraph-equivalent unit of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub text: String,
    pub style: String,
}

impl Block {
    pub fn new(text: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            style: style.into(),
        }
    }

    /// Whitespace-only blocks are carried through untouched and never sent for rewriting.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Rewrite of one block, keyed by its position in the source sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementPair {
    pub block_index: usize,
    pub original: String,
    pub updated: String,
}

impl ReplacementPair {
    /// Identity pair used when a block's rewrite fails.
    pub fn identity(block_index: usize, text: &str) -> Self {
        Self {
            block_index,
            original: text.to_string(),
            updated: text.to_string(),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.original == self.updated
    }
}

/// The ordered block sequence of a source document plus its style sheet.
#[derive(Debug, Clone, Default)]
pub struct DocumentStructure {
    pub blocks: Vec<Block>,
    /// Raw `word/styles.xml` of the source, reused verbatim on rebuild.
    pub styles: Option<Vec<u8>>,
}

impl DocumentStructure {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            styles: None,
        }
    }

    /// Flattened resume text, one line per block.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Builds a minimal `.docx` archive around a `word/document.xml` body for tests.
#[cfg(test)]
pub(crate) fn docx_fixture(document_xml: &str, styles_xml: Option<&str>) -> Vec<u8> {
    use std::io::{Cursor, Write};

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(document_xml.as_bytes()).unwrap();
    if let Some(styles) = styles_xml {
        zip.start_file("word/styles.xml", options).unwrap();
        zip.write_all(styles.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_block_detection() {
        assert!(Block::new("", DEFAULT_STYLE).is_blank());
        assert!(Block::new("  \t\n", DEFAULT_STYLE).is_blank());
        assert!(!Block::new("Built 3 APIs", DEFAULT_STYLE).is_blank());
    }

    #[test]
    fn test_plain_text_joins_blocks_with_newlines() {
        let structure = DocumentStructure::new(vec![
            Block::new("John Doe", "Heading1"),
            Block::new("", DEFAULT_STYLE),
            Block::new("Built 3 APIs", DEFAULT_STYLE),
        ]);
        assert_eq!(structure.plain_text(), "John Doe\n\nBuilt 3 APIs");
    }
}
