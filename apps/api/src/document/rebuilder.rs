//! Document Rebuilder: replays the source block sequence into a fresh `.docx` package.
//!
//! Replacements are keyed by block position, so two blocks with identical text each get
//! their own rewrite. The source document is never written to.

use std::collections::{BTreeSet, HashMap};
use std::io::{Cursor, Write};

use quick_xml::escape::escape;
use tracing::warn;
use zip::write::SimpleFileOptions;

use super::extractor::{DOCUMENT_PART, STYLES_PART};
use super::{Block, DocumentError, DocumentStructure, ReplacementPair, DEFAULT_STYLE};

const WORDML_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

const DOCUMENT_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

/// Resolves the final text of every block: the pair's `updated` text at its index, else the original.
pub fn resolve_blocks(blocks: &[Block], pairs: &[ReplacementPair]) -> Vec<Block> {
    let mut updates: HashMap<usize, &str> = HashMap::with_capacity(pairs.len());
    for pair in pairs {
        match blocks.get(pair.block_index) {
            Some(block) if block.text == pair.original => {
                updates.insert(pair.block_index, pair.updated.as_str());
            }
            _ => warn!(
                "Ignoring replacement for block {}: original text does not match the source",
                pair.block_index
            ),
        }
    }

    blocks
        .iter()
        .enumerate()
        .map(|(index, block)| Block {
            text: updates
                .get(&index)
                .map(|s| s.to_string())
                .unwrap_or_else(|| block.text.clone()),
            style: block.style.clone(),
        })
        .collect()
}

/// Builds the rewritten `.docx` bytes: one paragraph per source block, original style reapplied.
pub fn rebuild_document(
    structure: &DocumentStructure,
    pairs: &[ReplacementPair],
) -> Result<Vec<u8>, DocumentError> {
    let blocks = resolve_blocks(&structure.blocks, pairs);

    let document_xml = render_document_xml(&blocks);
    let styles_xml = match &structure.styles {
        Some(styles) => styles.clone(),
        None => render_minimal_styles(&blocks).into_bytes(),
    };

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    for (name, bytes) in [
        ("[Content_Types].xml", CONTENT_TYPES_XML.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS_XML.as_bytes()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS_XML.as_bytes()),
        (DOCUMENT_PART, document_xml.as_bytes()),
        (STYLES_PART, styles_xml.as_slice()),
    ] {
        zip.start_file(name, options)?;
        zip.write_all(bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}

fn render_document_xml(blocks: &[Block]) -> String {
    let mut xml = String::with_capacity(256 + blocks.len() * 128);
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    xml.push_str(&format!(r#"<w:document xmlns:w="{WORDML_NS}"><w:body>"#));

    for block in blocks {
        xml.push_str(&format!(
            r#"<w:p><w:pPr><w:pStyle w:val="{}"/></w:pPr>"#,
            escape(block.style.as_str())
        ));
        if !block.text.is_empty() {
            xml.push_str("<w:r>");
            push_run_content(&mut xml, &block.text);
            xml.push_str("</w:r>");
        }
        xml.push_str("</w:p>");
    }

    xml.push_str("<w:sectPr/></w:body></w:document>");
    xml
}

/// Writes text as `w:t` segments, turning `\t` and `\n` back into `w:tab` and `w:br`.
///
/// Vertical tab and form feed become `w:br`; any other character XML 1.0 forbids is dropped.
fn push_run_content(xml: &mut String, text: &str) {
    fn flush(xml: &mut String, segment: &mut String) {
        if !segment.is_empty() {
            xml.push_str(&format!(
                r#"<w:t xml:space="preserve">{}</w:t>"#,
                escape(segment.as_str())
            ));
            segment.clear();
        }
    }

    let mut segment = String::new();

    for ch in text.chars() {
        match ch {
            '\t' => {
                flush(xml, &mut segment);
                xml.push_str("<w:tab/>");
            }
            '\n' | '\u{0B}' | '\u{0C}' => {
                flush(xml, &mut segment);
                xml.push_str("<w:br/>");
            }
            '\r' => {}
            c if is_xml_char(c) => segment.push(c),
            _ => {}
        }
    }
    flush(xml, &mut segment);
}

/// XML 1.0 `Char` production; `char` already excludes surrogates.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Style sheet used when the source carried none: `Normal` plus every style id in use.
fn render_minimal_styles(blocks: &[Block]) -> String {
    let used: BTreeSet<&str> = blocks
        .iter()
        .map(|b| b.style.as_str())
        .filter(|s| *s != DEFAULT_STYLE)
        .collect();

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push('\n');
    xml.push_str(&format!(r#"<w:styles xmlns:w="{WORDML_NS}">"#));
    xml.push_str(&format!(
        r#"<w:style w:type="paragraph" w:default="1" w:styleId="{DEFAULT_STYLE}"><w:name w:val="{DEFAULT_STYLE}"/></w:style>"#
    ));
    for style in used {
        let style = escape(style);
        xml.push_str(&format!(
            r#"<w:style w:type="paragraph" w:styleId="{style}"><w:name w:val="{style}"/><w:basedOn w:val="{DEFAULT_STYLE}"/></w:style>"#
        ));
    }
    xml.push_str("</w:styles>");
    xml
}
