//! Structure Extractor: decomposes a `.docx` into its ordered body paragraphs.
//!
//! Every body-level `w:p` yields exactly one Block: no filtering, merging or reordering.
//! Paragraphs nested in tables or text boxes are not body paragraphs and are not emitted.

use std::io::{Cursor, Read, Seek};

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

use super::{Block, DocumentError, DocumentStructure, DEFAULT_STYLE};

pub(crate) const DOCUMENT_PART: &str = "word/document.xml";
pub(crate) const STYLES_PART: &str = "word/styles.xml";

const W_BODY: &[u8] = b"w:body";
const W_P: &[u8] = b"w:p";
const W_PPR: &[u8] = b"w:pPr";
const W_PSTYLE: &[u8] = b"w:pStyle";
const W_R: &[u8] = b"w:r";
const W_T: &[u8] = b"w:t";
const W_TAB: &[u8] = b"w:tab";
const W_BR: &[u8] = b"w:br";
const W_CR: &[u8] = b"w:cr";

/// Opens a `.docx` payload and returns its block sequence and style sheet.
pub fn extract_structure(data: &[u8]) -> Result<DocumentStructure, DocumentError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;

    let document_xml =
        read_part(&mut archive, DOCUMENT_PART)?.ok_or(DocumentError::MissingPart(DOCUMENT_PART))?;
    let blocks = parse_paragraphs(&document_xml)?;
    let styles = read_part(&mut archive, STYLES_PART)?;

    debug!(
        "Extracted {} blocks (style sheet present: {})",
        blocks.len(),
        styles.is_some()
    );

    Ok(DocumentStructure { blocks, styles })
}

fn read_part<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    name: &str,
) -> Result<Option<Vec<u8>>, DocumentError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(Some(bytes))
}

fn parse_paragraphs(xml: &[u8]) -> Result<Vec<Block>, DocumentError> {
    let mut reader = Reader::from_reader(xml);
    let mut walker = ParagraphWalker::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => walker.open(&e, false),
            Event::Empty(e) => walker.open(&e, true),
            Event::End(_) => walker.close(),
            Event::Text(e) => {
                if walker.in_body_text() {
                    let text = e
                        .xml_content()
                        .map_err(|err| DocumentError::Encoding(err.to_string()))?;
                    walker.push_text(&text);
                }
            }
            Event::GeneralRef(e) => {
                if walker.in_body_text() {
                    let resolved = match e
                        .resolve_char_ref()
                        .map_err(|err| DocumentError::Encoding(err.to_string()))?
                    {
                        Some(ch) => ch.to_string(),
                        None => {
                            let name = e
                                .decode()
                                .map_err(|err| DocumentError::Encoding(err.to_string()))?;
                            resolve_predefined_entity(&name)
                                .map(str::to_owned)
                                .unwrap_or_else(|| format!("&{name};"))
                        }
                    };
                    walker.push_text(&resolved);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(walker.blocks)
}

/// Tracks the element path while streaming `document.xml`.
#[derive(Default)]
struct ParagraphWalker {
    path: Vec<Vec<u8>>,
    blocks: Vec<Block>,
    current: Option<Block>,
}

impl ParagraphWalker {
    fn open(&mut self, e: &BytesStart<'_>, self_closing: bool) {
        let qname = e.name();
        let name = qname.as_ref();

        if name == W_P && self.at_body_level() {
            let block = Block::new(String::new(), DEFAULT_STYLE);
            if self_closing {
                self.blocks.push(block);
            } else {
                self.current = Some(block);
            }
        } else if name == W_PSTYLE && self.in_body_paragraph_props() {
            if let (Some(block), Some(style)) = (self.current.as_mut(), style_value(e)) {
                block.style = style;
            }
        } else if name == W_TAB && self.in_body_run() {
            self.push_text("\t");
        } else if (name == W_BR || name == W_CR) && self.in_body_run() {
            self.push_text("\n");
        }

        if !self_closing {
            self.path.push(name.to_vec());
        }
    }

    fn close(&mut self) {
        if let Some(name) = self.path.pop() {
            if name.as_slice() == W_P && self.at_body_level() {
                if let Some(block) = self.current.take() {
                    self.blocks.push(block);
                }
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(block) = self.current.as_mut() {
            block.text.push_str(text);
        }
    }

    fn last_is(&self, tag: &[u8]) -> bool {
        self.path.last().map(|n| n.as_slice() == tag).unwrap_or(false)
    }

    fn at_body_level(&self) -> bool {
        self.last_is(W_BODY)
    }

    /// True when the innermost open paragraph is a direct child of `w:body`.
    fn owned_by_body_paragraph(&self) -> bool {
        match self.path.iter().rposition(|n| n.as_slice() == W_P) {
            Some(i) if i > 0 => self.path[i - 1].as_slice() == W_BODY,
            _ => false,
        }
    }

    fn in_body_paragraph_props(&self) -> bool {
        let len = self.path.len();
        len >= 3
            && self.path[len - 1].as_slice() == W_PPR
            && self.path[len - 2].as_slice() == W_P
            && self.path[len - 3].as_slice() == W_BODY
    }

    fn in_body_run(&self) -> bool {
        self.last_is(W_R) && self.owned_by_body_paragraph()
    }

    fn in_body_text(&self) -> bool {
        self.last_is(W_T) && self.owned_by_body_paragraph()
    }
}

fn style_value(e: &BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"w:val")
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
        .filter(|style| !style.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::docx_fixture;

    fn document(body: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
        )
    }

    fn extract(body: &str) -> Vec<Block> {
        let data = docx_fixture(&document(body), None);
        extract_structure(&data).unwrap().blocks
    }

    #[test]
    fn test_extracts_text_and_styles_in_order() {
        let blocks = extract(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>John Doe</w:t></w:r></w:p>
<w:p/>
<w:p><w:r><w:t>Built 3 APIs</w:t></w:r></w:p>"#,
        );

        assert_eq!(
            blocks,
            vec![
                Block::new("John Doe", "Heading1"),
                Block::new("", "Normal"),
                Block::new("Built 3 APIs", "Normal"),
            ]
        );
    }

    #[test]
    fn test_empty_paragraphs_are_preserved() {
        let blocks = extract(r#"<w:p></w:p><w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr></w:p><w:p/>"#);
        assert_eq!(blocks.len(), 3);
        assert!(blocks.iter().all(|b| b.text.is_empty()));
        assert_eq!(blocks[1].style, "Title");
    }

    #[test]
    fn test_runs_are_concatenated_with_whitespace_kept() {
        let blocks = extract(
            r#"<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>Senior</w:t></w:r><w:r><w:t xml:space="preserve"> Engineer </w:t></w:r><w:hyperlink><w:r><w:t>at Acme</w:t></w:r></w:hyperlink></w:p>"#,
        );
        assert_eq!(blocks[0].text, "Senior Engineer at Acme");
    }

    #[test]
    fn test_entities_are_resolved() {
        let blocks = extract(r#"<w:p><w:r><w:t>R&amp;D &lt;team&gt; caf&#233;</w:t></w:r></w:p>"#);
        assert_eq!(blocks[0].text, "R&D <team> café");
    }

    #[test]
    fn test_tabs_and_breaks_become_control_characters() {
        let blocks = extract(
            r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>2019</w:t><w:tab/><w:t>Acme</w:t><w:br/><w:t>Remote</w:t></w:r></w:p>"#,
        );
        assert_eq!(blocks[0].text, "2019\tAcme\nRemote");
    }

    #[test]
    fn test_table_paragraphs_are_not_body_blocks() {
        let blocks = extract(
            r#"<w:p><w:r><w:t>Skills</w:t></w:r></w:p>
<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Rust</w:t></w:r></w:p></w:tc></w:tr></w:tbl>
<w:p><w:r><w:t>Experience</w:t></w:r></w:p>"#,
        );
        let texts: Vec<&str> = blocks.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Skills", "Experience"]);
    }

    #[test]
    fn test_text_box_content_is_not_merged_into_paragraph() {
        let blocks = extract(
            r#"<w:p><w:r><w:t>Summary</w:t></w:r><w:r><w:pict><w:txbxContent><w:p><w:pPr><w:pStyle w:val="Quote"/></w:pPr><w:r><w:t>sidebar</w:t></w:r></w:p></w:txbxContent></w:pict></w:r></w:p>"#,
        );
        assert_eq!(blocks, vec![Block::new("Summary", "Normal")]);
    }

    #[test]
    fn test_style_sheet_is_carried() {
        let styles = r#"<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"/>"#;
        let data = docx_fixture(&document("<w:p/>"), Some(styles));
        let structure = extract_structure(&data).unwrap();
        assert_eq!(structure.styles.as_deref(), Some(styles.as_bytes()));
    }

    #[test]
    fn test_non_zip_payload_is_format_error() {
        let err = extract_structure(b"%PDF-1.7 not a docx").unwrap_err();
        assert!(matches!(err, DocumentError::Archive(_)));
    }

    #[test]
    fn test_archive_without_document_part_is_format_error() {
        use std::io::Write;

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("readme.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"hello").unwrap();
        let data = zip.finish().unwrap().into_inner();

        let err = extract_structure(&data).unwrap_err();
        assert!(matches!(err, DocumentError::MissingPart(DOCUMENT_PART)));
    }

    #[test]
    fn test_truncated_xml_is_format_error() {
        let data = docx_fixture("<w:document><w:body><w:p><w:r><w:t>oops</w:r></w:body>", None);
        assert!(extract_structure(&data).is_err());
    }
}
