//! Plain-text extraction for evaluation-only requests (`.docx` or `.pdf`).

use std::path::Path;

use super::{extract_structure, DocumentError};

/// Upload kinds accepted by the service, keyed off the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeFormat {
    Docx,
    Pdf,
}

impl ResumeFormat {
    pub fn from_file_name(file_name: &str) -> Result<Self, DocumentError> {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|v| v.to_str())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "docx" => Ok(ResumeFormat::Docx),
            "pdf" => Ok(ResumeFormat::Pdf),
            _ => Err(DocumentError::UnsupportedType(file_name.to_string())),
        }
    }
}

/// Returns the flattened text of a resume upload.
pub fn extract_resume_text(file_name: &str, data: &[u8]) -> Result<String, DocumentError> {
    match ResumeFormat::from_file_name(file_name)? {
        ResumeFormat::Docx => Ok(extract_structure(data)?.plain_text()),
        ResumeFormat::Pdf => {
            pdf_extract::extract_text_from_mem(data).map_err(|e| DocumentError::Pdf(e.to_string()))
        }
    }
}
