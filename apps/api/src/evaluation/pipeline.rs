//! Pipeline: orchestrates one evaluation or evaluate-and-rewrite run.
//!
//! Flow: validate inputs → extract_structure → evaluate_resume → rewrite_blocks →
//!       rebuild_document.
//!
//! All per-run state (blocks, evaluation, replacement pairs) lives on this call's stack and is
//! dropped once the response is produced. Missing inputs are rejected before any backend call.

use bytes::Bytes;
use tracing::{info, instrument};

use crate::document::text::ResumeFormat;
use crate::document::{
    extract_resume_text, extract_structure, rebuild_document, DocumentError,
};
use crate::errors::AppError;
use crate::evaluation::evaluator::{evaluate_resume, EvaluationRecord};
use crate::evaluation::rewriter::{rewrite_blocks, RewriteReport};
use crate::llm_client::Backend;

/// A resume file as received from the caller.
#[derive(Debug, Clone)]
pub struct ResumeUpload {
    pub file_name: String,
    pub data: Bytes,
}

/// Result of a full evaluate-and-rewrite run.
#[derive(Debug)]
pub struct RewriteOutcome {
    pub evaluation: EvaluationRecord,
    pub report: RewriteReport,
    /// The rewritten `.docx` bytes.
    pub document: Vec<u8>,
}

fn require_text(field: &str, value: Option<&str>) -> Result<(), AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(AppError::MissingInput(format!("{field} cannot be empty"))),
    }
}

fn require_upload(upload: Option<&ResumeUpload>) -> Result<&ResumeUpload, AppError> {
    upload
        .filter(|u| !u.data.is_empty())
        .ok_or_else(|| AppError::MissingInput("resume file is required".to_string()))
}

/// Scores already-extracted resume text.
#[instrument(skip_all, fields(run_id = %uuid::Uuid::new_v4()))]
pub async fn run_text_evaluation(
    backend: &dyn Backend,
    resume_text: &str,
    job_description: &str,
) -> Result<EvaluationRecord, AppError> {
    require_text("resume_text", Some(resume_text))?;
    require_text("job_description", Some(job_description))?;

    info!("Evaluating {} characters of resume text", resume_text.len());
    evaluate_resume(backend, resume_text, job_description).await
}

/// Extracts text from a `.docx`/`.pdf` upload and scores it. Returns the record and the text.
#[instrument(skip_all, fields(run_id = %uuid::Uuid::new_v4()))]
pub async fn run_upload_evaluation(
    backend: &dyn Backend,
    upload: Option<&ResumeUpload>,
    job_description: Option<&str>,
) -> Result<(EvaluationRecord, String), AppError> {
    let upload = require_upload(upload)?;
    require_text("job_description", job_description)?;
    let job_description = job_description.unwrap_or_default();

    let resume_text = extract_resume_text(&upload.file_name, &upload.data)?;
    require_text("resume text", Some(resume_text.as_str()))?;

    info!(
        "Evaluating upload '{}' ({} bytes)",
        upload.file_name,
        upload.data.len()
    );
    let record = evaluate_resume(backend, &resume_text, job_description).await?;
    Ok((record, resume_text))
}

/// Full run: evaluate the resume, rewrite each block, and rebuild the `.docx`.
///
/// An evaluation failure aborts before any block is rewritten; block failures never abort.
#[instrument(skip_all, fields(run_id = %uuid::Uuid::new_v4()))]
pub async fn run_rewrite(
    backend: &dyn Backend,
    upload: Option<&ResumeUpload>,
    job_description: Option<&str>,
    concurrency: usize,
) -> Result<RewriteOutcome, AppError> {
    let upload = require_upload(upload)?;
    require_text("job_description", job_description)?;
    let job_description = job_description.unwrap_or_default();

    if ResumeFormat::from_file_name(&upload.file_name)? != ResumeFormat::Docx {
        return Err(DocumentError::UnsupportedType(format!(
            "{} (rewriting requires a .docx resume)",
            upload.file_name
        ))
        .into());
    }

    let structure = extract_structure(&upload.data)?;
    let resume_text = structure.plain_text();
    require_text("resume text", Some(resume_text.as_str()))?;
    info!(
        "Extracted {} blocks from '{}'",
        structure.blocks.len(),
        upload.file_name
    );

    let evaluation = evaluate_resume(backend, &resume_text, job_description).await?;

    let report = rewrite_blocks(
        backend,
        &structure.blocks,
        job_description,
        &evaluation,
        concurrency,
    )
    .await?;

    let document = rebuild_document(&structure, &report.pairs).map_err(|e| {
        AppError::Internal(anyhow::Error::new(e).context("Failed to write rewritten document"))
    })?;

    info!(
        "Rewrite run complete: ats_score={}, blocks={}, fallbacks={}, output_bytes={}",
        evaluation.ats_score,
        structure.blocks.len(),
        report.fallbacks,
        document.len()
    );

    Ok(RewriteOutcome {
        evaluation,
        report,
        document,
    })
}
