//! Axum route handlers for the Evaluation API.

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderName, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::evaluation::evaluator::EvaluationRecord;
use crate::evaluation::pipeline::{
    run_rewrite, run_text_evaluation, run_upload_evaluation, ResumeUpload,
};
use crate::state::AppState;

pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const REWRITTEN_FILE_NAME: &str = "Rewritten_Resume.docx";
/// Characters of extracted resume text echoed back for preview.
const PREVIEW_CHARS: usize = 1500;

const X_ATS_SCORE: HeaderName = HeaderName::from_static("x-ats-score");
const X_REWRITE_BLOCKS: HeaderName = HeaderName::from_static("x-rewrite-blocks");
const X_REWRITE_FALLBACKS: HeaderName = HeaderName::from_static("x-rewrite-fallbacks");

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EvaluateTextRequest {
    pub resume_text: String,
    pub job_description: String,
}

#[derive(Debug, Serialize)]
pub struct EvaluationResponse {
    pub evaluation: EvaluationRecord,
    pub resume_preview: String,
    pub evaluated_at: DateTime<Utc>,
}

impl EvaluationResponse {
    fn new(evaluation: EvaluationRecord, resume_text: &str) -> Self {
        Self {
            evaluation,
            resume_preview: resume_text.chars().take(PREVIEW_CHARS).collect(),
            evaluated_at: Utc::now(),
        }
    }
}

/// Multipart form shared by the upload endpoints: `resume` (file) + `job_description` (text).
#[derive(Debug, Default)]
struct ResumeForm {
    resume: Option<ResumeUpload>,
    job_description: Option<String>,
}

async fn read_resume_form(mut multipart: Multipart) -> Result<ResumeForm, AppError> {
    let mut form = ResumeForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("resume") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Could not read resume: {e}")))?;
                form.resume = Some(ResumeUpload { file_name, data });
            }
            Some("job_description") => {
                let text = field.text().await.map_err(|e| {
                    AppError::Validation(format!("Could not read job_description: {e}"))
                })?;
                form.job_description = Some(text);
            }
            _ => {}
        }
    }

    Ok(form)
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/evaluate
///
/// Multipart upload (`.docx` or `.pdf`) scored against the job description.
pub async fn handle_evaluate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<EvaluationResponse>, AppError> {
    let form = read_resume_form(multipart).await?;

    let (evaluation, resume_text) = run_upload_evaluation(
        state.backend.as_ref(),
        form.resume.as_ref(),
        form.job_description.as_deref(),
    )
    .await?;

    Ok(Json(EvaluationResponse::new(evaluation, &resume_text)))
}

/// POST /api/v1/evaluate/text
///
/// Scores resume text that the caller has already extracted.
pub async fn handle_evaluate_text(
    State(state): State<AppState>,
    Json(request): Json<EvaluateTextRequest>,
) -> Result<Json<EvaluationResponse>, AppError> {
    let evaluation = run_text_evaluation(
        state.backend.as_ref(),
        &request.resume_text,
        &request.job_description,
    )
    .await?;

    Ok(Json(EvaluationResponse::new(evaluation, &request.resume_text)))
}

/// POST /api/v1/rewrite
///
/// Full pipeline: evaluate → rewrite each block → rebuild. Returns the `.docx` as an attachment;
/// the score and fallback counts travel in `X-Ats-Score`, `X-Rewrite-Blocks`, `X-Rewrite-Fallbacks`.
pub async fn handle_rewrite(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_resume_form(multipart).await?;

    let outcome = run_rewrite(
        state.backend.as_ref(),
        form.resume.as_ref(),
        form.job_description.as_deref(),
        state.config.rewrite_concurrency,
    )
    .await?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, DOCX_MIME.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{REWRITTEN_FILE_NAME}\""),
            ),
            (X_ATS_SCORE, outcome.evaluation.ats_score.to_string()),
            (X_REWRITE_BLOCKS, outcome.report.attempted.to_string()),
            (X_REWRITE_FALLBACKS, outcome.report.fallbacks.to_string()),
        ],
        outcome.document,
    )
        .into_response())
}
