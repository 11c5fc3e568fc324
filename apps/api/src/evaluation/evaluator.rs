//! Evaluation Stage: one backend call scoring the full resume against a job description.
//!
//! Any invocation or parse failure here is terminal for the run: no rewrite is attempted.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::evaluation::prompts::{scoring_rules, EVALUATION_PROMPT_TEMPLATE, EVALUATION_SYSTEM};
use crate::llm_client::prompts::{render, JSON_ONLY_INSTRUCTION};
use crate::llm_client::sanitize::parse_json_output;
use crate::llm_client::Backend;

/// Structured score and feedback produced by the evaluation stage. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    /// 0 – 100, as computed by the model.
    #[serde(deserialize_with = "deserialize_ats_score")]
    pub ats_score: u8,
    pub match_summary: String,
    #[serde(default)]
    pub missing_keywords: Vec<String>,
    #[serde(default)]
    pub missing_skills: Vec<String>,
    #[serde(default)]
    pub experience_gaps: Vec<String>,
    #[serde(default)]
    pub improvement_suggestions: Vec<String>,
    #[serde(default, alias = "sections_to_add_or_fix")]
    pub sections_to_update: Vec<String>,
}

/// Accepts integer or float scores (floats rounded), rejecting anything outside 0 – 100.
fn deserialize_ats_score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    let rounded = raw.round();
    if !rounded.is_finite() || !(0.0..=100.0).contains(&rounded) {
        return Err(serde::de::Error::custom(format!(
            "ats_score {raw} is outside 0-100"
        )));
    }
    Ok(rounded as u8)
}

pub fn build_evaluation_prompt(resume_text: &str, job_description: &str) -> String {
    let rules = scoring_rules();
    render(
        EVALUATION_PROMPT_TEMPLATE,
        &[
            ("json_only_instruction", JSON_ONLY_INSTRUCTION),
            ("scoring_rules", rules.as_str()),
            ("resume_text", resume_text),
            ("job_description", job_description),
        ],
    )
}

/// Sanitizes and parses a raw evaluation response, keeping the raw text on failure.
pub fn parse_evaluation(raw: &str) -> Result<EvaluationRecord, AppError> {
    parse_json_output::<EvaluationRecord>(raw).map_err(|e| AppError::EvaluationParse {
        reason: e.to_string(),
        raw_output: raw.to_string(),
    })
}

/// Scores the resume. One backend invocation, no retries at this layer.
pub async fn evaluate_resume(
    backend: &dyn Backend,
    resume_text: &str,
    job_description: &str,
) -> Result<EvaluationRecord, AppError> {
    let prompt = build_evaluation_prompt(resume_text, job_description);

    let raw = backend
        .invoke(&prompt, EVALUATION_SYSTEM)
        .await
        .map_err(|e| AppError::Llm(format!("Evaluation call failed: {e}")))?;

    let record = parse_evaluation(&raw)?;
    info!(
        "Evaluation complete: ats_score={}, missing_keywords={}",
        record.ats_score,
        record.missing_keywords.len()
    );
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedBackend;

    const FULL_RESPONSE: &str = r#"{
        "ats_score": 68,
        "match_summary": "Solid backend experience; lacks Kubernetes exposure.",
        "missing_keywords": ["Kubernetes", "gRPC"],
        "missing_skills": ["Helm"],
        "experience_gaps": ["No on-call ownership"],
        "improvement_suggestions": ["Quantify API throughput"],
        "sections_to_update": ["Experience", "Skills"]
    }"#;

    #[test]
    fn test_full_record_deserializes() {
        let record = parse_evaluation(FULL_RESPONSE).unwrap();
        assert_eq!(record.ats_score, 68);
        assert_eq!(record.missing_keywords, vec!["Kubernetes", "gRPC"]);
        assert_eq!(record.sections_to_update.len(), 2);
    }

    #[test]
    fn test_fenced_record_with_commentary_parses() {
        let raw = format!("Here is my evaluation:\n```json\n{FULL_RESPONSE}\n```\nHope it helps!");
        assert_eq!(parse_evaluation(&raw).unwrap().ats_score, 68);
    }

    #[test]
    fn test_float_score_is_rounded() {
        let record =
            parse_evaluation(r#"{"ats_score": 72.6, "match_summary": "ok"}"#).unwrap();
        assert_eq!(record.ats_score, 73);
    }

    #[test]
    fn test_out_of_range_score_is_rejected() {
        let err = parse_evaluation(r#"{"ats_score": 140, "match_summary": "ok"}"#).unwrap_err();
        assert!(matches!(err, AppError::EvaluationParse { .. }));
    }

    #[test]
    fn test_missing_lists_default_to_empty() {
        let record = parse_evaluation(r#"{"ats_score": 50, "match_summary": "ok"}"#).unwrap();
        assert!(record.missing_keywords.is_empty());
        assert!(record.improvement_suggestions.is_empty());
    }

    #[test]
    fn test_sections_to_add_or_fix_alias() {
        let record = parse_evaluation(
            r#"{"ats_score": 50, "match_summary": "ok", "sections_to_add_or_fix": ["Summary"]}"#,
        )
        .unwrap();
        assert_eq!(record.sections_to_update, vec!["Summary"]);
    }

    #[test]
    fn test_missing_required_field_keeps_raw_output() {
        let raw = r#"{"match_summary": "no score here"}"#;
        match parse_evaluation(raw).unwrap_err() {
            AppError::EvaluationParse { raw_output, .. } => assert_eq!(raw_output, raw),
            other => panic!("expected EvaluationParse, got {other:?}"),
        }
    }

    #[test]
    fn test_prompt_embeds_rubric_resume_and_jd() {
        let prompt = build_evaluation_prompt("Jane Smith\nRust engineer", "Need Kafka experience");
        assert!(prompt.contains("Keyword Match (40%)"));
        assert!(prompt.contains("--- RESUME ---\nJane Smith\nRust engineer"));
        assert!(prompt.contains("--- JOB DESCRIPTION ---\nNeed Kafka experience"));
        assert!(prompt.contains("\"sections_to_update\": []"));
    }

    #[tokio::test]
    async fn test_evaluate_resume_invokes_backend_once() {
        let backend = ScriptedBackend::fixed(FULL_RESPONSE);
        let record = evaluate_resume(&backend, "resume", "jd").await.unwrap();
        assert_eq!(record.ats_score, 68);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_backend_failure_is_llm_error() {
        let backend = ScriptedBackend::failing();
        let err = evaluate_resume(&backend, "resume", "jd").await.unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
    }

    #[tokio::test]
    async fn test_prose_response_is_evaluation_parse_error() {
        let backend = ScriptedBackend::fixed("I'm sorry, I can't score this resume.");
        let err = evaluate_resume(&backend, "resume", "jd").await.unwrap_err();
        match err {
            AppError::EvaluationParse { raw_output, .. } => {
                assert_eq!(raw_output, "I'm sorry, I can't score this resume.")
            }
            other => panic!("expected EvaluationParse, got {other:?}"),
        }
    }
}
