//! Block Rewrite Stage: one backend call per non-blank block, dispatched with bounded concurrency.
//!
//! Failures are local: a block whose call fails or whose response does not parse falls back to
//! an identity pair and the stage moves on. Blank blocks are skipped entirely.

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::document::{Block, ReplacementPair};
use crate::errors::AppError;
use crate::evaluation::evaluator::EvaluationRecord;
use crate::evaluation::prompts::{REWRITE_PROMPT_TEMPLATE, REWRITE_SYSTEM};
use crate::llm_client::prompts::{render, JSON_ONLY_INSTRUCTION, NO_FABRICATION_INSTRUCTION};
use crate::llm_client::sanitize::parse_json_output;
use crate::llm_client::{Backend, LlmError};

/// Why a single block kept its original text.
#[derive(Debug, Error)]
pub enum BlockRewriteError {
    #[error("backend call failed: {0}")]
    Backend(#[from] LlmError),

    #[error("unparseable rewrite response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("rewrite response had blank `updated` text")]
    Blank,
}

/// Expected per-block response shape.
#[derive(Debug, Deserialize)]
struct RewriteResponse {
    // Required for the response to count as well-formed; the block's own text is authoritative.
    #[allow(dead_code)]
    original: String,
    updated: String,
}

/// Output of the rewrite stage: one pair per non-blank block, ordered by block index.
#[derive(Debug, Clone, Default)]
pub struct RewriteReport {
    pub pairs: Vec<ReplacementPair>,
    /// Number of blocks sent to the backend.
    pub attempted: usize,
    /// Number of blocks that fell back to their original text.
    pub fallbacks: usize,
}

impl RewriteReport {
    pub fn fallback_ratio(&self) -> f64 {
        if self.attempted == 0 {
            0.0
        } else {
            self.fallbacks as f64 / self.attempted as f64
        }
    }

    /// True when blocks were attempted and none of them produced a rewrite.
    pub fn all_fell_back(&self) -> bool {
        self.attempted > 0 && self.fallbacks == self.attempted
    }

    pub fn changed_blocks(&self) -> usize {
        self.pairs.iter().filter(|p| !p.is_identity()).count()
    }
}

pub fn build_rewrite_prompt(block_text: &str, job_description: &str, evaluation_json: &str) -> String {
    render(
        REWRITE_PROMPT_TEMPLATE,
        &[
            ("no_fabrication_instruction", NO_FABRICATION_INSTRUCTION),
            ("json_only_instruction", JSON_ONLY_INSTRUCTION),
            ("block_text", block_text),
            ("job_description", job_description),
            ("evaluation_json", evaluation_json),
        ],
    )
}

async fn rewrite_block(
    backend: &dyn Backend,
    block_text: &str,
    job_description: &str,
    evaluation_json: &str,
) -> Result<String, BlockRewriteError> {
    let prompt = build_rewrite_prompt(block_text, job_description, evaluation_json);
    let raw = backend.invoke(&prompt, REWRITE_SYSTEM).await?;
    let response: RewriteResponse = parse_json_output(&raw)?;

    if response.updated.trim().is_empty() {
        return Err(BlockRewriteError::Blank);
    }
    Ok(response.updated)
}

/// Rewrites every non-blank block, at most `concurrency` backend calls in flight.
pub async fn rewrite_blocks(
    backend: &dyn Backend,
    blocks: &[Block],
    job_description: &str,
    evaluation: &EvaluationRecord,
    concurrency: usize,
) -> Result<RewriteReport, AppError> {
    let evaluation_json = serde_json::to_string(evaluation)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize evaluation: {e}")))?;
    let evaluation_json = evaluation_json.as_str();

    // Built eagerly so the returned future stays `Send` for the router.
    let requests: Vec<_> = blocks
        .iter()
        .enumerate()
        .filter(|(_, block)| !block.is_blank())
        .map(|(index, block)| async move {
            match rewrite_block(backend, &block.text, job_description, evaluation_json).await {
                Ok(updated) => (
                    ReplacementPair {
                        block_index: index,
                        original: block.text.clone(),
                        updated,
                    },
                    false,
                ),
                Err(e) => {
                    warn!("Block {index} kept its original text: {e}");
                    (ReplacementPair::identity(index, &block.text), true)
                }
            }
        })
        .collect();

    let outcomes: Vec<(ReplacementPair, bool)> = stream::iter(requests)
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let attempted = outcomes.len();
    let fallbacks = outcomes.iter().filter(|(_, fell_back)| *fell_back).count();
    let mut pairs: Vec<ReplacementPair> = outcomes.into_iter().map(|(pair, _)| pair).collect();
    pairs.sort_by_key(|p| p.block_index);

    let report = RewriteReport {
        pairs,
        attempted,
        fallbacks,
    };

    if report.all_fell_back() {
        warn!(
            "Every rewrite attempt fell back ({} of {} blocks); output document is unchanged",
            report.fallbacks, report.attempted
        );
    } else {
        info!(
            "Rewrite complete: {} blocks attempted, {} changed, {} fell back ({:.0}%)",
            report.attempted,
            report.changed_blocks(),
            report.fallbacks,
            report.fallback_ratio() * 100.0
        );
    }

    Ok(report)
}
