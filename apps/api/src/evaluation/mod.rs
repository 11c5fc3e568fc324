// ATS evaluation and structure-preserving resume rewrite.
// Implements: evaluation stage, per-block rewrite stage, run orchestration, HTTP handlers.
// All LLM calls go through an injected llm_client::Backend; no direct API calls here.

pub mod evaluator;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod rewriter;
