// All LLM prompt constants for the evaluation and rewrite stages.
// Reuses cross-cutting fragments from llm_client::prompts.

/// One weighted component of the ATS score.
#[derive(Debug, Clone, Copy)]
pub struct RubricComponent {
    pub name: &'static str,
    pub weight: u32,
    pub guidance: &'static str,
}

/// Fixed business rule: the four weighted components of the ATS score (sum = 100).
/// Advisory input to the model; the score itself is never recomputed locally.
pub const SCORING_RUBRIC: [RubricComponent; 4] = [
    RubricComponent {
        name: "Keyword Match",
        weight: 40,
        guidance: "Count required job-description keywords present in the resume. \
            Score = (matched_keywords / total_keywords) * 40",
    },
    RubricComponent {
        name: "Skills Match",
        weight: 20,
        guidance: "Count job-description skills mentioned in the resume. \
            Score = (matched_skills / total_skills) * 20",
    },
    RubricComponent {
        name: "Experience Alignment",
        weight: 25,
        guidance: "Rate 0-25 on how well the job-description responsibilities are reflected.",
    },
    RubricComponent {
        name: "Resume Structure",
        weight: 15,
        guidance: "Formatting clarity, section organization, bullet points, action verbs.",
    },
];

/// Renders the rubric as numbered prompt text.
pub fn scoring_rules() -> String {
    let mut rules = String::from("Calculate the ATS score as a weighted sum:\n\n");
    for (i, component) in SCORING_RUBRIC.iter().enumerate() {
        rules.push_str(&format!(
            "{}. {} ({}%)\n   - {}\n",
            i + 1,
            component.name,
            component.weight,
            component.guidance
        ));
    }
    rules.push_str("\nFinal ATS score = sum of all four components. Round to the nearest integer.");
    rules
}

/// System prompt for ATS evaluation.
pub const EVALUATION_SYSTEM: &str = "You are an expert ATS (applicant tracking system) evaluator. \
    You evaluate resumes against job descriptions for ATS scoring. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Evaluation prompt template.
/// Replace: {json_only_instruction}, {scoring_rules}, {resume_text}, {job_description}
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"Evaluate the resume below against the job description.

{json_only_instruction}

You MUST compute the ATS score strictly based on these scoring rules:
{scoring_rules}

Return a JSON object with this EXACT schema (no extra fields):
{
  "ats_score": 0,
  "match_summary": "",
  "missing_keywords": [],
  "missing_skills": [],
  "experience_gaps": [],
  "improvement_suggestions": [],
  "sections_to_update": []
}

--- RESUME ---
{resume_text}

--- JOB DESCRIPTION ---
{job_description}"#;

/// System prompt for per-block rewriting.
pub const REWRITE_SYSTEM: &str = "You are a resume rewriting engine. \
    Rewrite resume content precisely and concisely. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Per-block rewrite prompt template.
/// Replace: {no_fabrication_instruction}, {json_only_instruction}, {block_text},
///          {job_description}, {evaluation_json}
pub const REWRITE_PROMPT_TEMPLATE: &str = r#"Rewrite ONLY the following block of resume text to align with the job description and the ATS evaluation.

{no_fabrication_instruction}

Keep approximately the same length and a similar line structure.
If the block needs no change, return it unchanged.

{json_only_instruction}

Return a JSON object with this EXACT schema:
{
  "original": "<the original block, verbatim>",
  "updated": "<the rewritten block>"
}

--- ORIGINAL BLOCK ---
{block_text}

--- JOB DESCRIPTION ---
{job_description}

--- EVALUATION JSON ---
{evaluation_json}"#;
