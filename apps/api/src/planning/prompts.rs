// All LLM prompt constants for the Planning module.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::JSON_ONLY_SYSTEM;

/// System prompt for search planning.
pub fn planning_system() -> String {
    format!(
        "You are an experienced technical recruiter who knows how each job board \
        indexes listings and which phrasing finds the best matches on it. {JSON_ONLY_SYSTEM}"
    )
}

/// Planning prompt template. Replace `{title}`, `{keywords}` and `{providers}` before sending.
pub const PLANNING_PROMPT_TEMPLATE: &str = r#"Plan job board searches for one career path.

Career path: {title}
Keywords (most important first): {keywords}

Available job boards:
{providers}

Board characteristics:
- jsearch: modern tech roles, startups, remote work. Prefers natural phrases
  such as "Software Engineer Python" or "Machine Learning Developer".
- adzuna: broad industry coverage, traditional companies. Works better with
  simple terms such as "Software Engineer" or "Data Analyst".
- usajobs: government and federal positions. Uses formal titles such as
  "Computer Scientist" or "Information Technology Specialist".

Return a JSON object with this EXACT schema (no extra fields):
{
  "strategies": [
    {"provider_id": "adzuna", "query": "Machine Learning Engineer", "estimated_cost": 0.0}
  ]
}

Rules:
- Order strategies from most to least promising.
- Only use provider ids from the list above.
- Start with the most specific query, then progressively broader ones
  (e.g. "Senior AI Engineer" -> "Machine Learning Engineer" -> "Software Engineer AI").
- Adapt the wording to each board's preferences.
- Return at most 6 strategies."#;
