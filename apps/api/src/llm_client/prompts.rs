// Shared prompt fragments. Each service that calls the LLM keeps its own
// prompts.rs alongside it and builds on these.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps generated and graded content anchored to what the candidate supplied.
pub const EVIDENCE_INSTRUCTION: &str = "\
    CRITICAL: Base every statement on the material provided (CV analysis, job \
    specification, question, answer). Do NOT invent employers, projects, \
    achievements or metrics the candidate has not mentioned.";

/// Competency-based interviews are assessed against the STAR structure.
pub const STAR_INSTRUCTION: &str = "\
    Answers are expected to follow the STAR structure: Situation (context), \
    Task (the candidate's responsibility), Action (what THEY did, in the first \
    person), Result (measurable outcome and what they learned).";

/// Builds a system prompt from a role description plus the JSON-only rules.
pub fn json_system(role: &str) -> String {
    format!("{role} {JSON_ONLY_SYSTEM}")
}
