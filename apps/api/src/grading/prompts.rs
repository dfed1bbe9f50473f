/// Role line for the evaluation system prompt.
pub const EVALUATION_ROLE: &str = "You are an experienced competency-based interview \
    assessor. You grade a candidate's answer fairly and give specific, actionable feedback.";

/// Evaluation prompt. Replace every `{placeholder}` before sending.
pub const EVALUATION_PROMPT_TEMPLATE: &str = r#"Assess the candidate's answer to a competency-based interview question.

{evidence_instruction}

{star_instruction}

COMPETENCY: {competency}

QUESTION:
{question_text}

CANDIDATE BACKGROUND (from their CV):
{cv_context}

ANSWER:
{answer_text}

Return a JSON object with this EXACT schema (no extra fields):
{
  "overallScore": 6.5,
  "competencyScores": {"{competency}": 6.5},
  "starAnalysis": {
    "situation": {"score": 7, "comment": "..."},
    "task": {"score": 6, "comment": "..."},
    "action": {"score": 7, "comment": "..."},
    "result": {"score": 5, "comment": "..."}
  },
  "feedback": "Two to four sentences of overall feedback.",
  "strengths": ["..."],
  "improvementAreas": ["..."],
  "improvedText": "A rewritten version of the answer that keeps the candidate's facts but applies the feedback."
}

SCORING (all scores 0-10, decimals allowed):
- 0-3: little or no evidence of the competency, STAR structure missing
- 4-6: some evidence, vague actions or no measurable result
- 7-8: clear, personal actions with a concrete result
- 9-10: exceptional, well-structured, quantified and reflective

An empty or off-topic answer scores 0 to 2 with feedback explaining why."#;
