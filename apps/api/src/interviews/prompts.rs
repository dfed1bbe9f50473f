/// Role line for document analysis.
pub const ANALYSIS_ROLE: &str = "You are a recruitment specialist who reads CVs and \
    job specifications and extracts the evidence relevant to competency-based interviews.";

/// CV analysis prompt. Replace `{content}` before sending.
pub const CV_ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the following CV.

CV:
{content}

Return a JSON object with this EXACT schema:
{
  "summary": "Two or three sentences describing the candidate's background.",
  "currentRole": "...",
  "yearsExperience": 0,
  "skills": ["..."],
  "achievements": ["Concrete, evidenced achievements only"],
  "sectors": ["..."]
}"#;

/// Job specification analysis prompt. Replace `{content}` before sending.
pub const JOB_SPEC_ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the following job specification.

JOB SPECIFICATION:
{content}

Return a JSON object with this EXACT schema:
{
  "summary": "Two or three sentences describing the role.",
  "jobTitle": "...",
  "grade": "...",
  "essentialCriteria": ["..."],
  "desirableCriteria": ["..."],
  "behaviours": ["Competencies or behaviours the role is assessed against"]
}"#;

/// Role line for question generation.
pub const GENERATION_ROLE: &str = "You are an experienced interview panel chair who writes \
    competency-based interview questions tailored to a candidate and role.";

/// Question generation prompt. Replace every `{placeholder}` before sending.
pub const QUESTION_PROMPT_TEMPLATE: &str = r#"Write {total_questions} competency-based interview questions.

{evidence_instruction}

{star_instruction}

ROLE: {job_title} ({job_grade})
FRAMEWORK: {framework}
COMPETENCIES (spread the questions across these, in order): {competencies}

CANDIDATE CV ANALYSIS:
{cv_analysis}

JOB SPECIFICATION:
{job_spec}

Rules:
- Each question assesses exactly one competency from the list, using its exact name.
- Ask for a specific past example ("Tell me about a time...", "Describe a situation...").
- Where the CV mentions relevant experience, tailor the question to it.
- difficulty is one of "easy", "medium", "hard"; mix them.

Return a JSON object with this EXACT schema:
{
  "questions": [
    {"competency": "...", "text": "...", "difficulty": "medium"}
  ],
  "totalQuestions": {total_questions}
}"#;
