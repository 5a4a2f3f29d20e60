//! Prompt templates for the suggestion and ATS-scoring calls.
//!
//! Placeholders are filled with `.replace` by the client; the `{…}` names
//! here are plain markers, not template-engine syntax.

/// Per-field task instructions for targeted suggestions.
pub const SUMMARY_TASK: &str =
    "Generate a concise and impactful professional summary (2-4 sentences).";

pub const SKILLS_TASK: &str = "Generate a comma-separated list of key technical and soft skills \
    relevant to the target job.";

/// `{title}` and `{company}` come from the job entry the user is editing.
pub const EXPERIENCE_TASK_TEMPLATE: &str = "Rewrite the work experience description for the role \
    of '{title}' at '{company}'. Focus on quantifiable achievements and use professional, \
    action-oriented bullet points.";

/// `{task_instruction}`, `{job_role}`, `{resume_json}`.
pub const SUGGESTION_PROMPT_TEMPLATE: &str = r#"You are an expert resume writer. Based on the full resume data provided below and for the target job role of "{job_role}", perform the following task:

TASK:
{task_instruction}

FULL RESUME DATA (for context):
{resume_json}

INSTRUCTIONS:
- Your response must be ONLY the generated text for the requested field.
- Do NOT include any introductory phrases, explanations, or JSON formatting.
- For experience descriptions, start each bullet point with '- '.
"#;

/// `{job_description}`, `{resume_json}` (the redacted document).
pub const ATS_PROMPT_TEMPLATE: &str = r#"You are a professional hiring manager and an expert Applicant Tracking System (ATS) simulator. Your task is to analyze the provided resume against the given job description.

JOB DESCRIPTION:
---
{job_description}
---

CANDIDATE'S RESUME DATA:
---
{resume_json}
---

INSTRUCTIONS:
1.  **Analyze Keywords:** Compare the skills, technologies, and responsibilities in the resume with those in the job description.
2.  **Assess Relevance:** Evaluate how well the candidate's experience aligns with the job requirements.
3.  **Provide a Score:** Give an overall ATS match score out of 100.
4.  **Give Feedback:** Detail the strengths and weaknesses of the resume for this specific role.
5.  **Suggest Keywords:** List critical keywords from the job description that are missing from the resume.

Your response MUST be a valid JSON object and nothing else, following this exact structure:
{
  "score": <integer>,
  "match_summary": "<string>",
  "strengths": ["<string>", "<string>", ...],
  "weaknesses": ["<string>", "<string>", ...],
  "keyword_suggestions": ["<string>", "<string>", ...]
}
"#;
