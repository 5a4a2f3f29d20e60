//! AI Client — the single point of entry for all remote AI calls.
//!
//! No other module talks to the provider directly. Both operations are one
//! blocking request/response round trip against the OpenRouter
//! chat-completions API; every failure comes back as an `AiError` value,
//! never as a fault that takes the process down.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

pub mod prompts;

use crate::models::Document;
use prompts::{
    ATS_PROMPT_TEMPLATE, EXPERIENCE_TASK_TEMPLATE, SKILLS_TASK, SUGGESTION_PROMPT_TEMPLATE,
    SUMMARY_TASK,
};

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
/// The model used for all AI calls.
pub const MODEL: &str = "mistralai/mistral-7b-instruct";

#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("no JSON object found in the response")]
    NoJsonObject,

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("model returned empty content")]
    EmptyContent,

    #[error("invalid suggestion target: {0}")]
    InvalidTarget(String),
}

/// Which form field a targeted suggestion is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionField {
    Summary,
    Skills,
    /// Requires a [`JobContext`] naming the role being rewritten.
    ExperienceDescription,
}

/// The job entry a suggestion targets, used to anchor the rewrite.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub title: String,
    pub company: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: String,
}

/// Structured ATS feedback decoded from the scoring response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtsReport {
    pub score: i64,
    pub match_summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub keyword_suggestions: Vec<String>,
}

/// Client for the suggestion and ATS-scoring collaborator. Holds the
/// credential explicitly; nothing reads ambient key state.
#[derive(Clone)]
pub struct AiClient {
    client: Client,
    api_key: String,
}

impl AiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }

    /// One chat-completion round trip; returns the first choice's content.
    async fn call(&self, prompt: &str) -> Result<String, AiError> {
        let request_body = ChatRequest {
            model: MODEL,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(OPENROUTER_API_URL)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ChatResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        if let Some(err) = parsed.error {
            return Err(AiError::Provider(err.message));
        }
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(AiError::EmptyContent)?;

        debug!(chars = content.len(), "AI response received");
        Ok(content)
    }

    /// Targeted free-text suggestion for one field, using the whole resume
    /// as context.
    pub async fn suggest(
        &self,
        job_role: &str,
        document: &Document,
        field: SuggestionField,
        job_context: Option<&JobContext>,
    ) -> Result<String, AiError> {
        info!(?field, "requesting targeted AI suggestion");

        let task_instruction = match (field, job_context) {
            (SuggestionField::Summary, _) => SUMMARY_TASK.to_string(),
            (SuggestionField::Skills, _) => SKILLS_TASK.to_string(),
            (SuggestionField::ExperienceDescription, Some(ctx)) => EXPERIENCE_TASK_TEMPLATE
                .replace("{title}", &ctx.title)
                .replace("{company}", &ctx.company),
            (SuggestionField::ExperienceDescription, None) => {
                return Err(AiError::InvalidTarget(
                    "experience description suggestions need a job context".to_string(),
                ))
            }
        };

        let resume_json = serde_json::to_string_pretty(document)?;
        let prompt = SUGGESTION_PROMPT_TEMPLATE
            .replace("{task_instruction}", &task_instruction)
            .replace("{job_role}", job_role)
            .replace("{resume_json}", &resume_json);

        let content = self.call(&prompt).await?;
        let text = strip_fenced_segment(&content).trim().to_string();
        if text.is_empty() {
            return Err(AiError::EmptyContent);
        }
        Ok(text)
    }

    /// Scores the resume against a job description as an ATS would.
    /// Identity fields are redacted from the payload; the response JSON is
    /// dug out of whatever prose or fencing the model wraps it in.
    pub async fn ats_feedback(
        &self,
        job_description: &str,
        document: &Document,
    ) -> Result<AtsReport, AiError> {
        info!("requesting ATS score and feedback");

        let resume_json = serde_json::to_string_pretty(&document.redacted())?;
        let prompt = ATS_PROMPT_TEMPLATE
            .replace("{job_description}", job_description)
            .replace("{resume_json}", &resume_json);

        let content = self.call(&prompt).await?;
        parse_ats_response(&content)
    }
}

/// Decodes the scoring response: strip one pair of code fences if present,
/// then take the first `{` through the last `}` and parse that object.
fn parse_ats_response(raw: &str) -> Result<AtsReport, AiError> {
    let object = extract_json_object(strip_fenced_segment(raw)).ok_or_else(|| {
        error!("ATS response contained no JSON object:\n{raw}");
        AiError::NoJsonObject
    })?;

    let value: serde_json::Value = serde_json::from_str(object).map_err(|e| {
        error!("failed to parse ATS JSON: {e}\nraw response:\n{raw}");
        AiError::Parse(e)
    })?;
    if let Some(message) = value.get("error").and_then(|v| v.as_str()) {
        return Err(AiError::Provider(message.to_string()));
    }
    Ok(serde_json::from_value(value)?)
}

/// If the text carries a fenced code block, returns the segment between the
/// first pair of ``` markers (dropping a leading language tag line);
/// otherwise the text unchanged. Only a single fence pair is handled — the
/// original tool behaves the same way, and responses with several blocks are
/// out of contract.
fn strip_fenced_segment(text: &str) -> &str {
    let mut parts = text.splitn(3, "```");
    let _before = parts.next();
    match parts.next() {
        Some(inside) => {
            let inside = inside.trim();
            match inside.split_once('\n') {
                // "```json\n{...}" — a bare language tag line is not content.
                Some((tag, rest))
                    if !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric()) =>
                {
                    rest
                }
                _ => inside,
            }
        }
        None => text,
    }
}

/// First `{` through last `}`, the widest candidate object substring.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Section, SectionContent, SectionKind};

    #[test]
    fn test_strip_fenced_segment_with_language_tag() {
        let input = "Here is the result:\n```json\n{\"score\": 80}\n```\nHope that helps!";
        assert_eq!(strip_fenced_segment(input).trim(), "{\"score\": 80}");
    }

    #[test]
    fn test_strip_fenced_segment_without_tag() {
        let input = "```\n- Led migrations\n- Cut latency\n```";
        assert_eq!(
            strip_fenced_segment(input),
            "- Led migrations\n- Cut latency"
        );
    }

    #[test]
    fn test_strip_fenced_segment_passthrough_when_unfenced() {
        let input = "A plain suggestion.";
        assert_eq!(strip_fenced_segment(input), input);
    }

    #[test]
    fn test_extract_json_object_spans_first_to_last_brace() {
        let input = "noise {\"a\": {\"b\": 1}} trailing";
        assert_eq!(extract_json_object(input), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(extract_json_object("no braces here"), None);
        assert_eq!(extract_json_object("} reversed {"), None);
    }

    #[test]
    fn test_parse_ats_response_from_fenced_prose() {
        let raw = "Here is the result:\n```json\n{\n  \"score\": 72,\n  \
                   \"match_summary\": \"Decent fit\",\n  \"strengths\": [\"Rust\"],\n  \
                   \"weaknesses\": [\"No k8s\"],\n  \"keyword_suggestions\": [\"Kubernetes\"]\n}\n```";
        let report = parse_ats_response(raw).unwrap();
        assert_eq!(report.score, 72);
        assert_eq!(report.match_summary, "Decent fit");
        assert_eq!(report.strengths, vec!["Rust"]);
        assert_eq!(report.keyword_suggestions, vec!["Kubernetes"]);
    }

    #[test]
    fn test_parse_ats_response_tolerates_missing_lists() {
        let raw = "{\"score\": 55, \"match_summary\": \"ok\"}";
        let report = parse_ats_response(raw).unwrap();
        assert_eq!(report.score, 55);
        assert!(report.strengths.is_empty());
    }

    #[test]
    fn test_parse_ats_response_surfaces_provider_error_object() {
        let raw = "{\"error\": \"quota exceeded\"}";
        match parse_ats_response(raw) {
            Err(AiError::Provider(message)) => assert_eq!(message, "quota exceeded"),
            other => panic!("expected Provider error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_ats_response_without_object_is_no_json_object() {
        assert!(matches!(
            parse_ats_response("I cannot score this resume."),
            Err(AiError::NoJsonObject)
        ));
    }

    #[tokio::test]
    async fn test_experience_suggestion_requires_job_context() {
        // Rejected before any request is sent, so no network is involved.
        let client = AiClient::new("test-key".to_string());
        let result = client
            .suggest(
                "Engineer",
                &Document::default(),
                SuggestionField::ExperienceDescription,
                None,
            )
            .await;
        assert!(matches!(result, Err(AiError::InvalidTarget(_))));
    }

    #[test]
    fn test_experience_task_names_role_and_company() {
        let instruction = EXPERIENCE_TASK_TEMPLATE
            .replace("{title}", "Engineer")
            .replace("{company}", "Acme");
        assert!(instruction.contains("'Engineer' at 'Acme'"));
    }

    #[test]
    fn test_ats_payload_uses_redacted_document() {
        let doc = Document {
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone: "555-0100".to_string(),
            linkedin: "janedoe".to_string(),
            sections: vec![Section::new(
                SectionKind::Skills,
                None,
                SectionContent::Text("Rust, Tokio".to_string()),
            )],
        };
        let resume_json = serde_json::to_string_pretty(&doc.redacted()).unwrap();
        let prompt = ATS_PROMPT_TEMPLATE
            .replace("{job_description}", "Rust developer")
            .replace("{resume_json}", &resume_json);

        assert!(!prompt.contains("Jane Doe"));
        assert!(!prompt.contains("jane@example.com"));
        assert!(prompt.contains("Candidate"));
        assert!(prompt.contains("Rust, Tokio"));
    }
}
