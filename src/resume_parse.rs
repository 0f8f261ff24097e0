use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tracing::{debug, info};

use crate::models::CandidateDraft;

// --- Provider trait ---

pub trait AIProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String>;
    fn model_name(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    OpenAI,
}

#[derive(Debug, Clone)]
pub struct ModelSpec {
    pub provider: ProviderKind,
    pub model_id: String,
    pub short_name: String,
}

pub fn resolve_model(name: &str) -> Result<ModelSpec> {
    let (provider, model_id, short_name) = match name {
        "api-sonnet" | "sonnet" => (ProviderKind::Anthropic, "claude-sonnet-4-5-20250929", "api-sonnet"),
        "api-haiku" | "haiku" => (ProviderKind::Anthropic, "claude-haiku-4-5-20251001", "api-haiku"),
        "gpt-4o" => (ProviderKind::OpenAI, "gpt-4o", "gpt-4o"),
        "gpt-4o-mini" => (ProviderKind::OpenAI, "gpt-4o-mini", "gpt-4o-mini"),
        _ => {
            return Err(anyhow!(
                "Unknown model '{}'. Available: api-sonnet (default), api-haiku, gpt-4o, gpt-4o-mini",
                name
            ));
        }
    };
    Ok(ModelSpec {
        provider,
        model_id: model_id.to_string(),
        short_name: short_name.to_string(),
    })
}

pub fn create_provider(spec: &ModelSpec) -> Result<Box<dyn AIProvider>> {
    match spec.provider {
        ProviderKind::Anthropic => Ok(Box::new(AnthropicProvider::new(spec.model_id.clone())?)),
        ProviderKind::OpenAI => Ok(Box::new(OpenAIProvider::new(spec.model_id.clone())?)),
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
}

impl ChatRequest {
    fn user(model: &str, max_tokens: u32, prompt: &str) -> Self {
        Self {
            model: model.to_string(),
            max_tokens,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        }
    }
}

fn send(request: reqwest::blocking::RequestBuilder, vendor: &str) -> Result<reqwest::blocking::Response> {
    let response = request
        .send()
        .with_context(|| format!("Failed to send request to {} API", vendor))?;
    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().unwrap_or_default();
        return Err(anyhow!(
            "{} API request failed with status {}: {}",
            vendor,
            status,
            error_text
        ));
    }
    Ok(response)
}

// --- Anthropic provider ---

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

#[derive(Debug, Deserialize)]
struct AnthropicContentBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug)]
pub struct AnthropicProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl AnthropicProvider {
    pub fn new(model_id: String) -> Result<Self> {
        let api_key = env::var("ANTHROPIC_API_KEY")
            .context("ANTHROPIC_API_KEY environment variable not set. Set it with: export ANTHROPIC_API_KEY=your-key-here")?;
        let client = reqwest::blocking::Client::new();
        Ok(Self { api_key, model_id, client })
    }
}

impl AIProvider for AnthropicProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&ChatRequest::user(&self.model_id, max_tokens, prompt));

        let api_response: AnthropicResponse = send(request, "Anthropic")?
            .json()
            .context("Failed to parse Anthropic API response")?;

        api_response
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| anyhow!("No content in Anthropic API response"))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- OpenAI provider ---

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug)]
pub struct OpenAIProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl OpenAIProvider {
    pub fn new(model_id: String) -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable not set. Set it with: export OPENAI_API_KEY=your-key-here")?;
        let client = reqwest::blocking::Client::new();
        Ok(Self { api_key, model_id, client })
    }
}

impl AIProvider for OpenAIProvider {
    fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = self
            .client
            .post(OPENAI_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&ChatRequest::user(&self.model_id, max_tokens, prompt));

        let api_response: OpenAIResponse = send(request, "OpenAI")?
            .json()
            .context("Failed to parse OpenAI API response")?;

        api_response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow!("No choices in OpenAI API response"))
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}

// --- Resume schema ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub institution: Option<String>,
    pub degree: Option<String>,
    pub field: Option<String>,
    pub year: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    pub company: Option<String>,
    pub title: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedResume {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub summary: Option<String>,
    pub years_experience: Option<f64>,
    pub current_title: Option<String>,
    pub current_company: Option<String>,
    pub skills: Vec<String>,
    pub education: Vec<Education>,
    pub experience: Vec<Experience>,
}

impl ParsedResume {
    /// Prefills a candidate form. Empty strings from the model become `None`.
    pub fn to_draft(&self) -> CandidateDraft {
        let clean = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let mut notes = Vec::new();
        if let Some(title) = clean(&self.current_title) {
            match clean(&self.current_company) {
                Some(company) => notes.push(format!("{} at {}", title, company)),
                None => notes.push(title),
            }
        }
        if let Some(years) = self.years_experience.filter(|y| *y > 0.0) {
            notes.push(format!("{} years experience", years));
        }
        if let Some(summary) = clean(&self.summary) {
            notes.push(summary);
        }
        let skills: Vec<&str> = self
            .skills
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();

        CandidateDraft {
            name: clean(&self.name).unwrap_or_default(),
            email: clean(&self.email),
            phone: clean(&self.phone),
            location: None,
            linkedin_url: clean(&self.linkedin_url),
            resume_url: None,
            skills: (!skills.is_empty()).then(|| skills.join(", ")),
            notes: (!notes.is_empty()).then(|| notes.join("\n")),
        }
    }
}

const SCHEMA_INSTRUCTION: &str = r#"Extract the candidate's details from the resume below.
Return ONLY a JSON object with exactly these keys and no other text:
{
  "name": string|null,
  "email": string|null,
  "phone": string|null,
  "linkedin_url": string|null,
  "summary": string|null,
  "years_experience": number|null,
  "current_title": string|null,
  "current_company": string|null,
  "skills": [string],
  "education": [{"institution": string|null, "degree": string|null, "field": string|null, "year": string|null}],
  "experience": [{"company": string|null, "title": string|null, "start": string|null, "end": string|null, "summary": string|null}]
}
Use null for anything the resume does not state."#;

/// The JSON object inside a model answer, without surrounding prose or code fences.
pub fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```"))
        .unwrap_or(trimmed);
    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced.trim(),
    }
}

pub fn parse_resume(provider: &dyn AIProvider, resume_text: &str) -> Result<ParsedResume> {
    if resume_text.trim().is_empty() {
        return Err(anyhow!("Resume text is empty"));
    }
    let prompt = format!("{}\n\nResume:\n{}", SCHEMA_INSTRUCTION, resume_text);
    debug!(model = provider.model_name(), chars = resume_text.len(), "parsing resume");

    let response = provider.complete(&prompt, 4096)?;
    let parsed: ParsedResume = serde_json::from_str(extract_json(&response))
        .context("Resume parser returned JSON that does not match the schema")?;
    info!(name = ?parsed.name, skills = parsed.skills.len(), "resume parsed");
    Ok(parsed)
}

/// Plain text of a resume file. `.docx` bodies are flattened; anything else is read as UTF-8.
pub fn resume_text(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let is_docx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("docx"));
    if is_docx {
        return Ok(crate::documents::docx_to_text(&bytes)?);
    }
    String::from_utf8(bytes).with_context(|| format!("{} is not a text file", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct CannedProvider {
        answer: String,
        prompts: RefCell<Vec<String>>,
    }

    impl CannedProvider {
        fn new(answer: &str) -> Self {
            Self {
                answer: answer.to_string(),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl AIProvider for CannedProvider {
        fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String> {
            self.prompts.borrow_mut().push(prompt.to_string());
            Ok(self.answer.clone())
        }

        fn model_name(&self) -> &str {
            "canned"
        }
    }

    const ANSWER: &str = r#"```json
{
  "name": "Casey Jones",
  "email": "casey@example.com",
  "phone": "",
  "linkedin_url": "https://www.linkedin.com/in/casey",
  "summary": "Backend engineer.",
  "years_experience": 7,
  "current_title": "Staff Engineer",
  "current_company": "Initech",
  "skills": ["Rust", " SQL ", ""],
  "education": [{"institution": "State U", "degree": "BSc"}],
  "experience": [{"company": "Initech", "title": "Staff Engineer", "start": "2021"}]
}
```"#;

    #[test]
    fn test_resolve_model() {
        let spec = resolve_model("api-sonnet").unwrap();
        assert_eq!(spec.provider, ProviderKind::Anthropic);
        assert_eq!(resolve_model("sonnet").unwrap().short_name, "api-sonnet");
        assert_eq!(resolve_model("gpt-4o").unwrap().provider, ProviderKind::OpenAI);
        assert!(resolve_model("gpt-3").is_err());
    }

    #[test]
    fn test_extract_json_strips_fences_and_prose() {
        assert_eq!(extract_json("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(extract_json("```\n{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(extract_json("Here you go: {\"a\":1} hope it helps"), "{\"a\":1}");
        assert_eq!(extract_json("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_fenced_response() {
        let provider = CannedProvider::new(ANSWER);
        let parsed = parse_resume(&provider, "Casey Jones\nStaff Engineer").unwrap();
        assert_eq!(parsed.name.as_deref(), Some("Casey Jones"));
        assert_eq!(parsed.years_experience, Some(7.0));
        assert_eq!(parsed.education[0].degree.as_deref(), Some("BSc"));
        assert_eq!(parsed.experience[0].end, None);
        assert!(provider.prompts.borrow()[0].contains("\"linkedin_url\""));
    }

    #[test]
    fn test_draft_prefill() {
        let parsed = parse_resume(&CannedProvider::new(ANSWER), "resume").unwrap();
        let draft = parsed.to_draft();
        assert_eq!(draft.name, "Casey Jones");
        assert_eq!(draft.phone, None);
        assert_eq!(draft.skills.as_deref(), Some("Rust, SQL"));
        assert_eq!(
            draft.notes.as_deref(),
            Some("Staff Engineer at Initech\n7 years experience\nBackend engineer.")
        );
    }

    #[test]
    fn test_schema_mismatch_and_empty_input_fail() {
        assert!(parse_resume(&CannedProvider::new("{\"skills\": \"Rust\"}"), "resume").is_err());
        assert!(parse_resume(&CannedProvider::new("sorry, no"), "resume").is_err());
        assert!(parse_resume(&CannedProvider::new(ANSWER), "   ").is_err());
    }

    #[test]
    fn test_resume_text_reads_plain_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("casey.txt");
        std::fs::write(&path, "Casey Jones").unwrap();
        assert_eq!(resume_text(&path).unwrap(), "Casey Jones");
        assert!(resume_text(&dir.path().join("missing.txt")).is_err());
    }

    #[test]
    fn test_openai_provider_requires_api_key() {
        let original = env::var("OPENAI_API_KEY").ok();
        unsafe { env::remove_var("OPENAI_API_KEY"); }

        let result = OpenAIProvider::new("gpt-4o".to_string());

        if let Some(val) = original {
            unsafe { env::set_var("OPENAI_API_KEY", val); }
        }

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("OPENAI_API_KEY"));
    }
}
