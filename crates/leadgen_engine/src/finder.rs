use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

use crate::{classify_failure, FailureKind, LookupError};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email pattern compiles")
});

#[async_trait::async_trait]
pub trait EmailFinder: Send + Sync {
    /// Look up public contact emails for one website.
    ///
    /// A response that cannot be understood yields `Ok(vec![])`; only transport,
    /// auth and service errors come back as `Err`.
    async fn find(&self, url: &str, audience: Option<&str>) -> Result<Vec<String>, LookupError>;
}

#[derive(Debug, Clone)]
pub struct FinderSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub connect_timeout: Duration,
    /// `None` leaves the call bounded only by the transport.
    pub request_timeout: Option<Duration>,
}

impl FinderSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Some(Duration::from_secs(120)),
        }
    }
}

/// Search-grounded lookups against the Generative Language `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiFinder {
    settings: FinderSettings,
    client: reqwest::Client,
}

impl GeminiFinder {
    pub fn new(settings: FinderSettings) -> Result<Self, LookupError> {
        if settings.api_key.trim().is_empty() {
            return Err(LookupError::new(FailureKind::Unauthorized, "missing API key"));
        }
        let mut builder = reqwest::Client::builder().connect_timeout(settings.connect_timeout);
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| LookupError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { settings, client })
    }

    fn endpoint(&self) -> Result<reqwest::Url, LookupError> {
        let raw = format!(
            "{}/v1beta/models/{}:generateContent",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model
        );
        reqwest::Url::parse(&raw)
            .map_err(|err| LookupError::new(FailureKind::InvalidRequest, err.to_string()))
    }
}

#[async_trait::async_trait]
impl EmailFinder for GeminiFinder {
    async fn find(&self, url: &str, audience: Option<&str>) -> Result<Vec<String>, LookupError> {
        let request = GenerateRequest::grounded(build_prompt(url, audience));
        let body = serde_json::to_vec(&request)
            .map_err(|err| LookupError::new(FailureKind::InvalidRequest, err.to_string()))?;

        engine_debug!("Looking up emails url={} model={}", url, self.settings.model);
        let response = self
            .client
            .post(self.endpoint()?)
            .header(CONTENT_TYPE, "application/json")
            .header("x-goog-api-key", self.settings.api_key.as_str())
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let text = response.text().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            return Err(api_error(status.as_u16(), &text));
        }

        let Some(answer) = answer_text(&text) else {
            engine_warn!("No answer text in response for {}", url);
            return Ok(Vec::new());
        };
        match parse_email_payload(&answer) {
            Some(emails) => {
                engine_info!("Found {} email(s) for {}", emails.len(), url);
                Ok(emails)
            }
            None => {
                engine_warn!("Malformed email payload for {}: {}", url, answer);
                Ok(Vec::new())
            }
        }
    }
}

pub fn build_prompt(url: &str, audience: Option<&str>) -> String {
    let mut prompt = format!(
        "Search the web for publicly listed contact email addresses for the website {url}.\n"
    );
    match audience.map(str::trim).filter(|a| !a.is_empty()) {
        Some(audience) => {
            prompt.push_str(&format!(
                "Target audience: {audience}.\n\
                 Prioritize addresses that belong to people in these roles.\n\
                 If no role-specific address can be found, return generic contact addresses \
                 such as info@, contact@, support@ or hello@ instead of an empty list.\n"
            ));
        }
        None => {
            prompt.push_str(
                "Prefer general business contact addresses such as info@, contact@, support@ \
                 or hello@.\n",
            );
        }
    }
    prompt.push_str(
        "Only include addresses that appear on public pages; do not guess.\n\
         Respond with JSON only, shaped exactly as {\"emails\": [\"address@example.com\"]}. \
         Use {\"emails\": []} when nothing is found.",
    );
    prompt
}

/// Parse the model's answer into validated, de-duplicated emails.
///
/// Returns `None` when the answer is not a JSON object with an `emails` array.
pub fn parse_email_payload(answer: &str) -> Option<Vec<String>> {
    let stripped = strip_code_fences(answer);
    let payload: EmailPayload = serde_json::from_str(stripped)
        .ok()
        .or_else(|| serde_json::from_str(outermost_object(stripped)?).ok())?;

    let mut seen = HashSet::new();
    let emails = payload
        .emails
        .iter()
        .filter_map(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|email| EMAIL_PATTERN.is_match(email))
        .filter(|email| seen.insert(email.to_ascii_lowercase()))
        .map(ToOwned::to_owned)
        .collect();
    Some(emails)
}

fn strip_code_fences(answer: &str) -> &str {
    let trimmed = answer.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the language tag on the opening fence line.
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn answer_text(body: &str) -> Option<String> {
    let response: GenerateResponse = serde_json::from_str(body).ok()?;
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|part| part.text).collect();
    (!text.trim().is_empty()).then_some(text)
}

fn api_error(status: u16, body: &str) -> LookupError {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => {
            let message = envelope
                .error
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| format!("http status {status}"));
            LookupError::classified(Some(status), envelope.error.status.as_deref(), message)
        }
        Err(_) => {
            let message = if body.trim().is_empty() {
                format!("http status {status}")
            } else {
                body.trim().to_string()
            };
            LookupError::classified(Some(status), None, message)
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> LookupError {
    // The URL carries the port, which must not be read as a status code.
    let err = err.without_url();
    let mut message = err.to_string();
    let mut source = std::error::Error::source(&err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    transport_error(err.status().map(|status| status.as_u16()), err.is_timeout(), message)
}

/// Quota wording wins over every other classification, then timeouts; errors
/// without a status are network failures.
fn transport_error(http_status: Option<u16>, timed_out: bool, message: String) -> LookupError {
    let kind = match classify_failure(http_status, None, &message) {
        FailureKind::RateLimited => FailureKind::RateLimited,
        _ if timed_out => FailureKind::Timeout,
        FailureKind::Api => FailureKind::Network,
        kind => kind,
    };
    LookupError::new(kind, message)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

impl GenerateRequest {
    fn grounded(prompt: String) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(prompt) }],
            }],
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        }
    }
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct EmailPayload {
    emails: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    status: Option<String>,
}
