use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use reqwest::Client;

use crate::api::models::HistoryTurn;
use crate::error::{Result, AppError};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const SYSTEM_PROMPT: &str = "\
You are Deep-Shiva, an expert agricultural advisor for Indian farmers.
Your goal is to provide accurate, timely, and practical advice on:
- Crop management (Rice, Wheat, Maize, etc.)
- Pest and disease control
- Weather-based farming decisions
- Government schemes (PM-KISAN, etc.)

Guidelines:
1. Answer in a simple, encouraging tone.
2. If the query is in Hindi/Regional language, reply in the same language (or English if requested).
3. Keep answers concise (under 100 words) unless detailed explanation is asked.
4. If you don't know the answer, suggest consulting a local expert (Krishi Vigyan Kendra).
";

pub const MISSING_KEY_REPLY: &str =
    "Server Error: Invalid or Missing Google API Key. Please check backend .env file.";

/// Something that can answer a farmer's question given the conversation so far.
#[async_trait]
pub trait AdviceProvider: Send + Sync {
    async fn generate(&self, query: &str, history: &[HistoryTurn]) -> Result<String>;
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn turn(role: &str, text: &str) -> Self {
        Content {
            role: Some(role.to_string()),
            parts: vec![Part { text: text.to_string() }],
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Maps the client's history onto Gemini chat turns. Anything that is not
/// literally `"user"` is treated as the model speaking.
fn to_gemini_history(history: &[HistoryTurn]) -> Vec<Content> {
    history
        .iter()
        .map(|turn| {
            let role = if turn.role == "user" { "user" } else { "model" };
            Content::turn(role, &turn.message)
        })
        .collect()
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    http: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(http: Client, api_key: Option<String>, model: impl Into<String>) -> Self {
        GeminiClient {
            http,
            api_key,
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl AdviceProvider for GeminiClient {
    async fn generate(&self, query: &str, history: &[HistoryTurn]) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::LlmError("GOOGLE_API_KEY is not configured (API_KEY missing)".to_string()))?;

        // The chat session is the prior turns followed by the new question.
        let mut contents = to_gemini_history(history);
        contents.push(Content::turn("user", query));

        let body = GenerateContentRequest {
            contents,
            system_instruction: Content {
                role: None,
                parts: vec![Part { text: SYSTEM_PROMPT.to_string() }],
            },
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        let res = self
            .http
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(AppError::LlmError(format!("{}: {}", status, text)));
        }

        let json: GenerateContentResponse = res
            .json()
            .await
            .map_err(|e| AppError::LlmError(format!("Invalid response format from LLM: {}", e)))?;

        let reply: String = json
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if reply.is_empty() {
            return Err(AppError::LlmError("Invalid response format from LLM: no text in candidates".to_string()));
        }

        Ok(reply)
    }
}

fn is_credential_error(message: &str) -> bool {
    message.contains("API_KEY") || message.contains("403")
}

/// Turns a provider failure into the reply shown to the user.
pub fn fallback_reply(err: &AppError) -> String {
    let message = err.to_string();
    if is_credential_error(&message) {
        MISSING_KEY_REPLY.to_string()
    } else {
        format!("I am unable to connect to the Agri-Brain right now. Error: {}", message)
    }
}

/// Asks the provider for advice. Failures never escape; they become a fallback reply.
pub async fn get_agri_advice(
    provider: &dyn AdviceProvider,
    query: &str,
    history: &[HistoryTurn],
) -> String {
    match provider.generate(query, history).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!("Advice provider error: {}", e);
            fallback_reply(&e)
        }
    }
}
