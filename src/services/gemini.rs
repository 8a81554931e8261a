//! AI practice-plan generator backed by the Gemini API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::state::plans::PracticePlan;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Used when the model answers with no text
pub const EMPTY_QUOTE_FALLBACK: &str = "Practice is the bridge between desire and mastery.";
/// Used when the quote request fails
pub const FAILED_QUOTE_FALLBACK: &str = "Where words fail, music speaks.";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const PLAN_SYSTEM_INSTRUCTION: &str = "You are an expert piano coach. Build dynamic practice plans \
and write them in Spanish. Every step MUST have a 'type' that is strictly 'ESTUDIO', 'PRÁCTICA' or 'DESCANSO'.";

const QUOTE_SYSTEM_INSTRUCTION: &str = "Always answer in Spanish.";

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("No API key configured for the plan generator")]
    MissingApiKey,

    #[error("Practice goal must not be empty")]
    EmptyGoal,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Remote service turning a practice goal into a plan
#[async_trait]
pub trait PlanGenerator: Send + Sync {
    async fn practice_plan(&self, goal: &str, minutes: u32) -> Result<PracticePlan, GeneratorError>;

    async fn inspirational_quote(&self) -> Result<String, GeneratorError>;
}

pub struct GeminiClient {
    http: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Result<Self, GeneratorError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    async fn generate(&self, body: Value) -> Result<String, GeneratorError> {
        let api_key = self.api_key.as_deref().ok_or(GeneratorError::MissingApiKey)?;
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!(%url, "generate: sending request");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Gemini request failed with {}", status);
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = response.json().await?;
        Ok(response_text(&payload).unwrap_or_default())
    }
}

#[async_trait]
impl PlanGenerator for GeminiClient {
    async fn practice_plan(&self, goal: &str, minutes: u32) -> Result<PracticePlan, GeneratorError> {
        if goal.trim().is_empty() {
            return Err(GeneratorError::EmptyGoal);
        }
        info!("Requesting {}-minute practice plan for '{}'", minutes, goal);
        let text = self.generate(plan_request_body(goal, minutes)).await?;
        parse_plan(&text)
    }

    async fn inspirational_quote(&self) -> Result<String, GeneratorError> {
        let body = json!({
            "systemInstruction": { "parts": [{ "text": QUOTE_SYSTEM_INSTRUCTION }] },
            "contents": [{ "role": "user", "parts": [{ "text": "Give me a short quote about the piano." }] }],
        });
        let text = self.generate(body).await?;
        let text = text.trim();
        Ok(if text.is_empty() {
            EMPTY_QUOTE_FALLBACK.to_string()
        } else {
            text.to_string()
        })
    }
}

/// Request body asking for a structured plan of exactly `minutes`
pub fn plan_request_body(goal: &str, minutes: u32) -> Value {
    let prompt = format!(
        "The student is practising: \"{goal}\". Build a practice plan of EXACTLY {minutes} minutes, \
         written in Spanish.\nIMPORTANT: classify every step into one of these 3 categories:\n\
         - 'ESTUDIO': technique, slow reading or analysis.\n\
         - 'PRÁCTICA': playing fluent pieces or repertoire.\n\
         - 'DESCANSO': short 2-5 minute pauses if the session is long."
    );

    json!({
        "systemInstruction": { "parts": [{ "text": PLAN_SYSTEM_INSTRUCTION }] },
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "title": { "type": "STRING" },
                    "steps": {
                        "type": "ARRAY",
                        "items": {
                            "type": "OBJECT",
                            "properties": {
                                "duration": { "type": "STRING" },
                                "action": { "type": "STRING" },
                                "description": { "type": "STRING" },
                                "type": { "type": "STRING", "enum": ["ESTUDIO", "PRÁCTICA", "DESCANSO"] }
                            },
                            "required": ["duration", "action", "description", "type"]
                        }
                    },
                    "techniqueTip": { "type": "STRING" }
                },
                "required": ["title", "steps", "techniqueTip"]
            }
        }
    })
}

/// Concatenated text parts of the first candidate
pub fn response_text(payload: &Value) -> Option<String> {
    let parts = payload
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts.iter().filter_map(|p| p.get("text")?.as_str()).collect();
    Some(text)
}

pub fn parse_plan(text: &str) -> Result<PracticePlan, GeneratorError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(GeneratorError::InvalidResponse("empty plan".to_string()));
    }
    Ok(serde_json::from_str(text)?)
}
