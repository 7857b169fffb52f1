use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::{ModelConfig, SafetySetting};
use crate::generator::Generator;
use crate::protocol::{Conversation, Role};

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiGenerator {
    endpoint: String,
    api_key: String,
    generation: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
    client: Client,
}

impl GeminiGenerator {
    pub fn new(config: ModelConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(anyhow!(
                "GEMINI_API_KEY is not set and model.api_key is empty"
            ));
        }
        if config.model.trim().is_empty() {
            return Err(anyhow!("model.model is empty"));
        }

        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                config.base_url.trim_end_matches('/'),
                config.model
            ),
            api_key: config.api_key,
            generation: GenerationConfig {
                temperature: config.temperature,
                top_k: config.top_k,
                top_p: config.top_p,
                max_output_tokens: config.max_output_tokens,
            },
            safety_settings: config.safety_settings,
            client: builder.build().context("failed to build HTTP client")?,
        })
    }

    fn build_payload<'a>(&'a self, conversation: &'a Conversation) -> GenerateContentRequest<'a> {
        GenerateContentRequest {
            system_instruction: conversation.system_instruction.as_deref().map(|text| Content {
                role: None,
                parts: vec![Part { text }],
            }),
            contents: conversation
                .turns
                .iter()
                .map(|turn| Content {
                    role: Some(match turn.role {
                        Role::User => "user",
                        Role::Model => "model",
                    }),
                    parts: vec![Part { text: &turn.text }],
                })
                .collect(),
            generation_config: &self.generation,
            safety_settings: self
                .safety_settings
                .iter()
                .map(|setting| SafetySettingPayload {
                    category: &setting.category,
                    threshold: &setting.threshold,
                })
                .collect(),
        }
    }
}

fn extract_text(parsed: GenerateContentResponse) -> Result<String> {
    let Some(candidate) = parsed.candidates.into_iter().next() else {
        let reason = parsed
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(anyhow!("gemini returned no candidates: {reason}"));
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
        return Err(anyhow!("gemini returned empty text (finish reason {reason})"));
    }
    Ok(text)
}

#[async_trait]
impl Generator for GeminiGenerator {
    async fn generate(&self, conversation: &Conversation) -> Result<String> {
        let payload = self.build_payload(conversation);

        let response = self
            .client
            .post(&self.endpoint)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&payload)
            .send()
            .await
            .context("failed to call gemini API")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read gemini response body")?;

        if !status.is_success() {
            return Err(anyhow!("gemini API failed ({status}): {body}"));
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).context("invalid gemini response format")?;
        extract_text(parsed)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: &'a GenerationConfig,
    safety_settings: Vec<SafetySettingPayload<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Serialize)]
struct SafetySettingPayload<'a> {
    category: &'a str,
    threshold: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}
