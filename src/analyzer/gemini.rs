use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::Analyzer;
use crate::consts::{ANALYSIS_PROMPT, DEFAULT_MODEL};
use crate::photo::Photo;

const API_BASE: &str = "https://generativelanguage.googleapis.com";
const API_VERSION: &str = "v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// An analyzer that calls the Gemini `generateContent` endpoint.
pub struct GeminiAnalyzer {
    model: String,
    api_key: Option<String>,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiAnalyzer {
    /// A missing key is not an error here; every call then fails and the
    /// caller falls back.
    pub fn new(model: Option<String>, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key,
            base_url: API_BASE.to_string(),
            client,
        })
    }

    /// Point at a different host (tests run a local stand-in).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            self.base_url, API_VERSION, self.model
        )
    }

    fn build_request(photo: &Photo) -> ApiRequest {
        ApiRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text {
                        text: ANALYSIS_PROMPT.to_string(),
                    },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: photo.media_type().mime().to_string(),
                            data: photo.to_base64(),
                        },
                    },
                ],
            }],
        }
    }

    /// Concatenate the text parts of the first candidate.
    fn extract_text(resp: &ApiResponse) -> Result<String> {
        if let Some(reason) = resp
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            bail!("Gemini blocked the request: {reason}");
        }

        let text: String = resp
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.is_empty() {
            bail!("Gemini returned empty response");
        }
        Ok(text)
    }
}

#[async_trait]
impl Analyzer for GeminiAnalyzer {
    async fn analyze(&self, photo: &Photo) -> Result<String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("no Gemini credentials found. Set GOOGLE_API_KEY."))?;

        let body = Self::build_request(photo);

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("Gemini API error ({}): {}", status, text);
        }

        let api_resp: ApiResponse = resp.json().await?;

        if let Some(usage) = &api_resp.usage_metadata {
            tracing::debug!(
                input = usage.prompt_token_count,
                output = usage.candidates_token_count,
                "gemini token usage"
            );
        }

        Self::extract_text(&api_resp)
    }
}

// --- API types ---

#[derive(Serialize)]
struct ApiRequest {
    contents: Vec<RequestContent>,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}
