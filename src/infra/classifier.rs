//! Thin asynchronous client for a `generateContent`-style classifier API.
//!
//! - One method per call shape: instruction plus image views.
//! - Responses are untrusted free-form text; the caller parses them.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::{Client, StatusCode, Url};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::domain::ImageData;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
const USER_AGENT: &str = "cote-scanner/0.1.0";

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("api error: {0}")]
    Api(String),
}

impl ClassifierError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

#[derive(Clone)]
pub struct ClassifierClient {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl ClassifierClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ClassifierError> {
        Self::with_base_url(DEFAULT_BASE_URL, api_key)
    }

    pub fn with_base_url(base: &str, api_key: impl Into<String>) -> Result<Self, ClassifierError> {
        let base_url = Url::parse(base)?;
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url,
            api_key: api_key.into(),
        })
    }

    /// Sends the instruction plus every image view to one model and returns
    /// the raw text of the first candidate reply.
    pub async fn generate(
        &self,
        model: &str,
        instruction: &str,
        images: &[ImageData],
    ) -> Result<String, ClassifierError> {
        let mut url = self.base_url.join(&format!("models/{model}:generateContent"))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let mut parts = vec![json!({ "text": instruction })];
        for image in images {
            parts.push(json!({
                "inline_data": {
                    "mime_type": image.mime_type,
                    "data": BASE64.encode(&image.bytes),
                }
            }));
        }
        let payload = json!({ "contents": [{ "role": "user", "parts": parts }] });

        debug!("[classifier] requesting {model} with {} image part(s)", images.len());
        let response = self.http.post(url).json(&payload).send().await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            let detail = response.text().await.unwrap_or_default();
            return Err(ClassifierError::RateLimited(detail));
        }
        let body: serde_json::Value = response.error_for_status()?.json().await?;

        if let Some(error) = body.get("error") {
            let status = error
                .get("status")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let message = error
                .get("message")
                .and_then(|v| v.as_str())
                .unwrap_or("unspecified api error")
                .to_string();
            if status == "RESOURCE_EXHAUSTED" {
                return Err(ClassifierError::RateLimited(message));
            }
            return Err(ClassifierError::Api(message));
        }

        extract_text(&body)
            .ok_or_else(|| ClassifierError::Api("response missing candidate text".to_string()))
    }
}

/// Walks `candidates[0].content.parts[0].text` and strips any code fence
/// the model wrapped the answer in.
fn extract_text(body: &serde_json::Value) -> Option<String> {
    let text = body
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()?;
    Some(strip_code_fence(text.trim()).to_string())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}
