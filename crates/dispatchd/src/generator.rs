//! Text-generation collaborator.
//!
//! The dispatcher only needs one call shape: a model name, a list of chat
//! messages and a temperature in; a reply carrying `text` or `content` out.
//! [`HttpTextGenerator`] posts that shape as JSON to a configured endpoint.

use async_trait::async_trait;
use dispatch_core::Config;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for GeneratorError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => GeneratorError::Http {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None => GeneratorError::Request(e.to_string()),
        }
    }
}

/// A chat message sent to the collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl GenerateResponse {
    /// Reply text: `text` if non-empty, otherwise `content`.
    pub fn body(&self) -> Option<&str> {
        self.text
            .as_deref()
            .filter(|t| !t.is_empty())
            .or(self.content.as_deref())
    }
}

/// Something that can turn a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerateResponse, GeneratorError>;
}

/// Collaborator reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTextGenerator {
    url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl HttpTextGenerator {
    pub fn new(url: &str, token: Option<&str>) -> Self {
        Self {
            url: url.to_string(),
            token: token.map(String::from),
            http: reqwest::Client::new(),
        }
    }

    /// Build from config; `None` when no endpoint is configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        config
            .generator_url
            .as_deref()
            .map(|url| Self::new(url, config.generator_token.as_deref()))
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.token {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
                headers.insert(AUTHORIZATION, value);
            }
        }
        headers
    }
}

#[async_trait]
impl TextGenerator for HttpTextGenerator {
    async fn generate_text(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerateResponse, GeneratorError> {
        let response = self
            .http
            .post(&self.url)
            .headers(self.headers())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| GeneratorError::InvalidResponse(e.to_string()))
    }
}
