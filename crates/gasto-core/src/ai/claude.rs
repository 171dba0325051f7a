//! Anthropic Claude provider implementation
//!
//! Uses the messages API with `claude-3-5-sonnet-20241022`. The extraction
//! instruction is passed as the top-level system prompt and images as base64
//! source blocks.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::parsing::parse_expense_response;
use super::types::ExpenseData;
use super::{ExpenseAnalyzer, EXTRACTION_PROMPT};

const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 500;

/// Anthropic Claude expense analysis provider
#[derive(Clone)]
pub struct ClaudeProvider {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
    default_currency: String,
}

impl ClaudeProvider {
    /// Create a new Claude provider
    pub fn new(api_key: &str, default_currency: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.to_string(),
            default_currency: default_currency.to_uppercase(),
        }
    }

    /// Create a new instance pointed at a different API base URL
    pub fn with_base_url(&self, base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..self.clone()
        }
    }

    /// Build the provider from the process environment
    ///
    /// Required: `ANTHROPIC_API_KEY`
    /// Optional: `BASE_CURRENCY` (default: EUR)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("ANTHROPIC_API_KEY is required".into()))?;
        let currency = std::env::var("BASE_CURRENCY").unwrap_or_else(|_| "EUR".to_string());

        Ok(Self::new(&api_key, &currency))
    }

    async fn create_message(&self, request: &MessagesRequest) -> Result<String> {
        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Analysis(format!(
                "Claude returned {}: {}",
                status, body
            )));
        }

        let messages_response: MessagesResponse = response.json().await?;

        messages_response
            .content
            .into_iter()
            .find_map(|block| match block {
                ResponseBlock::Text { text } => Some(text),
            })
            .ok_or_else(|| Error::Analysis("No text content in Claude response".into()))
    }
}

#[async_trait]
impl ExpenseAnalyzer for ClaudeProvider {
    async fn analyze(&self, text: Option<&str>, image: Option<&[u8]>) -> Result<ExpenseData> {
        if text.is_none() && image.is_none() {
            return Err(Error::Input(
                "At least one input (text or image) is required".into(),
            ));
        }

        let mut blocks = Vec::new();
        if let Some(text) = text {
            blocks.push(ContentBlock::Text {
                text: format!("Analyze this expense information:\n\n{}", text),
            });
        }
        if let Some(image) = image {
            let base64_image = base64::engine::general_purpose::STANDARD.encode(image);
            blocks.push(ContentBlock::Image {
                source: ImageSource {
                    source_type: "base64".to_string(),
                    media_type: "image/jpeg".to_string(),
                    data: base64_image,
                },
            });
        }

        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            system: EXTRACTION_PROMPT.to_string(),
            messages: vec![Message {
                role: "user".to_string(),
                content: blocks,
            }],
        };

        let response = self.create_message(&request).await?;
        debug!(response = %response, "Claude reply");

        Ok(parse_expense_response(&response, &self.default_currency))
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

/// Anthropic messages API request
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

/// A message in the conversation
#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: Vec<ContentBlock>,
}

/// Content block within a message
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image")]
    Image { source: ImageSource },
}

/// Base64 image source
#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

/// Anthropic messages API response
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

/// Content block in a reply
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ResponseBlock {
    #[serde(rename = "text")]
    Text { text: String },
}
