//! OpenAI provider implementation
//!
//! Uses the chat completions API with `gpt-4o`, which accepts both text and
//! image input. Replies are requested in JSON mode and parsed through the
//! shared two-tier parser.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::parsing::parse_expense_response;
use super::types::ExpenseData;
use super::{ExpenseAnalyzer, EXTRACTION_PROMPT};

const DEFAULT_API_BASE: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o";
const MAX_TOKENS: u32 = 500;

/// OpenAI expense analysis provider
#[derive(Clone)]
pub struct OpenAiProvider {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
    default_currency: String,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
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
    /// Required: `OPENAI_API_KEY`
    /// Optional: `BASE_CURRENCY` (default: EUR)
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is required".into()))?;
        let currency = std::env::var("BASE_CURRENCY").unwrap_or_else(|_| "EUR".to_string());

        Ok(Self::new(&api_key, &currency))
    }

    async fn chat_completion(&self, request: &ChatCompletionRequest) -> Result<String> {
        let response = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Analysis(format!(
                "OpenAI returned {}: {}",
                status, body
            )));
        }

        let chat_response: ChatCompletionResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Analysis("No response from OpenAI API".into()))
    }
}

#[async_trait]
impl ExpenseAnalyzer for OpenAiProvider {
    async fn analyze(&self, text: Option<&str>, image: Option<&[u8]>) -> Result<ExpenseData> {
        if text.is_none() && image.is_none() {
            return Err(Error::Input(
                "At least one input (text or image) is required".into(),
            ));
        }

        let mut parts = Vec::new();
        if let Some(text) = text {
            parts.push(ContentPart::Text {
                text: format!("Analyze this expense information:\n\n{}", text),
            });
        }
        if let Some(image) = image {
            let base64_image = base64::engine::general_purpose::STANDARD.encode(image);
            parts.push(ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: format!("data:image/jpeg;base64,{}", base64_image),
                },
            });
        }

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: ChatContent::Text(EXTRACTION_PROMPT.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: ChatContent::Parts(parts),
                },
            ],
            response_format: Some(ResponseFormat {
                format_type: "json_object".to_string(),
            }),
            max_tokens: Some(MAX_TOKENS),
        };

        let response = self.chat_completion(&request).await?;
        debug!(response = %response, "OpenAI reply");

        Ok(parse_expense_response(&response, &self.default_currency))
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

/// Body posted to the chat completions endpoint
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// One conversation turn
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: ChatContent,
}

/// Turn payload, plain text or multimodal parts
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum ChatContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One part of a multimodal user turn
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

/// Inline data URL carrying the receipt image
#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

/// Forces the model to reply with a JSON object
#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

/// Response body, reduced to the fields extraction needs
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

/// One generated completion
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

/// Assistant message inside a choice
#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::ExpenseAnalyzer;

    #[test]
    fn test_from_env_missing_key() {
        std::env::remove_var("OPENAI_API_KEY");
        let result = OpenAiProvider::from_env();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_analyze_requires_input() {
        let provider = OpenAiProvider::new("test-key", "EUR");
        let result = provider.analyze(None, None).await;
        assert!(matches!(result, Err(Error::Input(_))));
    }

    #[test]
    fn test_request_serialization_shape() {
        let request = ChatCompletionRequest {
            model: "gpt-4o".to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: ChatContent::Parts(vec![
                    ContentPart::Text {
                        text: "hello".to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: "data:image/jpeg;base64,AAAA".to_string(),
                        },
                    },
                ]),
            }],
            response_format: Some(ResponseFormat {
                format_type: "json_object".to_string(),
            }),
            max_tokens: Some(500),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["content"][0]["type"], "text");
        assert_eq!(json["messages"][0]["content"][1]["type"], "image_url");
        assert_eq!(
            json["messages"][0]["content"][1]["image_url"]["url"],
            "data:image/jpeg;base64,AAAA"
        );
        assert_eq!(json["response_format"]["type"], "json_object");
    }
}
