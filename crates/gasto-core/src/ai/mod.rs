//! Pluggable AI expense analysis
//!
//! This module provides a provider-agnostic interface for extracting
//! structured expense data from free-form text and receipt images.
//!
//! # Architecture
//!
//! - `ExpenseAnalyzer` trait: defines the analysis interface
//! - `AiClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Provider implementations: `OpenAiProvider`, `ClaudeProvider`, `MockProvider`
//!
//! # Usage
//!
//! ```rust,ignore
//! // Create from environment
//! let ai = AiClient::from_env()?;
//!
//! // Extract an expense from text
//! let data = ai.analyze(Some("Taxi to the airport 23.50 EUR"), None).await?;
//! println!("{} {} ({})", data.amount, data.currency, data.category_name);
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `AI_PROVIDER`: Provider to use (openai, claude). Default: openai
//! - `OPENAI_API_KEY`: API key, required for the openai provider
//! - `ANTHROPIC_API_KEY`: API key, required for the claude provider
//! - `BASE_CURRENCY`: Currency assumed when the model omits one (default: EUR)

mod claude;
mod mock;
mod openai;
pub mod parsing;
pub mod types;

pub use claude::ClaudeProvider;
pub use mock::MockProvider;
pub use openai::OpenAiProvider;
pub use types::ExpenseData;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// System prompt shared by all remote providers
///
/// The reply contract (exact JSON keys, fixed category list) is what the
/// response parser in [`parsing`] relies on.
pub const EXTRACTION_PROMPT: &str = "You are an expense analysis assistant. Extract the following information from the provided expense data:
- amount: The monetary amount (as a float number)
- currency: The currency code (ISO 4217, e.g., EUR, USD, GBP)
- description: A clear, concise description of what was purchased
- date: The date of the expense in YYYY-MM-DD format (use today's date if not found)
- category_name: One of these exact categories: Comida, Transporte, Alojamiento, Entretenimiento, Salud, Compras, Servicios, Otros

Return ONLY a valid JSON object with these exact keys: amount, currency, description, date, category_name.
Do not include any other text or explanation.";

/// Trait defining the interface for all analysis providers
///
/// Providers must be Send + Sync to allow use across async tasks.
#[async_trait]
pub trait ExpenseAnalyzer: Send + Sync {
    /// Extract structured expense data from text and/or image input
    ///
    /// At least one of the two inputs must be provided. Images are expected
    /// to be JPEG-encoded bytes.
    async fn analyze(&self, text: Option<&str>, image: Option<&[u8]>) -> Result<ExpenseData>;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Normalize a raw `AI_PROVIDER` value
///
/// Env files often carry trailing comments or quoting. Lowercases, cuts
/// everything after `#`, and strips surrounding quotes.
fn sanitize_provider(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let mut name = lowered.trim();
    if let Some(before_comment) = name.split('#').next() {
        name = before_comment.trim();
    }
    name.trim_matches(|c| c == '"' || c == '\'').to_string()
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
/// All variants implement the same ExpenseAnalyzer operations.
#[derive(Clone)]
pub enum AiClient {
    /// OpenAI chat completions (gpt-4o)
    OpenAi(OpenAiProvider),
    /// Anthropic messages API (claude-3-5-sonnet)
    Claude(ClaudeProvider),
    /// Mock provider for testing
    Mock(MockProvider),
}

impl AiClient {
    /// Create an AI client from environment variables
    ///
    /// Checks `AI_PROVIDER` to determine which provider to use:
    /// - `openai` (default): requires OPENAI_API_KEY
    /// - `claude`: requires ANTHROPIC_API_KEY
    ///
    /// Any other value is a configuration error. Missing API keys are
    /// reported at startup rather than on the first request.
    pub fn from_env() -> Result<Self> {
        let raw = std::env::var("AI_PROVIDER").unwrap_or_else(|_| "openai".to_string());

        match sanitize_provider(&raw).as_str() {
            "openai" => Ok(AiClient::OpenAi(OpenAiProvider::from_env()?)),
            "claude" => Ok(AiClient::Claude(ClaudeProvider::from_env()?)),
            other => Err(Error::Config(format!(
                "Unknown AI provider: '{}'. Use 'openai' or 'claude'",
                other
            ))),
        }
    }

    /// Create a mock provider for testing
    pub fn mock() -> Self {
        AiClient::Mock(MockProvider::new("EUR"))
    }
}

// Implement ExpenseAnalyzer for AiClient by delegating to the inner provider
#[async_trait]
impl ExpenseAnalyzer for AiClient {
    async fn analyze(&self, text: Option<&str>, image: Option<&[u8]>) -> Result<ExpenseData> {
        match self {
            AiClient::OpenAi(p) => p.analyze(text, image).await,
            AiClient::Claude(p) => p.analyze(text, image).await,
            AiClient::Mock(p) => p.analyze(text, image).await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AiClient::OpenAi(p) => p.model(),
            AiClient::Claude(p) => p.model(),
            AiClient::Mock(p) => p.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AiClient::OpenAi(p) => p.host(),
            AiClient::Claude(p) => p.host(),
            AiClient::Mock(p) => p.host(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_provider() {
        assert_eq!(sanitize_provider("openai"), "openai");
        assert_eq!(sanitize_provider("  OpenAI  "), "openai");
        assert_eq!(sanitize_provider("claude # production key"), "claude");
        assert_eq!(sanitize_provider("\"claude\""), "claude");
        assert_eq!(sanitize_provider("'openai'"), "openai");
        assert_eq!(sanitize_provider("gpt"), "gpt");
    }

    #[test]
    fn test_ai_client_mock() {
        let client = AiClient::mock();
        assert_eq!(client.model(), "mock");
        assert_eq!(client.host(), "local");
    }

    #[tokio::test]
    async fn test_mock_analyze_through_client() {
        let client = AiClient::mock();
        let data = client
            .analyze(Some("Pharmacy 12.00 EUR"), None)
            .await
            .unwrap();
        assert_eq!(data.amount, 12.0);
        assert_eq!(data.category_name, "Salud");
    }
}
