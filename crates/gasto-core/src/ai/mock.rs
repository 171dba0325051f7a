//! Mock provider for testing
//!
//! Extracts expense fields from the input text with simple heuristics
//! instead of calling a remote model. Useful for unit tests and for
//! development without API keys.

use async_trait::async_trait;
use chrono::Local;
use regex::Regex;

use crate::error::{Error, Result};

use super::types::ExpenseData;
use super::ExpenseAnalyzer;

/// Mock expense analyzer
///
/// Returns predictable results derived from the input text. Image input is
/// accepted but only acknowledged in the description.
#[derive(Clone)]
pub struct MockProvider {
    default_currency: String,
}

impl MockProvider {
    /// Create a new mock provider
    pub fn new(default_currency: &str) -> Self {
        Self {
            default_currency: default_currency.to_uppercase(),
        }
    }

    fn guess_category(text: &str) -> &'static str {
        let lower = text.to_lowercase();
        match lower.as_str() {
            t if t.contains("taxi") || t.contains("uber") || t.contains("bus") => "Transporte",
            t if t.contains("hotel") || t.contains("airbnb") => "Alojamiento",
            t if t.contains("farmacia") || t.contains("pharmacy") => "Salud",
            t if t.contains("cine") || t.contains("concert") => "Entretenimiento",
            t if t.contains("restaurant") || t.contains("cafe") || t.contains("lunch") => "Comida",
            t if t.contains("internet") || t.contains("subscription") => "Servicios",
            _ => "Otros",
        }
    }

    fn guess_amount(text: &str) -> f64 {
        let amount_re = Regex::new(r"(\d+(?:[.,]\d{1,2})?)").expect("valid regex");
        amount_re
            .captures(text)
            .and_then(|c| c[1].replace(',', ".").parse().ok())
            .unwrap_or(0.0)
    }

    fn guess_currency(&self, text: &str) -> String {
        let code_re = Regex::new(r"\b([A-Z]{3})\b").expect("valid regex");
        if text.contains('€') {
            "EUR".to_string()
        } else if text.contains('$') {
            "USD".to_string()
        } else if text.contains('£') {
            "GBP".to_string()
        } else if let Some(c) = code_re.captures(text) {
            c[1].to_string()
        } else {
            self.default_currency.clone()
        }
    }
}

#[async_trait]
impl ExpenseAnalyzer for MockProvider {
    async fn analyze(&self, text: Option<&str>, image: Option<&[u8]>) -> Result<ExpenseData> {
        if text.is_none() && image.is_none() {
            return Err(Error::Input(
                "At least one input (text or image) is required".into(),
            ));
        }

        let text = text.unwrap_or("");
        let description = if text.is_empty() {
            "Scanned receipt".to_string()
        } else {
            text.lines().next().unwrap_or("Expense").trim().to_string()
        };

        Ok(ExpenseData {
            amount: Self::guess_amount(text),
            currency: self.guess_currency(text),
            description,
            date: Local::now().date_naive(),
            category_name: Self::guess_category(text).to_string(),
        })
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_extracts_amount_and_category() {
        let provider = MockProvider::new("EUR");
        let data = provider
            .analyze(Some("Taxi to the airport 23,50 €"), None)
            .await
            .unwrap();

        assert_eq!(data.amount, 23.5);
        assert_eq!(data.currency, "EUR");
        assert_eq!(data.category_name, "Transporte");
    }

    #[tokio::test]
    async fn test_mock_currency_from_code() {
        let provider = MockProvider::new("EUR");
        let data = provider
            .analyze(Some("Hotel night 120.00 MXN"), None)
            .await
            .unwrap();

        assert_eq!(data.currency, "MXN");
        assert_eq!(data.category_name, "Alojamiento");
    }

    #[tokio::test]
    async fn test_mock_defaults() {
        let provider = MockProvider::new("usd");
        let data = provider.analyze(None, Some(&[0xFF, 0xD8])).await.unwrap();

        assert_eq!(data.amount, 0.0);
        assert_eq!(data.currency, "USD");
        assert_eq!(data.description, "Scanned receipt");
        assert_eq!(data.category_name, "Otros");
    }
}
