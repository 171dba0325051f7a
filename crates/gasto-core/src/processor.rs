//! Expense assembly pipeline
//!
//! Orchestrates one pipeline run: normalized input goes to the AI analyzer,
//! the returned category name is resolved against the catalog, the amount is
//! normalized to the base currency, and the finished expense is persisted
//! and returned with its category joined. Steps run strictly in that order;
//! analysis failures abort the run, conversion problems never do.

use tracing::info;

use crate::ai::{AiClient, ExpenseAnalyzer};
use crate::currency::CurrencyConverter;
use crate::db::Database;
use crate::document::{DocumentKind, ProcessedDocument};
use crate::error::{Error, Result};
use crate::models::{round_to_minor_units, ExpenseWithCategory, NewExpense};

/// Runs the analyze-normalize-persist pipeline
#[derive(Clone)]
pub struct ExpenseProcessor {
    db: Database,
    analyzer: AiClient,
    currency: CurrencyConverter,
}

impl ExpenseProcessor {
    pub fn new(db: Database, analyzer: AiClient, currency: CurrencyConverter) -> Self {
        Self {
            db,
            analyzer,
            currency,
        }
    }

    /// The currency stored amounts are normalized to
    pub fn base_currency(&self) -> &str {
        self.currency.base_currency()
    }

    /// Model identifier of the configured analyzer
    pub fn model(&self) -> &str {
        self.analyzer.model()
    }

    /// Host the configured analyzer talks to
    pub fn host(&self) -> &str {
        self.analyzer.host()
    }

    /// Process an expense from text, image, and/or PDF-extracted text
    ///
    /// PDF text takes precedence over plain text when both are present.
    /// The stored `converted_amount` equals the amount verbatim for
    /// base-currency expenses and the rate-converted amount rounded to the
    /// base currency's minor units otherwise.
    pub async fn process_expense(
        &self,
        text: Option<&str>,
        image: Option<&[u8]>,
        pdf_text: Option<&str>,
    ) -> Result<ExpenseWithCategory> {
        let analysis_text = pdf_text.or(text);

        let data = self.analyzer.analyze(analysis_text, image).await?;

        let category = self.db.get_or_create_category(&data.category_name)?;

        let currency = data.currency.to_uppercase();
        let base_currency = self.currency.base_currency().to_string();
        let converted_amount = if currency != base_currency {
            let converted = self
                .currency
                .convert(data.amount, &currency, None, Some(data.date))
                .await;
            round_to_minor_units(converted, &base_currency)
        } else {
            data.amount
        };

        let id = self.db.insert_expense(&NewExpense {
            amount: data.amount,
            currency,
            converted_amount,
            base_currency,
            description: data.description,
            date: data.date,
            category_id: category.id,
        })?;

        let expense = self
            .db
            .get_expense(id)?
            .ok_or_else(|| Error::NotFound(format!("Expense {} missing after insert", id)))?;

        info!(
            id,
            amount = expense.expense.amount,
            currency = %expense.expense.currency,
            category = %expense.category.name,
            "Expense created"
        );

        Ok(expense)
    }

    /// Process a normalized document through the pipeline
    pub async fn process_document(
        &self,
        document: &ProcessedDocument,
    ) -> Result<ExpenseWithCategory> {
        match document.kind {
            DocumentKind::Text => {
                self.process_expense(document.text_content.as_deref(), None, None)
                    .await
            }
            DocumentKind::Image => {
                self.process_expense(None, document.image_bytes.as_deref(), None)
                    .await
            }
            DocumentKind::Pdf => {
                self.process_expense(None, None, document.text_content.as_deref())
                    .await
            }
        }
    }
}
