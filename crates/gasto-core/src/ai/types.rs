//! Backend-agnostic types for AI expense analysis

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Structured expense fields extracted by an AI provider.
///
/// This is the contract every provider resolves to, regardless of how the
/// model formatted its reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseData {
    /// Monetary amount in `currency`
    pub amount: f64,
    /// 3-letter uppercase ISO 4217 code
    pub currency: String,
    /// Short description of what was purchased
    pub description: String,
    pub date: NaiveDate,
    /// One of the system category labels, or a free-form new label
    pub category_name: String,
}
