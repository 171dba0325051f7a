//! Domain models for gasto

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// An expense category.
///
/// The system set is seeded at initialization; user-defined categories are
/// created on demand by the expense pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// True for the predefined seed set, false for user-created categories
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
}

/// A recorded expense with both the original and base-currency amounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    /// Amount as extracted, in `currency`
    pub amount: f64,
    /// 3-letter uppercase ISO 4217 code
    pub currency: String,
    /// Amount normalized into `base_currency`
    pub converted_amount: f64,
    pub base_currency: String,
    pub description: String,
    pub date: NaiveDate,
    pub category_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting a new expense row
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub amount: f64,
    pub currency: String,
    pub converted_amount: f64,
    pub base_currency: String,
    pub description: String,
    pub date: NaiveDate,
    pub category_id: i64,
}

/// An expense joined with its category, so callers can render the category
/// name without a second lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseWithCategory {
    #[serde(flatten)]
    pub expense: Expense,
    pub category: Category,
}

/// Per-category total for a reporting period, in the base currency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category_name: String,
    pub total: f64,
    pub count: i64,
}

/// Monthly spending summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub year: i32,
    pub month: u32,
    pub base_currency: String,
    pub total: f64,
    pub categories: Vec<CategoryTotal>,
}

/// Number of minor units (decimal places) for a currency code.
///
/// Covers the zero-decimal and three-decimal ISO 4217 outliers; everything
/// else uses two.
pub fn minor_units(currency: &str) -> u32 {
    match currency.to_uppercase().as_str() {
        "JPY" | "KRW" | "VND" | "CLP" | "ISK" => 0,
        "BHD" | "KWD" | "OMR" | "TND" | "JOD" => 3,
        _ => 2,
    }
}

/// Round an amount to the minor-unit precision of the given currency
pub fn round_to_minor_units(amount: f64, currency: &str) -> f64 {
    let factor = 10f64.powi(minor_units(currency) as i32);
    (amount * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minor_units() {
        assert_eq!(minor_units("EUR"), 2);
        assert_eq!(minor_units("usd"), 2);
        assert_eq!(minor_units("JPY"), 0);
        assert_eq!(minor_units("KWD"), 3);
    }

    #[test]
    fn test_round_to_minor_units() {
        assert_eq!(round_to_minor_units(10.456, "EUR"), 10.46);
        assert_eq!(round_to_minor_units(10.454, "EUR"), 10.45);
        assert_eq!(round_to_minor_units(1234.56, "JPY"), 1235.0);
        assert_eq!(round_to_minor_units(1.23456, "KWD"), 1.235);
    }
}
