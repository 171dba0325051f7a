//! Parsing of AI provider replies into expense fields
//!
//! Models are instructed to reply with a single JSON object, but real
//! replies range from clean JSON to JSON buried in prose to outright
//! malformed output. Parsing is two-tier: extract and parse a JSON object
//! first, and fall back to per-field regex recovery when that fails. Every
//! field degrades independently to a documented default, so a partial reply
//! still produces usable expense data.

use chrono::{Local, NaiveDate};
use regex::Regex;
use serde_json::Value;

use super::types::ExpenseData;

/// Description used when the model did not provide one
const DEFAULT_DESCRIPTION: &str = "Expense";

/// Category used when the model did not provide one
const FALLBACK_CATEGORY: &str = "Otros";

/// Parse a provider reply into expense fields.
///
/// `base_currency` is the default applied when no currency can be
/// recovered. This function does not fail; unrecoverable fields take their
/// defaults (amount 0.0, description "Expense", date today, category
/// "Otros").
pub fn parse_expense_response(response: &str, base_currency: &str) -> ExpenseData {
    let response = response.trim();

    match parse_json_object(response) {
        Some(value) => expense_from_value(&value, base_currency),
        None => parse_fallback(response, base_currency),
    }
}

/// Try to parse the reply as a JSON object, accepting prose-wrapped JSON by
/// extracting the first balanced-brace substring
fn parse_json_object(response: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(response) {
        if value.is_object() {
            return Some(value);
        }
    }

    let candidate = extract_json_object(response)?;
    serde_json::from_str::<Value>(candidate)
        .ok()
        .filter(|v| v.is_object())
}

/// Find the first JSON object in free-form text by matching braces
fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let mut depth = 0;

    for (i, c) in response[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&response[start..=start + i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Map a parsed JSON object onto expense fields with per-field defaults
fn expense_from_value(value: &Value, base_currency: &str) -> ExpenseData {
    let amount = match value.get("amount") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };

    let currency = value
        .get("currency")
        .and_then(Value::as_str)
        .unwrap_or(base_currency)
        .to_uppercase();

    let description = value
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_DESCRIPTION)
        .to_string();

    let date = value
        .get("date")
        .and_then(Value::as_str)
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .unwrap_or_else(today);

    let category_name = value
        .get("category_name")
        .and_then(Value::as_str)
        .unwrap_or(FALLBACK_CATEGORY)
        .to_string();

    ExpenseData {
        amount,
        currency,
        description,
        date,
        category_name,
    }
}

/// Field-level regex recovery for replies where no JSON object parses
fn parse_fallback(response: &str, base_currency: &str) -> ExpenseData {
    let amount_re = Regex::new(r#""amount"\s*:\s*([\d.]+)"#).expect("valid regex");
    let currency_re = Regex::new(r#""currency"\s*:\s*"([A-Z]{3})""#).expect("valid regex");
    let date_re = Regex::new(r#""date"\s*:\s*"(\d{4}-\d{2}-\d{2})""#).expect("valid regex");
    let category_re = Regex::new(r#""category_name"\s*:\s*"([^"]+)""#).expect("valid regex");
    let desc_re = Regex::new(r#""description"\s*:\s*"([^"]+)""#).expect("valid regex");

    let amount = amount_re
        .captures(response)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0.0);

    let currency = currency_re
        .captures(response)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| base_currency.to_string())
        .to_uppercase();

    let date = date_re
        .captures(response)
        .and_then(|c| NaiveDate::parse_from_str(&c[1], "%Y-%m-%d").ok())
        .unwrap_or_else(today);

    let category_name = category_re
        .captures(response)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| FALLBACK_CATEGORY.to_string());

    let description = desc_re
        .captures(response)
        .map(|c| c[1].to_string())
        .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());

    ExpenseData {
        amount,
        currency,
        description,
        date,
        category_name,
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_clean_json() {
        let response = r#"{"amount": 42.5, "currency": "EUR", "description": "Cena con amigos", "date": "2024-06-01", "category_name": "Comida"}"#;
        let data = parse_expense_response(response, "EUR");

        assert_eq!(data.amount, 42.5);
        assert_eq!(data.currency, "EUR");
        assert_eq!(data.description, "Cena con amigos");
        assert_eq!(data.date, NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        assert_eq!(data.category_name, "Comida");
    }

    #[test]
    fn test_parse_json_wrapped_in_prose() {
        let response = r#"Sure! Here is the extracted data:
{"amount": 12.0, "currency": "usd", "description": "Taxi ride", "date": "2024-02-10", "category_name": "Transporte"}
Let me know if you need anything else."#;
        let data = parse_expense_response(response, "EUR");

        assert_eq!(data.amount, 12.0);
        // Lowercase codes are normalized
        assert_eq!(data.currency, "USD");
        assert_eq!(data.category_name, "Transporte");
    }

    #[test]
    fn test_parse_json_with_nested_braces() {
        let response = r#"{"amount": 5, "currency": "EUR", "description": "extra {detail}", "date": "2024-01-01", "category_name": "Otros"} trailing"#;
        let data = parse_expense_response(response, "EUR");

        assert_eq!(data.amount, 5.0);
        assert_eq!(data.description, "extra {detail}");
    }

    #[test]
    fn test_parse_amount_as_string() {
        let response = r#"{"amount": "19.99", "currency": "GBP", "description": "Book", "date": "2024-03-03", "category_name": "Compras"}"#;
        let data = parse_expense_response(response, "EUR");

        assert_eq!(data.amount, 19.99);
        assert_eq!(data.currency, "GBP");
    }

    #[test]
    fn test_parse_missing_fields_take_defaults() {
        let response = r#"{"amount": 8.0}"#;
        let data = parse_expense_response(response, "EUR");

        assert_eq!(data.amount, 8.0);
        assert_eq!(data.currency, "EUR");
        assert_eq!(data.description, "Expense");
        assert_eq!(data.category_name, "Otros");
        assert_eq!(data.date, Local::now().date_naive());
    }

    #[test]
    fn test_parse_invalid_date_defaults_to_today() {
        let response = r#"{"amount": 3.5, "currency": "EUR", "description": "Coffee", "date": "last tuesday", "category_name": "Comida"}"#;
        let data = parse_expense_response(response, "EUR");

        assert_eq!(data.date, Local::now().date_naive());
    }

    #[test]
    fn test_fallback_recovers_partial_fields() {
        // Trailing garbage makes this unparseable as JSON, but amount and
        // category are still recoverable field by field
        let response = r#"{"amount": 30.5, "category_name": "Salud", oops"#;
        let data = parse_expense_response(response, "EUR");

        assert_eq!(data.amount, 30.5);
        assert_eq!(data.category_name, "Salud");
        assert_eq!(data.currency, "EUR");
        assert_eq!(data.description, "Expense");
        assert_eq!(data.date, Local::now().date_naive());
    }

    #[test]
    fn test_fallback_ignores_lowercase_currency() {
        // The fallback currency pattern only accepts uppercase codes
        let response = r#""amount": 10, "currency": "eur" and some noise"#;
        let data = parse_expense_response(response, "USD");

        assert_eq!(data.amount, 10.0);
        assert_eq!(data.currency, "USD");
    }

    #[test]
    fn test_unparseable_response_all_defaults() {
        let data = parse_expense_response("I could not process that receipt.", "EUR");

        assert_eq!(data.amount, 0.0);
        assert_eq!(data.currency, "EUR");
        assert_eq!(data.description, "Expense");
        assert_eq!(data.category_name, "Otros");
        assert_eq!(data.date, Local::now().date_naive());
    }

    #[test]
    fn test_base_currency_default_is_uppercased() {
        let data = parse_expense_response("nothing here", "eur");
        assert_eq!(data.currency, "EUR");
    }
}
