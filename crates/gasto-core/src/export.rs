//! CSV export for expenses
//!
//! Produces a plain CSV with one row per expense, both the original and the
//! converted amount, and the category name. Fields containing commas,
//! quotes, or newlines are quoted.

use chrono::NaiveDate;

use crate::db::Database;
use crate::error::Result;

/// Options for expense export
#[derive(Debug, Clone, Default)]
pub struct ExpenseExportOptions {
    /// Lower date bound, inclusive
    pub from: Option<NaiveDate>,
    /// Upper date bound, inclusive
    pub to: Option<NaiveDate>,
}

impl Database {
    /// Export expenses to CSV format
    pub fn export_expenses_csv(&self, opts: &ExpenseExportOptions) -> Result<String> {
        let expenses = self.expenses_in_range(opts.from, opts.to)?;

        let mut csv = String::from(
            "date,description,amount,currency,converted_amount,base_currency,category\n",
        );

        for item in expenses {
            let expense = &item.expense;
            csv.push_str(&format!(
                "{},{},{:.2},{},{:.2},{},{}\n",
                expense.date,
                escape_csv_field(&expense.description),
                expense.amount,
                expense.currency,
                expense.converted_amount,
                expense.base_currency,
                escape_csv_field(&item.category.name)
            ));
        }

        Ok(csv)
    }
}

/// Quote a field when it would otherwise break the row
fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewExpense;

    fn insert(db: &Database, date: &str, description: &str, amount: f64) {
        let category = db.get_category_by_name("Comida").unwrap().unwrap();
        db.insert_expense(&NewExpense {
            amount,
            currency: "EUR".to_string(),
            converted_amount: amount,
            base_currency: "EUR".to_string(),
            description: description.to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            category_id: category.id,
        })
        .unwrap();
    }

    #[test]
    fn test_csv_quoting() {
        assert_eq!(escape_csv_field("Panaderia"), "Panaderia");
        assert_eq!(escape_csv_field("Cafe, con leche"), "\"Cafe, con leche\"");
        assert_eq!(
            escape_csv_field("menu \"del dia\""),
            "\"menu \"\"del dia\"\"\""
        );
        assert_eq!(
            escape_csv_field("line one\nline two"),
            "\"line one\nline two\""
        );
    }

    #[test]
    fn test_export_empty_db_has_header_only() {
        let db = Database::in_memory().unwrap();

        let csv = db
            .export_expenses_csv(&ExpenseExportOptions::default())
            .unwrap();

        assert_eq!(
            csv,
            "date,description,amount,currency,converted_amount,base_currency,category\n"
        );
    }

    #[test]
    fn test_export_rows_and_quoting() {
        let db = Database::in_memory().unwrap();
        insert(&db, "2024-06-15", "Lunch, with colleagues", 24.5);

        let csv = db
            .export_expenses_csv(&ExpenseExportOptions::default())
            .unwrap();

        assert!(csv.contains("2024-06-15,\"Lunch, with colleagues\",24.50,EUR,24.50,EUR,Comida\n"));
    }

    #[test]
    fn test_export_date_filter() {
        let db = Database::in_memory().unwrap();
        insert(&db, "2024-06-10", "early", 1.0);
        insert(&db, "2024-06-15", "inside", 2.0);
        insert(&db, "2024-06-20", "late", 3.0);

        let csv = db
            .export_expenses_csv(&ExpenseExportOptions {
                from: Some(NaiveDate::from_ymd_opt(2024, 6, 12).unwrap()),
                to: Some(NaiveDate::from_ymd_opt(2024, 6, 18).unwrap()),
            })
            .unwrap();

        assert!(csv.contains("inside"));
        assert!(!csv.contains("early"));
        assert!(!csv.contains("late"));
    }
}
