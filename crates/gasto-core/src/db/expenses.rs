//! Expense operations and monthly reporting

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, CategoryTotal, Expense, ExpenseWithCategory, MonthlyReport, NewExpense};

/// Columns selected by every expense query, category joined
const EXPENSE_COLUMNS: &str = "e.id, e.amount, e.currency, e.converted_amount, e.base_currency,
        e.description, e.date, e.category_id, e.created_at, e.updated_at,
        c.id, c.name, c.description, c.is_system, c.created_at";

impl Database {
    /// Insert a new expense row
    pub fn insert_expense(&self, expense: &NewExpense) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO expenses (amount, currency, converted_amount, base_currency,
             description, date, category_id)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                expense.amount,
                expense.currency,
                expense.converted_amount,
                expense.base_currency,
                expense.description,
                expense.date.to_string(),
                expense.category_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Get an expense by ID with its category joined
    pub fn get_expense(&self, id: i64) -> Result<Option<ExpenseWithCategory>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM expenses e JOIN categories c ON c.id = e.category_id WHERE e.id = ?",
            EXPENSE_COLUMNS
        ))?;

        let expense = stmt
            .query_row(params![id], |row| Self::row_to_expense_with_category(row))
            .optional()?;

        Ok(expense)
    }

    /// List expenses newest first, categories joined
    pub fn list_expenses(&self, limit: i64, offset: i64) -> Result<Vec<ExpenseWithCategory>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM expenses e JOIN categories c ON c.id = e.category_id
             ORDER BY e.date DESC, e.id DESC LIMIT ? OFFSET ?",
            EXPENSE_COLUMNS
        ))?;

        let expenses = stmt
            .query_map(params![limit, offset], |row| {
                Self::row_to_expense_with_category(row)
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(expenses)
    }

    /// List expenses within an optional date range (inclusive), oldest first.
    /// Used by CSV export.
    pub fn expenses_in_range(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<ExpenseWithCategory>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM expenses e JOIN categories c ON c.id = e.category_id
             WHERE (?1 IS NULL OR e.date >= ?1) AND (?2 IS NULL OR e.date <= ?2)
             ORDER BY e.date ASC, e.id ASC",
            EXPENSE_COLUMNS
        ))?;

        let expenses = stmt
            .query_map(
                params![
                    from.map(|d| d.to_string()),
                    to.map(|d| d.to_string())
                ],
                |row| Self::row_to_expense_with_category(row),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(expenses)
    }

    /// Per-category totals over converted amounts for a date range (inclusive)
    pub fn category_totals(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<(f64, Vec<CategoryTotal>)> {
        let conn = self.conn()?;

        let total: f64 = conn.query_row(
            "SELECT COALESCE(SUM(converted_amount), 0) FROM expenses WHERE date BETWEEN ?1 AND ?2",
            params![from.to_string(), to.to_string()],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT c.name, COALESCE(SUM(e.converted_amount), 0), COUNT(*)
             FROM expenses e JOIN categories c ON c.id = e.category_id
             WHERE e.date BETWEEN ?1 AND ?2
             GROUP BY c.name ORDER BY 2 DESC",
        )?;

        let categories = stmt
            .query_map(params![from.to_string(), to.to_string()], |row| {
                Ok(CategoryTotal {
                    category_name: row.get(0)?,
                    total: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok((total, categories))
    }

    /// Monthly spending summary in the base currency
    pub fn monthly_report(
        &self,
        year: i32,
        month: u32,
        base_currency: &str,
    ) -> Result<MonthlyReport> {
        let from = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| Error::Input(format!("Invalid month: {}-{}", year, month)))?;
        let to = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| Error::Input(format!("Invalid month: {}-{}", year, month)))?;

        let (total, categories) = self.category_totals(from, to)?;

        Ok(MonthlyReport {
            year,
            month,
            base_currency: base_currency.to_string(),
            total,
            categories,
        })
    }

    /// Count of stored expenses
    pub fn count_expenses(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))?;
        Ok(count)
    }

    fn row_to_expense_with_category(row: &rusqlite::Row) -> rusqlite::Result<ExpenseWithCategory> {
        let date_str: String = row.get(6)?;
        let created_at_str: String = row.get(8)?;
        let updated_at_str: String = row.get(9)?;
        let category_created_str: String = row.get(14)?;

        Ok(ExpenseWithCategory {
            expense: Expense {
                id: row.get(0)?,
                amount: row.get(1)?,
                currency: row.get(2)?,
                converted_amount: row.get(3)?,
                base_currency: row.get(4)?,
                description: row.get(5)?,
                date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_default(),
                category_id: row.get(7)?,
                created_at: parse_datetime(&created_at_str),
                updated_at: parse_datetime(&updated_at_str),
            },
            category: Category {
                id: row.get(10)?,
                name: row.get(11)?,
                description: row.get(12)?,
                is_system: row.get(13)?,
                created_at: parse_datetime(&category_created_str),
            },
        })
    }
}
