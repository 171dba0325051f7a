//! Expense command implementations (add, list, export)

use std::path::Path;

use anyhow::{Context, Result};

use gasto_core::ai::{AiClient, ExpenseAnalyzer};
use gasto_core::currency::CurrencyConverter;
use gasto_core::db::Database;
use gasto_core::export::ExpenseExportOptions;
use gasto_core::processor::ExpenseProcessor;

use super::{open_db, truncate};

/// Run the full pipeline for a text expense and print the result
pub async fn cmd_add(db_path: &Path, text: &str) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        anyhow::bail!("Expense text must not be empty");
    }

    let db = open_db(db_path)?;
    let analyzer = AiClient::from_env().context("Failed to configure AI provider")?;
    let currency = CurrencyConverter::from_env();
    tracing::debug!("Provider endpoint: {}", analyzer.host());

    println!("🧾 Analyzing expense with {}...", analyzer.model());

    let processor = ExpenseProcessor::new(db, analyzer, currency);
    let item = processor.process_expense(Some(text), None, None).await?;

    let expense = &item.expense;
    println!();
    println!("✅ Expense recorded:");
    println!(
        "   {} │ {:>8.2} {} │ {}",
        expense.date, expense.amount, expense.currency, expense.description
    );
    if expense.currency != expense.base_currency {
        println!(
            "   Converted: {:.2} {}",
            expense.converted_amount, expense.base_currency
        );
    }
    println!("   Category: {}", item.category.name);

    Ok(())
}

pub fn cmd_expenses(db: &Database, limit: i64) -> Result<()> {
    let expenses = db.list_expenses(limit, 0)?;

    if expenses.is_empty() {
        println!("No expenses recorded yet. Add one with:");
        println!("  gasto add \"Taxi to the airport 23.50 EUR\"");
        return Ok(());
    }

    println!();
    println!("💸 Recent Expenses");
    println!("   ─────────────────────────────────────────────────────────────");

    for item in expenses {
        let expense = &item.expense;
        println!(
            "   [{}] {} │ {:>8.2} {} │ {:<14} │ {}",
            expense.id,
            expense.date,
            expense.amount,
            expense.currency,
            item.category.name,
            truncate(&expense.description, 36)
        );
    }

    Ok(())
}

pub fn cmd_export(
    db: &Database,
    output: &Path,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<()> {
    let from_date = from
        .map(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("Invalid --from date format (use YYYY-MM-DD)")?;
    let to_date = to
        .map(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("Invalid --to date format (use YYYY-MM-DD)")?;

    let csv = db.export_expenses_csv(&ExpenseExportOptions {
        from: from_date,
        to: to_date,
    })?;
    let rows = csv.lines().count().saturating_sub(1);

    std::fs::write(output, &csv)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("✅ Exported {} expenses to {}", rows, output.display());

    Ok(())
}
