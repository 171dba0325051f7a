//! Category and report command implementations

use anyhow::Result;
use chrono::{Datelike, Local};

use gasto_core::db::Database;

pub fn cmd_categories(db: &Database) -> Result<()> {
    let categories = db.list_categories()?;

    println!();
    println!("🏷️  Categories");
    println!("   ─────────────────────────────────────────────────────────────");

    for category in categories {
        let marker = if category.is_system { "" } else { " (custom)" };
        match category.description {
            Some(desc) => println!("   {:<16} {}{}", category.name, desc, marker),
            None => println!("   {}{}", category.name, marker),
        }
    }

    Ok(())
}

pub fn cmd_report(db: &Database, year: Option<i32>, month: Option<u32>) -> Result<()> {
    // Expense dates use the local calendar, so the default month does too
    let today = Local::now().date_naive();
    let year = year.unwrap_or(today.year());
    let month = month.unwrap_or(today.month());

    if !(1..=12).contains(&month) {
        anyhow::bail!("Month must be between 1 and 12");
    }

    let base_currency = std::env::var("BASE_CURRENCY")
        .unwrap_or_else(|_| "EUR".to_string())
        .to_uppercase();
    let report = db.monthly_report(year, month, &base_currency)?;

    println!();
    println!("📅 Report for {}-{:02}", report.year, report.month);
    println!("   ─────────────────────────────────────────────────────────────");

    if report.categories.is_empty() {
        println!("   No expenses recorded for this month.");
        return Ok(());
    }

    for entry in &report.categories {
        println!(
            "   {:<16} {:>10.2} {} ({} expense{})",
            entry.category_name,
            entry.total,
            report.base_currency,
            entry.count,
            if entry.count == 1 { "" } else { "s" }
        );
    }

    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {:<16} {:>10.2} {}",
        "Total", report.total, report.base_currency
    );

    Ok(())
}
