//! Database bootstrap and status commands, plus the shared `open_db` helper

use std::path::Path;

use anyhow::{Context, Result};
use gasto_core::ai::{AiClient, ExpenseAnalyzer};
use gasto_core::db::Database;

/// Open the database, running migrations and seeding categories on first use
pub fn open_db(db_path: &Path) -> Result<Database> {
    tracing::debug!("Opening database at {}", db_path.display());
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    Database::new(path_str).context("Failed to open database")
}

pub fn cmd_init(db_path: &Path) -> Result<()> {
    println!("🔧 Creating expense database at {}...", db_path.display());

    let db = open_db(db_path)?;

    let categories = db.list_categories()?;
    println!("   Seeded {} system categories", categories.len());

    println!("✅ Database ready!");
    println!();
    println!("Next steps:");
    println!("  1. Record an expense: gasto add \"Taxi to the airport 23.50 EUR\"");
    println!("  2. Start the API:     gasto serve");

    Ok(())
}

pub fn cmd_status(db_path: &Path) -> Result<()> {
    use std::fs;

    println!();
    println!("📊 Gasto Status");
    println!("   ─────────────────────────────────────────────────────────────");

    println!("   Database: {}", db_path.display());

    if db_path.exists() {
        if let Ok(metadata) = fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }

        match open_db(db_path) {
            Ok(db) => {
                let expenses = db.count_expenses()?;
                let categories = db.list_categories()?;
                println!("   Expenses: {}", expenses);
                println!("   Categories: {}", categories.len());
            }
            Err(e) => {
                println!("   ❌ Cannot open database: {}", e);
            }
        }
    } else {
        println!("   Size: (not created yet, run 'gasto init')");
    }

    println!();
    match AiClient::from_env() {
        Ok(client) => {
            println!("   AI provider: {} ({})", client.model(), client.host());
        }
        Err(e) => {
            println!("   ❌ AI provider: {}", e);
            println!("      Set OPENAI_API_KEY or ANTHROPIC_API_KEY");
        }
    }

    let base_currency = std::env::var("BASE_CURRENCY")
        .unwrap_or_else(|_| "EUR".to_string())
        .to_uppercase();
    println!("   Base currency: {}", base_currency);
    if std::env::var("EXCHANGE_RATE_API_KEY").is_ok() {
        println!("   Exchange rates: API key configured");
    } else {
        println!("   Exchange rates: open access (no API key)");
    }

    println!();
    Ok(())
}
