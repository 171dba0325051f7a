//! Clap argument surface for the `gasto` binary
//!
//! Only parsing lives here; the behavior behind each subcommand sits in
//! the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Gasto - Turn receipts and one-liners into categorized expenses
#[derive(Parser)]
#[command(name = "gasto")]
#[command(about = "AI-powered expense tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to the expense database file
    #[arg(long, default_value = "gasto.db", global = true)]
    pub db: PathBuf,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and seed the category set
    Init,

    /// Record an expense from free-form text
    Add {
        /// Expense text, e.g. "Taxi to the airport 23.50 EUR"
        text: String,
    },

    /// List recent expenses
    Expenses {
        /// Maximum number of expenses to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// List categories
    Categories,

    /// Show monthly spending by category
    Report {
        /// Report year (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,

        /// Report month 1-12 (defaults to the current month)
        #[arg(long)]
        month: Option<u32>,
    },

    /// Export expenses as CSV
    Export {
        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Earliest date to include (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Latest date to include (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
    },

    /// Serve the REST API
    Serve {
        /// Port for the HTTP listener
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Show database status and provider configuration
    Status,
}
