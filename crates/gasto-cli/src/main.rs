//! Gasto CLI - AI-powered expense tracker
//!
//! Usage:
//!   gasto init                     Initialize database
//!   gasto add "Taxi 23.50 EUR"     Record an expense from text
//!   gasto report                   Show this month's spending
//!   gasto serve --port 3000        Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose, which wins over the info default
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db),
        Commands::Add { text } => commands::cmd_add(&cli.db, &text).await,
        Commands::Expenses { limit } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_expenses(&db, limit)
        }
        Commands::Categories => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_categories(&db)
        }
        Commands::Report { year, month } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_report(&db, year, month)
        }
        Commands::Export { output, from, to } => {
            let db = commands::open_db(&cli.db)?;
            commands::cmd_export(&db, &output, from.as_deref(), to.as_deref())
        }
        Commands::Serve { port, host } => commands::cmd_serve(&cli.db, &host, port).await,
        Commands::Status => commands::cmd_status(&cli.db),
    }
}
