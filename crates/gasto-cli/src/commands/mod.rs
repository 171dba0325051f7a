//! Implementations behind each `gasto` subcommand
//!
//! Split by area:
//! - `core` - init, status, and the shared `open_db` helper
//! - `expenses` - add, list, export
//! - `reports` - category listing and monthly summaries
//! - `serve` - runs the HTTP API

pub mod core;
pub mod expenses;
pub mod reports;
pub mod serve;

// Flat re-exports keep the dispatch in main.rs short
pub use core::*;
pub use expenses::*;
pub use reports::*;
pub use serve::*;

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated. Counts characters rather than bytes so accented descriptions
/// never split mid-character.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
