//! Gasto Core Library
//!
//! Shared functionality for the Gasto expense tracker:
//! - Database access and migrations
//! - Pluggable AI providers (OpenAI, Claude) for expense extraction
//! - Robust parsing of provider replies with regex fallbacks
//! - Currency conversion with date-scoped rate caching
//! - Document handling for receipt images, PDFs, and remote files
//! - Expense processing pipeline tying extraction to storage
//! - CSV export

pub mod ai;
pub mod currency;
pub mod db;
pub mod document;
pub mod error;
pub mod export;
pub mod models;
pub mod processor;

/// Test utilities including mock provider and rate servers
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    AiClient, ClaudeProvider, ExpenseAnalyzer, ExpenseData, MockProvider, OpenAiProvider,
    EXTRACTION_PROMPT,
};
pub use currency::CurrencyConverter;
pub use db::Database;
pub use document::{
    DocumentKind, DocumentMetadata, DocumentService, FileFetcher, ImageProcessor, PdfProcessor,
    ProcessedDocument,
};
pub use error::{Error, Result};
pub use export::ExpenseExportOptions;
pub use models::{
    Category, CategoryTotal, Expense, ExpenseWithCategory, MonthlyReport, NewExpense,
};
pub use processor::ExpenseProcessor;
