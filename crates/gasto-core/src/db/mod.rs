//! SQLite persistence behind an r2d2 pool, with idempotent migrations
//!
//! Operations are split by table:
//! - `categories` - Category lookup, creation, and the seeded system set
//! - `expenses` - Expense CRUD, listing, and monthly reporting

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::Result;

mod categories;
mod expenses;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Turn a "YYYY-MM-DD HH:MM:SS" audit column into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Handle to the expense store, cheap to clone
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
}

impl Database {
    /// Create a new database connection pool, running migrations and seeding
    /// the system categories on first use
    pub fn new(path: &str) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;
        db.seed_system_categories()?;

        Ok(db)
    }

    /// Path of the backing database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Backed by a unique temp file instead of `:memory:`, since every
    /// pooled connection to `:memory:` would open its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!(
            "{}/gasto_test_{}_{}.db",
            std::env::temp_dir().display(),
            std::process::id(),
            id
        );

        // A leftover file from a crashed run would leak old rows
        let _ = std::fs::remove_file(&path);

        Self::new(&path)
    }

    /// Check out a pooled connection
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- WAL keeps readers unblocked during writes; expect -wal/-shm
            -- sidecar files next to the database
            PRAGMA journal_mode = WAL;

            -- ~8MB page cache
            PRAGMA cache_size = 2000;

            -- NORMAL is durable enough under WAL
            PRAGMA synchronous = NORMAL;

            -- Report queries build temp structures; keep them off disk
            PRAGMA temp_store = MEMORY;

            -- Categories (system set plus user-defined)
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                description TEXT,
                is_system BOOLEAN NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Expenses (original and base-currency amounts side by side)
            CREATE TABLE IF NOT EXISTS expenses (
                id INTEGER PRIMARY KEY,
                amount REAL NOT NULL,
                currency TEXT NOT NULL,                    -- 3-letter uppercase code
                converted_amount REAL NOT NULL,
                base_currency TEXT NOT NULL,               -- 3-letter uppercase code
                description TEXT NOT NULL,
                date DATE NOT NULL,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date);
            CREATE INDEX IF NOT EXISTS idx_expenses_category ON expenses(category_id);
            CREATE INDEX IF NOT EXISTS idx_expenses_created ON expenses(created_at);
            "#,
        )?;

        info!("Expense schema ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests;
