//! Category operations
//!
//! Categories come in two flavors: the predefined system set seeded at
//! initialization, and user-defined ones created on demand when the AI
//! labels an expense with a name we have not seen before.

use rusqlite::{params, OptionalExtension};
use tracing::debug;

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::Category;

/// Predefined system categories with their Spanish descriptions
const SYSTEM_CATEGORIES: [(&str, &str); 8] = [
    (
        "Comida",
        "Gastos en restaurantes, supermercados y alimentos",
    ),
    ("Transporte", "Taxi, autobús, metro, gasolina, peajes"),
    ("Alojamiento", "Hoteles, Airbnb, hospedaje"),
    ("Entretenimiento", "Cine, conciertos, eventos, hobbies"),
    ("Salud", "Medicinas, consultas médicas, seguro"),
    ("Compras", "Ropa, electrónicos, artículos varios"),
    ("Servicios", "Luz, agua, internet, suscripciones"),
    ("Otros", "Gastos varios no categorizados"),
];

impl Database {
    /// Seed the predefined system categories (idempotent)
    pub fn seed_system_categories(&self) -> Result<()> {
        let conn = self.conn()?;

        for (name, description) in &SYSTEM_CATEGORIES {
            conn.execute(
                "INSERT OR IGNORE INTO categories (name, description, is_system) VALUES (?, ?, 1)",
                params![name, description],
            )?;
        }

        Ok(())
    }

    /// Get a category by ID
    pub fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, is_system, created_at FROM categories WHERE id = ?",
        )?;

        let category = stmt
            .query_row(params![id], |row| Self::row_to_category(row))
            .optional()?;

        Ok(category)
    }

    /// Get a category by its exact name
    pub fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, is_system, created_at FROM categories WHERE name = ?",
        )?;

        let category = stmt
            .query_row(params![name], |row| Self::row_to_category(row))
            .optional()?;

        Ok(category)
    }

    /// Create a category
    pub fn create_category(
        &self,
        name: &str,
        description: Option<&str>,
        is_system: bool,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO categories (name, description, is_system) VALUES (?, ?, ?)",
            params![name, description, is_system],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Find a category by name, creating a user-defined one if it does not
    /// exist yet.
    ///
    /// Lookup-then-insert is not atomic; a concurrent insert of the same name
    /// trips the UNIQUE constraint, in which case the winner's row is
    /// re-fetched so both callers converge on the same category.
    pub fn get_or_create_category(&self, name: &str) -> Result<Category> {
        if let Some(category) = self.get_category_by_name(name)? {
            return Ok(category);
        }

        let description = format!("User-defined category: {}", name);
        match self.create_category(name, Some(&description), false) {
            Ok(id) => {
                debug!(category = name, id, "Created new category");
                self.get_category(id)?
                    .ok_or_else(|| Error::NotFound(format!("Category {} after insert", id)))
            }
            Err(Error::Database(rusqlite::Error::SqliteFailure(e, _)))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                // Lost the race; the other writer's row is the category now
                self.get_category_by_name(name)?
                    .ok_or_else(|| Error::NotFound(format!("Category '{}'", name)))
            }
            Err(e) => Err(e),
        }
    }

    /// List all categories, system set first, then alphabetical
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, is_system, created_at
             FROM categories ORDER BY is_system DESC, name ASC",
        )?;

        let categories = stmt
            .query_map([], |row| Self::row_to_category(row))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    fn row_to_category(row: &rusqlite::Row) -> rusqlite::Result<Category> {
        let created_at_str: String = row.get(4)?;

        Ok(Category {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            is_system: row.get(3)?,
            created_at: parse_datetime(&created_at_str),
        })
    }
}
