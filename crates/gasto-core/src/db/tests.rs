//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_expense(date: &str, category_id: i64, converted: f64) -> NewExpense {
        NewExpense {
            amount: converted,
            currency: "EUR".to_string(),
            converted_amount: converted,
            base_currency: "EUR".to_string(),
            description: "Test expense".to_string(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            category_id,
        }
    }

    #[test]
    fn test_system_categories_seeded() {
        let db = Database::in_memory().unwrap();

        let categories = db.list_categories().unwrap();
        assert_eq!(categories.len(), 8);
        assert!(categories.iter().all(|c| c.is_system));
        assert!(categories.iter().any(|c| c.name == "Comida"));
        assert!(categories.iter().any(|c| c.name == "Otros"));

        // Seeding again must not duplicate
        db.seed_system_categories().unwrap();
        assert_eq!(db.list_categories().unwrap().len(), 8);
    }

    #[test]
    fn test_get_or_create_category_reuses_existing() {
        let db = Database::in_memory().unwrap();

        let seeded = db.get_or_create_category("Comida").unwrap();
        assert!(seeded.is_system);

        let created = db.get_or_create_category("Mascotas").unwrap();
        assert!(!created.is_system);
        assert_eq!(
            created.description.as_deref(),
            Some("User-defined category: Mascotas")
        );

        // Second call resolves to the same row
        let again = db.get_or_create_category("Mascotas").unwrap();
        assert_eq!(created.id, again.id);
        assert_eq!(db.list_categories().unwrap().len(), 9);
    }

    #[test]
    fn test_category_name_unique_constraint() {
        let db = Database::in_memory().unwrap();

        db.create_category("Viajes", None, false).unwrap();
        let result = db.create_category("Viajes", None, false);
        assert!(result.is_err(), "Duplicate category name should fail");

        // get_or_create converges on the existing row instead of failing
        let category = db.get_or_create_category("Viajes").unwrap();
        assert_eq!(category.name, "Viajes");
    }

    #[test]
    fn test_expense_round_trip_with_category() {
        let db = Database::in_memory().unwrap();
        let category = db.get_or_create_category("Comida").unwrap();

        let new_expense = NewExpense {
            amount: 25.5,
            currency: "USD".to_string(),
            converted_amount: 23.41,
            base_currency: "EUR".to_string(),
            description: "Lunch at the airport".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            category_id: category.id,
        };

        let id = db.insert_expense(&new_expense).unwrap();
        assert!(id > 0);

        let stored = db.get_expense(id).unwrap().unwrap();
        assert_eq!(stored.expense.amount, 25.5);
        assert_eq!(stored.expense.currency, "USD");
        assert_eq!(stored.expense.converted_amount, 23.41);
        assert_eq!(stored.expense.base_currency, "EUR");
        assert_eq!(
            stored.expense.date,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
        assert_eq!(stored.category.name, "Comida");
    }

    #[test]
    fn test_get_expense_missing() {
        let db = Database::in_memory().unwrap();
        assert!(db.get_expense(999).unwrap().is_none());
    }

    #[test]
    fn test_list_expenses_newest_first() {
        let db = Database::in_memory().unwrap();
        let category = db.get_or_create_category("Transporte").unwrap();

        db.insert_expense(&sample_expense("2024-01-10", category.id, 10.0))
            .unwrap();
        db.insert_expense(&sample_expense("2024-03-05", category.id, 30.0))
            .unwrap();
        db.insert_expense(&sample_expense("2024-02-20", category.id, 20.0))
            .unwrap();

        let expenses = db.list_expenses(10, 0).unwrap();
        assert_eq!(expenses.len(), 3);
        assert_eq!(
            expenses[0].expense.date,
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
        );
        assert_eq!(
            expenses[2].expense.date,
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
        );

        let limited = db.list_expenses(1, 1).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(
            limited[0].expense.date,
            NaiveDate::from_ymd_opt(2024, 2, 20).unwrap()
        );
    }

    #[test]
    fn test_expenses_in_range() {
        let db = Database::in_memory().unwrap();
        let category = db.get_or_create_category("Salud").unwrap();

        db.insert_expense(&sample_expense("2024-01-10", category.id, 10.0))
            .unwrap();
        db.insert_expense(&sample_expense("2024-02-15", category.id, 20.0))
            .unwrap();
        db.insert_expense(&sample_expense("2024-03-20", category.id, 30.0))
            .unwrap();

        let all = db.expenses_in_range(None, None).unwrap();
        assert_eq!(all.len(), 3);

        let from_feb = db
            .expenses_in_range(NaiveDate::from_ymd_opt(2024, 2, 1), None)
            .unwrap();
        assert_eq!(from_feb.len(), 2);

        let feb_only = db
            .expenses_in_range(
                NaiveDate::from_ymd_opt(2024, 2, 1),
                NaiveDate::from_ymd_opt(2024, 2, 29),
            )
            .unwrap();
        assert_eq!(feb_only.len(), 1);
        assert_eq!(feb_only[0].expense.converted_amount, 20.0);
    }

    #[test]
    fn test_monthly_report_totals() {
        let db = Database::in_memory().unwrap();
        let comida = db.get_or_create_category("Comida").unwrap();
        let transporte = db.get_or_create_category("Transporte").unwrap();

        db.insert_expense(&sample_expense("2024-05-02", comida.id, 40.0))
            .unwrap();
        db.insert_expense(&sample_expense("2024-05-10", comida.id, 10.0))
            .unwrap();
        db.insert_expense(&sample_expense("2024-05-31", transporte.id, 15.0))
            .unwrap();
        // Outside the month, must not count
        db.insert_expense(&sample_expense("2024-06-01", comida.id, 99.0))
            .unwrap();

        let report = db.monthly_report(2024, 5, "EUR").unwrap();
        assert_eq!(report.total, 65.0);
        assert_eq!(report.categories.len(), 2);
        // Ordered by total, largest first
        assert_eq!(report.categories[0].category_name, "Comida");
        assert_eq!(report.categories[0].total, 50.0);
        assert_eq!(report.categories[0].count, 2);
        assert_eq!(report.categories[1].category_name, "Transporte");
        assert_eq!(report.categories[1].total, 15.0);
    }

    #[test]
    fn test_monthly_report_invalid_month() {
        let db = Database::in_memory().unwrap();
        assert!(db.monthly_report(2024, 13, "EUR").is_err());
    }

    #[test]
    fn test_expenses_schema_exists() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();

        let result: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('expenses') WHERE name IN ('id', 'amount', 'currency', 'converted_amount', 'base_currency', 'description', 'date', 'category_id', 'created_at', 'updated_at')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(result, 10, "expenses table should have 10 expected columns");
    }

    #[test]
    fn test_count_expenses() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.count_expenses().unwrap(), 0);

        let category = db.get_or_create_category("Otros").unwrap();
        db.insert_expense(&sample_expense("2024-01-01", category.id, 5.0))
            .unwrap();
        assert_eq!(db.count_expenses().unwrap(), 1);
    }
}
