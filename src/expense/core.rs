//! Defines the expense model and its database operations.
//!
//! Every operation is scoped by the owning user: an expense can only be read,
//! edited or deleted by the user that created it. A lookup for another user's
//! expense behaves exactly like a lookup for an expense that does not exist.

use rusqlite::{Connection, Row};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{Error, user::UserID};

/// The maximum number of expenses fetched for list views and aggregation.
///
/// Read paths operate on a bounded snapshot rather than the full table so a
/// long-lived account cannot make reporting unboundedly slow.
pub const SNAPSHOT_LIMIT: usize = 1000;

/// The format that expense dates are stored in, e.g. "2025-06-15".
pub const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// A single spending event recorded by a user.
#[derive(Debug, Clone, PartialEq)]
pub struct Expense {
    /// The ID of the expense in the database.
    pub id: i64,
    /// The ID of the user that created the expense.
    pub user_id: UserID,
    /// How much was spent. Never negative.
    pub amount: f64,
    /// A free-text label used to group expenses, e.g. "Food".
    ///
    /// Stored with its case preserved; budget matching lower-cases it.
    pub category: String,
    /// A free-text note on what the money was spent on.
    pub description: String,
    /// A free-text note on how the expense was paid, e.g. "UPI".
    pub payment_method: String,
    /// The date of the expense as a "YYYY-MM-DD" string.
    ///
    /// Dates are stored as text and may not parse as a calendar date if the
    /// row predates input validation. Use [parse_entry_date] before bucketing
    /// by month or year.
    pub date: String,
}

/// The user-editable fields of an [Expense], as submitted from a form.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseData {
    /// How much was spent.
    pub amount: f64,
    /// A free-text label used to group expenses.
    pub category: String,
    /// A free-text note on what the money was spent on.
    pub description: String,
    /// A free-text note on how the expense was paid.
    pub payment_method: String,
    /// The date of the expense as a "YYYY-MM-DD" string.
    pub date: String,
}

/// Parse a stored expense date.
///
/// Returns [None] when the string is not a valid "YYYY-MM-DD" calendar date.
/// Aggregations that bucket by month or year skip such rows instead of
/// failing, legacy data must not break reporting.
pub fn parse_entry_date(date: &str) -> Option<Date> {
    Date::parse(date, DATE_FORMAT).ok()
}

/// Create the expense table in the database.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there was an SQL error.
pub fn create_expense_table(connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS expense (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            amount REAL NOT NULL,
            category TEXT NOT NULL,
            description TEXT NOT NULL,
            payment_method TEXT NOT NULL,
            date TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    // Ensure the table has an entry in sqlite_sequence so that the first
    // expense gets the ID 1 instead of 0.
    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('expense', 0)",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_expense_user_date ON expense(user_id, date)",
        (),
    )?;

    Ok(())
}

/// Create an expense in the database for the user `user_id`.
///
/// # Errors
///
/// Returns:
/// - [Error::NegativeAmount] if `data.amount` is negative,
/// - [Error::NotFound] if `user_id` does not refer to a valid user,
/// - [Error::SqlError] if there was an unexpected SQL error.
pub fn create_expense(
    data: &ExpenseData,
    user_id: UserID,
    connection: &Connection,
) -> Result<Expense, Error> {
    if data.amount < 0.0 {
        return Err(Error::NegativeAmount);
    }

    connection
        .query_row(
            "INSERT INTO expense (user_id, amount, category, description, payment_method, date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING *",
            (
                user_id.as_i64(),
                data.amount,
                &data.category,
                &data.description,
                &data.payment_method,
                &data.date,
            ),
            map_expense_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(sql_error, Some(_))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Error::NotFound
            }
            error => error.into(),
        })
}

/// Retrieve the expense with `expense_id` belonging to the user `user_id`.
///
/// # Errors
///
/// Returns:
/// - [Error::NotFound] if the expense does not exist or belongs to another
///   user (the two cases are deliberately indistinguishable),
/// - [Error::SqlError] if there was an unexpected SQL error.
pub fn get_expense(
    expense_id: i64,
    user_id: UserID,
    connection: &Connection,
) -> Result<Expense, Error> {
    let expense = connection.query_row(
        "SELECT id, user_id, amount, category, description, payment_method, date
        FROM expense
        WHERE id = ?1 AND user_id = ?2",
        (expense_id, user_id.as_i64()),
        map_expense_row,
    )?;

    Ok(expense)
}

/// Retrieve the most recent expenses for the user `user_id`.
///
/// At most [SNAPSHOT_LIMIT] rows are returned, newest date first.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there was an unexpected SQL error.
pub fn get_expenses(user_id: UserID, connection: &Connection) -> Result<Vec<Expense>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, amount, category, description, payment_method, date
            FROM expense
            WHERE user_id = ?1
            ORDER BY date DESC, id DESC
            LIMIT ?2",
        )?
        .query_map((user_id.as_i64(), SNAPSHOT_LIMIT as i64), map_expense_row)?
        .map(|maybe_expense| maybe_expense.map_err(Error::SqlError))
        .collect()
}

/// Replace the editable fields of the expense `expense_id` owned by `user_id`.
///
/// # Errors
///
/// Returns:
/// - [Error::NegativeAmount] if `data.amount` is negative,
/// - [Error::UpdateMissingExpense] if the expense does not exist or belongs
///   to another user,
/// - [Error::SqlError] if there was an unexpected SQL error.
pub fn update_expense(
    expense_id: i64,
    data: &ExpenseData,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    if data.amount < 0.0 {
        return Err(Error::NegativeAmount);
    }

    let rows_updated = connection.execute(
        "UPDATE expense
        SET amount = ?1, category = ?2, description = ?3, payment_method = ?4, date = ?5
        WHERE id = ?6 AND user_id = ?7",
        (
            data.amount,
            &data.category,
            &data.description,
            &data.payment_method,
            &data.date,
            expense_id,
            user_id.as_i64(),
        ),
    )?;

    match rows_updated {
        0 => Err(Error::UpdateMissingExpense),
        _ => Ok(()),
    }
}

/// Delete the expense `expense_id` owned by `user_id`.
///
/// # Errors
///
/// Returns:
/// - [Error::DeleteMissingExpense] if the expense does not exist or belongs
///   to another user,
/// - [Error::SqlError] if there was an unexpected SQL error.
pub fn delete_expense(
    expense_id: i64,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_deleted = connection.execute(
        "DELETE FROM expense WHERE id = ?1 AND user_id = ?2",
        (expense_id, user_id.as_i64()),
    )?;

    match rows_deleted {
        0 => Err(Error::DeleteMissingExpense),
        _ => Ok(()),
    }
}

/// Sum what the user `user_id` has already spent on `category` in the given
/// month, matching the category case-insensitively.
///
/// Used by the budget check on the expense write path. Rows whose date does
/// not start with the "YYYY-MM" prefix for the month are excluded, which also
/// excludes unparseable dates.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there was an unexpected SQL error.
pub fn spent_for_category_in_month(
    user_id: UserID,
    category: &str,
    year: i32,
    month: u8,
    connection: &Connection,
) -> Result<f64, Error> {
    let month_prefix = format!("{year:04}-{month:02}");

    let total = connection.query_row(
        "SELECT COALESCE(SUM(amount), 0.0)
        FROM expense
        WHERE user_id = ?1 AND lower(category) = ?2 AND substr(date, 1, 7) = ?3",
        (user_id.as_i64(), category.to_lowercase(), month_prefix),
        |row| row.get(0),
    )?;

    Ok(total)
}

fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    Ok(Expense {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        amount: row.get(2)?,
        category: row.get(3)?,
        description: row.get(4)?,
        payment_method: row.get(5)?,
        date: row.get(6)?,
    })
}

#[cfg(test)]
mod database_tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        db::initialize,
        user::{User, UserID, create_user},
    };

    use super::{
        ExpenseData, create_expense, delete_expense, get_expense, get_expenses, parse_entry_date,
        spent_for_category_in_month, update_expense,
    };

    fn get_test_connection() -> (Connection, User) {
        let connection =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");

        let user = create_user(
            "alice",
            None,
            crate::password::PasswordHash::new_unchecked("hunter2"),
            &connection,
        )
        .expect("Could not create test user");

        (connection, user)
    }

    fn sample_data() -> ExpenseData {
        ExpenseData {
            amount: 123.45,
            category: "Food".to_string(),
            description: "Groceries".to_string(),
            payment_method: "Card".to_string(),
            date: "2025-06-15".to_string(),
        }
    }

    #[test]
    fn create_expense_succeeds() {
        let (connection, user) = get_test_connection();
        let data = sample_data();

        let expense = create_expense(&data, user.id, &connection).expect("Could not create expense");

        assert!(expense.id > 0);
        assert_eq!(expense.user_id, user.id);
        assert_eq!(expense.amount, data.amount);
        assert_eq!(expense.category, data.category);
        assert_eq!(expense.description, data.description);
        assert_eq!(expense.payment_method, data.payment_method);
        assert_eq!(expense.date, data.date);
    }

    #[test]
    fn create_expense_fails_on_negative_amount() {
        let (connection, user) = get_test_connection();
        let data = ExpenseData {
            amount: -1.0,
            ..sample_data()
        };

        let result = create_expense(&data, user.id, &connection);

        assert_eq!(result, Err(Error::NegativeAmount));
    }

    #[test]
    fn create_expense_fails_on_invalid_user_id() {
        let (connection, _) = get_test_connection();

        let result = create_expense(&sample_data(), UserID::new(999), &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn get_expense_succeeds() {
        let (connection, user) = get_test_connection();
        let inserted =
            create_expense(&sample_data(), user.id, &connection).expect("Could not create expense");

        let selected = get_expense(inserted.id, user.id, &connection);

        assert_eq!(Ok(inserted), selected);
    }

    #[test]
    fn get_expense_fails_on_unknown_id() {
        let (connection, user) = get_test_connection();

        let result = get_expense(42, user.id, &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn get_expense_hides_other_users_expenses() {
        let (connection, user) = get_test_connection();
        let other_user = create_user(
            "bob",
            None,
            crate::password::PasswordHash::new_unchecked("hunter2"),
            &connection,
        )
        .expect("Could not create second test user");
        let inserted =
            create_expense(&sample_data(), user.id, &connection).expect("Could not create expense");

        let result = get_expense(inserted.id, other_user.id, &connection);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn get_expenses_returns_newest_first() {
        let (connection, user) = get_test_connection();
        for date in ["2025-06-01", "2025-06-20", "2025-06-10"] {
            let data = ExpenseData {
                date: date.to_string(),
                ..sample_data()
            };
            create_expense(&data, user.id, &connection).expect("Could not create expense");
        }

        let expenses = get_expenses(user.id, &connection).expect("Could not fetch expenses");

        let dates: Vec<&str> = expenses.iter().map(|expense| expense.date.as_str()).collect();
        assert_eq!(dates, ["2025-06-20", "2025-06-10", "2025-06-01"]);
    }

    #[test]
    fn get_expenses_only_returns_own_expenses() {
        let (connection, user) = get_test_connection();
        let other_user = create_user(
            "bob",
            None,
            crate::password::PasswordHash::new_unchecked("hunter2"),
            &connection,
        )
        .expect("Could not create second test user");
        create_expense(&sample_data(), user.id, &connection).expect("Could not create expense");
        create_expense(&sample_data(), other_user.id, &connection)
            .expect("Could not create expense");

        let expenses = get_expenses(user.id, &connection).expect("Could not fetch expenses");

        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].user_id, user.id);
    }

    #[test]
    fn update_expense_replaces_fields() {
        let (connection, user) = get_test_connection();
        let inserted =
            create_expense(&sample_data(), user.id, &connection).expect("Could not create expense");
        let new_data = ExpenseData {
            amount: 99.0,
            category: "Travel".to_string(),
            description: "Bus ticket".to_string(),
            payment_method: "Cash".to_string(),
            date: "2025-07-01".to_string(),
        };

        update_expense(inserted.id, &new_data, user.id, &connection)
            .expect("Could not update expense");

        let updated =
            get_expense(inserted.id, user.id, &connection).expect("Could not fetch expense");
        assert_eq!(updated.amount, new_data.amount);
        assert_eq!(updated.category, new_data.category);
        assert_eq!(updated.description, new_data.description);
        assert_eq!(updated.payment_method, new_data.payment_method);
        assert_eq!(updated.date, new_data.date);
    }

    #[test]
    fn update_expense_fails_on_unknown_id() {
        let (connection, user) = get_test_connection();

        let result = update_expense(42, &sample_data(), user.id, &connection);

        assert_eq!(result, Err(Error::UpdateMissingExpense));
    }

    #[test]
    fn update_expense_fails_for_other_users_expense() {
        let (connection, user) = get_test_connection();
        let other_user = create_user(
            "bob",
            None,
            crate::password::PasswordHash::new_unchecked("hunter2"),
            &connection,
        )
        .expect("Could not create second test user");
        let inserted =
            create_expense(&sample_data(), user.id, &connection).expect("Could not create expense");

        let result = update_expense(inserted.id, &sample_data(), other_user.id, &connection);

        assert_eq!(result, Err(Error::UpdateMissingExpense));
    }

    #[test]
    fn delete_expense_removes_row() {
        let (connection, user) = get_test_connection();
        let inserted =
            create_expense(&sample_data(), user.id, &connection).expect("Could not create expense");

        delete_expense(inserted.id, user.id, &connection).expect("Could not delete expense");

        assert_eq!(
            get_expense(inserted.id, user.id, &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn delete_expense_fails_on_unknown_id() {
        let (connection, user) = get_test_connection();

        let result = delete_expense(42, user.id, &connection);

        assert_eq!(result, Err(Error::DeleteMissingExpense));
    }

    #[test]
    fn spent_for_category_matches_case_insensitively() {
        let (connection, user) = get_test_connection();
        for (category, amount, date) in [
            ("Food", 100.0, "2025-06-01"),
            ("FOOD", 50.0, "2025-06-15"),
            ("food", 25.0, "2025-07-01"),
            ("Travel", 75.0, "2025-06-10"),
        ] {
            let data = ExpenseData {
                amount,
                category: category.to_string(),
                date: date.to_string(),
                ..sample_data()
            };
            create_expense(&data, user.id, &connection).expect("Could not create expense");
        }

        let total = spent_for_category_in_month(user.id, "Food", 2025, 6, &connection)
            .expect("Could not sum expenses");

        assert_eq!(total, 150.0);
    }

    #[test]
    fn spent_for_category_is_zero_when_no_expenses_match() {
        let (connection, user) = get_test_connection();

        let total = spent_for_category_in_month(user.id, "food", 2025, 6, &connection)
            .expect("Could not sum expenses");

        assert_eq!(total, 0.0);
    }

    #[test]
    fn parse_entry_date_accepts_iso_dates() {
        assert_eq!(parse_entry_date("2025-06-15"), Some(date!(2025 - 06 - 15)));
    }

    #[test]
    fn parse_entry_date_rejects_garbage() {
        for input in ["not-a-date", "2025-13-01", "2025-02-30", "15/06/2025", ""] {
            assert_eq!(parse_entry_date(input), None, "input {input:?}");
        }
    }
}
