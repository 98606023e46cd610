//! Defines the budget plan model and its database operations.
//!
//! A budget plan holds a user's per-category spending ceilings for a month.
//! Plans are keyed by (user, day, month, year): submitting a plan on the same
//! day replaces the previous submission instead of creating a duplicate, while
//! a submission on a later day of the same month creates a new snapshot. Reads
//! always pick the most recent snapshot for the month.

use std::collections::BTreeMap;

use rusqlite::Connection;

use crate::{Error, user::UserID};

/// A user's spending ceilings for a month.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetPlan {
    /// The ID of the plan in the database.
    pub id: i64,
    /// The ID of the user the plan belongs to.
    pub user_id: UserID,
    /// The day of the month the plan was submitted on. Part of the lookup key
    /// only, not a validity bound.
    pub day: u8,
    /// The month (1-12) the plan applies to.
    pub month: u8,
    /// The year the plan applies to.
    pub year: i32,
    /// The sum of all category ceilings at submission time.
    pub total: f64,
    /// Ceiling per category, keyed by lower-cased category name.
    pub category_ceilings: BTreeMap<String, f64>,
}

/// Create the budget tables in the database.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there was an SQL error.
pub fn create_budget_tables(connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            day INTEGER NOT NULL,
            month INTEGER NOT NULL,
            year INTEGER NOT NULL,
            total REAL NOT NULL,
            UNIQUE(user_id, day, month, year),
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('budget', 0)",
        (),
    )?;

    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget_category (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            budget_id INTEGER NOT NULL,
            category TEXT NOT NULL,
            amount REAL NOT NULL,
            UNIQUE(budget_id, category),
            FOREIGN KEY(budget_id) REFERENCES budget(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    Ok(())
}

/// Create or replace the budget plan for `user_id` keyed by (`day`, `month`,
/// `year`).
///
/// Category names are lower-cased before storage so that budget matching is
/// case-insensitive. The plan's total is the sum of the ceilings at
/// submission time and is stored rather than recomputed on read.
///
/// # Errors
///
/// Returns:
/// - [Error::NegativeAmount] if any ceiling is negative,
/// - [Error::NotFound] if `user_id` does not refer to a valid user,
/// - [Error::SqlError] if there was an unexpected SQL error.
pub fn upsert_budget_plan(
    user_id: UserID,
    day: u8,
    month: u8,
    year: i32,
    category_ceilings: &BTreeMap<String, f64>,
    connection: &Connection,
) -> Result<BudgetPlan, Error> {
    if category_ceilings.values().any(|ceiling| *ceiling < 0.0) {
        return Err(Error::NegativeAmount);
    }

    let normalized: BTreeMap<String, f64> = category_ceilings
        .iter()
        .map(|(category, ceiling)| (category.to_lowercase(), *ceiling))
        .collect();
    let total: f64 = normalized.values().sum();

    let budget_id: i64 = connection
        .query_row(
            "INSERT INTO budget (user_id, day, month, year, total)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id, day, month, year) DO UPDATE SET total = excluded.total
            RETURNING id",
            (user_id.as_i64(), day, month, year, total),
            |row| row.get(0),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(sql_error, Some(_))
                if sql_error.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Error::NotFound
            }
            error => error.into(),
        })?;

    connection.execute(
        "DELETE FROM budget_category WHERE budget_id = ?1",
        (budget_id,),
    )?;

    for (category, ceiling) in &normalized {
        connection.execute(
            "INSERT INTO budget_category (budget_id, category, amount) VALUES (?1, ?2, ?3)",
            (budget_id, category, ceiling),
        )?;
    }

    Ok(BudgetPlan {
        id: budget_id,
        user_id,
        day,
        month,
        year,
        total,
        category_ceilings: normalized,
    })
}

/// Retrieve the most recent budget plan for `user_id` in the given month.
///
/// Returns [None] when the user has not submitted a plan for that month.
/// Callers treat a missing plan as "budget optional", every expense is
/// accepted when there is nothing to check against.
///
/// # Errors
///
/// Returns an [Error::SqlError] if there was an unexpected SQL error.
pub fn get_budget_plan(
    user_id: UserID,
    year: i32,
    month: u8,
    connection: &Connection,
) -> Result<Option<BudgetPlan>, Error> {
    let header = connection
        .query_row(
            "SELECT id, user_id, day, month, year, total
            FROM budget
            WHERE user_id = ?1 AND year = ?2 AND month = ?3
            ORDER BY day DESC
            LIMIT 1",
            (user_id.as_i64(), year, month),
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, u8>(2)?,
                    row.get::<_, u8>(3)?,
                    row.get::<_, i32>(4)?,
                    row.get::<_, f64>(5)?,
                ))
            },
        )
        .map(Some)
        .or_else(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            error => Err(Error::from(error)),
        })?;

    let Some((id, owner_id, day, month, year, total)) = header else {
        return Ok(None);
    };

    let category_ceilings = connection
        .prepare("SELECT category, amount FROM budget_category WHERE budget_id = ?1")?
        .query_map((id,), |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?
        .collect::<Result<BTreeMap<String, f64>, rusqlite::Error>>()?;

    Ok(Some(BudgetPlan {
        id,
        user_id: UserID::new(owner_id),
        day,
        month,
        year,
        total,
        category_ceilings,
    }))
}
