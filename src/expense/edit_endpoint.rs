//! Defines the endpoint for updating an existing expense.
//!
//! Edits run the same budget check as new expenses. The amount the old
//! version of the expense contributed to the month is subtracted from prior
//! spending first, so raising an expense within its own ceiling headroom is
//! not double counted.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    alert::Alert,
    budget::{Evaluation, evaluate_expense, get_budget_plan},
    endpoints,
    expense::{
        core::{Expense, get_expense, spent_for_category_in_month, update_expense},
        create_endpoint::ExpenseForm,
    },
    html::format_currency,
    user::UserID,
};

/// The state needed to update an expense.
#[derive(Debug, Clone)]
pub struct UpdateExpenseState {
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for UpdateExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for replacing the editable fields of an expense, redirects
/// to the expenses view on success.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn update_expense_endpoint(
    State(state): State<UpdateExpenseState>,
    Extension(user_id): Extension<UserID>,
    Path(expense_id): Path<i64>,
    Form(form): Form<ExpenseForm>,
) -> Response {
    if form.amount < 0.0 {
        return Error::NegativeAmount.into_alert_response();
    }

    let connection = state
        .db_connection
        .lock()
        .expect("Could not acquire database lock");

    let existing = match get_expense(expense_id, user_id, &connection) {
        Ok(expense) => expense,
        Err(Error::NotFound) => return Error::UpdateMissingExpense.into_alert_response(),
        Err(error) => return error.into_alert_response(),
    };

    let year = form.date.year();
    let month = form.date.month() as u8;

    let plan = match get_budget_plan(user_id, year, month, &connection) {
        Ok(plan) => plan,
        Err(error) => return error.into_alert_response(),
    };

    let prior_spent =
        match spent_for_category_in_month(user_id, &form.category, year, month, &connection) {
            Ok(total) => total - amount_already_counted(&existing, &form.category, year, month),
            Err(error) => return error.into_alert_response(),
        };

    if let Evaluation::Rejected {
        category,
        amount,
        ceiling,
    } = evaluate_expense(plan.as_ref(), &form.category, form.amount, prior_spent)
    {
        return Alert::error(
            &format!("This change would exceed your {category} budget."),
            &format!(
                "Spending {} would go past the {} ceiling for {category}.",
                format_currency(amount),
                format_currency(ceiling)
            ),
        )
        .into_response(StatusCode::UNPROCESSABLE_ENTITY);
    }

    if let Err(error) = update_expense(expense_id, &form.into_expense_data(), user_id, &connection)
    {
        return error.into_alert_response();
    }

    (
        HxRedirect(endpoints::EXPENSES_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// How much of the month's prior spending for `category` came from the
/// expense being edited.
fn amount_already_counted(existing: &Expense, category: &str, year: i32, month: u8) -> f64 {
    let same_category = existing.category.to_lowercase() == category.to_lowercase();
    let same_month = existing.date.starts_with(&format!("{year:04}-{month:02}"));

    if same_category && same_month {
        existing.amount
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::BTreeMap,
        sync::{Arc, Mutex},
    };

    use axum::{Extension, extract::Path, extract::State};
    use axum_extra::extract::Form;
    use axum_htmx::HX_REDIRECT;
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        budget::upsert_budget_plan,
        db::initialize,
        expense::core::{Expense, ExpenseData, create_expense, get_expense},
        password::PasswordHash,
        user::{User, create_user},
    };

    use super::{ExpenseForm, UpdateExpenseState, update_expense_endpoint};

    fn get_test_state() -> (UpdateExpenseState, User, Expense) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            "alice",
            None,
            PasswordHash::new_unchecked("hunter2"),
            &connection,
        )
        .unwrap();
        let expense = create_expense(
            &ExpenseData {
                amount: 80.0,
                category: "Food".to_string(),
                description: "Groceries".to_string(),
                payment_method: "Card".to_string(),
                date: "2025-06-10".to_string(),
            },
            user.id,
            &connection,
        )
        .unwrap();

        (
            UpdateExpenseState {
                db_connection: Arc::new(Mutex::new(connection)),
            },
            user,
            expense,
        )
    }

    fn form(amount: f64, category: &str) -> ExpenseForm {
        ExpenseForm {
            amount,
            category: category.to_string(),
            description: "Updated".to_string(),
            payment_method: "Cash".to_string(),
            date: date!(2025 - 06 - 10),
        }
    }

    #[tokio::test]
    async fn update_expense_replaces_fields_and_redirects() {
        let (state, user, expense) = get_test_state();

        let response = update_expense_endpoint(
            State(state.clone()),
            Extension(user.id),
            Path(expense.id),
            Form(form(55.0, "Travel")),
        )
        .await;

        assert_eq!(
            response.headers().get(HX_REDIRECT).unwrap(),
            "/expenses"
        );

        let connection = state.db_connection.lock().unwrap();
        let updated = get_expense(expense.id, user.id, &connection).unwrap();
        assert_eq!(updated.amount, 55.0);
        assert_eq!(updated.category, "Travel");
        assert_eq!(updated.description, "Updated");
    }

    #[tokio::test]
    async fn update_does_not_double_count_the_edited_expense() {
        let (state, user, expense) = get_test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            upsert_budget_plan(
                user.id,
                1,
                6,
                2025,
                &BTreeMap::from([("food".to_string(), 100.0)]),
                &connection,
            )
            .unwrap();
        }

        // 80 already spent, ceiling 100. Raising the same expense to 100
        // must pass because its own 80 is not prior spending.
        let response = update_expense_endpoint(
            State(state.clone()),
            Extension(user.id),
            Path(expense.id),
            Form(form(100.0, "Food")),
        )
        .await;

        assert!(response.headers().get(HX_REDIRECT).is_some());
    }

    #[tokio::test]
    async fn update_over_budget_is_rejected_and_not_applied() {
        let (state, user, expense) = get_test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            upsert_budget_plan(
                user.id,
                1,
                6,
                2025,
                &BTreeMap::from([("food".to_string(), 100.0)]),
                &connection,
            )
            .unwrap();
        }

        let response = update_expense_endpoint(
            State(state.clone()),
            Extension(user.id),
            Path(expense.id),
            Form(form(100.01, "Food")),
        )
        .await;

        assert_eq!(response.status(), 422);

        let connection = state.db_connection.lock().unwrap();
        let unchanged = get_expense(expense.id, user.id, &connection).unwrap();
        assert_eq!(unchanged.amount, 80.0);
    }

    #[tokio::test]
    async fn update_unknown_expense_returns_not_found_alert() {
        let (state, user, _) = get_test_state();

        let response = update_expense_endpoint(
            State(state),
            Extension(user.id),
            Path(42),
            Form(form(10.0, "Food")),
        )
        .await;

        assert_eq!(response.status(), 404);
    }
}
