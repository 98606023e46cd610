//! Defines the endpoint for deleting an expense.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use rusqlite::Connection;

use crate::{AppState, endpoints, expense::core::delete_expense, user::UserID};

/// The state needed to delete an expense.
#[derive(Debug, Clone)]
pub struct DeleteExpenseState {
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting the expense `expense_id`, redirects to the
/// expenses view on success.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn delete_expense_endpoint(
    State(state): State<DeleteExpenseState>,
    Extension(user_id): Extension<UserID>,
    Path(expense_id): Path<i64>,
) -> Response {
    let connection = state
        .db_connection
        .lock()
        .expect("Could not acquire database lock");

    if let Err(error) = delete_expense(expense_id, user_id, &connection) {
        return error.into_alert_response();
    }

    (
        HxRedirect(endpoints::EXPENSES_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::Path, extract::State};
    use axum_htmx::HX_REDIRECT;
    use rusqlite::Connection;

    use crate::{
        Error,
        db::initialize,
        expense::core::{ExpenseData, create_expense, get_expense},
        password::PasswordHash,
        user::{User, create_user},
    };

    use super::{DeleteExpenseState, delete_expense_endpoint};

    fn get_test_state() -> (DeleteExpenseState, User) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            "alice",
            None,
            PasswordHash::new_unchecked("hunter2"),
            &connection,
        )
        .unwrap();

        (
            DeleteExpenseState {
                db_connection: Arc::new(Mutex::new(connection)),
            },
            user,
        )
    }

    #[tokio::test]
    async fn delete_expense_removes_row_and_redirects() {
        let (state, user) = get_test_state();
        let expense = {
            let connection = state.db_connection.lock().unwrap();
            create_expense(
                &ExpenseData {
                    amount: 10.0,
                    category: "Food".to_string(),
                    description: String::new(),
                    payment_method: String::new(),
                    date: "2025-06-10".to_string(),
                },
                user.id,
                &connection,
            )
            .unwrap()
        };

        let response =
            delete_expense_endpoint(State(state.clone()), Extension(user.id), Path(expense.id))
                .await;

        assert_eq!(response.headers().get(HX_REDIRECT).unwrap(), "/expenses");

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(
            get_expense(expense.id, user.id, &connection),
            Err(Error::NotFound)
        );
    }

    #[tokio::test]
    async fn delete_unknown_expense_returns_not_found_alert() {
        let (state, user) = get_test_state();

        let response = delete_expense_endpoint(State(state), Extension(user.id), Path(42)).await;

        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn delete_other_users_expense_returns_not_found_alert() {
        let (state, user) = get_test_state();
        let other_user = {
            let connection = state.db_connection.lock().unwrap();
            create_user(
                "bob",
                None,
                PasswordHash::new_unchecked("hunter2"),
                &connection,
            )
            .unwrap()
        };
        let expense = {
            let connection = state.db_connection.lock().unwrap();
            create_expense(
                &ExpenseData {
                    amount: 10.0,
                    category: "Food".to_string(),
                    description: String::new(),
                    payment_method: String::new(),
                    date: "2025-06-10".to_string(),
                },
                user.id,
                &connection,
            )
            .unwrap()
        };

        let response =
            delete_expense_endpoint(State(state), Extension(other_user.id), Path(expense.id))
                .await;

        assert_eq!(response.status(), 404);
    }
}
