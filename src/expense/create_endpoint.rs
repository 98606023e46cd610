//! Defines the endpoint for recording a new expense.
//!
//! This is the write path where the budget check runs: the handler reads what
//! has already been spent on the category this month, evaluates the proposed
//! amount against the user's budget plan, and only persists the expense when
//! it fits. The read-evaluate-write sequence is not atomic, two simultaneous
//! submissions can both pass the check.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::Deserialize;
use time::Date;

use crate::{
    AppState, Error,
    alert::Alert,
    budget::{Evaluation, evaluate_expense, get_budget_plan},
    endpoints,
    expense::core::{ExpenseData, create_expense, spent_for_category_in_month},
    html::format_currency,
    user::UserID,
};

/// The state needed to create an expense.
#[derive(Debug, Clone)]
pub struct CreateExpenseState {
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for creating or editing an expense.
#[derive(Debug, Deserialize)]
pub struct ExpenseForm {
    /// How much was spent.
    pub amount: f64,
    /// A free-text label used to group expenses.
    pub category: String,
    /// A free-text note on what the money was spent on.
    #[serde(default)]
    pub description: String,
    /// A free-text note on how the expense was paid.
    #[serde(default)]
    pub payment_method: String,
    /// The date of the expense.
    pub date: Date,
}

impl ExpenseForm {
    pub(crate) fn into_expense_data(self) -> ExpenseData {
        ExpenseData {
            amount: self.amount,
            category: self.category,
            description: self.description,
            payment_method: self.payment_method,
            date: self.date.to_string(),
        }
    }
}

/// A route handler for recording a new expense, redirects to the expenses
/// view on success.
///
/// The expense is checked against the user's budget plan for the expense's
/// month before it is persisted. A rejected expense is not stored and the
/// user is told the amount, category and ceiling involved.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_expense_endpoint(
    State(state): State<CreateExpenseState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ExpenseForm>,
) -> Response {
    if form.amount < 0.0 {
        return Error::NegativeAmount.into_alert_response();
    }

    let connection = state
        .db_connection
        .lock()
        .expect("Could not acquire database lock");

    let year = form.date.year();
    let month = form.date.month() as u8;

    let plan = match get_budget_plan(user_id, year, month, &connection) {
        Ok(plan) => plan,
        Err(error) => return error.into_alert_response(),
    };

    let prior_spent =
        match spent_for_category_in_month(user_id, &form.category, year, month, &connection) {
            Ok(total) => total,
            Err(error) => return error.into_alert_response(),
        };

    if let Evaluation::Rejected {
        category,
        amount,
        ceiling,
    } = evaluate_expense(plan.as_ref(), &form.category, form.amount, prior_spent)
    {
        return Alert::error(
            &format!("This expense would exceed your {category} budget."),
            &format!(
                "Spending {} would go past the {} ceiling for {category}.",
                format_currency(amount),
                format_currency(ceiling)
            ),
        )
        .into_response(StatusCode::UNPROCESSABLE_ENTITY);
    }

    if let Err(error) = create_expense(&form.into_expense_data(), user_id, &connection) {
        return error.into_alert_response();
    }

    (
        HxRedirect(endpoints::EXPENSES_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
