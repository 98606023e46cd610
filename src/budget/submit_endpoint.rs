//! Defines the endpoint the budget form submits to.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

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

use crate::{
    AppState, Error, budget::core::upsert_budget_plan, endpoints, timezone::get_local_date,
    user::UserID,
};

/// The state needed to submit a budget plan.
#[derive(Debug, Clone)]
pub struct SubmitBudgetState {
    /// The database connection for storing the budget plan.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for SubmitBudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The form data for setting the monthly budget. A field left blank sets no
/// ceiling for that category.
#[derive(Debug, Deserialize)]
pub struct BudgetForm {
    #[serde(default)]
    pub food: Option<f64>,
    #[serde(default)]
    pub movie: Option<f64>,
    #[serde(default)]
    pub travel: Option<f64>,
}

/// A route handler for saving the user's budget plan, redirects to the
/// budget view on success.
///
/// The plan is keyed by the current date: saving twice on the same day
/// replaces the earlier submission, saving on a later day of the month
/// creates a new snapshot that takes precedence.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn submit_budget_endpoint(
    State(state): State<SubmitBudgetState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<BudgetForm>,
) -> Response {
    let Some(today) = get_local_date(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
    };

    let mut category_ceilings = BTreeMap::new();
    for (category, ceiling) in [
        ("food", form.food),
        ("movie", form.movie),
        ("travel", form.travel),
    ] {
        if let Some(ceiling) = ceiling {
            category_ceilings.insert(category.to_string(), ceiling);
        }
    }

    let connection = state
        .db_connection
        .lock()
        .expect("Could not acquire database lock");

    if let Err(error) = upsert_budget_plan(
        user_id,
        today.day(),
        today.month() as u8,
        today.year(),
        &category_ceilings,
        &connection,
    ) {
        return error.into_alert_response();
    }

    (
        HxRedirect(endpoints::BUDGET_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State};
    use axum_extra::extract::Form;
    use axum_htmx::HX_REDIRECT;
    use rusqlite::Connection;
    use time::OffsetDateTime;

    use crate::{
        budget::core::get_budget_plan,
        db::initialize,
        password::PasswordHash,
        user::{User, create_user},
    };

    use super::{BudgetForm, SubmitBudgetState, submit_budget_endpoint};

    fn get_test_state() -> (SubmitBudgetState, User) {
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
            SubmitBudgetState {
                db_connection: Arc::new(Mutex::new(connection)),
                local_timezone: "Etc/UTC".to_owned(),
            },
            user,
        )
    }

    #[tokio::test]
    async fn submit_budget_stores_plan_for_current_month() {
        let (state, user) = get_test_state();

        let response = submit_budget_endpoint(
            State(state.clone()),
            Extension(user.id),
            Form(BudgetForm {
                food: Some(500.0),
                movie: Some(100.0),
                travel: None,
            }),
        )
        .await;

        assert_eq!(response.headers().get(HX_REDIRECT).unwrap(), "/budget");

        let today = OffsetDateTime::now_utc().date();
        let connection = state.db_connection.lock().unwrap();
        let plan = get_budget_plan(user.id, today.year(), today.month() as u8, &connection)
            .unwrap()
            .expect("Expected a budget plan");
        assert_eq!(plan.total, 600.0);
        assert_eq!(plan.category_ceilings.get("food"), Some(&500.0));
        assert_eq!(plan.category_ceilings.get("movie"), Some(&100.0));
        assert_eq!(plan.category_ceilings.get("travel"), None);
    }

    #[tokio::test]
    async fn submit_budget_twice_on_same_day_replaces_plan() {
        let (state, user) = get_test_state();

        submit_budget_endpoint(
            State(state.clone()),
            Extension(user.id),
            Form(BudgetForm {
                food: Some(500.0),
                movie: None,
                travel: None,
            }),
        )
        .await;
        submit_budget_endpoint(
            State(state.clone()),
            Extension(user.id),
            Form(BudgetForm {
                food: Some(300.0),
                movie: None,
                travel: None,
            }),
        )
        .await;

        let today = OffsetDateTime::now_utc().date();
        let connection = state.db_connection.lock().unwrap();
        let plan = get_budget_plan(user.id, today.year(), today.month() as u8, &connection)
            .unwrap()
            .expect("Expected a budget plan");
        assert_eq!(plan.category_ceilings.get("food"), Some(&300.0));

        let plan_count: i64 = connection
            .query_row("SELECT COUNT(*) FROM budget", (), |row| row.get(0))
            .unwrap();
        assert_eq!(plan_count, 1);
    }

    #[tokio::test]
    async fn submit_budget_rejects_negative_ceiling() {
        let (state, user) = get_test_state();

        let response = submit_budget_endpoint(
            State(state.clone()),
            Extension(user.id),
            Form(BudgetForm {
                food: Some(-5.0),
                movie: None,
                travel: None,
            }),
        )
        .await;

        assert_eq!(response.status(), 400);

        let today = OffsetDateTime::now_utc().date();
        let connection = state.db_connection.lock().unwrap();
        let plan =
            get_budget_plan(user.id, today.year(), today.month() as u8, &connection).unwrap();
        assert!(plan.is_none(), "rejected plan must not be stored");
    }
}
