//! Defines the page for editing an existing expense.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use maud::html;
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    expense::{
        core::{get_expense, parse_entry_date},
        form::{ExpenseFormValues, expense_form_fields},
    },
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, PAGE_CONTAINER_STYLE, base, loading_spinner,
        rupee_input_styles,
    },
    navigation::NavBar,
    timezone::get_local_date,
    user::UserID,
};

/// The state needed for the edit expense page.
#[derive(Debug, Clone)]
pub struct EditExpensePageState {
    /// The database connection for reading the expense being edited.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for EditExpensePageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Renders the page for editing the expense `expense_id`.
///
/// An expense that does not exist or belongs to another user sends the
/// caller back to the expenses list rather than revealing which of the two
/// happened.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_edit_expense_page(
    State(state): State<EditExpensePageState>,
    Extension(user_id): Extension<UserID>,
    Path(expense_id): Path<i64>,
) -> Response {
    let Some(today) = get_local_date(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let connection = state
        .db_connection
        .lock()
        .expect("Could not acquire database lock");

    let expense = match get_expense(expense_id, user_id, &connection) {
        Ok(expense) => expense,
        Err(Error::NotFound) => return Redirect::to(endpoints::EXPENSES_VIEW).into_response(),
        Err(error) => return error.into_response(),
    };

    let update_route = endpoints::format_endpoint(endpoints::EXPENSE, expense.id);
    let form_values = ExpenseFormValues {
        amount: Some(expense.amount),
        category: &expense.category,
        description: &expense.description,
        payment_method: &expense.payment_method,
        date: parse_entry_date(&expense.date),
        max_date: today,
    };

    let content = html! {
        (NavBar::new(endpoints::EXPENSES_VIEW).into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full sm:max-w-md space-y-4"
            {
                h1 class="text-xl font-bold leading-tight tracking-tight md:text-2xl"
                {
                    "Edit Expense"
                }

                form
                    hx-put=(update_route)
                    hx-indicator="#indicator"
                    hx-disabled-elt="find button[type=submit]"
                    class="space-y-4"
                {
                    (expense_form_fields(&form_values))

                    button
                        type="submit"
                        class=(BUTTON_PRIMARY_STYLE)
                    {
                        span id="indicator" class="htmx-indicator" { (loading_spinner()) }
                        "Save changes"
                    }
                }

                button
                    type="button"
                    class=(BUTTON_DELETE_STYLE)
                    hx-delete=(update_route)
                    hx-confirm="Delete this expense?"
                {
                    "Delete expense"
                }
            }
        }
    };

    base("Edit Expense", &[rupee_input_styles()], &content).into_response()
}

#[cfg(test)]
mod view_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::Path, extract::State, http::StatusCode, response::Response};
    use rusqlite::Connection;
    use scraper::{Html, Selector};

    use crate::{
        db::initialize,
        endpoints,
        expense::core::{ExpenseData, create_expense},
        password::PasswordHash,
        user::{User, create_user},
    };

    use super::{EditExpensePageState, get_edit_expense_page};

    fn get_test_state() -> (EditExpensePageState, User) {
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
            EditExpensePageState {
                db_connection: Arc::new(Mutex::new(connection)),
                local_timezone: "Etc/UTC".to_owned(),
            },
            user,
        )
    }

    #[tokio::test]
    async fn edit_page_prefills_stored_values() {
        let (state, user) = get_test_state();
        let expense = {
            let connection = state.db_connection.lock().unwrap();
            create_expense(
                &ExpenseData {
                    amount: 42.5,
                    category: "Food".to_string(),
                    description: "Lunch".to_string(),
                    payment_method: "UPI".to_string(),
                    date: "2025-06-10".to_string(),
                },
                user.id,
                &connection,
            )
            .unwrap()
        };

        let response =
            get_edit_expense_page(State(state), Extension(user.id), Path(expense.id)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html(response).await;

        let form_selector = Selector::parse("form").unwrap();
        let form = document
            .select(&form_selector)
            .next()
            .expect("No form found");
        assert_eq!(
            form.value().attr("hx-put").expect("form missing hx-put"),
            endpoints::format_endpoint(endpoints::EXPENSE, expense.id)
        );

        for (name, want) in [
            ("amount", "42.50"),
            ("category", "Food"),
            ("description", "Lunch"),
            ("payment_method", "UPI"),
            ("date", "2025-06-10"),
        ] {
            let selector = Selector::parse(&format!("input[name={name}]")).unwrap();
            let input = form
                .select(&selector)
                .next()
                .unwrap_or_else(|| panic!("No {name} input found"));
            assert_eq!(input.value().attr("value"), Some(want), "input {name}");
        }
    }

    #[tokio::test]
    async fn edit_page_redirects_to_list_for_unknown_expense() {
        let (state, user) = get_test_state();

        let response = get_edit_expense_page(State(state), Extension(user.id), Path(42)).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").unwrap(),
            endpoints::EXPENSES_VIEW
        );
    }

    #[tokio::test]
    async fn edit_page_redirects_to_list_for_other_users_expense() {
        let (state, user) = get_test_state();
        let other_user = {
            let connection = state.db_connection.lock().unwrap();
            let other_user = create_user(
                "bob",
                None,
                PasswordHash::new_unchecked("hunter2"),
                &connection,
            )
            .unwrap();
            create_expense(
                &ExpenseData {
                    amount: 1.0,
                    category: "Food".to_string(),
                    description: String::new(),
                    payment_method: String::new(),
                    date: "2025-06-10".to_string(),
                },
                user.id,
                &connection,
            )
            .unwrap();
            other_user
        };

        let response = get_edit_expense_page(State(state), Extension(other_user.id), Path(1)).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").unwrap(),
            endpoints::EXPENSES_VIEW
        );
    }

    async fn parse_html(response: Response) -> Html {
        let body = response.into_body();
        let body = axum::body::to_bytes(body, usize::MAX)
            .await
            .expect("Could not get response body");
        let text = String::from_utf8_lossy(&body).to_string();

        Html::parse_document(&text)
    }
}
