//! Defines the page that lists the user's expenses as a table.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, endpoints,
    expense::core::{Expense, get_expenses},
    html::{
        BUTTON_DELETE_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency,
    },
    navigation::NavBar,
    user::UserID,
};

/// The state needed for the expenses page.
#[derive(Debug, Clone)]
pub struct ExpensesPageState {
    /// The database connection for reading expenses.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ExpensesPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Render an overview of the user's expenses, newest first.
///
/// This list is the one place expenses with unparseable dates still show up,
/// so stray records can be found and fixed. Summaries skip them.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_expenses_page(
    State(state): State<ExpensesPageState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = state
        .db_connection
        .lock()
        .expect("Could not acquire database lock");

    let expenses = match get_expenses(user_id, &connection) {
        Ok(expenses) => expenses,
        Err(error) => return error.into_response(),
    };

    let content = html! {
        (NavBar::new(endpoints::EXPENSES_VIEW).into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-screen-lg space-y-4"
            {
                div class="flex items-center justify-between"
                {
                    h1 class="text-xl font-bold leading-tight tracking-tight md:text-2xl"
                    {
                        "Expenses"
                    }

                    a
                        href=(endpoints::NEW_EXPENSE_VIEW)
                        class=(LINK_STYLE)
                    {
                        "New expense"
                    }
                }

                div class="relative overflow-x-auto shadow-md sm:rounded-lg"
                {
                    table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Payment method" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @if expenses.is_empty() {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td
                                        colspan="6"
                                        data-empty-state="true"
                                        class="px-6 py-8 text-center"
                                    {
                                        "No expenses yet. Record your first one above."
                                    }
                                }
                            }

                            @for expense in &expenses {
                                (expense_row(expense))
                            }
                        }
                    }
                }
            }
        }
    };

    base("Expenses", &[], &content).into_response()
}

fn expense_row(expense: &Expense) -> Markup {
    let edit_route = endpoints::format_endpoint(endpoints::EDIT_EXPENSE_VIEW, expense.id);
    let delete_route = endpoints::format_endpoint(endpoints::EXPENSE, expense.id);

    html! {
        tr class=(TABLE_ROW_STYLE) data-expense-row="true"
        {
            td class=(TABLE_CELL_STYLE) { (format_currency(expense.amount)) }
            td class=(TABLE_CELL_STYLE) { (expense.category) }
            td class=(TABLE_CELL_STYLE) { (expense.description) }
            td class=(TABLE_CELL_STYLE) { (expense.payment_method) }
            td class=(TABLE_CELL_STYLE) { (expense.date) }
            td class=(TABLE_CELL_STYLE)
            {
                div class="flex items-center gap-4"
                {
                    a href=(edit_route) class=(LINK_STYLE) { "Edit" }

                    button
                        type="button"
                        class=(BUTTON_DELETE_STYLE)
                        hx-delete=(delete_route)
                        hx-confirm="Delete this expense?"
                    {
                        "Delete"
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod view_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, extract::State, http::StatusCode, response::Response};
    use rusqlite::Connection;
    use scraper::{ElementRef, Html, Selector};

    use crate::{
        db::initialize,
        expense::core::{ExpenseData, create_expense},
        password::PasswordHash,
        user::{User, create_user},
    };

    use super::{ExpensesPageState, get_expenses_page};

    fn get_test_state() -> (ExpensesPageState, User) {
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
            ExpensesPageState {
                db_connection: Arc::new(Mutex::new(connection)),
            },
            user,
        )
    }

    fn insert_expense(state: &ExpensesPageState, user: &User, category: &str, date: &str) {
        let connection = state.db_connection.lock().unwrap();
        create_expense(
            &ExpenseData {
                amount: 10.0,
                category: category.to_string(),
                description: String::new(),
                payment_method: String::new(),
                date: date.to_string(),
            },
            user.id,
            &connection,
        )
        .unwrap();
    }

    #[tokio::test]
    async fn expenses_page_lists_expenses_newest_first() {
        let (state, user) = get_test_state();
        insert_expense(&state, &user, "Food", "2025-06-01");
        insert_expense(&state, &user, "Travel", "2025-06-20");

        let response = get_expenses_page(State(state), Extension(user.id)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html(response).await;
        assert!(
            document.errors.is_empty(),
            "Got HTML parsing errors: {:?}",
            document.errors
        );

        let rows = expense_rows(&document);
        assert_eq!(rows.len(), 2);
        let first_row_text = rows[0].text().collect::<String>();
        assert!(
            first_row_text.contains("Travel"),
            "want newest expense first, got {first_row_text}"
        );
    }

    #[tokio::test]
    async fn expenses_page_shows_rows_with_unparseable_dates() {
        let (state, user) = get_test_state();
        insert_expense(&state, &user, "Food", "not-a-date");

        let response = get_expenses_page(State(state), Extension(user.id)).await;

        let document = parse_html(response).await;
        let rows = expense_rows(&document);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].text().collect::<String>().contains("not-a-date"));
    }

    #[tokio::test]
    async fn expenses_page_shows_empty_state() {
        let (state, user) = get_test_state();

        let response = get_expenses_page(State(state), Extension(user.id)).await;

        let document = parse_html(response).await;
        let empty_selector = Selector::parse("td[data-empty-state='true']").unwrap();
        assert!(
            document.select(&empty_selector).next().is_some(),
            "want empty-state row for user with no expenses"
        );
    }

    fn expense_rows(document: &Html) -> Vec<ElementRef<'_>> {
        let selector = Selector::parse("tbody tr[data-expense-row='true']").unwrap();
        document.select(&selector).collect()
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
