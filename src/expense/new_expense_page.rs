//! Defines the page for recording a new expense.

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::html;

use crate::{
    AppState, Error, endpoints,
    expense::form::{ExpenseFormValues, expense_form_fields},
    html::{BUTTON_PRIMARY_STYLE, PAGE_CONTAINER_STYLE, base, loading_spinner, rupee_input_styles},
    navigation::NavBar,
    timezone::get_local_date,
};

/// The state needed for the new expense page.
#[derive(Debug, Clone)]
pub struct NewExpensePageState {
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for NewExpensePageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Renders the page for recording a new expense.
pub async fn get_new_expense_page(State(state): State<NewExpensePageState>) -> Response {
    let Some(today) = get_local_date(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let nav_bar = NavBar::new(endpoints::NEW_EXPENSE_VIEW).into_html();
    let form_values = ExpenseFormValues::empty(today);

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full sm:max-w-md space-y-4"
            {
                h1 class="text-xl font-bold leading-tight tracking-tight md:text-2xl"
                {
                    "New Expense"
                }

                form
                    hx-post=(endpoints::EXPENSES_API)
                    hx-indicator="#indicator"
                    hx-disabled-elt="find button"
                    class="space-y-4"
                {
                    (expense_form_fields(&form_values))

                    button
                        type="submit"
                        class=(BUTTON_PRIMARY_STYLE)
                    {
                        span id="indicator" class="htmx-indicator" { (loading_spinner()) }
                        "Add expense"
                    }
                }
            }
        }
    };

    base("New Expense", &[rupee_input_styles()], &content).into_response()
}
