//! Defines the page for viewing and setting the monthly budget.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::Date;

use crate::{
    AppState, Error,
    aggregation::{Scope, aggregate},
    budget::core::{BudgetPlan, get_budget_plan},
    endpoints,
    expense::{get_expenses, spent_for_category_in_month},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency,
        loading_spinner, rupee_input_styles,
    },
    navigation::NavBar,
    timezone::get_local_date,
    user::UserID,
};

/// The categories the budget form always offers, whether or not a ceiling has
/// been set for them. Stored plans can hold more.
const DEFAULT_BUDGET_CATEGORIES: [&str; 3] = ["food", "movie", "travel"];

/// The state needed for the budget page.
#[derive(Debug, Clone)]
pub struct BudgetPageState {
    /// The database connection for reading the budget plan and expenses.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for BudgetPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Renders the budget page for the current month: a form for setting
/// per-category ceilings and, when a plan exists, how spending tracks
/// against it.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_budget_page(
    State(state): State<BudgetPageState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let Some(today) = get_local_date(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let connection = state
        .db_connection
        .lock()
        .expect("Could not acquire database lock");

    let plan = match get_budget_plan(user_id, today.year(), today.month() as u8, &connection) {
        Ok(plan) => plan,
        Err(error) => return error.into_response(),
    };

    let summary = match plan.as_ref() {
        Some(plan) => match build_summary(plan, user_id, today, &connection) {
            Ok(summary) => Some(summary),
            Err(error) => return error.into_response(),
        },
        None => None,
    };

    let content = html! {
        (NavBar::new(endpoints::BUDGET_VIEW).into_html())

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full sm:max-w-md space-y-6"
            {
                h1 class="text-xl font-bold leading-tight tracking-tight md:text-2xl"
                {
                    "Budget for " (month_title(today))
                }

                @if let Some(summary) = summary {
                    (summary_table(&summary))
                }

                form
                    hx-post=(endpoints::BUDGET_API)
                    hx-indicator="#indicator"
                    hx-disabled-elt="find button"
                    class="space-y-4"
                {
                    @for category in DEFAULT_BUDGET_CATEGORIES {
                        (ceiling_input(category, plan.as_ref()))
                    }

                    button
                        type="submit"
                        class=(BUTTON_PRIMARY_STYLE)
                    {
                        span id="indicator" class="htmx-indicator" { (loading_spinner()) }
                        "Save budget"
                    }
                }
            }
        }
    };

    base("Budget", &[rupee_input_styles()], &content).into_response()
}

struct CategoryLine {
    category: String,
    ceiling: f64,
    spent: f64,
}

struct BudgetSummary {
    lines: Vec<CategoryLine>,
    total_ceiling: f64,
    total_spent: f64,
}

fn build_summary(
    plan: &BudgetPlan,
    user_id: UserID,
    today: Date,
    connection: &Connection,
) -> Result<BudgetSummary, Error> {
    let year = today.year();
    let month = today.month() as u8;

    let mut lines = Vec::with_capacity(plan.category_ceilings.len());
    for (category, ceiling) in &plan.category_ceilings {
        let spent = spent_for_category_in_month(user_id, category, year, month, connection)?;
        lines.push(CategoryLine {
            category: category.clone(),
            ceiling: *ceiling,
            spent,
        });
    }

    let expenses = get_expenses(user_id, connection)?;
    let total_spent = aggregate(&expenses, Scope::Month { year, month }, None).total();

    Ok(BudgetSummary {
        lines,
        total_ceiling: plan.total,
        total_spent,
    })
}

fn summary_table(summary: &BudgetSummary) -> Markup {
    html! {
        div class="relative overflow-x-auto shadow-md sm:rounded-lg"
        {
            table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Budget" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Spent" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Remaining" }
                    }
                }

                tbody
                {
                    @for line in &summary.lines {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE) { (line.category) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(line.ceiling)) }
                            td class=(TABLE_CELL_STYLE) { (format_currency(line.spent)) }
                            (remaining_cell(line.ceiling - line.spent))
                        }
                    }

                    tr class="bg-gray-50 font-semibold dark:bg-gray-700"
                    {
                        td class=(TABLE_CELL_STYLE) { "Total" }
                        td class=(TABLE_CELL_STYLE) { (format_currency(summary.total_ceiling)) }
                        td class=(TABLE_CELL_STYLE) { (format_currency(summary.total_spent)) }
                        (remaining_cell(summary.total_ceiling - summary.total_spent))
                    }
                }
            }
        }
    }
}

/// Renders a remaining-budget cell. Negative remaining is shown as-is in
/// red, overspend is a signal the user should see, not a value to clamp.
fn remaining_cell(remaining: f64) -> Markup {
    html! {
        @if remaining < 0.0 {
            td class="px-6 py-4 text-red-600 dark:text-red-500 font-medium" data-over-budget="true"
            {
                (format_currency(remaining))
            }
        } @else {
            td class=(TABLE_CELL_STYLE) { (format_currency(remaining)) }
        }
    }
}

fn ceiling_input(category: &str, plan: Option<&BudgetPlan>) -> Markup {
    let current = plan.and_then(|plan| plan.category_ceilings.get(category));
    let value = current.map(|ceiling| format!("{ceiling:.2}"));
    let label = capitalize(category);

    html! {
        div
        {
            label
                for=(category)
                class=(FORM_LABEL_STYLE)
            {
                (label) " budget"
            }

            div class="input-wrapper w-full"
            {
                input
                    name=(category)
                    id=(category)
                    type="number"
                    step="0.01"
                    min="0"
                    placeholder="0.00"
                    value=[value.as_deref()]
                    class=(FORM_TEXT_INPUT_STYLE);
            }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn month_title(today: Date) -> String {
    format!("{} {}", today.month(), today.year())
}
