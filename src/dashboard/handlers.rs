//! Dashboard HTTP handlers and view rendering.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, Month};

use crate::{
    AppState, Error,
    aggregation::{Breakdown, Scope, aggregate, parse_month_token},
    budget::get_budget_plan,
    dashboard::charts::{DashboardChart, build_charts, charts_script, charts_view},
    endpoints,
    expense::{Expense, get_expenses, parse_entry_date},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, HeadElement,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency, link,
    },
    navigation::NavBar,
    timezone::get_local_date,
    user::UserID,
};

/// The state needed for displaying the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading expenses and the budget plan.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The dashboard filter controls, sent as query parameters by a plain GET
/// form. Browsers submit blank fields as empty strings, so every field is
/// optional and empty means "not set".
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// Which period to summarize: "date", "month", or "year". Anything else
    /// falls back to the current month.
    #[serde(default)]
    pub filter_type: Option<String>,
    /// The date to summarize when `filter_type` is "date", as `YYYY-MM-DD`.
    #[serde(default)]
    pub filter_date: Option<String>,
    /// The month to summarize when `filter_type` is "month", as `YYYY-MM`.
    #[serde(default)]
    pub filter_month: Option<String>,
    /// The year to summarize when `filter_type` is "year".
    #[serde(default)]
    pub filter_year: Option<String>,
    /// Keep only expenses whose category matches exactly (case-sensitive).
    #[serde(default)]
    pub filter_category: Option<String>,
}

impl DashboardQuery {
    fn field(field: &Option<String>) -> Option<&str> {
        field.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Turn the filter controls into an aggregation scope.
///
/// A missing or unrecognized `filter_type` means the current month. A filter
/// type without its period value falls back to today's date, month, or year.
/// A period value that does not parse is an error echoing the input.
fn resolve_scope(query: &DashboardQuery, today: Date) -> Result<Scope, Error> {
    match DashboardQuery::field(&query.filter_type) {
        Some("date") => match DashboardQuery::field(&query.filter_date) {
            Some(raw) => parse_entry_date(raw)
                .map(Scope::Day)
                .ok_or_else(|| Error::InvalidPeriod(raw.to_owned())),
            None => Ok(Scope::Day(today)),
        },
        Some("year") => match DashboardQuery::field(&query.filter_year) {
            Some(raw) => raw
                .parse()
                .map(Scope::Year)
                .map_err(|_| Error::InvalidPeriod(raw.to_owned())),
            None => Ok(Scope::Year(today.year())),
        },
        _ => match DashboardQuery::field(&query.filter_month) {
            Some(raw) => parse_month_token(raw)
                .map(|(year, month)| Scope::Month { year, month })
                .ok_or_else(|| Error::InvalidPeriod(raw.to_owned())),
            None => Ok(Scope::current_month(today)),
        },
    }
}

/// How the current month's spending tracks against the budget plan. Shown in
/// the dashboard header when a month is being viewed and a plan exists.
struct BudgetHeader {
    planned: f64,
    spent: f64,
}

/// Display a summary of the user's spending for the selected period.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<DashboardQuery>,
) -> Response {
    let Some(today) = get_local_date(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let scope = match resolve_scope(&query, today) {
        Ok(scope) => scope,
        Err(error) => return error.into_response(),
    };
    let category_filter = DashboardQuery::field(&query.filter_category);

    let connection = state
        .db_connection
        .lock()
        .expect("Could not acquire database lock");

    let expenses = match get_expenses(user_id, &connection) {
        Ok(expenses) => expenses,
        Err(error) => return error.into_response(),
    };

    let breakdown = aggregate(&expenses, scope, category_filter);

    // The budget header always reflects the whole month, whatever category
    // filter is applied to the charts.
    let budget_header = match scope {
        Scope::Month { year, month } => {
            match get_budget_plan(user_id, year, month, &connection) {
                Ok(Some(plan)) => Some(BudgetHeader {
                    planned: plan.total,
                    spent: aggregate(&expenses, scope, None).total(),
                }),
                Ok(None) => None,
                Err(error) => return error.into_response(),
            }
        }
        _ => None,
    };

    dashboard_view(&query, scope, &breakdown, budget_header.as_ref()).into_response()
}

fn scope_label(scope: Scope) -> String {
    match scope {
        Scope::Day(date) => date.to_string(),
        Scope::Month { year, month } => match Month::try_from(month) {
            Ok(month) => format!("{month} {year}"),
            Err(_) => format!("{year}-{month:02}"),
        },
        Scope::Year(year) => year.to_string(),
    }
}

fn dashboard_view(
    query: &DashboardQuery,
    scope: Scope,
    breakdown: &Breakdown,
    budget_header: Option<&BudgetHeader>,
) -> Markup {
    let period = scope_label(scope);
    let has_data = match breakdown {
        Breakdown::Day { items, .. } => !items.is_empty(),
        Breakdown::Month {
            category_totals, ..
        }
        | Breakdown::Year {
            category_totals, ..
        } => !category_totals.is_empty(),
    };

    let charts = if has_data {
        build_charts(breakdown, &period)
    } else {
        Vec::new()
    };

    let month_expenses: &[Expense] = match breakdown {
        Breakdown::Month { expenses, .. } => expenses,
        _ => &[],
    };

    let content = html!(
        (NavBar::new(endpoints::DASHBOARD_VIEW).into_html())

        div
            id="dashboard-content"
            class="flex flex-col items-center px-2 lg:px-6 lg:py-8 mx-auto
                max-w-screen-xl text-gray-900 dark:text-white"
        {
            div class="w-full flex flex-col lg:flex-row lg:items-end lg:justify-between gap-4 mb-6"
            {
                h1 class="text-xl font-bold leading-tight tracking-tight md:text-2xl"
                {
                    "Spending for " (period)
                    @if let Some(category) = DashboardQuery::field(&query.filter_category) {
                        " · " (category)
                    }
                }

                (filter_form(query))
            }

            @if let Some(header) = budget_header {
                (budget_header_view(header, &period))
            }

            @if has_data {
                (charts_view(&charts))
            } @else {
                (no_data_view())
            }

            @if !month_expenses.is_empty() {
                (month_expenses_view(month_expenses, &period))
            }
        }
    );

    let scripts = if has_data {
        vec![
            HeadElement::ScriptLink("/static/echarts.6.0.0.min.js".to_owned()),
            charts_script(&charts),
        ]
    } else {
        Vec::new()
    };

    base("Dashboard", &scripts, &content)
}

fn filter_form(query: &DashboardQuery) -> Markup {
    let filter_type = DashboardQuery::field(&query.filter_type).unwrap_or("month");

    html!(
        form
            method="get"
            action=(endpoints::DASHBOARD_VIEW)
            class="flex flex-wrap items-end gap-3"
        {
            div
            {
                label for="filter_type" class=(FORM_LABEL_STYLE) { "Period" }
                select
                    name="filter_type"
                    id="filter_type"
                    class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="date" selected[filter_type == "date"] { "Day" }
                    option value="month" selected[filter_type == "month"] { "Month" }
                    option value="year" selected[filter_type == "year"] { "Year" }
                }
            }

            div
            {
                label for="filter_date" class=(FORM_LABEL_STYLE) { "Date" }
                input
                    type="date"
                    name="filter_date"
                    id="filter_date"
                    value=[DashboardQuery::field(&query.filter_date)]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="filter_month" class=(FORM_LABEL_STYLE) { "Month" }
                input
                    type="month"
                    name="filter_month"
                    id="filter_month"
                    value=[DashboardQuery::field(&query.filter_month)]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="filter_year" class=(FORM_LABEL_STYLE) { "Year" }
                input
                    type="number"
                    name="filter_year"
                    id="filter_year"
                    min="1"
                    max="9999"
                    value=[DashboardQuery::field(&query.filter_year)]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="filter_category" class=(FORM_LABEL_STYLE) { "Category" }
                input
                    type="text"
                    name="filter_category"
                    id="filter_category"
                    placeholder="All categories"
                    value=[DashboardQuery::field(&query.filter_category)]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) style="width: auto"
            {
                "Apply"
            }
        }
    )
}

/// The month's expenses as a table below the charts, in snapshot order
/// (newest first).
fn month_expenses_view(expenses: &[Expense], period: &str) -> Markup {
    html!(
        section class="w-full mt-8"
        {
            h2 class="text-lg font-semibold mb-2" { "Expenses for " (period) }

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
                        }
                    }

                    tbody
                    {
                        @for expense in expenses {
                            tr class=(TABLE_ROW_STYLE) data-month-expense-row="true"
                            {
                                td class=(TABLE_CELL_STYLE) { (format_currency(expense.amount)) }
                                td class=(TABLE_CELL_STYLE) { (expense.category) }
                                td class=(TABLE_CELL_STYLE) { (expense.description) }
                                td class=(TABLE_CELL_STYLE) { (expense.payment_method) }
                                td class=(TABLE_CELL_STYLE) { (expense.date) }
                            }
                        }
                    }
                }
            }
        }
    )
}

/// Renders the planned/spent/remaining cards for the month being viewed.
/// Negative remaining is shown as-is in red rather than clamped to zero.
fn budget_header_view(header: &BudgetHeader, period: &str) -> Markup {
    let remaining = header.planned - header.spent;

    html!(
        section class="w-full mb-6"
        {
            h2 class="text-lg font-semibold mb-2" { "Budget for " (period) }

            div class="grid grid-cols-1 sm:grid-cols-3 gap-4"
            {
                (budget_card("Planned", header.planned, false))
                (budget_card("Spent", header.spent, false))
                (budget_card("Remaining", remaining, remaining < 0.0))
            }
        }
    )
}

fn budget_card(label: &str, amount: f64, over_budget: bool) -> Markup {
    let amount_style = if over_budget {
        "text-2xl font-bold text-red-600 dark:text-red-500"
    } else {
        "text-2xl font-bold"
    };

    html!(
        div
            class="rounded-lg bg-white dark:bg-gray-800 shadow p-4"
            data-over-budget=(over_budget)
        {
            p class="text-sm text-gray-500 dark:text-gray-400" { (label) }
            p class=(amount_style) { (format_currency(amount)) }
        }
    )
}

fn no_data_view() -> Markup {
    let new_expense_link = link(endpoints::NEW_EXPENSE_VIEW, "record an expense");

    html!(
        div class="flex flex-col items-center px-6 py-8 mx-auto"
        {
            h2 class="text-xl font-bold"
            {
                "Nothing here yet..."
            }

            p
            {
                "Charts will show up here once you " (new_expense_link) " in this period."
            }
        }
    )
}

#[cfg(test)]
mod resolve_scope_tests {
    use time::macros::date;

    use crate::{Error, aggregation::Scope};

    use super::{DashboardQuery, resolve_scope};

    fn query(
        filter_type: Option<&str>,
        filter_date: Option<&str>,
        filter_month: Option<&str>,
        filter_year: Option<&str>,
    ) -> DashboardQuery {
        DashboardQuery {
            filter_type: filter_type.map(str::to_owned),
            filter_date: filter_date.map(str::to_owned),
            filter_month: filter_month.map(str::to_owned),
            filter_year: filter_year.map(str::to_owned),
            filter_category: None,
        }
    }

    const TODAY: time::Date = date!(2025 - 06 - 15);

    #[test]
    fn browser_query_string_resolves_to_selected_month() {
        // A GET form submits every control, blank ones as empty strings.
        let form_data = "filter_type=month&filter_date=&filter_month=2025-03&filter_year=&filter_category=";
        let query: DashboardQuery = serde_html_form::from_str(form_data).unwrap();

        let scope = resolve_scope(&query, TODAY).unwrap();

        assert_eq!(
            scope,
            Scope::Month {
                year: 2025,
                month: 3
            }
        );
        assert_eq!(DashboardQuery::field(&query.filter_category), None);
    }

    #[test]
    fn defaults_to_current_month() {
        let scope = resolve_scope(&DashboardQuery::default(), TODAY).unwrap();

        assert_eq!(
            scope,
            Scope::Month {
                year: 2025,
                month: 6
            }
        );
    }

    #[test]
    fn blank_fields_are_treated_as_unset() {
        let scope = resolve_scope(&query(Some("month"), None, Some("   "), None), TODAY).unwrap();

        assert_eq!(
            scope,
            Scope::Month {
                year: 2025,
                month: 6
            }
        );
    }

    #[test]
    fn date_filter_selects_a_day() {
        let scope = resolve_scope(
            &query(Some("date"), Some("2025-01-31"), None, None),
            TODAY,
        )
        .unwrap();

        assert_eq!(scope, Scope::Day(date!(2025 - 01 - 31)));
    }

    #[test]
    fn date_filter_without_date_uses_today() {
        let scope = resolve_scope(&query(Some("date"), None, None, None), TODAY).unwrap();

        assert_eq!(scope, Scope::Day(TODAY));
    }

    #[test]
    fn year_filter_selects_a_year() {
        let scope = resolve_scope(&query(Some("year"), None, None, Some("2024")), TODAY).unwrap();

        assert_eq!(scope, Scope::Year(2024));
    }

    #[test]
    fn malformed_month_token_is_echoed_back() {
        let result = resolve_scope(&query(Some("month"), None, Some("2025-6"), None), TODAY);

        assert_eq!(result, Err(Error::InvalidPeriod("2025-6".to_owned())));
    }

    #[test]
    fn malformed_date_is_echoed_back() {
        let result = resolve_scope(&query(Some("date"), Some("soon"), None, None), TODAY);

        assert_eq!(result, Err(Error::InvalidPeriod("soon".to_owned())));
    }
}
