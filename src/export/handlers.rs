//! The export page and the endpoints it links to: CSV downloads, the JSON
//! monthly summary, and emailed reports.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::Form;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, Month};

use crate::{
    AppState, Error,
    aggregation::{Scope, aggregate, parse_month_token},
    alert::Alert,
    budget::get_budget_plan,
    endpoints,
    expense::{Expense, get_expenses, parse_entry_date},
    export::format::{budget_csv, expenses_csv, monthly_csv, monthly_summary},
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base, link, loading_spinner,
    },
    mail::{Attachment, EmailMessage, Mailer},
    navigation::NavBar,
    timezone::get_local_date,
    user::{UserID, get_user_by_id},
};

/// The state needed for the export page and the CSV download endpoints.
#[derive(Debug, Clone)]
pub struct ExportState {
    /// The database connection for reading expenses and the budget plan.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
}

impl FromRef<AppState> for ExportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The state needed for emailing expense reports.
#[derive(Debug, Clone)]
pub struct EmailReportState {
    /// The database connection for reading the user and their expenses.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
    /// Where outgoing email is handed for delivery.
    pub mailer: Arc<dyn Mailer>,
}

impl FromRef<AppState> for EmailReportState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            mailer: state.mailer.clone(),
        }
    }
}

/// An optional "YYYY-MM" month selection, sent by the export page's forms.
/// Empty strings are treated the same as a missing field.
#[derive(Debug, Default, Deserialize)]
pub struct MonthSelection {
    /// The month to report on. Defaults to the current month.
    #[serde(default)]
    pub month: Option<String>,
}

impl MonthSelection {
    fn token(&self) -> Option<&str> {
        self.month
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

/// Turn the month selection into a (year, month) pair, falling back to the
/// month `today` is in. A token that does not parse is an error echoing the
/// input.
fn resolve_month(selection: &MonthSelection, today: Date) -> Result<(i32, u8), Error> {
    match selection.token() {
        Some(raw) => parse_month_token(raw).ok_or_else(|| Error::InvalidPeriod(raw.to_owned())),
        None => Ok((today.year(), today.month() as u8)),
    }
}

fn month_token(year: i32, month: u8) -> String {
    format!("{year:04}-{month:02}")
}

fn month_label(year: i32, month: u8) -> String {
    match Month::try_from(month) {
        Ok(month) => format!("{month} {year}"),
        Err(_) => month_token(year, month),
    }
}

fn keep_month(expenses: Vec<Expense>, year: i32, month: u8) -> Vec<Expense> {
    expenses
        .into_iter()
        .filter(|expense| {
            parse_entry_date(&expense.date)
                .is_some_and(|date| date.year() == year && date.month() as u8 == month)
        })
        .collect()
}

/// A CSV file download with a suggested filename.
fn csv_response(filename: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// Display the export page: download links, the monthly overview form, and
/// the email report form.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_export_page(State(state): State<ExportState>) -> Response {
    let Some(today) = get_local_date(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let current_month = month_token(today.year(), today.month() as u8);

    export_view(&current_month).into_response()
}

fn export_view(current_month: &str) -> Markup {
    let content = html!(
        (NavBar::new(endpoints::EXPORT_VIEW).into_html())

        div class="flex flex-col px-6 py-8 mx-auto max-w-screen-md gap-8
            text-gray-900 dark:text-white"
        {
            h1 class="text-xl font-bold leading-tight tracking-tight md:text-2xl"
            {
                "Export your data"
            }

            section
            {
                h2 class="text-lg font-semibold mb-2" { "Downloads" }

                ul class="list-disc list-inside flex flex-col gap-1"
                {
                    li
                    {
                        (link(endpoints::EXPORT_EXPENSES_CSV, "All expenses"))
                        " as CSV, newest first."
                    }

                    li
                    {
                        (link(endpoints::EXPORT_BUDGET_CSV, "This month's budget plan"))
                        " as CSV. Empty if you have not set a budget this month."
                    }
                }
            }

            section
            {
                h2 class="text-lg font-semibold mb-2" { "Monthly overview" }

                p class="mb-2"
                {
                    "Download a month's spending per category as CSV. The same \
                    numbers are served as JSON from "
                    code { (endpoints::MONTHLY_SUMMARY_API) }
                    "."
                }

                form
                    method="get"
                    action=(endpoints::EXPORT_MONTHLY_CSV)
                    class="flex flex-wrap items-end gap-3"
                {
                    div
                    {
                        label for="month" class=(FORM_LABEL_STYLE) { "Month" }
                        input
                            type="month"
                            name="month"
                            id="month"
                            value=(current_month)
                            class=(FORM_TEXT_INPUT_STYLE);
                    }

                    button type="submit" class=(BUTTON_PRIMARY_STYLE) style="width: auto"
                    {
                        "Download"
                    }
                }
            }

            section
            {
                h2 class="text-lg font-semibold mb-2" { "Email report" }

                p class="mb-2"
                {
                    "Send a month's expenses as a CSV attachment to the email \
                    address on your account."
                }

                form
                    hx-post=(endpoints::EMAIL_REPORT)
                    class="flex flex-wrap items-end gap-3"
                {
                    div
                    {
                        label for="report_month" class=(FORM_LABEL_STYLE) { "Month" }
                        input
                            type="month"
                            name="month"
                            id="report_month"
                            value=(current_month)
                            class=(FORM_TEXT_INPUT_STYLE);
                    }

                    button type="submit" class=(BUTTON_PRIMARY_STYLE) style="width: auto"
                    {
                        span class="inline-flex items-center gap-2"
                        {
                            (loading_spinner())
                            "Email me this report"
                        }
                    }
                }
            }
        }
    );

    base("Export", &[], &content)
}

/// Download all of the user's expenses as CSV.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_expenses_csv(
    State(state): State<ExportState>,
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

    match expenses_csv(&expenses) {
        Ok(bytes) => csv_response("expenses.csv", bytes),
        Err(error) => error.into_response(),
    }
}

/// Download the current month's budget plan as CSV.
///
/// A missing plan produces a CSV with only the header row.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_budget_csv(
    State(state): State<ExportState>,
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

    let ceilings = plan.map(|plan| plan.category_ceilings).unwrap_or_default();

    match budget_csv(&ceilings) {
        Ok(bytes) => csv_response("budget.csv", bytes),
        Err(error) => error.into_response(),
    }
}

/// Download a month's spending per category as CSV.
///
/// The file is named after the month, e.g. "2025-06_overview.csv".
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_monthly_csv(
    State(state): State<ExportState>,
    Extension(user_id): Extension<UserID>,
    Query(selection): Query<MonthSelection>,
) -> Response {
    let Some(today) = get_local_date(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let (year, month) = match resolve_month(&selection, today) {
        Ok(period) => period,
        Err(error) => return error.into_response(),
    };

    let connection = state
        .db_connection
        .lock()
        .expect("Could not acquire database lock");

    let expenses = match get_expenses(user_id, &connection) {
        Ok(expenses) => expenses,
        Err(error) => return error.into_response(),
    };

    let totals = aggregate(&expenses, Scope::Month { year, month }, None).category_totals();

    match monthly_csv(year, month, &totals) {
        Ok(bytes) => csv_response(&format!("{}_overview.csv", month_token(year, month)), bytes),
        Err(error) => error.into_response(),
    }
}

/// Serve a month's spending per category as JSON.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_monthly_summary(
    State(state): State<ExportState>,
    Extension(user_id): Extension<UserID>,
    Query(selection): Query<MonthSelection>,
) -> Response {
    let Some(today) = get_local_date(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_response();
    };

    let (year, month) = match resolve_month(&selection, today) {
        Ok(period) => period,
        Err(error) => return error.into_response(),
    };

    let connection = state
        .db_connection
        .lock()
        .expect("Could not acquire database lock");

    let expenses = match get_expenses(user_id, &connection) {
        Ok(expenses) => expenses,
        Err(error) => return error.into_response(),
    };

    let totals = aggregate(&expenses, Scope::Month { year, month }, None).category_totals();

    Json(monthly_summary(&totals)).into_response()
}

/// Email the user a CSV report of a month's expenses.
///
/// The email goes to the address on the user's account; an account without an
/// email address gets an error alert instead. Delivery is fire and forget, a
/// dropped email does not fail this request.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn post_email_report(
    State(state): State<EmailReportState>,
    Extension(user_id): Extension<UserID>,
    Form(selection): Form<MonthSelection>,
) -> Response {
    let Some(today) = get_local_date(&state.local_timezone) else {
        return Error::InvalidTimezoneError(state.local_timezone).into_alert_response();
    };

    let (year, month) = match resolve_month(&selection, today) {
        Ok(period) => period,
        Err(error) => return error.into_alert_response(),
    };

    let (user, expenses) = {
        let connection = state
            .db_connection
            .lock()
            .expect("Could not acquire database lock");

        let user = match get_user_by_id(user_id, &connection) {
            Ok(user) => user,
            Err(error) => return error.into_alert_response(),
        };

        let expenses = match get_expenses(user_id, &connection) {
            Ok(expenses) => expenses,
            Err(error) => return error.into_alert_response(),
        };

        (user, expenses)
    };

    let Some(email) = user.email else {
        return Error::EmailMissing.into_alert_response();
    };

    let report = match expenses_csv(&keep_month(expenses, year, month)) {
        Ok(bytes) => bytes,
        Err(error) => return error.into_alert_response(),
    };

    let label = month_label(year, month);

    state.mailer.send(EmailMessage {
        to: email.clone(),
        subject: format!("Khata expense report for {label}"),
        body: format!("Attached are your recorded expenses for {label}."),
        attachment: Some(Attachment {
            filename: format!(
                "{}_{}_expenses.csv",
                user.name,
                month_token(year, month)
            ),
            content: report,
        }),
    });

    Alert::success(
        "Report sent",
        &format!("Your {label} expense report is on its way to {email}."),
    )
    .into_response(StatusCode::OK)
}
