//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{
        auth_guard, auth_guard_hx, get_forgot_password_page, get_log_in_page, get_log_out,
        post_log_in,
    },
    budget::{get_budget_page, submit_budget_endpoint},
    dashboard::get_dashboard_page,
    endpoints,
    expense::{
        create_expense_endpoint, delete_expense_endpoint, get_edit_expense_page,
        get_expenses_page, get_new_expense_page, update_expense_endpoint,
    },
    export::{
        get_budget_csv, get_expenses_csv, get_export_page, get_monthly_csv, get_monthly_summary,
        post_email_report,
    },
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    register_user::{get_register_page, register_user},
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::COFFEE, get(get_coffee))
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(
            endpoints::FORGOT_PASSWORD_VIEW,
            get(get_forgot_password_page),
        )
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::EXPENSES_VIEW, get(get_expenses_page))
        .route(endpoints::NEW_EXPENSE_VIEW, get(get_new_expense_page))
        .route(endpoints::EDIT_EXPENSE_VIEW, get(get_edit_expense_page))
        .route(endpoints::BUDGET_VIEW, get(get_budget_page))
        .route(endpoints::EXPORT_VIEW, get(get_export_page))
        .route(endpoints::EXPORT_EXPENSES_CSV, get(get_expenses_csv))
        .route(endpoints::EXPORT_BUDGET_CSV, get(get_budget_csv))
        .route(endpoints::EXPORT_MONTHLY_CSV, get(get_monthly_csv))
        .route(endpoints::MONTHLY_SUMMARY_API, get(get_monthly_summary))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These POST/PUT/DELETE routes need to use the HX-REDIRECT header for auth redirects to work properly for HTMX requests.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::EXPENSES_API, post(create_expense_endpoint))
            .route(
                endpoints::EXPENSE,
                put(update_expense_endpoint).delete(delete_expense_endpoint),
            )
            .route(endpoints::BUDGET_API, post(submit_budget_endpoint))
            .route(endpoints::EMAIL_REPORT, post(post_email_report))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    // static/ is populated at deploy time, not checked in. The page templates
    // expect: htmx-2.0.8-min.js, htmx-ext-response-targets-2.0.4.js,
    // echarts.6.0.0.min.js, main.css (the Tailwind build output), and
    // favicon-32x32.png/favicon-128x128.png. Missing files 404 and the
    // dashboard charts will not render without the ECharts bundle.
    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    (StatusCode::IM_A_TEAPOT, Html("I'm a teapot")).into_response()
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}
