//! The dashboard: charts summarizing spending for a selected day, month, or
//! year, with an optional category filter and a budget header for month
//! views.

mod charts;
mod handlers;

pub use handlers::{DashboardState, get_dashboard_page};
