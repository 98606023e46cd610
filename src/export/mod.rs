//! Getting data out of the app: CSV downloads, a JSON monthly summary, and
//! emailed expense reports.

mod format;
mod handlers;

pub use handlers::{
    EmailReportState, ExportState, get_budget_csv, get_expenses_csv, get_export_page,
    get_monthly_csv, get_monthly_summary, post_email_report,
};
