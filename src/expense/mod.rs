//! Expense tracking for the application.
//!
//! This module contains everything related to expenses:
//! - The `Expense` model and its database functions
//! - The pages for listing, recording, and editing expenses
//! - The endpoints the pages submit to, including the budget check on the
//!   write path

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod edit_page;
mod expenses_page;
mod form;
mod new_expense_page;

pub use self::core::{
    DATE_FORMAT, Expense, ExpenseData, SNAPSHOT_LIMIT, create_expense, create_expense_table,
    get_expense, get_expenses, parse_entry_date, spent_for_category_in_month,
};
pub use create_endpoint::create_expense_endpoint;
pub use delete_endpoint::delete_expense_endpoint;
pub use edit_endpoint::update_expense_endpoint;
pub use edit_page::get_edit_expense_page;
pub use expenses_page::get_expenses_page;
pub use new_expense_page::get_new_expense_page;
