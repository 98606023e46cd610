//! Budget plans for the application.
//!
//! This module contains the budget plan model and its database functions, the
//! evaluator that checks proposed expenses against a plan, the budget page,
//! and the endpoint the budget form submits to.

mod budget_page;
mod core;
mod evaluator;
mod submit_endpoint;

pub use budget_page::get_budget_page;
pub use self::core::{BudgetPlan, create_budget_tables, get_budget_plan, upsert_budget_plan};
pub use evaluator::{Evaluation, evaluate_expense};
pub use submit_endpoint::submit_budget_endpoint;
