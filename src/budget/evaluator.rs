//! Decides whether a proposed expense fits within the user's budget plan.
//!
//! The check is advisory rather than transactional: the caller reads what has
//! already been spent, evaluates, and then writes, without holding a lock
//! across the three steps. Two simultaneous submissions for the same category
//! can therefore both pass and jointly exceed the ceiling. This is an
//! accepted trade-off for a single-user expense tracker.

use crate::budget::BudgetPlan;

/// The outcome of checking a proposed expense against a budget plan.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// The expense fits within the budget (or there is no budget to check).
    Accepted,
    /// The expense would push the category past its ceiling.
    Rejected {
        /// The category as the user entered it.
        category: String,
        /// The proposed amount.
        amount: f64,
        /// The ceiling for the category from the budget plan.
        ceiling: f64,
    },
}

/// Check whether spending `amount` on `category` would exceed the user's
/// budget for the month.
///
/// `prior_spent` is what has already been spent on the category this month.
/// The category is matched against the plan's ceilings case-insensitively
/// (plans store lower-cased keys). A missing plan or a category with no
/// ceiling always accepts, budgets are opt-in per category.
///
/// Spending exactly up to the ceiling is accepted, only going past it is
/// rejected.
pub fn evaluate_expense(
    plan: Option<&BudgetPlan>,
    category: &str,
    amount: f64,
    prior_spent: f64,
) -> Evaluation {
    let Some(plan) = plan else {
        return Evaluation::Accepted;
    };

    let Some(ceiling) = plan.category_ceilings.get(&category.to_lowercase()) else {
        return Evaluation::Accepted;
    };

    if prior_spent + amount > *ceiling {
        Evaluation::Rejected {
            category: category.to_owned(),
            amount,
            ceiling: *ceiling,
        }
    } else {
        Evaluation::Accepted
    }
}
