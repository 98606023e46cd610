//! Pivots a snapshot of expense records into the summaries used by the
//! dashboard, the CSV exports, and the JSON summary endpoint.
//!
//! The functions here are pure: they operate on already-fetched rows and an
//! injected scope, never on the database or the wall clock. Handlers fetch a
//! bounded snapshot, decide the scope (defaulting to the current month in the
//! server's local timezone), and hand both to [aggregate].
//!
//! Two rules are load-bearing:
//!
//! - Rows whose date does not parse as a calendar date are skipped by month
//!   and year bucketing rather than failing the whole aggregation. They still
//!   show up in plain expense lists.
//! - Sums are accumulated at full precision. Rounding to two decimals happens
//!   once, at the formatting boundary, so repeated aggregation cannot compound
//!   rounding error.

use std::collections::BTreeMap;

use time::Date;

use crate::expense::{Expense, parse_entry_date};

/// Calendar month names, used as the row keys of year-scope summaries.
pub const MONTH_LABELS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// The period a summary covers.
///
/// Construct the default scope from an injected "today" at the handler
/// boundary, not inside this module, so aggregation stays deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// A single calendar date.
    Day(Date),
    /// A single calendar month.
    Month {
        /// The year of the month.
        year: i32,
        /// The month, 1 through 12.
        month: u8,
    },
    /// A whole calendar year.
    Year(i32),
}

impl Scope {
    /// The scope for the month containing `today`.
    pub fn current_month(today: Date) -> Self {
        Self::Month {
            year: today.year(),
            month: today.month() as u8,
        }
    }
}

/// Parse a `YYYY-MM` month token, e.g. "2025-06", as sent by month filter
/// inputs and the monthly export endpoints.
///
/// Returns `None` for anything else so callers can reject the token and echo
/// it back to the client.
pub fn parse_month_token(token: &str) -> Option<(i32, u8)> {
    let (year, month) = token.split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }

    let year: i32 = year.parse().ok()?;
    let month: u8 = month.parse().ok()?;

    (1..=12).contains(&month).then_some((year, month))
}

/// A pivoted view of an expense snapshot, shaped by the [Scope] it was
/// aggregated under.
///
/// Category keys preserve the casing the expenses were stored with. Only
/// budget matching lower-cases categories, aggregation does not normalize.
#[derive(Debug, Clone, PartialEq)]
pub enum Breakdown {
    /// One entry per expense on a single date, not pre-summed, so a daily
    /// chart can show individual purchases.
    Day {
        /// (category, amount) per matching expense, in snapshot order.
        items: Vec<(String, f64)>,
        /// The sum of all matching amounts.
        total: f64,
    },
    /// Totals for a single month, plus the month's expenses themselves.
    Month {
        /// Total spent per category across the month.
        category_totals: BTreeMap<String, f64>,
        /// Total spent per date within the month.
        daily_totals: BTreeMap<Date, f64>,
        /// The matching expenses in snapshot order, for tabular display.
        expenses: Vec<Expense>,
        /// The sum of all matching amounts.
        total: f64,
    },
    /// Totals for a whole year.
    Year {
        /// Total per calendar month, January first, zero for months with no
        /// matching spend.
        monthly_totals: [f64; 12],
        /// Total spent per category across the year.
        category_totals: BTreeMap<String, f64>,
        /// Per-month category totals, January first. Categories with no
        /// spend in a month are absent from that month's map.
        monthly_by_category: Box<[BTreeMap<String, f64>; 12]>,
        /// The sum of all matching amounts.
        total: f64,
    },
}

impl Breakdown {
    /// The sum of all amounts that matched the scope.
    pub fn total(&self) -> f64 {
        match self {
            Self::Day { total, .. } | Self::Month { total, .. } | Self::Year { total, .. } => {
                *total
            }
        }
    }

    /// Total spent per category, in category order.
    ///
    /// Empty for day scope, which reports individual items instead.
    pub fn category_totals(&self) -> BTreeMap<String, f64> {
        match self {
            Self::Day { items, .. } => {
                let mut totals = BTreeMap::new();
                for (category, amount) in items {
                    *totals.entry(category.clone()).or_insert(0.0) += amount;
                }
                totals
            }
            Self::Month {
                category_totals, ..
            }
            | Self::Year {
                category_totals, ..
            } => category_totals.clone(),
        }
    }
}

/// Summarize `expenses` under `scope`, optionally keeping only expenses whose
/// category exactly matches `category_filter` (case-sensitive, matching how
/// categories are displayed rather than how budgets are keyed).
///
/// Expenses with unparseable dates are skipped by month and year scopes. Day
/// scope compares the stored date string against the scope date directly, so
/// such rows never match there either.
pub fn aggregate(expenses: &[Expense], scope: Scope, category_filter: Option<&str>) -> Breakdown {
    let matches_filter = |expense: &Expense| match category_filter {
        Some(filter) => expense.category == filter,
        None => true,
    };

    match scope {
        Scope::Day(date) => {
            let date_string = date.to_string();
            let mut items = Vec::new();
            let mut total = 0.0;

            for expense in expenses {
                if expense.date != date_string || !matches_filter(expense) {
                    continue;
                }

                items.push((expense.category.clone(), expense.amount));
                total += expense.amount;
            }

            Breakdown::Day { items, total }
        }
        Scope::Month { year, month } => {
            let mut category_totals = BTreeMap::new();
            let mut daily_totals = BTreeMap::new();
            let mut matching = Vec::new();
            let mut total = 0.0;

            for expense in expenses {
                if !matches_filter(expense) {
                    continue;
                }
                let Some(date) = entry_date_or_skip(expense) else {
                    continue;
                };
                if date.year() != year || date.month() as u8 != month {
                    continue;
                }

                *category_totals
                    .entry(expense.category.clone())
                    .or_insert(0.0) += expense.amount;
                *daily_totals.entry(date).or_insert(0.0) += expense.amount;
                matching.push(expense.clone());
                total += expense.amount;
            }

            Breakdown::Month {
                category_totals,
                daily_totals,
                expenses: matching,
                total,
            }
        }
        Scope::Year(year) => {
            let mut monthly_totals = [0.0; 12];
            let mut category_totals = BTreeMap::new();
            let mut monthly_by_category: Box<[BTreeMap<String, f64>; 12]> = Default::default();
            let mut total = 0.0;

            for expense in expenses {
                if !matches_filter(expense) {
                    continue;
                }
                let Some(date) = entry_date_or_skip(expense) else {
                    continue;
                };
                if date.year() != year {
                    continue;
                }

                let month_index = date.month() as usize - 1;
                monthly_totals[month_index] += expense.amount;
                *category_totals
                    .entry(expense.category.clone())
                    .or_insert(0.0) += expense.amount;
                *monthly_by_category[month_index]
                    .entry(expense.category.clone())
                    .or_insert(0.0) += expense.amount;
                total += expense.amount;
            }

            Breakdown::Year {
                monthly_totals,
                category_totals,
                monthly_by_category,
                total,
            }
        }
    }
}

fn entry_date_or_skip(expense: &Expense) -> Option<Date> {
    let date = parse_entry_date(&expense.date);
    if date.is_none() {
        tracing::debug!(
            "skipping expense {} with unparseable date {:?}",
            expense.id,
            expense.date
        );
    }
    date
}
