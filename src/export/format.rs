//! Turns aggregation results into CSV rows and JSON records.
//!
//! Amounts are carried as full-precision floats everywhere else in the app;
//! this module is where they are rounded to two decimals for presentation.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{Error, expense::Expense, html::CURRENCY_SYMBOL};

/// Round to two decimals, halves away from zero.
pub fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn amount_field(amount: f64) -> String {
    format!("{:.2}", round2(amount))
}

/// Render expenses as CSV with the header `Category,Amount,Date`.
///
/// An empty slice produces just the header row.
pub fn expenses_csv(expenses: &[Expense]) -> Result<Vec<u8>, Error> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["Category", "Amount", "Date"])?;

    for expense in expenses {
        let amount = amount_field(expense.amount);
        writer.write_record([
            expense.category.as_str(),
            amount.as_str(),
            expense.date.as_str(),
        ])?;
    }

    finish(writer)
}

/// Render budget ceilings as CSV with the header `Category,Planned Budget (₹)`.
///
/// Category keys are written as stored in the plan (lowercase).
pub fn budget_csv(category_ceilings: &BTreeMap<String, f64>) -> Result<Vec<u8>, Error> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record([
        "Category".to_owned(),
        format!("Planned Budget ({CURRENCY_SYMBOL})"),
    ])?;

    for (category, ceiling) in category_ceilings {
        let ceiling = amount_field(*ceiling);
        writer.write_record([category.as_str(), ceiling.as_str()])?;
    }

    finish(writer)
}

/// Render a month's category totals as CSV with the header
/// `Month,Category,Total Amount`.
pub fn monthly_csv(
    year: i32,
    month: u8,
    category_totals: &BTreeMap<String, f64>,
) -> Result<Vec<u8>, Error> {
    let month_token = format!("{year:04}-{month:02}");

    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(["Month", "Category", "Total Amount"])?;

    for (category, total) in category_totals {
        let total = amount_field(*total);
        writer.write_record([month_token.as_str(), category.as_str(), total.as_str()])?;
    }

    finish(writer)
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, Error> {
    writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))
}

/// One entry of the JSON monthly summary.
#[derive(Debug, PartialEq, Serialize)]
pub struct CategoryAmount {
    /// The category, as stored.
    pub category: String,
    /// The total for the category, rounded to two decimals.
    pub amount: f64,
}

/// Shape a month's category totals for the JSON summary endpoint.
pub fn monthly_summary(category_totals: &BTreeMap<String, f64>) -> Vec<CategoryAmount> {
    category_totals
        .iter()
        .map(|(category, total)| CategoryAmount {
            category: category.clone(),
            amount: round2(*total),
        })
        .collect()
}

#[cfg(test)]
mod format_tests {
    use std::collections::BTreeMap;

    use crate::{expense::Expense, user::UserID};

    use super::{budget_csv, expenses_csv, monthly_csv, monthly_summary, round2};

    fn expense(category: &str, amount: f64, date: &str) -> Expense {
        Expense {
            id: 1,
            user_id: UserID::new(1),
            amount,
            category: category.to_string(),
            description: String::new(),
            payment_method: String::new(),
            date: date.to_string(),
        }
    }

    #[test]
    fn round2_rounds_halves_away_from_zero() {
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
        assert_eq!(round2(12.344), 12.34);
        assert_eq!(round2(12.346), 12.35);
    }

    #[test]
    fn expenses_csv_writes_header_and_rows() {
        let expenses = vec![
            expense("food", 100.0, "2025-06-01"),
            expense("travel", 50.5, "2025-06-15"),
        ];

        let bytes = expenses_csv(&expenses).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(
            text,
            "Category,Amount,Date\nfood,100.00,2025-06-01\ntravel,50.50,2025-06-15\n"
        );
    }

    #[test]
    fn expenses_csv_with_no_expenses_is_header_only() {
        let bytes = expenses_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(text, "Category,Amount,Date\n");
    }

    #[test]
    fn expenses_csv_renders_missing_fields_as_empty() {
        let expenses = vec![expense("", 10.0, "")];

        let bytes = expenses_csv(&expenses).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(text, "Category,Amount,Date\n,10.00,\n");
    }

    #[test]
    fn budget_csv_includes_rupee_symbol_in_header() {
        let ceilings = BTreeMap::from([("food".to_string(), 500.0)]);

        let bytes = budget_csv(&ceilings).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(text, "Category,Planned Budget (₹)\nfood,500.00\n");
    }

    #[test]
    fn monthly_csv_repeats_the_month_token() {
        let totals = BTreeMap::from([("food".to_string(), 100.0), ("travel".to_string(), 50.0)]);

        let bytes = monthly_csv(2025, 6, &totals).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert_eq!(
            text,
            "Month,Category,Total Amount\n2025-06,food,100.00\n2025-06,travel,50.00\n"
        );
    }

    #[test]
    fn monthly_summary_rounds_amounts() {
        let totals = BTreeMap::from([("food".to_string(), 0.1 + 0.2)]);

        let summary = monthly_summary(&totals);

        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].category, "food");
        assert_eq!(summary[0].amount, 0.3);
    }

    #[test]
    fn monthly_summary_serializes_as_expected() {
        let totals = BTreeMap::from([("food".to_string(), 100.0)]);

        let json = serde_json::to_value(monthly_summary(&totals)).unwrap();

        assert_eq!(
            json,
            serde_json::json!([{"category": "food", "amount": 100.0}])
        );
    }
}
