//! Shared form fields for the new-expense and edit-expense pages.

use maud::{Markup, html};
use time::Date;

use crate::html::{FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE};

/// The values an expense form is rendered with.
///
/// Empty for a new expense, the stored values when editing, and the user's
/// rejected input when a submission fails the budget check so nothing typed
/// is lost.
pub struct ExpenseFormValues<'a> {
    pub amount: Option<f64>,
    pub category: &'a str,
    pub description: &'a str,
    pub payment_method: &'a str,
    pub date: Option<Date>,
    /// The latest selectable date, the current date in the server's timezone.
    pub max_date: Date,
}

impl ExpenseFormValues<'_> {
    /// Form values for an empty form defaulting to `today`.
    pub fn empty(today: Date) -> ExpenseFormValues<'static> {
        ExpenseFormValues {
            amount: None,
            category: "",
            description: "",
            payment_method: "",
            date: Some(today),
            max_date: today,
        }
    }
}

pub fn expense_form_fields(values: &ExpenseFormValues<'_>) -> Markup {
    let amount_str = values.amount.map(|amount| format!("{amount:.2}"));

    html! {
        div
        {
            label
                for="amount"
                class=(FORM_LABEL_STYLE)
            {
                "Amount"
            }

            div class="input-wrapper w-full"
            {
                input
                    name="amount"
                    id="amount"
                    type="number"
                    step="0.01"
                    min="0"
                    placeholder="0.00"
                    required
                    value=[amount_str.as_deref()]
                    class=(FORM_TEXT_INPUT_STYLE);
            }
        }

        div
        {
            label
                for="category"
                class=(FORM_LABEL_STYLE)
            {
                "Category"
            }

            input
                name="category"
                id="category"
                type="text"
                placeholder="Food"
                required
                value=(values.category)
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label
                for="description"
                class=(FORM_LABEL_STYLE)
            {
                "Description"
            }

            input
                name="description"
                id="description"
                type="text"
                placeholder="Description"
                value=(values.description)
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label
                for="payment_method"
                class=(FORM_LABEL_STYLE)
            {
                "Payment method"
            }

            input
                name="payment_method"
                id="payment_method"
                type="text"
                placeholder="Cash"
                value=(values.payment_method)
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label
                for="date"
                class=(FORM_LABEL_STYLE)
            {
                "Date"
            }

            input
                name="date"
                id="date"
                type="date"
                max=(values.max_date)
                value=[values.date.map(|date| date.to_string())]
                required
                class=(FORM_TEXT_INPUT_STYLE);
        }
    }
}
