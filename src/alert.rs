//! Alert system for displaying success and error messages to users.
//!
//! Alerts render into the `#alert-container` div in the base layout via an
//! HTMX out-of-band swap, so any endpoint can surface a message without
//! re-rendering the page it was called from.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

/// A message to display to the user in the floating alert container.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// The operation succeeded.
    Success {
        /// A short headline for the alert.
        message: String,
        /// Extra context displayed below the headline.
        details: String,
    },
    /// The operation failed.
    Error {
        /// A short headline for the alert.
        message: String,
        /// Extra context displayed below the headline.
        details: String,
    },
}

impl Alert {
    /// Create a new success alert.
    pub fn success(message: &str, details: &str) -> Self {
        Self::Success {
            message: message.to_owned(),
            details: details.to_owned(),
        }
    }

    /// Create a new error alert.
    pub fn error(message: &str, details: &str) -> Self {
        Self::Error {
            message: message.to_owned(),
            details: details.to_owned(),
        }
    }

    /// Render the alert as an out-of-band swap targeting `#alert-container`.
    pub fn into_markup(self) -> Markup {
        let (message, details, container_style, icon) = match self {
            Alert::Success { message, details } => (
                message,
                details,
                "flex items-start gap-3 p-4 mb-4 rounded-lg border \
                border-green-300 bg-green-50 text-green-800 \
                dark:border-green-800 dark:bg-gray-800 dark:text-green-400",
                "✓",
            ),
            Alert::Error { message, details } => (
                message,
                details,
                "flex items-start gap-3 p-4 mb-4 rounded-lg border \
                border-red-300 bg-red-50 text-red-800 \
                dark:border-red-800 dark:bg-gray-800 dark:text-red-400",
                "!",
            ),
        };

        html! {
            div
                id="alert-container"
                hx-swap-oob="true"
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                div class=(container_style) role="alert"
                {
                    span class="shrink-0 font-bold" aria-hidden="true" { (icon) }

                    div class="flex-1 text-sm"
                    {
                        p class="font-medium" { (message) }

                        @if !details.is_empty()
                        {
                            p { (details) }
                        }
                    }

                    button
                        type="button"
                        class="shrink-0 font-bold cursor-pointer"
                        aria-label="Close"
                        onclick="this.closest('#alert-container').innerHTML = ''"
                    {
                        "×"
                    }
                }
            }
        }
    }

    /// Render the alert as an HTTP response with the given status code.
    pub fn into_response(self, status_code: StatusCode) -> Response {
        (status_code, self.into_markup()).into_response()
    }
}

#[cfg(test)]
mod alert_tests {
    use crate::test_utils::parse_html_fragment;

    use super::Alert;

    #[test]
    fn success_alert_renders_message_and_details() {
        let markup = Alert::success("Saved", "Your changes were saved.").into_markup();

        let fragment = parse_html_fragment(&markup.into_string());
        let text = fragment.root_element().text().collect::<String>();

        assert!(text.contains("Saved"));
        assert!(text.contains("Your changes were saved."));
    }

    #[test]
    fn alert_swaps_into_alert_container() {
        let markup = Alert::error("Oops", "Something broke.").into_markup();
        let html = markup.into_string();

        assert!(html.contains("id=\"alert-container\""));
        assert!(html.contains("hx-swap-oob"));
    }
}
