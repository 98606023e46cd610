//! Shared helpers for tests that inspect rendered HTML.

use axum::{body::Body, http::Response};
use scraper::Html;

/// Parse a full HTML document and assert that it is well formed.
#[track_caller]
pub fn parse_html_document(text: &str) -> Html {
    let document = Html::parse_document(text);
    assert_valid_html(&document);

    document
}

/// Parse an HTML fragment, e.g. a form re-rendered by an endpoint.
pub fn parse_html_fragment(text: &str) -> Html {
    Html::parse_fragment(text)
}

/// Read the body of `response` and parse it as an HTML document.
pub async fn parse_html_response(response: Response<Body>) -> Html {
    let body = response.into_body();
    let body = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Could not get response body");
    let text = String::from_utf8_lossy(&body).to_string();

    parse_html_document(&text)
}

#[track_caller]
pub fn assert_valid_html(html: &Html) {
    assert!(
        html.errors.is_empty(),
        "Got HTML parsing errors: {:?}",
        html.errors
    );
}
