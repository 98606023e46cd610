//! The registration page and the endpoint that creates new user accounts.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::{Form, PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    app_state::create_cookie_key,
    auth::{DEFAULT_COOKIE_DURATION, set_auth_cookie},
    endpoints,
    html::{
        FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base, loading_spinner, log_in_register,
        password_input,
    },
    internal_server_error::get_internal_server_error_redirect,
    user::create_user,
};

/// The minimum number of characters the password should have to be considered valid on the client side (server-side validation is done on top of this validation).
const PASSWORD_INPUT_MIN_LENGTH: u8 = 14;

fn confirm_password_input(min_length: u8, error_message: Option<&str>) -> Markup {
    html! {
        div
        {
            label
                for="confirm-password"
                class=(FORM_LABEL_STYLE)
            {
                "Confirm Password"
            }

            input
                type="password"
                name="confirm_password"
                id="confirm-password"
                placeholder="••••••••"
                class=(FORM_TEXT_INPUT_STYLE)
                required
                minlength=(min_length)
                autofocus[error_message.is_some()]
            ;

            @if let Some(error_message) = error_message
            {
                p class="text-red-500 text-base" { (error_message) }
            }
        }
    }
}

struct RegistrationFormErrors<'a> {
    username: Option<&'a str>,
    password: Option<&'a str>,
    confirm_password: Option<&'a str>,
}

impl RegistrationFormErrors<'_> {
    fn none() -> Self {
        Self {
            username: None,
            password: None,
            confirm_password: None,
        }
    }
}

fn registration_form(username: &str, email: &str, errors: &RegistrationFormErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::USERS)
            hx-indicator="#indicator"
            hx-disabled-elt="find input, find button"
            class="space-y-4 md:space-y-6"
        {
            div
            {
                label
                    for="username"
                    class=(FORM_LABEL_STYLE)
                {
                    "Username"
                }

                input
                    type="text"
                    name="username"
                    id="username"
                    placeholder="Your username"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required
                    value=(username);

                @if let Some(error_message) = errors.username
                {
                    p class="text-red-500 text-base" { (error_message) }
                }
            }

            div
            {
                label
                    for="email"
                    class=(FORM_LABEL_STYLE)
                {
                    "Email (optional, for log-in alerts and expense reports)"
                }

                input
                    type="email"
                    name="email"
                    id="email"
                    placeholder="you@example.com"
                    class=(FORM_TEXT_INPUT_STYLE)
                    value=(email);
            }

            (password_input("", PASSWORD_INPUT_MIN_LENGTH, errors.password))
            (confirm_password_input(PASSWORD_INPUT_MIN_LENGTH, errors.confirm_password))

            button
                type="submit" id="submit-button" tabindex="0"
                class="w-full px-4 py-2 bg-blue-500 dark:bg-blue-600 disabled:bg-blue-700
                    hover:enabled:bg-blue-600 hover:enabled:dark:bg-blue-700 text-white rounded"
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Create Account"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "

                a
                    href=(endpoints::LOG_IN_VIEW) tabindex="0"
                    class="font-semibold leading-6 text-blue-600 hover:text-blue-500 dark:text-blue-500 dark:hover:text-blue-400"
                {
                  "Log in here"
                }
            }
        }
    }
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    let registration_form = registration_form("", "", &RegistrationFormErrors::none());
    let content = log_in_register("Create an account", &registration_form);
    base("Register", &[], &content).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl RegistrationState {
    /// Create the cookie key from a string and set the default cookie duration.
    pub fn new(cookie_secret: &str, db_connection: Arc<Mutex<Connection>>) -> Self {
        Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection,
        }
    }
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

/// The raw data entered by the user in the registration form.
#[derive(Serialize, Deserialize)]
pub struct RegisterForm {
    /// The name the user will log in with.
    pub username: String,
    /// Where to send log-in alerts and expense reports. Browsers send an
    /// empty string when the field is left blank.
    #[serde(default)]
    pub email: Option<String>,
    /// The password for the new account.
    pub password: String,
    /// The password entered a second time, to catch typos.
    pub confirm_password: String,
}

/// Create a new user account.
///
/// On success the new user is logged in straight away, the auth cookie is
/// set and the client is redirected to the dashboard. On a validation error
/// the form is re-rendered with an error message next to the offending field.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn register_user(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let username = user_data.username.trim();
    let email = user_data
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty());

    if username.is_empty() {
        return registration_form(
            username,
            email.unwrap_or_default(),
            &RegistrationFormErrors {
                username: Some("Please choose a username."),
                ..RegistrationFormErrors::none()
            },
        )
        .into_response();
    }

    let validated_password = match ValidatedPassword::new(&user_data.password) {
        Ok(password) => password,
        Err(error) => {
            return registration_form(
                username,
                email.unwrap_or_default(),
                &RegistrationFormErrors {
                    password: Some(error.to_string().as_ref()),
                    ..RegistrationFormErrors::none()
                },
            )
            .into_response();
        }
    };

    if user_data.password != user_data.confirm_password {
        return registration_form(
            username,
            email.unwrap_or_default(),
            &RegistrationFormErrors {
                confirm_password: Some("Passwords do not match"),
                ..RegistrationFormErrors::none()
            },
        )
        .into_response();
    }

    let password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::error!("an error occurred while hashing a password: {e}");

            return get_internal_server_error_redirect();
        }
    };

    let create_result = create_user(
        username,
        email,
        password_hash,
        &state
            .db_connection
            .lock()
            .expect("Could not acquire database lock"),
    );

    match create_result {
        Ok(user) => match set_auth_cookie(jar, user.id, state.cookie_duration) {
            Ok(jar) => (
                StatusCode::SEE_OTHER,
                HxRedirect(endpoints::DASHBOARD_VIEW.to_owned()),
                jar,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("An error occurred while setting the auth cookie: {e}");

                get_internal_server_error_redirect()
            }
        },
        Err(Error::DuplicateUsername) => registration_form(
            username,
            email.unwrap_or_default(),
            &RegistrationFormErrors {
                username: Some("That username is already taken."),
                ..RegistrationFormErrors::none()
            },
        )
        .into_response(),
        Err(e) => {
            tracing::error!("An unhandled error occurred while inserting a new user: {e}");

            get_internal_server_error_redirect()
        }
    }
}


#[cfg(test)]
mod register_user_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, routing::post};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use scraper::{Html, Selector};

    use crate::{
        auth::COOKIE_USER_ID,
        endpoints,
        user::{create_user_table, get_user_by_name},
    };

    use super::{RegisterForm, RegistrationState, register_user};

    const TEST_PASSWORD: &str = "iamtestingwhethericancreateanewuser";

    fn get_test_state() -> RegistrationState {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        create_user_table(&connection).expect("Could not create user table");

        RegistrationState::new("42", Arc::new(Mutex::new(connection)))
    }

    fn get_test_server(state: RegistrationState) -> TestServer {
        let app = Router::new()
            .route(endpoints::USERS, post(register_user))
            .with_state(state);

        TestServer::new(app)
    }

    fn register_form(username: &str, email: &str, password: &str) -> RegisterForm {
        RegisterForm {
            username: username.to_string(),
            email: Some(email.to_string()),
            password: password.to_string(),
            confirm_password: password.to_string(),
        }
    }

    #[track_caller]
    fn assert_error_message(fragment: &Html, want_text: &str) {
        let p_selector = Selector::parse("p.text-red-500").unwrap();
        let paragraphs = fragment.select(&p_selector).collect::<Vec<_>>();
        assert_eq!(paragraphs.len(), 1, "want 1 p, got {}", paragraphs.len());
        let paragraph_text = paragraphs
            .first()
            .unwrap()
            .text()
            .collect::<String>()
            .to_lowercase();
        assert!(
            paragraph_text.contains(want_text),
            "'{paragraph_text}' does not contain the text '{want_text}'"
        );
    }

    #[tokio::test]
    async fn create_user_succeeds_and_logs_in() {
        let server = get_test_server(get_test_state());

        let response = server
            .post(endpoints::USERS)
            .form(&register_form("alice", "", TEST_PASSWORD))
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("hx-redirect"), endpoints::DASHBOARD_VIEW);
        assert!(response.maybe_cookie(COOKIE_USER_ID).is_some());
    }

    #[tokio::test]
    async fn create_user_stores_trimmed_email() {
        let state = get_test_state();
        let server = get_test_server(state.clone());

        server
            .post(endpoints::USERS)
            .form(&register_form("alice", " alice@example.com ", TEST_PASSWORD))
            .await
            .assert_status_see_other();

        let connection = state.db_connection.lock().unwrap();
        let user = get_user_by_name("alice", &connection).unwrap();
        assert_eq!(user.email.as_deref(), Some("alice@example.com"));
    }

    #[tokio::test]
    async fn blank_email_is_stored_as_no_email() {
        let state = get_test_state();
        let server = get_test_server(state.clone());

        server
            .post(endpoints::USERS)
            .form(&register_form("alice", "", TEST_PASSWORD))
            .await
            .assert_status_see_other();

        let connection = state.db_connection.lock().unwrap();
        let user = get_user_by_name("alice", &connection).unwrap();
        assert_eq!(user.email, None);
    }

    #[tokio::test]
    async fn create_user_fails_with_duplicate_username() {
        let server = get_test_server(get_test_state());

        server
            .post(endpoints::USERS)
            .form(&register_form("alice", "", TEST_PASSWORD))
            .await
            .assert_status_see_other();

        let response = server
            .post(endpoints::USERS)
            .form(&register_form("alice", "", "anotherperfectlygoodpassword"))
            .await;

        response.assert_status_ok();
        let fragment = Html::parse_fragment(&response.text());
        assert_error_message(&fragment, "already taken");
    }

    #[tokio::test]
    async fn create_user_fails_when_password_is_weak() {
        let server = get_test_server(get_test_state());

        let response = server
            .post(endpoints::USERS)
            .form(&register_form("alice", "", "foo"))
            .await;

        let fragment = Html::parse_fragment(&response.text());
        assert_error_message(&fragment, "password is too weak");
    }

    #[tokio::test]
    async fn create_user_fails_when_passwords_do_not_match() {
        let server = get_test_server(get_test_state());

        let response = server
            .post(endpoints::USERS)
            .form(&RegisterForm {
                username: "alice".to_string(),
                email: None,
                password: TEST_PASSWORD.to_string(),
                confirm_password: "thisisadifferentpassword".to_string(),
            })
            .await;

        let fragment = Html::parse_fragment(&response.text());
        assert_error_message(&fragment, "passwords do not match");
    }

    #[tokio::test]
    async fn create_user_fails_with_blank_username() {
        let server = get_test_server(get_test_state());

        let response = server
            .post(endpoints::USERS)
            .form(&register_form("   ", "", TEST_PASSWORD))
            .await;

        response.assert_status_ok();
        assert!(response.maybe_cookie(COOKIE_USER_ID).is_none());
        let fragment = Html::parse_fragment(&response.text());
        assert_error_message(&fragment, "choose a username");
    }
}
