//! Authentication for the application.
//!
//! Sessions are carried by a private (encrypted) cookie holding the user ID
//! and an expiry. This module contains the cookie helpers, the login and
//! logout handlers, the forgot password page, and the middleware guards:
//! `auth_guard` redirects unauthenticated page requests to the login page,
//! while `auth_guard_hx` answers htmx requests with an `HX-Redirect` header
//! instead.

mod cookie;
mod forgot_password;
mod log_in;
mod log_out;
mod middleware;

pub use cookie::{DEFAULT_COOKIE_DURATION, invalidate_auth_cookie, set_auth_cookie};
pub use forgot_password::get_forgot_password_page;
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::{AuthState, auth_guard, auth_guard_hx};

#[cfg(test)]
pub use cookie::{COOKIE_EXPIRY, COOKIE_USER_ID};
#[cfg(test)]
pub use log_in::LoginState;
