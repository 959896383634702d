use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

pub const LOGIN_URL: &str = "/auth/login/";

/// 302 to `location`.
pub fn found(location: impl Into<String>) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.into())]).into_response()
}

/// Login page URL that returns to `next` after signing in. The path is
/// percent-encoded except for `/`.
pub fn login_url(next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{}?next={}", LOGIN_URL, encoded.replace("%2F", "/"))
}

/// Only same-site paths are followed after login. Browsers drop tab, CR and
/// LF while parsing a URL, so any control character is refused outright.
pub fn is_safe_next(next: &str) -> bool {
    next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(char::is_control)
}

pub fn profile_url(username: &str) -> String {
    format!("/{}/", username)
}

pub fn post_url(username: &str, post_id: i64) -> String {
    format!("/{}/{}/", username, post_id)
}
