use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderName};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::app::users::UserService;
use crate::http::{redirect, AppError};
use crate::AppState;

pub const SESSION_COOKIE: &str = "sessionid";

const ADMIN_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-admin-token");

/// The signed-in user. Extracting it on a request without a valid session
/// redirects to the login page with the current path as `next`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct AdminToken;

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let next = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        let login = || redirect::found(redirect::login_url(&next));

        let token = match session_token(&parts.headers) {
            Some(token) => token,
            None => return Err(login()),
        };

        let service = AuthService::new(
            state.db.clone(),
            state.session_key,
            state.session_ttl_hours,
        );
        let user_id = service.authenticate_session(&token).map_err(|err| {
            tracing::error!(error = ?err, "failed to authenticate session");
            AppError::internal("failed to authenticate").into_response()
        })?;
        let user_id = match user_id {
            Some(user_id) => user_id,
            None => return Err(login()),
        };

        let user = UserService::new(state.db.clone())
            .get_user(user_id)
            .await
            .map_err(|err| {
                tracing::error!(error = ?err, user_id = %user_id, "failed to load session user");
                AppError::internal("failed to authenticate").into_response()
            })?;

        match user {
            Some(user) => Ok(AuthUser { user_id: user.id }),
            None => Err(login()),
        }
    }
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminToken {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let expected = state
            .admin_token
            .as_ref()
            .ok_or_else(|| AppError::forbidden("admin token not configured"))?;

        let provided = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::forbidden("missing admin token"))?;

        if !bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
            return Err(AppError::forbidden("invalid admin token"));
        }

        Ok(AdminToken)
    }
}

/// Session token from the `sessionid` cookie, or from a `Bearer` header.
fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = CookieJar::from_headers(headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value_trimmed().to_string())
        .filter(|value| !value.is_empty());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string)
    })
}

pub fn session_cookie(token: String, max_age_seconds: u64) -> Cookie<'static> {
    let max_age = i64::try_from(max_age_seconds).unwrap_or(i64::MAX);
    Cookie::build((SESSION_COOKIE, token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age))
        .build()
}

/// Matches the path of [`session_cookie`] so the browser drops it.
pub fn session_removal() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
