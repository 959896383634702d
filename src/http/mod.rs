use axum::extract::DefaultBodyLimit;
use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod form;
mod handlers;
mod redirect;
mod render;
mod routes;

pub use auth::{AdminToken, AuthUser, SESSION_COOKIE};
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.upload_max_bytes);

    Router::new()
        .merge(routes::health())
        .merge(routes::accounts())
        .merge(routes::about())
        .merge(routes::admin())
        .merge(routes::follow())
        .merge(routes::posts())
        .fallback(handlers::not_found)
        .layer(body_limit)
        .with_state(state)
}
