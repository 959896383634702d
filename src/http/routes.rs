use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn accounts() -> Router<AppState> {
    Router::new()
        .route(
            "/auth/signup/",
            get(handlers::signup_form).post(handlers::signup),
        )
        .route("/auth/login/", get(handlers::login_form).post(handlers::login))
        .route("/auth/logout/", post(handlers::logout))
}

pub fn about() -> Router<AppState> {
    Router::new()
        .route("/about/author/", get(handlers::about_author))
        .route("/about/tech/", get(handlers::about_tech))
}

pub fn admin() -> Router<AppState> {
    Router::new()
        .route("/admin/groups/", post(handlers::create_group))
        .route("/admin/cache/clear/", post(handlers::clear_cache))
}

pub fn follow() -> Router<AppState> {
    Router::new()
        .route("/follow/", get(handlers::follow_index))
        .route("/:username/follow/", post(handlers::profile_follow))
        .route("/:username/unfollow/", post(handlers::profile_unfollow))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::index))
        .route("/new/", get(handlers::new_post_form).post(handlers::new_post))
        .route("/group/:slug/", get(handlers::group_posts))
        .route("/:username/", get(handlers::profile))
        .route("/:username/:post_id/", get(handlers::post_view))
        .route(
            "/:username/:post_id/edit/",
            get(handlers::post_edit_form).post(handlers::post_edit),
        )
        .route("/:username/:post_id/comment", post(handlers::add_comment))
}
