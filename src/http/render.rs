use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// A page: the template that displays it and the context it is rendered with.
#[derive(Serialize)]
pub struct Rendered<C> {
    pub template: &'static str,
    pub context: C,
}

pub fn render<C: Serialize>(template: &'static str, context: C) -> Response {
    Json(Rendered { template, context }).into_response()
}

#[derive(Serialize)]
pub struct Empty {}
