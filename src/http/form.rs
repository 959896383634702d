use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;

use crate::app::forms::{FormData, UploadedFile};
use crate::http::AppError;

/// Decodes `application/x-www-form-urlencoded` and `multipart/form-data`
/// bodies into [`FormData`]. A request without a body yields an empty form.
pub struct Form(pub FormData);

#[axum::async_trait]
impl<S> FromRequest<S> for Form
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|err| body_error(err.status(), err.body_text()))?;
            return read_multipart(multipart).await.map(Form);
        }

        if !content_type.is_empty()
            && !content_type.starts_with("application/x-www-form-urlencoded")
        {
            return Err(AppError::unsupported_media_type(
                "expected a form-encoded or multipart body",
            ));
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|err| body_error(err.status(), err.body_text()))?;
        let fields = url::form_urlencoded::parse(&body)
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        Ok(Form(FormData {
            fields,
            files: Default::default(),
        }))
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<FormData, AppError> {
    let mut form = FormData::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| body_error(err.status(), err.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);

        match file_name {
            Some(file_name) => {
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| body_error(err.status(), err.body_text()))?;
                // Browsers submit an unnamed, empty part for an untouched file input.
                if file_name.is_empty() && data.is_empty() {
                    continue;
                }
                form.files.insert(name, UploadedFile { data });
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|err| body_error(err.status(), err.body_text()))?;
                form.fields.insert(name, value);
            }
        }
    }

    Ok(form)
}

/// Bodies over the configured limit are 413; any other unreadable body is 400.
fn body_error(status: StatusCode, message: String) -> AppError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::payload_too_large("request body too large")
    } else {
        AppError::bad_request(message)
    }
}
