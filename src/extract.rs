use axum::{
    body::{self, Body},
    extract::{rejection::JsonRejection, FromRequest, OptionalFromRequest, Request},
    http::header,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Same ceiling axum applies to `Json` bodies by default.
const OPTIONAL_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// `Json<T>` whose rejections become `400 {"msg": ...}` instead of axum's
/// plain-text responses.
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = <Json<T> as FromRequest<S>>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        Ok(AppJson(value))
    }
}

/// Lets handlers take `Option<AppJson<T>>` for bodies that may be omitted,
/// such as on DELETE requests. A request without a content type or with an
/// empty body yields `None`.
impl<S, T> OptionalFromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Option<Self>, Self::Rejection> {
        if !req.headers().contains_key(header::CONTENT_TYPE) {
            return Ok(None);
        }

        let (parts, body) = req.into_parts();
        let bytes = body::to_bytes(body, OPTIONAL_BODY_LIMIT)
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let req = Request::from_parts(parts, Body::from(bytes));
        <AppJson<T> as FromRequest<S>>::from_request(req, state)
            .await
            .map(Some)
    }
}
