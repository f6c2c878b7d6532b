use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::CookieJar;

use crate::entities::user;
use crate::error::AppError;
use crate::services::sessions;
use crate::state::AppState;

pub const NOT_AUTHORIZED: &str = "You are not authorized";

/// The signed-in user, resolved from the session cookie on every request.
///
/// Taking this as a handler argument gates the route: requests without a
/// live session get a 401 before the handler body runs.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: user::Model,
    pub session_token: String,
}

impl AuthUser {
    /// The user's root folder, or 404 when the account has none.
    pub fn root_folder_id(&self) -> Result<&str, AppError> {
        let root = self.user.root_folder_id.trim();
        if root.is_empty() {
            return Err(AppError::NotFound("User root folder not found.".to_string()));
        }
        Ok(root)
    }

    /// `requested` when given and non-blank, otherwise the root folder.
    pub fn folder_or_root<'a>(&'a self, requested: Option<&'a str>) -> Result<&'a str, AppError> {
        match requested.map(str::trim) {
            Some(folder) if !folder.is_empty() => Ok(folder),
            _ => self.root_folder_id(),
        }
    }
}

pub fn session_token(parts: &Parts, state: &AppState) -> Option<String> {
    CookieJar::from_headers(&parts.headers)
        .get(&state.config.session.cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(parts, state)
            .ok_or_else(|| AppError::Unauthorized(NOT_AUTHORIZED.to_string()))?;

        let user = sessions::resolve(&state.db, &token)
            .await?
            .ok_or_else(|| AppError::Unauthorized(NOT_AUTHORIZED.to_string()))?;

        Ok(AuthUser {
            user,
            session_token: token,
        })
    }
}
