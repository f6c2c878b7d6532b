use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::entities::user;
use crate::error::{AppError, ErrorResponse};
use crate::extract::AppJson;
use crate::services::{accounts, github, sessions};
use crate::state::AppState;

use super::MessageResponse;

pub const OAUTH_COOKIE: &str = "aurahub.oauth";

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password2: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Public view of an account. The password hash never leaves the server.
#[derive(Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub github_id: Option<String>,
    #[serde(rename = "streamtapeFolderId")]
    pub root_folder_id: String,
    pub created_at: chrono::NaiveDateTime,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            avatar: model.avatar,
            github_id: model.github_id,
            root_folder_id: model.root_folder_id,
            created_at: model.created_at,
        }
    }
}

#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

pub fn validate_register_request(req: &RegisterRequest) -> Result<(), AppError> {
    let fields = [&req.name, &req.email, &req.password, &req.password2];
    if fields.iter().any(|field| field.trim().is_empty()) {
        return Err(AppError::BadRequest("Please enter all fields".into()));
    }
    if req.password != req.password2 {
        return Err(AppError::BadRequest("Passwords do not match".into()));
    }
    if req.password.chars().count() < 6 {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".into(),
        ));
    }
    Ok(())
}

fn base_cookie(config: &SessionConfig, name: &str, value: String) -> Cookie<'static> {
    let mut builder = Cookie::build((name.to_string(), value))
        .path("/")
        .http_only(true)
        .secure(config.secure)
        .same_site(config.same_site);
    if let Some(domain) = &config.domain {
        builder = builder.domain(domain.clone());
    }
    builder.build()
}

pub fn session_cookie(config: &SessionConfig, token: String) -> Cookie<'static> {
    let mut cookie = base_cookie(config, &config.cookie_name, token);
    cookie.set_max_age(time::Duration::days(config.ttl_days));
    cookie
}

/// The OAuth nonce cookie has to survive the top-level redirect back from
/// GitHub, so it is never `SameSite=Strict`.
fn oauth_cookie(config: &SessionConfig, nonce: String) -> Cookie<'static> {
    let mut cookie = base_cookie(config, OAUTH_COOKIE, nonce);
    if config.same_site == SameSite::Strict {
        cookie.set_same_site(SameSite::Lax);
    }
    cookie.set_max_age(time::Duration::seconds(github::STATE_TTL_SECS));
    cookie
}

fn start_session_jar(jar: CookieJar, config: &SessionConfig, token: String) -> CookieJar {
    jar.add(session_cookie(config, token))
}

/// Register a local account.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = MessageResponse),
        (status = 400, description = "Validation failed or email taken", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_register_request(&payload)?;

    accounts::register(
        &state.db,
        state.files.as_ref(),
        accounts::Registration {
            name: &payload.name,
            email: &payload.email,
            password: &payload.password,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        MessageResponse::new("You are now registered and can log in!"),
    ))
}

/// Log in with email and password. Sets the session cookie.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = UserResponse),
        (status = 400, description = "Unknown email or wrong password", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip(state, jar, payload), fields(email = %payload.email))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<(CookieJar, Json<UserResponse>), AppError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest("Please enter all fields".into()));
    }

    let user = accounts::authenticate(&state.db, &payload.email, &payload.password).await?;
    let token = sessions::create(&state.db, user.id, state.config.session.ttl_days).await?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok((
        start_session_jar(jar, &state.config.session, token),
        Json(UserResponse::from(user)),
    ))
}

/// End the current session. Succeeds with or without one.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session destroyed and cookie cleared", body = MessageResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>), AppError> {
    let config = &state.config.session;
    if let Some(cookie) = jar.get(&config.cookie_name) {
        sessions::destroy(&state.db, cookie.value()).await?;
    }

    let jar = jar.remove(base_cookie(config, &config.cookie_name, String::new()));
    Ok((jar, MessageResponse::new("Logout successful.")))
}

/// The signed-in user.
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "No live session", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn me(State(state): State<AppState>, jar: CookieJar) -> Result<Json<UserResponse>, AppError> {
    let not_authenticated = || AppError::Unauthorized("Not authenticated".into());

    let token = jar
        .get(&state.config.session.cookie_name)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(not_authenticated)?;

    let user = sessions::resolve(&state.db, &token)
        .await?
        .ok_or_else(not_authenticated)?;

    Ok(Json(UserResponse::from(user)))
}

/// Start the GitHub OAuth flow.
#[utoipa::path(
    get,
    path = "/api/auth/github",
    responses(
        (status = 303, description = "Redirect to GitHub"),
        (status = 404, description = "GitHub login is not configured", body = ErrorResponse)
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn github(State(state): State<AppState>, jar: CookieJar) -> Result<(CookieJar, Redirect), AppError> {
    let client = state
        .github
        .as_ref()
        .ok_or_else(|| AppError::NotFound("GitHub login is not configured.".into()))?;

    let nonce = Uuid::new_v4().to_string();
    let oauth_state = github::sign_state(&nonce, &state.config.session_secret)
        .map_err(|e| AppError::Internal(format!("State sign error: {}", e)))?;
    let url = client
        .authorize_url(&oauth_state)
        .map_err(|e| AppError::Internal(format!("Authorize URL error: {}", e)))?;

    let jar = jar.add(oauth_cookie(&state.config.session, nonce));
    Ok((jar, Redirect::to(url.as_str())))
}

async fn complete_github_login(
    state: &AppState,
    jar: &CookieJar,
    query: CallbackQuery,
) -> Result<user::Model, AppError> {
    let client = state
        .github
        .as_ref()
        .ok_or_else(|| AppError::NotFound("GitHub login is not configured.".into()))?;

    if let Some(error) = query.error {
        return Err(AppError::BadRequest(format!("GitHub denied access: {}", error)));
    }
    let (Some(code), Some(oauth_state)) = (query.code, query.state) else {
        return Err(AppError::BadRequest("Missing code or state.".into()));
    };
    let nonce = jar
        .get(OAUTH_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .ok_or_else(|| AppError::BadRequest("Missing OAuth nonce.".into()))?;

    github::verify_state(&oauth_state, &nonce, &state.config.session_secret)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let token = client
        .exchange_code(&code)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let profile = client
        .fetch_profile(&token)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    accounts::resolve_github_user(&state.db, state.files.as_ref(), &profile).await
}

/// GitHub redirects here after the user approves access.
#[utoipa::path(
    get,
    path = "/api/auth/github/callback",
    params(CallbackQuery),
    responses(
        (status = 303, description = "Redirect to the dashboard, or to the login page on failure")
    ),
    tag = "Authentication"
)]
#[instrument(skip_all)]
pub async fn github_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> (CookieJar, Redirect) {
    let frontend = &state.config.frontend_url;
    let outcome = complete_github_login(&state, &jar, query).await;
    let jar = jar.remove(base_cookie(&state.config.session, OAUTH_COOKIE, String::new()));

    let user = match outcome {
        Ok(user) => user,
        Err(err) => {
            warn!(error = %err, "GitHub login failed");
            return (jar, Redirect::to(&format!("{}/login", frontend)));
        }
    };

    match sessions::create(&state.db, user.id, state.config.session.ttl_days).await {
        Ok(token) => {
            tracing::info!(user_id = %user.id, "user logged in with GitHub");
            (
                start_session_jar(jar, &state.config.session, token),
                Redirect::to(&format!("{}/dashboard", frontend)),
            )
        }
        Err(err) => {
            tracing::error!(error = %err, "could not open session after GitHub login");
            (jar, Redirect::to(&format!("{}/login", frontend)))
        }
    }
}
