//! GitHub OAuth web flow: authorize redirect, code exchange, profile lookup.

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::GithubConfig;

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("aurahub/", env!("CARGO_PKG_VERSION"));
const SCOPE: &str = "user:email";

/// Lifetime of the signed `state` parameter.
pub const STATE_TTL_SECS: i64 = 600;

#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("GitHub request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("GitHub rejected the code exchange: {0}")]
    Exchange(String),
    #[error("invalid OAuth state")]
    InvalidState,
}

/// The parts of a GitHub identity the account layer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct GithubProfile {
    pub id: String,
    pub login: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl GithubProfile {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.login)
    }
}

#[derive(Serialize, Deserialize)]
struct StateClaims {
    nonce: String,
    exp: usize,
}

/// Signs a short-lived `state` value bound to `nonce`.
pub fn sign_state(nonce: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let exp = chrono::Utc::now().timestamp() + STATE_TTL_SECS;
    let claims = StateClaims {
        nonce: nonce.to_string(),
        exp: exp as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

/// Accepts `state` only if it is unexpired, correctly signed, and carries
/// `expected_nonce`.
pub fn verify_state(state: &str, expected_nonce: &str, secret: &str) -> Result<(), GithubError> {
    let data = decode::<StateClaims>(
        state,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| GithubError::InvalidState)?;

    if data.claims.nonce != expected_nonce {
        return Err(GithubError::InvalidState);
    }
    Ok(())
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct ApiUser {
    id: u64,
    login: String,
    name: Option<String>,
    email: Option<String>,
    avatar_url: Option<String>,
}

#[derive(Deserialize)]
struct ApiEmail {
    email: String,
    primary: bool,
    verified: bool,
}

#[derive(Clone)]
pub struct GithubClient {
    http: Client,
    config: GithubConfig,
    redirect_uri: String,
}

impl GithubClient {
    pub fn new(config: GithubConfig, redirect_uri: String) -> Self {
        Self {
            http: Client::new(),
            config,
            redirect_uri,
        }
    }

    pub fn authorize_url(&self, state: &str) -> Result<Url, url::ParseError> {
        Url::parse_with_params(
            AUTHORIZE_URL,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", SCOPE),
                ("state", state),
            ],
        )
    }

    pub async fn exchange_code(&self, code: &str) -> Result<String, GithubError> {
        let response: TokenResponse = self
            .http
            .post(TOKEN_URL)
            .header(header::ACCEPT, "application/json")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match response.access_token {
            Some(token) => Ok(token),
            None => Err(GithubError::Exchange(
                response
                    .error_description
                    .or(response.error)
                    .unwrap_or_else(|| "no access token returned".to_string()),
            )),
        }
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str, token: &str) -> Result<T, GithubError> {
        Ok(self
            .http
            .get(format!("{}{}", API_URL, path))
            .bearer_auth(token)
            .header(header::USER_AGENT, USER_AGENT)
            .header(header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    /// Profile plus the best email: primary and verified first, then the
    /// public profile email.
    pub async fn fetch_profile(&self, token: &str) -> Result<GithubProfile, GithubError> {
        let user: ApiUser = self.get("/user", token).await?;
        let emails: Vec<ApiEmail> = match self.get("/user/emails", token).await {
            Ok(emails) => emails,
            Err(err) => {
                debug!(error = %err, "could not list GitHub emails");
                Vec::new()
            }
        };

        let email = pick_email(&emails).or(user.email);
        Ok(GithubProfile {
            id: user.id.to_string(),
            login: user.login,
            name: user.name,
            email,
            avatar_url: user.avatar_url,
        })
    }
}

fn pick_email(emails: &[ApiEmail]) -> Option<String> {
    emails
        .iter()
        .find(|e| e.primary && e.verified)
        .or_else(|| emails.iter().find(|e| e.verified))
        .map(|e| e.email.clone())
}
