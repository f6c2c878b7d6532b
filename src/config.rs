use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum_extra::extract::cookie::SameSite;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_FILE_SERVICE_URL: &str = "https://api.aurahub.fun";
const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

pub const SESSION_COOKIE: &str = "aurahub.sid";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl_days: i64,
    pub secure: bool,
    pub same_site: SameSite,
    pub domain: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub session_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub environment: Environment,
    pub frontend_url: String,
    pub public_url: String,
    pub allowed_origins: Vec<String>,
    pub file_service_url: String,
    pub github: Option<GithubConfig>,
    pub session: SessionConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let session_secret = get("SESSION_SECRET").ok_or(ConfigError::Missing("SESSION_SECRET"))?;

        let host = match get("HOST") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "HOST", value })?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };

        let port = match get("PORT") {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::Invalid { key: "PORT", value })?,
            None => DEFAULT_PORT,
        };

        let environment = match get("APP_ENV").as_deref() {
            None | Some("development") | Some("dev") | Some("test") => Environment::Development,
            Some("production") | Some("prod") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "APP_ENV",
                    value: other.to_string(),
                })
            }
        };

        let ttl_days = match get("SESSION_TTL_DAYS") {
            Some(value) => match value.parse::<i64>() {
                Ok(days) if (1..=7).contains(&days) => days,
                _ => return Err(ConfigError::Invalid { key: "SESSION_TTL_DAYS", value }),
            },
            None => DEFAULT_SESSION_TTL_DAYS,
        };

        let frontend_url = get("FRONTEND_URL")
            .unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let public_url = get("PUBLIC_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", port))
            .trim_end_matches('/')
            .to_string();
        let file_service_url = get("FILE_SERVICE_URL")
            .unwrap_or_else(|| DEFAULT_FILE_SERVICE_URL.to_string());
        url::Url::parse(&file_service_url).map_err(|_| ConfigError::Invalid {
            key: "FILE_SERVICE_URL",
            value: file_service_url.clone(),
        })?;

        let allowed_origins = get("ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|origin| origin.trim().trim_end_matches('/').to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let github = match (get("GITHUB_CLIENT_ID"), get("GITHUB_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(GithubConfig {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        let production = environment == Environment::Production;
        let session = SessionConfig {
            cookie_name: SESSION_COOKIE.to_string(),
            ttl_days,
            secure: production,
            same_site: if production { SameSite::None } else { SameSite::Lax },
            domain: if production {
                get("DOMAIN").map(|domain| format!(".{}", domain.trim_start_matches('.')))
            } else {
                None
            },
        };

        Ok(Self {
            database_url,
            session_secret,
            host,
            port,
            environment,
            frontend_url,
            public_url,
            allowed_origins,
            file_service_url,
            github,
            session,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn github_callback_url(&self) -> String {
        format!("{}/api/auth/github/callback", self.public_url)
    }
}
