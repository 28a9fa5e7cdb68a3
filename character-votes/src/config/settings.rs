//! Environment-driven settings.
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use tracing::warn;

use crate::errors::AppError;

/// Catalog shipped with the crate.
const DEFAULT_CATALOG_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/characters.json");

const DEFAULT_SERVER_HOST: &str = "127.0.0.1";
const DEFAULT_SERVER_PORT: u16 = 8080;
const DEFAULT_SIGN_IN_URL: &str = "/sign-in";
const DEFAULT_SIGN_UP_URL: &str = "/sign-up";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn from_env() -> Self {
        match env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "pretty".to_string())
            .to_lowercase()
            .as_str()
        {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            other => {
                warn!(log_format = other, "Invalid LOG_FORMAT, defaulting to 'pretty'");
                Self::Pretty
            }
        }
    }
}

/// Identity provider settings.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// HS256 secret shared with the identity provider.
    pub jwt_secret: String,
    /// Expected `iss` claim, if any.
    pub issuer: Option<String>,
    pub sign_in_url: String,
    pub sign_up_url: String,
}

/// Service settings.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: Postgres URL. When unset, votes are kept in memory.
/// - `RUN_MIGRATIONS`: apply the embedded migrations on start-up (default: true)
/// - `CATALOG_PATH`: character catalog JSON file (default: the bundled catalog)
/// - `SERVER_HOST` / `SERVER_PORT`: listen address (default: 127.0.0.1:8080)
/// - `AUTH_JWT_SECRET`: **required**, secret used to verify identity tokens
/// - `AUTH_ISSUER`: expected token issuer (default: not checked)
/// - `AUTH_SIGN_IN_URL` / `AUTH_SIGN_UP_URL`: affordances shown to signed-out users
/// - `CORS_ORIGINS`: comma-separated allowed origins
/// - `LOG_FORMAT`: "pretty" or "json" (default: pretty)
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: Option<String>,
    pub run_migrations: bool,
    pub catalog_path: PathBuf,
    pub server_addr: SocketAddr,
    pub auth: AuthSettings,
    pub cors_origins: Vec<String>,
    pub log_format: LogFormat,
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        let run_migrations = env::var("RUN_MIGRATIONS")
            .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "no"))
            .unwrap_or(true);
        let catalog_path = env::var("CATALOG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CATALOG_PATH));

        let host: IpAddr = env::var("SERVER_HOST")
            .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string())
            .parse()
            .map_err(|e| AppError::config(format!("SERVER_HOST is not a valid IP address: {e}")))?;
        let port: u16 = match env::var("SERVER_PORT") {
            Ok(port) => port
                .parse()
                .map_err(|e| AppError::config(format!("SERVER_PORT is not a valid port: {e}")))?,
            Err(_) => DEFAULT_SERVER_PORT,
        };

        let jwt_secret = env::var("AUTH_JWT_SECRET")
            .ok()
            .filter(|secret| !secret.is_empty())
            .ok_or_else(|| AppError::config("AUTH_JWT_SECRET must be set"))?;

        let auth = AuthSettings {
            jwt_secret,
            issuer: env::var("AUTH_ISSUER").ok().filter(|iss| !iss.is_empty()),
            sign_in_url: env::var("AUTH_SIGN_IN_URL")
                .unwrap_or_else(|_| DEFAULT_SIGN_IN_URL.to_string()),
            sign_up_url: env::var("AUTH_SIGN_UP_URL")
                .unwrap_or_else(|_| DEFAULT_SIGN_UP_URL.to_string()),
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            database_url,
            run_migrations,
            catalog_path,
            server_addr: SocketAddr::new(host, port),
            auth,
            cors_origins,
            log_format: LogFormat::from_env(),
        })
    }
}
