use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

/// Everything the service reads from the environment, materialized once at
/// startup. Loading mechanics live here; the rest of the code sees values.
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
    /// Unset means the staff gate is open (development mode).
    pub staff_api_token: Option<String>,
    /// Where transient credential PNGs live between render and delivery.
    pub artifact_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/turnstile".to_string()),
            port: parse_or("PORT", 3001),
            smtp_server: env::var("SMTP_SERVER")
                .unwrap_or_else(|_| "smtp.office365.com".to_string()),
            smtp_port: parse_or("SMTP_PORT", 587),
            smtp_username: env::var("SMTP_USERNAME").unwrap_or_default(),
            smtp_password: env::var("SMTP_PASSWORD").unwrap_or_default(),
            from_email: env::var("FROM_EMAIL").unwrap_or_default(),
            from_name: env::var("FROM_NAME").unwrap_or_else(|_| "Event Registration".to_string()),
            staff_api_token: env::var("STAFF_API_TOKEN").ok().filter(|t| !t.is_empty()),
            artifact_dir: env::var("ARTIFACT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("passes")),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Err(_) => default,
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value '{raw}': {e}, using default");
            default
        }),
    }
}
