use axum::http::{header, HeaderValue, Method};
use std::env;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Dev origins for the staff scanning front-end.
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

const PREFLIGHT_MAX_AGE_SECS: u64 = 86400;

/// The API is browser-driven (the scanner page runs in the staff browser),
/// so CORS is part of the surface. Only the verbs the routes actually use
/// are allowed.
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(get_allowed_origins())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
        ])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(PREFLIGHT_MAX_AGE_SECS))
}

fn get_allowed_origins() -> AllowOrigin {
    let origins_str =
        env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGINS.to_string());

    let origins: Vec<HeaderValue> = origins_str
        .split(',')
        .filter_map(|origin| {
            let trimmed = origin.trim();
            if trimmed.is_empty() {
                None
            } else {
                match trimmed.parse::<HeaderValue>() {
                    Ok(value) => {
                        tracing::debug!("CORS: Allowing origin: {}", trimmed);
                        Some(value)
                    }
                    Err(e) => {
                        tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                        None
                    }
                }
            }
        })
        .collect();

    if origins.is_empty() {
        tracing::warn!(
            "CORS: No valid origins configured, using permissive settings for development"
        );
        AllowOrigin::any()
    } else {
        tracing::info!("CORS: Configured with {} allowed origin(s)", origins.len());
        AllowOrigin::list(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_layer_builds() {
        let _layer = create_cors_layer();
    }

    #[test]
    fn default_origins_parse_as_header_values() {
        for origin in DEFAULT_ALLOWED_ORIGINS.split(',') {
            let trimmed = origin.trim();
            assert!(
                trimmed.parse::<HeaderValue>().is_ok(),
                "Default origin '{}' should be a valid HeaderValue",
                trimmed
            );
        }
    }
}
