use std::path::PathBuf;
use std::sync::Arc;

use handlebars::Handlebars;
use sqlx::PgPool;

use crate::config::Config;
use crate::dispatch::{self, Mailer};
use crate::utils::error::AppError;

/// Shared handles cloned into every handler. The pool is the only mutable
/// shared resource in the process; everything else is read-only after
/// startup.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub mailer: Mailer,
    pub templates: Arc<Handlebars<'static>>,
    pub artifact_dir: PathBuf,
    pub staff_api_token: Option<String>,
}

impl AppState {
    pub fn new(pool: PgPool, config: &Config) -> Result<Self, AppError> {
        let mut templates = Handlebars::new();
        dispatch::register_templates(&mut templates)?;

        let mailer = Mailer::new(
            config.smtp_server.clone(),
            config.smtp_port,
            config.smtp_username.clone(),
            config.smtp_password.clone(),
            config.from_email.clone(),
            config.from_name.clone(),
        );

        Ok(Self {
            pool,
            mailer,
            templates: Arc::new(templates),
            artifact_dir: config.artifact_dir.clone(),
            staff_api_token: config.staff_api_token.clone(),
        })
    }
}
