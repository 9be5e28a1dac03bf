use std::env;
use std::path::PathBuf;

use anyhow::Context;

/// Runtime configuration, read from the environment once at startup and
/// passed to the router through application state.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// Port the HTTP listener binds on.
    pub port: u16,
    /// Content root that every uploaded file lands under.
    pub upload_dir: PathBuf,
    /// URL prefix that uploaded files are served from.
    pub uploads_mount: String,
    /// Cap on a single uploaded file, in bytes.
    pub max_upload_size: usize,
    /// Cap on a public-API JSON body, in bytes.
    pub max_payload_size: usize,
    pub session_ttl_hours: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            database_url: String::new(),
            port: 3000,
            upload_dir: PathBuf::from("uploads"),
            uploads_mount: "/uploads".to_owned(),
            max_upload_size: 5 * 1024 * 1024,
            max_payload_size: 1024 * 1024,
            session_ttl_hours: 24,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = AppConfig::default();

        Ok(AppConfig {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL is not set")?,
            port: optional_var("API_PORT")?.unwrap_or(defaults.port),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            uploads_mount: env::var("UPLOADS_MOUNT").unwrap_or(defaults.uploads_mount),
            max_upload_size: optional_var("MAX_UPLOAD_SIZE")?.unwrap_or(defaults.max_upload_size),
            max_payload_size: optional_var("MAX_PAYLOAD_SIZE")?
                .unwrap_or(defaults.max_payload_size),
            session_ttl_hours: optional_var("SESSION_TTL_HOURS")?
                .unwrap_or(defaults.session_ttl_hours),
        })
    }
}

fn optional_var<T: std::str::FromStr>(name: &str) -> anyhow::Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => {
            let parsed = value
                .parse()
                .with_context(|| format!("invalid value for {name}: {value}"))?;
            Ok(Some(parsed))
        }
        Err(_) => Ok(None),
    }
}
