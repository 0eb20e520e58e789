use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub output_dir: PathBuf,
    pub data_dir: PathBuf,
    pub max_workers: usize,
    pub timeout_seconds: u64,
    pub auto_cleanup_enabled: bool,
    pub auto_cleanup_days: u64,
}

impl ServerConfig {
    /// Read configuration from the environment, honoring a `.env` file
    /// when one is present. Every variable has a default.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            port: parsed_var("PORT", 5000)?,
            output_dir: env::var("OUTPUT_DIR")
                .unwrap_or_else(|_| "static/generated".to_string())
                .into(),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()).into(),
            max_workers: parsed_var("MAX_WORKERS", 3)?,
            timeout_seconds: parsed_var("TIMEOUT_SECONDS", 120)?,
            auto_cleanup_enabled: env::var("AUTO_CLEANUP_ENABLED")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            auto_cleanup_days: parsed_var("AUTO_CLEANUP_DAYS", 7)?,
        })
    }
}

fn parsed_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{name} must be a number, got {raw:?}")),
        Err(_) => Ok(default),
    }
}
