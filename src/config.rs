use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/v1";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Versioned base path, without trailing slash.
    pub api_url: String,
    pub timeout_ms: u64,
    pub logout_delay_ms: u64,
    pub bulk_concurrency: usize,
    pub default_currency: String,
    pub export_dir: PathBuf,
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
}

pub fn default_config() -> Config {
    Config {
        api_url: DEFAULT_API_URL.to_string(),
        timeout_ms: 30_000,
        logout_delay_ms: 1_500,
        bulk_concurrency: 1,
        default_currency: "PEN".to_string(),
        export_dir: PathBuf::from("exports"),
        token: None,
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, String> {
    match env_nonempty(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("{key} has an invalid value: {raw}")),
    }
}

impl Config {
    /// Defaults overridden by `PEGASUS_*` variables; a `.env` file is honoured when present.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenv::dotenv();
        let mut cfg = default_config();

        if let Some(url) = env_nonempty("PEGASUS_API_URL") {
            cfg.api_url = url;
        }
        if let Some(ms) = parse_env::<u64>("PEGASUS_TIMEOUT_MS")? {
            cfg.timeout_ms = ms;
        }
        if let Some(ms) = parse_env::<u64>("PEGASUS_LOGOUT_DELAY_MS")? {
            cfg.logout_delay_ms = ms;
        }
        if let Some(n) = parse_env::<usize>("PEGASUS_BULK_CONCURRENCY")? {
            cfg.bulk_concurrency = n;
        }
        if let Some(code) = env_nonempty("PEGASUS_CURRENCY") {
            cfg.default_currency = code.to_ascii_uppercase();
        }
        if let Some(dir) = env_nonempty("PEGASUS_EXPORT_DIR") {
            cfg.export_dir = PathBuf::from(dir);
        }
        cfg.token = env_nonempty("PEGASUS_TOKEN");

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), String> {
        let url = self.api_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(format!("api url must be http(s): {url}"));
        }
        if self.timeout_ms == 0 {
            return Err("timeout must be greater than zero".to_string());
        }
        if self.bulk_concurrency == 0 {
            return Err("bulk concurrency must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.api_url.trim().trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn logout_delay(&self) -> Duration {
        Duration::from_millis(self.logout_delay_ms)
    }
}
