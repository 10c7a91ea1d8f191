use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
pub const DEFAULT_CALLBACK_URI: &str = "http://127.0.0.1:3000/callback";
pub const BACKEND_URL_ENV: &str = "INBOX_DIGEST_BACKEND_URL";

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    pub callback_uri: Option<String>,
    pub login_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub db_path: Option<String>,
    pub record_history: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            callback_uri: Some(DEFAULT_CALLBACK_URI.to_string()),
            login_timeout_secs: Some(120),
            request_timeout_secs: Some(60),
            db_path: None,
            record_history: Some(true),
        }
    }
}

impl Config {
    pub fn callback_uri(&self) -> String {
        self.callback_uri
            .clone()
            .unwrap_or_else(|| DEFAULT_CALLBACK_URI.to_string())
    }

    pub fn login_timeout_secs(&self) -> u64 {
        self.login_timeout_secs.unwrap_or(120)
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs.unwrap_or(60)
    }

    pub fn record_history(&self) -> bool {
        self.record_history.unwrap_or(true)
    }

    fn apply_env(self) -> Self {
        self.with_backend_override(std::env::var(BACKEND_URL_ENV).ok())
    }

    /// A non-blank override replaces `backend_url`.
    fn with_backend_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url
            && !url.trim().is_empty()
        {
            self.backend_url = url.trim().to_string();
        }
        self
    }
}

const TEMPLATE_HEADER: &str = "\
# inbox_digest configuration
#
# backend_url          digest backend (INBOX_DIGEST_BACKEND_URL overrides it)
# callback_uri         where the backend redirects after login; must be loopback
# login_timeout_secs   how long `login` waits for that redirect
# request_timeout_secs HTTP timeout; summarizing a full inbox is slow
# record_history       keep received digests in a local database
# db_path              history database, defaults to history.db next to this file

";

fn template() -> Result<String> {
    Ok(format!(
        "{TEMPLATE_HEADER}{}",
        toml::to_string_pretty(&Config::default())?
    ))
}

pub fn config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("no config dir available"))?
        .join("inbox_digest"))
}

pub fn config_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("config.toml");
    Ok(p)
}

pub fn default_db_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("history.db");
    Ok(p)
}

pub fn log_path() -> Result<PathBuf> {
    let mut p = config_dir()?;
    fs::create_dir_all(&p)?;
    p.push("inbox_digest.log");
    Ok(p)
}

/// Load the default config, writing a template on first run.
pub fn load_config() -> Result<Config> {
    let path = config_path()?;
    if !path.exists() {
        fs::write(&path, template()?)?;
        log::info!("created default config at {}", path.display());
    }
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<Config> {
    let s = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&s).with_context(|| format!("failed to parse config {}", path.display()))?;
    Ok(cfg.apply_env())
}

pub fn resolve_db_path(cfg: &Config) -> Result<PathBuf> {
    if let Some(p) = &cfg.db_path {
        Ok(PathBuf::from(p))
    } else {
        default_db_path()
    }
}
