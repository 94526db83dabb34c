use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub api_base_url: Url,
    pub grading_timeout_secs: u64,
    pub fetch_timeout_secs: u64,
    pub public_rps: u32,
    pub session_idle_ttl_secs: u64,
    pub completion_webhook_url: Option<String>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            api_base_url: parse_base_url(&get_env("API_BASE_URL")?)?,
            grading_timeout_secs: get_env_parse_or("GRADING_TIMEOUT_SECS", 15)?,
            fetch_timeout_secs: get_env_parse_or("FETCH_TIMEOUT_SECS", 30)?,
            public_rps: get_env_parse_or("PUBLIC_RPS", 50)?,
            session_idle_ttl_secs: get_env_parse_or("SESSION_IDLE_TTL_SECS", 3600)?,
            completion_webhook_url: env::var("COMPLETION_WEBHOOK_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
        })
    }

    pub fn for_base_url(api_base_url: &str) -> Result<Self> {
        Ok(Self {
            server_address: "127.0.0.1:0".to_string(),
            api_base_url: parse_base_url(api_base_url)?,
            grading_timeout_secs: 15,
            fetch_timeout_secs: 30,
            public_rps: 50,
            session_idle_ttl_secs: 3600,
            completion_webhook_url: None,
        })
    }

    pub fn grading_timeout(&self) -> Duration {
        Duration::from_secs(self.grading_timeout_secs.max(1))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn session_idle_ttl(&self) -> Duration {
        Duration::from_secs(self.session_idle_ttl_secs)
    }
}

// Joining relative paths onto a base without a trailing slash drops its last segment.
fn parse_base_url(raw: &str) -> Result<Url> {
    let mut normalized = raw.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    let url = Url::parse(&normalized)
        .map_err(|e| Error::Config(format!("Invalid value for API_BASE_URL: {}", e)))?;
    if url.cannot_be_a_base() {
        return Err(Error::Config(format!(
            "API_BASE_URL cannot be used as a base: {}",
            raw
        )));
    }
    Ok(url)
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}
