use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

/// Values shipped in the sample `.env`; treated the same as an unset key.
const GEMINI_KEY_PLACEHOLDER: &str = "YOUR_GEMINI_KEY";
const OWM_KEY_PLACEHOLDER: &str = "YOUR_OWM_KEY";

/// Which implementation answers `/chat` queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdviceBackend {
    Gemini,
    Keyword,
}

impl FromStr for AdviceBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(AdviceBackend::Gemini),
            "keyword" => Ok(AdviceBackend::Keyword),
            other => Err(AppError::ConfigError(format!("Unknown advice backend: {}", other))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub redis_host: String,
    pub redis_port: u16,
    pub google_api_key: Option<String>,
    pub gemini_model: String,
    pub openweather_api_key: Option<String>,
    pub advice_backend: AdviceBackend,
    pub http_timeout: Duration,
    pub chat_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let host = var("HOST", "0.0.0.0");
        let port = parse_port("PORT", &var("PORT", "8000"))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;

        let redis_host = var("REDIS_HOST", "localhost");
        let redis_port = parse_port("REDIS_PORT", &var("REDIS_PORT", "6379"))?;

        let google_api_key = credential(lookup("GOOGLE_API_KEY"), GEMINI_KEY_PLACEHOLDER);
        let openweather_api_key = credential(lookup("OPENWEATHER_API_KEY"), OWM_KEY_PLACEHOLDER);
        let gemini_model = var("GEMINI_MODEL", "gemini-1.5-flash");
        let advice_backend = var("ADVICE_BACKEND", "gemini").parse()?;

        let http_timeout = parse_secs("HTTP_TIMEOUT_SECS", &var("HTTP_TIMEOUT_SECS", "30"))?;
        let chat_timeout = parse_secs("CHAT_TIMEOUT_SECS", &var("CHAT_TIMEOUT_SECS", "60"))?;

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            redis_host,
            redis_port,
            google_api_key,
            gemini_model,
            openweather_api_key,
            advice_backend,
            http_timeout,
            chat_timeout,
        })
    }
}

fn parse_port(name: &str, value: &str) -> Result<u16> {
    value
        .trim()
        .parse::<u16>()
        .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", name, e)))
}

fn parse_secs(name: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", name, e)))
}

fn credential(value: Option<String>, placeholder: &str) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && v != placeholder)
}
