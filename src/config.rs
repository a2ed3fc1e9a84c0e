use dotenvy::dotenv;
use eyre::{eyre, Result};
use std::{env, time::Duration};
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const UPLOAD_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_PAGE_SIZE: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub session_db_path: String,
    pub timeouts: Timeouts,
    pub history_page_size: u32,
}

/// Request deadlines for the two request classes the backend distinguishes.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub default: Duration,
    pub upload: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            upload: Duration::from_millis(UPLOAD_TIMEOUT_MS),
        }
    }
}

impl Config {
    /// Defaults for everything except the backend location.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            session_db_path: "wallet-session.db".to_string(),
            timeouts: Timeouts::default(),
            history_page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// How the configured backend address will be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInfo {
    pub base_url: String,
    pub is_localhost: bool,
    pub is_http: bool,
    pub is_https: bool,
}

impl Config {
    pub fn network_info(&self) -> NetworkInfo {
        let info = NetworkInfo {
            base_url: self.base_url.clone(),
            is_localhost: self.base_url.contains("localhost"),
            is_http: self.base_url.starts_with("http://"),
            is_https: self.base_url.starts_with("https://"),
        };
        debug!(?info, "network configuration");
        info
    }
}

pub fn load() -> Result<Config> {
    dotenv().ok();

    // Base URL (EXPO_PUBLIC_BASE_URL kept as an alias for existing .env files)
    let base_url = env::var("WALLET_API_BASE_URL")
        .or_else(|_| env::var("EXPO_PUBLIC_BASE_URL"))
        .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(eyre!("base URL must be http(s): {}", base_url));
    }

    let session_db_path =
        env::var("WALLET_SESSION_DB").unwrap_or_else(|_| "wallet-session.db".to_string());

    let default_ms = env::var("WALLET_TIMEOUT_MS")
        .unwrap_or_else(|_| DEFAULT_TIMEOUT_MS.to_string())
        .parse()
        .unwrap_or(DEFAULT_TIMEOUT_MS);

    let upload_ms = env::var("WALLET_UPLOAD_TIMEOUT_MS")
        .unwrap_or_else(|_| UPLOAD_TIMEOUT_MS.to_string())
        .parse()
        .unwrap_or(UPLOAD_TIMEOUT_MS);

    let history_page_size = env::var("WALLET_HISTORY_PAGE_SIZE")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|size| *size > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE);

    let cfg = Config {
        base_url,
        session_db_path,
        timeouts: Timeouts {
            default: Duration::from_millis(default_ms),
            upload: Duration::from_millis(upload_ms),
        },
        history_page_size,
    };

    info!(
        base_url = %cfg.base_url,
        session_db = %cfg.session_db_path,
        timeout_ms = default_ms,
        upload_timeout_ms = upload_ms,
        page_size = cfg.history_page_size,
        "loaded config"
    );

    Ok(cfg)
}
