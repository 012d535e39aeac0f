// Configuration de l'application - emplacements des données et adresse HTTP

use std::net::SocketAddr;
use std::path::PathBuf;

pub const APP_DIR_NAME: &str = "RSoundBoard";
pub const BUTTONS_FILE: &str = "soundboard_data.json";
pub const SETTINGS_FILE: &str = "settings.json";
pub const DEFAULT_HTTP_ADDR: &str = "0.0.0.0:5000";

pub const DATA_DIR_ENV: &str = "SOUNDBOARD_DATA_DIR";
pub const HTTP_ADDR_ENV: &str = "SOUNDBOARD_HTTP_ADDR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub http_addr: SocketAddr,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    ///
    /// An unparsable bind address falls back to [`DEFAULT_HTTP_ADDR`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = lookup(DATA_DIR_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let http_addr = match lookup(HTTP_ADDR_ENV) {
            Some(raw) => raw.trim().parse::<SocketAddr>().unwrap_or_else(|e| {
                log::warn!("Invalid {} '{}' ({}), using {}", HTTP_ADDR_ENV, raw, e, DEFAULT_HTTP_ADDR);
                default_http_addr()
            }),
            None => default_http_addr(),
        };

        Self {
            data_dir,
            http_addr,
        }
    }

    pub fn buttons_path(&self) -> PathBuf {
        self.data_dir.join(BUTTONS_FILE)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join(SETTINGS_FILE)
    }
}

/// `<user data dir>/RSoundBoard`, or `./RSoundBoard` without a data dir
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}
