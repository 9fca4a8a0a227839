//! Layered configuration: built-in defaults, then `config.toml`, then
//! `SHELFBANK_`-prefixed environment variables (`__` separates sections,
//! e.g. `SHELFBANK_REMOTE__BACKEND=rest`).

use crate::error::ShelfError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::LazyLock;
use url::Url;

pub const CONFIG_FILE: &str = "config.toml";
pub const ENV_PREFIX: &str = "SHELFBANK_";

/// Balance credited to every newly created account.
pub const INITIAL_BALANCE: f64 = 500.0;

pub static CONFIG: LazyLock<Config> =
    LazyLock::new(|| Config::load().expect("FATAL: failed to load configuration"));

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub remote: RemoteConfig,
    pub shelf: ShelfConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub loglevel: String,
    pub listen_addr: String,
    pub database_url: String,
    /// File holding the persisted sign-in session.
    pub session_path: PathBuf,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            loglevel: "info".to_string(),
            listen_addr: "0.0.0.0:8000".to_string(),
            database_url: "sqlite:shelfbank.sqlite".to_string(),
            session_path: PathBuf::from("session.json"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteBackend {
    /// In-process document and blob store; nothing leaves the machine.
    #[default]
    Memory,
    /// Realtime-database REST API plus object storage REST API.
    Rest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub backend: RemoteBackend,
    pub database_url: Option<Url>,
    pub storage_url: Option<Url>,
    pub auth_token: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            backend: RemoteBackend::Memory,
            database_url: None,
            storage_url: None,
            auth_token: None,
            request_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShelfConfig {
    pub page_size: usize,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self { page_size: 10 }
    }
}

impl Config {
    pub fn load() -> Result<Self, ShelfError> {
        Self::figment().extract().map_err(ShelfError::from)
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_defaults() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("SHELFBANK_REMOTE__BACKEND", "rest");
            jail.set_env("SHELFBANK_SHELF__PAGE_SIZE", "25");
            let cfg = Config::load().expect("config should load");
            assert_eq!(cfg.remote.backend, RemoteBackend::Rest);
            assert_eq!(cfg.shelf.page_size, 25);
            assert_eq!(cfg.basic.loglevel, "info");
            Ok(())
        });
    }

    #[test]
    fn toml_file_is_layered_under_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                [basic]
                loglevel = "debug"

                [remote]
                request_timeout_secs = 3
                "#,
            )?;
            jail.set_env("SHELFBANK_BASIC__LOGLEVEL", "warn");
            let cfg = Config::load().expect("config should load");
            assert_eq!(cfg.basic.loglevel, "warn");
            assert_eq!(cfg.remote.request_timeout_secs, 3);
            Ok(())
        });
    }
}
