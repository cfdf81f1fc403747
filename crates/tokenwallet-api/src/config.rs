//! Server configuration loading.
//!
//! Sources, later wins:
//! 1. Built-in defaults
//! 2. JSON file named by `TOKENWALLET_CONFIG`
//! 3. `TOKENWALLET_LISTEN` for the listen address

use std::net::SocketAddr;
use std::path::Path;

use tokenwallet_types::{Result, ServerConfig, WalletError};

pub const CONFIG_PATH_ENV: &str = "TOKENWALLET_CONFIG";
pub const LISTEN_ENV: &str = "TOKENWALLET_LISTEN";

/// Load configuration from the process environment.
///
/// # Errors
/// `Io` if the config file cannot be read, `Configuration` if it or the
/// listen override is invalid.
pub fn load() -> Result<ServerConfig> {
    let path = std::env::var_os(CONFIG_PATH_ENV);
    let listen = std::env::var(LISTEN_ENV).ok();
    load_from(path.as_deref().map(Path::new), listen.as_deref())
}

/// Load configuration from an optional file plus an optional listen
/// address override.
///
/// # Errors
/// Same as [`load`].
pub fn load_from(path: Option<&Path>, listen_override: Option<&str>) -> Result<ServerConfig> {
    let mut config = match path {
        Some(path) => ServerConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => ServerConfig::default(),
    };
    if let Some(listen) = listen_override.map(str::trim).filter(|s| !s.is_empty()) {
        config.listen_addr = listen.parse::<SocketAddr>().map_err(|e| {
            WalletError::Configuration(format!("{LISTEN_ENV}={listen} is not a socket address: {e}"))
        })?;
    }
    config.validate()?;
    Ok(config)
}
