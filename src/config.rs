use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::das::{ClientSettings, DEFAULT_HOST, DEFAULT_THRESHOLD, TransportOptions};
use crate::error::DasError;
use crate::fs_util::expand_home;
use crate::store::JsonFileStore;

pub const DEFAULT_CONFIG_FILE: &str = "das-import.json";

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub host: Option<String>,
    /// Query waiting threshold in seconds.
    #[serde(default)]
    pub threshold: Option<u64>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub cert: Option<String>,
    #[serde(default)]
    pub idx: Option<u32>,
    #[serde(default)]
    pub das_headers: Option<bool>,
    #[serde(default)]
    pub store: Option<String>,
}

/// Values given on the command line; they win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub threshold: Option<u64>,
    pub key: Option<String>,
    pub cert: Option<String>,
    pub idx: Option<u32>,
    pub das_headers: bool,
    pub store: Option<String>,
    pub verbose: u8,
}

#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub client: ClientSettings,
    pub transport: TransportOptions,
    pub idx: u32,
    pub store_path: Utf8PathBuf,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the config file. An explicit `path` must exist; the default file in the
    /// current directory is optional.
    pub fn resolve(path: Option<&str>) -> Result<Config, DasError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| DasError::ConfigRead(config_path.clone()))?;
        serde_json::from_str(&content).map_err(|err| DasError::ConfigParse(err.to_string()))
    }
}

impl Config {
    pub fn resolve_settings(self, overrides: Overrides) -> Result<ResolvedSettings, DasError> {
        let host = overrides
            .host
            .or(self.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let threshold = overrides
            .threshold
            .or(self.threshold)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_THRESHOLD);
        let include_service_headers = overrides.das_headers || self.das_headers.unwrap_or(false);

        let store_path = match overrides.store.or(self.store) {
            Some(path) => Utf8PathBuf::from_path_buf(expand_home(&path)?)
                .map_err(|_| DasError::Filesystem(format!("non-utf8 store path: {path}")))?,
            None => JsonFileStore::default_path()?,
        };

        Ok(ResolvedSettings {
            client: ClientSettings {
                host,
                threshold,
                include_service_headers,
            },
            transport: TransportOptions {
                key: overrides.key.or(self.key),
                cert: overrides.cert.or(self.cert),
                verbose: overrides.verbose,
            },
            idx: overrides.idx.or(self.idx).unwrap_or(0),
            store_path,
        })
    }
}
