// Persisted client configuration: a small JSON object in the user's home
// directory. Only `token` is meaningful; other keys are carried through
// untouched when the file is rewritten.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CONFIG_FILE_NAME: &str = ".v2ctlcfg.json";

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Handle on the config file. Commands receive one explicitly instead of
/// reaching for a global path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store backed by the file at `path`; nothing is read until `load`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ConfigStore { path: path.into() }
    }

    /// `~/.v2ctlcfg.json`, or `./.v2ctlcfg.json` when no home directory is known.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the config. A missing file is an empty config; an unreadable or
    /// corrupt one is logged and also treated as empty.
    pub fn load(&self) -> Config {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no config file, using empty config");
                return Config::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read config, using empty config");
                return Config::default();
            }
        };
        match serde_json::from_str(&text) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "config is not valid JSON, using empty config");
                Config::default()
            }
        }
    }

    /// Overwrite the file with `cfg`.
    pub fn save(&self, cfg: &Config) -> Result<()> {
        let io_err = |source| Error::ConfigWrite {
            path: self.path.clone(),
            source,
        };
        let body = serde_json::to_string(cfg).map_err(|e| io_err(e.into()))?;
        fs::write(&self.path, body).map_err(io_err)?;
        debug!(path = %self.path.display(), "config written");
        Ok(())
    }

    /// Load, replace the token, write back.
    pub fn store_token(&self, token: &str) -> Result<()> {
        let mut cfg = self.load();
        cfg.token = Some(token.to_string());
        self.save(&cfg)
    }
}
