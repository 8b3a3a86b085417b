use std::{
    fs,
    path::{Path, PathBuf},
    sync::{LazyLock, RwLock},
    time::Duration,
};

use charmrepo_utils::{
    path::{resolve_path, xdg_cache_home, xdg_config_home},
    time::parse_duration,
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{ConfigError, Result};

pub const DEFAULT_STORE_URL: &str = "https://api.jujucharms.com/charmstore";

/// Client configuration.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct Config {
    /// Base URL of the charm store API, without the version segment.
    /// Default: https://api.jujucharms.com/charmstore
    pub store_url: Option<String>,

    /// Directory holding downloaded charm archives.
    /// Default: $XDG_CACHE_HOME/charmrepo/charms
    pub cache_path: Option<String>,

    /// Root of the local charm repository used for `local:` URLs.
    pub local_repository: Option<String>,

    /// Ask the store not to count downloads.
    /// Default: false
    pub test_mode: Option<bool>,

    /// Global timeout for store requests, e.g. `30s` or `5m`.
    pub timeout: Option<String>,

    /// User agent sent with store requests.
    /// Default: charmrepo/<version>
    pub user_agent: Option<String>,
}

pub static CONFIG: LazyLock<RwLock<Option<Config>>> = LazyLock::new(|| RwLock::new(None));

pub static CONFIG_PATH: LazyLock<RwLock<PathBuf>> = LazyLock::new(|| {
    RwLock::new(match std::env::var("CHARMREPO_CONFIG") {
        Ok(path_str) => PathBuf::from(path_str),
        Err(_) => xdg_config_home().join("charmrepo").join("config.toml"),
    })
});

/// Loads the configuration file into the process-wide slot.
pub fn init() -> Result<()> {
    let config = Config::new()?;
    let mut global_config = CONFIG.write().unwrap();
    *global_config = Some(config);
    Ok(())
}

/// Overrides the configuration file location used by [`init`].
pub fn set_config_path<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = resolve_path(&path.as_ref().to_string_lossy())?;
    *CONFIG_PATH.write().unwrap() = path;
    Ok(())
}

/// Returns a copy of the process-wide configuration, falling back to the
/// defaults when [`init`] was never called.
pub fn get_config() -> Config {
    if let Some(config) = CONFIG.read().unwrap().as_ref() {
        return config.clone();
    }

    let mut config_guard = CONFIG.write().unwrap();
    config_guard.get_or_insert_with(Config::default_config).clone()
}

impl Config {
    pub fn default_config() -> Self {
        Self {
            store_url: Some(DEFAULT_STORE_URL.to_string()),
            cache_path: Some(format!(
                "{}/charmrepo/charms",
                xdg_cache_home().display()
            )),
            local_repository: None,
            test_mode: Some(false),
            timeout: None,
            user_agent: Some(default_user_agent()),
        }
    }

    /// Creates a new configuration by loading it from the configuration file.
    /// If the configuration file is not found, it uses the default configuration.
    pub fn new() -> Result<Self> {
        let config_path = CONFIG_PATH.read().unwrap().to_path_buf();
        Self::load_from(config_path)
    }

    pub fn load_from<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let mut config = match fs::read_to_string(config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(
                    "Config file {} not found, using defaults",
                    config_path.display()
                );
                Self::default_config()
            }
            Err(err) => return Err(ConfigError::IoError(err)),
        };

        config.resolve()?;

        Ok(config)
    }

    /// Fills in defaults and validates the loaded values.
    pub fn resolve(&mut self) -> Result<()> {
        let defaults = Self::default_config();

        if self.store_url.is_none() {
            self.store_url = defaults.store_url;
        }
        if self.cache_path.is_none() {
            self.cache_path = defaults.cache_path;
        }
        if self.user_agent.is_none() {
            self.user_agent = defaults.user_agent;
        }
        self.test_mode.get_or_insert(false);

        self.get_store_url()?;
        self.get_timeout()?;

        Ok(())
    }

    pub fn get_store_url(&self) -> Result<Url> {
        let raw = std::env::var("CHARMREPO_STORE_URL")
            .ok()
            .or_else(|| self.store_url.clone())
            .unwrap_or_else(|| DEFAULT_STORE_URL.to_string());

        let url = Url::parse(&raw).map_err(|_| ConfigError::InvalidStoreUrl(raw.clone()))?;
        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ConfigError::InvalidStoreUrl(raw));
        }
        Ok(url)
    }

    pub fn get_cache_path(&self) -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var("CHARMREPO_CACHE") {
            return Ok(resolve_path(&env_path)?);
        }
        match &self.cache_path {
            Some(cache_path) => Ok(resolve_path(cache_path)?),
            None => Ok(xdg_cache_home().join("charmrepo").join("charms")),
        }
    }

    pub fn get_local_repository(&self) -> Result<Option<PathBuf>> {
        if let Ok(env_path) = std::env::var("CHARMREPO_LOCAL_REPOSITORY") {
            return Ok(Some(resolve_path(&env_path)?));
        }
        self.local_repository
            .as_deref()
            .map(resolve_path)
            .transpose()
            .map_err(ConfigError::from)
    }

    pub fn get_timeout(&self) -> Result<Option<Duration>> {
        self.timeout
            .as_deref()
            .map(|value| {
                parse_duration(value).ok_or_else(|| ConfigError::InvalidDuration(value.to_string()))
            })
            .transpose()
    }

    pub fn is_test_mode(&self) -> bool {
        self.test_mode.unwrap_or(false)
    }

    pub fn get_user_agent(&self) -> String {
        self.user_agent.clone().unwrap_or_else(default_user_agent)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn default_user_agent() -> String {
    format!("charmrepo/{}", env!("CARGO_PKG_VERSION"))
}
