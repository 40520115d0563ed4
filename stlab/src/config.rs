//! Global configuration.
//!
//! Configuration is assembled once per process, in this order:
//!
//! 1. built-in defaults,
//! 2. the `[general]` table of `stlab.toml` in the working directory, if it exists,
//! 3. programmatic overrides made by the application before installing the config,
//! 4. environment variables (`STLAB_HOST`, `STLAB_PORT`, `STLAB_SECRET_KEY`, `STLAB_DEBUG`).
//!
//! ### Example
//!
//! ```rust,ignore
//! use stlab::config::Config;
//!
//! Config::load()?
//!     .secret_key("UNSAFE_SECRET")
//!     .port(5002)
//!     .install()?;
//! ```
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::env::var;
use std::fs::read_to_string;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::view::{ToTemplateValue, Value};

static CONFIG: OnceCell<Config> = OnceCell::new();

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "stlab.toml";

#[derive(Error, Debug)]
pub enum Error {
    #[error("config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("config file not found")]
    Io(#[from] std::io::Error),

    #[error("config is already loaded")]
    ConfigLoaded,

    #[error("invalid value for \"{0}\": \"{1}\"")]
    InvalidValue(&'static str, String),
}

/// Global configuration.
#[derive(Debug, Clone)]
pub struct Config {
    path: Option<PathBuf>,
    pub general: General,
}

/// Settings shared by the HTTP server, sessions and templates.
#[derive(Debug, Clone)]
pub struct General {
    pub host: String,
    pub port: u16,
    /// Key signing the session cookie. Anyone who knows it can forge sessions.
    pub secret_key: String,
    pub session_cookie_name: String,
    pub session_lifetime: Duration,
    pub header_max_size: usize,
    /// Largest request body accepted, in bytes. Larger ones get a 413.
    pub body_max_size: usize,
    pub templates: PathBuf,
    pub cache_templates: bool,
    pub debug: bool,
    pub tty: bool,
}

impl Default for General {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        let cache_templates = false;

        #[cfg(not(debug_assertions))]
        let cache_templates = true;

        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            secret_key: GeneralConfig::default_secret_key(),
            session_cookie_name: "session".into(),
            session_lifetime: Duration::days(31),
            header_max_size: 16 * 1024, // 16KB
            body_max_size: GeneralConfig::default_body_max_size(),
            templates: PathBuf::from("templates"),
            cache_templates,
            debug: false,
            tty: std::io::stderr().is_terminal(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: None,
            general: General::default(),
        }
    }
}

impl Config {
    /// Load configuration from defaults and the config file, if any.
    ///
    /// Environment variables are applied later, when the config is installed.
    pub fn load() -> Result<Config, Error> {
        let mut config = Config::default();
        let path = PathBuf::from(CONFIG_FILE);

        if path.exists() {
            let file = ConfigFile::load(&path)?;
            config.apply_file(&file);
            config.path = Some(path);
        }

        Ok(config)
    }

    /// Load configuration from a TOML string. Used mostly in tests.
    pub fn from_toml(source: &str) -> Result<Config, Error> {
        let file: ConfigFile = toml::from_str(source)?;
        let mut config = Config::default();
        config.apply_file(&file);
        Ok(config)
    }

    fn apply_file(&mut self, file: &ConfigFile) {
        let general = &file.general;

        if let Some(ref host) = general.host {
            self.general.host = host.clone();
        }

        if let Some(port) = general.port {
            self.general.port = port;
        }

        if let Some(ref secret_key) = general.secret_key {
            self.general.secret_key = secret_key.clone();
        }

        if let Some(ref name) = general.session_cookie_name {
            self.general.session_cookie_name = name.clone();
        }

        if let Some(lifetime) = general.session_lifetime {
            self.general.session_lifetime = Duration::seconds(lifetime);
        }

        if let Some(ref templates) = general.templates {
            self.general.templates = templates.clone();
        }

        if let Some(cache_templates) = general.cache_templates {
            self.general.cache_templates = cache_templates;
        }

        if let Some(debug) = general.debug {
            self.general.debug = debug;
        }

        self.general.header_max_size = general.header_max_size;
        self.general.body_max_size = general.body_max_size;
    }

    /// Apply overrides from a variable lookup, normally the process environment.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<&mut Self, Error> {
        if let Some(host) = lookup("STLAB_HOST") {
            self.general.host = host;
        }

        if let Some(port) = lookup("STLAB_PORT") {
            self.general.port = port
                .parse()
                .map_err(|_| Error::InvalidValue("STLAB_PORT", port.clone()))?;
        }

        if let Some(secret_key) = lookup("STLAB_SECRET_KEY") {
            self.general.secret_key = secret_key;
        }

        if let Some(debug) = lookup("STLAB_DEBUG") {
            self.general.debug = matches!(debug.to_lowercase().as_str(), "1" | "true" | "yes");
        }

        Ok(self)
    }

    /// Set the secret key used to sign session cookies.
    pub fn secret_key(mut self, secret_key: impl ToString) -> Self {
        self.general.secret_key = secret_key.to_string();
        self
    }

    /// Set the port the HTTP server listens on.
    pub fn port(mut self, port: u16) -> Self {
        self.general.port = port;
        self
    }

    /// Set the host the HTTP server binds to.
    pub fn host(mut self, host: impl ToString) -> Self {
        self.general.host = host.to_string();
        self
    }

    /// Show error details in 500 responses.
    pub fn debug(mut self, debug: bool) -> Self {
        self.general.debug = debug;
        self
    }

    /// Directory templates are loaded from.
    pub fn templates(mut self, templates: impl AsRef<Path>) -> Self {
        self.general.templates = templates.as_ref().to_owned();
        self
    }

    /// Apply environment overrides and make this the global configuration.
    ///
    /// Fails if the configuration was already installed or read.
    pub fn install(mut self) -> Result<&'static Config, Error> {
        self.apply_env(|name| var(name).ok())?;
        CONFIG.set(self).map_err(|_| Error::ConfigLoaded)?;
        Ok(get_config())
    }

    /// Path of the config file this configuration was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get() -> &'static Config {
        get_config()
    }

    /// Log where the configuration came from.
    pub fn log_info(&self) {
        match self.path {
            Some(ref path) => tracing::info!("Configuration loaded from \"{}\"", path.display()),
            None => tracing::info!("Configuration file missing, using defaults"),
        }
    }

    /// The configuration as templates see it, with Flask-style uppercase keys.
    pub fn template_values(&self) -> HashMap<String, Value> {
        let general = &self.general;

        HashMap::from([
            (
                "SECRET_KEY".to_string(),
                Value::String(general.secret_key.clone()),
            ),
            (
                "SESSION_COOKIE_NAME".to_string(),
                Value::String(general.session_cookie_name.clone()),
            ),
            (
                "PERMANENT_SESSION_LIFETIME".to_string(),
                Value::Integer(general.session_lifetime.whole_seconds()),
            ),
            ("DEBUG".to_string(), Value::Boolean(general.debug)),
            (
                "TEMPLATES_AUTO_RELOAD".to_string(),
                Value::Boolean(!general.cache_templates),
            ),
            (
                "SERVER_NAME".to_string(),
                Value::String(format!("{}:{}", general.host, general.port)),
            ),
        ])
    }
}

impl ToTemplateValue for Config {
    fn to_template_value(&self) -> Result<Value, crate::view::Error> {
        Ok(Value::Hash(self.template_values()))
    }
}

/// Get the global configuration, loading it if it's not set yet.
pub fn get_config() -> &'static Config {
    CONFIG.get_or_init(|| {
        let mut config = Config::load().unwrap_or_default();
        if config.apply_env(|name| var(name).ok()).is_err() {
            config.general.port = General::default().port;
        }
        config
    })
}

#[derive(Serialize, Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    general: GeneralConfig,
}

impl ConfigFile {
    fn load(path: impl AsRef<Path>) -> Result<ConfigFile, Error> {
        let file = read_to_string(path)?;
        let config: Self = toml::from_str(&file)?;

        Ok(config)
    }
}

#[derive(Serialize, Deserialize)]
struct GeneralConfig {
    host: Option<String>,
    port: Option<u16>,
    secret_key: Option<String>,
    session_cookie_name: Option<String>,
    /// Seconds.
    session_lifetime: Option<i64>,
    #[serde(default = "GeneralConfig::default_header_max_size")]
    header_max_size: usize,
    #[serde(default = "GeneralConfig::default_body_max_size")]
    body_max_size: usize,
    templates: Option<PathBuf>,
    cache_templates: Option<bool>,
    debug: Option<bool>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            secret_key: None,
            session_cookie_name: None,
            session_lifetime: None,
            header_max_size: Self::default_header_max_size(),
            body_max_size: Self::default_body_max_size(),
            templates: None,
            cache_templates: None,
            debug: None,
        }
    }
}

impl GeneralConfig {
    fn default_header_max_size() -> usize {
        16 * 1024
    }

    fn default_body_max_size() -> usize {
        1024 * 1024
    }

    fn default_secret_key() -> String {
        use base64::{engine::general_purpose, Engine as _};
        use rand::Rng;

        let bytes = rand::thread_rng().gen::<[u8; 256 / 8]>();

        general_purpose::STANDARD.encode(bytes)
    }
}
