use std::{env, fmt, fs, io, path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vantage::Region;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    ReadFailed { path: path::PathBuf, source: io::Error },
    #[error("Failed to write {}: {source}", path.display())]
    WriteFailed { path: path::PathBuf, source: io::Error },
    #[error("Failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("No config directory available")]
    ConfigPathUnavailable,
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub server: Server,
    pub checker: Checker,
    pub publisher: Publisher,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Checker {
    /// The region this checker is deployed in
    pub region: Region,
    /// Bearer token callers must present, the checker refuses to start without one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Publisher {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub datasource: String,
}

impl Default for Server {
    fn default() -> Self {
        Self { bind: "0.0.0.0".into(), port: 8080 }
    }
}

impl Default for Checker {
    fn default() -> Self {
        Self { region: Region::Ams, secret: None, request_timeout_ms: vantage::DEFAULT_TIMEOUT_MS }
    }
}

impl Default for Publisher {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            datasource: vantage::publisher::DEFAULT_DATASOURCE.into(),
        }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/vantage/checker.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("vantage/checker.toml"))
}

fn mask(secret: Option<&str>) -> &'static str {
    if secret.is_some() { "********" } else { "(unset)" }
}

impl fmt::Display for CheckerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Checker Configuration:")?;
        write_title_1(f, "Server")?;
        write_1(f, "Bind Address", &self.server.bind)?;
        write_1(f, "Port", &self.server.port)?;
        write_title_1(f, "Checker")?;
        write_1(f, "Region", &self.checker.region.format(vantage::region::RegionFormat::Long))?;
        write_1(f, "Secret", &mask(self.checker.secret.as_deref()))?;
        write_1(f, "Request Timeout (ms)", &self.checker.request_timeout_ms)?;
        write_title_1(f, "Publisher")?;
        write_1(f, "Endpoint", &self.publisher.endpoint.as_deref().unwrap_or("(disabled)"))?;
        write_1(f, "Token", &mask(self.publisher.token.as_deref()))?;
        write_1(f, "Datasource", &self.publisher.datasource)?;

        Ok(())
    }
}

impl CheckerConfig {
    /// Load the config file, then apply environment overrides
    pub fn load(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let mut config = Self::from_config(optional_path)?;
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the checker must not serve with
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.checker.secret.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => Ok(()),
            _ => Err(ConfigError::InvalidValue {
                key: "CHECKER_SECRET",
                message: "a bearer token is required, set CHECKER_SECRET or checker.secret".into(),
            }),
        }
    }

    /// Generate CheckerConfig structure from file
    ///
    /// Creates a default config in ~/.config/vantage/checker.toml
    ///  or the specified path if one does not exist
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| ConfigError::ReadFailed { path: config_path.clone(), source })?;
            Ok(toml::from_str(raw_string.as_str())?)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str: String = toml::to_string_pretty(self)?;
        let write_failed = |source| ConfigError::WriteFailed { path: path.to_path_buf(), source };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }

        fs::write(path, config_str).map_err(write_failed)
    }

    /// Override file values with whatever `lookup` knows about
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(region) = lookup("CHECKER_REGION") {
            self.checker.region = region
                .parse()
                .map_err(|e: vantage::region::UnknownRegion| ConfigError::InvalidValue {
                    key: "CHECKER_REGION",
                    message: e.to_string(),
                })?;
        }
        if let Some(bind) = lookup("CHECKER_BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue { key: "PORT", message: e.to_string() }
            })?;
        }
        if let Some(secret) = lookup("CHECKER_SECRET") {
            self.checker.secret = Some(secret);
        }
        if let Some(endpoint) = lookup("PUBLISHER_ENDPOINT") {
            self.publisher.endpoint = Some(endpoint);
        }
        if let Some(token) = lookup("PUBLISHER_TOKEN") {
            self.publisher.token = Some(token);
        }
        Ok(())
    }
}
