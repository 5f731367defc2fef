use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result};
use std::fs;

use common::{Coordinate, SearchRadius};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
    /// Bearer token; normally supplied by the stored session instead.
    #[serde(default)]
    pub token: Option<String>,
}

fn default_base_url() -> String { common::DEFAULT_API_URL.to_string() }
fn default_request_timeout() -> u64 { 30 }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_request_timeout(),
            token: None,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub default_radius: SearchRadius,
    #[serde(default = "default_location_timeout")]
    pub location_timeout_secs: u64,
    /// Drop results the server returned beyond the requested radius.
    #[serde(default)]
    pub strict_radius: bool,
}

fn default_location_timeout() -> u64 { 10 }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_radius: SearchRadius::default(),
            location_timeout_secs: default_location_timeout(),
            strict_radius: false,
        }
    }
}

/// Fixed position used when the host has no location service.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl LocationConfig {
    pub fn coordinate(&self) -> Result<Option<Coordinate>> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Ok(Some(Coordinate::new(lat, lon)?)),
            (None, None) => Ok(None),
            _ => Err(anyhow::anyhow!("location needs both latitude and longitude")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    pub output: Option<PathBuf>,
}

fn default_log_level() -> String { "warn".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            output: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_path")]
    pub path: PathBuf,
}

fn default_session_path() -> PathBuf { home_path(common::USER_SESSION_PATH) }

impl Default for SessionConfig {
    fn default() -> Self {
        Self { path: default_session_path() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Resolves a path relative to `$HOME`, or the working directory without one.
pub fn home_path(relative: &str) -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(relative),
        None => PathBuf::from(relative),
    }
}

/// One configuration file as written. Only the keys it sets override the
/// layers beneath it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigLayer {
    pub api: ApiLayer,
    pub search: SearchLayer,
    pub location: LocationConfig,
    pub logging: LoggingLayer,
    pub session: SessionLayer,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiLayer {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SearchLayer {
    pub default_radius: Option<SearchRadius>,
    pub location_timeout_secs: Option<u64>,
    pub strict_radius: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingLayer {
    pub level: Option<String>,
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionLayer {
    pub path: Option<PathBuf>,
}

impl ConfigLayer {
    /// Load a layer from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        // An empty YAML document is null, which means "sets nothing".
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let layer: ConfigLayer = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(layer)
    }

    /// Load a layer from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let layer: ConfigLayer = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(layer)
    }

    /// Detect file type by extension and load
    pub fn from_file(path: &Path) -> Result<Self> {
        let ext = path.extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        match ext {
            "yaml" | "yml" => Self::from_yaml_file(path),
            "toml" => Self::from_toml_file(path),
            _ => Err(anyhow::anyhow!("Unsupported config file format. Use .yaml, .yml, or .toml")),
        }
    }
}

impl Config {
    /// A single file over the defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut config = Config::default();
        config.merge(ConfigLayer::from_file(path)?);
        Ok(config)
    }

    /// Layers every existing file in `paths`, in order, over the defaults.
    pub fn from_layers(paths: &[PathBuf]) -> Result<Self> {
        let mut config = Config::default();
        for path in paths {
            if path.exists() {
                log::debug!("Loading config from {:?}", path);
                config.merge(ConfigLayer::from_file(path)?);
            }
        }
        Ok(config)
    }

    /// Builds the effective configuration.
    ///
    /// An explicit path must exist. Without one, the system file and then the
    /// user file are layered over the defaults when present. Environment
    /// overrides are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => Self::from_layers(&[
                PathBuf::from(common::DEFAULT_CONFIG_PATH),
                home_path(common::USER_CONFIG_PATH),
            ])?,
        };

        config.apply_env();
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `FIELDHAND_API_URL` and `FIELDHAND_LOG` as resolved by `lookup`.
    /// Blank values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = set(common::API_URL_ENV) {
            self.api.base_url = url;
        }
        if let Some(log_file) = set(common::LOG_FILE_ENV) {
            self.logging.output = Some(PathBuf::from(log_file));
        }
    }

    /// Merge a layer, preferring the values it sets
    pub fn merge(&mut self, other: ConfigLayer) {
        // API settings
        if let Some(base_url) = other.api.base_url {
            self.api.base_url = base_url;
        }
        if let Some(timeout_secs) = other.api.timeout_secs {
            self.api.timeout_secs = timeout_secs;
        }
        if other.api.token.is_some() {
            self.api.token = other.api.token;
        }

        // Search settings
        if let Some(radius) = other.search.default_radius {
            self.search.default_radius = radius;
        }
        if let Some(secs) = other.search.location_timeout_secs {
            self.search.location_timeout_secs = secs;
        }
        if let Some(strict) = other.search.strict_radius {
            self.search.strict_radius = strict;
        }

        // Location is replaced as a pair; a half pair surfaces from coordinate()
        if other.location.latitude.is_some() || other.location.longitude.is_some() {
            self.location = other.location;
        }

        // Logging settings
        if let Some(level) = other.logging.level {
            self.logging.level = level;
        }
        if other.logging.output.is_some() {
            self.logging.output = other.logging.output;
        }

        if let Some(path) = other.session.path {
            self.session.path = path;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.search.default_radius.km(), 2);
        assert_eq!(config.search.location_timeout_secs, 10);
        assert!(!config.search.strict_radius);
        assert!(config.location.coordinate().unwrap().is_none());
    }

    #[test]
    fn test_yaml_partial_file_keeps_defaults() {
        let file = write_temp(".yaml", "api:\n  base_url: http://farm.example:9000\nsearch:\n  default_radius: 5\n");
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.api.base_url, "http://farm.example:9000");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.search.default_radius.km(), 5);
    }

    #[test]
    fn test_toml_file_with_location() {
        let file = write_temp(".toml", "[location]\nlatitude = 30.901\nlongitude = 75.8573\n\n[search]\nstrict_radius = true\n");
        let config = Config::from_file(file.path()).unwrap();
        let coord = config.location.coordinate().unwrap().unwrap();
        assert_eq!(coord.latitude(), 30.901);
        assert!(config.search.strict_radius);
    }

    #[test]
    fn test_out_of_range_radius_rejected() {
        let file = write_temp(".yaml", "search:\n  default_radius: 25\n");
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_unknown_extension_rejected() {
        let file = write_temp(".ini", "");
        assert!(Config::from_file(file.path()).is_err());
    }

    #[test]
    fn test_half_location_is_error() {
        let location = LocationConfig { latitude: Some(10.0), longitude: None };
        assert!(location.coordinate().is_err());
    }

    #[test]
    fn test_merge_keeps_existing_token_and_location() {
        let mut base = Config::default();
        base.api.token = Some("abc".to_string());
        base.location = LocationConfig { latitude: Some(1.0), longitude: Some(2.0) };

        let mut other = ConfigLayer::default();
        other.api.base_url = Some("http://other:1".to_string());
        base.merge(other);

        assert_eq!(base.api.base_url, "http://other:1");
        assert_eq!(base.api.token.as_deref(), Some("abc"));
        assert_eq!(base.location.latitude, Some(1.0));
        assert_eq!(base.api.timeout_secs, 30);
    }

    #[test]
    fn test_later_layer_only_overrides_what_it_sets() {
        let system = write_temp(
            ".yaml",
            "api:\n  base_url: http://farm.example:9000\nsearch:\n  default_radius: 5\nlogging:\n  level: info\n",
        );
        let user = write_temp(".toml", "[location]\nlatitude = 30.901\nlongitude = 75.8573\n");

        let config = Config::from_layers(&[system.path().to_path_buf(), user.path().to_path_buf()]).unwrap();
        assert_eq!(config.api.base_url, "http://farm.example:9000");
        assert_eq!(config.search.default_radius.km(), 5);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.location.coordinate().unwrap().unwrap().longitude(), 75.8573);
    }

    #[test]
    fn test_later_layer_wins_where_both_set() {
        let system = write_temp(".yaml", "search:\n  default_radius: 5\n  strict_radius: true\n");
        let user = write_temp(".yaml", "search:\n  default_radius: 8\n");
        let missing = system.path().with_extension("absent.yaml");

        let config = Config::from_layers(&[system.path().to_path_buf(), missing, user.path().to_path_buf()]).unwrap();
        assert_eq!(config.search.default_radius.km(), 8);
        assert!(config.search.strict_radius);
        assert_eq!(config.search.location_timeout_secs, 10);
    }

    #[test]
    fn test_empty_yaml_layer_sets_nothing() {
        let file = write_temp(".yaml", "");
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.api.base_url, common::DEFAULT_API_URL);
    }

    #[test]
    fn test_env_overrides_skip_blank_values() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            common::API_URL_ENV => Some("http://env.example:8000".to_string()),
            common::LOG_FILE_ENV => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(config.api.base_url, "http://env.example:8000");
        assert!(config.logging.output.is_none());

        config.apply_overrides(|key| (key == common::LOG_FILE_ENV).then(|| "/tmp/fieldhand.log".to_string()));
        assert_eq!(config.api.base_url, "http://env.example:8000");
        assert_eq!(config.logging.output, Some(PathBuf::from("/tmp/fieldhand.log")));
    }

    #[test]
    fn test_apply_env_reads_process_environment() {
        std::env::set_var(common::API_URL_ENV, "http://from-env.example:7000");
        std::env::remove_var(common::LOG_FILE_ENV);
        let mut config = Config::default();
        config.apply_env();
        std::env::remove_var(common::API_URL_ENV);

        assert_eq!(config.api.base_url, "http://from-env.example:7000");
        assert!(config.logging.output.is_none());
    }
}
