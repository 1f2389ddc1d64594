use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::TraversalOrder;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Failed to read config: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration for RefScan
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RefScanConfig {
    /// Traversal and classification settings
    #[serde(default)]
    pub scan: ScanSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Report output
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Work-list discipline for scene scans
    #[serde(default)]
    pub traversal: TraversalOrder,

    /// Node names containing this marker are reported as missing templates
    #[serde(default = "default_missing_template_marker")]
    pub missing_template_marker: String,

    /// Asset paths containing this are treated as templates
    #[serde(default = "default_template_extension")]
    pub template_extension: String,

    /// Suppress per-occurrence diagnostics and progress drawing
    #[serde(default)]
    pub batch_mode: bool,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            traversal: TraversalOrder::default(),
            missing_template_marker: default_missing_template_marker(),
            template_extension: default_template_extension(),
            batch_mode: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Default report path, used when `--outfile` is not given
    #[serde(default)]
    pub outfile: Option<PathBuf>,
}

fn default_missing_template_marker() -> String {
    "Missing Prefab".to_string()
}
fn default_template_extension() -> String {
    ".prefab".to_string()
}
fn default_log_level() -> String {
    "warn".to_string()
}

/// Configuration manager with file discovery and environment overrides
pub struct ConfigManager {
    config: RefScanConfig,
    config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Load configuration with the following precedence:
    /// 1. Environment variables
    /// 2. Config file (.refscan.toml)
    /// 3. Sensible defaults
    pub fn load() -> Result<Self, ConfigError> {
        let (config, config_path) = Self::load_config_file()?;
        let config = Self::apply_env_overrides(config);
        Self::validate_config(&config)?;

        match config_path {
            Some(ref path) => info!("Config file: {}", path.display()),
            None => debug!("No config file found, using defaults"),
        }

        Ok(Self {
            config,
            config_path,
        })
    }

    /// Load from an explicit file; missing files are an error here.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let config = Self::apply_env_overrides(Self::read_toml_file(path)?);
        Self::validate_config(&config)?;
        Ok(Self {
            config,
            config_path: Some(path.to_path_buf()),
        })
    }

    /// Search order:
    /// 1. ./.refscan.toml
    /// 2. ~/.refscan/config.toml
    fn load_config_file() -> Result<(RefScanConfig, Option<PathBuf>), ConfigError> {
        let local_config = Path::new(".refscan.toml");
        if local_config.exists() {
            let config = Self::read_toml_file(local_config)?;
            return Ok((config, Some(local_config.to_path_buf())));
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".refscan").join("config.toml");
            if user_config.exists() {
                let config = Self::read_toml_file(&user_config)?;
                return Ok((config, Some(user_config)));
            }
        }

        Ok((RefScanConfig::default(), None))
    }

    fn read_toml_file(path: &Path) -> Result<RefScanConfig, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    fn apply_env_overrides(mut config: RefScanConfig) -> RefScanConfig {
        if let Ok(order) = std::env::var("REFSCAN_TRAVERSAL") {
            if let Ok(order) = order.parse() {
                config.scan.traversal = order;
            }
        }
        if let Ok(marker) = std::env::var("REFSCAN_MISSING_MARKER") {
            config.scan.missing_template_marker = marker;
        }
        if let Ok(ext) = std::env::var("REFSCAN_TEMPLATE_EXTENSION") {
            config.scan.template_extension = ext;
        }
        if let Ok(batch) = std::env::var("REFSCAN_BATCH") {
            config.scan.batch_mode = batch.to_lowercase() == "true" || batch == "1";
        }
        if let Ok(path) = std::env::var("REFSCAN_OUTFILE") {
            config.output.outfile = Some(PathBuf::from(path));
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.logging.level = level;
        }

        config
    }

    pub fn validate_config(config: &RefScanConfig) -> Result<(), ConfigError> {
        if config.scan.missing_template_marker.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "missing_template_marker must not be empty".to_string(),
            ));
        }
        if config.scan.template_extension.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "template_extension must not be empty".to_string(),
            ));
        }

        // RUST_LOG may carry full directives; only validate the bare level form.
        let level = config.logging.level.as_str();
        if !level.contains('=') && !level.contains(',') {
            match level {
                "trace" | "debug" | "info" | "warn" | "error" | "off" => {}
                other => {
                    return Err(ConfigError::ValidationError(format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        other
                    )))
                }
            }
        }

        Ok(())
    }

    pub fn config(&self) -> &RefScanConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RefScanConfig {
        &mut self.config
    }

    /// Get the path to the config file that was loaded, if any
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
