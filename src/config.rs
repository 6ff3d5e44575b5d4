//! Configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults
//! are the base layer; a `config.toml` in the config directory overrides
//! any subset of them.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! dir = "image-alter-out"   # Where results are written
//! quality = 75              # Quality used when a request gives none (0-100)
//!
//! [logging]
//! level = "info"            # tracing filter directive (RUST_LOG wins)
//! format = "pretty"         # "pretty" or "json"
//!
//! [processing]
//! max_processes = 4         # Max parallel requests (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlterConfig {
    /// Output location and default quality.
    pub output: OutputConfig,
    /// Log level and format.
    pub logging: LoggingConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl AlterConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.output.quality > 100 {
            return Err(ConfigError::Validation(
                "output.quality must be 0-100".into(),
            ));
        }
        if self.output.dir.trim().is_empty() {
            return Err(ConfigError::Validation("output.dir must not be empty".into()));
        }
        if tracing_subscriber::EnvFilter::try_new(&self.logging.level).is_err() {
            return Err(ConfigError::Validation(format!(
                "logging.level '{}' is not a valid filter directive",
                self.logging.level
            )));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Where results go and how they are encoded by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory results are written into (created when missing).
    pub dir: String,
    /// Encode quality for requests that don't give one.
    pub quality: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "image-alter-out".to_string(),
            quality: 75,
        }
    }
}

/// Logging settings for the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `"info"` or `"image_alter=debug"`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of requests processed in parallel.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Rayon pool size for `run`: the configured limit, never above the core count.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
    match config.max_processes {
        Some(limit) => limit.min(cores),
        None => cores,
    }
}

/// [`AlterConfig::default`] as a TOML table, the layer user files merge onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(AlterConfig::default())?)
}

/// Lay `overlay` over `base`.
///
/// Sections merge key by key; any other value in `overlay` wins outright.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut merged), toml::Value::Table(overrides)) => {
            for (key, value) in overrides {
                let value = match merged.remove(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => value,
                };
                merged.insert(key, value);
            }
            toml::Value::Table(merged)
        }
        (_, overlay) => overlay,
    }
}

/// Parse `<dir>/config.toml` without applying defaults.
///
/// A missing file is `Ok(None)`; unreadable or malformed TOML is an error.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let content = match fs::read_to_string(dir.join("config.toml")) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(toml::from_str(&content)?))
}

/// Build the final [`AlterConfig`] from the stock table and an optional user table.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<AlterConfig, ConfigError> {
    let merged = match overlay {
        Some(user) => merge_toml(base, user),
        None => base,
    };
    let config: AlterConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// The config for a run: stock defaults, then `<dir>/config.toml` if present.
///
/// Typos in key names and out-of-range values are errors.
pub fn load_config(dir: &Path) -> Result<AlterConfig, ConfigError> {
    resolve_config(stock_defaults_value()?, load_raw_config(dir)?)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Image Alter Configuration
# =========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# The file is read from the directory given by --config-dir (default ".").
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Directory results are written into. Created when missing.
# Overridden by --output-dir.
dir = "image-alter-out"

# Encode quality used when a request doesn't give one (0 = worst, 100 = best).
# JPEG and AVIF use it directly; PNG maps it onto compression effort;
# GIF, WebP, TIFF and BMP ignore it.
quality = 75

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# tracing filter directive, e.g. "debug" or "image_alter=debug,warn".
# RUST_LOG takes precedence when set.
level = "info"

# "pretty" for humans, "json" for log collectors. Logs go to stderr.
format = "pretty"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum number of requests processed in parallel by `run`.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = AlterConfig::default();
        assert_eq!(config.output.dir, "image-alter-out");
        assert_eq!(config.output.quality, 75);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[output]
quality = 90
"#;
        let config: AlterConfig = toml::from_str(toml).unwrap();
        // Overridden value
        assert_eq!(config.output.quality, 90);
        // Default values preserved
        assert_eq!(config.output.dir, "image-alter-out");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn parse_logging_format() {
        let toml = r#"
[logging]
format = "json"
"#;
        let config: AlterConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn unknown_logging_format_rejected() {
        let toml = r#"
[logging]
format = "xml"
"#;
        let result: Result<AlterConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.output.quality, 75);
        assert_eq!(config.output.dir, "image-alter-out");
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[output]
dir = "results"

[logging]
level = "image_alter=debug"
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.output.dir, "results");
        assert_eq!(config.logging.level, "image_alter=debug");
        // Unspecified values should be defaults
        assert_eq!(config.output.quality, 75);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "this is not valid toml [[[").unwrap();

        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // effective_threads
    // =========================================================================

    fn cores() -> usize {
        std::thread::available_parallelism().map_or(1, |n| n.get())
    }

    #[test]
    fn threads_default_to_every_core() {
        let processing = ProcessingConfig { max_processes: None };
        assert_eq!(effective_threads(&processing), cores());
    }

    #[test]
    fn threads_never_exceed_cores() {
        let processing = ProcessingConfig {
            max_processes: Some(4096),
        };
        assert_eq!(effective_threads(&processing), cores());
    }

    #[test]
    fn threads_can_be_limited_to_one() {
        let processing = ProcessingConfig {
            max_processes: Some(1),
        };
        assert_eq!(effective_threads(&processing), 1);
    }

    // =========================================================================
    // merge_toml
    // =========================================================================

    fn table(text: &str) -> toml::Value {
        toml::from_str(text).unwrap()
    }

    #[test]
    fn overlay_scalar_wins() {
        let merged = merge_toml(table("quality = 75"), table("quality = 40"));
        assert_eq!(merged["quality"].as_integer(), Some(40));
    }

    #[test]
    fn sections_merge_per_key() {
        let base = table("[output]\ndir = \"renders\"\nquality = 75\n");
        let merged = merge_toml(base, table("[output]\nquality = 40\n"));
        assert_eq!(merged["output"]["quality"].as_integer(), Some(40));
        assert_eq!(merged["output"]["dir"].as_str(), Some("renders"));
    }

    #[test]
    fn keys_missing_from_overlay_survive() {
        let base = table("[logging]\nlevel = \"info\"\nformat = \"pretty\"\n");
        let merged = merge_toml(base, table("[logging]\nformat = \"json\"\n"));
        assert_eq!(merged["logging"]["level"].as_str(), Some("info"));
        assert_eq!(merged["logging"]["format"].as_str(), Some("json"));
    }

    #[test]
    fn missing_config_file_is_none() {
        let tmp = TempDir::new().unwrap();
        assert!(load_raw_config(tmp.path()).unwrap().is_none());
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let toml_str = r#"
[output]
qualty = 90
"#;
        let result: Result<AlterConfig, _> = toml::from_str(toml_str);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("unknown field"));
    }

    #[test]
    fn unknown_section_rejected() {
        let toml_str = r#"
[outputs]
quality = 90
"#;
        let result: Result<AlterConfig, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[logging]
colour = true
"#,
        )
        .unwrap();
        assert!(load_config(tmp.path()).is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(AlterConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_quality_boundary_ok() {
        let mut config = AlterConfig::default();
        config.output.quality = 100;
        assert!(config.validate().is_ok());
        config.output.quality = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_quality_too_high() {
        let mut config = AlterConfig::default();
        config.output.quality = 101;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_empty_output_dir() {
        let mut config = AlterConfig::default();
        config.output.dir = "  ".into();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_bad_log_level() {
        let mut config = AlterConfig::default();
        config.logging.level = "image_alter=loudest".into();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("logging.level"));
    }

    #[test]
    fn validate_zero_processes() {
        let mut config = AlterConfig::default();
        config.processing.max_processes = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
[output]
quality = 200
"#,
        )
        .unwrap();
        let result = load_config(tmp.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn resolve_config_with_overlay() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[processing]
max_processes = 2
"#,
        )
        .unwrap();
        let config = resolve_config(base, Some(overlay)).unwrap();
        assert_eq!(config.processing.max_processes, Some(2));
        assert_eq!(config.output.quality, 75);
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: AlterConfig = toml::from_str(stock_config_toml()).unwrap();
        let defaults = AlterConfig::default();
        assert_eq!(config.output.dir, defaults.output.dir);
        assert_eq!(config.output.quality, defaults.output.quality);
        assert_eq!(config.logging.level, defaults.logging.level);
        assert_eq!(config.logging.format, defaults.logging.format);
        assert_eq!(config.processing.max_processes, None);
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        assert!(content.contains("[output]"));
        assert!(content.contains("[logging]"));
        assert!(content.contains("[processing]"));
    }

    #[test]
    fn stock_defaults_value_has_all_sections() {
        let val = stock_defaults_value().unwrap();
        assert!(val.is_table());
        assert!(val.get("output").is_some());
        assert!(val.get("logging").is_some());
        assert!(val.get("processing").is_some());
    }
}
