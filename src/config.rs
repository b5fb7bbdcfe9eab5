//! Tool configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user file overrides just the keys it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [defaults]
//! quality = 100             # Encoder quality (0-100) applied before recipe flags
//! # format = "png"          # Output format override
//!
//! [processing]
//! # max_workers = 4         # Worker threads for deferred saves (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::session::Image;
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

/// Settings loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WandConfig {
    /// Session defaults applied to every image.
    pub defaults: DefaultsConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl WandConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.quality > 100 {
            return Err(ConfigError::Validation(
                "defaults.quality must be 0-100".into(),
            ));
        }
        if self.defaults.format.as_deref() == Some("") {
            return Err(ConfigError::Validation(
                "defaults.format must not be empty".into(),
            ));
        }
        if self.processing.max_workers == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_workers must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Quality and format every session starts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DefaultsConfig {
    pub quality: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            quality: 100,
            format: None,
        }
    }
}

impl DefaultsConfig {
    /// Seed `image` with these defaults.
    pub fn apply_to(&self, image: &Image) {
        image.set_quality(self.quality);
        if let Some(format) = &self.format {
            image.set_format(format);
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of worker threads running deferred tasks.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<usize>,
}

/// Worker threads for the rayon pool: `max_workers` capped at the core count,
/// or every core when unset.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
    match config.max_workers {
        Some(requested) => requested.min(cores),
        None => cores,
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(WandConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read `path` as an untyped TOML table, or `None` when there is no such file.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(toml::from_str(&content)?)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<WandConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: WandConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to stock defaults when it is missing.
pub fn load_config(path: &Path) -> Result<WandConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    let config = resolve_config(base, overlay)?;
    tracing::debug!(path = %path.display(), ?config, "configuration loaded");
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` for the `gen-config` command.
pub fn stock_config_toml() -> &'static str {
    r#"# simple-wand configuration
# =========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

[defaults]
# Encoder quality, 0-100. Applied to every image before any recipe flags.
quality = 100

# Output format override (e.g. "png", "jpeg", "webp"). When unset, the
# format follows the output file extension, then the source format.
# format = "png"

[processing]
# Worker threads for deferred saves. Omit to use every CPU core.
# Larger values are clamped to the core count.
# max_workers = 4
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::codec::tests::MockCodecFactory;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = WandConfig::default();
        assert_eq!(config.defaults.quality, 100);
        assert_eq!(config.defaults.format, None);
        assert_eq!(config.processing.max_workers, None);
    }

    #[test]
    fn parse_partial_config() {
        let config: WandConfig = toml::from_str(
            r#"
[defaults]
format = "webp"
"#,
        )
        .unwrap();
        assert_eq!(config.defaults.format.as_deref(), Some("webp"));
        // Unspecified values keep their defaults
        assert_eq!(config.defaults.quality, 100);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<WandConfig, _> = toml::from_str(
            r#"
[defaults]
qualty = 80
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_quality() {
        let mut config = WandConfig::default();
        config.defaults.quality = 101;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_empty_format() {
        let mut config = WandConfig::default();
        config.defaults.format = Some(String::new());
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_rejects_zero_workers() {
        let mut config = WandConfig::default();
        config.processing.max_workers = Some(0);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_missing_file_is_stock_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(config, WandConfig::default());
    }

    #[test]
    fn load_config_merges_user_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            r#"
[defaults]
quality = 75

[processing]
max_workers = 2
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.defaults.quality, 75);
        assert_eq!(config.defaults.format, None);
        assert_eq!(config.processing.max_workers, Some(2));
    }

    #[test]
    fn user_format_keeps_stock_quality() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[defaults]\nformat = \"jpeg\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.defaults.format.as_deref(), Some("jpeg"));
        assert_eq!(config.defaults.quality, 100);
        assert_eq!(config.processing, ProcessingConfig::default());
    }

    #[test]
    fn max_workers_from_file_caps_threads() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[processing]\nmax_workers = 1\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(effective_threads(&config.processing), 1);
    }

    #[test]
    fn unknown_section_in_file_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[output]\nquality = 80\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn load_config_rejects_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(&path, "[defaults\nquality = 1").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn resolve_config_rejects_invalid_values() {
        let base = stock_defaults_value().unwrap();
        let overlay: toml::Value = toml::from_str(
            r#"
[defaults]
quality = 200
"#,
        )
        .unwrap();
        let result = resolve_config(base, Some(overlay));
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn defaults_seed_an_image() {
        let image = Image::with_codec(MockCodecFactory::new());
        let defaults = DefaultsConfig {
            quality: 42,
            format: Some("png".into()),
        };
        defaults.apply_to(&image);
        assert_eq!(image.quality(), 42);
        assert_eq!(image.target_format().as_deref(), Some("png"));
    }

    // =========================================================================
    // stock config tests
    // =========================================================================

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let config: WandConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, WandConfig::default());
    }

    #[test]
    fn stock_config_toml_contains_all_sections() {
        let content = stock_config_toml();
        assert!(content.contains("[defaults]"));
        assert!(content.contains("[processing]"));
    }
}
