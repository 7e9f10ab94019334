//! Configuration system for xmlquill.
//!
//! This module provides the configuration structure for xmlquill with sensible defaults
//! and support for serialization/deserialization via serde. Configuration is loaded
//! from a TOML file and merged with command-line arguments.
//!
//! # Example
//!
//! ```
//! use xmlquill::config::Config;
//!
//! // Use default configuration
//! let config = Config::default();
//! assert_eq!(config.output_format, "json");
//! assert!(config.trim_text);
//!
//! // Create custom configuration
//! let custom = Config {
//!     output_format: "yaml".to_string(),
//!     pretty: false,
//!     ..Config::default()
//! };
//! assert!(!custom.pretty);
//! ```

use serde::{Deserialize, Serialize};

/// Configuration for the xmlquill command.
///
/// # Fields
///
/// * `output_format` - How extracted records are printed: "json" or "yaml" (default: "json")
/// * `pretty` - Pretty-print JSON output (default: true)
/// * `trim_text` - Drop whitespace around XML text nodes (default: true)
/// * `log_level` - Log filter used when `RUST_LOG` is not set (default: "warn")
/// * `ignore` - Evaluate every field but emit nothing (default: false)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Output format: "json" or "yaml"
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Pretty-print JSON output
    #[serde(default = "default_pretty")]
    pub pretty: bool,

    /// Drop whitespace around text nodes when reading XML
    #[serde(default = "default_trim_text")]
    pub trim_text: bool,

    /// Log filter directive, e.g. "warn" or "xmlquill=debug"
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Evaluate every field but emit no keys
    #[serde(default)]
    pub ignore: bool,
}

/// Returns the default output format.
fn default_output_format() -> String {
    "json".to_string()
}

fn default_pretty() -> bool {
    true
}

fn default_trim_text() -> bool {
    true
}

/// Returns the default log filter.
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Config {
    /// Creates a new configuration with default values.
    ///
    /// ```
    /// use xmlquill::config::Config;
    ///
    /// let config = Config::default();
    /// assert_eq!(config.log_level, "warn");
    /// assert!(!config.ignore);
    /// ```
    fn default() -> Self {
        Self {
            output_format: default_output_format(),
            pretty: default_pretty(),
            trim_text: default_trim_text(),
            log_level: default_log_level(),
            ignore: false,
        }
    }
}

impl Config {
    /// Returns the path to the config file.
    ///
    /// Uses `~/.config/xmlquill/config.toml` on all platforms.
    pub fn config_path() -> Option<std::path::PathBuf> {
        dirs::home_dir().map(|mut path| {
            path.push(".config");
            path.push("xmlquill");
            path.push("config.toml");
            path
        })
    }

    /// Loads configuration from the default config file.
    ///
    /// Returns the default configuration if the file doesn't exist or can't be read.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Self::default(),
        }
    }

    /// Loads configuration from `path`, falling back to defaults.
    ///
    /// # Arguments
    ///
    /// * `path` - The TOML file to read
    ///
    /// # Returns
    ///
    /// The parsed configuration. Missing fields take their defaults. A
    /// missing or unreadable file yields `Config::default()`, and so does
    /// invalid TOML, which is also logged as a warning.
    pub fn load_from(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|err| {
                tracing::warn!(path = %path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Saves configuration to the default config file.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        self.save_to(&config_path)
    }

    /// Saves configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The parent directory can't be created
    /// - Serializing to TOML fails
    /// - Writing the file fails
    pub fn save_to(&self, path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Returns true if output should be YAML rather than JSON.
    pub fn wants_yaml(&self) -> bool {
        self.output_format.eq_ignore_ascii_case("yaml")
            || self.output_format.eq_ignore_ascii_case("yml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_text_default() {
        let config = Config::default();
        assert!(config.trim_text); // indentation is not element text
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("output_format = \"yaml\"").unwrap();
        assert!(config.wants_yaml());
        assert!(config.pretty);
        assert_eq!(config.log_level, "warn");
    }
}
