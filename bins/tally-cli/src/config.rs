//! CLI configuration.
//!
//! Sources, later overriding earlier:
//! 1. built-in defaults
//! 2. `tally.toml` in the user config directory, or the file given with
//!    `--config` (which must then exist)
//! 3. `TALLY_*` environment variables, e.g. `TALLY_LOG_LEVEL=debug`
//! 4. command-line flags, applied by the caller

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "TALLY";

/// Default config file name inside the `tally` config directory.
pub const CONFIG_FILE_NAME: &str = "tally.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    /// Rate book JSON (one book or an array of versions). Built-in rates
    /// are used when unset.
    pub rates_path: Option<PathBuf>,
    /// Log level filter string (e.g. "info", "tally_engine=debug").
    pub log_level: String,
    /// "text" or "json".
    pub log_format: String,
    /// Round money in printed output to cents.
    pub round_output: bool,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            rates_path: None,
            log_level: "warn".to_string(),
            log_format: "text".to_string(),
            round_output: true,
        }
    }
}

impl TallyConfig {
    /// `<config dir>/tally/tally.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("tally").join(CONFIG_FILE_NAME))
    }

    /// Load defaults, then the config file, then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ::config::ConfigError> {
        use ::config::{Config, Environment, File};

        let mut builder = Config::builder();
        match path {
            Some(path) => builder = builder.add_source(File::from(path).required(true)),
            None => {
                if let Some(default) = Self::default_path() {
                    builder = builder.add_source(File::from(default).required(false));
                }
            }
        }

        builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()
    }
}
