//! File-based config discovery
//!
//! Handles finding knighted-css configuration in a project root and layering
//! it with defaults and environment overrides.

use std::fs;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format as _, Serialized, Toml};
use serde_json::Value;

use crate::config::KnightedCssConfig;
use crate::error::{ConfigError, Result};

/// Name of the dedicated TOML config file.
pub const CONFIG_FILE_NAME: &str = "knighted-css.toml";

/// `package.json` field holding inline configuration.
pub const PACKAGE_JSON_FIELD: &str = "knightedCss";

/// Prefix for environment overrides, e.g. `KNIGHTED_CSS_LIGHTNINGCSS__MINIFY=true`.
pub const ENV_PREFIX: &str = "KNIGHTED_CSS_";

/// Searches a project root for knighted-css configuration.
///
/// # Example
///
/// ```no_run
/// use knighted_css_config::ConfigDiscovery;
///
/// let config = ConfigDiscovery::new(".").load().unwrap();
/// ```
pub struct ConfigDiscovery {
    root: PathBuf,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Find a config source in the root directory
    ///
    /// Searches in this order:
    /// 1. `knighted-css.toml`
    /// 2. `package.json` with a `knightedCss` field
    pub fn find(&self) -> Option<PathBuf> {
        let toml_path = self.root.join(CONFIG_FILE_NAME);
        if toml_path.is_file() {
            return Some(toml_path);
        }

        let pkg_path = self.root.join("package.json");
        if let Ok(content) = fs::read_to_string(&pkg_path) {
            if let Ok(parsed) = serde_json::from_str::<Value>(&content) {
                if parsed
                    .get(PACKAGE_JSON_FIELD)
                    .is_some_and(|field| !field.is_null())
                {
                    return Some(pkg_path);
                }
            }
        }

        None
    }

    /// Load config from the discovered source layered with env overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if no config source exists.
    pub fn load(&self) -> Result<KnightedCssConfig> {
        let path = self.find().ok_or(ConfigError::NotFound)?;
        self.figment_for(Some(&path))?
            .extract()
            .map_err(ConfigError::from)
    }

    /// Load config, falling back to defaults (plus env) when nothing is found.
    pub fn load_or_default(&self) -> Result<KnightedCssConfig> {
        let path = self.find();
        if path.is_none() {
            tracing::debug!(root = %self.root.display(), "no knighted-css config found, using defaults");
        }
        self.figment_for(path.as_deref())?
            .extract()
            .map_err(ConfigError::from)
    }

    /// Layered figment: defaults < config source < environment.
    fn figment_for(&self, path: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(KnightedCssConfig::default()));

        if let Some(path) = path {
            tracing::debug!(config = %path.display(), "loading knighted-css config");
            if path.file_name() == Some(std::ffi::OsStr::new("package.json")) {
                figment = figment.merge(Serialized::defaults(self.package_json_value(path)?));
            } else {
                figment = figment.merge(Toml::file(path));
            }
        }

        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    fn package_json_value(&self, path: &Path) -> Result<Value> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let parsed: Value =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidValue {
                field: "package.json".to_string(),
                hint: Some(format!("Invalid JSON: {e}")),
            })?;

        match parsed.get(PACKAGE_JSON_FIELD) {
            Some(value) if !value.is_null() => Ok(value.clone()),
            _ => Err(ConfigError::InvalidValue {
                field: PACKAGE_JSON_FIELD.to_string(),
                hint: Some("Add a 'knightedCss' field to your package.json".to_string()),
            }),
        }
    }
}

/// Discover and load config from the current directory, falling back to defaults.
pub fn discover() -> Result<KnightedCssConfig> {
    let root = std::env::current_dir()?;
    ConfigDiscovery::new(&root).load_or_default()
}
