//! Configuration schema for knighted-css.
//!
//! The same structure is read from `knighted-css.toml`, from a `knightedCss`
//! field in `package.json`, and from `KNIGHTED_CSS_*` environment variables.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default namespace used for stable selectors.
pub const DEFAULT_STABLE_NAMESPACE: &str = "knighted";

/// Default export name for the compiled CSS string.
pub const DEFAULT_EXPORT_NAME: &str = "knightedCss";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnightedCssConfig {
    /// Working directory used to resolve entries. Defaults to the process cwd.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    /// Resolution extensions in priority order. Empty means built-in defaults.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// tsconfig path mapping: `"off"`, `"auto"`, or a file/directory path.
    #[serde(default)]
    pub tsconfig: TsconfigSetting,

    #[serde(default)]
    pub auto_stable: AutoStableSettings,

    #[serde(default)]
    pub lightningcss: LightningSettings,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specificity_boost: Option<SpecificityBoostSettings>,

    #[serde(default)]
    pub loader: LoaderSettings,
}

/// How tsconfig `paths` are discovered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TsconfigSetting {
    #[default]
    Off,
    Auto,
    Path(PathBuf),
}

impl TryFrom<String> for TsconfigSetting {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim() {
            "" => Err(ConfigError::InvalidValue {
                field: "tsconfig".to_string(),
                hint: Some("use \"off\", \"auto\", or a path".to_string()),
            }),
            "off" | "false" => Ok(TsconfigSetting::Off),
            "auto" | "true" => Ok(TsconfigSetting::Auto),
            path => Ok(TsconfigSetting::Path(PathBuf::from(path))),
        }
    }
}

impl From<TsconfigSetting> for String {
    fn from(value: TsconfigSetting) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TsconfigSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TsconfigSetting::Off => f.write_str("off"),
            TsconfigSetting::Auto => f.write_str("auto"),
            TsconfigSetting::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Stable selector generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutoStableSettings {
    #[serde(default)]
    pub enabled: bool,

    /// Namespace prefix, `knighted` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Regex a class token must match to be stabilized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,

    /// Regex that excludes a class token from stabilization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
}

/// Post-processing through lightningcss.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightningSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub minify: bool,

    /// Extract CSS Modules class exports.
    #[serde(default)]
    pub css_modules: bool,
}

/// Selector specificity boosting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecificityBoostSettings {
    /// Extra repetitions of the matched class.
    #[serde(default = "default_boost_times")]
    pub times: usize,

    /// Class-token patterns; empty boosts every selector ending in a class.
    #[serde(default, rename = "match")]
    pub patterns: Vec<String>,
}

fn default_boost_times() -> usize {
    1
}

/// Loader-facing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoaderSettings {
    #[serde(default = "default_export_name")]
    pub export_name: String,

    #[serde(default)]
    pub mode: LoaderModeSetting,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            export_name: default_export_name(),
            mode: LoaderModeSetting::default(),
        }
    }
}

fn default_export_name() -> String {
    DEFAULT_EXPORT_NAME.to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoaderModeSetting {
    #[default]
    Standard,
    Bridge,
}

impl KnightedCssConfig {
    /// Build a config from a JSON value (e.g. the `knightedCss` field of `package.json`).
    pub fn from_value(value: serde_json::Value) -> crate::Result<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Effective stable namespace.
    pub fn stable_namespace(&self) -> &str {
        self.auto_stable
            .namespace
            .as_deref()
            .unwrap_or(DEFAULT_STABLE_NAMESPACE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_are_conservative() {
        let config = KnightedCssConfig::default();
        assert!(!config.auto_stable.enabled);
        assert!(!config.lightningcss.enabled);
        assert_eq!(config.tsconfig, TsconfigSetting::Off);
        assert_eq!(config.loader.export_name, "knightedCss");
        assert_eq!(config.stable_namespace(), "knighted");
    }

    #[test]
    fn tsconfig_setting_parses_modes() {
        assert_eq!(
            TsconfigSetting::try_from("auto".to_string()).unwrap(),
            TsconfigSetting::Auto
        );
        assert_eq!(
            TsconfigSetting::try_from("off".to_string()).unwrap(),
            TsconfigSetting::Off
        );
        assert_eq!(
            TsconfigSetting::try_from("./apps/web".to_string()).unwrap(),
            TsconfigSetting::Path(PathBuf::from("./apps/web"))
        );
        assert!(TsconfigSetting::try_from("  ".to_string()).is_err());
    }

    #[test]
    fn from_value_reads_nested_sections() {
        let config = KnightedCssConfig::from_value(json!({
            "auto_stable": { "enabled": true, "namespace": "acme" },
            "specificity_boost": { "match": ["^btn"] },
            "loader": { "mode": "bridge" }
        }))
        .unwrap();

        assert!(config.auto_stable.enabled);
        assert_eq!(config.stable_namespace(), "acme");
        let boost = config.specificity_boost.unwrap();
        assert_eq!(boost.times, 1);
        assert_eq!(boost.patterns, vec!["^btn".to_string()]);
        assert_eq!(config.loader.mode, LoaderModeSetting::Bridge);
        assert_eq!(config.loader.export_name, "knightedCss");
    }
}
