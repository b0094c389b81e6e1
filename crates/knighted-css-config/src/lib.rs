//! # knighted-css-config
//!
//! Configuration schema and discovery for the knighted-css compiler and loader.

pub mod config;
pub mod discovery;
pub mod error;

pub use config::{
    AutoStableSettings, DEFAULT_EXPORT_NAME, DEFAULT_STABLE_NAMESPACE, KnightedCssConfig,
    LightningSettings, LoaderModeSetting, LoaderSettings, SpecificityBoostSettings,
    TsconfigSetting,
};
pub use discovery::{CONFIG_FILE_NAME, ConfigDiscovery, discover};
pub use error::{ConfigError, Result};
