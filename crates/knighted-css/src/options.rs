//! Options for [`crate::css`] and [`crate::css_with_meta`].

use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use knighted_css_config::KnightedCssConfig;

use crate::boost::SpecificityBoost;
use crate::dialect::DefaultPeerResolver;
use crate::dialect::peer::PeerResolver;
use crate::error::{CssError, Result};
use crate::resolver::{ModuleResolver, Resolver, TsconfigMode};
use crate::stable::{AutoStableOption, SelectorTransform, TransformPipeline};

/// Decides whether a visited file contributes CSS.
pub type FileFilter = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// lightningcss post-processing applied to the concatenated stylesheet.
#[derive(Debug, Clone, Default)]
pub struct LightningOptions {
    pub minify: bool,
    /// Hash class names and report the CSS Modules export map.
    pub css_modules: bool,
    /// Caller selector transforms, run before boost and auto-stable.
    pub transforms: TransformPipeline,
}

impl LightningOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_minify(mut self, minify: bool) -> Self {
        self.minify = minify;
        self
    }

    pub fn with_css_modules(mut self, css_modules: bool) -> Self {
        self.css_modules = css_modules;
        self
    }

    pub fn with_transform(mut self, transform: Arc<dyn SelectorTransform>) -> Self {
        self.transforms.push(transform);
        self
    }
}

/// Options for one extraction.
#[derive(Clone)]
pub struct CssOptions {
    /// Directory the entry is resolved against.
    pub cwd: PathBuf,
    pub filter: Option<FileFilter>,
    /// Replaces the default [`ModuleResolver`].
    pub resolver: Option<Arc<dyn Resolver>>,
    /// Replaces the default [`DefaultPeerResolver`].
    pub peers: Option<Arc<dyn PeerResolver>>,
    pub auto_stable: AutoStableOption,
    /// `None` skips post-processing unless auto-stable or a boost needs it.
    pub lightningcss: Option<LightningOptions>,
    pub specificity_boost: Option<SpecificityBoost>,
    /// Resolution extensions. Empty means the resolver defaults.
    pub extensions: Vec<String>,
    pub tsconfig: TsconfigMode,
}

impl Default for CssOptions {
    fn default() -> Self {
        Self::new(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

impl fmt::Debug for CssOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CssOptions")
            .field("cwd", &self.cwd)
            .field("filter", &self.filter.is_some())
            .field("resolver", &self.resolver.is_some())
            .field("peers", &self.peers.is_some())
            .field("auto_stable", &self.auto_stable)
            .field("lightningcss", &self.lightningcss)
            .field("specificity_boost", &self.specificity_boost)
            .field("extensions", &self.extensions)
            .field("tsconfig", &self.tsconfig)
            .finish()
    }
}

impl CssOptions {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            filter: None,
            resolver: None,
            peers: None,
            auto_stable: AutoStableOption::Disabled,
            lightningcss: None,
            specificity_boost: None,
            extensions: Vec::new(),
            tsconfig: TsconfigMode::Off,
        }
    }

    pub fn with_filter(mut self, filter: impl Fn(&Path) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn Resolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_peers(mut self, peers: Arc<dyn PeerResolver>) -> Self {
        self.peers = Some(peers);
        self
    }

    pub fn with_auto_stable(mut self, auto_stable: AutoStableOption) -> Self {
        self.auto_stable = auto_stable;
        self
    }

    pub fn with_lightningcss(mut self, lightningcss: LightningOptions) -> Self {
        self.lightningcss = Some(lightningcss);
        self
    }

    pub fn with_specificity_boost(mut self, boost: SpecificityBoost) -> Self {
        self.specificity_boost = Some(boost);
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_tsconfig(mut self, tsconfig: TsconfigMode) -> Self {
        self.tsconfig = tsconfig;
        self
    }

    /// Whether the lightningcss pass runs. Selector rewriting forces it on.
    pub fn needs_postprocess(&self) -> bool {
        self.lightningcss.is_some()
            || self.auto_stable.is_enabled()
            || self.specificity_boost.is_some()
    }

    /// Whether the file contributes CSS.
    pub fn includes(&self, path: &Path) -> bool {
        self.filter.as_ref().is_none_or(|filter| filter(path))
    }

    pub(crate) fn resolver_or_default(&self) -> Arc<dyn Resolver> {
        match &self.resolver {
            Some(resolver) => Arc::clone(resolver),
            None => Arc::new(ModuleResolver::new(
                &self.extensions,
                &self.tsconfig,
                &self.cwd,
            )),
        }
    }

    pub(crate) fn peers_or_default(&self) -> Arc<dyn PeerResolver> {
        match &self.peers {
            Some(peers) => Arc::clone(peers),
            None => Arc::new(DefaultPeerResolver),
        }
    }

    /// Build options from a loaded configuration file.
    pub fn from_config(config: &KnightedCssConfig) -> Result<Self> {
        let cwd = match &config.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        let mut options = Self::new(cwd)
            .with_extensions(config.extensions.clone())
            .with_tsconfig(config.tsconfig.clone());

        let stable = &config.auto_stable;
        if stable.enabled {
            options.auto_stable = AutoStableOption::Custom {
                namespace: stable.namespace.clone(),
                include: stable.include.as_deref().map(compile).transpose()?,
                exclude: stable.exclude.as_deref().map(compile).transpose()?,
            };
        }

        let lightning = &config.lightningcss;
        if lightning.enabled {
            options.lightningcss = Some(
                LightningOptions::new()
                    .with_minify(lightning.minify)
                    .with_css_modules(lightning.css_modules),
            );
        }

        if let Some(boost) = &config.specificity_boost {
            let mut transform = SpecificityBoost::repeat_class(boost.times);
            for pattern in &boost.patterns {
                transform = transform.with_pattern(compile(pattern)?);
            }
            options.specificity_boost = Some(transform);
        }

        Ok(options)
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(CssError::pattern(pattern))
}
