//! Peer compiler contracts.
//!
//! Sass and Less are compiled by peers that are resolved by name at call time.
//! A peer module mirrors the shape of an npm package: an optional `default`
//! export and the module namespace, either of which may carry the compile
//! entry points.

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Error reported by a peer compiler. Displays the peer's message unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerError {
    pub message: String,
}

impl PeerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for PeerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for PeerError {}

/// Sass input syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SassSyntax {
    Scss,
    /// The indented `.sass` syntax.
    Indented,
}

#[derive(Debug, Clone)]
pub struct SassCompileOptions {
    pub load_paths: Vec<PathBuf>,
    pub syntax: SassSyntax,
}

#[derive(Debug, Clone, Default)]
pub struct SassCompileResult {
    pub css: String,
    /// Every file the compiler read, including the entry.
    pub loaded_urls: Vec<PathBuf>,
}

/// Modern Sass API: `compileAsync(path, options)`.
#[async_trait]
pub trait SassCompileAsync: Send + Sync {
    async fn compile_async(
        &self,
        path: &Path,
        options: SassCompileOptions,
    ) -> Result<SassCompileResult, PeerError>;
}

#[derive(Debug, Clone)]
pub struct LegacyRenderOptions {
    pub file: PathBuf,
    pub include_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct LegacyRenderResult {
    pub css: Vec<u8>,
}

/// Node-style `(error, result)` completion callback.
pub type LegacyCallback = Box<dyn FnOnce(Result<Option<LegacyRenderResult>, PeerError>) + Send>;

/// Legacy Sass API: `render(options, callback)`.
///
/// Implementations may invoke the callback synchronously or from another
/// thread. Dropping it without a call is reported as a failure.
pub trait SassLegacyRender: Send + Sync {
    fn render(&self, options: LegacyRenderOptions, callback: LegacyCallback);
}

#[derive(Debug, Clone)]
pub struct LessRenderOptions {
    pub filename: PathBuf,
    pub paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct LessRenderOutput {
    pub css: String,
    /// Files pulled in through `@import`.
    pub imports: Vec<PathBuf>,
}

/// Less API: `render(source, options)`.
#[async_trait]
pub trait LessRender: Send + Sync {
    async fn render(
        &self,
        source: &str,
        options: LessRenderOptions,
    ) -> Result<LessRenderOutput, PeerError>;
}

/// Entry points exposed by one export object of a peer module.
#[derive(Clone, Default)]
pub struct PeerExports {
    pub compile_async: Option<Arc<dyn SassCompileAsync>>,
    pub render: Option<Arc<dyn SassLegacyRender>>,
    pub less_render: Option<Arc<dyn LessRender>>,
}

impl PeerExports {
    pub fn is_empty(&self) -> bool {
        self.compile_async.is_none() && self.render.is_none() && self.less_render.is_none()
    }

    pub fn with_compile_async(mut self, compile: Arc<dyn SassCompileAsync>) -> Self {
        self.compile_async = Some(compile);
        self
    }

    pub fn with_render(mut self, render: Arc<dyn SassLegacyRender>) -> Self {
        self.render = Some(render);
        self
    }

    pub fn with_less_render(mut self, render: Arc<dyn LessRender>) -> Self {
        self.less_render = Some(render);
        self
    }
}

impl fmt::Debug for PeerExports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerExports")
            .field("compile_async", &self.compile_async.is_some())
            .field("render", &self.render.is_some())
            .field("less_render", &self.less_render.is_some())
            .finish()
    }
}

/// A resolved peer package.
#[derive(Debug, Clone, Default)]
pub struct PeerModule {
    pub default: Option<PeerExports>,
    pub namespace: PeerExports,
}

impl PeerModule {
    pub fn from_namespace(namespace: PeerExports) -> Self {
        Self {
            default: None,
            namespace,
        }
    }

    pub fn from_default(default: PeerExports) -> Self {
        Self {
            default: Some(default),
            namespace: PeerExports::default(),
        }
    }

    /// The export object to inspect: a non-empty `default`, else the namespace.
    pub fn exports(&self) -> &PeerExports {
        match &self.default {
            Some(default) if !default.is_empty() => default,
            _ => &self.namespace,
        }
    }
}

/// Resolves peer compiler packages by name (`"sass"`, `"less"`).
#[async_trait]
pub trait PeerResolver: Send + Sync {
    /// Returns `None` when the peer is not installed.
    async fn resolve(&self, name: &str, cwd: &Path) -> Option<PeerModule>;
}

/// Capability detected once per peer resolution.
#[derive(Clone)]
pub enum SassApi {
    Modern(Arc<dyn SassCompileAsync>),
    Legacy(Arc<dyn SassLegacyRender>),
    Unsupported,
}

impl SassApi {
    pub fn detect(module: &PeerModule) -> Self {
        let exports = module.exports();
        if let Some(compile) = &exports.compile_async {
            SassApi::Modern(Arc::clone(compile))
        } else if let Some(render) = &exports.render {
            SassApi::Legacy(Arc::clone(render))
        } else {
            SassApi::Unsupported
        }
    }
}

impl fmt::Debug for SassApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SassApi::Modern(_) => "Modern",
            SassApi::Legacy(_) => "Legacy",
            SassApi::Unsupported => "Unsupported",
        })
    }
}
