//! Per-dialect compiler dispatch.
//!
//! The dialect of a file is decided by its name alone. Native CSS is read as
//! is, Sass and Less go through peer compilers, and CSS-in-TS modules are
//! evaluated statically.

pub mod less;
pub mod peer;
pub mod sass;
pub mod vanilla;

use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{CssError, Result};
use peer::{PeerExports, PeerModule, PeerResolver, SassSyntax};

/// Suffixes that mark a CSS-in-TS module.
const VANILLA_SUFFIXES: &[&str] = &[
    ".css.ts", ".css.tsx", ".css.mts", ".css.cts", ".css.js", ".css.jsx", ".css.mjs", ".css.cjs",
];

/// Style-authoring syntax of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Css,
    Scss,
    /// Indented Sass syntax.
    Sass,
    Less,
    /// CSS-in-TS (`*.css.ts` and friends).
    Vanilla,
}

impl Dialect {
    /// Detect the dialect from a file name. `None` for non-style files.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if is_vanilla_name(name) {
            return Some(Dialect::Vanilla);
        }
        match path.extension()?.to_str()? {
            "css" => Some(Dialect::Css),
            "scss" => Some(Dialect::Scss),
            "sass" => Some(Dialect::Sass),
            "less" => Some(Dialect::Less),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::Css => "css",
            Dialect::Scss => "scss",
            Dialect::Sass => "sass",
            Dialect::Less => "less",
            Dialect::Vanilla => "vanilla",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a file name (or request path) carries a CSS-in-TS suffix.
pub fn is_vanilla_name(name: &str) -> bool {
    VANILLA_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// CSS produced for one file, plus any extra files the compiler read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledStyle {
    pub css: String,
    pub loaded: Vec<PathBuf>,
}

impl CompiledStyle {
    pub fn from_css(css: String) -> Self {
        Self {
            css,
            loaded: Vec::new(),
        }
    }
}

/// Compile one style file to CSS text.
pub async fn compile_file(
    path: &Path,
    dialect: Dialect,
    cwd: &Path,
    peers: &dyn PeerResolver,
) -> Result<CompiledStyle> {
    match dialect {
        Dialect::Css => {
            let css = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| CssError::read(path, e))?;
            Ok(CompiledStyle::from_css(css))
        }
        Dialect::Scss => sass::compile(path, cwd, SassSyntax::Scss, peers).await,
        Dialect::Sass => sass::compile(path, cwd, SassSyntax::Indented, peers).await,
        Dialect::Less => less::compile(path, cwd, peers).await,
        Dialect::Vanilla => vanilla::evaluate_file(path, cwd).await,
    }
}

/// Peers available without any configuration.
///
/// `sass` is served by the bundled `grass` compiler; `less` requires a
/// `lessc` executable in `node_modules/.bin` or on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct DefaultPeerResolver;

#[async_trait]
impl PeerResolver for DefaultPeerResolver {
    async fn resolve(&self, name: &str, cwd: &Path) -> Option<PeerModule> {
        match name {
            "sass" => Some(PeerModule::from_namespace(
                PeerExports::default().with_compile_async(Arc::new(sass::GrassSass)),
            )),
            "less" => {
                let lessc = less::LesscRender::locate(cwd).await;
                if lessc.is_none() {
                    tracing::debug!("lessc not found in node_modules/.bin or PATH");
                }
                lessc.map(|render| {
                    PeerModule::from_namespace(
                        PeerExports::default().with_less_render(Arc::new(render)),
                    )
                })
            }
            _ => None,
        }
    }
}
