//! Dependency graph walk.
//!
//! Depth-first traversal from the entry following static imports in source
//! order. Each style file contributes its CSS the first time it is reached,
//! so concatenation order matches cascade order.

pub mod imports;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dialect::peer::PeerResolver;
use crate::dialect::{self, CompiledStyle, Dialect};
use crate::error::{CssError, Result};
use crate::options::{CssOptions, LightningOptions};
use crate::postprocess;
use crate::resolver::{Resolution, Resolver, SpecifierKind, classify};

pub use imports::{scan_imports, source_type_for};

const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// Result of [`css_with_meta`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CssWithMeta {
    pub css: String,
    /// Every visited file plus files peers reported loading, in first-visit order.
    pub files: IndexSet<PathBuf>,
    /// CSS Modules class map when CSS Modules extraction ran.
    pub modules: Option<IndexMap<String, String>>,
}

/// Per-invocation memo of visited files.
///
/// A key is present once the file has been visited; the value is the CSS it
/// contributed. Lives for exactly one [`css_with_meta`] call.
#[derive(Debug, Default)]
pub struct CompileCache {
    entries: FxHashMap<PathBuf, Option<String>>,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.entries.get(path).and_then(|css| css.as_deref())
    }

    fn mark(&mut self, path: &Path) {
        self.entries.insert(path.to_path_buf(), None);
    }

    fn store(&mut self, path: &Path, css: String) {
        self.entries.insert(path.to_path_buf(), Some(css));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Kind of file reached by the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Style(Dialect),
    Script,
    Other,
}

fn file_kind(path: &Path) -> FileKind {
    if let Some(dialect) = Dialect::from_path(path) {
        return FileKind::Style(dialect);
    }
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if SCRIPT_EXTENSIONS.contains(&ext) => FileKind::Script,
        _ => FileKind::Other,
    }
}

fn in_node_modules(path: &Path) -> bool {
    path.components()
        .any(|c| c.as_os_str() == std::ffi::OsStr::new("node_modules"))
}

enum Frame {
    Visit(PathBuf),
    /// Contribute a CSS-in-TS module's own CSS after its imports.
    EmitVanilla(PathBuf),
}

/// Traversal state for one extraction.
struct Traversal<'a> {
    options: &'a CssOptions,
    resolver: Arc<dyn Resolver>,
    peers: Arc<dyn PeerResolver>,
    cache: CompileCache,
    files: IndexSet<PathBuf>,
    chunks: Vec<String>,
}

impl<'a> Traversal<'a> {
    fn new(options: &'a CssOptions) -> Self {
        Self {
            options,
            resolver: options.resolver_or_default(),
            peers: options.peers_or_default(),
            cache: CompileCache::new(),
            files: IndexSet::new(),
            chunks: Vec::new(),
        }
    }

    async fn resolve_entry(&self, entry: &str) -> Result<PathBuf> {
        let cwd = &self.options.cwd;
        match self.resolver.resolve(entry, cwd, cwd).await {
            Resolution::Found(path) => return Ok(path_clean::clean(&path)),
            Resolution::External if classify(entry) == SpecifierKind::Bare => {
                // `src/index.ts` names a file under cwd, not a package.
                let local = format!("./{entry}");
                if let Resolution::Found(path) = self.resolver.resolve(&local, cwd, cwd).await {
                    return Ok(path_clean::clean(&path));
                }
            }
            _ => {}
        }
        Err(CssError::UnresolvedEntry {
            entry: entry.to_string(),
            cwd: cwd.clone(),
        })
    }

    async fn walk(&mut self, entry: PathBuf) -> Result<()> {
        let mut stack = vec![Frame::Visit(entry.clone())];

        while let Some(frame) = stack.pop() {
            let path = match frame {
                Frame::Visit(path) => path,
                Frame::EmitVanilla(path) => {
                    self.contribute(&path, Dialect::Vanilla).await?;
                    continue;
                }
            };

            if self.cache.contains(&path) {
                continue;
            }

            let kind = file_kind(&path);
            match kind {
                FileKind::Other => {
                    tracing::debug!(path = %path.display(), "ignoring non-style, non-script import");
                    self.cache.mark(&path);
                    continue;
                }
                FileKind::Script if path != entry && in_node_modules(&path) => {
                    tracing::debug!(path = %path.display(), "not walking into node_modules script");
                    self.cache.mark(&path);
                    continue;
                }
                _ => {}
            }

            self.cache.mark(&path);
            self.files.insert(path.clone());

            match kind {
                FileKind::Style(Dialect::Vanilla) => {
                    let children = self.imports_of(&path).await?;
                    stack.push(Frame::EmitVanilla(path));
                    stack.extend(children.into_iter().rev().map(Frame::Visit));
                }
                FileKind::Style(dialect) => self.contribute(&path, dialect).await?,
                FileKind::Script => {
                    let children = self.imports_of(&path).await?;
                    stack.extend(children.into_iter().rev().map(Frame::Visit));
                }
                FileKind::Other => {}
            }
        }
        Ok(())
    }

    /// Resolve a module's static imports, dropping externals.
    async fn imports_of(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CssError::read(path, e))?;
        let specifiers = imports::scan_imports(&source, path)?;

        let mut resolved = Vec::with_capacity(specifiers.len());
        for specifier in specifiers {
            match self
                .resolver
                .resolve(&specifier, path, &self.options.cwd)
                .await
            {
                Resolution::Found(found) => {
                    tracing::debug!(specifier, resolved = %found.display(), "resolved import");
                    resolved.push(path_clean::clean(&found));
                }
                Resolution::External => {
                    tracing::debug!(specifier, importer = %path.display(), "skipping external import");
                }
                Resolution::NotFound => {
                    return Err(CssError::UnresolvedImport {
                        specifier,
                        importer: path.to_path_buf(),
                    });
                }
            }
        }
        Ok(resolved)
    }

    async fn contribute(&mut self, path: &Path, dialect: Dialect) -> Result<()> {
        if !self.options.includes(path) {
            tracing::debug!(path = %path.display(), "filtered out");
            return Ok(());
        }

        let CompiledStyle { css, loaded } =
            dialect::compile_file(path, dialect, &self.options.cwd, self.peers.as_ref()).await?;
        tracing::debug!(path = %path.display(), %dialect, bytes = css.len(), "compiled");

        for file in loaded {
            self.files.insert(path_clean::clean(&file));
        }
        if !css.is_empty() {
            self.chunks.push(css.clone());
        }
        self.cache.store(path, css);
        Ok(())
    }
}

/// Extract the CSS reachable from `entry`.
pub async fn css(entry: &str, options: &CssOptions) -> Result<String> {
    Ok(css_with_meta(entry, options).await?.css)
}

/// Extract the CSS reachable from `entry`, with the files visited and the
/// CSS Modules map.
///
/// # Errors
///
/// Fails when the entry or a relative/absolute import cannot be resolved, a
/// peer compiler is missing or fails, or the lightningcss pass rejects the
/// concatenated stylesheet.
pub async fn css_with_meta(entry: &str, options: &CssOptions) -> Result<CssWithMeta> {
    let mut traversal = Traversal::new(options);
    let entry_path = traversal.resolve_entry(entry).await?;
    traversal.walk(entry_path).await?;

    let visited = traversal.cache.len();
    let mut css = traversal.chunks.join("\n");
    let mut modules = None;

    if options.needs_postprocess() {
        let default_lightning = LightningOptions::default();
        let lightning = options.lightningcss.as_ref().unwrap_or(&default_lightning);
        let processed = postprocess::process(
            &css,
            lightning,
            &options.auto_stable,
            options.specificity_boost.as_ref(),
        )?;
        css = processed.css;
        modules = processed.modules;
    }

    tracing::info!(
        entry,
        files = traversal.files.len(),
        visited,
        bytes = css.len(),
        "extracted css"
    );

    Ok(CssWithMeta {
        css,
        files: traversal.files,
        modules,
    })
}
