//! Module resolution for the style graph walk.
//!
//! Relative and absolute specifiers are checked directly so the extension
//! order is exact; bare specifiers go through `oxc_resolver`, which applies
//! tsconfig `paths` before `node_modules`, `exports` and `#imports`.

mod specifier;
mod tsconfig;

pub use specifier::{SpecifierKind, classify, split_query};
pub use tsconfig::{locate_tsconfig, tsconfig_options};

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// tsconfig discovery mode: `Off`, `Auto`, or an explicit file/directory.
pub type TsconfigMode = knighted_css_config::TsconfigSetting;

/// Default resolution extensions, in priority order.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".ts", ".tsx", ".mts", ".cts", ".js", ".jsx", ".mjs", ".cjs", ".css", ".scss", ".sass", ".less",
];

/// Script extensions that may name a TypeScript source on disk.
pub const EXTENSION_ALIASES: &[(&str, &[&str])] = &[
    (".js", &[".ts", ".tsx", ".js"]),
    (".jsx", &[".tsx", ".jsx"]),
    (".mjs", &[".mts", ".mjs"]),
    (".cjs", &[".cts", ".cjs"]),
];

/// Outcome of resolving one specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(PathBuf),
    /// Intentionally outside the graph: foreign schemes and uninstalled packages.
    External,
    NotFound,
}

/// Maps specifiers to files. Implementations never fail; they report
/// `NotFound` and let the walker decide.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, specifier: &str, importer: &Path, cwd: &Path) -> Resolution;
}

/// Default resolver.
pub struct ModuleResolver {
    extensions: Vec<String>,
    tsconfig: Option<PathBuf>,
    packages: oxc_resolver::Resolver,
}

impl std::fmt::Debug for ModuleResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleResolver")
            .field("extensions", &self.extensions)
            .field("tsconfig", &self.tsconfig)
            .finish()
    }
}

impl ModuleResolver {
    /// Create a resolver.
    ///
    /// # Arguments
    ///
    /// * `extensions` - Extensions to try, in order. Empty means [`DEFAULT_EXTENSIONS`].
    /// * `tsconfig` - tsconfig path-mapping mode
    /// * `cwd` - Directory tsconfig discovery starts from
    pub fn new(extensions: &[String], tsconfig: &TsconfigMode, cwd: &Path) -> Self {
        let tsconfig = tsconfig_options(tsconfig, cwd);
        let extensions: Vec<String> = if extensions.is_empty() {
            DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
        } else {
            extensions.iter().map(|e| normalize_extension(e)).collect()
        };

        let packages = oxc_resolver::Resolver::new(oxc_resolver::ResolveOptions {
            condition_names: vec![
                "style".into(),
                "import".into(),
                "module".into(),
                "default".into(),
            ],
            extensions: extensions.clone(),
            extension_alias: EXTENSION_ALIASES
                .iter()
                .map(|(from, to)| (from.to_string(), to.iter().map(|t| t.to_string()).collect()))
                .collect(),
            tsconfig: tsconfig.clone().map(oxc_resolver::TsconfigDiscovery::Manual),
            ..Default::default()
        });

        Self {
            extensions,
            tsconfig: tsconfig.map(|options| options.config_file),
            packages,
        }
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Check a candidate path: exact (or aliased) match, then each extension,
    /// then `index.<ext>` for directories. First hit wins.
    async fn try_candidate(&self, candidate: &Path) -> Option<PathBuf> {
        if let Some(ext) = dotted_extension(candidate) {
            if let Some((_, aliases)) = EXTENSION_ALIASES.iter().find(|(from, _)| *from == ext) {
                for alias in *aliases {
                    let aliased = candidate.with_extension(alias.trim_start_matches('.'));
                    if is_file(&aliased).await {
                        return Some(aliased);
                    }
                }
            } else if self.extensions.iter().any(|e| *e == ext) && is_file(candidate).await {
                return Some(candidate.to_path_buf());
            }
        }

        for ext in &self.extensions {
            let with_ext = append_extension(candidate, ext);
            if is_file(&with_ext).await {
                return Some(with_ext);
            }
        }

        if is_dir(candidate).await {
            for ext in &self.extensions {
                let index = candidate.join(format!("index{ext}"));
                if is_file(&index).await {
                    return Some(index);
                }
            }
        }

        // Files with an extension we do not list (e.g. `.json`) still exist.
        if is_file(candidate).await {
            return Some(candidate.to_path_buf());
        }

        None
    }

    async fn resolve_bare(&self, specifier: &str, importer_dir: &Path) -> Resolution {
        match self.packages.resolve(importer_dir, specifier) {
            Ok(resolution) => Resolution::Found(resolution.into_path_buf()),
            Err(err) => {
                tracing::debug!(specifier, error = %err, "treating unresolved bare specifier as external");
                Resolution::External
            }
        }
    }
}

#[async_trait]
impl Resolver for ModuleResolver {
    async fn resolve(&self, specifier: &str, importer: &Path, cwd: &Path) -> Resolution {
        let (path_part, _query) = split_query(specifier);
        if path_part.is_empty() {
            return Resolution::NotFound;
        }

        let importer_dir = if is_dir(importer).await {
            importer
        } else {
            importer.parent().unwrap_or(cwd)
        };

        let candidate = match classify(path_part) {
            SpecifierKind::ForeignScheme => return Resolution::External,
            SpecifierKind::Bare => return self.resolve_bare(path_part, importer_dir).await,
            SpecifierKind::FileUrl(path) => path,
            SpecifierKind::Absolute => PathBuf::from(path_part),
            SpecifierKind::Relative => importer_dir.join(path_part),
        };

        match self.try_candidate(&path_clean::clean(&candidate)).await {
            Some(found) => Resolution::Found(found),
            None => Resolution::NotFound,
        }
    }
}

fn normalize_extension(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{ext}")
    }
}

fn dotted_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
}

fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(ext);
    PathBuf::from(os)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
