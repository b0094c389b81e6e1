//! Sass dispatch and the built-in `grass` peer.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::oneshot;

use super::CompiledStyle;
use super::peer::{
    LegacyRenderOptions, PeerError, PeerResolver, SassApi, SassCompileAsync, SassCompileOptions,
    SassCompileResult, SassSyntax,
};
use crate::dialect::Dialect;
use crate::error::{CssError, Result};

const PEER_NAME: &str = "sass";

/// Directories Sass searches for `@use` / `@import`.
pub fn load_paths(path: &Path, cwd: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(3);
    if let Some(dir) = path.parent() {
        paths.push(dir.to_path_buf());
    }
    paths.push(cwd.to_path_buf());
    paths.push(cwd.join("node_modules"));
    paths
}

/// Compile a `.scss` / `.sass` file through the resolved Sass peer.
pub async fn compile(
    path: &Path,
    cwd: &Path,
    syntax: SassSyntax,
    peers: &dyn PeerResolver,
) -> Result<CompiledStyle> {
    let dialect = match syntax {
        SassSyntax::Scss => Dialect::Scss,
        SassSyntax::Indented => Dialect::Sass,
    };

    let module = peers
        .resolve(PEER_NAME, cwd)
        .await
        .ok_or_else(|| CssError::MissingPeer {
            peer: PEER_NAME.to_string(),
            dialect,
        })?;

    let api = SassApi::detect(&module);
    tracing::debug!(path = %path.display(), ?api, "compiling sass");

    match api {
        SassApi::Modern(compiler) => {
            let options = SassCompileOptions {
                load_paths: load_paths(path, cwd),
                syntax,
            };
            let result = compiler
                .compile_async(path, options)
                .await
                .map_err(|e| CssError::Compiler {
                    message: e.message,
                    path: path.to_path_buf(),
                })?;
            Ok(CompiledStyle {
                css: result.css,
                loaded: result.loaded_urls,
            })
        }
        SassApi::Legacy(render) => {
            let (tx, rx) = oneshot::channel();
            let options = LegacyRenderOptions {
                file: path.to_path_buf(),
                include_paths: load_paths(path, cwd),
            };
            render.render(
                options,
                Box::new(move |outcome| {
                    // The receiver only disappears if the caller gave up.
                    let _ = tx.send(outcome);
                }),
            );

            match rx.await {
                Ok(Ok(Some(result))) => Ok(CompiledStyle::from_css(
                    String::from_utf8_lossy(&result.css).into_owned(),
                )),
                Ok(Ok(None)) => Ok(CompiledStyle::default()),
                Ok(Err(err)) => Err(CssError::Compiler {
                    message: err.message,
                    path: path.to_path_buf(),
                }),
                Err(_) => Err(CssError::CallbackDropped {
                    peer: PEER_NAME.to_string(),
                    path: path.to_path_buf(),
                }),
            }
        }
        SassApi::Unsupported => Err(CssError::UnsupportedPeerApi {
            peer: PEER_NAME.to_string(),
            expected: "compileAsync or render".to_string(),
        }),
    }
}

/// `grass::Fs` that records every file the compiler reads.
#[derive(Debug, Default)]
struct TrackingFs {
    loaded: Mutex<Vec<PathBuf>>,
}

impl TrackingFs {
    fn into_loaded(self) -> Vec<PathBuf> {
        self.loaded.into_inner().unwrap_or_default()
    }
}

impl grass::Fs for TrackingFs {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        let bytes = std::fs::read(path)?;
        if let Ok(mut loaded) = self.loaded.lock() {
            let cleaned = path_clean::clean(path);
            if !loaded.contains(&cleaned) {
                loaded.push(cleaned);
            }
        }
        Ok(bytes)
    }
}

/// Built-in Sass peer backed by `grass`.
///
/// grass is synchronous, so compilation runs on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrassSass;

#[async_trait]
impl SassCompileAsync for GrassSass {
    async fn compile_async(
        &self,
        path: &Path,
        options: SassCompileOptions,
    ) -> std::result::Result<SassCompileResult, PeerError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let fs = TrackingFs::default();
            let mut grass_options = grass::Options::default()
                .fs(&fs)
                .load_paths(options.load_paths.as_slice())
                .style(grass::OutputStyle::Expanded);
            if options.syntax == SassSyntax::Indented {
                grass_options = grass_options.input_syntax(grass::InputSyntax::Sass);
            }

            let css = grass::from_path(&path, &grass_options)
                .map_err(|e| PeerError::new(e.to_string()))?;
            drop(grass_options);

            Ok(SassCompileResult {
                css,
                loaded_urls: fs.into_loaded(),
            })
        })
        .await
        .map_err(|e| PeerError::new(format!("sass compilation task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_paths_start_at_entry_directory() {
        let paths = load_paths(Path::new("/app/src/styles/card.scss"), Path::new("/app"));
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/app/src/styles"),
                PathBuf::from("/app"),
                PathBuf::from("/app/node_modules"),
            ]
        );
    }

    #[tokio::test]
    async fn grass_reports_loaded_files() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("_tokens.scss"), "$brand: #663399;").unwrap();
        let entry = dir.path().join("card.scss");
        std::fs::write(&entry, "@use 'tokens';\n.card { color: tokens.$brand; }").unwrap();

        let result = GrassSass
            .compile_async(
                &entry,
                SassCompileOptions {
                    load_paths: load_paths(&entry, dir.path()),
                    syntax: SassSyntax::Scss,
                },
            )
            .await
            .unwrap();

        assert!(result.css.contains(".card"));
        assert!(result.css.contains("#663399"));
        assert!(result.loaded_urls.iter().any(|p| p.ends_with("_tokens.scss")));
    }
}
