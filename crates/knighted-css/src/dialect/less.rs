//! Less dispatch and the built-in `lessc` peer.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::CompiledStyle;
use super::peer::{LessRender, LessRenderOptions, LessRenderOutput, PeerError, PeerResolver};
use crate::dialect::Dialect;
use crate::error::{CssError, Result};

const PEER_NAME: &str = "less";

/// Compile a `.less` file through the resolved Less peer.
pub async fn compile(path: &Path, cwd: &Path, peers: &dyn PeerResolver) -> Result<CompiledStyle> {
    let module = peers
        .resolve(PEER_NAME, cwd)
        .await
        .ok_or_else(|| CssError::MissingPeer {
            peer: PEER_NAME.to_string(),
            dialect: Dialect::Less,
        })?;

    let Some(render) = module.exports().less_render.clone() else {
        return Err(CssError::UnsupportedPeerApi {
            peer: PEER_NAME.to_string(),
            expected: "render".to_string(),
        });
    };

    let source = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CssError::read(path, e))?;

    let mut paths = Vec::with_capacity(2);
    if let Some(dir) = path.parent() {
        paths.push(dir.to_path_buf());
    }
    paths.push(cwd.join("node_modules"));

    tracing::debug!(path = %path.display(), "compiling less");
    let output = render
        .render(
            &source,
            LessRenderOptions {
                filename: path.to_path_buf(),
                paths,
            },
        )
        .await
        .map_err(|e| CssError::Compiler {
            message: e.message,
            path: path.to_path_buf(),
        })?;

    Ok(CompiledStyle {
        css: output.css,
        loaded: output.imports,
    })
}

/// Built-in Less peer that pipes sources through the `lessc` executable.
///
/// Runs without a timeout; dropping the render future kills the child.
#[derive(Debug, Clone)]
pub struct LesscRender {
    binary: PathBuf,
}

impl LesscRender {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Locate `lessc` in `<cwd>/node_modules/.bin`, then on `PATH`.
    pub async fn locate(cwd: &Path) -> Option<Self> {
        let local = cwd.join("node_modules").join(".bin").join("lessc");
        if tokio::fs::metadata(&local)
            .await
            .is_ok_and(|meta| meta.is_file())
        {
            return Some(Self::new(local));
        }

        #[cfg(unix)]
        let check_cmd = "which";
        #[cfg(windows)]
        let check_cmd = "where";

        let status = Command::new(check_cmd)
            .arg("lessc")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .ok()?;

        status.success().then(|| Self::new(PathBuf::from("lessc")))
    }
}

#[async_trait]
impl LessRender for LesscRender {
    async fn render(
        &self,
        source: &str,
        options: LessRenderOptions,
    ) -> std::result::Result<LessRenderOutput, PeerError> {
        let include_paths = std::env::join_paths(&options.paths)
            .map_err(|e| PeerError::new(e.to_string()))?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg(format!("--include-path={}", include_paths.to_string_lossy()))
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = options.filename.parent() {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| PeerError::new(e.to_string()))?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| PeerError::new("Failed to capture lessc stdin"))?;
        stdin
            .write_all(source.as_bytes())
            .await
            .map_err(|e| PeerError::new(e.to_string()))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| PeerError::new(e.to_string()))?;

        if !output.status.success() {
            return Err(PeerError::new(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let css = String::from_utf8(output.stdout).map_err(|e| PeerError::new(e.to_string()))?;
        Ok(LessRenderOutput {
            css,
            imports: Vec::new(),
        })
    }
}
