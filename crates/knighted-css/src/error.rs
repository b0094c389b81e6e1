//! Error types for CSS extraction

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::dialect::Dialect;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CssError>;

/// Errors that abort a `css` / `css_with_meta` invocation.
#[derive(Error, Debug, Diagnostic)]
pub enum CssError {
    /// A relative or absolute import could not be mapped to a file.
    #[error("Unable to resolve '{specifier}' imported from {}", importer.display())]
    #[diagnostic(
        code(knighted_css::unresolved_import),
        help("Check the import path, configured extensions, and tsconfig paths")
    )]
    UnresolvedImport { specifier: String, importer: PathBuf },

    /// The entry itself could not be resolved.
    #[error("Unable to resolve entry '{entry}' from {}", cwd.display())]
    #[diagnostic(code(knighted_css::unresolved_entry))]
    UnresolvedEntry { entry: String, cwd: PathBuf },

    /// The compiler for a dialect is not installed or not resolvable.
    #[error("Missing {peer} peer: install '{peer}' to compile {dialect} files")]
    #[diagnostic(
        code(knighted_css::missing_peer),
        help("Install the '{peer}' package, or provide a custom peer resolver")
    )]
    MissingPeer { peer: String, dialect: Dialect },

    /// The peer module exposes none of the expected entry points.
    #[error("{peer} peer does not expose {expected} APIs")]
    #[diagnostic(code(knighted_css::unsupported_peer_api))]
    UnsupportedPeerApi { peer: String, expected: String },

    /// A peer compiler failed. The message is the compiler's own text.
    #[error("{message}")]
    #[diagnostic(code(knighted_css::compiler))]
    Compiler { message: String, path: PathBuf },

    /// A legacy render callback was dropped without ever being invoked.
    #[error("{peer} render callback for {} was dropped without a result", path.display())]
    #[diagnostic(code(knighted_css::callback_dropped))]
    CallbackDropped { peer: String, path: PathBuf },

    /// Reading a file failed.
    #[error("Failed to read {}: {source}", path.display())]
    #[diagnostic(code(knighted_css::read))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A script module could not be parsed for imports.
    #[error("Failed to parse {}: {message}", path.display())]
    #[diagnostic(code(knighted_css::script_parse))]
    ScriptParse { path: PathBuf, message: String },

    /// The concatenated stylesheet could not be parsed or printed.
    #[error("lightningcss failed: {message}")]
    #[diagnostic(
        code(knighted_css::stylesheet),
        help("The compiled CSS must be valid for selector stabilization and minification")
    )]
    Stylesheet { message: String },

    /// A CSS-in-TS module used a construct that cannot be evaluated statically.
    #[error("Cannot evaluate {}: {message}", path.display())]
    #[diagnostic(
        code(knighted_css::vanilla),
        help("Only literal style objects and bindings from this file or imported CSS-in-TS modules are supported")
    )]
    Vanilla { path: PathBuf, message: String },

    /// A configured include/exclude/match pattern is not a valid regex.
    #[error("Invalid pattern '{pattern}': {source}")]
    #[diagnostic(code(knighted_css::invalid_pattern))]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl CssError {
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    pub fn stylesheet(message: impl std::fmt::Display) -> Self {
        Self::Stylesheet {
            message: message.to_string(),
        }
    }

    pub fn pattern(pattern: &str) -> impl FnOnce(regex::Error) -> Self + '_ {
        move |source| Self::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        }
    }

    pub fn vanilla(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Vanilla {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiler_error_keeps_message_verbatim() {
        let err = CssError::Compiler {
            message: "Undefined variable: $brand".to_string(),
            path: PathBuf::from("/src/app.scss"),
        };
        assert_eq!(err.to_string(), "Undefined variable: $brand");
    }

    #[test]
    fn unsupported_api_names_missing_capability() {
        let err = CssError::UnsupportedPeerApi {
            peer: "sass".to_string(),
            expected: "compileAsync or render".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "sass peer does not expose compileAsync or render APIs"
        );
    }

    #[test]
    fn missing_peer_names_dialect() {
        let err = CssError::MissingPeer {
            peer: "less".to_string(),
            dialect: Dialect::Less,
        };
        assert!(err.to_string().contains("less"));
    }
}
