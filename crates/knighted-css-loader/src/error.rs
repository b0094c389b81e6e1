//! Loader errors.

use miette::Diagnostic;
use thiserror::Error;

use knighted_css::CssError;

pub type Result<T> = std::result::Result<T, LoaderError>;

#[derive(Error, Debug, Diagnostic)]
pub enum LoaderError {
    /// Extraction failed; the compiler's own diagnostic is forwarded.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Compile(#[from] CssError),

    /// The loader was invoked with a request it cannot serve.
    #[error("Invalid knighted-css request for {resource}: {reason}")]
    #[diagnostic(code(knighted_css_loader::invalid_request))]
    InvalidRequest { resource: String, reason: String },
}
