//! # knighted-css-loader
//!
//! Bundler-facing half of knighted-css: the resource-query protocol and the
//! proxy modules it generates.
//!
//! | Query                                   | Module produced                                  |
//! |-----------------------------------------|--------------------------------------------------|
//! | `?knighted-css`                         | original source plus `export const knightedCss`  |
//! | `?knighted-css&types`                   | the above plus `stableSelectors`                 |
//! | `?knighted-css&combined`                | upstream exports, CSS, and a forwarded default   |
//! | `?knighted-css&combined&named-only`     | combined, without the default                    |
//!
//! The host implements [`LoaderHost`] and calls [`load`] once per resource:
//!
//! ```no_run
//! use std::path::Path;
//! use knighted_css_loader::{LoaderHost, LoaderOptions, LoaderRequest, load};
//!
//! struct Host;
//! impl LoaderHost for Host {
//!     fn add_dependency(&self, path: &Path) { println!("watch {}", path.display()); }
//!     fn emit_warning(&self, message: String) { eprintln!("{message}"); }
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let source = std::fs::read_to_string("/app/src/button.tsx")?;
//! let request = LoaderRequest {
//!     resource_path: Path::new("/app/src/button.tsx"),
//!     resource_query: "?knighted-css&combined",
//!     source: &source,
//!     raw_request: None,
//!     root_context: Path::new("/app/src"),
//! };
//! let module = load(&request, &LoaderOptions::default(), &Host).await?;
//! println!("{module}");
//! # Ok(()) }
//! ```

pub mod bridge;
pub mod codegen;
pub mod combined;
pub mod default_export;
pub mod error;
pub mod loader;
pub mod query;

pub use bridge::{build_proxy_request, find_module_style_imports};
pub use codegen::{ProxyModule, is_identifier, render};
pub use combined::{CombinedPlan, MODULES_EXPORT, STABLE_EXPORT, plan_combined_module};
pub use default_export::{DefaultExportSignal, detect_default_export, should_emit_combined_default};
pub use error::{LoaderError, Result};
pub use loader::{LoaderHost, LoaderMode, LoaderOptions, LoaderRequest, load};
pub use query::{QueryFlagSet, build_sanitized_query, parse_flags};
