#![cfg_attr(docsrs, feature(doc_cfg))]

//! # knighted-css
//!
//! Extract CSS from a JavaScript/TypeScript module graph.
//!
//! Starting from an entry module, every statically imported style file
//! (`.css`, `.scss`, `.sass`, `.less`, and `*.css.ts` CSS-in-TS modules) is
//! compiled and concatenated in import order. The result can be run through
//! lightningcss for CSS Modules, minification, and stable selectors.
//!
//! ## Quick Start
//!
//! ```no_run
//! use knighted_css::{AutoStableOption, CssOptions, css_with_meta};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = CssOptions::new("/path/to/app").with_auto_stable(AutoStableOption::Enabled);
//! let result = css_with_meta("./src/button.tsx", &options).await?;
//!
//! println!("{}", result.css);
//! for file in &result.files {
//!     println!("depends on {}", file.display());
//! }
//! # Ok(()) }
//! ```
//!
//! ## Stable selectors
//!
//! With auto-stable enabled every class selector gains a deterministic twin:
//! `.card_x1y2 { ... }` becomes `.card_x1y2, .knighted-card { ... }`. The
//! [`stable`] module exposes the naming helpers and
//! [`build_stable_selectors_literal`] turns compiled CSS into a
//! `stableSelectors` module export.

pub mod boost;
pub mod dialect;
pub mod error;
pub mod options;
pub mod postprocess;
pub mod resolver;
pub mod stable;
pub mod walker;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

pub use boost::{BoostStrategy, SpecificityBoost};
pub use dialect::peer::{
    LegacyCallback, LegacyRenderOptions, LegacyRenderResult, LessRender, LessRenderOptions,
    LessRenderOutput, PeerError, PeerExports, PeerModule, PeerResolver, SassApi,
    SassCompileAsync, SassCompileOptions, SassCompileResult, SassLegacyRender, SassSyntax,
};
pub use dialect::{CompiledStyle, DefaultPeerResolver, Dialect, compile_file, is_vanilla_name};
pub use error::{CssError, Result};
pub use options::{CssOptions, FileFilter, LightningOptions};
pub use postprocess::Processed;
pub use resolver::{ModuleResolver, Resolution, Resolver, TsconfigMode};
pub use stable::{
    AutoStable, AutoStableOption, LiteralTarget, Rewrite, SelectorTransform, StableSelectorMap,
    StableSelectorsLiteral, TransformMode, TransformPipeline, build_stable_selectors_literal,
    build_visitor, collect_stable_selectors, stable_class_name, stable_selector, stable_token,
};
pub use walker::{CompileCache, CssWithMeta, css, css_with_meta};

pub use knighted_css_config as config;
