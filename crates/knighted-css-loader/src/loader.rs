//! Loader entry point.
//!
//! The host bundler hands over one resource (path, query, source) and a
//! [`LoaderHost`] for dependency registration and warnings; [`load`] returns
//! the module source to use in its place.

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use std::path::{Path, PathBuf};

use knighted_css::{
    AutoStableOption, CssOptions, LiteralTarget, build_stable_selectors_literal, css_with_meta,
};
use knighted_css_config::{
    DEFAULT_EXPORT_NAME, DEFAULT_STABLE_NAMESPACE, KnightedCssConfig, LoaderModeSetting,
};

use crate::bridge::{
    build_proxy_request, find_module_style_imports, plan_bridge_module, plan_bridge_style_module,
};
use crate::codegen::{is_identifier, render, string_literal};
use crate::combined::{CombinedPlan, MODULES_EXPORT, plan_combined_module};
use crate::default_export::{detect_default_export, should_emit_combined_default};
use crate::error::{LoaderError, Result};
use crate::query::{self, MARKER, QueryFlagSet, parse_flags};

const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];
const TYPESCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts"];

/// Services the host bundler provides to one loader invocation.
pub trait LoaderHost: Send + Sync {
    /// Register a file whose changes invalidate this module.
    fn add_dependency(&self, path: &Path);

    fn emit_warning(&self, message: String);
}

/// Codegen strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoaderMode {
    #[default]
    Standard,
    /// The bundler's CSS pipeline owns CSS Modules; see [`crate::bridge`].
    Bridge,
}

impl From<LoaderModeSetting> for LoaderMode {
    fn from(setting: LoaderModeSetting) -> Self {
        match setting {
            LoaderModeSetting::Standard => LoaderMode::Standard,
            LoaderModeSetting::Bridge => LoaderMode::Bridge,
        }
    }
}

/// Loader configuration shared by every invocation.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Name of the CSS text export.
    pub export_name: String,
    pub mode: LoaderMode,
    /// Namespace for `stableSelectors` when the request does not override it.
    pub stable_namespace: String,
    pub css: CssOptions,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self::new(CssOptions::default())
    }
}

impl LoaderOptions {
    pub fn new(css: CssOptions) -> Self {
        Self {
            export_name: DEFAULT_EXPORT_NAME.to_string(),
            mode: LoaderMode::Standard,
            stable_namespace: DEFAULT_STABLE_NAMESPACE.to_string(),
            css,
        }
    }

    pub fn with_export_name(mut self, name: impl Into<String>) -> Self {
        self.export_name = name.into();
        self
    }

    pub fn with_mode(mut self, mode: LoaderMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn from_config(config: &KnightedCssConfig) -> Result<Self> {
        let css = CssOptions::from_config(config)?;
        Ok(Self {
            export_name: config.loader.export_name.clone(),
            mode: config.loader.mode.into(),
            stable_namespace: config.stable_namespace().to_string(),
            css,
        })
    }

    fn modules_enabled(&self) -> bool {
        self.css
            .lightningcss
            .as_ref()
            .is_some_and(|lightning| lightning.css_modules)
    }
}

/// One resource handed to the loader.
#[derive(Debug, Clone)]
pub struct LoaderRequest<'a> {
    /// Absolute path of the resource.
    pub resource_path: &'a Path,
    /// Query including its leading `?`, or `""`.
    pub resource_query: &'a str,
    pub source: &'a str,
    /// The bundler's raw request, when it exposes one.
    pub raw_request: Option<&'a str>,
    /// Directory proxy requests are made relative to.
    pub root_context: &'a Path,
}

impl LoaderRequest<'_> {
    fn extension(&self) -> Option<&str> {
        self.resource_path.extension().and_then(|e| e.to_str())
    }

    fn is_script(&self) -> bool {
        self.extension().is_some_and(|e| SCRIPT_EXTENSIONS.contains(&e))
    }

    fn literal_target(&self) -> LiteralTarget {
        if self.extension().is_some_and(|e| TYPESCRIPT_EXTENSIONS.contains(&e)) {
            LiteralTarget::TypeScript
        } else {
            LiteralTarget::JavaScript
        }
    }

    fn display(&self) -> String {
        self.resource_path.display().to_string()
    }
}

/// Produce the module source for one request.
///
/// # Errors
///
/// Extraction failures are returned as [`crate::LoaderError::Compile`] with
/// the compiler's message intact.
pub async fn load(
    request: &LoaderRequest<'_>,
    options: &LoaderOptions,
    host: &dyn LoaderHost,
) -> Result<String> {
    if !request.resource_path.is_absolute() {
        return Err(LoaderError::InvalidRequest {
            resource: request.display(),
            reason: "resource path must be absolute".to_string(),
        });
    }

    let flags = parse_flags(request.resource_query);
    let export_name = resolve_export_name(&flags, options, request, host);

    tracing::debug!(
        resource = %request.resource_path.display(),
        combined = flags.combined,
        mode = ?options.mode,
        "knighted-css load"
    );

    match options.mode {
        LoaderMode::Bridge if flags.combined && request.is_script() => {
            Ok(load_bridge_combined(request, &flags, &export_name, host))
        }
        LoaderMode::Bridge if !request.is_script() => {
            load_bridge_style(request, &flags, options, &export_name, host).await
        }
        _ if flags.combined => Ok(load_combined(request, &flags, options, &export_name)),
        _ => load_standard(request, &flags, options, &export_name, host).await,
    }
}

fn resolve_export_name(
    flags: &QueryFlagSet,
    options: &LoaderOptions,
    request: &LoaderRequest<'_>,
    host: &dyn LoaderHost,
) -> String {
    let fallback = if is_identifier(&options.export_name) {
        options.export_name.clone()
    } else {
        DEFAULT_EXPORT_NAME.to_string()
    };
    match &flags.export_name {
        Some(name) if is_identifier(name) => name.clone(),
        Some(name) => {
            let message = format!(
                "knighted-css: ignoring exportName={name} for {}; not a valid identifier, using {fallback}",
                request.display()
            );
            tracing::warn!(resource = %request.resource_path.display(), name, "invalid exportName override");
            host.emit_warning(message);
            fallback
        }
        None => fallback,
    }
}

/// Namespace used both to stabilize the CSS and to build `stableSelectors`:
/// the request override, then a namespace set on the CSS options, then the
/// loader default.
fn resolved_namespace(flags: &QueryFlagSet, options: &LoaderOptions) -> String {
    if let Some(namespace) = &flags.stable_namespace {
        return namespace.clone();
    }
    match &options.css.auto_stable {
        AutoStableOption::Custom {
            namespace: Some(namespace),
            ..
        } => namespace.clone(),
        _ => options.stable_namespace.clone(),
    }
}

/// CSS options for this request; stable selectors force auto-stable on
/// under `namespace`.
fn css_options_for(flags: &QueryFlagSet, options: &LoaderOptions, namespace: &str) -> CssOptions {
    let mut css = options.css.clone();
    if !flags.stable_requested {
        return css;
    }
    css.auto_stable = match css.auto_stable {
        AutoStableOption::Custom {
            include, exclude, ..
        } => AutoStableOption::Custom {
            namespace: Some(namespace.to_string()),
            include,
            exclude,
        },
        _ => AutoStableOption::Custom {
            namespace: Some(namespace.to_string()),
            include: None,
            exclude: None,
        },
    };
    css
}

struct Extracted {
    css: String,
    modules: Option<String>,
    namespace: String,
}

async fn extract(
    request: &LoaderRequest<'_>,
    flags: &QueryFlagSet,
    options: &LoaderOptions,
    host: &dyn LoaderHost,
) -> Result<Extracted> {
    let namespace = resolved_namespace(flags, options);
    let css_options = css_options_for(flags, options, &namespace);
    let entry: PathBuf = request.resource_path.to_path_buf();
    let result = css_with_meta(&entry.to_string_lossy(), &css_options).await?;

    for file in &result.files {
        host.add_dependency(file);
    }

    let modules = result
        .modules
        .as_ref()
        .map(|map| serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string()));

    Ok(Extracted {
        css: result.css,
        modules,
        namespace,
    })
}

fn stable_literal(
    extracted: &Extracted,
    request: &LoaderRequest<'_>,
    target: LiteralTarget,
    host: &dyn LoaderHost,
) -> String {
    build_stable_selectors_literal(
        &extracted.css,
        &extracted.namespace,
        &request.display(),
        target,
        &mut |message| host.emit_warning(message),
    )
    .literal
}

/// Non-combined request: the original source plus the CSS exports.
async fn load_standard(
    request: &LoaderRequest<'_>,
    flags: &QueryFlagSet,
    options: &LoaderOptions,
    export_name: &str,
    host: &dyn LoaderHost,
) -> Result<String> {
    let extracted = extract(request, flags, options, host).await?;

    let mut out = String::new();
    if request.is_script() {
        out.push_str(request.source);
        if !out.ends_with('\n') {
            out.push('\n');
        }
    }
    out.push_str(&format!(
        "export const {export_name} = {};\n",
        string_literal(&extracted.css)
    ));
    if flags.stable_requested {
        let target = request.literal_target();
        out.push_str(&stable_literal(&extracted, request, target, host));
        out.push('\n');
    }
    if let Some(modules) = &extracted.modules {
        out.push_str(&format!("export const {MODULES_EXPORT} = {modules};\n"));
    }
    Ok(out)
}

/// `?knighted-css` request for the same resource, carrying the flags the
/// CSS payload needs.
fn css_proxy_request(upstream: &str, flags: &QueryFlagSet, export_name: &str) -> String {
    let (path, residual) = match upstream.rfind('?') {
        Some(idx) if !upstream[idx..].contains('!') => (&upstream[..idx], &upstream[idx..]),
        _ => (upstream, ""),
    };

    let mut tokens = vec![MARKER.to_string()];
    if flags.types_requested {
        tokens.push(query::TYPES.to_string());
    }
    if let Some(namespace) = &flags.stable_namespace {
        tokens.push(format!(
            "{}={}",
            query::STABLE_NAMESPACE,
            utf8_percent_encode(namespace, NON_ALPHANUMERIC)
        ));
    }
    if flags.export_name.is_some() {
        tokens.push(format!("{}={export_name}", query::EXPORT_NAME));
    }

    format!("{path}{}", query::append_query(residual, &tokens.join("&")))
}

/// Combined request in standard mode.
fn load_combined(
    request: &LoaderRequest<'_>,
    flags: &QueryFlagSet,
    options: &LoaderOptions,
    export_name: &str,
) -> String {
    let upstream = build_proxy_request(
        request.resource_path,
        request.raw_request,
        request.root_context,
        request.resource_query,
    );
    let css_proxy = css_proxy_request(&upstream, flags, export_name);

    let detection = if request.is_script() {
        detect_default_export(request.source, request.resource_path)
    } else {
        Default::default()
    };
    let emit_default = should_emit_combined_default(
        &request.resource_path.to_string_lossy(),
        flags.skip_synthetic_default,
        detection,
    );

    let module = plan_combined_module(&CombinedPlan {
        upstream: &upstream,
        css_proxy: &css_proxy,
        export_name,
        include_modules: options.modules_enabled(),
        include_stable: flags.stable_requested,
        emit_default,
    });
    render(&module, export_name)
}

/// Combined request on a script in bridge mode.
fn load_bridge_combined(
    request: &LoaderRequest<'_>,
    flags: &QueryFlagSet,
    export_name: &str,
    host: &dyn LoaderHost,
) -> String {
    if flags.types_requested {
        let message = format!(
            "knighted-css: the types flag is not supported for bridge combined requests ({}); stableSelectors will not be emitted",
            request.display()
        );
        tracing::warn!(resource = %request.resource_path.display(), "types ignored in bridge mode");
        host.emit_warning(message);
    }

    let styles = find_module_style_imports(request.source, request.resource_path);
    let upstream = build_proxy_request(
        request.resource_path,
        request.raw_request,
        request.root_context,
        request.resource_query,
    );
    let forward_export_name = flags.export_name.as_deref() == Some(export_name);
    render(
        &plan_bridge_module(&upstream, export_name, &styles, forward_export_name),
        export_name,
    )
}

/// Style resource in bridge mode.
async fn load_bridge_style(
    request: &LoaderRequest<'_>,
    flags: &QueryFlagSet,
    options: &LoaderOptions,
    export_name: &str,
    host: &dyn LoaderHost,
) -> Result<String> {
    if flags.combined {
        let message = format!(
            "knighted-css: combined is ignored for style resources in bridge mode ({}); emitting the style payload",
            request.display()
        );
        tracing::warn!(resource = %request.resource_path.display(), "combined ignored for bridge style");
        host.emit_warning(message);
    }

    let extracted = extract(request, flags, options, host).await?;
    let proxy = build_proxy_request(
        request.resource_path,
        request.raw_request,
        request.root_context,
        request.resource_query,
    );
    let literal = flags
        .stable_requested
        .then(|| stable_literal(&extracted, request, LiteralTarget::JavaScript, host));
    let module = plan_bridge_style_module(&proxy, export_name, &extracted.css, literal.as_deref());
    Ok(render(&module, export_name))
}
