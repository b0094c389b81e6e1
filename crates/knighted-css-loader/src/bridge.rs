//! Bridge mode.
//!
//! In bridge mode the bundler's own CSS pipeline owns CSS Modules; the
//! loader only forwards compiled CSS text next to the locals that pipeline
//! produced. A combined request on a script aggregates every
//! `.module.(css|scss|sass|less)` import the script makes.

use oxc_allocator::Allocator;
use oxc_ast::ast::Statement;
use oxc_parser::Parser;
use regex::Regex;
use std::path::{Component, Path};
use std::sync::LazyLock;

use knighted_css::walker::source_type_for;

use crate::codegen::{Expr, ProxyModule};
use crate::combined::MODULES_EXPORT;
use crate::query::{EXPORT_NAME, MARKER, append_query, build_sanitized_query};

const MODULE_STYLE_SUFFIXES: &[&str] = &[".module.css", ".module.scss", ".module.sass", ".module.less"];

static DECLARATION: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(?:import|export)\b[^'";]*?['"]([^'"]+)['"]"#).ok()
});

const STYLE_ALIAS_PREFIX: &str = "__knightedStyle";

fn is_module_style(specifier: &str) -> bool {
    let path = specifier.split('?').next().unwrap_or(specifier);
    MODULE_STYLE_SUFFIXES
        .iter()
        .any(|suffix| path.ends_with(suffix))
}

/// CSS Modules style specifiers imported or re-exported by `source`, in
/// source order without duplicates. Falls back to a line scan when the
/// source does not parse.
pub fn find_module_style_imports(source: &str, path: &Path) -> Vec<String> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type_for(path)).parse();

    let candidates: Vec<String> = if ret.panicked || !ret.errors.is_empty() {
        tracing::debug!(path = %path.display(), "bridge scan falling back to regex");
        DECLARATION
            .iter()
            .flat_map(|re| re.captures_iter(source))
            .map(|c| c[1].to_string())
            .collect()
    } else {
        ret.program
            .body
            .iter()
            .filter_map(|stmt| match stmt {
                Statement::ImportDeclaration(import) => Some(import.source.value.to_string()),
                Statement::ExportNamedDeclaration(export) => {
                    export.source.as_ref().map(|s| s.value.to_string())
                }
                Statement::ExportAllDeclaration(export) => Some(export.source.value.to_string()),
                _ => None,
            })
            .collect()
    };

    let mut found: Vec<String> = Vec::new();
    for specifier in candidates {
        if is_module_style(&specifier) && !found.contains(&specifier) {
            found.push(specifier);
        }
    }
    found
}

/// Rewrite a style specifier to request its CSS payload, carrying the
/// export name when the payload must use a non-default one.
pub fn to_css_request(specifier: &str, export_name: Option<&str>) -> String {
    let (path, query) = match specifier.find('?') {
        Some(idx) => (&specifier[..idx], &specifier[idx..]),
        None => (specifier, ""),
    };
    let has_key = |key: &str| {
        query
            .trim_start_matches('?')
            .split('&')
            .any(|token| token.split('=').next() == Some(key))
    };

    let mut extra = Vec::new();
    if !has_key(MARKER) {
        extra.push(MARKER.to_string());
    }
    if let Some(name) = export_name.filter(|_| !has_key(EXPORT_NAME)) {
        extra.push(format!("{EXPORT_NAME}={name}"));
    }
    if extra.is_empty() {
        return specifier.to_string();
    }
    format!("{path}{}", append_query(query, &extra.join("&")))
}

/// Plan the combined module for a script in bridge mode: upstream exports,
/// concatenated CSS, and merged CSS Modules maps. Never has a default.
///
/// With `forward_export_name` each style payload is asked to export its CSS
/// under `export_name` too.
pub fn plan_bridge_module(
    upstream: &str,
    export_name: &str,
    styles: &[String],
    forward_export_name: bool,
) -> ProxyModule {
    let mut module = ProxyModule::default();
    let aliases: Vec<String> = (0..styles.len())
        .map(|i| format!("{STYLE_ALIAS_PREFIX}{i}"))
        .collect();

    for (alias, specifier) in aliases.iter().zip(styles) {
        let forwarded = forward_export_name.then_some(export_name);
        module.import(alias.clone(), to_css_request(specifier, forwarded));
    }

    let css = if aliases.is_empty() {
        Expr::Str(String::new())
    } else {
        Expr::Join(
            aliases
                .iter()
                .map(|alias| Expr::Member {
                    object: alias.clone(),
                    property: export_name.to_string(),
                })
                .collect(),
        )
    };
    module.export(export_name, css);

    let modules = if aliases.is_empty() {
        Expr::Raw("{}".to_string())
    } else {
        Expr::ModulesOf(aliases)
    };
    module.export(MODULES_EXPORT, modules);

    module.reexports.push(upstream.to_string());
    module
}

/// Plan the module for a style resource in bridge mode: the CSS text this
/// loader compiled, plus the locals of the bundler's own pipeline.
pub fn plan_bridge_style_module(
    proxy_request: &str,
    export_name: &str,
    css: &str,
    stable_literal: Option<&str>,
) -> ProxyModule {
    let mut module = ProxyModule::default();
    module.import(STYLE_ALIAS_PREFIX, proxy_request);
    module.export(export_name, Expr::Str(css.to_string()));
    module.export(
        MODULES_EXPORT,
        Expr::ModulesOf(vec![STYLE_ALIAS_PREFIX.to_string()]),
    );
    if let Some(literal) = stable_literal {
        module.raw(literal);
    }
    module
}

/// Request string for the original resource without loader flags.
///
/// Prefers the bundler's raw request, keeping any loader chain prefix up to
/// the last `!`. Otherwise builds `./<relative path>` from `root_context`.
pub fn build_proxy_request(
    resource_path: &Path,
    raw_request: Option<&str>,
    root_context: &Path,
    query: &str,
) -> String {
    if let Some(raw) = raw_request.filter(|r| !r.is_empty()) {
        let split = raw.rfind('!').map_or(0, |i| i + 1);
        let (prefix, request) = raw.split_at(split);
        let (path, raw_query) = match request.find('?') {
            Some(idx) => (&request[..idx], &request[idx..]),
            None => (request, ""),
        };
        return format!("{prefix}{path}{}", build_sanitized_query(raw_query));
    }

    format!(
        "{}{}",
        relative_request(root_context, resource_path),
        build_sanitized_query(query)
    )
}

/// `./`-prefixed POSIX path from `from_dir` to `to`.
fn relative_request(from_dir: &Path, to: &Path) -> String {
    let from = path_clean::clean(from_dir);
    let to = path_clean::clean(to);
    let from_parts: Vec<Component<'_>> = from.components().collect();
    let to_parts: Vec<Component<'_>> = to.components().collect();

    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    for _ in common..from_parts.len() {
        segments.push("..".to_string());
    }
    for part in &to_parts[common..] {
        segments.push(part.as_os_str().to_string_lossy().into_owned());
    }

    let joined = segments.join("/");
    if joined.starts_with("..") {
        joined
    } else {
        format!("./{joined}")
    }
}
