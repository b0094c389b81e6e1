//! Default-export detection and the synthetic default policy.

use oxc_allocator::Allocator;
use oxc_ast::ast::{ModuleExportName, Statement};
use oxc_parser::Parser;
use std::path::Path;

use knighted_css::is_vanilla_name;
use knighted_css::walker::source_type_for;

/// What a static scan learned about a module's default export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DefaultExportSignal {
    /// Parse failure or no ESM syntax (CommonJS may still have one).
    #[default]
    Unknown,
    Present,
    Absent,
}

fn export_name<'a>(name: &'a ModuleExportName<'a>) -> &'a str {
    match name {
        ModuleExportName::IdentifierName(ident) => ident.name.as_str(),
        ModuleExportName::IdentifierReference(ident) => ident.name.as_str(),
        ModuleExportName::StringLiteral(lit) => lit.value.as_str(),
    }
}

/// Scan `source` for `export default`, `export { x as default }` and
/// `export { default } from`.
pub fn detect_default_export(source: &str, path: &Path) -> DefaultExportSignal {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type_for(path)).parse();
    if ret.panicked || !ret.errors.is_empty() {
        return DefaultExportSignal::Unknown;
    }

    let mut has_module_syntax = false;
    for stmt in &ret.program.body {
        match stmt {
            Statement::ExportDefaultDeclaration(_) => return DefaultExportSignal::Present,
            Statement::ExportNamedDeclaration(named) => {
                has_module_syntax = true;
                if named
                    .specifiers
                    .iter()
                    .any(|spec| export_name(&spec.exported) == "default")
                {
                    return DefaultExportSignal::Present;
                }
            }
            Statement::ExportAllDeclaration(all) => {
                has_module_syntax = true;
                if all
                    .exported
                    .as_ref()
                    .is_some_and(|name| export_name(name) == "default")
                {
                    return DefaultExportSignal::Present;
                }
            }
            Statement::ImportDeclaration(_) => has_module_syntax = true,
            _ => {}
        }
    }

    if has_module_syntax {
        DefaultExportSignal::Absent
    } else {
        DefaultExportSignal::Unknown
    }
}

/// Whether a combined module re-exports a default.
///
/// Never when the request skipped it or the resource is a CSS-in-TS module;
/// otherwise unless detection positively found no default.
pub fn should_emit_combined_default(
    request_path: &str,
    skip_synthetic_default: bool,
    detection: DefaultExportSignal,
) -> bool {
    if skip_synthetic_default {
        return false;
    }
    let path = request_path.split('?').next().unwrap_or(request_path);
    if is_vanilla_name(path) {
        return false;
    }
    !matches!(detection, DefaultExportSignal::Absent)
}
