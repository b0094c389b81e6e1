//! Static import discovery for script modules.

use oxc_allocator::Allocator;
use oxc_ast::ast::Statement;
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::path::Path;

use crate::error::{CssError, Result};

/// Source type for a script path; unknown extensions parse as TSX modules.
pub fn source_type_for(path: &Path) -> SourceType {
    SourceType::from_path(path)
        .unwrap_or_else(|_| SourceType::tsx())
        .with_module(true)
}

/// Specifiers of every static `import`, `export ... from` and `export * from`
/// declaration, in source order. Type-only declarations are skipped.
///
/// # Errors
///
/// Returns `CssError::ScriptParse` if the module has syntax errors.
pub fn scan_imports(source: &str, path: &Path) -> Result<Vec<String>> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type_for(path)).parse();
    if ret.panicked || !ret.errors.is_empty() {
        let message = ret
            .errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "parser panicked".to_string());
        return Err(CssError::ScriptParse {
            path: path.to_path_buf(),
            message,
        });
    }

    let mut specifiers = Vec::new();
    for stmt in &ret.program.body {
        match stmt {
            Statement::ImportDeclaration(import) if !import.import_kind.is_type() => {
                specifiers.push(import.source.value.to_string());
            }
            Statement::ExportNamedDeclaration(export) if !export.export_kind.is_type() => {
                if let Some(source) = &export.source {
                    specifiers.push(source.value.to_string());
                }
            }
            Statement::ExportAllDeclaration(export) if !export.export_kind.is_type() => {
                specifiers.push(export.source.value.to_string());
            }
            _ => {}
        }
    }
    Ok(specifiers)
}
