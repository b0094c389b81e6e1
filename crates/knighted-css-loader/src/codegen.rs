//! Proxy module IR and rendering.
//!
//! Planners decide which imports and exports a module needs; [`render`]
//! turns that decision into ECMAScript source. Rendering is deterministic.

use std::fmt::Write as _;

/// Name of the helper that extracts a CSS Modules map from a payload.
pub const RESOLVE_MODULES_HELPER: &str = "__knightedResolveModules";

const RESERVED: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "implements", "import", "in", "instanceof", "interface", "let", "new", "null",
    "package", "private", "protected", "public", "return", "static", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// Whether `name` can be used as an exported binding.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        && !RESERVED.contains(&name)
}

/// JSON string literal, valid as a JS string literal.
pub fn string_literal(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{}\"", value.escape_default()))
}

/// `import * as <alias> from "<specifier>";`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceImport {
    pub alias: String,
    pub specifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Ident(String),
    Str(String),
    /// `object.property`, or bracket access for non-identifiers.
    Member { object: String, property: String },
    /// The namespace's `default` export when defined, else the namespace.
    DefaultOrNamespace(String),
    /// Merge of the CSS Modules maps of each namespace, in order.
    ModulesOf(Vec<String>),
    /// Newline-joined concatenation.
    Join(Vec<Expr>),
    /// Pre-rendered object literal or other trusted source.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Const { name: String, init: Expr },
    ExportConst { name: String, init: Expr },
    /// Upstream source or generated declarations emitted verbatim.
    Raw(String),
}

/// A synthesized module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyModule {
    pub imports: Vec<NamespaceImport>,
    pub statements: Vec<Stmt>,
    /// `export * from` specifiers.
    pub reexports: Vec<String>,
    pub default_export: Option<Expr>,
}

impl ProxyModule {
    pub fn import(&mut self, alias: impl Into<String>, specifier: impl Into<String>) {
        self.imports.push(NamespaceImport {
            alias: alias.into(),
            specifier: specifier.into(),
        });
    }

    pub fn constant(&mut self, name: impl Into<String>, init: Expr) {
        self.statements.push(Stmt::Const {
            name: name.into(),
            init,
        });
    }

    pub fn export(&mut self, name: impl Into<String>, init: Expr) {
        self.statements.push(Stmt::ExportConst {
            name: name.into(),
            init,
        });
    }

    pub fn raw(&mut self, source: impl Into<String>) {
        self.statements.push(Stmt::Raw(source.into()));
    }

    /// Names exported by `export const`, in order.
    pub fn exported_names(&self) -> impl Iterator<Item = &str> {
        self.statements.iter().filter_map(|stmt| match stmt {
            Stmt::ExportConst { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }

    fn needs_modules_helper(&self) -> bool {
        fn uses(expr: &Expr) -> bool {
            match expr {
                Expr::ModulesOf(_) => true,
                Expr::Join(items) => items.iter().any(uses),
                _ => false,
            }
        }
        self.statements.iter().any(|stmt| match stmt {
            Stmt::Const { init, .. } | Stmt::ExportConst { init, .. } => uses(init),
            Stmt::Raw(_) => false,
        })
    }
}

/// Helper resolving a payload's CSS Modules map. A declared
/// `knightedCssModules` object is authoritative even when empty; otherwise
/// the default export's `locals`, then a record of strings, then the
/// payload's string-valued named exports.
fn modules_helper(css_export: &str) -> String {
    format!(
        r#"function {RESOLVE_MODULES_HELPER}(payload) {{
  const declared = payload.knightedCssModules;
  if (declared && typeof declared === "object") {{
    return declared.locals && typeof declared.locals === "object" ? declared.locals : declared;
  }}
  const primary = payload.default;
  if (primary && typeof primary === "object") {{
    if (primary.locals && typeof primary.locals === "object") return primary.locals;
    const values = Object.values(primary);
    if (values.length > 0 && values.every((value) => typeof value === "string")) return primary;
  }}
  const locals = {{}};
  for (const [key, value] of Object.entries(payload)) {{
    if (key === "default" || key === "__esModule" || key === {css}) continue;
    if (typeof value === "string") locals[key] = value;
  }}
  return locals;
}}
"#,
        css = string_literal(css_export),
    )
}

fn render_expr(expr: &Expr, out: &mut String) {
    match expr {
        Expr::Ident(name) => out.push_str(name),
        Expr::Str(value) => out.push_str(&string_literal(value)),
        Expr::Member { object, property } => {
            out.push_str(object);
            if is_identifier(property) {
                out.push('.');
                out.push_str(property);
            } else {
                out.push('[');
                out.push_str(&string_literal(property));
                out.push(']');
            }
        }
        Expr::DefaultOrNamespace(namespace) => {
            let _ = write!(
                out,
                "typeof {namespace}.default !== \"undefined\" ? {namespace}.default : {namespace}"
            );
        }
        Expr::ModulesOf(namespaces) => {
            if let [single] = namespaces.as_slice() {
                let _ = write!(out, "{RESOLVE_MODULES_HELPER}({single})");
            } else {
                out.push_str("Object.assign({}");
                for namespace in namespaces {
                    let _ = write!(out, ", {RESOLVE_MODULES_HELPER}({namespace})");
                }
                out.push(')');
            }
        }
        Expr::Join(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render_expr(item, out);
            }
            out.push_str("].join(\"\\n\")");
        }
        Expr::Raw(source) => out.push_str(source),
    }
}

/// Render a module. `css_export` is the name of the CSS text export, which
/// the CSS Modules helper must not mistake for a class.
pub fn render(module: &ProxyModule, css_export: &str) -> String {
    let mut out = String::new();

    for import in &module.imports {
        let _ = writeln!(
            out,
            "import * as {} from {};",
            import.alias,
            string_literal(&import.specifier)
        );
    }
    if !module.imports.is_empty() {
        out.push('\n');
    }

    if module.needs_modules_helper() {
        out.push_str(&modules_helper(css_export));
        out.push('\n');
    }

    for stmt in &module.statements {
        match stmt {
            Stmt::Const { name, init } => {
                let _ = write!(out, "const {name} = ");
                render_expr(init, &mut out);
                out.push_str(";\n");
            }
            Stmt::ExportConst { name, init } => {
                let _ = write!(out, "export const {name} = ");
                render_expr(init, &mut out);
                out.push_str(";\n");
            }
            Stmt::Raw(source) => {
                out.push_str(source);
                if !source.ends_with('\n') {
                    out.push('\n');
                }
            }
        }
    }

    for specifier in &module.reexports {
        let _ = writeln!(out, "export * from {};", string_literal(specifier));
    }

    if let Some(default) = &module.default_export {
        out.push_str("export default ");
        render_expr(default, &mut out);
        out.push_str(";\n");
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(is_identifier("knightedCss"));
        assert!(is_identifier("$css_1"));
        assert!(!is_identifier("1css"));
        assert!(!is_identifier("my-css"));
        assert!(!is_identifier("default"));
        assert!(!is_identifier(""));
    }

    #[test]
    fn renders_in_section_order() {
        let mut module = ProxyModule::default();
        module.import("__up", "./button.tsx");
        module.constant("__default", Expr::DefaultOrNamespace("__up".to_string()));
        module.export(
            "knightedCss",
            Expr::Member {
                object: "__css".to_string(),
                property: "knightedCss".to_string(),
            },
        );
        module.reexports.push("./button.tsx".to_string());
        module.default_export = Some(Expr::Ident("__default".to_string()));

        assert_eq!(
            render(&module, "knightedCss"),
            "import * as __up from \"./button.tsx\";\n\n\
             const __default = typeof __up.default !== \"undefined\" ? __up.default : __up;\n\
             export const knightedCss = __css.knightedCss;\n\
             export * from \"./button.tsx\";\n\
             export default __default;\n"
        );
    }

    #[test]
    fn helper_is_emitted_only_when_used() {
        let mut module = ProxyModule::default();
        module.export("knightedCss", Expr::Str("a{}".to_string()));
        assert!(!render(&module, "knightedCss").contains(RESOLVE_MODULES_HELPER));

        module.export(
            "knightedCssModules",
            Expr::ModulesOf(vec!["__a".to_string(), "__b".to_string()]),
        );
        let source = render(&module, "knightedCss");
        assert!(source.contains("function __knightedResolveModules(payload)"));
        assert!(source.contains(
            "export const knightedCssModules = Object.assign({}, __knightedResolveModules(__a), __knightedResolveModules(__b));"
        ));
    }

    #[test]
    fn declared_modules_map_short_circuits_the_fallback() {
        let helper = modules_helper("knightedCss");
        let declared = helper
            .find("if (declared && typeof declared === \"object\")")
            .expect("declared check");
        let fallback = helper.find("Object.entries(payload)").expect("export scan");
        assert!(declared < fallback);
    }

    #[test]
    fn join_concatenates_with_newlines() {
        let mut out = String::new();
        render_expr(
            &Expr::Join(vec![Expr::Ident("a".into()), Expr::Ident("b".into())]),
            &mut out,
        );
        assert_eq!(out, "[a, b].join(\"\\n\")");
    }
}
