//! Static evaluation of CSS-in-TS modules.
//!
//! Top-level `style`, `styleVariants`, `globalStyle`, `keyframes`,
//! `fontFace`, `globalFontFace`, `createVar` and theme calls are evaluated
//! with literal arguments. Identifiers may refer to earlier top-level
//! bindings of the same file or to exports of relatively imported CSS-in-TS
//! modules. Names imported from anywhere else are unresolved: declarations
//! that use them are skipped with a warning.

mod css;

use indexmap::IndexMap;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    Argument, BindingPattern, BindingPatternKind, Declaration, Expression,
    ImportDeclarationSpecifier, ModuleExportName, ObjectPropertyKind, PropertyKey,
    Statement, VariableDeclaration,
};
use oxc_parser::Parser;
use oxc_span::SourceType;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};

use super::{CompiledStyle, is_vanilla_name};
use crate::error::{CssError, Result};
use crate::walker::scan_imports;
use css::Block;

const SCRIPT_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

type Exports = IndexMap<String, Value>;

/// Evaluate a CSS-in-TS file, binding names it imports from other CSS-in-TS
/// modules through relative specifiers.
///
/// Imported modules are evaluated for their exports only; their CSS belongs
/// to their own graph node. Their paths are reported in
/// [`CompiledStyle::loaded`].
pub async fn evaluate_file(path: &Path, cwd: &Path) -> Result<CompiledStyle> {
    let mut sources: FxHashMap<PathBuf, String> = FxHashMap::default();
    let mut links: FxHashMap<PathBuf, Vec<(String, PathBuf)>> = FxHashMap::default();
    let mut pending = vec![path.to_path_buf()];

    while let Some(current) = pending.pop() {
        if sources.contains_key(&current) {
            continue;
        }
        let source = tokio::fs::read_to_string(&current)
            .await
            .map_err(|e| CssError::read(&current, e))?;
        let mut resolved = Vec::new();
        for specifier in scan_imports(&source, &current)? {
            if let Some(target) = resolve_local(&current, &specifier).await {
                if !sources.contains_key(&target) {
                    pending.push(target.clone());
                }
                resolved.push((specifier, target));
            }
        }
        links.insert(current.clone(), resolved);
        sources.insert(current, source);
    }

    let mut order = Vec::new();
    let mut visited = FxHashSet::default();
    dependency_order(path, &links, &mut visited, &mut order);

    let mut evaluated: FxHashMap<PathBuf, Exports> = FxHashMap::default();
    let mut css = String::new();
    for module in &order {
        let Some(source) = sources.get(module) else {
            continue;
        };
        let mut imports = FxHashMap::default();
        for (specifier, target) in links.get(module).into_iter().flatten() {
            match evaluated.get(target) {
                Some(exports) => {
                    imports.insert(specifier.clone(), exports.clone());
                }
                None => tracing::warn!(
                    importer = %module.display(),
                    specifier = %specifier,
                    "circular CSS-in-TS import; its bindings are unresolved"
                ),
            }
        }
        let (text, exports) = evaluate_module(source, module, cwd, &imports)?;
        if module == path {
            css = text;
        }
        evaluated.insert(module.clone(), exports);
    }

    let loaded = order.into_iter().filter(|module| module != path).collect();
    Ok(CompiledStyle { css, loaded })
}

/// Evaluate a single CSS-in-TS module into CSS text. Imports are treated as
/// unresolved.
pub fn evaluate(source: &str, path: &Path, cwd: &Path) -> Result<String> {
    evaluate_module(source, path, cwd, &FxHashMap::default()).map(|(css, _)| css)
}

fn dependency_order(
    module: &Path,
    links: &FxHashMap<PathBuf, Vec<(String, PathBuf)>>,
    visited: &mut FxHashSet<PathBuf>,
    order: &mut Vec<PathBuf>,
) {
    if !visited.insert(module.to_path_buf()) {
        return;
    }
    for (_, target) in links.get(module).into_iter().flatten() {
        dependency_order(target, links, visited, order);
    }
    order.push(module.to_path_buf());
}

/// Resolve a relative specifier to a CSS-in-TS file on disk.
async fn resolve_local(importer: &Path, specifier: &str) -> Option<PathBuf> {
    if !(specifier.starts_with("./") || specifier.starts_with("../")) {
        return None;
    }
    let base = path_clean::clean(importer.parent()?.join(specifier));
    let text = base.to_string_lossy().into_owned();

    let mut candidates = vec![base.clone()];
    candidates.extend(SCRIPT_EXTENSIONS.iter().map(|ext| PathBuf::from(format!("{text}.{ext}"))));
    // `./theme.css.js` written against a `.css.ts` source
    for js in [".js", ".mjs", ".cjs", ".jsx"] {
        if let Some(stem) = text.strip_suffix(js) {
            candidates.extend(["ts", "tsx", "mts", "cts"].map(|ext| PathBuf::from(format!("{stem}.{ext}"))));
        }
    }

    for candidate in candidates {
        let is_vanilla = candidate
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(is_vanilla_name);
        if is_vanilla
            && tokio::fs::metadata(&candidate)
                .await
                .is_ok_and(|meta| meta.is_file())
        {
            return Some(candidate);
        }
    }
    None
}

fn module_export_name<'a>(name: &'a ModuleExportName<'a>) -> &'a str {
    match name {
        ModuleExportName::IdentifierName(ident) => ident.name.as_str(),
        ModuleExportName::IdentifierReference(ident) => ident.name.as_str(),
        ModuleExportName::StringLiteral(lit) => lit.value.as_str(),
    }
}

fn is_style_api(specifier: &str) -> bool {
    specifier.starts_with("@vanilla-extract/")
}

fn evaluate_module(
    source: &str,
    path: &Path,
    cwd: &Path,
    imports: &FxHashMap<String, Exports>,
) -> Result<(String, Exports)> {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path)
        .unwrap_or_default()
        .with_module(true);
    let ret = Parser::new(&allocator, source, source_type).parse();
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

    let mut evaluator = Evaluator::new(path, cwd);
    // (local, exported) pairs settled once every binding exists
    let mut exported: Vec<(String, String)> = Vec::new();
    let mut exports = Exports::new();

    for stmt in &ret.program.body {
        match stmt {
            Statement::ImportDeclaration(import) if !import.import_kind.is_type() => {
                let specifier = import.source.value.as_str();
                if is_style_api(specifier) {
                    continue;
                }
                evaluator.import(
                    import.specifiers.iter().flatten(),
                    specifier,
                    imports.get(specifier),
                );
            }
            Statement::VariableDeclaration(decl) => evaluator.declare(decl)?,
            Statement::ExportNamedDeclaration(export) if !export.export_kind.is_type() => {
                if let Some(Declaration::VariableDeclaration(decl)) = &export.declaration {
                    evaluator.declare(decl)?;
                    for declarator in &decl.declarations {
                        for name in binding_names(&declarator.id) {
                            exported.push((name.clone(), name));
                        }
                    }
                }
                match &export.source {
                    Some(source) => {
                        if let Some(module) = imports.get(source.value.as_str()) {
                            for spec in &export.specifiers {
                                let local = module_export_name(&spec.local);
                                if let Some(value) = module.get(local) {
                                    let name = module_export_name(&spec.exported).to_string();
                                    exports.insert(name, value.clone());
                                }
                            }
                        }
                    }
                    None => {
                        for spec in &export.specifiers {
                            exported.push((
                                module_export_name(&spec.local).to_string(),
                                module_export_name(&spec.exported).to_string(),
                            ));
                        }
                    }
                }
            }
            Statement::ExportAllDeclaration(export) if !export.export_kind.is_type() => {
                if let Some(module) = imports.get(export.source.value.as_str()) {
                    match &export.exported {
                        Some(name) => {
                            exports.insert(
                                module_export_name(name).to_string(),
                                Value::Object(module.clone()),
                            );
                        }
                        None => {
                            for (name, value) in module {
                                if name != "default" {
                                    exports.insert(name.clone(), value.clone());
                                }
                            }
                        }
                    }
                }
            }
            Statement::ExportDefaultDeclaration(export) => {
                if let Some(expr) = export.declaration.as_expression() {
                    let value = evaluator.eval(expr, Some("default"))?;
                    exports.insert("default".to_string(), value);
                }
            }
            Statement::ExpressionStatement(expr) => {
                evaluator.eval(&expr.expression, None)?;
            }
            _ => {}
        }
    }

    for (local, name) in exported {
        if let Some(value) = evaluator.bindings.get(&local) {
            exports.insert(name, value.clone());
        }
    }

    Ok((evaluator.finish(), exports))
}

fn binding_names(pattern: &BindingPattern<'_>) -> Vec<String> {
    match &pattern.kind {
        BindingPatternKind::BindingIdentifier(ident) => vec![ident.name.to_string()],
        BindingPatternKind::ArrayPattern(array) => array
            .elements
            .iter()
            .flatten()
            .flat_map(binding_names)
            .collect(),
        _ => Vec::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Value {
    Str(String),
    Num(f64),
    /// Result of `style()`: one or more space-separated class names.
    Class(String),
    Object(IndexMap<String, Value>),
    Array(Vec<Value>),
    Undefined,
    /// A name imported from a module that could not be evaluated.
    Unresolved(String),
}

impl Value {
    fn to_text(&self) -> Option<String> {
        match self {
            Value::Str(s) | Value::Class(s) => Some(s.clone()),
            Value::Num(n) => Some(css::format_number(*n)),
            _ => None,
        }
    }
}

struct Evaluator<'p> {
    path: &'p Path,
    stem: String,
    relative: String,
    ordinal: usize,
    bindings: FxHashMap<String, Value>,
    classes: Vec<String>,
    blocks: Vec<Block>,
    raw: Vec<(usize, String)>,
}

impl<'p> Evaluator<'p> {
    fn new(path: &'p Path, cwd: &Path) -> Self {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("styles");
        let stem = name.split(".css.").next().unwrap_or(name).to_string();
        let relative = path
            .strip_prefix(cwd)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        Self {
            path,
            stem,
            relative,
            ordinal: 0,
            bindings: FxHashMap::default(),
            classes: Vec::new(),
            blocks: Vec::new(),
            raw: Vec::new(),
        }
    }

    fn error(&self, message: impl Into<String>) -> CssError {
        CssError::vanilla(self.path, message)
    }

    /// `<stem>_<debug>__<hash>`
    fn identifier(&mut self, debug: Option<&str>) -> String {
        let input = format!("{}{}", self.relative, self.ordinal);
        self.ordinal += 1;
        let hash = blake3::hash(input.as_bytes()).to_hex();
        match debug {
            Some(debug) if !debug.is_empty() => format!("{}_{}__{}", self.stem, debug, &hash[..8]),
            _ => format!("{}__{}", self.stem, &hash[..8]),
        }
    }

    fn import<'s, 'a: 's>(
        &mut self,
        specifiers: impl Iterator<Item = &'s ImportDeclarationSpecifier<'a>>,
        source: &str,
        module: Option<&Exports>,
    ) {
        if module.is_none() {
            tracing::warn!(
                path = %self.path.display(),
                source,
                "imported bindings are not statically evaluable; rules using them are skipped"
            );
        }
        for specifier in specifiers {
            let (local, value) = match specifier {
                ImportDeclarationSpecifier::ImportSpecifier(spec) => {
                    let imported = module_export_name(&spec.imported);
                    (&spec.local, module.and_then(|m| m.get(imported)).cloned())
                }
                ImportDeclarationSpecifier::ImportDefaultSpecifier(spec) => {
                    (&spec.local, module.and_then(|m| m.get("default")).cloned())
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(spec) => {
                    (&spec.local, module.map(|m| Value::Object(m.clone())))
                }
            };
            let name = local.name.to_string();
            let value = value.unwrap_or_else(|| Value::Unresolved(format!("{name} from '{source}'")));
            self.bindings.insert(name, value);
        }
    }

    fn declare(&mut self, decl: &VariableDeclaration<'_>) -> Result<()> {
        for declarator in &decl.declarations {
            match &declarator.id.kind {
                BindingPatternKind::BindingIdentifier(ident) => {
                    let name = ident.name.to_string();
                    let value = match &declarator.init {
                        Some(init) => self.eval(init, Some(&name))?,
                        None => Value::Undefined,
                    };
                    self.bindings.insert(name, value);
                }
                // const [themeClass, vars] = createTheme({ ... })
                BindingPatternKind::ArrayPattern(_) => {
                    let names = binding_names(&declarator.id);
                    let value = match &declarator.init {
                        Some(init) => self.eval(init, names.first().map(String::as_str))?,
                        None => Value::Undefined,
                    };
                    let mut items = match value {
                        Value::Array(items) => items.into_iter(),
                        _ => Vec::new().into_iter(),
                    };
                    for name in names {
                        let item = items.next().unwrap_or(Value::Undefined);
                        self.bindings.insert(name, item);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn eval(&mut self, expr: &Expression<'_>, debug: Option<&str>) -> Result<Value> {
        match expr {
            Expression::StringLiteral(lit) => Ok(Value::Str(lit.value.to_string())),
            Expression::NumericLiteral(lit) => Ok(Value::Num(lit.value)),
            Expression::NullLiteral(_) => Ok(Value::Undefined),
            Expression::UnaryExpression(unary) if unary.operator.as_str() == "-" => {
                match self.eval(&unary.argument, None)? {
                    Value::Num(n) => Ok(Value::Num(-n)),
                    _ => Err(self.error("unary minus on a non-numeric value")),
                }
            }
            Expression::TemplateLiteral(tpl) => {
                let mut out = String::new();
                for (i, quasi) in tpl.quasis.iter().enumerate() {
                    match &quasi.value.cooked {
                        Some(cooked) => out.push_str(cooked.as_str()),
                        None => out.push_str(quasi.value.raw.as_str()),
                    }
                    if let Some(expr) = tpl.expressions.get(i) {
                        let value = self.eval(expr, None)?;
                        if let Value::Unresolved(origin) = value {
                            return Ok(Value::Unresolved(origin));
                        }
                        let text = value
                            .to_text()
                            .ok_or_else(|| self.error("template substitution is not a string"))?;
                        out.push_str(&text);
                    }
                }
                Ok(Value::Str(out))
            }
            Expression::Identifier(ident) => match ident.name.as_str() {
                "undefined" => Ok(Value::Undefined),
                name => self
                    .bindings
                    .get(name)
                    .cloned()
                    .ok_or_else(|| self.error(format!("'{name}' is not a top-level binding of this file"))),
            },
            Expression::ObjectExpression(obj) => {
                let mut map = IndexMap::new();
                for property in &obj.properties {
                    match property {
                        ObjectPropertyKind::ObjectProperty(prop) => {
                            let key = self.property_key(&prop.key)?;
                            let value = self.eval(&prop.value, None)?;
                            map.insert(key, value);
                        }
                        ObjectPropertyKind::SpreadProperty(spread) => {
                            match self.eval(&spread.argument, None)? {
                                Value::Object(spread) => map.extend(spread),
                                _ => return Err(self.error("spread of a non-object value")),
                            }
                        }
                    }
                }
                Ok(Value::Object(map))
            }
            Expression::ArrayExpression(arr) => {
                let mut items = Vec::with_capacity(arr.elements.len());
                for element in &arr.elements {
                    let expr = element
                        .as_expression()
                        .ok_or_else(|| self.error("array holes and spreads are not supported"))?;
                    items.push(self.eval(expr, None)?);
                }
                Ok(Value::Array(items))
            }
            Expression::StaticMemberExpression(member) => {
                let object = self.eval(&member.object, None)?;
                self.member(object, member.property.name.as_str())
            }
            Expression::ComputedMemberExpression(member) => {
                let object = self.eval(&member.object, None)?;
                let key = self
                    .eval(&member.expression, None)?
                    .to_text()
                    .ok_or_else(|| self.error("computed member key is not a string"))?;
                self.member(object, &key)
            }
            Expression::ParenthesizedExpression(inner) => self.eval(&inner.expression, debug),
            Expression::TSAsExpression(inner) => self.eval(&inner.expression, debug),
            Expression::TSSatisfiesExpression(inner) => self.eval(&inner.expression, debug),
            Expression::TSNonNullExpression(inner) => self.eval(&inner.expression, debug),
            Expression::CallExpression(call) => {
                let Expression::Identifier(callee) = &call.callee else {
                    return Err(self.error("only direct calls to style APIs are supported"));
                };
                if let Some(Value::Unresolved(origin)) = self.bindings.get(callee.name.as_str()) {
                    return Ok(Value::Unresolved(origin.clone()));
                }
                let mut args = Vec::with_capacity(call.arguments.len());
                for argument in &call.arguments {
                    args.push(self.argument(argument)?);
                }
                self.call(callee.name.as_str(), args, debug)
            }
            _ => Err(self.error("unsupported expression")),
        }
    }

    fn argument(&mut self, argument: &Argument<'_>) -> Result<Value> {
        let expr = argument
            .as_expression()
            .ok_or_else(|| self.error("spread arguments are not supported"))?;
        self.eval(expr, None)
    }

    fn property_key(&mut self, key: &PropertyKey<'_>) -> Result<String> {
        if let PropertyKey::StaticIdentifier(ident) = key {
            return Ok(ident.name.to_string());
        }
        let expr = key
            .as_expression()
            .ok_or_else(|| self.error("unsupported property key"))?;
        self.eval(expr, None)?
            .to_text()
            .ok_or_else(|| self.error("property key is not a string"))
    }

    fn member(&self, object: Value, key: &str) -> Result<Value> {
        match object {
            Value::Unresolved(origin) => Ok(Value::Unresolved(origin)),
            Value::Object(mut map) => map
                .swap_remove(key)
                .ok_or_else(|| self.error(format!("unknown member '{key}'"))),
            _ => Err(self.error(format!("member '{key}' of a non-object value"))),
        }
    }

    fn call(&mut self, callee: &str, args: Vec<Value>, debug: Option<&str>) -> Result<Value> {
        let mut args = args.into_iter();
        match callee {
            "style" => {
                let rule = args.next().unwrap_or(Value::Undefined);
                let debug = match args.next() {
                    Some(Value::Str(id)) => Some(id),
                    _ => debug.map(str::to_string),
                };
                self.style(rule, debug.as_deref())
            }
            "styleVariants" => {
                let Some(Value::Object(variants)) = args.next() else {
                    return Err(self.error("styleVariants expects an object"));
                };
                let mut out = IndexMap::new();
                for (key, rule) in variants {
                    let debug = match debug {
                        Some(base) => format!("{base}_{key}"),
                        None => key.clone(),
                    };
                    let class = self.style(rule, Some(&debug))?;
                    out.insert(key, class);
                }
                Ok(Value::Object(out))
            }
            "globalStyle" => {
                let selector = args
                    .next()
                    .and_then(|v| v.to_text())
                    .ok_or_else(|| self.error("globalStyle expects a selector string"))?;
                let Some(Value::Object(rule)) = args.next() else {
                    return Err(self.error("globalStyle expects a style object"));
                };
                let selector = self.transform_selector(&selector);
                self.emit_rule(&selector, &rule, &[])?;
                Ok(Value::Undefined)
            }
            "keyframes" => {
                let Some(Value::Object(frames)) = args.next() else {
                    return Err(self.error("keyframes expects an object"));
                };
                let name = self.identifier(debug);
                let mut text = format!("@keyframes {name} {{\n");
                for (step, rule) in frames {
                    let Value::Object(rule) = rule else {
                        return Err(self.error("keyframe steps must be objects"));
                    };
                    text.push_str(&format!("  {step} {{\n"));
                    for (property, value) in self.declarations(&rule)? {
                        text.push_str(&format!("    {property}: {value};\n"));
                    }
                    text.push_str("  }\n");
                }
                text.push_str("}\n");
                self.push_raw(text);
                Ok(Value::Str(name))
            }
            "fontFace" => {
                let name = self.identifier(debug);
                let faces = match args.next() {
                    Some(Value::Array(items)) => items,
                    Some(other) => vec![other],
                    None => Vec::new(),
                };
                for face in faces {
                    self.font_face(&name, face)?;
                }
                Ok(Value::Str(name))
            }
            "globalFontFace" => {
                let name = args
                    .next()
                    .and_then(|v| v.to_text())
                    .ok_or_else(|| self.error("globalFontFace expects a family name"))?;
                let face = args.next().unwrap_or(Value::Undefined);
                self.font_face(&name, face)?;
                Ok(Value::Undefined)
            }
            "createVar" => {
                let name = self.identifier(debug);
                Ok(Value::Str(format!("var(--{name})")))
            }
            "fallbackVar" => {
                let mut values = Vec::new();
                for value in args {
                    let text = value
                        .to_text()
                        .ok_or_else(|| self.error("fallbackVar expects variables and strings"))?;
                    values.push(text);
                }
                let Some(fallback) = values.pop() else {
                    return Err(self.error("fallbackVar expects at least one variable"));
                };
                let text = values.into_iter().rev().fold(fallback, |inner, var| {
                    match var.strip_suffix(')') {
                        Some(open) => format!("{open}, {inner})"),
                        None => var,
                    }
                });
                Ok(Value::Str(text))
            }
            "createThemeContract" => {
                let tokens = args.next().unwrap_or(Value::Undefined);
                self.theme_contract(tokens, debug)
            }
            "assignVars" => {
                let contract = args.next().unwrap_or(Value::Undefined);
                let tokens = args.next().unwrap_or(Value::Undefined);
                let mut vars = IndexMap::new();
                self.assign_vars(&contract, &tokens, &mut vars)?;
                Ok(Value::Object(vars))
            }
            "createTheme" => {
                let first = args.next().unwrap_or(Value::Undefined);
                match args.next() {
                    Some(tokens @ Value::Object(_)) => {
                        let class = self.theme_class(&first, &tokens, debug)?;
                        Ok(Value::Class(class))
                    }
                    _ => {
                        let contract = self.theme_contract(first.clone(), debug)?;
                        let class = self.theme_class(&contract, &first, debug)?;
                        Ok(Value::Array(vec![Value::Class(class), contract]))
                    }
                }
            }
            "createGlobalTheme" => {
                let selector = args
                    .next()
                    .and_then(|v| v.to_text())
                    .ok_or_else(|| self.error("createGlobalTheme expects a selector string"))?;
                let first = args.next().unwrap_or(Value::Undefined);
                let (contract, tokens, returned) = match args.next() {
                    Some(tokens) => (first, tokens, Value::Undefined),
                    None => {
                        let contract = self.theme_contract(first.clone(), debug)?;
                        (contract.clone(), first, contract)
                    }
                };
                let mut vars = IndexMap::new();
                self.assign_vars(&contract, &tokens, &mut vars)?;
                let rule = IndexMap::from([("vars".to_string(), Value::Object(vars))]);
                self.emit_rule(&selector, &rule, &[])?;
                Ok(returned)
            }
            other => Err(self.error(format!("'{other}' is not a supported style API"))),
        }
    }

    /// Replace every leaf of a token object with a fresh custom property.
    fn theme_contract(&mut self, tokens: Value, debug: Option<&str>) -> Result<Value> {
        match tokens {
            Value::Object(map) => {
                let mut out = IndexMap::new();
                for (key, value) in map {
                    let path = match debug {
                        Some(base) => format!("{base}_{key}"),
                        None => key.clone(),
                    };
                    let leaf = self.theme_contract(value, Some(&path))?;
                    out.insert(key, leaf);
                }
                Ok(Value::Object(out))
            }
            Value::Array(_) => Err(self.error("theme tokens must be objects or leaf values")),
            _ => {
                let name = self.identifier(debug);
                Ok(Value::Str(format!("var(--{name})")))
            }
        }
    }

    fn assign_vars(
        &self,
        contract: &Value,
        tokens: &Value,
        out: &mut IndexMap<String, Value>,
    ) -> Result<()> {
        match (contract, tokens) {
            (Value::Object(contract), Value::Object(tokens)) => {
                for (key, var) in contract {
                    let value = tokens
                        .get(key)
                        .ok_or_else(|| self.error(format!("theme is missing the '{key}' token")))?;
                    self.assign_vars(var, value, out)?;
                }
                Ok(())
            }
            (Value::Str(var), value) => {
                out.insert(var.clone(), value.clone());
                Ok(())
            }
            (Value::Unresolved(_), _) | (_, Value::Unresolved(_)) => Ok(()),
            _ => Err(self.error("theme tokens do not match the contract")),
        }
    }

    fn theme_class(&mut self, contract: &Value, tokens: &Value, debug: Option<&str>) -> Result<String> {
        let mut vars = IndexMap::new();
        self.assign_vars(contract, tokens, &mut vars)?;
        let class = self.identifier(debug);
        self.classes.push(class.clone());
        let rule = IndexMap::from([("vars".to_string(), Value::Object(vars))]);
        self.emit_rule(&format!(".{class}"), &rule, &[])?;
        Ok(class)
    }

    fn style(&mut self, rule: Value, debug: Option<&str>) -> Result<Value> {
        let class = self.identifier(debug);
        self.classes.push(class.clone());

        let mut composed = Vec::new();
        let mut merged = IndexMap::new();
        let parts = match rule {
            Value::Array(items) => items,
            other => vec![other],
        };
        for part in parts {
            match part {
                Value::Class(existing) => composed.push(existing),
                Value::Object(map) => merged.extend(map),
                Value::Undefined => {}
                Value::Unresolved(origin) => self.skip_unresolved("composition", &origin),
                _ => return Err(self.error("style expects objects or class references")),
            }
        }

        self.emit_rule(&format!(".{class}"), &merged, &[])?;
        composed.push(class);
        Ok(Value::Class(composed.join(" ")))
    }

    fn font_face(&mut self, family: &str, face: Value) -> Result<()> {
        let Value::Object(rule) = face else {
            return Err(self.error("font face must be an object"));
        };
        let mut declarations = vec![("font-family".to_string(), format!("\"{family}\""))];
        declarations.extend(self.declarations(&rule)?);
        let mut text = String::from("@font-face {\n");
        for (property, value) in declarations {
            text.push_str(&format!("  {property}: {value};\n"));
        }
        text.push_str("}\n");
        self.push_raw(text);
        Ok(())
    }

    fn skip_unresolved(&self, what: &str, origin: &str) {
        tracing::warn!(path = %self.path.display(), origin, "skipping {what}: value is not statically known");
    }

    fn push_raw(&mut self, text: String) {
        self.raw.push((self.blocks.len(), text));
    }

    /// Plain declarations of a style object, nesting keys skipped.
    fn declarations(&self, rule: &IndexMap<String, Value>) -> Result<Vec<(String, String)>> {
        let mut out = Vec::new();
        for (key, value) in rule {
            if is_nesting_key(key) {
                continue;
            }
            if key == "vars" {
                let Value::Object(vars) = value else {
                    return Err(self.error("vars must be an object"));
                };
                for (name, value) in vars {
                    let name = custom_property_name(name);
                    if let Value::Unresolved(origin) = value {
                        self.skip_unresolved(&name, origin);
                        continue;
                    }
                    let text = value
                        .to_text()
                        .ok_or_else(|| self.error(format!("invalid value for {name}")))?;
                    out.push((name, text));
                }
                continue;
            }

            let property = css::kebab_case(key);
            let values = match value {
                Value::Array(fallbacks) => fallbacks.iter().collect::<Vec<_>>(),
                single => vec![single],
            };
            for value in values {
                let text = match value {
                    Value::Num(n) => css::numeric_value(&property, *n),
                    Value::Undefined => continue,
                    Value::Unresolved(origin) => {
                        self.skip_unresolved(&property, origin);
                        continue;
                    }
                    other => other
                        .to_text()
                        .ok_or_else(|| self.error(format!("invalid value for '{key}'")))?,
                };
                out.push((property.clone(), text));
            }
        }
        Ok(out)
    }

    fn emit_rule(
        &mut self,
        selector: &str,
        rule: &IndexMap<String, Value>,
        conditions: &[String],
    ) -> Result<()> {
        let declarations = self.declarations(rule)?;
        self.blocks.push(Block {
            conditions: conditions.to_vec(),
            prelude: selector.to_string(),
            declarations,
        });

        for (key, value) in rule {
            if key.starts_with(':') {
                let Value::Object(nested) = value else {
                    return Err(self.error(format!("'{key}' must be a style object")));
                };
                self.emit_rule(&format!("{selector}{key}"), nested, conditions)?;
            } else if key == "selectors" {
                let Value::Object(selectors) = value else {
                    return Err(self.error("selectors must be an object"));
                };
                for (nested_selector, nested) in selectors {
                    let Value::Object(nested) = nested else {
                        return Err(self.error(format!("'{nested_selector}' must be a style object")));
                    };
                    let resolved = self
                        .transform_selector(nested_selector)
                        .replace('&', selector);
                    self.emit_rule(&resolved, nested, conditions)?;
                }
            } else if key.contains('&') {
                let Value::Object(nested) = value else {
                    return Err(self.error(format!("'{key}' must be a style object")));
                };
                let resolved = self.transform_selector(key).replace('&', selector);
                self.emit_rule(&resolved, nested, conditions)?;
            } else if let Some(kind) = key.strip_prefix('@') {
                let Value::Object(queries) = value else {
                    return Err(self.error(format!("'{key}' must be an object")));
                };
                for (query, nested) in queries {
                    let Value::Object(nested) = nested else {
                        return Err(self.error(format!("'@{kind} {query}' must be a style object")));
                    };
                    let mut nested_conditions = conditions.to_vec();
                    nested_conditions.push(format!("@{kind} {query}"));
                    self.emit_rule(selector, nested, &nested_conditions)?;
                }
            }
        }
        Ok(())
    }

    /// Generated class names inside selector strings become class selectors.
    fn transform_selector(&self, selector: &str) -> String {
        let mut out = selector.to_string();
        for class in &self.classes {
            out = prefix_class_references(&out, class);
        }
        out
    }

    fn finish(self) -> String {
        let mut out = String::new();
        let mut raw = self.raw.into_iter().peekable();
        for (index, block) in self.blocks.iter().enumerate() {
            while let Some((_, text)) = raw.next_if(|(at, _)| *at <= index) {
                out.push_str(&text);
            }
            block.render(&mut out);
        }
        for (_, text) in raw {
            out.push_str(&text);
        }
        out
    }
}

fn is_nesting_key(key: &str) -> bool {
    key.starts_with(':') || key.starts_with('@') || key == "selectors" || key.contains('&')
}

/// `var(--x)` -> `--x`; bare names gain the `--` prefix.
fn custom_property_name(name: &str) -> String {
    if let Some(inner) = name.strip_prefix("var(").and_then(|n| n.strip_suffix(')')) {
        inner.to_string()
    } else if name.starts_with("--") {
        name.to_string()
    } else {
        format!("--{name}")
    }
}

fn prefix_class_references(selector: &str, class: &str) -> String {
    let mut out = String::with_capacity(selector.len() + 1);
    let mut rest = selector;
    while let Some(pos) = rest.find(class) {
        let before = rest[..pos].chars().next_back();
        let after = rest[pos + class.len()..].chars().next();
        let bounded_before =
            !matches!(before, Some(c) if c == '.' || c == '-' || c == '_' || c.is_ascii_alphanumeric());
        let bounded_after =
            !matches!(after, Some(c) if c == '-' || c == '_' || c.is_ascii_alphanumeric());
        out.push_str(&rest[..pos]);
        if bounded_before && bounded_after {
            out.push('.');
        }
        out.push_str(class);
        rest = &rest[pos + class.len()..];
    }
    out.push_str(rest);
    out
}
