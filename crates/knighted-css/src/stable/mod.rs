//! Stable selectors.
//!
//! Auto-stable duplicates each class-bearing selector under a deterministic
//! `<namespace>-<token>` class so components can be targeted without knowing
//! content hashes. `:global(...)` subtrees are never rewritten.

pub mod literal;
mod token;
pub mod transform;

pub use literal::{
    LiteralTarget, StableSelectorMap, StableSelectorsLiteral, build_stable_selectors_literal,
    collect_stable_selectors,
};
pub use token::{stable_class_name, stable_selector, stable_token};
pub use transform::{Rewrite, SelectorTransform, TransformMode, TransformPipeline, parse_order};

use indexmap::IndexMap;
use lightningcss::css_modules::{CssModuleExports, CssModuleReference};
use lightningcss::selector::{Component, PseudoClass, Selector};
use lightningcss::values::ident::Ident;
use lightningcss::values::string::CowArcStr;
use regex::Regex;
use rustc_hash::FxHashMap;

use knighted_css_config::DEFAULT_STABLE_NAMESPACE;

/// Auto-stable configuration as accepted by [`crate::CssOptions`].
#[derive(Debug, Clone, Default)]
pub enum AutoStableOption {
    #[default]
    Disabled,
    /// Default namespace, every class.
    Enabled,
    Custom {
        namespace: Option<String>,
        include: Option<Regex>,
        exclude: Option<Regex>,
    },
}

impl AutoStableOption {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, AutoStableOption::Disabled)
    }
}

/// Build the auto-stable transform, or `None` when disabled.
pub fn build_visitor(config: &AutoStableOption) -> Option<AutoStable> {
    match config {
        AutoStableOption::Disabled => None,
        AutoStableOption::Enabled => Some(AutoStable::new(DEFAULT_STABLE_NAMESPACE)),
        AutoStableOption::Custom {
            namespace,
            include,
            exclude,
        } => {
            let mut stable = AutoStable::new(
                namespace
                    .as_deref()
                    .unwrap_or(DEFAULT_STABLE_NAMESPACE),
            );
            stable.include = include.clone();
            stable.exclude = exclude.clone();
            Some(stable)
        }
    }
}

/// Append-mode transform adding stable class variants of selectors.
#[derive(Debug, Clone)]
pub struct AutoStable {
    namespace: String,
    include: Option<Regex>,
    exclude: Option<Regex>,
    /// Emit stable classes inside `:global(...)` so CSS Modules keep them verbatim.
    global: bool,
}

impl AutoStable {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.trim().to_string(),
            include: None,
            exclude: None,
            global: false,
        }
    }

    pub fn with_css_modules(mut self, enabled: bool) -> Self {
        self.global = enabled;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether a class token gets a stable variant.
    pub fn accepts(&self, token: &str) -> bool {
        if !self.namespace.is_empty() && token.starts_with(&format!("{}-", self.namespace)) {
            return false;
        }
        if let Some(include) = &self.include {
            if !include.is_match(token) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(token) {
                return false;
            }
        }
        true
    }

    /// Stable class for a token, if it passes the filters.
    pub fn stable_for(&self, token: &str) -> Option<String> {
        self.accepts(token)
            .then(|| stable_class_name(token, &self.namespace))
    }

    fn stable_component<'i>(&self, token: &str) -> Component<'i> {
        let class = Component::Class(Ident(CowArcStr::from(stable_class_name(
            token,
            &self.namespace,
        ))));
        if self.global {
            Component::NonTSPseudoClass(PseudoClass::Global {
                selector: Box::new(Selector::from(vec![class])),
            })
        } else {
            class
        }
    }

    fn rewrite_selector<'i>(&self, selector: &Selector<'i>, changed: &mut bool) -> Selector<'i> {
        let mut local = false;
        let components: Vec<Component<'i>> = parse_order(selector)
            .iter()
            .map(|component| self.rewrite_component(component, &mut local))
            .collect();
        if local {
            *changed = true;
            Selector::from(components)
        } else {
            selector.clone()
        }
    }

    fn rewrite_list<'i>(&self, list: &[Selector<'i>], changed: &mut bool) -> Box<[Selector<'i>]> {
        list.iter()
            .map(|selector| self.rewrite_selector(selector, changed))
            .collect::<Vec<_>>()
            .into_boxed_slice()
    }

    fn rewrite_component<'i>(&self, component: &Component<'i>, changed: &mut bool) -> Component<'i> {
        match component {
            Component::Class(ident) if self.accepts(&ident.0) => {
                *changed = true;
                self.stable_component(&ident.0)
            }
            Component::Negation(list) => Component::Negation(self.rewrite_list(list, changed)),
            Component::Is(list) => Component::Is(self.rewrite_list(list, changed)),
            Component::Where(list) => Component::Where(self.rewrite_list(list, changed)),
            Component::Has(list) => Component::Has(self.rewrite_list(list, changed)),
            Component::Any(prefix, list) => {
                Component::Any(prefix.clone(), self.rewrite_list(list, changed))
            }
            Component::Slotted(inner) => Component::Slotted(self.rewrite_selector(inner, changed)),
            Component::Host(Some(inner)) => {
                Component::Host(Some(self.rewrite_selector(inner, changed)))
            }
            // `:global(...)` and everything else pass through untouched.
            other => other.clone(),
        }
    }

    /// CSS Modules export map with stable classes merged in.
    ///
    /// Each value is the export's own compiled name and stable class, followed
    /// by every `composes:` target's compiled name and stable class.
    pub fn stabilize_exports(&self, exports: &CssModuleExports) -> IndexMap<String, String> {
        let reverse: FxHashMap<&str, &str> = exports
            .iter()
            .map(|(token, export)| (export.name.as_str(), token.as_str()))
            .collect();

        let mut tokens: Vec<&String> = exports.keys().collect();
        tokens.sort();

        let mut out = IndexMap::with_capacity(tokens.len());
        for token in tokens {
            let export = &exports[token];
            let mut names: Vec<String> = vec![export.name.clone()];
            names.extend(self.stable_for(token));

            for reference in &export.composes {
                let (compiled, source_token) = match reference {
                    CssModuleReference::Local { name } => {
                        let token = reverse.get(name.as_str()).copied().unwrap_or(name.as_str());
                        (name.clone(), token)
                    }
                    CssModuleReference::Global { name } => (name.clone(), name.as_str()),
                    CssModuleReference::Dependency { name, .. } => (name.clone(), name.as_str()),
                };
                names.push(compiled);
                names.extend(self.stable_for(source_token));
            }

            let mut seen = Vec::with_capacity(names.len());
            for name in names {
                if !seen.contains(&name) {
                    seen.push(name);
                }
            }
            out.insert(token.clone(), seen.join(" "));
        }
        out
    }
}

impl SelectorTransform for AutoStable {
    fn mode(&self) -> TransformMode {
        TransformMode::Append
    }

    fn rewrite<'i>(&self, selector: &Selector<'i>) -> Rewrite<'i> {
        let mut changed = false;
        let rewritten = self.rewrite_selector(selector, &mut changed);
        Rewrite {
            selector: rewritten,
            changed,
        }
    }
}

/// CSS Modules export map without stable classes.
pub fn plain_exports(exports: &CssModuleExports) -> IndexMap<String, String> {
    let mut tokens: Vec<&String> = exports.keys().collect();
    tokens.sort();
    tokens
        .into_iter()
        .map(|token| {
            let export = &exports[token];
            let mut names = vec![export.name.clone()];
            for reference in &export.composes {
                let name = match reference {
                    CssModuleReference::Local { name }
                    | CssModuleReference::Global { name }
                    | CssModuleReference::Dependency { name, .. } => name.clone(),
                };
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            (token.clone(), names.join(" "))
        })
        .collect()
}
