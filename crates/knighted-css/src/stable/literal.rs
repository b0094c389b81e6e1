//! Stable selector map discovery and module literal generation.

use indexmap::IndexMap;
use lightningcss::css_modules;
use lightningcss::rules::CssRule;
use lightningcss::selector::{Component, PseudoClass, Selector};
use lightningcss::stylesheet::{ParserOptions, StyleSheet};
use lightningcss::visit_types;
use lightningcss::visitor::{Visit, VisitTypes, Visitor};
use regex::Regex;
use std::convert::Infallible;

use super::transform::parse_order;

/// Token -> stable class name, in order of first appearance.
///
/// Every value is exactly `<namespace>-<token>`. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StableSelectorMap(IndexMap<String, String>);

impl StableSelectorMap {
    pub fn get(&self, token: &str) -> Option<&str> {
        self.0.get(token).map(String::as_str)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

struct ClassCollector<'n> {
    prefix: &'n str,
    found: IndexMap<String, String>,
}

impl ClassCollector<'_> {
    fn record(&mut self, class: &str) {
        if let Some(token) = class.strip_prefix(self.prefix) {
            if !token.is_empty() && !self.found.contains_key(token) {
                self.found.insert(token.to_string(), class.to_string());
            }
        }
    }

    fn selector(&mut self, selector: &Selector<'_>) {
        for component in &parse_order(selector) {
            self.component(component);
        }
    }

    fn component(&mut self, component: &Component<'_>) {
        match component {
            Component::Class(ident) => self.record(&ident.0),
            Component::Negation(list)
            | Component::Is(list)
            | Component::Where(list)
            | Component::Has(list)
            | Component::Any(_, list) => {
                for selector in list.iter() {
                    self.selector(selector);
                }
            }
            Component::Slotted(inner) | Component::Host(Some(inner)) => self.selector(inner),
            Component::NonTSPseudoClass(PseudoClass::Global { selector }) => self.selector(selector),
            _ => {}
        }
    }
}

impl<'i> Visitor<'i> for ClassCollector<'_> {
    type Error = Infallible;

    fn visit_types(&self) -> VisitTypes {
        visit_types!(RULES)
    }

    fn visit_rule(&mut self, rule: &mut CssRule<'i>) -> Result<(), Self::Error> {
        if let CssRule::Style(style) = rule {
            for selector in style.selectors.0.iter() {
                self.selector(selector);
            }
        }
        rule.visit_children(self)
    }
}

/// Every class selector of `css` prefixed with `<namespace>-`.
///
/// Parses with lightningcss (CSS Modules syntax on, so `:global(...)` is
/// structural); falls back to a regex scan when the CSS does not parse.
pub fn collect_stable_selectors(css: &str, namespace: &str) -> StableSelectorMap {
    let namespace = namespace.trim();
    if namespace.is_empty() {
        return StableSelectorMap::default();
    }
    let prefix = format!("{namespace}-");

    let options = ParserOptions {
        css_modules: Some(css_modules::Config::default()),
        ..Default::default()
    };
    match StyleSheet::parse(css, options) {
        Ok(mut stylesheet) => {
            let mut collector = ClassCollector {
                prefix: &prefix,
                found: IndexMap::new(),
            };
            if let Err(never) = stylesheet.visit(&mut collector) {
                match never {}
            }
            StableSelectorMap(collector.found)
        }
        Err(err) => {
            tracing::debug!(error = %err, "stable selector scan falling back to regex");
            collect_with_regex(css, namespace)
        }
    }
}

fn collect_with_regex(css: &str, namespace: &str) -> StableSelectorMap {
    let pattern = format!(r"\.{}-([A-Za-z0-9_-]+)", regex::escape(namespace));
    let Ok(re) = Regex::new(&pattern) else {
        return StableSelectorMap::default();
    };
    let mut found = IndexMap::new();
    for captures in re.captures_iter(css) {
        let token = &captures[1];
        if !found.contains_key(token) {
            found.insert(token.to_string(), format!("{namespace}-{token}"));
        }
    }
    StableSelectorMap(found)
}

/// Output flavor of the generated literal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LiteralTarget {
    /// Adds an `as const` assertion.
    #[default]
    TypeScript,
    JavaScript,
}

/// Generated `stableSelectors` export and the map it encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StableSelectorsLiteral {
    pub literal: String,
    pub selector_map: StableSelectorMap,
}

/// Build `export const stableSelectors = Object.freeze({...})`.
///
/// A blank namespace yields an empty frozen object and exactly one warning.
pub fn build_stable_selectors_literal(
    css: &str,
    namespace: &str,
    resource_path: &str,
    target: LiteralTarget,
    warn: &mut dyn FnMut(String),
) -> StableSelectorsLiteral {
    let selector_map = if namespace.trim().is_empty() {
        let message = format!(
            "knighted-css: stable namespace for {resource_path} is empty; stableSelectors will be an empty object"
        );
        tracing::warn!(resource = resource_path, "empty stable namespace");
        warn(message);
        StableSelectorMap::default()
    } else {
        collect_stable_selectors(css, namespace)
    };

    let mut body = String::from("{");
    for (i, (token, class)) in selector_map.iter().enumerate() {
        body.push_str(if i == 0 { "\n  " } else { ",\n  " });
        body.push_str(&json_string(token));
        body.push_str(": ");
        body.push_str(&json_string(class));
    }
    if !selector_map.is_empty() {
        body.push('\n');
    }
    body.push('}');

    let assertion = match target {
        LiteralTarget::TypeScript => " as const",
        LiteralTarget::JavaScript => "",
    };
    let literal = format!("export const stableSelectors = Object.freeze({body}{assertion});");

    StableSelectorsLiteral {
        literal,
        selector_map,
    }
}

fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}
