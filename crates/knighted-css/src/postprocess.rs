//! The lightningcss pass over the concatenated stylesheet.
//!
//! Runs once per extraction, after every file has been compiled, so
//! minification and selector rewriting see the whole cascade.

use indexmap::IndexMap;
use lightningcss::css_modules;
use lightningcss::printer::PrinterOptions;
use lightningcss::properties::Property;
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::selector::{Component, Selector};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use lightningcss::visitor::Visit;
use std::sync::Arc;

use crate::boost::SpecificityBoost;
use crate::error::{CssError, Result};
use crate::options::LightningOptions;
use crate::stable::{self, AutoStableOption};

/// Output of the lightningcss pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Processed {
    pub css: String,
    /// CSS Modules class map, token -> space-separated class names.
    pub modules: Option<IndexMap<String, String>>,
}

/// Parse, transform, optionally minify, and print `css`.
pub fn process(
    css: &str,
    lightning: &LightningOptions,
    auto_stable: &AutoStableOption,
    boost: Option<&SpecificityBoost>,
) -> Result<Processed> {
    let stable = stable::build_visitor(auto_stable)
        .map(|visitor| visitor.with_css_modules(lightning.css_modules));

    let mut pipeline = lightning.transforms.clone();
    if let Some(boost) = boost {
        pipeline.push(Arc::new(boost.clone()));
    }
    if let Some(stable) = &stable {
        pipeline.push(Arc::new(stable.clone()));
    }

    let mut stylesheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: "knighted.css".to_string(),
            css_modules: lightning.css_modules.then(css_modules::Config::default),
            ..Default::default()
        },
    )
    .map_err(CssError::stylesheet)?;

    if !pipeline.is_empty() {
        if let Err(never) = stylesheet.visit(&mut pipeline) {
            match never {}
        }
    }

    if lightning.css_modules {
        split_composes_rules(&mut stylesheet.rules);
    }

    if lightning.minify {
        stylesheet
            .minify(MinifyOptions::default())
            .map_err(CssError::stylesheet)?;
    }

    let result = stylesheet
        .to_css(PrinterOptions {
            minify: lightning.minify,
            ..Default::default()
        })
        .map_err(CssError::stylesheet)?;

    let modules = result.exports.map(|exports| match &stable {
        Some(stable) => stable.stabilize_exports(&exports),
        None => stable::plain_exports(&exports),
    });

    tracing::debug!(
        input_bytes = css.len(),
        output_bytes = result.code.len(),
        transforms = pipeline.len(),
        "lightningcss pass complete"
    );

    Ok(Processed {
        css: result.code,
        modules,
    })
}

fn is_single_class(selector: &Selector<'_>) -> bool {
    let mut components = selector.iter_raw_match_order();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Class(_)), None)
    )
}

/// `composes` is only valid on rules whose selectors are all single classes.
/// Appended selectors move into a sibling rule that keeps every declaration
/// except `composes`.
fn split_composes_rules(rules: &mut CssRuleList<'_>) {
    let mut index = 0;
    while index < rules.0.len() {
        let mut sibling = None;
        match &mut rules.0[index] {
            CssRule::Style(style) => {
                let has_composes = style
                    .declarations
                    .declarations
                    .iter()
                    .chain(style.declarations.important_declarations.iter())
                    .any(|p| matches!(p, Property::Composes(_)));
                let singles = style.selectors.0.iter().filter(|s| is_single_class(s)).count();
                if has_composes && singles > 0 && singles < style.selectors.0.len() {
                    let mut other = style.clone();
                    style.selectors.0.retain(|s| is_single_class(s));
                    other.selectors.0.retain(|s| !is_single_class(s));
                    other
                        .declarations
                        .declarations
                        .retain(|p| !matches!(p, Property::Composes(_)));
                    other
                        .declarations
                        .important_declarations
                        .retain(|p| !matches!(p, Property::Composes(_)));
                    sibling = Some(CssRule::Style(other));
                }
            }
            CssRule::Media(media) => split_composes_rules(&mut media.rules),
            CssRule::Supports(supports) => split_composes_rules(&mut supports.rules),
            CssRule::LayerBlock(layer) => split_composes_rules(&mut layer.rules),
            CssRule::Container(container) => split_composes_rules(&mut container.rules),
            _ => {}
        }
        if let Some(rule) = sibling {
            rules.0.insert(index + 1, rule);
            index += 1;
        }
        index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squash(css: &str) -> String {
        css.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn auto_stable_appends_stable_selector() {
        let out = process(
            ".foo { color: red }",
            &LightningOptions::default(),
            &AutoStableOption::Enabled,
            None,
        )
        .unwrap();
        assert!(squash(&out.css).contains(".foo, .knighted-foo {"), "{}", out.css);
        assert!(out.modules.is_none());
    }

    #[test]
    fn stable_variants_keep_compound_order() {
        let out = process(
            "a.foo:hover { color: red }\n.btn.active > span.label { color: blue }\n.card .title::before { content: '' }",
            &LightningOptions::default(),
            &AutoStableOption::Enabled,
            None,
        )
        .unwrap();
        let css = squash(&out.css).replace("::", ":");
        assert!(css.contains("a.foo:hover, a.knighted-foo:hover {"), "{css}");
        assert!(
            css.contains(".btn.active > span.label, .knighted-btn.knighted-active > span.knighted-label {"),
            "{css}"
        );
        assert!(
            css.contains(".card .title:before, .knighted-card .knighted-title:before {"),
            "{css}"
        );
    }

    #[test]
    fn stable_variants_inside_nested_lists() {
        let out = process(
            "div:not(.muted.dim) > p { color: red }",
            &LightningOptions::default(),
            &AutoStableOption::Enabled,
            None,
        )
        .unwrap();
        let css = squash(&out.css);
        assert!(
            css.contains("div:not(.knighted-muted.knighted-dim) > p {"),
            "{css}"
        );
    }

    #[test]
    fn boost_and_stable_compose() {
        let out = process(
            "li.item:hover { color: red }",
            &LightningOptions::default().with_minify(true),
            &AutoStableOption::Enabled,
            Some(&SpecificityBoost::repeat_class(1)),
        )
        .unwrap();
        assert_eq!(
            out.css,
            "li.item.item:hover,li.knighted-item.knighted-item:hover{color:red}"
        );
    }

    #[test]
    fn global_subtrees_are_left_alone() {
        let out = process(
            ":global(.page) .foo { color: red }",
            &LightningOptions::default().with_css_modules(true),
            &AutoStableOption::Enabled,
            None,
        )
        .unwrap();
        assert!(!out.css.contains("knighted-page"), "{}", out.css);
        assert!(out.css.contains("knighted-foo"), "{}", out.css);
    }

    #[test]
    fn composes_exports_include_stable_classes() {
        let css = ".base { color: blue }\n.button { composes: base; color: red }";
        let out = process(
            css,
            &LightningOptions::default().with_css_modules(true),
            &AutoStableOption::Enabled,
            None,
        )
        .unwrap();

        assert!(out.css.contains(".knighted-base"), "{}", out.css);
        assert!(out.css.contains(".knighted-button"), "{}", out.css);
        let modules = out.modules.unwrap();
        let button = &modules["button"];
        assert!(button.contains("knighted-button"), "{button}");
        assert!(button.contains("knighted-base"), "{button}");
        assert!(!modules["base"].contains("knighted-button"));
    }

    #[test]
    fn minify_runs_on_the_whole_sheet() {
        let out = process(
            ".a { color: red }\n.a { margin: 0 }",
            &LightningOptions::default().with_minify(true),
            &AutoStableOption::Disabled,
            None,
        )
        .unwrap();
        assert_eq!(out.css, ".a{color:red;margin:0}");
    }
}
