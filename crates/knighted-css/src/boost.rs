//! Specificity boosting.
//!
//! Raises the specificity of a selector by repeating a class of its last
//! compound, e.g. `.card .title` becomes `.card .title.title`.

use lightningcss::selector::{Component, Selector};
use regex::Regex;

use crate::stable::{Rewrite, SelectorTransform, TransformMode, parse_order};

/// How a selector's specificity is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoostStrategy {
    /// Repeat the last matching class `times` extra times.
    RepeatClass { times: usize },
}

impl Default for BoostStrategy {
    fn default() -> Self {
        BoostStrategy::RepeatClass { times: 1 }
    }
}

/// Replace-mode transform that boosts selectors ending in a class.
#[derive(Debug, Clone, Default)]
pub struct SpecificityBoost {
    pub strategy: BoostStrategy,
    /// Class-token patterns. Empty matches every class.
    pub patterns: Vec<Regex>,
}

impl SpecificityBoost {
    pub fn repeat_class(times: usize) -> Self {
        Self {
            strategy: BoostStrategy::RepeatClass { times },
            patterns: Vec::new(),
        }
    }

    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.patterns.push(pattern);
        self
    }

    fn matches(&self, token: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| p.is_match(token))
    }
}

impl SelectorTransform for SpecificityBoost {
    fn mode(&self) -> TransformMode {
        TransformMode::Replace
    }

    fn rewrite<'i>(&self, selector: &Selector<'i>) -> Rewrite<'i> {
        let BoostStrategy::RepeatClass { times } = self.strategy;
        if times == 0 {
            return Rewrite::unchanged(selector);
        }

        let components = parse_order(selector);
        // Pseudo-elements hang off the compound they follow.
        let compound_start = components
            .iter()
            .rposition(|c| matches!(c, Component::Combinator(comb) if !comb.is_pseudo_element()))
            .map_or(0, |i| i + 1);

        let compound = &components[compound_start..];
        let compound_end = compound
            .iter()
            .position(|c| matches!(c, Component::Combinator(_)))
            .unwrap_or(compound.len());
        let target = compound[..compound_end]
            .iter()
            .rposition(|c| matches!(c, Component::Class(ident) if self.matches(&ident.0)))
            .map(|i| i + compound_start);

        let Some(index) = target else {
            return Rewrite::unchanged(selector);
        };

        let mut boosted = Vec::with_capacity(components.len() + times);
        boosted.extend_from_slice(&components[..=index]);
        for _ in 0..times {
            boosted.push(components[index].clone());
        }
        boosted.extend_from_slice(&components[index + 1..]);

        Rewrite {
            selector: Selector::from(boosted),
            changed: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stable::TransformPipeline;
    use lightningcss::printer::PrinterOptions;
    use lightningcss::stylesheet::{ParserOptions, StyleSheet};
    use lightningcss::visitor::Visit;
    use std::sync::Arc;

    fn run(css: &str, boost: SpecificityBoost) -> String {
        let mut sheet = StyleSheet::parse(css, ParserOptions::default()).unwrap();
        let mut pipeline = TransformPipeline::new().with(Arc::new(boost));
        sheet.visit(&mut pipeline).unwrap();
        sheet
            .to_css(PrinterOptions {
                minify: true,
                ..Default::default()
            })
            .unwrap()
            .code
    }

    #[test]
    fn repeats_last_class_of_last_compound() {
        let out = run(".card .title { color: red }", SpecificityBoost::repeat_class(2));
        assert!(out.starts_with(".card .title.title.title{"), "{out}");
    }

    #[test]
    fn patterns_select_the_class() {
        let boost = SpecificityBoost::repeat_class(1).with_pattern(Regex::new("^btn").unwrap());
        let out = run(".btn.active, .card { color: red }", boost);
        assert!(out.starts_with(".btn.btn.active,.card{"), "{out}");
    }

    #[test]
    fn type_and_pseudo_class_keep_their_place() {
        let out = run("ul li.item:hover { color: red }", SpecificityBoost::repeat_class(1));
        assert!(out.starts_with("ul li.item.item:hover{"), "{out}");
    }

    #[test]
    fn boost_lands_before_a_pseudo_element() {
        let out = run(".card .title::before { color: red }", SpecificityBoost::repeat_class(1));
        assert!(out.starts_with(".card .title.title:before{"), "{out}");
    }

    #[test]
    fn only_the_last_compound_is_boosted() {
        let out = run(".btn.active > span { color: red }", SpecificityBoost::repeat_class(1));
        assert!(out.starts_with(".btn.active>span{"), "{out}");
    }

    #[test]
    fn selectors_without_a_class_are_untouched() {
        let out = run("a > span { color: red }", SpecificityBoost::repeat_class(1));
        assert!(out.starts_with("a>span{"), "{out}");
    }
}
