//! Selector transform composition.
//!
//! A transform is a pure `Selector -> Selector` rewrite plus a changed flag.
//! [`TransformPipeline`] applies transforms in the order given to every
//! style rule's selector list while visiting a stylesheet.

use lightningcss::rules::CssRule;
use lightningcss::selector::{Component, Selector, SelectorList};
use lightningcss::visit_types;
use lightningcss::visitor::{Visit, VisitTypes, Visitor};
use std::convert::Infallible;
use std::sync::Arc;

/// Components of `selector` in source order, ready for `Selector::from`.
///
/// Raw storage keeps compounds right to left while each compound's simple
/// selectors stay in source order, so whole compounds are reversed.
pub fn parse_order<'i>(selector: &Selector<'i>) -> Vec<Component<'i>> {
    let mut compounds: Vec<Vec<Component<'i>>> = vec![Vec::new()];
    let mut combinators: Vec<Component<'i>> = Vec::new();
    for component in selector.iter_raw_match_order() {
        if matches!(component, Component::Combinator(_)) {
            combinators.push(component.clone());
            compounds.push(Vec::new());
        } else if let Some(compound) = compounds.last_mut() {
            compound.push(component.clone());
        }
    }

    let mut out = Vec::with_capacity(selector.iter_raw_match_order().len());
    let mut combinators = combinators.into_iter().rev();
    for (index, compound) in compounds.into_iter().rev().enumerate() {
        if index > 0 {
            out.extend(combinators.next());
        }
        out.extend(compound);
    }
    out
}

/// How a transform's output is merged into the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformMode {
    /// Keep the original and add the rewrite if it is new.
    Append,
    /// Substitute the rewrite for the original.
    Replace,
}

/// Result of rewriting one selector.
#[derive(Debug, Clone)]
pub struct Rewrite<'i> {
    pub selector: Selector<'i>,
    pub changed: bool,
}

impl<'i> Rewrite<'i> {
    pub fn unchanged(selector: &Selector<'i>) -> Self {
        Self {
            selector: selector.clone(),
            changed: false,
        }
    }
}

/// A pure selector rewrite.
pub trait SelectorTransform: Send + Sync {
    fn mode(&self) -> TransformMode;

    fn rewrite<'i>(&self, selector: &Selector<'i>) -> Rewrite<'i>;
}

/// Applies transforms sequentially to every style rule.
#[derive(Clone, Default)]
pub struct TransformPipeline {
    transforms: Vec<Arc<dyn SelectorTransform>>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, transform: Arc<dyn SelectorTransform>) {
        self.transforms.push(transform);
    }

    pub fn with(mut self, transform: Arc<dyn SelectorTransform>) -> Self {
        self.push(transform);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.transforms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.transforms.len()
    }

    /// Run every transform over one selector list.
    pub fn apply(&self, list: &mut SelectorList<'_>) {
        for transform in &self.transforms {
            match transform.mode() {
                TransformMode::Replace => {
                    for selector in list.0.iter_mut() {
                        let rewrite = transform.rewrite(selector);
                        if rewrite.changed {
                            *selector = rewrite.selector;
                        }
                    }
                }
                TransformMode::Append => {
                    let originals = list.0.len();
                    for index in 0..originals {
                        let rewrite = transform.rewrite(&list.0[index]);
                        if rewrite.changed && !list.0.contains(&rewrite.selector) {
                            list.0.push(rewrite.selector);
                        }
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for TransformPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformPipeline")
            .field("transforms", &self.transforms.len())
            .finish()
    }
}

impl<'i> Visitor<'i> for TransformPipeline {
    type Error = Infallible;

    fn visit_types(&self) -> VisitTypes {
        visit_types!(RULES)
    }

    fn visit_rule(&mut self, rule: &mut CssRule<'i>) -> Result<(), Self::Error> {
        if let CssRule::Style(style) = rule {
            self.apply(&mut style.selectors);
        }
        rule.visit_children(self)
    }
}
