//! Stable selector naming, collection and literal generation.

use knighted_css::{
    LiteralTarget, build_stable_selectors_literal, collect_stable_selectors, stable_class_name,
};
use proptest::prelude::*;

#[test]
fn blank_namespace_warns_exactly_once() {
    let mut warnings = Vec::new();
    let out = build_stable_selectors_literal(
        ".knighted-card { color: red }",
        "   ",
        "/src/card.css",
        LiteralTarget::TypeScript,
        &mut |message| warnings.push(message),
    );

    assert_eq!(
        out.literal,
        "export const stableSelectors = Object.freeze({} as const);"
    );
    assert!(out.selector_map.is_empty());
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("/src/card.css"));
}

#[test]
fn collects_global_and_nested_selectors() {
    let css = ":global(.knighted-shell) .x { color: red }\n\
               .a:not(.knighted-muted) { color: blue }\n\
               .knighted-card::before { content: '' }";
    let map = collect_stable_selectors(css, "knighted");
    assert_eq!(
        map.iter().collect::<Vec<_>>(),
        vec![
            ("shell", "knighted-shell"),
            ("muted", "knighted-muted"),
            ("card", "knighted-card"),
        ]
    );
}

#[test]
fn literal_quotes_keys() {
    let out = build_stable_selectors_literal(
        ".acme-card, .acme-card-title { color: red }",
        "acme",
        "/src/card.css",
        LiteralTarget::JavaScript,
        &mut |_| {},
    );
    assert_eq!(
        out.literal,
        "export const stableSelectors = Object.freeze({\n  \"card\": \"acme-card\",\n  \"card-title\": \"acme-card-title\"\n});"
    );
}

proptest! {
    #[test]
    fn collected_values_are_namespace_plus_token(tokens in prop::collection::vec("[a-z][a-z0-9_]{0,8}", 1..6)) {
        let css: String = tokens
            .iter()
            .map(|t| format!(".{} {{ color: red }}\n", stable_class_name(t, "ns")))
            .collect();
        let map = collect_stable_selectors(&css, "ns");
        for token in &tokens {
            let expected = format!("ns-{token}");
            prop_assert_eq!(map.get(token), Some(expected.as_str()));
        }
        for (key, value) in map.iter() {
            prop_assert_eq!(value, format!("ns-{key}"));
        }
    }
}
