//! Resource-query flags.
//!
//! A query is `?` followed by `&`-joined `key` or `key=value` tokens. Keys
//! are compared after percent-decoding; tokens are otherwise kept byte for
//! byte so downstream loaders see their own options untouched.

use percent_encoding::percent_decode_str;

/// Marker that routes a request through the loader.
pub const MARKER: &str = "knighted-css";
pub const COMBINED: &str = "combined";
pub const NAMED_ONLY: &str = "named-only";
pub const NO_DEFAULT: &str = "no-default";
pub const TYPES: &str = "types";
pub const STABLE_NAMESPACE: &str = "stableNamespace";
pub const EXPORT_NAME: &str = "exportName";

const RECOGNIZED: &[&str] = &[
    MARKER,
    COMBINED,
    NAMED_ONLY,
    NO_DEFAULT,
    TYPES,
    STABLE_NAMESPACE,
    EXPORT_NAME,
];

/// Canonical view of a resource query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFlagSet {
    /// `knighted-css` marker present.
    pub marker: bool,
    pub combined: bool,
    /// `named-only` or `no-default`.
    pub skip_synthetic_default: bool,
    pub types_requested: bool,
    /// `types` or a namespace override is present.
    pub stable_requested: bool,
    pub stable_namespace: Option<String>,
    pub export_name: Option<String>,
    /// Residual query with every recognized flag removed.
    pub sanitized: String,
}

fn tokens(query: &str) -> impl Iterator<Item = &str> {
    query
        .strip_prefix('?')
        .unwrap_or(query)
        .split('&')
        .filter(|token| !token.is_empty())
}

fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

fn split_token(token: &str) -> (String, Option<String>) {
    match token.split_once('=') {
        Some((key, value)) => (decode(key), Some(decode(value))),
        None => (decode(token), None),
    }
}

fn is_recognized(token: &str) -> bool {
    let (key, _) = split_token(token);
    RECOGNIZED.contains(&key.as_str())
}

/// Parse a resource query. Flags are case-sensitive and may repeat.
pub fn parse_flags(query: &str) -> QueryFlagSet {
    let mut flags = QueryFlagSet {
        sanitized: build_sanitized_query(query),
        ..Default::default()
    };

    for token in tokens(query) {
        let (key, value) = split_token(token);
        match key.as_str() {
            MARKER => flags.marker = true,
            COMBINED => flags.combined = true,
            NAMED_ONLY | NO_DEFAULT => flags.skip_synthetic_default = true,
            TYPES => flags.types_requested = true,
            STABLE_NAMESPACE => {
                if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                    flags.stable_namespace = Some(value);
                }
            }
            EXPORT_NAME => {
                if let Some(value) = value.filter(|v| !v.is_empty()) {
                    flags.export_name = Some(value);
                }
            }
            _ => {}
        }
    }

    flags.stable_requested = flags.types_requested || flags.stable_namespace.is_some();
    flags
}

/// Strip every recognized flag. Returns `""` when nothing is left.
pub fn build_sanitized_query(query: &str) -> String {
    let kept: Vec<&str> = tokens(query).filter(|t| !is_recognized(t)).collect();
    if kept.is_empty() {
        String::new()
    } else {
        format!("?{}", kept.join("&"))
    }
}

/// Append `extra` tokens to a query string that may be empty.
pub fn append_query(query: &str, extra: &str) -> String {
    match (query.is_empty(), extra.is_empty()) {
        (_, true) => query.to_string(),
        (true, false) => format!("?{extra}"),
        (false, false) => format!("{query}&{extra}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_recognized_flags_in_order() {
        assert_eq!(
            build_sanitized_query("?knighted-css&combined&named-only&foo=bar&no-default&baz=qux"),
            "?foo=bar&baz=qux"
        );
        assert_eq!(build_sanitized_query("?knighted-css&types"), "");
        assert_eq!(build_sanitized_query(""), "");
        assert_eq!(
            build_sanitized_query("?%6B%6E%69%67%68%74%65%64-css&modules=%7B%7D"),
            "?modules=%7B%7D"
        );
        assert_eq!(
            build_sanitized_query("?stableNamespace=acme&exportName=css&keep"),
            "?keep"
        );
    }

    #[test]
    fn parses_flag_set() {
        let flags = parse_flags("?knighted-css&combined&no-default&types&x=1");
        assert!(flags.marker);
        assert!(flags.combined);
        assert!(flags.skip_synthetic_default);
        assert!(flags.types_requested);
        assert!(flags.stable_requested);
        assert_eq!(flags.sanitized, "?x=1");
    }

    #[test]
    fn namespace_override_requests_stable_selectors() {
        let flags = parse_flags("?knighted-css&stableNamespace=acme&exportName=styles");
        assert!(!flags.types_requested);
        assert!(flags.stable_requested);
        assert_eq!(flags.stable_namespace.as_deref(), Some("acme"));
        assert_eq!(flags.export_name.as_deref(), Some("styles"));
    }

    #[test]
    fn flags_are_case_sensitive() {
        let flags = parse_flags("?Combined&TYPES");
        assert!(!flags.combined);
        assert!(!flags.types_requested);
        assert_eq!(flags.sanitized, "?Combined&TYPES");
    }

    #[test]
    fn appends_to_empty_and_existing_queries() {
        assert_eq!(append_query("", "knighted-css"), "?knighted-css");
        assert_eq!(append_query("?a=1", "knighted-css"), "?a=1&knighted-css");
        assert_eq!(append_query("?a=1", ""), "?a=1");
    }

    proptest! {
        #[test]
        fn sanitizing_is_idempotent(parts in prop::collection::vec(
            prop_oneof![
                Just("knighted-css".to_string()),
                Just("combined".to_string()),
                Just("types".to_string()),
                Just("no-default".to_string()),
                "[a-z%0-9]{1,6}(=[a-z0-9%]{0,4})?",
            ],
            0..8,
        )) {
            let query = format!("?{}", parts.join("&"));
            let once = build_sanitized_query(&query);
            prop_assert_eq!(build_sanitized_query(&once), once.clone());
            prop_assert_eq!(parse_flags(&once).sanitized, once);
        }
    }
}
