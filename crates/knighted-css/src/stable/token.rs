//! Stable class naming.

/// Token used when sanitization leaves nothing.
const FALLBACK_TOKEN: &str = "stable";

/// Sanitize a class token into `[A-Za-z0-9_-]+`.
///
/// Whitespace runs and other characters become single hyphens, hyphen runs
/// collapse, and leading/trailing hyphens are dropped. Idempotent.
pub fn stable_token(token: &str) -> String {
    let mut out = String::with_capacity(token.len());
    let mut last_hyphen = false;

    for ch in token.trim().chars() {
        let mapped = if ch.is_ascii_alphanumeric() || ch == '_' {
            ch
        } else {
            '-'
        };
        if mapped == '-' {
            if !last_hyphen {
                out.push('-');
            }
            last_hyphen = true;
        } else {
            out.push(mapped);
            last_hyphen = false;
        }
    }

    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        FALLBACK_TOKEN.to_string()
    } else {
        trimmed.to_string()
    }
}

/// `${namespace}-${stable_token(token)}`, or the bare token for a blank namespace.
pub fn stable_class_name(token: &str, namespace: &str) -> String {
    let token = stable_token(token);
    let namespace = namespace.trim();
    if namespace.is_empty() {
        token
    } else {
        format!("{namespace}-{token}")
    }
}

/// Selector form of [`stable_class_name`].
pub fn stable_selector(token: &str, namespace: &str) -> String {
    format!(".{}", stable_class_name(token, namespace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn sanitizes_tokens() {
        assert_eq!(stable_token("card"), "card");
        assert_eq!(stable_token("  primary   button "), "primary-button");
        assert_eq!(stable_token("a/b:c"), "a-b-c");
        assert_eq!(stable_token("--x--y--"), "x-y");
        assert_eq!(stable_token("日本"), "stable");
        assert_eq!(stable_token("   "), "stable");
        assert_eq!(stable_token("snake_case"), "snake_case");
    }

    #[test]
    fn names_with_namespace() {
        assert_eq!(stable_class_name("card", "knighted"), "knighted-card");
        assert_eq!(stable_class_name("card title", "acme"), "acme-card-title");
        assert_eq!(stable_class_name("card", "  "), "card");
        assert_eq!(stable_selector("card", "knighted"), ".knighted-card");
    }

    proptest! {
        #[test]
        fn sanitizing_is_idempotent(token in ".*") {
            let once = stable_token(&token);
            prop_assert_eq!(stable_token(&once), once.clone());
            prop_assert!(once.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
        }
    }
}
