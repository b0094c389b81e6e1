//! Specifier classification.

use std::path::PathBuf;

/// Split `path?query` into its parts. The query keeps its leading `?`.
pub fn split_query(specifier: &str) -> (&str, &str) {
    match specifier.find('?') {
        Some(idx) => (&specifier[..idx], &specifier[idx..]),
        None => (specifier, ""),
    }
}

/// What kind of module reference a specifier is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecifierKind {
    /// `file://` URL, already decoded to a path.
    FileUrl(PathBuf),
    /// `node:`, `http:`, `data:` and any other non-file scheme.
    ForeignScheme,
    Absolute,
    Relative,
    /// Package name, `#imports` entry, or tsconfig path alias.
    Bare,
}

pub fn classify(specifier: &str) -> SpecifierKind {
    if let Some(scheme) = scheme_of(specifier) {
        if scheme.eq_ignore_ascii_case("file") {
            return match url::Url::parse(specifier)
                .ok()
                .and_then(|u| u.to_file_path().ok())
            {
                Some(path) => SpecifierKind::FileUrl(path),
                None => SpecifierKind::ForeignScheme,
            };
        }
        return SpecifierKind::ForeignScheme;
    }

    if specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == ".." {
        SpecifierKind::Relative
    } else if std::path::Path::new(specifier).is_absolute() || specifier.starts_with('/') {
        SpecifierKind::Absolute
    } else {
        SpecifierKind::Bare
    }
}

/// `scheme:` prefix per RFC 3986, ignoring Windows drive letters.
fn scheme_of(specifier: &str) -> Option<&str> {
    let colon = specifier.find(':')?;
    let scheme = &specifier[..colon];
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) {
        return None;
    }
    // `C:\styles` / `C:/styles`
    if scheme.len() == 1 {
        return None;
    }
    Some(scheme)
}
