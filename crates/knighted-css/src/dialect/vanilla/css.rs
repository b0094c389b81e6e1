//! CSS text helpers for evaluated style objects.

/// Properties whose numeric values take no unit.
const UNITLESS: &[&str] = &[
    "animation-iteration-count",
    "aspect-ratio",
    "border-image-outset",
    "border-image-slice",
    "border-image-width",
    "box-flex",
    "box-flex-group",
    "box-ordinal-group",
    "column-count",
    "columns",
    "fill-opacity",
    "flex",
    "flex-grow",
    "flex-negative",
    "flex-order",
    "flex-positive",
    "flex-shrink",
    "flood-opacity",
    "font-weight",
    "grid-area",
    "grid-column",
    "grid-column-end",
    "grid-column-span",
    "grid-column-start",
    "grid-row",
    "grid-row-end",
    "grid-row-span",
    "grid-row-start",
    "line-clamp",
    "line-height",
    "opacity",
    "order",
    "orphans",
    "scale",
    "stop-opacity",
    "stroke-dasharray",
    "stroke-dashoffset",
    "stroke-miterlimit",
    "stroke-opacity",
    "stroke-width",
    "tab-size",
    "widows",
    "z-index",
    "zoom",
];

/// `backgroundColor` -> `background-color`, `WebkitTapHighlightColor` ->
/// `-webkit-tap-highlight-color`. Custom properties pass through.
pub fn kebab_case(property: &str) -> String {
    if property.starts_with("--") {
        return property.to_string();
    }
    let mut out = String::with_capacity(property.len() + 4);
    for (i, ch) in property.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            // A leading capital is a vendor prefix (Webkit, Moz).
            if i > 0 || property.len() > 1 {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    if out.starts_with("-ms-") || !out.starts_with("ms-") {
        out
    } else {
        format!("-{out}")
    }
}

pub fn is_unitless(property: &str) -> bool {
    property.starts_with("--") || UNITLESS.contains(&property)
}

/// Format a JS number the way it stringifies.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Numeric declaration value: `px` unless the property is unitless or the value is 0.
pub fn numeric_value(property: &str, value: f64) -> String {
    if value == 0.0 || is_unitless(property) {
        format_number(value)
    } else {
        format!("{}px", format_number(value))
    }
}

/// One emitted block, nested inside zero or more conditional at-rules.
#[derive(Debug, Clone)]
pub struct Block {
    pub conditions: Vec<String>,
    pub prelude: String,
    pub declarations: Vec<(String, String)>,
}

impl Block {
    pub fn render(&self, out: &mut String) {
        if self.declarations.is_empty() {
            return;
        }
        let mut depth = 0;
        for condition in &self.conditions {
            indent(out, depth);
            out.push_str(condition);
            out.push_str(" {\n");
            depth += 1;
        }
        indent(out, depth);
        out.push_str(&self.prelude);
        out.push_str(" {\n");
        for (property, value) in &self.declarations {
            indent(out, depth + 1);
            out.push_str(property);
            out.push_str(": ");
            out.push_str(value);
            out.push_str(";\n");
        }
        for level in (0..=depth).rev() {
            indent(out, level);
            out.push_str("}\n");
        }
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_case_to_kebab() {
        assert_eq!(kebab_case("backgroundColor"), "background-color");
        assert_eq!(kebab_case("color"), "color");
        assert_eq!(kebab_case("--brand-color"), "--brand-color");
        assert_eq!(
            kebab_case("WebkitTapHighlightColor"),
            "-webkit-tap-highlight-color"
        );
        assert_eq!(kebab_case("msFlexAlign"), "-ms-flex-align");
    }

    #[test]
    fn numbers_get_px_unless_unitless() {
        assert_eq!(numeric_value("padding", 12.0), "12px");
        assert_eq!(numeric_value("margin", 0.0), "0");
        assert_eq!(numeric_value("opacity", 0.5), "0.5");
        assert_eq!(numeric_value("z-index", 10.0), "10");
        assert_eq!(numeric_value("width", -4.5), "-4.5px");
    }

    #[test]
    fn renders_nested_conditions() {
        let block = Block {
            conditions: vec!["@media (min-width: 600px)".to_string()],
            prelude: ".card".to_string(),
            declarations: vec![("padding".to_string(), "8px".to_string())],
        };
        let mut out = String::new();
        block.render(&mut out);
        assert_eq!(
            out,
            "@media (min-width: 600px) {\n  .card {\n    padding: 8px;\n  }\n}\n"
        );
    }
}
