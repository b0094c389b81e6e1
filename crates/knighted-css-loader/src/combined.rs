//! Combined module planning: upstream exports plus compiled CSS.

use crate::codegen::{Expr, ProxyModule};

pub const UPSTREAM_ALIAS: &str = "__knightedUpstream";
pub const CSS_ALIAS: &str = "__knightedCss";
pub const DEFAULT_ALIAS: &str = "__knightedDefault";
pub const MODULES_ALIAS: &str = "__knightedModules";

/// Export name of the CSS Modules map.
pub const MODULES_EXPORT: &str = "knightedCssModules";
/// Export name of the stable selector map.
pub const STABLE_EXPORT: &str = "stableSelectors";

/// Inputs for [`plan_combined_module`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedPlan<'a> {
    /// The original module, with loader flags stripped.
    pub upstream: &'a str,
    /// The same resource requested as a CSS payload.
    pub css_proxy: &'a str,
    pub export_name: &'a str,
    /// Export the CSS Modules map.
    pub include_modules: bool,
    /// Forward `stableSelectors` from the CSS payload.
    pub include_stable: bool,
    pub emit_default: bool,
}

/// Plan a combined module.
///
/// Imports the upstream module and the CSS payload, computes the default
/// and the CSS Modules map, exports the CSS text (and optionally the map and
/// selectors), re-exports the upstream, and finally the default if allowed.
pub fn plan_combined_module(plan: &CombinedPlan<'_>) -> ProxyModule {
    let mut module = ProxyModule::default();
    module.import(UPSTREAM_ALIAS, plan.upstream);
    module.import(CSS_ALIAS, plan.css_proxy);

    module.constant(DEFAULT_ALIAS, Expr::DefaultOrNamespace(UPSTREAM_ALIAS.to_string()));
    module.constant(MODULES_ALIAS, Expr::ModulesOf(vec![CSS_ALIAS.to_string()]));

    module.export(
        plan.export_name,
        Expr::Member {
            object: CSS_ALIAS.to_string(),
            property: plan.export_name.to_string(),
        },
    );
    if plan.include_modules {
        module.export(MODULES_EXPORT, Expr::Ident(MODULES_ALIAS.to_string()));
    }
    if plan.include_stable {
        module.export(
            STABLE_EXPORT,
            Expr::Member {
                object: CSS_ALIAS.to_string(),
                property: STABLE_EXPORT.to_string(),
            },
        );
    }

    module.reexports.push(plan.upstream.to_string());

    if plan.emit_default {
        module.default_export = Some(Expr::Ident(DEFAULT_ALIAS.to_string()));
    }
    module
}
