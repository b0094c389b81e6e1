//! End-to-end loader requests against fixtures on disk.

mod helpers;

use helpers::{Project, RecordingHost, assert_parses, js, ts};
use knighted_css::{AutoStableOption, CssError, CssOptions, LightningOptions};
use knighted_css_loader::{LoaderError, LoaderMode, LoaderOptions, LoaderRequest, load};
use std::path::Path;

fn options(project: &Project) -> LoaderOptions {
    LoaderOptions::new(CssOptions::new(project.root()))
}

fn request<'a>(path: &'a Path, query: &'a str, source: &'a str, root: &'a Path) -> LoaderRequest<'a> {
    LoaderRequest {
        resource_path: path,
        resource_query: query,
        source,
        raw_request: None,
        root_context: root,
    }
}

fn button(project: &Project) -> (std::path::PathBuf, &'static str) {
    project.file("src/button.css", ".button { color: red; }\n");
    let source = "import './button.css';\nexport default function Button() { return null; }\n";
    (project.file("src/button.tsx", source), source)
}

#[tokio::test]
async fn standard_request_appends_css_export_and_registers_files() {
    let project = Project::new();
    let (path, source) = button(&project);
    let host = RecordingHost::default();

    let out = load(
        &request(&path, "?knighted-css", source, project.root()),
        &options(&project),
        &host,
    )
    .await
    .expect("standard request");

    assert!(out.starts_with(source), "{out}");
    assert!(
        out.contains("export const knightedCss = \".button { color: red; }\\n\";"),
        "{out}"
    );
    assert!(!out.contains("stableSelectors"));
    assert!(
        host.dependencies().iter().any(|d| d.ends_with("src/button.css")),
        "{:?}",
        host.dependencies()
    );
    assert_parses(&out, ts().with_jsx(true));
}

#[tokio::test]
async fn types_request_emits_stable_selectors() {
    let project = Project::new();
    let (path, source) = button(&project);
    let host = RecordingHost::default();

    let out = load(
        &request(&path, "?knighted-css&types", source, project.root()),
        &options(&project),
        &host,
    )
    .await
    .expect("types request");

    assert!(out.contains(".knighted-button"), "{out}");
    assert!(
        out.contains(
            "export const stableSelectors = Object.freeze({\n  \"button\": \"knighted-button\"\n} as const);"
        ),
        "{out}"
    );
    assert!(host.warnings().is_empty());
}

#[tokio::test]
async fn namespace_override_and_export_name() {
    let project = Project::new();
    let path = project.file("src/card.css", ".card { margin: 0; }\n");
    let host = RecordingHost::default();

    let out = load(
        &request(
            &path,
            "?knighted-css&stableNamespace=acme&exportName=styles",
            ".card { margin: 0; }\n",
            project.root(),
        ),
        &options(&project),
        &host,
    )
    .await
    .expect("style request");

    assert!(out.starts_with("export const styles = "), "{out}");
    assert!(out.contains("\"card\": \"acme-card\""), "{out}");
    // Style resources are plain JavaScript.
    assert!(!out.contains("as const"), "{out}");
    assert_parses(&out, js());
}

#[tokio::test]
async fn invalid_export_name_warns_and_falls_back() {
    let project = Project::new();
    let (path, source) = button(&project);
    let host = RecordingHost::default();

    let out = load(
        &request(&path, "?knighted-css&exportName=my-css", source, project.root()),
        &options(&project),
        &host,
    )
    .await
    .expect("request");

    assert!(out.contains("export const knightedCss = "), "{out}");
    let warnings = host.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("exportName=my-css"), "{}", warnings[0]);
}

#[tokio::test]
async fn css_modules_map_is_exported() {
    let project = Project::new();
    let path = project.file("src/a.module.css", ".title { color: blue; }\n");
    let host = RecordingHost::default();
    let options = LoaderOptions::new(
        CssOptions::new(project.root())
            .with_lightningcss(LightningOptions::new().with_css_modules(true)),
    );

    let out = load(
        &request(&path, "?knighted-css", "", project.root()),
        &options,
        &host,
    )
    .await
    .expect("modules request");

    assert!(out.contains("export const knightedCssModules = {\"title\":"), "{out}");
    assert_parses(&out, js());
}

#[tokio::test]
async fn combined_request_forwards_upstream_and_default() {
    let project = Project::new();
    let (path, source) = button(&project);
    let host = RecordingHost::default();

    let out = load(
        &request(&path, "?knighted-css&combined&v=3", source, &project.root().join("src")),
        &options(&project),
        &host,
    )
    .await
    .expect("combined request");

    assert!(out.contains("import * as __knightedUpstream from \"./button.tsx?v=3\";"), "{out}");
    assert!(
        out.contains("import * as __knightedCss from \"./button.tsx?v=3&knighted-css\";"),
        "{out}"
    );
    assert!(out.contains("export * from \"./button.tsx?v=3\";"), "{out}");
    assert!(out.ends_with("export default __knightedDefault;\n"), "{out}");
    assert!(!out.contains("knightedCssModules ="), "{out}");
    // Combined modules are built from proxies; nothing is compiled here.
    assert!(host.dependencies().is_empty());
    assert_parses(&out, js());
}

#[tokio::test]
async fn combined_request_respects_default_policy() {
    let project = Project::new();
    project.file("src/theme.css", ".theme {}\n");
    let source = "import './theme.css';\nexport const theme = 1;\n";
    let path = project.file("src/theme.ts", source);
    let host = RecordingHost::default();
    let root = project.root().join("src");

    let absent = load(
        &request(&path, "?knighted-css&combined", source, &root),
        &options(&project),
        &host,
    )
    .await
    .expect("combined");
    assert!(!absent.contains("export default"), "{absent}");

    let (button_path, button_source) = button(&project);
    let skipped = load(
        &request(&button_path, "?knighted-css&combined&named-only", button_source, &root),
        &options(&project),
        &host,
    )
    .await
    .expect("combined");
    assert!(!skipped.contains("export default"), "{skipped}");

    let vanilla_source = "export const theme = 'x';\nexport default theme;\n";
    let vanilla = project.file("src/theme.css.ts", vanilla_source);
    let out = load(
        &request(&vanilla, "?knighted-css&combined", vanilla_source, &root),
        &options(&project),
        &host,
    )
    .await
    .expect("combined");
    assert!(!out.contains("export default"), "{out}");
}

#[tokio::test]
async fn combined_types_forwards_stable_selectors() {
    let project = Project::new();
    let (path, source) = button(&project);
    let host = RecordingHost::default();

    let out = load(
        &request(
            &path,
            "?knighted-css&combined&types&stableNamespace=acme",
            source,
            &project.root().join("src"),
        ),
        &options(&project),
        &host,
    )
    .await
    .expect("combined request");

    assert!(
        out.contains("from \"./button.tsx?knighted-css&types&stableNamespace=acme\";"),
        "{out}"
    );
    assert!(
        out.contains("export const stableSelectors = __knightedCss.stableSelectors;"),
        "{out}"
    );
}

#[tokio::test]
async fn bridge_combined_merges_module_styles() {
    let project = Project::new();
    let source = "import styles from './card.module.css';\nimport './global.css';\nexport const Card = () => styles.card;\n";
    let path = project.file("src/card.tsx", source);
    let host = RecordingHost::default();

    let out = load(
        &request(&path, "?knighted-css&combined&types", source, &project.root().join("src")),
        &options(&project).with_mode(LoaderMode::Bridge),
        &host,
    )
    .await
    .expect("bridge combined");

    assert!(
        out.contains("import * as __knightedStyle0 from \"./card.module.css?knighted-css\";"),
        "{out}"
    );
    assert!(!out.contains("global.css"), "{out}");
    assert!(out.contains("export * from \"./card.tsx\";"), "{out}");
    assert!(!out.contains("export default"), "{out}");
    assert_eq!(host.warnings().len(), 1, "types is unsupported here");
    assert_parses(&out, js());
}

#[tokio::test]
async fn bridge_style_resource_pairs_text_with_locals() {
    let project = Project::new();
    let path = project.file("src/card.module.css", ".card { padding: 0; }\n");
    let host = RecordingHost::default();

    let out = load(
        &LoaderRequest {
            resource_path: &path,
            resource_query: "?knighted-css",
            source: "",
            raw_request: Some("css-loader!./card.module.css?knighted-css"),
            root_context: &project.root().join("src"),
        },
        &options(&project).with_mode(LoaderMode::Bridge),
        &host,
    )
    .await
    .expect("bridge style");

    assert!(
        out.contains("import * as __knightedStyle from \"css-loader!./card.module.css\";"),
        "{out}"
    );
    assert!(out.contains("export const knightedCss = \".card { padding: 0; }\\n\";"), "{out}");
    assert!(out.contains("__knightedResolveModules(__knightedStyle)"), "{out}");
    assert_eq!(host.dependencies().len(), 1);
    assert_parses(&out, js());
}

#[tokio::test]
async fn bridge_combined_forwards_export_name_to_style_payloads() {
    let project = Project::new();
    let style = project.file("src/card.module.css", ".card { padding: 0; }\n");
    let source = "import styles from './card.module.css';\nexport const Card = () => styles.card;\n";
    let path = project.file("src/card.tsx", source);
    let root = project.root().join("src");
    let host = RecordingHost::default();
    let bridge = options(&project).with_mode(LoaderMode::Bridge);

    let combined = load(
        &request(&path, "?knighted-css&combined&exportName=styles", source, &root),
        &bridge,
        &host,
    )
    .await
    .expect("bridge combined");

    assert!(
        combined.contains(
            "import * as __knightedStyle0 from \"./card.module.css?knighted-css&exportName=styles\";"
        ),
        "{combined}"
    );
    assert!(
        combined.contains("export const styles = [__knightedStyle0.styles].join(\"\\n\");"),
        "{combined}"
    );

    // The request the combined module makes must export the same name.
    let payload = load(
        &request(&style, "?knighted-css&exportName=styles", "", &root),
        &bridge,
        &host,
    )
    .await
    .expect("bridge style");
    assert!(
        payload.contains("export const styles = \".card { padding: 0; }\\n\";"),
        "{payload}"
    );
    assert!(host.warnings().is_empty(), "{:?}", host.warnings());
    assert_parses(&payload, js());
}

#[tokio::test]
async fn bridge_style_resource_warns_about_combined() {
    let project = Project::new();
    let path = project.file("src/card.module.css", ".card { padding: 0; }\n");
    let host = RecordingHost::default();

    let out = load(
        &request(&path, "?knighted-css&combined", "", &project.root().join("src")),
        &options(&project).with_mode(LoaderMode::Bridge),
        &host,
    )
    .await
    .expect("bridge style");

    assert!(out.contains("export const knightedCss = "), "{out}");
    let warnings = host.warnings();
    assert_eq!(warnings.len(), 1, "{warnings:?}");
    assert!(warnings[0].contains("combined is ignored"), "{}", warnings[0]);
}

#[tokio::test]
async fn empty_modules_map_is_still_declared() {
    let project = Project::new();
    project.file("src/reset.css", "body { margin: 0; }\n");
    let source = "import './reset.css';\nexport const label = \"Save\";\n";
    let path = project.file("src/label.ts", source);
    let host = RecordingHost::default();
    let options = LoaderOptions::new(
        CssOptions::new(project.root())
            .with_lightningcss(LightningOptions::new().with_css_modules(true)),
    );

    let payload = load(
        &request(&path, "?knighted-css", source, project.root()),
        &options,
        &host,
    )
    .await
    .expect("modules request");
    assert!(payload.contains("export const knightedCssModules = {};"), "{payload}");

    // The combined helper must prefer that empty map over `label`.
    let combined = load(
        &request(&path, "?knighted-css&combined", source, &project.root().join("src")),
        &options,
        &host,
    )
    .await
    .expect("combined request");
    let declared = combined
        .find("const declared = payload.knightedCssModules;")
        .expect("declared map check");
    let fallback = combined
        .find("Object.entries(payload)")
        .expect("named export fallback");
    assert!(declared < fallback, "{combined}");
    assert!(
        combined.contains("export const knightedCssModules = __knightedModules;"),
        "{combined}"
    );
    assert_parses(&combined, js());
}

#[tokio::test]
async fn configured_namespace_drives_css_and_literal() {
    let project = Project::new();
    let (path, source) = button(&project);
    let host = RecordingHost::default();
    let options = LoaderOptions::new(CssOptions::new(project.root()).with_auto_stable(
        AutoStableOption::Custom {
            namespace: Some("brand".to_string()),
            include: None,
            exclude: None,
        },
    ));

    let out = load(
        &request(&path, "?knighted-css&types", source, project.root()),
        &options,
        &host,
    )
    .await
    .expect("types request");

    assert!(out.contains(".brand-button"), "{out}");
    assert!(!out.contains("knighted-button"), "{out}");
    assert!(out.contains("\"button\": \"brand-button\""), "{out}");
    assert!(host.warnings().is_empty(), "{:?}", host.warnings());
}

#[tokio::test]
async fn extraction_errors_keep_their_cause() {
    let project = Project::new();
    let source = "import './missing.css';\n";
    let path = project.file("src/broken.ts", source);

    let err = load(
        &request(&path, "?knighted-css", source, project.root()),
        &options(&project),
        &RecordingHost::default(),
    )
    .await
    .expect_err("missing stylesheet");

    match err {
        LoaderError::Compile(CssError::UnresolvedImport { specifier, .. }) => {
            assert_eq!(specifier, "./missing.css");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn relative_resource_paths_are_rejected() {
    let err = load(
        &request(Path::new("src/a.css"), "?knighted-css", "", Path::new("/app")),
        &LoaderOptions::default(),
        &RecordingHost::default(),
    )
    .await
    .expect_err("relative path");
    assert!(matches!(err, LoaderError::InvalidRequest { .. }));
}
