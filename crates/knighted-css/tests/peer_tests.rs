//! Peer compiler dispatch with substituted compilers.

mod helpers;

use async_trait::async_trait;
use helpers::Project;
use knighted_css::{
    CssError, CssOptions, LegacyCallback, LegacyRenderOptions, LegacyRenderResult, LessRender,
    LessRenderOptions, LessRenderOutput, PeerError, PeerExports, PeerModule, PeerResolver,
    SassLegacyRender, css, css_with_meta,
};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Serves a fixed module for one peer name.
struct FixedPeers {
    name: &'static str,
    module: PeerModule,
}

#[async_trait]
impl PeerResolver for FixedPeers {
    async fn resolve(&self, name: &str, _cwd: &Path) -> Option<PeerModule> {
        (name == self.name).then(|| self.module.clone())
    }
}

fn with_peer(project: &Project, name: &'static str, module: PeerModule) -> CssOptions {
    CssOptions::new(project.root()).with_peers(Arc::new(FixedPeers { name, module }))
}

/// Legacy `render` that answers from another thread.
struct ThreadedRender {
    outcome: Result<Option<&'static str>, &'static str>,
    seen: Arc<Mutex<Vec<LegacyRenderOptions>>>,
}

impl SassLegacyRender for ThreadedRender {
    fn render(&self, options: LegacyRenderOptions, callback: LegacyCallback) {
        self.seen.lock().unwrap().push(options);
        let outcome = self.outcome;
        std::thread::spawn(move || {
            let result = match outcome {
                Ok(Some(css)) => Ok(Some(LegacyRenderResult {
                    css: css.as_bytes().to_vec(),
                })),
                Ok(None) => Ok(None),
                Err(message) => Err(PeerError::new(message)),
            };
            callback(result);
        });
    }
}

#[tokio::test]
async fn legacy_render_only_peer_yields_callback_css() {
    let project = Project::new();
    let entry = project.file("src/app.scss", ".app { color: red; }");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let module = PeerModule::from_default(PeerExports::default().with_render(Arc::new(
        ThreadedRender {
            outcome: Ok(Some(".legacy{color:red}")),
            seen: Arc::clone(&seen),
        },
    )));

    let out = css("./src/app.scss", &with_peer(&project, "sass", module))
        .await
        .unwrap();

    assert_eq!(out, ".legacy{color:red}");
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].file, entry);
    assert_eq!(seen[0].include_paths[0], project.root().join("src"));
}

#[tokio::test]
async fn legacy_render_without_payload_is_empty() {
    let project = Project::new();
    project.file("a.scss", "");
    let module = PeerModule::from_namespace(PeerExports::default().with_render(Arc::new(
        ThreadedRender {
            outcome: Ok(None),
            seen: Arc::default(),
        },
    )));

    let out = css("./a.scss", &with_peer(&project, "sass", module))
        .await
        .unwrap();
    assert_eq!(out, "");
}

#[tokio::test]
async fn legacy_render_error_is_verbatim() {
    let project = Project::new();
    project.file("a.scss", ".a { color: $missing; }");
    let module = PeerModule::from_namespace(PeerExports::default().with_render(Arc::new(
        ThreadedRender {
            outcome: Err("Undefined variable: $missing"),
            seen: Arc::default(),
        },
    )));

    let err = css("./a.scss", &with_peer(&project, "sass", module))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Undefined variable: $missing");
}

#[tokio::test]
async fn peer_without_any_api_is_rejected() {
    let project = Project::new();
    project.file("a.scss", ".a {}");
    let module = PeerModule::from_namespace(PeerExports::default());

    let err = css("./a.scss", &with_peer(&project, "sass", module))
        .await
        .unwrap_err();
    assert!(
        err.to_string()
            .contains("does not expose compileAsync or render APIs"),
        "{err}"
    );
}

#[tokio::test]
async fn missing_peer_names_the_dialect() {
    let project = Project::new();
    project.file("a.less", "@c: red; .a { color: @c; }");
    let options = with_peer(&project, "sass", PeerModule::from_namespace(PeerExports::default()));

    let err = css("./a.less", &options).await.unwrap_err();
    match err {
        CssError::MissingPeer { peer, dialect } => {
            assert_eq!(peer, "less");
            assert_eq!(dialect.as_str(), "less");
        }
        other => panic!("unexpected error: {other}"),
    }
}

struct UpperLess;

#[async_trait]
impl LessRender for UpperLess {
    async fn render(
        &self,
        source: &str,
        options: LessRenderOptions,
    ) -> Result<LessRenderOutput, PeerError> {
        let import = options.paths[0].join("vars.less");
        Ok(LessRenderOutput {
            css: source.replace("@c", "red"),
            imports: vec![import],
        })
    }
}

#[tokio::test]
async fn less_render_output_and_imports_are_recorded() {
    let project = Project::new();
    project.file("styles/vars.less", "@c: red;");
    project.file("styles/a.less", ".a { color: @c; }");
    let module =
        PeerModule::from_default(PeerExports::default().with_less_render(Arc::new(UpperLess)));

    let result = css_with_meta("./styles/a.less", &with_peer(&project, "less", module))
        .await
        .unwrap();
    assert_eq!(result.css, ".a { color: red; }");
    assert!(result.files.contains(&project.root().join("styles/vars.less")));
}
