//! Shared fixtures for loader integration tests.

#![allow(dead_code)]

use oxc_allocator::Allocator;
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

use knighted_css_loader::LoaderHost;

/// A throwaway project directory.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn file(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture dir");
        }
        std::fs::write(&path, contents).expect("write fixture");
        path
    }
}

/// Host that records what the loader reports.
#[derive(Default)]
pub struct RecordingHost {
    pub dependencies: Mutex<Vec<PathBuf>>,
    pub warnings: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub fn dependencies(&self) -> Vec<PathBuf> {
        self.dependencies.lock().expect("lock").clone()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().expect("lock").clone()
    }
}

impl LoaderHost for RecordingHost {
    fn add_dependency(&self, path: &Path) {
        self.dependencies.lock().expect("lock").push(path.to_path_buf());
    }

    fn emit_warning(&self, message: String) {
        self.warnings.lock().expect("lock").push(message);
    }
}

/// Assert `source` parses as an ES module of the given type.
pub fn assert_parses(source: &str, source_type: SourceType) {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type).parse();
    assert!(
        !ret.panicked && ret.errors.is_empty(),
        "generated module does not parse: {:?}\n{source}",
        ret.errors
    );
}

pub fn js() -> SourceType {
    SourceType::mjs()
}

pub fn ts() -> SourceType {
    SourceType::ts()
}
