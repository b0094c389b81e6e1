//! tsconfig discovery.
//!
//! Locating the file is ours; reading it (`extends`, `baseUrl`, `paths`,
//! project references) is left to `oxc_resolver`.

use oxc_resolver::{TsconfigOptions, TsconfigReferences};
use std::path::{Path, PathBuf};

use super::TsconfigMode;

const TSCONFIG_FILE: &str = "tsconfig.json";

/// The tsconfig file `mode` selects, if any.
///
/// `Auto` walks up from `cwd` to the nearest `tsconfig.json`. An explicit
/// path may name the file or its directory.
pub fn locate_tsconfig(mode: &TsconfigMode, cwd: &Path) -> Option<PathBuf> {
    match mode {
        TsconfigMode::Off => None,
        TsconfigMode::Auto => cwd
            .ancestors()
            .map(|dir| dir.join(TSCONFIG_FILE))
            .find(|candidate| candidate.is_file()),
        TsconfigMode::Path(path) => {
            let path = if path.is_absolute() {
                path.clone()
            } else {
                cwd.join(path)
            };
            if path.is_dir() {
                Some(path.join(TSCONFIG_FILE))
            } else {
                Some(path)
            }
        }
    }
}

/// `oxc_resolver` tsconfig options for `mode`.
pub fn tsconfig_options(mode: &TsconfigMode, cwd: &Path) -> Option<TsconfigOptions> {
    let config_file = locate_tsconfig(mode, cwd)?;
    tracing::debug!(tsconfig = %config_file.display(), "using tsconfig path mapping");
    Some(TsconfigOptions {
        config_file,
        references: TsconfigReferences::Auto,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn auto_mode_walks_up() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tsconfig.json"), "{}").unwrap();
        let nested = dir.path().join("packages/web");
        std::fs::create_dir_all(&nested).unwrap();

        assert_eq!(
            locate_tsconfig(&TsconfigMode::Auto, &nested),
            Some(dir.path().join("tsconfig.json"))
        );
    }

    #[test]
    fn explicit_directory_names_its_tsconfig() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("config")).unwrap();

        assert_eq!(
            locate_tsconfig(&TsconfigMode::Path("config".into()), dir.path()),
            Some(dir.path().join("config/tsconfig.json"))
        );
        assert_eq!(
            locate_tsconfig(&TsconfigMode::Path("tsconfig.base.json".into()), dir.path()),
            Some(dir.path().join("tsconfig.base.json"))
        );
    }

    #[test]
    fn off_mode_locates_nothing() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tsconfig.json"), "{}").unwrap();
        assert!(tsconfig_options(&TsconfigMode::Off, dir.path()).is_none());
    }
}
