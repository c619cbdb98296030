use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::launcher::error::LauncherError;

pub const MANIFEST_FILE: &str = ".doa-launcher.toml";

/// Record of what the launcher put in the install directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallManifest {
    pub launcher_version: String,
    pub app_version: String,
    pub repo_url: String,
    pub complete: bool,
    pub installed_at: u64,
}

impl InstallManifest {
    pub fn new(app_version: &str, repo_url: &str, complete: bool) -> Self {
        Self {
            launcher_version: env!("CARGO_PKG_VERSION").to_string(),
            app_version: app_version.to_string(),
            repo_url: repo_url.to_string(),
            complete,
            installed_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallState {
    NotInstalled,
    /// Directory exists but no complete manifest was written (clone or install aborted,
    /// or the tree was not created by this launcher).
    Incomplete(Option<InstallManifest>),
    Installed(InstallManifest),
}

impl InstallState {
    pub fn label(&self) -> String {
        match self {
            InstallState::NotInstalled => "not installed".to_string(),
            InstallState::Incomplete(_) => "incomplete".to_string(),
            InstallState::Installed(manifest) => format!("installed ({})", manifest.app_version),
        }
    }
}

/// The installation marker: anything at `install_dir` counts, regardless of contents.
/// Only a definite "not found" reports false.
pub fn is_installed(install_dir: &Path) -> bool {
    !matches!(fs::metadata(install_dir), Err(err) if err.kind() == std::io::ErrorKind::NotFound)
}

pub fn manifest_path(install_dir: &Path) -> PathBuf {
    install_dir.join(MANIFEST_FILE)
}

pub fn read_state(install_dir: &Path) -> InstallState {
    if !is_installed(install_dir) {
        return InstallState::NotInstalled;
    }

    let path = manifest_path(install_dir);
    let manifest = fs::read_to_string(&path)
        .ok()
        .and_then(|raw| match toml::from_str::<InstallManifest>(&raw) {
            Ok(manifest) => Some(manifest),
            Err(err) => {
                tracing::warn!("ignoring unreadable manifest {}: {err}", path.display());
                None
            }
        });

    match manifest {
        Some(manifest) if manifest.complete => InstallState::Installed(manifest),
        other => InstallState::Incomplete(other),
    }
}

/// Write the manifest through a temp file and rename so readers never see a torn file.
pub fn write_manifest(install_dir: &Path, manifest: &InstallManifest) -> Result<(), LauncherError> {
    let path = manifest_path(install_dir);
    let failure = |reason: String| LauncherError::Manifest {
        path: path.clone(),
        reason,
    };

    let body = toml::to_string(manifest).map_err(|err| failure(err.to_string()))?;

    let result = (|| -> std::io::Result<()> {
        let tmp = path.with_extension("tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(body.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &path)
    })();

    result.map_err(|err| failure(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_directory_is_not_installed() {
        let root = tempfile::tempdir().unwrap();
        let install_dir = root.path().join("DOA-Local");

        assert!(!is_installed(&install_dir));
        assert_eq!(read_state(&install_dir), InstallState::NotInstalled);
    }

    #[test]
    fn empty_directory_counts_as_installed_marker() {
        let root = tempfile::tempdir().unwrap();
        let install_dir = root.path().join("DOA-Local");
        fs::create_dir(&install_dir).unwrap();

        assert!(is_installed(&install_dir));
        assert_eq!(read_state(&install_dir), InstallState::Incomplete(None));
    }

    #[test]
    fn non_empty_directory_without_manifest_is_marker_but_incomplete() {
        let root = tempfile::tempdir().unwrap();
        let install_dir = root.path().join("DOA-Local");
        fs::create_dir(&install_dir).unwrap();
        fs::write(install_dir.join("package.json"), "{}").unwrap();

        assert!(is_installed(&install_dir));
        assert_eq!(read_state(&install_dir), InstallState::Incomplete(None));
    }

    #[test]
    fn complete_manifest_reads_back_as_installed() {
        let root = tempfile::tempdir().unwrap();
        let manifest = InstallManifest::new("DOA S1", "https://example.invalid/doa", true);

        write_manifest(root.path(), &manifest).unwrap();

        assert_eq!(read_state(root.path()), InstallState::Installed(manifest));
        assert!(!root.path().join(".doa-launcher.tmp").exists());
    }

    #[test]
    fn in_progress_manifest_reads_back_as_incomplete() {
        let root = tempfile::tempdir().unwrap();
        let manifest = InstallManifest::new("DOA S1", "https://example.invalid/doa", false);

        write_manifest(root.path(), &manifest).unwrap();

        assert_eq!(
            read_state(root.path()),
            InstallState::Incomplete(Some(manifest))
        );
    }

    #[test]
    fn garbage_manifest_is_treated_as_missing() {
        let root = tempfile::tempdir().unwrap();
        fs::write(manifest_path(root.path()), "complete = \"maybe\"").unwrap();

        assert_eq!(read_state(root.path()), InstallState::Incomplete(None));
    }

    #[test]
    fn writing_into_missing_directory_fails() {
        let root = tempfile::tempdir().unwrap();
        let manifest = InstallManifest::new("DOA S1", "https://example.invalid/doa", true);

        let err = write_manifest(&root.path().join("gone"), &manifest).unwrap_err();
        assert!(matches!(err, LauncherError::Manifest { .. }));
    }
}
