use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::{GradleSettings, PROJECT_DIR};
use crate::error::{ResolveError, Result};
use crate::tool::runner;

#[cfg(windows)]
const PROJECT_WRAPPER: &str = "gradlew.bat";
#[cfg(not(windows))]
const PROJECT_WRAPPER: &str = "gradlew";

#[cfg(windows)]
const ENTRY_POINT: &str = "bin/gradle.bat";
#[cfg(not(windows))]
const ENTRY_POINT: &str = "bin/gradle";

/// Directory under [`PROJECT_DIR`] receiving the bundled distribution.
const EXTRACT_DIR: &str = "gradle";

const GUIDANCE: &str = "No Gradle executable is available for this project. Either:\n  \
    - commit the Gradle wrapper to the project (run `gradle wrapper`), or\n  \
    - install Gradle and put it on PATH (https://gradle.org/install/), or\n  \
    - point `gradle.bundled_distribution` in .depscope/config.toml at an unpacked distribution.";

/// Where the located executable came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolSource {
    ProjectWrapper,
    Bundled,
    System,
}

/// Finds the Gradle executable for a project, first match wins:
/// project wrapper, bundled copy extracted into the project, system install.
pub struct ToolLocator {
    system_command: PathBuf,
    bundled_distribution: Option<PathBuf>,
    probe_timeout: Duration,
}

impl ToolLocator {
    pub fn new(settings: &GradleSettings) -> Self {
        Self {
            system_command: settings.system_command.clone(),
            bundled_distribution: settings.bundled_distribution(),
            probe_timeout: settings.probe_timeout(),
        }
    }

    pub async fn locate(&self, project: &Path) -> Result<PathBuf> {
        self.locate_with_source(project).await.map(|(path, _)| path)
    }

    pub async fn locate_with_source(&self, project: &Path) -> Result<(PathBuf, ToolSource)> {
        let wrapper = project.join(PROJECT_WRAPPER);
        if wrapper.is_file() {
            info!(path = %wrapper.display(), "using project wrapper");
            return Ok((wrapper, ToolSource::ProjectWrapper));
        }

        if let Some(bundle) = &self.bundled_distribution {
            let (source, destination) = (bundle.clone(), project.to_path_buf());
            let extracted =
                tokio::task::spawn_blocking(move || extract_bundled(&source, &destination))
                    .await
                    .unwrap_or_else(|e| Err(std::io::Error::other(e)));
            match extracted {
                Ok(entry) => {
                    info!(path = %entry.display(), "using bundled distribution");
                    return Ok((entry, ToolSource::Bundled));
                }
                Err(e) => warn!(
                    bundle = %bundle.display(),
                    error = %e,
                    "bundled distribution unusable"
                ),
            }
        }

        if runner::probe(&self.system_command, self.probe_timeout).await {
            info!(command = %self.system_command.display(), "using system installation");
            return Ok((self.system_command.clone(), ToolSource::System));
        }

        Err(ResolveError::ToolNotFound {
            tool: "gradle".to_string(),
            guidance: GUIDANCE.to_string(),
        })
    }
}

/// Copy `bundle` into `<project>/.depscope/gradle` unless already there and
/// return the entry point. The copy goes through a staging directory so an
/// interrupted extraction is never mistaken for a finished one.
fn extract_bundled(bundle: &Path, project: &Path) -> std::io::Result<PathBuf> {
    if !bundle.join(ENTRY_POINT).is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} missing from bundle", ENTRY_POINT),
        ));
    }

    let base = project.join(PROJECT_DIR);
    let target = base.join(EXTRACT_DIR);
    let entry = target.join(ENTRY_POINT);

    if entry.is_file() {
        debug!(path = %entry.display(), "bundled distribution already extracted");
        return Ok(entry);
    }

    let staging = base.join(format!("{EXTRACT_DIR}.partial"));
    if staging.exists() {
        std::fs::remove_dir_all(&staging)?;
    }
    copy_tree(bundle, &staging)?;
    if target.exists() {
        std::fs::remove_dir_all(&target)?;
    }
    std::fs::rename(&staging, &target)?;

    make_executable(&entry)?;
    Ok(entry)
}

fn copy_tree(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(std::io::Error::other)?;
        let destination = dst.join(relative);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&destination)?;
        } else {
            if let Some(parent) = destination.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &destination)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    std::fs::set_permissions(path, permissions)
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
