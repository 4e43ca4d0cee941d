use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::config::MavenSettings;
use crate::error::{ResolveError, Result};

/// `group:artifact:version` of a descriptor to fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl ArtifactKey {
    pub fn new(group_id: &str, artifact_id: &str, version: &str) -> Self {
        Self {
            group_id: group_id.to_string(),
            artifact_id: artifact_id.to_string(),
            version: version.to_string(),
        }
    }

    /// Repository-relative path, e.g. `org/x/y/2.0/y-2.0.pom`.
    pub fn pom_path(&self) -> String {
        format!(
            "{}/{}/{}/{}-{}.pom",
            self.group_id.replace('.', "/"),
            self.artifact_id,
            self.version,
            self.artifact_id,
            self.version
        )
    }

    /// Coordinates come from untrusted descriptors; every path segment must stay
    /// inside the repository root.
    fn has_safe_segments(&self) -> bool {
        fn safe(segment: &str) -> bool {
            !segment.is_empty()
                && segment != "."
                && segment != ".."
                && !segment.contains(['/', '\\'])
        }

        self.group_id.split('.').all(safe) && safe(&self.artifact_id) && safe(&self.version)
    }
}

impl std::fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

/// Where descriptors of dependencies, ancestors and imports come from.
pub trait PomSource {
    /// Return the raw descriptor text for `key`.
    fn fetch_pom(&self, key: &ArtifactKey) -> Result<String>;
}

/// Local package cache backed by an optional remote artifact host.
///
/// Remote downloads are written into the local cache afterwards.
pub struct PomRepository {
    local: Option<PathBuf>,
    remote: Option<String>,
    client: Option<Client>,
}

impl PomRepository {
    /// Build a repository from settings. Must not be called from an async context
    /// because the blocking HTTP client owns its own runtime.
    pub fn from_settings(settings: &MavenSettings) -> Self {
        let remote = (!settings.offline && !settings.remote_repository.is_empty())
            .then(|| settings.remote_repository.trim_end_matches('/').to_string());

        let client = match &remote {
            Some(_) => match Client::builder()
                .timeout(Duration::from_secs(settings.http_timeout_secs))
                .user_agent(concat!("depscope/", env!("CARGO_PKG_VERSION")))
                .build()
            {
                Ok(client) => Some(client),
                Err(e) => {
                    warn!(error = %e, "failed to build HTTP client; remote repository disabled");
                    None
                }
            },
            None => None,
        };

        Self {
            local: settings.local_repository(),
            remote,
            client,
        }
    }

    /// Repository that only reads `local`.
    pub fn offline(local: impl Into<PathBuf>) -> Self {
        Self {
            local: Some(local.into()),
            remote: None,
            client: None,
        }
    }

    fn local_path(&self, key: &ArtifactKey) -> Option<PathBuf> {
        self.local.as_ref().map(|root| root.join(key.pom_path()))
    }

    fn download(&self, key: &ArtifactKey) -> Result<String> {
        let unavailable = |reason: String| ResolveError::ArtifactUnavailable {
            coordinate: key.to_string(),
            reason,
        };

        let (Some(remote), Some(client)) = (&self.remote, &self.client) else {
            return Err(unavailable("not in local repository and offline".to_string()));
        };

        let url = format!("{}/{}", remote, key.pom_path());
        debug!(%url, "fetching descriptor");

        let response = client.get(&url).send().map_err(|e| unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(unavailable(format!("GET {} returned {}", url, response.status())));
        }
        response.text().map_err(|e| unavailable(e.to_string()))
    }
}

impl PomSource for PomRepository {
    fn fetch_pom(&self, key: &ArtifactKey) -> Result<String> {
        if !key.has_safe_segments() {
            return Err(ResolveError::ArtifactUnavailable {
                coordinate: key.to_string(),
                reason: "coordinate is not a valid repository path".to_string(),
            });
        }

        if let Some(path) = self.local_path(key) {
            if path.is_file() {
                return std::fs::read_to_string(&path).map_err(|e| ResolveError::io(&path, e));
            }
        }

        let content = self.download(key)?;

        if let Some(path) = self.local_path(key) {
            if let Err(e) = write_cached(&path, &content) {
                warn!(path = %path.display(), error = %e, "could not cache downloaded descriptor");
            }
        }

        Ok(content)
    }
}

fn write_cached(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_pom_path() {
        let key = ArtifactKey::new("org.apache.commons", "commons-lang3", "3.12.0");
        assert_eq!(
            key.pom_path(),
            "org/apache/commons/commons-lang3/3.12.0/commons-lang3-3.12.0.pom"
        );
    }

    #[test]
    fn test_reads_local_cache() {
        let dir = TempDir::new().unwrap();
        let key = ArtifactKey::new("org.x", "y", "2.0");
        let path = dir.path().join(key.pom_path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "<project/>").unwrap();

        let repo = PomRepository::offline(dir.path());
        assert_eq!(repo.fetch_pom(&key).unwrap(), "<project/>");
    }

    #[test]
    fn test_offline_miss_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let repo = PomRepository::offline(dir.path());
        let err = repo.fetch_pom(&ArtifactKey::new("g", "a", "1")).unwrap_err();
        assert!(matches!(err, ResolveError::ArtifactUnavailable { .. }));
    }

    #[test]
    fn test_rejects_coordinates_escaping_repository() {
        let dir = TempDir::new().unwrap();
        let repo_root = dir.path().join("repo");
        std::fs::create_dir_all(repo_root.join("g")).unwrap();
        // `g/../..` resolves to the parent of the repository root.
        std::fs::write(dir.path().join("..-...pom"), "<project>secret</project>").unwrap();

        let repo = PomRepository::offline(&repo_root);
        for key in [
            ArtifactKey::new("g", "..", ".."),
            ArtifactKey::new("g", "a/b", "1"),
            ArtifactKey::new("g", "a", "..\\1"),
            ArtifactKey::new("g..h", "a", "1"),
            ArtifactKey::new("g", "", "1"),
        ] {
            let err = repo.fetch_pom(&key).unwrap_err();
            assert!(
                matches!(err, ResolveError::ArtifactUnavailable { .. }),
                "{key} was not rejected"
            );
        }
    }
}
