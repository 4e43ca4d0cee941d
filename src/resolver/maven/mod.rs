//! Declarative resolver for coordinate-based (`pom.xml`) projects.
//!
//! - [`pom`] — raw descriptor parsing.
//! - [`effective`] — parent chain, BOM imports, property interpolation.
//! - [`graph`] — nearest-wins transitive closure.

pub mod effective;
pub mod graph;
pub mod pom;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::config::MavenSettings;
use crate::detector::{descriptor_in, MAVEN_DESCRIPTORS};
use crate::error::{ResolveError, Result};
use crate::models::{DependencyNode, Ecosystem};
use crate::registry::maven::{PomRepository, PomSource};

use effective::ModelBuilder;

/// Resolves a Maven project into a `HIGH` confidence forest.
pub struct MavenResolver {
    settings: MavenSettings,
}

impl MavenResolver {
    pub fn new(settings: MavenSettings) -> Self {
        Self { settings }
    }
}

/// Resolve the descriptor at `pom_path` against `source`. Blocking.
pub fn resolve_descriptor(
    pom_path: &Path,
    source: &dyn PomSource,
    max_depth: usize,
) -> Result<Vec<DependencyNode>> {
    let builder = ModelBuilder::new(source);
    let project = builder.build_project(pom_path)?;
    info!(
        project = %project.key,
        declared = project.declared.len(),
        managed = project.managed.len(),
        "effective model built"
    );
    Ok(graph::resolve_graph(&builder, &project, max_depth))
}

fn find_descriptor(path: &Path) -> Result<PathBuf> {
    descriptor_in(path, MAVEN_DESCRIPTORS).ok_or_else(|| ResolveError::NoDescriptorFound {
        path: path.to_path_buf(),
    })
}

#[async_trait]
impl super::Resolver for MavenResolver {
    fn name(&self) -> &'static str {
        "maven-declarative"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Maven
    }

    fn supports(&self, path: &Path) -> bool {
        descriptor_in(path, MAVEN_DESCRIPTORS).is_some()
    }

    async fn resolve(&self, path: &Path) -> Result<Vec<DependencyNode>> {
        let pom_path = find_descriptor(path)?;
        let settings = self.settings.clone();

        // The repository's blocking HTTP client must live off the async runtime.
        tokio::task::spawn_blocking(move || {
            let repository = PomRepository::from_settings(&settings);
            resolve_descriptor(&pom_path, &repository, settings.max_depth)
        })
        .await
        .map_err(|e| ResolveError::Internal(format!("maven resolution task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResolutionConfidence, UNKNOWN};
    use crate::resolver::maven::effective::tests::install;
    use crate::resolver::Resolver;
    use tempfile::TempDir;

    fn offline_settings(repo: &Path) -> MavenSettings {
        MavenSettings {
            local_repository: Some(repo.to_path_buf()),
            offline: true,
            ..MavenSettings::default()
        }
    }

    #[tokio::test]
    async fn test_inherits_managed_version_end_to_end() {
        let repo = TempDir::new().unwrap();
        install(
            repo.path(),
            "org.x",
            "parent",
            "1",
            r#"<project><groupId>org.x</groupId><artifactId>parent</artifactId><version>1</version><packaging>pom</packaging>
  <dependencyManagement><dependencies>
    <dependency><groupId>org.x</groupId><artifactId>y</artifactId><version>2.0</version></dependency>
  </dependencies></dependencyManagement>
</project>"#,
        );
        install(
            repo.path(),
            "org.x",
            "y",
            "2.0",
            "<project><groupId>org.x</groupId><artifactId>y</artifactId><version>2.0</version></project>",
        );

        let project = TempDir::new().unwrap();
        std::fs::write(
            project.path().join("pom.xml"),
            r#"<project>
  <parent><groupId>org.x</groupId><artifactId>parent</artifactId><version>1</version></parent>
  <artifactId>app</artifactId>
  <dependencies><dependency><groupId>org.x</groupId><artifactId>y</artifactId></dependency></dependencies>
</project>"#,
        )
        .unwrap();

        let resolver = MavenResolver::new(offline_settings(repo.path()));
        assert!(resolver.supports(project.path()));

        let forest = resolver.resolve(project.path()).await.unwrap();
        assert_eq!(forest.len(), 1);
        let node = &forest[0];
        assert_eq!(node.coordinate.to_string(), "org.x:y:2.0");
        assert_eq!(node.confidence, ResolutionConfidence::High);
        assert!(node.coordinate.is_direct);
        assert!(node.path_from_root.is_empty());
        assert!(node.children.is_empty());
    }

    #[tokio::test]
    async fn test_direct_transitive_partition() {
        let repo = TempDir::new().unwrap();
        install(
            repo.path(),
            "g",
            "parent",
            "1",
            r#"<project><groupId>g</groupId><artifactId>parent</artifactId><version>1</version>
  <dependencies><dependency><groupId>g</groupId><artifactId>inherited</artifactId><version>1</version></dependency></dependencies>
</project>"#,
        );
        install(
            repo.path(),
            "g",
            "a",
            "1",
            r#"<project><groupId>g</groupId><artifactId>a</artifactId><version>1</version>
  <dependencies><dependency><groupId>g</groupId><artifactId>t</artifactId><version>1</version></dependency></dependencies>
</project>"#,
        );

        let project = TempDir::new().unwrap();
        std::fs::write(
            project.path().join("pom.xml"),
            r#"<project><parent><groupId>g</groupId><artifactId>parent</artifactId><version>1</version></parent>
  <artifactId>app</artifactId>
  <dependencies>
    <dependency><groupId>g</groupId><artifactId>a</artifactId><version>1</version></dependency>
    <dependency><groupId>g</groupId><artifactId>b</artifactId><version>${missing}</version></dependency>
  </dependencies>
</project>"#,
        )
        .unwrap();

        let resolver = MavenResolver::new(offline_settings(repo.path()));
        let forest = resolver.resolve(project.path()).await.unwrap();

        let mut direct = Vec::new();
        let mut indirect = Vec::new();
        for root in &forest {
            root.walk(&mut |node| {
                if node.coordinate.is_direct {
                    direct.push(node.coordinate.key());
                } else {
                    indirect.push(node.coordinate.key());
                }
            });
        }
        assert_eq!(direct, vec!["g:a", "g:b"]);
        assert_eq!(indirect, vec!["g:t", "g:inherited"]);

        let b = forest.iter().find(|n| n.coordinate.name == "b").unwrap();
        assert_eq!(b.coordinate.version, UNKNOWN);
        assert!(!b.coordinate.is_resolved());
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let repo = TempDir::new().unwrap();
        install(
            repo.path(),
            "g",
            "a",
            "1",
            r#"<project><groupId>g</groupId><artifactId>a</artifactId><version>1</version>
  <dependencies><dependency><groupId>g</groupId><artifactId>b</artifactId><version>2</version></dependency></dependencies>
</project>"#,
        );
        let project = TempDir::new().unwrap();
        std::fs::write(
            project.path().join("pom.xml"),
            r#"<project><groupId>g</groupId><artifactId>app</artifactId><version>1</version>
  <dependencies><dependency><groupId>g</groupId><artifactId>a</artifactId><version>1</version></dependency></dependencies>
</project>"#,
        )
        .unwrap();

        let resolver = MavenResolver::new(offline_settings(repo.path()));
        let first = resolver.resolve(project.path()).await.unwrap();
        let second = resolver.resolve(project.path()).await.unwrap();

        let flatten = |forest: &[DependencyNode]| {
            let mut out = Vec::new();
            for root in forest {
                root.walk(&mut |n| out.push((n.coordinate.to_string(), n.path_from_root.clone())));
            }
            out
        };
        assert_eq!(flatten(&first), flatten(&second));
    }

    #[tokio::test]
    async fn test_missing_descriptor() {
        let dir = TempDir::new().unwrap();
        let resolver = MavenResolver::new(offline_settings(dir.path()));
        assert!(!resolver.supports(dir.path()));
        let err = resolver.resolve(dir.path()).await.unwrap_err();
        assert!(matches!(err, ResolveError::NoDescriptorFound { .. }));
    }

    #[tokio::test]
    async fn test_malformed_descriptor() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pom.xml"), "<project><artifactId>x</project>").unwrap();
        let resolver = MavenResolver::new(offline_settings(dir.path()));
        let err = resolver.resolve(dir.path()).await.unwrap_err();
        assert!(matches!(err, ResolveError::DescriptorParse { .. }));
    }
}
