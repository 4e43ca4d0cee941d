//! Ecosystem adapters and the registry that picks one for a project.
//!
//! Priority is fixed at registration time: execution-based Gradle first,
//! declarative Maven second, the legacy Gradle line-parser last. Runtime
//! fallback between strategies happens inside the Gradle resolver, never here.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use crate::config::Config;
use crate::error::{ResolveError, Result};
use crate::models::{DependencyNode, Ecosystem};

pub mod gradle;
pub mod maven;

/// One ecosystem adapter.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Stable adapter name, used in logs and reports.
    fn name(&self) -> &'static str;

    fn ecosystem(&self) -> Ecosystem;

    /// True when the adapter's descriptor is `path` itself or lives directly inside it.
    fn supports(&self, path: &Path) -> bool;

    /// Resolve the project into a forest whose roots are its declared dependencies.
    async fn resolve(&self, path: &Path) -> Result<Vec<DependencyNode>>;
}

/// Ordered set of adapters.
pub struct ResolverRegistry {
    resolvers: Vec<Box<dyn Resolver>>,
}

impl ResolverRegistry {
    /// Registry with adapters in the given priority order.
    pub fn new(resolvers: Vec<Box<dyn Resolver>>) -> Self {
        Self { resolvers }
    }

    /// Built-in adapters. With `gradle.legacy_parser` set the execution-based
    /// resolver is left out and the line-parser handles Gradle projects.
    pub fn from_config(config: &Config) -> Self {
        let mut resolvers: Vec<Box<dyn Resolver>> = Vec::new();
        if !config.gradle.legacy_parser {
            resolvers.push(Box::new(gradle::GradleResolver::new(config.gradle.clone())));
        }
        resolvers.push(Box::new(maven::MavenResolver::new(config.maven.clone())));
        resolvers.push(Box::new(gradle::legacy::LegacyGradleResolver::new(
            config.gradle.clone(),
        )));
        Self::new(resolvers)
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.resolvers.iter().any(|r| r.supports(path))
    }

    /// Highest-priority adapter claiming `path`.
    pub fn select(&self, path: &Path) -> Result<&dyn Resolver> {
        let resolver = self
            .resolvers
            .iter()
            .find(|r| r.supports(path))
            .ok_or_else(|| ResolveError::NoResolverFound {
                path: path.to_path_buf(),
            })?;
        info!(resolver = resolver.name(), path = %path.display(), "selected resolver");
        Ok(resolver.as_ref())
    }

    pub fn all_resolvers(&self) -> Vec<&dyn Resolver> {
        self.resolvers.iter().map(|r| r.as_ref()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(registry: &ResolverRegistry) -> Vec<&'static str> {
        registry.all_resolvers().iter().map(|r| r.name()).collect()
    }

    #[test]
    fn test_default_priority_order() {
        let registry = ResolverRegistry::from_config(&Config::default());
        assert_eq!(
            names(&registry),
            vec!["gradle-execution", "maven-declarative", "gradle-legacy"]
        );
    }

    #[test]
    fn test_gradle_project_prefers_execution_resolver() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("build.gradle"), "").unwrap();
        std::fs::write(dir.path().join("pom.xml"), "<project/>").unwrap();

        let registry = ResolverRegistry::from_config(&Config::default());
        assert_eq!(registry.select(dir.path()).unwrap().name(), "gradle-execution");
    }

    #[test]
    fn test_legacy_parser_when_execution_not_registered() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("build.gradle.kts"), "").unwrap();

        let mut config = Config::default();
        config.gradle.legacy_parser = true;
        let registry = ResolverRegistry::from_config(&config);
        assert_eq!(registry.select(dir.path()).unwrap().name(), "gradle-legacy");
    }

    #[test]
    fn test_maven_project() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("pom.xml"), "<project/>").unwrap();
        let registry = ResolverRegistry::from_config(&Config::default());
        let resolver = registry.select(dir.path()).unwrap();
        assert_eq!(resolver.ecosystem(), Ecosystem::Maven);
    }

    #[test]
    fn test_no_resolver_found() {
        let dir = TempDir::new().unwrap();
        let registry = ResolverRegistry::from_config(&Config::default());
        assert!(!registry.supports(dir.path()));
        assert!(matches!(
            registry.select(dir.path()),
            Err(ResolveError::NoResolverFound { .. })
        ));
    }
}
