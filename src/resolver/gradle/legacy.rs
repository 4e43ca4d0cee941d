//! Single-strategy Gradle adapter: one plain `dependencies` run covering every
//! configuration, cut into sections and parsed with the shared tree parser.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::GradleSettings;
use crate::detector::{descriptor_in, project_root, GRADLE_DESCRIPTORS};
use crate::error::{ResolveError, Result};
use crate::models::{DependencyNode, Ecosystem, ResolutionConfidence};
use crate::tool::locator::ToolLocator;
use crate::tool::runner::{self, Invocation};

use super::merge_forest;
use super::tree::{configuration_header, parse_tree};

pub struct LegacyGradleResolver {
    settings: GradleSettings,
}

impl LegacyGradleResolver {
    pub fn new(settings: GradleSettings) -> Self {
        Self { settings }
    }
}

/// Split a full report into `configuration -> lines`.
pub fn split_sections<S: AsRef<str>>(lines: &[S]) -> HashMap<String, Vec<String>> {
    let mut sections: HashMap<String, Vec<String>> = HashMap::new();
    let mut current: Option<String> = None;

    for line in lines {
        let line = line.as_ref();
        if let Some(name) = configuration_header(line) {
            sections.entry(name.to_string()).or_default();
            current = Some(name.to_string());
            continue;
        }
        if line.trim().is_empty() {
            current = None;
            continue;
        }
        if let Some(name) = &current {
            sections.entry(name.clone()).or_default().push(line.to_string());
        }
    }

    sections
}

#[async_trait]
impl crate::resolver::Resolver for LegacyGradleResolver {
    fn name(&self) -> &'static str {
        "gradle-legacy"
    }

    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Gradle
    }

    fn supports(&self, path: &Path) -> bool {
        descriptor_in(path, GRADLE_DESCRIPTORS).is_some()
    }

    async fn resolve(&self, path: &Path) -> Result<Vec<DependencyNode>> {
        if !self.supports(path) {
            return Err(ResolveError::NoDescriptorFound {
                path: path.to_path_buf(),
            });
        }
        let project = project_root(path);
        let tool = ToolLocator::new(&self.settings).locate(&project).await?;

        let invocation = Invocation {
            program: tool,
            args: vec!["-q".into(), "--console=plain".into(), "dependencies".into()],
            working_dir: project,
            sanitized: false,
            timeout: self.settings.timeout(),
        };
        let lines = runner::run(&invocation, "all").await?;
        let sections = split_sections(&lines);
        debug!(sections = sections.len(), "report split");

        let mut forest = Vec::new();
        let mut failures = Vec::new();
        for bucket in &self.settings.buckets {
            match sections.get(&bucket.configuration) {
                Some(section) => {
                    let nodes = parse_tree(section, bucket.scope, ResolutionConfidence::Medium);
                    info!(bucket = %bucket.configuration, roots = nodes.len(), "bucket parsed");
                    merge_forest(&mut forest, nodes);
                }
                None => failures.push(format!("{}: not present in report", bucket.configuration)),
            }
        }

        if !self.settings.buckets.is_empty() && failures.len() == self.settings.buckets.len() {
            return Err(ResolveError::AllBucketsFailed {
                ecosystem: Ecosystem::Gradle.to_string(),
                failures,
            });
        }

        Ok(forest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Scope;

    const REPORT: &str = r"
------------------------------------------------------------
Root project 'demo'
------------------------------------------------------------

annotationProcessor - Annotation processors and their dependencies for source set 'main'.
No dependencies

compileClasspath - Compile classpath for source set 'main'.
+--- com.google.guava:guava:31.1-jre
\--- org.slf4j:slf4j-api:2.0.7

runtimeClasspath - Runtime classpath of source set 'main'.
+--- com.google.guava:guava:31.1-jre
|    \--- com.google.guava:failureaccess:1.0.1
\--- ch.qos.logback:logback-classic:1.4.7

testRuntimeClasspath - Runtime classpath of source set 'test'.
\--- junit:junit:4.13.2
";

    #[test]
    fn test_split_sections() {
        let lines: Vec<&str> = REPORT.lines().collect();
        let sections = split_sections(&lines);
        assert_eq!(sections["annotationProcessor"], vec!["No dependencies"]);
        assert_eq!(sections["compileClasspath"].len(), 2);
        assert_eq!(sections["runtimeClasspath"].len(), 3);
        assert_eq!(sections["testRuntimeClasspath"], vec!["\\--- junit:junit:4.13.2"]);
        assert!(!sections.contains_key("Root"));
    }

    #[test]
    fn test_sections_merge_in_bucket_order() {
        let lines: Vec<&str> = REPORT.lines().collect();
        let sections = split_sections(&lines);
        let mut forest = Vec::new();
        for (name, scope) in [
            ("compileClasspath", Scope::Compile),
            ("runtimeClasspath", Scope::Runtime),
        ] {
            let nodes = parse_tree(&sections[name], scope, ResolutionConfidence::Medium);
            merge_forest(&mut forest, nodes);
        }

        let ids: Vec<String> = forest.iter().map(|n| n.coordinate.to_string()).collect();
        assert_eq!(
            ids,
            vec![
                "com.google.guava:guava:31.1-jre",
                "org.slf4j:slf4j-api:2.0.7",
                "ch.qos.logback:logback-classic:1.4.7",
            ]
        );
        assert_eq!(forest[0].scope, Scope::Compile);
        assert_eq!(forest[0].children.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_resolve_with_wrapper() {
        use crate::config::BucketConfig;
        use crate::resolver::Resolver;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("build.gradle.kts"), "").unwrap();
        std::fs::write(dir.path().join("report.txt"), REPORT).unwrap();
        let wrapper = dir.path().join("gradlew");
        std::fs::write(&wrapper, "#!/bin/sh\ncat report.txt\n").unwrap();
        std::fs::set_permissions(&wrapper, std::fs::Permissions::from_mode(0o755)).unwrap();

        let settings = GradleSettings {
            buckets: vec![
                BucketConfig::new("testRuntimeClasspath", Scope::Test),
                BucketConfig::new("missingClasspath", Scope::Compile),
            ],
            ..GradleSettings::default()
        };
        let forest = LegacyGradleResolver::new(settings).resolve(dir.path()).await.unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].coordinate.to_string(), "junit:junit:4.13.2");
        assert_eq!(forest[0].scope, Scope::Test);
        assert_eq!(forest[0].confidence, ResolutionConfidence::Medium);
    }
}
