//! Execution-based resolver for script-based (Gradle) projects.
//!
//! Every configured bucket is listed with `gradle dependencies`. The primary
//! run uses the located executable with a scrubbed environment and yields
//! `HIGH` nodes. When it fails the same executable is run again with the
//! caller's environment, and yields `MEDIUM` nodes. The system command is
//! only tried plainly when nothing was located.
//!
//! - [`tree`] — report parser shared with [`legacy`].
//! - [`legacy`] — single-pass line-parser adapter.

pub mod legacy;
mod merge;
pub mod tree;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{info, warn};

use crate::config::{BucketConfig, GradleSettings};
use crate::detector::{descriptor_in, project_root, GRADLE_DESCRIPTORS};
use crate::error::{ResolveError, Result};
use crate::models::{DependencyNode, Ecosystem, ResolutionConfidence};
use crate::tool::locator::ToolLocator;
use crate::tool::runner::{self, Invocation};

pub use merge::merge_forest;

/// Arguments for a read-only listing of one configuration.
fn listing_args(configuration: &str) -> Vec<String> {
    ["-q", "--console=plain", "dependencies", "--configuration", configuration]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub struct GradleResolver {
    settings: GradleSettings,
}

impl GradleResolver {
    pub fn new(settings: GradleSettings) -> Self {
        Self { settings }
    }

    fn invocation(
        &self,
        program: &Path,
        project: &Path,
        bucket: &BucketConfig,
        sanitized: bool,
    ) -> Invocation {
        Invocation {
            program: program.to_path_buf(),
            args: listing_args(&bucket.configuration),
            working_dir: project.to_path_buf(),
            sanitized,
            timeout: self.settings.timeout(),
        }
    }

    /// Primary then fallback for one bucket. The error is the fallback's.
    async fn resolve_bucket(
        &self,
        project: &Path,
        tool: Option<&Path>,
        bucket: &BucketConfig,
    ) -> Result<Vec<DependencyNode>> {
        let program = match tool {
            Some(tool) => {
                let invocation = self.invocation(tool, project, bucket, true);
                match runner::run(&invocation, &bucket.configuration).await {
                    Ok(lines) => {
                        let forest =
                            tree::parse_tree(&lines, bucket.scope, ResolutionConfidence::High);
                        info!(
                            bucket = %bucket.configuration,
                            roots = forest.len(),
                            "bucket resolved"
                        );
                        return Ok(forest);
                    }
                    Err(e) => warn!(
                        bucket = %bucket.configuration,
                        error = %e,
                        "safe invocation failed, trying plain invocation"
                    ),
                }
                tool
            }
            None => {
                warn!(
                    bucket = %bucket.configuration,
                    "no executable located, trying plain system invocation"
                );
                self.settings.system_command.as_path()
            }
        };

        let invocation = self.invocation(program, project, bucket, false);
        let lines = runner::run(&invocation, &bucket.configuration).await.map_err(|e| {
            warn!(bucket = %bucket.configuration, error = %e, "plain invocation failed");
            e
        })?;
        let forest = tree::parse_tree(&lines, bucket.scope, ResolutionConfidence::Medium);
        info!(
            bucket = %bucket.configuration,
            roots = forest.len(),
            "bucket resolved by fallback"
        );
        Ok(forest)
    }
}

#[async_trait]
impl super::Resolver for GradleResolver {
    fn name(&self) -> &'static str {
        "gradle-execution"
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

        let located = ToolLocator::new(&self.settings).locate(&project).await;
        let tool: Option<PathBuf> = match &located {
            Ok(tool) => Some(tool.clone()),
            Err(e) => {
                warn!(error = %e, "primary strategy unavailable");
                None
            }
        };

        let buckets = &self.settings.buckets;
        let outcomes = if self.settings.parallel_buckets {
            join_all(
                buckets
                    .iter()
                    .map(|bucket| self.resolve_bucket(&project, tool.as_deref(), bucket)),
            )
            .await
        } else {
            let mut outcomes = Vec::with_capacity(buckets.len());
            for bucket in buckets {
                outcomes.push(self.resolve_bucket(&project, tool.as_deref(), bucket).await);
            }
            outcomes
        };

        // Merge in declared order regardless of how the buckets ran.
        let mut forest = Vec::new();
        let mut failures = Vec::new();
        for (bucket, outcome) in buckets.iter().zip(outcomes) {
            match outcome {
                Ok(nodes) => merge_forest(&mut forest, nodes),
                Err(e) => failures.push(format!("{}: {}", bucket.configuration, e)),
            }
        }

        if !buckets.is_empty() && failures.len() == buckets.len() {
            if let Err(e @ ResolveError::ToolNotFound { .. }) = located {
                return Err(e);
            }
            return Err(ResolveError::AllBucketsFailed {
                ecosystem: Ecosystem::Gradle.to_string(),
                failures,
            });
        }

        Ok(forest)
    }
}
