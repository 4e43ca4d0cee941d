//! Scan orchestration: detect, select, resolve, flatten.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::detector::detect_ecosystems;
use crate::error::{ResolveError, Result};
use crate::models::{
    forest_confidence, DependencyNode, Ecosystem, PackageCoordinate, ResolutionConfidence,
};
use crate::resolver::ResolverRegistry;

/// Everything one scan produced.
#[derive(Debug, Serialize)]
pub struct ScanReport {
    pub project: PathBuf,
    pub ecosystem: Ecosystem,
    pub resolver: String,
    /// Lowest confidence in the forest; `None` when nothing was resolved.
    pub confidence: Option<ResolutionConfidence>,
    pub forest: Vec<DependencyNode>,
    pub coordinates: Vec<PackageCoordinate>,
}

impl ScanReport {
    pub fn direct_count(&self) -> usize {
        self.coordinates.iter().filter(|c| c.is_direct).count()
    }

    pub fn unresolved_count(&self) -> usize {
        self.coordinates.iter().filter(|c| !c.is_resolved()).count()
    }
}

pub struct Scanner {
    registry: ResolverRegistry,
}

impl Scanner {
    pub fn new(config: &Config) -> Self {
        Self::with_registry(ResolverRegistry::from_config(config))
    }

    pub fn with_registry(registry: ResolverRegistry) -> Self {
        Self { registry }
    }

    pub async fn scan(&self, path: &Path) -> Result<ScanReport> {
        if !path.exists() {
            return Err(ResolveError::NoDescriptorFound {
                path: path.to_path_buf(),
            });
        }

        let detected = detect_ecosystems(path);
        info!(path = %path.display(), ecosystems = ?detected, "scanning");

        let resolver = self.registry.select(path)?;
        let forest = resolver.resolve(path).await?;
        let coordinates = flatten(&forest);
        let confidence = forest_confidence(&forest);

        if forest.is_empty() {
            warn!(path = %path.display(), "no dependencies resolved");
        }
        info!(
            resolver = resolver.name(),
            roots = forest.len(),
            coordinates = coordinates.len(),
            confidence = ?confidence,
            "scan complete"
        );

        Ok(ScanReport {
            project: path.to_path_buf(),
            ecosystem: resolver.ecosystem(),
            resolver: resolver.name().to_string(),
            confidence,
            forest,
            coordinates,
        })
    }
}

/// Pre-order walk of the forest, one entry per `namespace:name:version`.
/// A coordinate reached directly anywhere is reported as direct.
pub fn flatten(forest: &[DependencyNode]) -> Vec<PackageCoordinate> {
    let mut coordinates: Vec<PackageCoordinate> = Vec::new();
    let mut seen: HashMap<PackageCoordinate, usize> = HashMap::new();

    for root in forest {
        root.walk(&mut |node| match seen.get(&node.coordinate) {
            Some(&index) => {
                if node.coordinate.is_direct {
                    coordinates[index].is_direct = true;
                }
            }
            None => {
                seen.insert(node.coordinate.clone(), coordinates.len());
                coordinates.push(node.coordinate.clone());
            }
        });
    }

    coordinates
}
