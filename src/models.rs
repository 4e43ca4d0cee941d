use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Placeholder substituted for any coordinate field that could not be resolved.
pub const UNKNOWN: &str = "unknown";

/// Build ecosystem that produced a coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Maven,
    Gradle,
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ecosystem::Maven => write!(f, "Maven"),
            Ecosystem::Gradle => write!(f, "Gradle"),
        }
    }
}

/// Dependency scope, shared by both ecosystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Compile,
    Provided,
    Runtime,
    Test,
    System,
}

impl Scope {
    /// Parse a declared scope string. Unknown values map to `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compile" => Some(Scope::Compile),
            "provided" => Some(Scope::Provided),
            "runtime" => Some(Scope::Runtime),
            "test" => Some(Scope::Test),
            "system" => Some(Scope::System),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Compile => write!(f, "compile"),
            Scope::Provided => write!(f, "provided"),
            Scope::Runtime => write!(f, "runtime"),
            Scope::Test => write!(f, "test"),
            Scope::System => write!(f, "system"),
        }
    }
}

/// How authoritative a resolution pass is. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResolutionConfidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for ResolutionConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionConfidence::High => write!(f, "HIGH"),
            ResolutionConfidence::Medium => write!(f, "MEDIUM"),
            ResolutionConfidence::Low => write!(f, "LOW"),
        }
    }
}

/// Identity of one resolved package.
///
/// Equality and hashing only look at `namespace:name:version`; the same
/// physical package can surface through several buckets with different scopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageCoordinate {
    pub namespace: String,
    pub name: String,
    pub version: String,
    pub ecosystem: Ecosystem,
    pub scope: Scope,
    pub is_direct: bool,
}

impl PackageCoordinate {
    /// Build a coordinate, substituting [`UNKNOWN`] for empty fields.
    pub fn new(
        namespace: &str,
        name: &str,
        version: &str,
        ecosystem: Ecosystem,
        scope: Scope,
        is_direct: bool,
    ) -> Self {
        Self {
            namespace: or_unknown(namespace),
            name: or_unknown(name),
            version: or_unknown(version),
            ecosystem,
            scope,
            is_direct,
        }
    }

    /// `namespace:name`, the key used for version management and nearest-wins.
    pub fn key(&self) -> String {
        format!("{}:{}", self.namespace, self.name)
    }

    /// False when any field carries the [`UNKNOWN`] placeholder.
    pub fn is_resolved(&self) -> bool {
        self.namespace != UNKNOWN && self.name != UNKNOWN && self.version != UNKNOWN
    }

    /// Copy of this coordinate with a different direct flag.
    pub fn with_direct(&self, is_direct: bool) -> Self {
        Self {
            is_direct,
            ..self.clone()
        }
    }
}

fn or_unknown(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        UNKNOWN.to_string()
    } else {
        trimmed.to_string()
    }
}

impl PartialEq for PackageCoordinate {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace
            && self.name == other.name
            && self.version == other.version
    }
}

impl Eq for PackageCoordinate {}

impl Hash for PackageCoordinate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.name.hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for PackageCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.name, self.version)
    }
}

/// One position in a resolved dependency tree.
///
/// Nodes own their children; diamonds in the graph are duplicated, never shared.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyNode {
    pub coordinate: PackageCoordinate,
    pub scope: Scope,
    /// Ancestor coordinates as `ns:name:version`, root first.
    pub path_from_root: Vec<String>,
    pub confidence: ResolutionConfidence,
    pub children: Vec<DependencyNode>,
}

impl DependencyNode {
    pub fn new(
        coordinate: PackageCoordinate,
        path_from_root: Vec<String>,
        confidence: ResolutionConfidence,
    ) -> Self {
        Self {
            scope: coordinate.scope,
            coordinate,
            path_from_root,
            confidence,
            children: Vec::new(),
        }
    }

    /// Path a child of this node should carry.
    pub fn child_path(&self) -> Vec<String> {
        let mut path = self.path_from_root.clone();
        path.push(self.coordinate.to_string());
        path
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(DependencyNode::subtree_len).sum::<usize>()
    }

    /// Depth-first pre-order walk over this subtree.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a DependencyNode)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Lowest confidence found anywhere in a forest, `None` when it is empty.
pub fn forest_confidence(forest: &[DependencyNode]) -> Option<ResolutionConfidence> {
    let mut lowest: Option<ResolutionConfidence> = None;
    for root in forest {
        root.walk(&mut |node| {
            lowest = Some(match lowest {
                Some(current) => current.min(node.confidence),
                None => node.confidence,
            });
        });
    }
    lowest
}
