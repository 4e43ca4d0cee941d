//! Parser for the indented tree printed by `gradle dependencies`.
//!
//! ```text
//! runtimeClasspath - Runtime classpath of source set 'main'.
//! +--- org.springframework:spring-core:5.3.23
//! |    \--- org.springframework:spring-jcl:5.3.23
//! +--- project :core
//! |    \--- com.google.guava:guava:31.1-jre
//! \--- org.checkerframework:checker-qual:3.12.0 -> 3.21.0 (*)
//! ```
//!
//! Each nesting level is five columns wide. `project :x` lines are not
//! packages; their children are lifted to the project line's own level.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{
    DependencyNode, Ecosystem, PackageCoordinate, ResolutionConfidence, Scope, UNKNOWN,
};

const INDENT_WIDTH: usize = 5;

fn line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<indent>(?:[| ]    )*)[+\\]--- (?P<body>.+)$").expect("valid regex")
    })
}

fn coordinate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^(?P<group>[^:\s]+):(?P<name>[^:\s]+)",
            r"(?::(?P<version>\{[^}]*\}|\S+))?",
            r"(?:\s+->\s+(?P<selected>\S+))?",
            r"(?:\s+\((?P<marker>[*cn])\))?",
        ))
        .expect("valid regex")
    })
}

fn rich_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\s*(?:strictly|require|prefer)\s+([^;}\s]+)").expect("valid regex")
    })
}

fn header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<name>[A-Za-z][A-Za-z0-9_]*)(?: - .*)?$").expect("valid regex")
    })
}

/// Configuration name when `line` is a section header such as
/// `runtimeClasspath - Runtime classpath of source set 'main'.`
pub fn configuration_header(line: &str) -> Option<&str> {
    header_re()
        .captures(line.trim_end())
        .and_then(|caps| caps.name("name"))
        .map(|m| m.as_str())
}

/// One tree line, before it becomes a node.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeLine {
    Package {
        depth: usize,
        group: String,
        name: String,
        version: String,
        marker: Option<char>,
    },
    Project {
        depth: usize,
    },
}

/// Classify a single line; `None` for headers, separators, legends and noise.
pub fn parse_line(line: &str) -> Option<TreeLine> {
    let caps = line_re().captures(line.trim_end())?;
    let depth = caps["indent"].len() / INDENT_WIDTH;
    let body = caps["body"].trim();

    if body.starts_with("project ") {
        return Some(TreeLine::Project { depth });
    }

    // `g:a:1.0 -> project :lib` is a module substituted by a build project.
    if body
        .split_once(" -> ")
        .is_some_and(|(_, target)| target.trim_start().starts_with("project "))
    {
        return Some(TreeLine::Project { depth });
    }

    let coord = coordinate_re().captures(body)?;
    let declared = coord.name("version").map(|m| m.as_str());
    let version = match coord.name("selected") {
        Some(selected) => selected.as_str().to_string(),
        None => match declared {
            Some(v) if v.starts_with('{') => rich_version_re()
                .captures(v)
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            Some(v) => v.to_string(),
            None => UNKNOWN.to_string(),
        },
    };

    Some(TreeLine::Package {
        depth,
        group: coord["group"].to_string(),
        name: coord["name"].to_string(),
        version,
        marker: coord
            .name("marker")
            .and_then(|m| m.as_str().chars().next()),
    })
}

/// Owned nodes waiting for their subtree to finish, keyed by depth.
struct TreeBuilder {
    roots: Vec<DependencyNode>,
    stack: Vec<(usize, DependencyNode)>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            roots: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// Close every open node at `depth` or deeper.
    fn unwind_to(&mut self, depth: usize) {
        while self.stack.last().is_some_and(|(d, _)| *d >= depth) {
            if let Some((_, node)) = self.stack.pop() {
                self.attach(node);
            }
        }
    }

    fn attach(&mut self, node: DependencyNode) {
        match self.stack.last_mut() {
            Some((_, parent)) => parent.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn open(&mut self, depth: usize, build: impl FnOnce(Vec<String>) -> DependencyNode) {
        self.unwind_to(depth);
        let path = self
            .stack
            .last()
            .map(|(_, parent)| parent.child_path())
            .unwrap_or_default();
        self.stack.push((depth, build(path)));
    }

    fn finish(mut self) -> Vec<DependencyNode> {
        self.unwind_to(0);
        self.roots
    }
}

/// Build one bucket's forest from report lines.
///
/// Constraint entries `(c)` only restate a module found elsewhere and are skipped.
pub fn parse_tree<S: AsRef<str>>(
    lines: &[S],
    scope: Scope,
    confidence: ResolutionConfidence,
) -> Vec<DependencyNode> {
    let mut builder = TreeBuilder::new();
    // Raw depths of enclosing `project :x` lines.
    let mut projects: Vec<usize> = Vec::new();

    for line in lines {
        let Some(parsed) = parse_line(line.as_ref()) else {
            continue;
        };

        let raw_depth = match &parsed {
            TreeLine::Package { depth, .. } | TreeLine::Project { depth } => *depth,
        };
        while projects.last().is_some_and(|d| *d >= raw_depth) {
            projects.pop();
        }
        let depth = raw_depth - projects.len();

        match parsed {
            TreeLine::Project { .. } => projects.push(raw_depth),
            TreeLine::Package { marker: Some('c'), .. } => {}
            TreeLine::Package {
                group, name, version, ..
            } => {
                builder.open(depth, |path| {
                    let direct = depth == 0;
                    let coordinate = PackageCoordinate::new(
                        &group,
                        &name,
                        &version,
                        Ecosystem::Gradle,
                        scope,
                        direct,
                    );
                    DependencyNode::new(coordinate, path, confidence)
                });
            }
        }
    }

    builder.finish()
}
