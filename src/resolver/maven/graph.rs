//! Transitive closure of a project's dependencies.
//!
//! Breadth-first over descriptors, nearest-wins by `group:artifact`. The walk
//! records an index arena first and only then builds the owned node tree, so
//! every node ends up with exactly one parent.

use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use tracing::{debug, warn};

use super::effective::{EffectiveModel, ModelBuilder, ResolvedDependency};
use super::pom::Exclusion;
use crate::models::{
    DependencyNode, Ecosystem, PackageCoordinate, ResolutionConfidence, Scope, UNKNOWN,
};
use crate::registry::maven::ArtifactKey;

struct Entry {
    dependency: ResolvedDependency,
    depth: usize,
    /// Exclusions accumulated from the root down to this entry.
    exclusions: Rc<Vec<Exclusion>>,
    children: Vec<usize>,
}

/// Scope a transitive dependency takes under its parent, `None` when the edge is dropped.
pub fn mediate_scope(parent: Scope, child: Scope) -> Option<Scope> {
    match child {
        Scope::Compile => Some(parent),
        Scope::Runtime => match parent {
            Scope::Compile | Scope::Runtime => Some(Scope::Runtime),
            other => Some(other),
        },
        Scope::Test | Scope::Provided | Scope::System => None,
    }
}

/// Resolve the full dependency forest of `project`.
///
/// Roots are the project's effective dependencies; a root is direct only when
/// the project's own descriptor declares it.
pub fn resolve_graph(
    builder: &ModelBuilder<'_>,
    project: &EffectiveModel,
    max_depth: usize,
) -> Vec<DependencyNode> {
    let mut arena: Vec<Entry> = Vec::new();
    let mut roots: Vec<usize> = Vec::new();
    let mut selected: HashMap<String, String> = HashMap::new();
    let mut queue: VecDeque<usize> = VecDeque::new();
    let chain = vec![project.key.to_string()];

    for dep in &project.dependencies {
        if selected.contains_key(&dep.key()) {
            continue;
        }
        selected.insert(dep.key(), dep.version.clone());
        arena.push(Entry {
            dependency: dep.clone(),
            depth: 0,
            exclusions: Rc::new(dep.exclusions.clone()),
            children: Vec::new(),
        });
        roots.push(arena.len() - 1);
        queue.push_back(arena.len() - 1);
    }

    while let Some(index) = queue.pop_front() {
        let (key, scope, depth, exclusions) = {
            let entry = &arena[index];
            let dep = &entry.dependency;
            (
                ArtifactKey::new(&dep.group_id, &dep.artifact_id, &dep.version),
                dep.scope,
                entry.depth,
                Rc::clone(&entry.exclusions),
            )
        };

        if depth + 1 >= max_depth {
            debug!(artifact = %key, depth, "depth limit reached");
            continue;
        }
        if key.version == UNKNOWN || key.group_id == UNKNOWN {
            continue;
        }

        let model = match builder.load_artifact(&key, &chain) {
            Ok(model) => model,
            Err(e) => {
                warn!(
                    artifact = %key,
                    error = %e,
                    "descriptor unavailable, transitive dependencies skipped"
                );
                continue;
            }
        };

        for child in &model.dependencies {
            if child.optional {
                continue;
            }
            if exclusions.iter().any(|e| e.matches(&child.group_id, &child.artifact_id)) {
                debug!(parent = %key, excluded = %child.key(), "excluded");
                continue;
            }
            let Some(child_scope) = mediate_scope(scope, child.scope) else {
                continue;
            };

            let child_key = child.key();
            if let Some(winner) = selected.get(&child_key) {
                if winner != &child.version {
                    debug!(
                        dependency = %child_key,
                        kept = %winner,
                        omitted = %child.version,
                        "version conflict, nearest wins"
                    );
                }
                continue;
            }

            let version = project
                .managed
                .get(&child_key)
                .map(|m| m.version.clone())
                .filter(|v| v != UNKNOWN)
                .unwrap_or_else(|| child.version.clone());

            let mut child_exclusions = (*exclusions).clone();
            child_exclusions.extend(child.exclusions.iter().cloned());

            selected.insert(child_key, version.clone());
            arena.push(Entry {
                dependency: ResolvedDependency {
                    version,
                    scope: child_scope,
                    ..child.clone()
                },
                depth: depth + 1,
                exclusions: Rc::new(child_exclusions),
                children: Vec::new(),
            });
            let child_index = arena.len() - 1;
            arena[index].children.push(child_index);
            queue.push_back(child_index);
        }
    }

    roots
        .iter()
        .map(|&index| {
            let is_direct = project.declared.contains(&arena[index].dependency.key());
            build_node(&arena, index, Vec::new(), is_direct)
        })
        .collect()
}

fn build_node(arena: &[Entry], index: usize, path: Vec<String>, is_direct: bool) -> DependencyNode {
    let dep = &arena[index].dependency;
    let coordinate = PackageCoordinate::new(
        &dep.group_id,
        &dep.artifact_id,
        &dep.version,
        Ecosystem::Maven,
        dep.scope,
        is_direct,
    );
    let mut node = DependencyNode::new(coordinate, path, ResolutionConfidence::High);
    let child_path = node.child_path();
    node.children = arena[index]
        .children
        .iter()
        .map(|&child| build_node(arena, child, child_path.clone(), false))
        .collect();
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::maven::PomRepository;
    use crate::resolver::maven::effective::tests::install;
    use tempfile::TempDir;

    fn pom(group: &str, artifact: &str, version: &str, deps: &str) -> String {
        format!(
            "<project><groupId>{group}</groupId><artifactId>{artifact}</artifactId><version>{version}</version><dependencies>{deps}</dependencies></project>"
        )
    }

    fn dep(group: &str, artifact: &str, version: &str, extra: &str) -> String {
        format!(
            "<dependency><groupId>{group}</groupId><artifactId>{artifact}</artifactId><version>{version}</version>{extra}</dependency>"
        )
    }

    #[test]
    fn test_mediate_scope() {
        assert_eq!(mediate_scope(Scope::Compile, Scope::Compile), Some(Scope::Compile));
        assert_eq!(mediate_scope(Scope::Compile, Scope::Runtime), Some(Scope::Runtime));
        assert_eq!(mediate_scope(Scope::Test, Scope::Compile), Some(Scope::Test));
        assert_eq!(mediate_scope(Scope::Test, Scope::Runtime), Some(Scope::Test));
        assert_eq!(mediate_scope(Scope::Compile, Scope::Test), None);
        assert_eq!(mediate_scope(Scope::Runtime, Scope::Provided), None);
    }

    #[test]
    fn test_transitive_tree_with_nearest_wins() {
        let repo = TempDir::new().unwrap();
        // a -> b:1 -> c:1 ; a -> x(test) ; d -> b:2 (omitted, b:1 is nearer)
        install(
            repo.path(),
            "g",
            "a",
            "1",
            &pom(
                "g",
                "a",
                "1",
                &[
                    dep("g", "b", "1", ""),
                    dep("g", "x", "1", "<scope>test</scope>"),
                    dep("g", "opt", "1", "<optional>true</optional>"),
                ]
                .concat(),
            ),
        );
        let runtime_c = dep("g", "c", "1", "<scope>runtime</scope>");
        install(repo.path(), "g", "b", "1", &pom("g", "b", "1", &runtime_c));
        install(repo.path(), "g", "b", "2", &pom("g", "b", "2", ""));
        install(repo.path(), "g", "c", "1", &pom("g", "c", "1", ""));
        install(repo.path(), "g", "d", "1", &pom("g", "d", "1", &dep("g", "b", "2", "")));

        let project = TempDir::new().unwrap();
        let pom_path = project.path().join("pom.xml");
        std::fs::write(
            &pom_path,
            pom("g", "app", "1", &[dep("g", "a", "1", ""), dep("g", "d", "1", "")].concat()),
        )
        .unwrap();

        let source = PomRepository::offline(repo.path());
        let builder = ModelBuilder::new(&source);
        let model = builder.build_project(&pom_path).unwrap();
        let forest = resolve_graph(&builder, &model, 32);

        assert_eq!(forest.len(), 2);
        let a = &forest[0];
        assert_eq!(a.coordinate.to_string(), "g:a:1");
        assert!(a.coordinate.is_direct);
        assert!(a.path_from_root.is_empty());
        assert_eq!(a.children.len(), 1);

        let b = &a.children[0];
        assert_eq!(b.coordinate.to_string(), "g:b:1");
        assert!(!b.coordinate.is_direct);
        assert_eq!(b.path_from_root, vec!["g:a:1"]);

        let c = &b.children[0];
        assert_eq!(c.coordinate.to_string(), "g:c:1");
        assert_eq!(c.scope, Scope::Runtime);
        assert_eq!(c.path_from_root, vec!["g:a:1", "g:b:1"]);

        // b:2 under d lost to the nearer b:1
        assert!(forest[1].children.is_empty());
        assert!(forest.iter().all(|r| r.confidence == ResolutionConfidence::High));
    }

    #[test]
    fn test_exclusions_and_root_management() {
        let repo = TempDir::new().unwrap();
        install(
            repo.path(),
            "g",
            "a",
            "1",
            &pom("g", "a", "1", &[dep("g", "b", "1", ""), dep("g", "c", "1", "")].concat()),
        );
        install(repo.path(), "g", "b", "1", &pom("g", "b", "1", ""));
        install(repo.path(), "g", "c", "5", &pom("g", "c", "5", ""));

        let project = TempDir::new().unwrap();
        let pom_path = project.path().join("pom.xml");
        std::fs::write(
            &pom_path,
            r#"<project><groupId>g</groupId><artifactId>app</artifactId><version>1</version>
  <dependencyManagement><dependencies>
    <dependency><groupId>g</groupId><artifactId>c</artifactId><version>5</version></dependency>
  </dependencies></dependencyManagement>
  <dependencies>
    <dependency><groupId>g</groupId><artifactId>a</artifactId><version>1</version>
      <exclusions><exclusion><groupId>g</groupId><artifactId>b</artifactId></exclusion></exclusions>
    </dependency>
  </dependencies>
</project>"#,
        )
        .unwrap();

        let source = PomRepository::offline(repo.path());
        let builder = ModelBuilder::new(&source);
        let model = builder.build_project(&pom_path).unwrap();
        let forest = resolve_graph(&builder, &model, 32);

        let children: Vec<String> = forest[0]
            .children
            .iter()
            .map(|n| n.coordinate.to_string())
            .collect();
        assert_eq!(children, vec!["g:c:5"]);
    }

    #[test]
    fn test_missing_descriptor_keeps_leaf() {
        let repo = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let pom_path = project.path().join("pom.xml");
        std::fs::write(&pom_path, pom("g", "app", "1", &dep("g", "ghost", "1", ""))).unwrap();

        let source = PomRepository::offline(repo.path());
        let builder = ModelBuilder::new(&source);
        let model = builder.build_project(&pom_path).unwrap();
        let forest = resolve_graph(&builder, &model, 32);

        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].coordinate.to_string(), "g:ghost:1");
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn test_dependency_cycle_terminates() {
        let repo = TempDir::new().unwrap();
        install(repo.path(), "g", "a", "1", &pom("g", "a", "1", &dep("g", "b", "1", "")));
        install(repo.path(), "g", "b", "1", &pom("g", "b", "1", &dep("g", "a", "1", "")));

        let project = TempDir::new().unwrap();
        let pom_path = project.path().join("pom.xml");
        std::fs::write(&pom_path, pom("g", "app", "1", &dep("g", "a", "1", ""))).unwrap();

        let source = PomRepository::offline(repo.path());
        let builder = ModelBuilder::new(&source);
        let model = builder.build_project(&pom_path).unwrap();
        let forest = resolve_graph(&builder, &model, 32);

        assert_eq!(forest[0].subtree_len(), 2);
    }
}
