use tracing::debug;

use crate::models::DependencyNode;

/// Union `incoming` into `target`, matching siblings by coordinate.
///
/// The node already present keeps its scope; children are merged recursively.
/// Callers feed buckets in declared order, so the first bucket wins scope.
pub fn merge_forest(target: &mut Vec<DependencyNode>, incoming: Vec<DependencyNode>) {
    for node in incoming {
        match target.iter_mut().find(|n| n.coordinate == node.coordinate) {
            Some(existing) => {
                if existing.scope != node.scope {
                    debug!(
                        coordinate = %existing.coordinate,
                        kept = %existing.scope,
                        dropped = %node.scope,
                        "scope conflict across buckets"
                    );
                }
                existing.coordinate.is_direct |= node.coordinate.is_direct;
                existing.confidence = existing.confidence.min(node.confidence);
                merge_forest(&mut existing.children, node.children);
            }
            None => target.push(node),
        }
    }
}
