//! Structural validation
//!
//! Three independent checks, run in order by the gate: completeness,
//! acyclicity, operating mode. Each returns the first failure it finds.

use std::collections::{HashMap, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::debug;

use crate::artifact::{DependencyGraph, Index, Registry, VersionManifest};
use crate::error::{GateError, Result};

/// Every registry id is indexed exactly once, and the declared count agrees
pub fn check_completeness(registry: &Registry, index: &Index) -> Result<()> {
    let registry_ids = registry.ids();
    let index_ids = index.ids();

    if registry_ids != index_ids {
        let missing: Vec<&str> = registry_ids.difference(&index_ids).copied().collect();
        let extra: Vec<&str> = index_ids.difference(&registry_ids).copied().collect();

        let mut parts = Vec::new();
        if !missing.is_empty() {
            parts.push(format!("missing from index: [{}]", missing.join(", ")));
        }
        if !extra.is_empty() {
            parts.push(format!("extra in index: [{}]", extra.join(", ")));
        }
        return Err(GateError::Schema(format!(
            "ACU ID mismatch between registry and index ({})",
            parts.join("; ")
        )));
    }

    let actual = registry_ids.len() as u64;
    match registry.total_count {
        Some(declared) if declared == actual => Ok(()),
        Some(declared) => Err(GateError::Schema(format!(
            "ACU count mismatch in registry metadata: declared {}, found {} unique ids",
            declared, actual
        ))),
        None => Err(GateError::Schema(format!(
            "ACU count mismatch in registry metadata: total_acu_count missing, found {} unique ids",
            actual
        ))),
    }
}

/// Dependency graph built over the declared node set
pub struct DeclaredGraph<'a> {
    graph: DiGraph<&'a str, ()>,
    node_index: HashMap<&'a str, NodeIndex>,
}

impl<'a> DeclaredGraph<'a> {
    /// Build the graph, rejecting duplicate nodes and dangling edges
    pub fn build(declared: &'a DependencyGraph) -> Result<Self> {
        let mut graph = DiGraph::with_capacity(declared.nodes.len(), declared.edges.len());
        let mut node_index = HashMap::with_capacity(declared.nodes.len());

        for node in &declared.nodes {
            if node_index.contains_key(node.as_str()) {
                return Err(GateError::Graph(format!(
                    "Dependency graph declares node '{}' more than once",
                    node
                )));
            }
            let idx = graph.add_node(node.as_str());
            node_index.insert(node.as_str(), idx);
        }

        for edge in &declared.edges {
            let (from, to) = match (node_index.get(edge.from.as_str()), node_index.get(edge.to.as_str())) {
                (Some(&from), Some(&to)) => (from, to),
                _ => {
                    return Err(GateError::Graph(format!(
                        "Dependency graph contains undefined nodes: edge {} -> {}",
                        edge.from, edge.to
                    )))
                }
            };
            graph.add_edge(from, to, ());
        }

        Ok(Self { graph, node_index })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// Kahn's algorithm. Returns the nodes left unvisited, sorted; empty iff acyclic.
    pub fn unvisited_after_kahn(&self) -> Vec<&'a str> {
        let mut in_degree: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| self.graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();

        // Seed in declaration order so traversal is reproducible
        let mut queue: VecDeque<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|n| in_degree[n.index()] == 0)
            .collect();
        let mut visited = vec![false; self.graph.node_count()];

        while let Some(node) = queue.pop_front() {
            visited[node.index()] = true;
            for neighbor in self.graph.neighbors_directed(node, Direction::Outgoing) {
                in_degree[neighbor.index()] -= 1;
                if in_degree[neighbor.index()] == 0 {
                    queue.push_back(neighbor);
                }
            }
        }

        let mut remaining: Vec<&'a str> = self
            .graph
            .node_indices()
            .filter(|n| !visited[n.index()])
            .map(|n| self.graph[n])
            .collect();
        remaining.sort_unstable();
        remaining
    }
}

/// Every edge endpoint is declared and the graph has no cycle
pub fn check_acyclic(declared: &DependencyGraph) -> Result<()> {
    let graph = DeclaredGraph::build(declared)?;
    let remaining = graph.unvisited_after_kahn();

    debug!(
        nodes = graph.node_count(),
        edges = declared.edges.len(),
        unvisited = remaining.len(),
        "dependency graph traversed"
    );

    if remaining.is_empty() {
        Ok(())
    } else {
        Err(GateError::Graph(format!(
            "Dependency graph contains a cycle among: [{}]",
            remaining.join(", ")
        )))
    }
}

/// Manifest and registry agree on a sanctioned operating mode
pub fn check_operating_mode(
    manifest: &VersionManifest,
    registry: &Registry,
    allowed_modes: &[String],
) -> Result<()> {
    let manifest_mode = manifest
        .operating_mode
        .as_deref()
        .ok_or_else(|| GateError::Mode("Operating mode missing from manifest".to_string()))?;

    if manifest_mode != registry.operating_mode {
        return Err(GateError::Mode(format!(
            "Operating mode mismatch: manifest '{}', registry '{}'",
            manifest_mode, registry.operating_mode
        )));
    }

    if !allowed_modes.iter().any(|m| m == manifest_mode) {
        return Err(GateError::Mode(format!(
            "Operating mode '{}' is not permitted (allowed: {})",
            manifest_mode,
            allowed_modes.join(", ")
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{Edge, Record};
    use serde_json::Map;

    fn registry(ids: &[&str], total: Option<u64>) -> Registry {
        Registry {
            records: ids
                .iter()
                .map(|id| Record { id: id.to_string(), metadata: Map::new() })
                .collect(),
            total_count: total,
            operating_mode: "STRUCTURAL_ONLY".to_string(),
        }
    }

    fn index(ids: &[&str]) -> Index {
        let mut entries = Map::new();
        for id in ids {
            entries.insert(id.to_string(), serde_json::json!({}));
        }
        Index { entries }
    }

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> DependencyGraph {
        DependencyGraph {
            nodes: nodes.iter().map(|n| n.to_string()).collect(),
            edges: edges
                .iter()
                .map(|(f, t)| Edge { from: f.to_string(), to: t.to_string() })
                .collect(),
        }
    }

    fn modes() -> Vec<String> {
        vec!["STRUCTURAL_ONLY".to_string()]
    }

    #[test]
    fn test_completeness_ok() {
        check_completeness(&registry(&["A", "B", "C"], Some(3)), &index(&["C", "B", "A"])).unwrap();
    }

    #[test]
    fn test_completeness_missing_from_index() {
        let err = check_completeness(&registry(&["A", "B", "C"], Some(3)), &index(&["A", "B"])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("missing from index: [C]"), "{}", msg);
        assert!(!msg.contains("extra in index"));
    }

    #[test]
    fn test_completeness_extra_in_index() {
        let err = check_completeness(&registry(&["A"], Some(1)), &index(&["A", "Z"])).unwrap_err();
        assert!(err.to_string().contains("extra in index: [Z]"));
    }

    #[test]
    fn test_completeness_count_mismatch() {
        let err = check_completeness(&registry(&["A", "B"], Some(3)), &index(&["A", "B"])).unwrap_err();
        assert!(err.to_string().contains("declared 3, found 2"));

        let err = check_completeness(&registry(&["A"], None), &index(&["A"])).unwrap_err();
        assert!(matches!(err, GateError::Schema(_)));
    }

    #[test]
    fn test_duplicate_record_fails_count() {
        let err = check_completeness(&registry(&["A", "A"], Some(2)), &index(&["A"])).unwrap_err();
        assert!(err.to_string().contains("found 1 unique ids"));
    }

    #[test]
    fn test_acyclic_chain() {
        check_acyclic(&graph(&["A", "B", "C"], &[("A", "B"), ("B", "C")])).unwrap();
        check_acyclic(&graph(&[], &[])).unwrap();
    }

    #[test]
    fn test_cycle_detected() {
        let err = check_acyclic(&graph(&["A", "B", "C"], &[("A", "B"), ("B", "C"), ("C", "A")])).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_back_edge_detected_at_every_size() {
        for n in 2..12 {
            let names: Vec<String> = (0..n).map(|i| format!("N{}", i)).collect();
            let nodes: Vec<&str> = names.iter().map(String::as_str).collect();
            let mut edges: Vec<(&str, &str)> = nodes.windows(2).map(|w| (w[0], w[1])).collect();
            check_acyclic(&graph(&nodes, &edges)).unwrap();

            edges.push((nodes[n - 1], nodes[0]));
            let err = check_acyclic(&graph(&nodes, &edges)).unwrap_err();
            assert!(matches!(err, GateError::Graph(_)), "n = {}", n);
        }
    }

    #[test]
    fn test_self_loop_is_cycle() {
        let err = check_acyclic(&graph(&["A"], &[("A", "A")])).unwrap_err();
        assert!(err.to_string().contains("[A]"));
    }

    #[test]
    fn test_cycle_remainder_excludes_upstream() {
        let g = graph(&["R", "A", "B"], &[("R", "A"), ("A", "B"), ("B", "A")]);
        let declared = DeclaredGraph::build(&g).unwrap();
        assert_eq!(declared.unvisited_after_kahn(), vec!["A", "B"]);
    }

    #[test]
    fn test_dangling_edge() {
        let err = check_acyclic(&graph(&["A"], &[("A", "B")])).unwrap_err();
        assert!(err.to_string().contains("undefined nodes"));
    }

    #[test]
    fn test_duplicate_node() {
        let err = check_acyclic(&graph(&["A", "A"], &[])).unwrap_err();
        assert!(matches!(err, GateError::Graph(_)));
    }

    #[test]
    fn test_mode_consistency() {
        let reg = registry(&[], Some(0));
        let mut manifest = VersionManifest {
            operating_mode: Some("STRUCTURAL_ONLY".to_string()),
            ..Default::default()
        };
        check_operating_mode(&manifest, &reg, &modes()).unwrap();

        manifest.operating_mode = Some("SEMANTIC".to_string());
        let err = check_operating_mode(&manifest, &reg, &modes()).unwrap_err();
        assert!(err.to_string().contains("mismatch"));

        manifest.operating_mode = None;
        assert!(matches!(check_operating_mode(&manifest, &reg, &modes()), Err(GateError::Mode(_))));
    }

    #[test]
    fn test_mode_not_allowed() {
        let mut reg = registry(&[], Some(0));
        reg.operating_mode = "OPEN".to_string();
        let manifest = VersionManifest {
            operating_mode: Some("OPEN".to_string()),
            ..Default::default()
        };
        let err = check_operating_mode(&manifest, &reg, &modes()).unwrap_err();
        assert!(err.to_string().contains("not permitted"));
    }
}
