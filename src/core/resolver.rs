//! Dependency resolution
//!
//! Computes the build order of a set of builders. Nodes are identified by
//! their index, which the orchestrator keeps equal to the registration
//! index, so ties are broken by registration order.

use std::collections::{HashSet, VecDeque};

use crate::error::ResolverError;

/// Dependency graph over builders
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Node names, used for error reporting
    names: Vec<String>,
    /// Adjacency list: dependency -> dependents
    dependents: Vec<Vec<usize>>,
    /// Distinct edges, so repeated declarations count once
    edges: HashSet<(usize, usize)>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and return its index
    pub fn add_node(&mut self, name: impl Into<String>) -> usize {
        self.names.push(name.into());
        self.dependents.push(Vec::new());
        self.names.len() - 1
    }

    /// Record that `dependent` must be built after `dependency`
    ///
    /// # Panics
    ///
    /// Panics if either index was not returned by [`Self::add_node`].
    pub fn add_edge(&mut self, dependency: usize, dependent: usize) {
        assert!(
            dependency < self.names.len() && dependent < self.names.len(),
            "edge refers to unknown node"
        );
        if self.edges.insert((dependency, dependent)) {
            self.dependents[dependency].push(dependent);
        }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Compute topological sort (build order)
    ///
    /// Returns node indices such that dependencies come before dependents.
    /// Nodes with no pending dependencies are emitted first-in first-out,
    /// seeded in index order. Nodes left over belong to or hang off a
    /// cycle and are reported in index order.
    pub fn topological_sort(&self) -> Result<Vec<usize>, ResolverError> {
        let mut in_degree = vec![0usize; self.len()];
        for &(_, dependent) in &self.edges {
            in_degree[dependent] += 1;
        }

        let mut queue: VecDeque<usize> = (0..self.len()).filter(|&n| in_degree[n] == 0).collect();
        let mut order = Vec::with_capacity(self.len());

        while let Some(node) = queue.pop_front() {
            order.push(node);
            for &dependent in &self.dependents[node] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if order.len() < self.len() {
            let builders = (0..self.len())
                .filter(|&n| in_degree[n] > 0)
                .map(|n| self.names[n].clone())
                .collect();
            return Err(ResolverError::CircularDependency { builders });
        }

        Ok(order)
    }

    /// Check if the graph has any cycles
    pub fn has_cycle(&self) -> bool {
        self.topological_sort().is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::generators::dag_edges;
    use proptest::prelude::*;

    #[test]
    fn test_simple_dependency_order() {
        let mut graph = DependencyGraph::new();
        let app = graph.add_node("app");
        let lib = graph.add_node("lib");
        graph.add_edge(lib, app);

        let order = graph.topological_sort().unwrap();
        let lib_pos = order.iter().position(|&x| x == lib).unwrap();
        let app_pos = order.iter().position(|&x| x == app).unwrap();

        assert!(lib_pos < app_pos, "lib should be built before app");
    }

    #[test]
    fn test_independent_nodes_keep_insertion_order() {
        let mut graph = DependencyGraph::new();
        for name in ["c", "a", "b"] {
            graph.add_node(name);
        }
        assert_eq!(graph.topological_sort().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_ready_nodes_are_fifo() {
        // 0 -> 2, 1 -> 3: both roots go first, then their dependents in order
        let mut graph = DependencyGraph::new();
        let nodes: Vec<_> = ["a", "b", "c", "d"].iter().map(|n| graph.add_node(*n)).collect();
        graph.add_edge(nodes[0], nodes[2]);
        graph.add_edge(nodes[1], nodes[3]);

        assert_eq!(graph.topological_sort().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_duplicate_edges_count_once() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        graph.add_edge(a, b);
        graph.add_edge(a, b);

        assert_eq!(graph.topological_sort().unwrap(), vec![a, b]);
    }

    #[test]
    fn test_circular_dependency_detection() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        let c = graph.add_node("c");
        graph.add_edge(b, a);
        graph.add_edge(c, b);
        graph.add_edge(a, c);

        assert!(graph.has_cycle());
        match graph.topological_sort() {
            Err(ResolverError::CircularDependency { builders }) => {
                assert_eq!(builders, vec!["a", "b", "c"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_cycle_excludes_unrelated_nodes() {
        let mut graph = DependencyGraph::new();
        let free = graph.add_node("free");
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        graph.add_edge(free, a);
        graph.add_edge(a, b);
        graph.add_edge(b, a);

        match graph.topological_sort() {
            Err(ResolverError::CircularDependency { builders }) => {
                assert_eq!(builders, vec!["a", "b"]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let mut graph = DependencyGraph::new();
        let a = graph.add_node("a");
        graph.add_edge(a, a);
        assert!(graph.has_cycle());
    }

    proptest! {
        #[test]
        fn prop_sort_respects_every_edge((nodes, edges) in dag_edges(12)) {
            let mut graph = DependencyGraph::new();
            for n in 0..nodes {
                graph.add_node(format!("n{n}"));
            }
            for &(dependency, dependent) in &edges {
                graph.add_edge(dependency, dependent);
            }

            let order = graph.topological_sort().unwrap();
            prop_assert_eq!(order.len(), nodes);

            let position: Vec<usize> = {
                let mut pos = vec![0; nodes];
                for (i, &n) in order.iter().enumerate() {
                    pos[n] = i;
                }
                pos
            };
            for (dependency, dependent) in edges {
                prop_assert!(position[dependency] < position[dependent]);
            }
        }
    }
}
