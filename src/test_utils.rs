//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate an acyclic graph as `(node_count, edges)`
    ///
    /// Each edge is `(dependency, dependent)`. Nodes are ranked by a random
    /// permutation and edges always point from lower to higher rank, so
    /// edge direction is unrelated to node index.
    pub fn dag_edges(max_nodes: usize) -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
        (1..=max_nodes)
            .prop_flat_map(|n| {
                (
                    Just(n),
                    prop::collection::vec((0..n, 0..n), 0..=n * 2),
                    Just((0..n).collect::<Vec<_>>()).prop_shuffle(),
                )
            })
            .prop_map(|(n, pairs, rank)| {
                let edges = pairs
                    .into_iter()
                    .filter(|(a, b)| a != b)
                    .map(|(a, b)| (rank[a.min(b)], rank[a.max(b)]))
                    .collect();
                (n, edges)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_dag_edges_generator((nodes, edges) in dag_edges(10)) {
            prop_assert!(nodes >= 1);
            for (dependency, dependent) in edges {
                prop_assert!(dependency < nodes);
                prop_assert!(dependent < nodes);
                prop_assert_ne!(dependency, dependent);
            }
        }
    }
}
