//! Dependency graph and activation ordering.
//!
//! The registry orders extensions twice with this graph: by `dependencies`
//! for display, and by `overrides` to decide which extension starts first.
//! Ordering is an iterative fixed point: each pass places every unplaced
//! item whose dependencies are all placed, and passes repeat until one
//! places nothing.
//!
//! Items that can never be placed (members of a cycle, anything depending
//! on them, or anything depending on a key that is not in the graph) are
//! left out of the order and reported in [`SortOutcome::unresolved`].
//!
//! # Example
//!
//! ```
//! use ext_registry::dependency::DependencyGraph;
//!
//! let mut graph = DependencyGraph::new();
//! graph.add_node("b", ["a"]);
//! graph.add_node("a", []);
//!
//! let outcome = graph.sort();
//! assert_eq!(outcome.sorted, vec!["a", "b"]);
//! assert!(outcome.unresolved.is_empty());
//! ```

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Result of [`DependencyGraph::sort`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOutcome<K> {
    /// Items in an order where each follows all of its dependencies.
    pub sorted: Vec<K>,
    /// Items that could not be placed, in insertion order.
    pub unresolved: Vec<K>,
}

impl<K> SortOutcome<K> {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Directed graph from items to the items they depend on.
///
/// Insertion order is kept and used as the tie-break between items that
/// become placeable in the same pass. Dependency keys need not be nodes.
#[derive(Debug, Clone)]
pub struct DependencyGraph<K> {
    nodes: Vec<K>,
    /// Adjacency list: key depends on each value.
    edges: HashMap<K, Vec<K>>,
}

impl<K> Default for DependencyGraph<K> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> DependencyGraph<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item with its dependency list.
    ///
    /// Re-adding an item replaces its dependencies but keeps its original
    /// position. Duplicate dependencies are collapsed.
    pub fn add_node(&mut self, item: K, dependencies: impl IntoIterator<Item = K>) {
        let mut deps: Vec<K> = Vec::new();
        for dep in dependencies {
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }
        if !self.edges.contains_key(&item) {
            self.nodes.push(item.clone());
        }
        self.edges.insert(item, deps);
    }

    /// Declare that `from` depends on `to`, adding `from` if needed.
    pub fn add_edge(&mut self, from: K, to: K) {
        if !self.edges.contains_key(&from) {
            self.nodes.push(from.clone());
        }
        let deps = self.edges.entry(from).or_default();
        if !deps.contains(&to) {
            deps.push(to);
        }
    }

    pub fn contains(&self, item: &K) -> bool {
        self.edges.contains_key(item)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Direct dependencies of an item (empty for unknown items).
    pub fn dependencies_of(&self, item: &K) -> &[K] {
        self.edges.get(item).map(Vec::as_slice).unwrap_or_default()
    }

    /// Order the items so that each follows all of its dependencies.
    ///
    /// Never fails: unplaceable items are dropped from `sorted` and listed
    /// in `unresolved`.
    pub fn sort(&self) -> SortOutcome<K> {
        let mut placed: HashSet<&K> = HashSet::with_capacity(self.nodes.len());
        let mut sorted: Vec<K> = Vec::with_capacity(self.nodes.len());
        let mut pending: Vec<&K> = self.nodes.iter().collect();

        loop {
            let before = pending.len();
            let mut still_pending = Vec::with_capacity(before);

            for item in pending {
                let ready = self
                    .dependencies_of(item)
                    .iter()
                    .all(|dep| placed.contains(dep));
                if ready {
                    placed.insert(item);
                    sorted.push(item.clone());
                } else {
                    still_pending.push(item);
                }
            }

            pending = still_pending;
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }

        SortOutcome {
            sorted,
            unresolved: pending.into_iter().cloned().collect(),
        }
    }
}

impl<K, D> FromIterator<(K, D)> for DependencyGraph<K>
where
    K: Eq + Hash + Clone,
    D: IntoIterator<Item = K>,
{
    fn from_iter<I: IntoIterator<Item = (K, D)>>(iter: I) -> Self {
        let mut graph = Self::new();
        for (item, deps) in iter {
            graph.add_node(item, deps);
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_graph() {
        let graph: DependencyGraph<&str> = DependencyGraph::new();
        let outcome = graph.sort();
        assert!(outcome.sorted.is_empty());
        assert!(outcome.is_complete());
    }

    #[test]
    fn linear_chain() {
        let graph: DependencyGraph<&str> =
            [("c", vec!["b"]), ("b", vec!["a"]), ("a", vec![])].into_iter().collect();
        assert_eq!(graph.sort().sorted, vec!["a", "b", "c"]);
    }

    #[test]
    fn diamond() {
        let graph: DependencyGraph<&str> = [
            ("top", vec!["left", "right"]),
            ("left", vec!["base"]),
            ("right", vec!["base"]),
            ("base", vec![]),
        ]
        .into_iter()
        .collect();

        let sorted = graph.sort().sorted;
        assert_eq!(sorted.first(), Some(&"base"));
        assert_eq!(sorted.last(), Some(&"top"));
        assert_eq!(sorted.len(), 4);
    }

    #[test]
    fn insertion_order_is_tie_break() {
        let graph: DependencyGraph<&str> =
            [("zebra", vec![]), ("alpha", vec![]), ("mid", vec![])].into_iter().collect();
        assert_eq!(graph.sort().sorted, vec!["zebra", "alpha", "mid"]);
    }

    #[test]
    fn placement_within_a_pass_is_immediate() {
        // "late" sees "root" placed earlier in the same pass; "early" waits a pass
        let graph: DependencyGraph<&str> = [
            ("early", vec!["root"]),
            ("root", vec![]),
            ("late", vec!["root"]),
        ]
        .into_iter()
        .collect();
        assert_eq!(graph.sort().sorted, vec!["root", "late", "early"]);
    }

    #[test]
    fn cycle_members_are_dropped() {
        let graph: DependencyGraph<&str> =
            [("a", vec!["b"]), ("b", vec!["a"])].into_iter().collect();
        let outcome = graph.sort();
        assert!(outcome.sorted.is_empty());
        assert_eq!(outcome.unresolved, vec!["a", "b"]);
    }

    #[test]
    fn unknown_dependency_drops_item_without_error() {
        let graph: DependencyGraph<&str> =
            [("a", vec![]), ("b", vec!["ghost"]), ("c", vec!["b"])].into_iter().collect();
        let outcome = graph.sort();
        assert_eq!(outcome.sorted, vec!["a"]);
        assert_eq!(outcome.unresolved, vec!["b", "c"]);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let graph: DependencyGraph<&str> = [("a", vec!["a"])].into_iter().collect();
        assert_eq!(graph.sort().unresolved, vec!["a"]);
    }

    #[test]
    fn add_node_replaces_dependencies_in_place() {
        let mut graph = DependencyGraph::new();
        graph.add_node("b", ["missing"]);
        graph.add_node("a", []);
        graph.add_node("b", ["a", "a"]);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.dependencies_of(&"b"), &["a"]);
        assert_eq!(graph.sort().sorted, vec!["a", "b"]);
    }

    #[test]
    fn add_edge_creates_source_node_only() {
        let mut graph = DependencyGraph::new();
        graph.add_edge("ext", "base");
        graph.add_edge("ext", "base");

        assert!(graph.contains(&"ext"));
        assert!(!graph.contains(&"base"));
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.dependencies_of(&"base").is_empty());
    }
}
