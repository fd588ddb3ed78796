//! Incremental diffing of graph snapshots against what is on screen.
//!
//! The [`Reconciler`] mirrors the rendered scene as plain id sets and turns
//! every new snapshot into a [`GraphPatch`]. The canvas applies patches in
//! order: added nodes, added edges, removed edges, removed nodes.

use std::collections::HashSet;

use log::warn;

use super::types::{EdgeKey, KgEdge, KnowledgeGraph};

/// Changes needed to move the scene from the previous snapshot to the next.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphPatch {
	/// New node ids, in snapshot order.
	pub add_nodes: Vec<String>,
	/// New edges whose endpoints are both in the scene.
	pub add_edges: Vec<EdgeKey>,
	/// Edges to drop. Always applied before `remove_nodes`.
	pub remove_edges: Vec<EdgeKey>,
	pub remove_nodes: Vec<String>,
}

impl GraphPatch {
	/// Whether the patch changes nothing.
	pub fn is_empty(&self) -> bool {
		self.add_nodes.is_empty()
			&& self.add_edges.is_empty()
			&& self.remove_edges.is_empty()
			&& self.remove_nodes.is_empty()
	}

	/// Layout is only re-run when something was added.
	pub fn needs_layout(&self) -> bool {
		!self.add_nodes.is_empty() || !self.add_edges.is_empty()
	}
}

/// Node and edge identities of one snapshot.
#[derive(Clone, Debug, Default)]
struct Snapshot {
	nodes: HashSet<String>,
	edges: HashSet<EdgeKey>,
}

impl Snapshot {
	fn of(graph: &KnowledgeGraph) -> Self {
		Self {
			nodes: graph.nodes.iter().map(|n| n.id.clone()).collect(),
			edges: graph.edges.iter().map(KgEdge::key).collect(),
		}
	}
}

/// Tracks the previous snapshot and the rendered scene between updates.
#[derive(Clone, Debug, Default)]
pub struct Reconciler {
	previous: Snapshot,
	scene_nodes: HashSet<String>,
	scene_edges: HashSet<EdgeKey>,
}

impl Reconciler {
	/// Create a reconciler for an empty scene.
	pub fn new() -> Self {
		Self::default()
	}

	/// Node ids currently in the scene.
	pub fn scene_nodes(&self) -> &HashSet<String> {
		&self.scene_nodes
	}

	/// Edges currently in the scene.
	pub fn scene_edges(&self) -> &HashSet<EdgeKey> {
		&self.scene_edges
	}

	/// Diff `next` against the previous snapshot and record it as previous.
	pub fn reconcile(&mut self, next: &KnowledgeGraph) -> GraphPatch {
		let mut patch = GraphPatch::default();
		let next_snapshot = Snapshot::of(next);

		let mut seen = HashSet::new();
		for node in &next.nodes {
			if !seen.insert(node.id.as_str()) {
				warn!("Duplicate node id {:?} in graph update", node.id);
				continue;
			}
			if !self.previous.nodes.contains(&node.id) && self.scene_nodes.insert(node.id.clone())
			{
				patch.add_nodes.push(node.id.clone());
			}
		}

		for edge in &next.edges {
			let key = edge.key();
			if self.scene_edges.contains(&key) {
				continue;
			}
			let endpoints_known =
				next_snapshot.nodes.contains(&edge.source) && next_snapshot.nodes.contains(&edge.target);
			if !endpoints_known {
				// Held back until both endpoints exist; reported once.
				if !self.previous.edges.contains(&key) {
					warn!(
						"Dropping edge {} -[{}]-> {}: endpoint not in graph",
						edge.source, edge.label, edge.target
					);
				}
				continue;
			}
			self.scene_edges.insert(key.clone());
			patch.add_edges.push(key);
		}

		let removed_nodes: HashSet<&String> = self
			.previous
			.nodes
			.difference(&next_snapshot.nodes)
			.filter(|id| self.scene_nodes.contains(*id))
			.collect();
		let mut remove_edges: Vec<EdgeKey> = self
			.scene_edges
			.iter()
			.filter(|key| {
				!next_snapshot.edges.contains(*key)
					|| removed_nodes.contains(&key.source)
					|| removed_nodes.contains(&key.target)
			})
			.cloned()
			.collect();
		remove_edges.sort();
		for key in &remove_edges {
			self.scene_edges.remove(key);
		}
		patch.remove_edges = remove_edges;

		let mut remove_nodes: Vec<String> = removed_nodes.into_iter().cloned().collect();
		remove_nodes.sort();
		for id in &remove_nodes {
			self.scene_nodes.remove(id);
		}
		patch.remove_nodes = remove_nodes;

		self.previous = next_snapshot;
		patch
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::kg::types::KgNode;

	fn node(id: &str) -> KgNode {
		KgNode {
			id: id.into(),
			..Default::default()
		}
	}

	fn edge(source: &str, target: &str) -> KgEdge {
		KgEdge {
			source: source.into(),
			target: target.into(),
			label: "rel".into(),
			count: 1,
		}
	}

	fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> KnowledgeGraph {
		KnowledgeGraph {
			nodes: nodes.iter().map(|id| node(id)).collect(),
			edges: edges.iter().map(|(s, t)| edge(s, t)).collect(),
			..Default::default()
		}
	}

	#[test]
	fn first_snapshot_adds_everything() {
		let mut reconciler = Reconciler::new();
		let patch = reconciler.reconcile(&graph(&["a", "b"], &[("a", "b")]));
		assert_eq!(patch.add_nodes, vec!["a", "b"]);
		assert_eq!(patch.add_edges.len(), 1);
		assert!(patch.needs_layout());
	}

	#[test]
	fn same_snapshot_twice_is_a_no_op() {
		let mut reconciler = Reconciler::new();
		let snapshot = graph(&["a", "b", "c"], &[("a", "b"), ("b", "zzz")]);
		reconciler.reconcile(&snapshot);
		let patch = reconciler.reconcile(&snapshot);
		assert!(patch.is_empty());
		assert!(!patch.needs_layout());
	}

	#[test]
	fn dangling_edges_are_dropped() {
		let mut reconciler = Reconciler::new();
		let patch = reconciler.reconcile(&graph(&["a"], &[("a", "ghost"), ("ghost", "a")]));
		assert_eq!(patch.add_nodes, vec!["a"]);
		assert!(patch.add_edges.is_empty());
		assert!(reconciler.scene_edges().is_empty());
	}

	#[test]
	fn dangling_edge_is_drawn_once_its_endpoint_arrives() {
		let mut reconciler = Reconciler::new();
		reconciler.reconcile(&graph(&["a"], &[("a", "b")]));
		let patch = reconciler.reconcile(&graph(&["a", "b"], &[("a", "b")]));
		assert_eq!(patch.add_nodes, vec!["b"]);
		assert_eq!(patch.add_edges, vec![edge("a", "b").key()]);
		assert!(reconciler.reconcile(&graph(&["a", "b"], &[("a", "b")])).is_empty());
	}

	#[test]
	fn edges_to_removed_nodes_are_not_added() {
		let mut reconciler = Reconciler::new();
		reconciler.reconcile(&graph(&["a", "b"], &[]));
		let patch = reconciler.reconcile(&graph(&["a"], &[("a", "b")]));
		assert!(patch.add_edges.is_empty());
		assert!(patch.remove_edges.is_empty());
		assert_eq!(patch.remove_nodes, vec!["b"]);
	}

	#[test]
	fn growth_only_adds_the_difference() {
		let mut reconciler = Reconciler::new();
		reconciler.reconcile(&graph(&["a", "b"], &[("a", "b")]));
		let patch = reconciler.reconcile(&graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]));
		assert_eq!(patch.add_nodes, vec!["c"]);
		assert_eq!(patch.add_edges, vec![edge("b", "c").key()]);
		assert!(patch.remove_edges.is_empty() && patch.remove_nodes.is_empty());
	}

	#[test]
	fn replacement_removes_edges_touching_removed_nodes() {
		let mut reconciler = Reconciler::new();
		reconciler.reconcile(&graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]));
		let patch = reconciler.reconcile(&graph(&["a", "b"], &[("a", "b")]));
		assert_eq!(patch.remove_edges, vec![edge("b", "c").key()]);
		assert_eq!(patch.remove_nodes, vec!["c"]);
		assert!(!patch.needs_layout());
		assert!(!reconciler.scene_nodes().contains("c"));
	}

	#[test]
	fn duplicate_nodes_within_a_snapshot_are_added_once() {
		let mut reconciler = Reconciler::new();
		let patch = reconciler.reconcile(&graph(&["a", "a", "b"], &[("a", "b"), ("a", "b")]));
		assert_eq!(patch.add_nodes, vec!["a", "b"]);
		assert_eq!(patch.add_edges.len(), 1);
	}
}
