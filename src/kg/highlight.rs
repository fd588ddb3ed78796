//! Emphasis sets derived from the current selection.

use std::collections::{BTreeSet, HashMap, HashSet};

use super::similarity::cosine_similarity;
use super::types::{KgNode, KnowledgeGraph};
use crate::config::DEFAULT_SIMILARITY_THRESHOLD;

/// Cut-offs for the two embedding similarity channels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
	pub network: f64,
	pub text: f64,
}

impl Default for Thresholds {
	fn default() -> Self {
		Self {
			network: DEFAULT_SIMILARITY_THRESHOLD,
			text: DEFAULT_SIMILARITY_THRESHOLD,
		}
	}
}

/// How a node is drawn relative to the selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Emphasis {
	/// Nothing is selected.
	Normal,
	Selected,
	Connected,
	Community,
	Similar,
	Dimmed,
}

impl Emphasis {
	/// Fill opacity for this emphasis.
	pub fn opacity(self) -> f64 {
		match self {
			Emphasis::Normal | Emphasis::Selected => 1.0,
			Emphasis::Connected | Emphasis::Community | Emphasis::Similar => 0.8,
			Emphasis::Dimmed => 0.3,
		}
	}
}

/// Union of the highlight sets of every selected node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Highlight {
	pub selected: HashSet<String>,
	pub connected: HashSet<String>,
	pub community: HashSet<String>,
	pub similar: HashSet<String>,
}

impl Highlight {
	/// Derive highlight sets for `selection` over `graph`.
	///
	/// Selected ids missing from the graph contribute nothing.
	pub fn derive(graph: &KnowledgeGraph, selection: &BTreeSet<String>, thresholds: Thresholds) -> Self {
		let mut highlight = Highlight::default();
		if selection.is_empty() {
			return highlight;
		}

		let mut by_id: HashMap<&str, &KgNode> = HashMap::new();
		for node in &graph.nodes {
			by_id.entry(node.id.as_str()).or_insert(node);
		}

		for id in selection {
			let Some(node) = by_id.get(id.as_str()) else {
				continue;
			};
			highlight.selected.insert(id.clone());

			for edge in graph.edges.iter().filter(|edge| edge.touches(id)) {
				let other = if edge.source == *id { &edge.target } else { &edge.source };
				highlight.connected.insert(other.clone());
			}

			if let Some(community) = node.community {
				highlight.community.extend(
					by_id
						.values()
						.filter(|n| n.id != *id && n.community == Some(community))
						.map(|n| n.id.clone()),
				);
			}

			highlight.similar.extend(
				by_id
					.values()
					.filter(|n| n.id != *id && is_similar(node, n, thresholds))
					.map(|n| n.id.clone()),
			);
		}
		highlight
	}

	/// Whether anything is selected.
	pub fn is_active(&self) -> bool {
		!self.selected.is_empty()
	}

	/// Emphasis of a node, in priority order selected > connected >
	/// community > similar.
	pub fn emphasis(&self, id: &str) -> Emphasis {
		if !self.is_active() {
			Emphasis::Normal
		} else if self.selected.contains(id) {
			Emphasis::Selected
		} else if self.connected.contains(id) {
			Emphasis::Connected
		} else if self.community.contains(id) {
			Emphasis::Community
		} else if self.similar.contains(id) {
			Emphasis::Similar
		} else {
			Emphasis::Dimmed
		}
	}

	/// Whether an edge touches a selected node.
	pub fn edge_emphasized(&self, source: &str, target: &str) -> bool {
		self.selected.contains(source) || self.selected.contains(target)
	}
}

fn is_similar(anchor: &KgNode, other: &KgNode, thresholds: Thresholds) -> bool {
	let (Some(anchor_net), Some(anchor_text)) = (&anchor.network_embedding, &anchor.text_embedding)
	else {
		return false;
	};
	let (Some(other_net), Some(other_text)) = (&other.network_embedding, &other.text_embedding)
	else {
		return false;
	};
	cosine_similarity(anchor_net, other_net) > thresholds.network
		|| cosine_similarity(anchor_text, other_text) > thresholds.text
}
