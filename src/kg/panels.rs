//! Side panel content derived from the graph and the selection.

use std::collections::{BTreeSet, HashSet};

use super::types::{Article, KgNode, KnowledgeGraph};

/// Articles referenced by the selected nodes, in graph order.
///
/// An empty selection yields every article.
pub fn related_articles(graph: &KnowledgeGraph, selection: &BTreeSet<String>) -> Vec<Article> {
	if selection.is_empty() {
		return graph.articles.clone();
	}
	let urls: HashSet<&str> = graph
		.nodes
		.iter()
		.filter(|n| selection.contains(&n.id))
		.flat_map(|n| n.articles.iter().map(String::as_str))
		.collect();
	graph
		.articles
		.iter()
		.filter(|a| urls.contains(a.url.as_str()))
		.cloned()
		.collect()
}

/// One node per selected id, in selection order. Ids without a node are
/// skipped.
pub fn selected_nodes(graph: &KnowledgeGraph, selection: &BTreeSet<String>) -> Vec<KgNode> {
	selection
		.iter()
		.filter_map(|id| graph.node(id))
		.cloned()
		.collect()
}

/// Node ids sent as query context: the selection, or every node when the
/// selection is empty.
pub fn context_node_ids(graph: &KnowledgeGraph, selection: &BTreeSet<String>) -> Vec<String> {
	if selection.is_empty() {
		graph.node_ids()
	} else {
		selection.iter().cloned().collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn graph() -> KnowledgeGraph {
		let article = |url: &str| Article {
			title: format!("title {url}"),
			summary: String::new(),
			url: url.into(),
		};
		KnowledgeGraph {
			nodes: vec![
				KgNode {
					id: "A".into(),
					articles: vec!["u1".into()],
					..Default::default()
				},
				KgNode {
					id: "B".into(),
					articles: vec!["u2".into()],
					..Default::default()
				},
			],
			articles: vec![article("u1"), article("u2")],
			..Default::default()
		}
	}

	fn select(ids: &[&str]) -> BTreeSet<String> {
		ids.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn selection_filters_articles() {
		let articles = related_articles(&graph(), &select(&["A"]));
		assert_eq!(articles.len(), 1);
		assert_eq!(articles[0].url, "u1");
	}

	#[test]
	fn empty_selection_shows_all_articles() {
		assert_eq!(related_articles(&graph(), &BTreeSet::new()).len(), 2);
	}

	#[test]
	fn stale_ids_are_skipped() {
		let nodes = selected_nodes(&graph(), &select(&["B", "gone"]));
		assert_eq!(nodes.len(), 1);
		assert_eq!(nodes[0].id, "B");
	}

	#[test]
	fn context_falls_back_to_whole_graph() {
		assert_eq!(context_node_ids(&graph(), &BTreeSet::new()), vec!["A", "B"]);
		assert_eq!(context_node_ids(&graph(), &select(&["B"])), vec!["B"]);
	}
}
