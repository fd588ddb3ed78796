use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A news article the backend extracted entities from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
	pub title: String,
	pub summary: String,
	pub url: String,
}

/// An entity in the knowledge graph.
///
/// Embeddings and `community` stay `None` until the graph is enriched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KgNode {
	pub id: String,
	#[serde(rename = "type", default)]
	pub kind: String,
	#[serde(default)]
	pub detailed_type: String,
	#[serde(default)]
	pub summary: Option<String>,
	#[serde(default)]
	pub network_embedding: Option<Vec<f64>>,
	#[serde(default)]
	pub text_embedding: Option<Vec<f64>>,
	#[serde(default)]
	pub community: Option<i64>,
	/// Urls of the articles this entity was extracted from.
	#[serde(default)]
	pub articles: Vec<String>,
}

/// A labelled relation between two entities.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KgEdge {
	pub source: String,
	pub target: String,
	#[serde(default)]
	pub label: String,
	#[serde(default)]
	pub count: u32,
}

impl KgEdge {
	/// Identity used when diffing edge sets.
	pub fn key(&self) -> EdgeKey {
		EdgeKey {
			source: self.source.clone(),
			target: self.target.clone(),
			label: self.label.clone(),
		}
	}

	/// Whether `id` is either endpoint.
	pub fn touches(&self, id: &str) -> bool {
		self.source == id || self.target == id
	}
}

/// Identity of an edge: endpoints plus relation label.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
	pub source: String,
	pub target: String,
	pub label: String,
}

/// Nodes, edges and articles produced by the backend for one or more runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
	#[serde(default)]
	pub nodes: Vec<KgNode>,
	#[serde(default)]
	pub edges: Vec<KgEdge>,
	#[serde(default)]
	pub articles: Vec<Article>,
	#[serde(default)]
	pub summary: String,
}

impl KnowledgeGraph {
	/// First node with the given id.
	pub fn node(&self, id: &str) -> Option<&KgNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	/// Node ids in graph order, without duplicates.
	pub fn node_ids(&self) -> Vec<String> {
		let mut seen = std::collections::HashSet::new();
		self.nodes
			.iter()
			.filter(|n| seen.insert(n.id.as_str()))
			.map(|n| n.id.clone())
			.collect()
	}

	/// Whether any node carries enrichment output.
	pub fn is_enriched(&self) -> bool {
		self.nodes
			.iter()
			.any(|n| n.community.is_some() || n.network_embedding.is_some())
	}
}

/// `{ kg_id, kg }` as returned by `/generate` and `/enrich`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraphResponse {
	pub kg_id: String,
	pub kg: KnowledgeGraph,
}

/// Progress counter reported while a graph is being generated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationProgress {
	pub current: u32,
	pub total: u32,
}

impl GenerationProgress {
	/// Completed share in `0.0..=1.0`; zero when the total is unknown.
	pub fn fraction(&self) -> f64 {
		if self.total == 0 {
			return 0.0;
		}
		(self.current as f64 / self.total as f64).clamp(0.0, 1.0)
	}
}

/// Body of `POST /generate`, also encoded as the SSE query string.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
	/// Comma separated ticker symbols.
	pub tickers: String,
	pub window: u32,
	pub limit: u32,
}

impl GenerateRequest {
	/// Key/value pairs for the streaming endpoint's query string.
	pub fn query_pairs(&self) -> [(&'static str, String); 3] {
		[
			("tickers", self.tickers.clone()),
			("window", self.window.to_string()),
			("limit", self.limit.to_string()),
		]
	}
}

/// Body of `POST /enrich`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EnrichRequest {
	pub kg_ids: Vec<String>,
}

/// Body of `POST /query`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
	pub kg_id: String,
	pub query: String,
	pub top_n: u32,
	pub connected_hops: u32,
	/// Context nodes; an empty list lets the backend use the whole graph.
	pub selected_node_ids: Vec<String>,
}

/// A node returned by one retrieval channel with its score.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredNode {
	pub node: KgNode,
	#[serde(default)]
	pub similarity: f64,
}

/// Per-channel retrieval results backing an answer.
///
/// Channels decode entry by entry: a malformed entry is skipped rather than
/// failing the whole response.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResults {
	#[serde(default, deserialize_with = "scored_entries")]
	pub similar_by_text: Vec<ScoredNode>,
	#[serde(default, deserialize_with = "scored_entries")]
	pub similar_by_entities: Vec<ScoredNode>,
	#[serde(default, deserialize_with = "scored_entries")]
	pub connected_entities: Vec<ScoredNode>,
}

fn scored_entries<'de, D>(deserializer: D) -> Result<Vec<ScoredNode>, D::Error>
where
	D: Deserializer<'de>,
{
	let entries = match Value::deserialize(deserializer)? {
		Value::Array(entries) => entries,
		Value::Null => Vec::new(),
		other => {
			warn!("Ignoring retrieval channel that is not a list: {}", other);
			Vec::new()
		}
	};
	Ok(entries
		.into_iter()
		.filter_map(|entry| match serde_json::from_value(entry) {
			Ok(scored) => Some(scored),
			Err(err) => {
				warn!("Skipping malformed retrieval entry: {}", err);
				None
			}
		})
		.collect())
}

fn query_results<'de, D>(deserializer: D) -> Result<QueryResults, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = Value::deserialize(deserializer)?;
	if raw.is_null() {
		return Ok(QueryResults::default());
	}
	Ok(serde_json::from_value(raw).unwrap_or_else(|err| {
		warn!("Ignoring malformed query results: {}", err);
		QueryResults::default()
	}))
}

/// Synthesized answer with its supporting material.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryAnswer {
	#[serde(default)]
	pub answer: String,
	#[serde(default)]
	pub evidence: Vec<String>,
	#[serde(default)]
	pub connections: Vec<String>,
	#[serde(default)]
	pub sources: Vec<String>,
	#[serde(default)]
	pub key_entities: Vec<String>,
	#[serde(default)]
	pub metadata: serde_json::Value,
}

/// Response of `POST /query`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
	#[serde(default, deserialize_with = "query_results")]
	pub query_results: QueryResults,
	pub answer: QueryAnswer,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn node_deserializes_before_enrichment() {
		let node: KgNode = serde_json::from_str(
			r#"{"id":"Apple","type":"ORG","detailed_type":"Company","summary":null,
			"network_embedding":null,"text_embedding":null,"community":null,
			"articles":["https://news/1"]}"#,
		)
		.unwrap();
		assert_eq!(node.kind, "ORG");
		assert!(node.network_embedding.is_none());
		assert_eq!(node.articles, vec!["https://news/1"]);
	}

	#[test]
	fn query_response_tolerates_missing_channels() {
		let response: QueryResponse = serde_json::from_str(
			r#"{"answer":{"answer":"Revenue grew.","key_entities":["Apple"]}}"#,
		)
		.unwrap();
		assert_eq!(response.answer.answer, "Revenue grew.");
		assert!(response.query_results.similar_by_text.is_empty());
		assert!(response.answer.metadata.is_null());
	}

	#[test]
	fn malformed_retrieval_entries_keep_the_answer() {
		let response: QueryResponse = serde_json::from_str(
			r#"{"query_results":{
				"similar_by_text":[
					{"node":{"id":"Apple","type":"ORG"},"similarity":0.9},
					{"node":{"type":"ORG"},"similarity":"high"}
				],
				"similar_by_entities":{"unexpected":true},
				"connected_entities":null
			},
			"answer":{"answer":"Apple leads.","sources":["https://news/1"]}}"#,
		)
		.unwrap();
		assert_eq!(response.answer.answer, "Apple leads.");
		let ids: Vec<_> = response
			.query_results
			.similar_by_text
			.iter()
			.map(|scored| scored.node.id.as_str())
			.collect();
		assert_eq!(ids, ["Apple"]);
		assert!(response.query_results.similar_by_entities.is_empty());
		assert!(response.query_results.connected_entities.is_empty());

		let response: QueryResponse =
			serde_json::from_str(r#"{"query_results":[1,2],"answer":{"answer":"Still here."}}"#).unwrap();
		assert_eq!(response.answer.answer, "Still here.");
		assert_eq!(response.query_results, QueryResults::default());
	}

	#[test]
	fn node_ids_skip_duplicates() {
		let graph = KnowledgeGraph {
			nodes: ["a", "b", "a"]
				.iter()
				.map(|id| KgNode {
					id: id.to_string(),
					..Default::default()
				})
				.collect(),
			..Default::default()
		};
		assert_eq!(graph.node_ids(), vec!["a", "b"]);
	}

	#[test]
	fn progress_fraction_handles_unknown_total() {
		assert_eq!(GenerationProgress::default().fraction(), 0.0);
		let progress = GenerationProgress { current: 1, total: 4 };
		assert!((progress.fraction() - 0.25).abs() < 1e-9);
	}
}
