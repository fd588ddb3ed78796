//! Session state owned by the root component.
//!
//! [`AppState`] is plain data with the transitions the UI triggers;
//! [`AppStore`] wraps it in a signal that is handed to the page through
//! context. Children never mutate state directly, only through these methods.

use std::collections::HashSet;
use std::sync::Arc;

use leptos::prelude::*;
use log::{debug, error, info, warn};

use crate::api::event_source::StreamSignal;
use crate::api::stream::{
	ErrorOutcome, KgChunk, ReadyState, StreamDirective, StreamEvent, StreamMachine, StreamToken,
};
use crate::config::{self, DEFAULT_HOPS, DEFAULT_TOP_N};
use crate::kg::panels;
use crate::kg::selection::Selection;
use crate::kg::{
	Article, GenerateRequest, GenerationProgress, KgNode, KnowledgeGraph, KnowledgeGraphResponse,
	QueryRequest, QueryResponse,
};

/// Which of the three workflow steps have finished at least once.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompletedSteps {
	pub generate: bool,
	pub enrich: bool,
	pub query: bool,
}

/// The graph as handed to the view, compared by revision only.
#[derive(Clone, Debug, Default)]
pub struct GraphSnapshot {
	pub revision: u64,
	pub graph: Arc<KnowledgeGraph>,
}

impl PartialEq for GraphSnapshot {
	fn eq(&self, other: &Self) -> bool {
		self.revision == other.revision
	}
}

/// Everything the session knows.
#[derive(Clone, Debug)]
pub struct AppState {
	tickers: String,
	window: u32,
	limit: u32,
	query: String,
	top_n: u32,
	hops: u32,
	loading: bool,
	completed: CompletedSteps,
	graph: Option<Arc<KnowledgeGraph>>,
	revision: u64,
	kg_id: Option<String>,
	kg_ids: Vec<String>,
	progress: Option<GenerationProgress>,
	selection: Selection,
	answer: Option<QueryResponse>,
	stream: StreamMachine,
}

impl Default for AppState {
	fn default() -> Self {
		Self {
			tickers: String::new(),
			window: 1,
			limit: 1,
			query: String::new(),
			top_n: DEFAULT_TOP_N,
			hops: DEFAULT_HOPS,
			loading: false,
			completed: CompletedSteps::default(),
			graph: None,
			revision: 0,
			kg_id: None,
			kg_ids: Vec::new(),
			progress: None,
			selection: Selection::new(),
			answer: None,
			stream: StreamMachine::default(),
		}
	}
}

impl AppState {
	/// Raw ticker input.
	pub fn tickers(&self) -> &str {
		&self.tickers
	}

	/// Set the raw ticker input; normalized when a generation starts.
	pub fn set_tickers(&mut self, input: &str) {
		self.tickers = input.to_string();
	}

	/// News window in days.
	pub fn window(&self) -> u32 {
		self.window
	}

	/// Set the news window, clamped to the allowed range.
	pub fn set_window(&mut self, window: u32) {
		self.window = config::clamp_window(window);
	}

	/// Articles per ticker.
	pub fn limit(&self) -> u32 {
		self.limit
	}

	/// Set the article limit, clamped to the allowed range.
	pub fn set_limit(&mut self, limit: u32) {
		self.limit = config::clamp_limit(limit);
	}

	/// Current question text.
	pub fn query(&self) -> &str {
		&self.query
	}

	/// Set the question text.
	pub fn set_query(&mut self, query: &str) {
		self.query = query.to_string();
	}

	/// Top matches per retrieval channel.
	pub fn top_n(&self) -> u32 {
		self.top_n
	}

	/// Set top-N, at least one.
	pub fn set_top_n(&mut self, top_n: u32) {
		self.top_n = top_n.max(1);
	}

	/// Neighbourhood depth for connected entities.
	pub fn hops(&self) -> u32 {
		self.hops
	}

	/// Set the hop count, at least one.
	pub fn set_hops(&mut self, hops: u32) {
		self.hops = hops.max(1);
	}

	/// Whether a backend call is outstanding.
	pub fn loading(&self) -> bool {
		self.loading
	}

	/// Finished workflow steps.
	pub fn completed(&self) -> CompletedSteps {
		self.completed
	}

	/// Generation progress while streaming.
	pub fn progress(&self) -> Option<GenerationProgress> {
		self.progress
	}

	/// The held graph, if any.
	pub fn graph(&self) -> Option<&KnowledgeGraph> {
		self.graph.as_deref()
	}

	/// Graph plus revision for change detection in the view.
	pub fn graph_snapshot(&self) -> GraphSnapshot {
		GraphSnapshot {
			revision: self.revision,
			graph: self.graph.clone().unwrap_or_default(),
		}
	}

	/// Id of the graph queries run against.
	pub fn kg_id(&self) -> Option<&str> {
		self.kg_id.as_deref()
	}

	/// Every graph id produced by generation so far.
	pub fn kg_ids(&self) -> &[String] {
		&self.kg_ids
	}

	/// Current selection.
	pub fn selection(&self) -> &Selection {
		&self.selection
	}

	/// Latest query answer.
	pub fn answer(&self) -> Option<&QueryResponse> {
		self.answer.as_ref()
	}

	/// The generation stream state machine.
	pub fn stream(&self) -> &StreamMachine {
		&self.stream
	}

	/// Articles for the article panel.
	pub fn visible_articles(&self) -> Vec<Article> {
		self.graph()
			.map(|g| panels::related_articles(g, self.selection.ids()))
			.unwrap_or_default()
	}

	/// Nodes for the node panel, in selection order.
	pub fn selected_nodes(&self) -> Vec<KgNode> {
		self.graph()
			.map(|g| panels::selected_nodes(g, self.selection.ids()))
			.unwrap_or_default()
	}

	/// Apply a node click from the graph view.
	pub fn click_node(&mut self, id: &str, multi: bool) {
		self.selection.click(id, multi);
	}

	/// Background click or "clear all".
	pub fn clear_selection(&mut self) {
		self.selection.clear();
	}

	/// Remove one node from the selection.
	pub fn deselect(&mut self, id: &str) {
		self.selection.remove(id);
	}

	/// Select every node of the held graph.
	pub fn select_all(&mut self) {
		let ids = self.graph().map(KnowledgeGraph::node_ids).unwrap_or_default();
		self.selection.select_all(ids);
		debug!("Context set to all {} nodes", self.selection.len());
	}

	/// Start a streaming generation. Returns the new stream's token and the
	/// request to send, or `None` when no ticker was entered.
	///
	/// Any previous stream is superseded; the caller must close its transport.
	pub fn begin_generation(&mut self) -> Option<(StreamToken, GenerateRequest)> {
		let tickers = config::parse_tickers(&self.tickers);
		if tickers.is_empty() {
			warn!("Generation requested without tickers");
			return None;
		}
		let request = GenerateRequest {
			tickers: tickers.join(","),
			window: self.window,
			limit: self.limit,
		};
		self.tickers = request.tickers.clone();
		self.loading = true;
		self.progress = None;
		self.graph = None;
		self.revision += 1;
		self.selection.clear();
		let token = self.stream.begin();
		info!("Starting generation {:?} for {}", token, request.tickers);
		Some((token, request))
	}

	/// Route a transport callback of stream `token`.
	pub fn handle_stream_signal(&mut self, token: StreamToken, signal: StreamSignal) -> StreamDirective {
		match signal {
			StreamSignal::Opened => {
				if self.stream.accepts(token) {
					debug!("Generation stream open");
					self.stream.opened();
				}
				StreamDirective::Continue
			}
			StreamSignal::Message(raw) => match StreamEvent::parse(&raw) {
				Ok(event) => self.apply_stream_event(token, event),
				Err(err) => {
					warn!("Unparsable stream message ({}): {}", err, raw);
					StreamDirective::Continue
				}
			},
			StreamSignal::Error(state) => self.stream_error(token, state),
		}
	}

	/// Apply one decoded stream event.
	pub fn apply_stream_event(&mut self, token: StreamToken, event: StreamEvent) -> StreamDirective {
		if !self.stream.accepts(token) {
			debug!("Ignoring event for superseded stream {:?}", token);
			return StreamDirective::Close;
		}
		match event {
			StreamEvent::Connection {} => {
				self.stream.opened();
				StreamDirective::Continue
			}
			StreamEvent::Progress { progress } => {
				if let Some(progress) = progress {
					debug!("Generation progress {}/{}", progress.current, progress.total);
					self.progress = Some(progress);
				}
				StreamDirective::Continue
			}
			StreamEvent::KgUpdate { kg_id, data } => {
				match data {
					Some(chunk) => self.merge_chunk(kg_id, chunk),
					None => warn!("kg_update without graph data"),
				}
				StreamDirective::Continue
			}
			StreamEvent::Complete { data } => {
				if let Some(kg_id) = data.and_then(|d| d.kg_id) {
					self.register_kg_id(kg_id);
				}
				info!("Generation complete");
				self.stream.complete();
				self.finish_generation(true);
				StreamDirective::Close
			}
			StreamEvent::Error { message } => {
				error!("Generation failed on the backend: {}", message);
				self.stream.fail();
				self.finish_generation(false);
				StreamDirective::Close
			}
			StreamEvent::Unknown => {
				debug!("Unhandled stream event type");
				StreamDirective::Continue
			}
		}
	}

	fn stream_error(&mut self, token: StreamToken, state: ReadyState) -> StreamDirective {
		if !self.stream.accepts(token) {
			return StreamDirective::Close;
		}
		let has_partial = self.progress.is_some() && self.graph.is_some();
		match self.stream.on_error(state, has_partial) {
			ErrorOutcome::Retry => {
				warn!(
					"Generation stream interrupted, reconnect attempt {}",
					self.stream.reconnect_attempts()
				);
				StreamDirective::Continue
			}
			ErrorOutcome::Finalize => {
				info!("Generation stream closed, keeping the partial graph");
				if let Some(kg_id) = self.kg_id.clone() {
					self.register_kg_id(kg_id);
				}
				self.finish_generation(true);
				StreamDirective::Close
			}
			ErrorOutcome::Fail => {
				error!("Generation stream failed ({:?})", state);
				self.finish_generation(false);
				StreamDirective::Close
			}
		}
	}

	/// The transport for `token` could not be opened.
	pub fn abort_generation(&mut self, token: StreamToken) {
		if self.stream.token() == token {
			self.stream.fail();
			self.finish_generation(false);
		}
	}

	/// Adopt the result of the non-streaming `/generate` fallback.
	pub fn finish_generation_with(&mut self, token: StreamToken, response: KnowledgeGraphResponse) {
		if self.stream.token() != token {
			return;
		}
		self.stream.complete();
		self.replace_graph(response.kg);
		self.register_kg_id(response.kg_id);
		self.finish_generation(true);
	}

	fn finish_generation(&mut self, succeeded: bool) {
		if succeeded {
			self.completed.generate = true;
		}
		self.progress = None;
		self.loading = false;
	}

	fn merge_chunk(&mut self, kg_id: Option<String>, chunk: KgChunk) {
		if let Some(kg_id) = kg_id {
			self.register_kg_id(kg_id);
		}
		let graph = Arc::make_mut(self.graph.get_or_insert_with(Default::default));
		graph.nodes.extend(chunk.nodes);
		graph.edges.extend(chunk.edges);
		if let Some(article) = chunk.article {
			graph.articles.push(article);
		}
		self.revision += 1;
		debug!(
			"Merged graph update, now {} nodes / {} edges (revision {})",
			graph.nodes.len(),
			graph.edges.len(),
			self.revision
		);
	}

	fn register_kg_id(&mut self, kg_id: String) {
		if !self.kg_ids.contains(&kg_id) {
			self.kg_ids.push(kg_id.clone());
		}
		self.kg_id = Some(kg_id);
	}

	fn replace_graph(&mut self, graph: KnowledgeGraph) {
		let known: HashSet<String> = graph.nodes.iter().map(|n| n.id.clone()).collect();
		self.selection.retain_known(&known);
		self.graph = Some(Arc::new(graph));
		self.revision += 1;
	}

	/// Start enrichment; returns the graph ids to combine.
	pub fn begin_enrich(&mut self) -> Option<Vec<String>> {
		if self.loading {
			return None;
		}
		if self.kg_ids.is_empty() {
			warn!("No knowledge graph ids available for enrichment");
			return None;
		}
		self.loading = true;
		info!("Enriching graphs {:?}", self.kg_ids);
		Some(self.kg_ids.clone())
	}

	/// Adopt an enriched graph; every node becomes query context.
	pub fn finish_enrich(&mut self, response: KnowledgeGraphResponse) {
		info!(
			"Enriched graph {}: {} nodes / {} edges",
			response.kg_id,
			response.kg.nodes.len(),
			response.kg.edges.len()
		);
		self.replace_graph(response.kg);
		self.kg_id = Some(response.kg_id);
		self.select_all();
		self.completed.enrich = true;
		self.loading = false;
	}

	/// Start a query; returns the request to send.
	pub fn begin_query(&mut self) -> Option<QueryRequest> {
		if self.loading || self.query.trim().is_empty() {
			return None;
		}
		let (Some(kg_id), Some(graph)) = (self.kg_id.clone(), self.graph.as_deref()) else {
			warn!("Query requested before a graph is available");
			return None;
		};
		let request = QueryRequest {
			kg_id,
			query: self.query.trim().to_string(),
			top_n: self.top_n,
			connected_hops: self.hops,
			selected_node_ids: panels::context_node_ids(graph, self.selection.ids()),
		};
		self.loading = true;
		info!(
			"Querying {} (top_n {}, hops {}) over {} context nodes",
			request.kg_id,
			request.top_n,
			request.connected_hops,
			request.selected_node_ids.len()
		);
		Some(request)
	}

	/// Store a query answer.
	pub fn finish_query(&mut self, response: QueryResponse) {
		self.answer = Some(response);
		self.completed.query = true;
		self.loading = false;
	}

	/// A request/response call failed; keep prior state.
	pub fn request_failed(&mut self) {
		self.loading = false;
	}
}

/// Shared handle to the session state.
#[derive(Clone, Copy)]
pub struct AppStore(RwSignal<AppState>);

impl AppStore {
	/// Create a store with default state.
	pub fn new() -> Self {
		Self(RwSignal::new(AppState::default()))
	}

	/// Read state, tracking the access.
	pub fn with<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
		self.0.with(f)
	}

	/// Mutate state and notify subscribers. `None` if the store was disposed.
	pub fn update<R>(&self, f: impl FnOnce(&mut AppState) -> R) -> Option<R> {
		self.0.try_update(f)
	}
}

impl Default for AppStore {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::api::stream::{CompletePayload, StreamPhase};
	use crate::kg::{KgEdge, KgNode};

	fn node(id: &str, url: &str) -> KgNode {
		KgNode {
			id: id.into(),
			articles: vec![url.into()],
			..Default::default()
		}
	}

	fn update(id: &str, target: &str, url: &str) -> StreamEvent {
		StreamEvent::KgUpdate {
			kg_id: Some("kg-1".into()),
			data: Some(KgChunk {
				nodes: vec![node(id, url)],
				edges: vec![KgEdge {
					source: id.into(),
					target: target.into(),
					label: "mentions".into(),
					count: 1,
				}],
				article: Some(Article {
					title: url.to_uppercase(),
					summary: String::new(),
					url: url.into(),
				}),
			}),
		}
	}

	fn started() -> (AppState, StreamToken) {
		let mut state = AppState::default();
		state.set_tickers("aapl");
		let (token, request) = state.begin_generation().unwrap();
		assert_eq!(request.tickers, "AAPL");
		(state, token)
	}

	fn complete() -> StreamEvent {
		StreamEvent::Complete {
			data: Some(CompletePayload {
				kg_id: Some("kg-1".into()),
			}),
		}
	}

	#[test]
	fn generation_requires_tickers() {
		let mut state = AppState::default();
		assert!(state.begin_generation().is_none());
		assert!(!state.loading());
	}

	#[test]
	fn streamed_chunks_accumulate_until_complete() {
		let (mut state, token) = started();
		state.apply_stream_event(token, StreamEvent::Connection {});
		state.apply_stream_event(token, update("a", "b", "u1"));
		state.apply_stream_event(token, update("b", "c", "u2"));
		state.apply_stream_event(token, update("c", "a", "u3"));
		let directive = state.apply_stream_event(token, complete());
		assert_eq!(directive, StreamDirective::Close);

		let graph = state.graph().unwrap();
		assert_eq!(graph.nodes.len(), 3);
		assert_eq!(graph.edges.len(), 3);
		let urls: Vec<_> = graph.articles.iter().map(|a| a.url.as_str()).collect();
		assert_eq!(urls, vec!["u1", "u2", "u3"]);
		assert_eq!(state.kg_ids(), ["kg-1".to_string()]);
		assert!(state.completed().generate);
		assert!(!state.loading());
		assert_eq!(state.stream().phase(), StreamPhase::Completed);
	}

	#[test]
	fn each_update_bumps_the_revision() {
		let (mut state, token) = started();
		let before = state.graph_snapshot();
		state.apply_stream_event(token, update("a", "b", "u1"));
		assert_ne!(state.graph_snapshot(), before);
	}

	#[test]
	fn superseded_stream_is_ignored() {
		let (mut state, old) = started();
		let (new, _) = state.begin_generation().unwrap();
		assert_eq!(
			state.apply_stream_event(old, update("a", "b", "u1")),
			StreamDirective::Close
		);
		assert!(state.graph().is_none());
		state.apply_stream_event(new, update("a", "b", "u1"));
		assert_eq!(state.graph().unwrap().nodes.len(), 1);
	}

	#[test]
	fn closed_stream_with_progress_is_finalized() {
		let (mut state, token) = started();
		state.handle_stream_signal(
			token,
			StreamSignal::Message(r#"{"type":"progress","progress":{"current":1,"total":2}}"#.into()),
		);
		state.apply_stream_event(token, update("a", "b", "u1"));
		let directive = state.handle_stream_signal(token, StreamSignal::Error(ReadyState::Closed));
		assert_eq!(directive, StreamDirective::Close);
		assert!(state.completed().generate);
		assert_eq!(state.graph().unwrap().nodes.len(), 1);
		assert!(state.progress().is_none());
		assert!(!state.loading());
	}

	#[test]
	fn closed_stream_without_data_fails() {
		let (mut state, token) = started();
		state.handle_stream_signal(token, StreamSignal::Error(ReadyState::Closed));
		assert!(!state.completed().generate);
		assert!(!state.loading());
		assert_eq!(state.stream().phase(), StreamPhase::Failed);
	}

	#[test]
	fn malformed_messages_are_skipped() {
		let (mut state, token) = started();
		let directive = state.handle_stream_signal(token, StreamSignal::Message("{oops".into()));
		assert_eq!(directive, StreamDirective::Continue);
		assert!(state.loading());
	}

	#[test]
	fn enrichment_replaces_graph_and_selects_everything() {
		let (mut state, token) = started();
		state.apply_stream_event(token, update("a", "b", "u1"));
		assert!(state.begin_enrich().is_none(), "still generating");
		state.apply_stream_event(token, complete());
		state.click_node("a", false);
		assert_eq!(state.begin_enrich(), Some(vec!["kg-1".to_string()]));
		state.finish_enrich(KnowledgeGraphResponse {
			kg_id: "kg-enriched".into(),
			kg: KnowledgeGraph {
				nodes: vec![node("x", "u9"), node("y", "u9")],
				..Default::default()
			},
		});
		assert_eq!(state.kg_id(), Some("kg-enriched"));
		let selected: Vec<_> = state.selection().ids().iter().cloned().collect();
		assert_eq!(selected, vec!["x", "y"]);
		assert!(state.completed().enrich);
	}

	#[test]
	fn query_uses_selection_or_whole_graph() {
		let (mut state, token) = started();
		state.apply_stream_event(token, update("a", "b", "u1"));
		state.apply_stream_event(token, update("b", "a", "u2"));
		state.set_query("  who owns what? ");
		assert!(state.begin_query().is_none(), "still generating");
		state.apply_stream_event(token, complete());
		let request = state.begin_query().unwrap();
		assert_eq!(request.query, "who owns what?");
		assert_eq!(request.selected_node_ids, vec!["a", "b"]);
		state.request_failed();

		state.click_node("b", false);
		assert_eq!(state.begin_query().unwrap().selected_node_ids, vec!["b"]);
		assert!(state.begin_query().is_none(), "second submit while loading");
	}
}
