use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::debug;

use crate::kg::highlight::Highlight;
use crate::kg::reconcile::{GraphPatch, Reconciler};
use crate::kg::{EdgeKey, KgNode, KnowledgeGraph};

const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

pub const NODE_RADIUS: f64 = 7.0;
pub const HIT_RADIUS: f64 = 12.0;
pub const RESET_ZOOM: f64 = 1.0;
/// Seconds the simulation keeps running after nodes or edges were added.
const SETTLE_SECONDS: f64 = 4.0;
/// Pointer travel (screen px) below which a press counts as a click.
const CLICK_SLOP: f64 = 4.0;
const SPAWN_RING: f64 = 120.0;
const SPAWN_OFFSET: f64 = 30.0;
const GOLDEN_ANGLE: f64 = 2.399_963;

#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	pub id: String,
	pub color: String,
}

impl NodeInfo {
	fn from_node(node: &KgNode) -> Self {
		let slot = match node.community {
			Some(community) => community.unsigned_abs() as usize,
			None => node.kind.bytes().map(usize::from).sum(),
		};
		Self {
			id: node.id.clone(),
			color: COLORS[slot % COLORS.len()].into(),
		}
	}
}

#[derive(Clone, Debug, Default)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub node_idx: Option<DefaultNodeIdx>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f32,
	pub node_start_y: f32,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

/// Where a press started and whether it has travelled far enough to be a
/// drag rather than a click.
#[derive(Clone, Debug, Default)]
pub struct PressState {
	pub down: Option<(f64, f64)>,
	pub moved: bool,
}

/// What a completed click landed on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClickTarget {
	Node(String),
	Background,
}

/// An edge in the scene with its endpoint handles.
#[derive(Clone, Debug)]
pub struct SceneEdge {
	pub key: EdgeKey,
	pub source: DefaultNodeIdx,
	pub target: DefaultNodeIdx,
}

pub struct GraphViewState {
	pub graph: ForceGraph<NodeInfo, ()>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub press: PressState,
	pub highlight: Highlight,
	/// Progress of the emphasis fade after a selection change, `0..=1`.
	pub fade_t: f64,
	pub width: f64,
	pub height: f64,
	settle: f64,
	reconciler: Reconciler,
	id_to_idx: HashMap<String, DefaultNodeIdx>,
	edges: Vec<SceneEdge>,
}

fn simulation_parameters() -> SimulationParameters {
	SimulationParameters {
		force_charge: 150.0,
		force_spring: 0.05,
		force_max: 100.0,
		node_speed: 3000.0,
		damping_factor: 0.9,
	}
}

impl GraphViewState {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			graph: ForceGraph::new(simulation_parameters()),
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: RESET_ZOOM,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			press: PressState::default(),
			highlight: Highlight::default(),
			fade_t: 1.0,
			width,
			height,
			settle: 0.0,
			reconciler: Reconciler::new(),
			id_to_idx: HashMap::new(),
			edges: Vec::new(),
		}
	}

	pub fn node_count(&self) -> usize {
		self.id_to_idx.len()
	}

	pub fn edges(&self) -> &[SceneEdge] {
		&self.edges
	}

	/// Whether the layout simulation is still running.
	pub fn is_settling(&self) -> bool {
		self.settle > 0.0 || self.drag.active
	}

	/// Bring the scene in line with `graph`, touching only what changed.
	pub fn apply_snapshot(&mut self, graph: &KnowledgeGraph) -> GraphPatch {
		let patch = self.reconciler.reconcile(graph);
		if !patch.is_empty() {
			debug!(
				"Graph patch: +{} nodes, +{} edges, -{} edges, -{} nodes",
				patch.add_nodes.len(),
				patch.add_edges.len(),
				patch.remove_edges.len(),
				patch.remove_nodes.len()
			);
			self.apply_patch(&patch, graph);
		}
		patch
	}

	fn apply_patch(&mut self, patch: &GraphPatch, graph: &KnowledgeGraph) {
		let mut by_id: HashMap<&str, &KgNode> = HashMap::new();
		for node in &graph.nodes {
			by_id.entry(node.id.as_str()).or_insert(node);
		}

		for id in &patch.add_nodes {
			let Some(node) = by_id.get(id.as_str()) else {
				continue;
			};
			let (x, y) = self.spawn_position(id, graph);
			let idx = self.graph.add_node(NodeData {
				x,
				y,
				mass: 10.0,
				is_anchor: false,
				user_data: NodeInfo::from_node(node),
			});
			self.id_to_idx.insert(id.clone(), idx);
		}

		for key in &patch.add_edges {
			if let (Some(&source), Some(&target)) =
				(self.id_to_idx.get(&key.source), self.id_to_idx.get(&key.target))
			{
				self.graph.add_edge(source, target, EdgeData::default());
				self.edges.push(SceneEdge {
					key: key.clone(),
					source,
					target,
				});
			}
		}

		if !patch.remove_edges.is_empty() || !patch.remove_nodes.is_empty() {
			self.remove(&patch.remove_edges, &patch.remove_nodes);
		}

		if patch.needs_layout() {
			self.settle = SETTLE_SECONDS;
		}
	}

	/// Drop edges, then nodes. The simulation graph is rebuilt from the
	/// survivors so positions and pinned nodes carry over.
	fn remove(&mut self, edges: &[EdgeKey], nodes: &[String]) {
		let gone_edges: HashSet<&EdgeKey> = edges.iter().collect();
		self.edges.retain(|e| !gone_edges.contains(&e.key));

		let gone_nodes: HashSet<&str> = nodes.iter().map(String::as_str).collect();
		let mut rebuilt = ForceGraph::new(simulation_parameters());
		let mut remap = HashMap::new();
		self.graph.visit_nodes(|node| {
			if gone_nodes.contains(node.data.user_data.id.as_str()) {
				return;
			}
			let idx = rebuilt.add_node(NodeData {
				x: node.x(),
				y: node.y(),
				mass: node.data.mass,
				is_anchor: node.data.is_anchor,
				user_data: node.data.user_data.clone(),
			});
			remap.insert(node.index(), idx);
		});

		let mut edges = Vec::with_capacity(self.edges.len());
		for edge in self.edges.drain(..) {
			let (Some(&source), Some(&target)) = (remap.get(&edge.source), remap.get(&edge.target))
			else {
				continue;
			};
			rebuilt.add_edge(source, target, EdgeData::default());
			edges.push(SceneEdge {
				key: edge.key,
				source,
				target,
			});
		}
		self.edges = edges;
		let id_to_idx = self
			.id_to_idx
			.drain()
			.filter_map(|(id, idx)| remap.get(&idx).map(|&new_idx| (id, new_idx)))
			.collect();
		self.id_to_idx = id_to_idx;
		self.graph = rebuilt;
		self.drag = DragState::default();
	}

	/// New nodes appear next to an already placed neighbour, or on a ring
	/// around the origin when they have none.
	fn spawn_position(&self, id: &str, graph: &KnowledgeGraph) -> (f32, f32) {
		let angle = self.node_count() as f64 * GOLDEN_ANGLE;
		let neighbour = graph.edges.iter().filter(|edge| edge.touches(id)).find_map(|edge| {
			let other = if edge.source == id { &edge.target } else { &edge.source };
			self.id_to_idx.get(other).copied()
		});
		if let Some((nx, ny)) = neighbour.and_then(|idx| self.position(idx)) {
			return (
				(nx + SPAWN_OFFSET * angle.cos()) as f32,
				(ny + SPAWN_OFFSET * angle.sin()) as f32,
			);
		}
		let ring = angle % (2.0 * PI);
		(
			(SPAWN_RING * ring.cos()) as f32,
			(SPAWN_RING * ring.sin()) as f32,
		)
	}

	pub fn position(&self, idx: DefaultNodeIdx) -> Option<(f64, f64)> {
		let mut found = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				found = Some((node.x() as f64, node.y() as f64));
			}
		});
		found
	}

	pub fn set_highlight(&mut self, highlight: Highlight) {
		if highlight == self.highlight {
			return;
		}
		self.fade_t = if highlight.is_active() { 0.0 } else { 1.0 };
		self.highlight = highlight;
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<DefaultNodeIdx> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			// HIT_RADIUS is in world-space, scales with zoom like nodes
			if (dx * dx + dy * dy).sqrt() < HIT_RADIUS {
				found = Some(node.index());
			}
		});
		found
	}

	fn node_id(&self, idx: DefaultNodeIdx) -> Option<String> {
		let mut found = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				found = Some(node.data.user_data.id.clone());
			}
		});
		found
	}

	pub fn pointer_down(&mut self, x: f64, y: f64) {
		self.press = PressState {
			down: Some((x, y)),
			moved: false,
		};
		if let Some(idx) = self.node_at_position(x, y) {
			let (node_x, node_y) = self.position(idx).unwrap_or_default();
			self.drag = DragState {
				active: true,
				node_idx: Some(idx),
				start_x: x,
				start_y: y,
				node_start_x: node_x as f32,
				node_start_y: node_y as f32,
			};
		} else {
			self.pan = PanState {
				active: true,
				start_x: x,
				start_y: y,
				transform_start_x: self.transform.x,
				transform_start_y: self.transform.y,
			};
		}
	}

	pub fn pointer_move(&mut self, x: f64, y: f64) {
		if let Some((down_x, down_y)) = self.press.down {
			if (x - down_x).hypot(y - down_y) > CLICK_SLOP {
				self.press.moved = true;
			}
		}
		if !self.press.moved {
			return;
		}

		if self.drag.active {
			if let Some(idx) = self.drag.node_idx {
				let (dx, dy) = (
					(x - self.drag.start_x) / self.transform.k,
					(y - self.drag.start_y) / self.transform.k,
				);
				let (nx, ny) = (
					self.drag.node_start_x + dx as f32,
					self.drag.node_start_y + dy as f32,
				);
				self.graph.visit_nodes_mut(|node| {
					if node.index() == idx {
						node.data.x = nx;
						node.data.y = ny;
						node.data.is_anchor = true;
					}
				});
			}
		} else if self.pan.active {
			self.transform.x = self.pan.transform_start_x + (x - self.pan.start_x);
			self.transform.y = self.pan.transform_start_y + (y - self.pan.start_y);
		}
	}

	/// Finish a press. Returns the click target unless the press was a drag
	/// or a pan.
	pub fn pointer_up(&mut self) -> Option<ClickTarget> {
		let clicked = self.press.down.is_some() && !self.press.moved;
		let target = if !clicked {
			None
		} else if let Some(idx) = self.drag.node_idx {
			self.node_id(idx).map(ClickTarget::Node)
		} else {
			Some(ClickTarget::Background)
		};
		self.cancel_pointer();
		target
	}

	pub fn cancel_pointer(&mut self) {
		self.press = PressState::default();
		self.drag.active = false;
		self.drag.node_idx = None;
		self.pan.active = false;
	}

	pub fn zoom_at(&mut self, x: f64, y: f64, delta_y: f64) {
		let factor = if delta_y > 0.0 { 0.9 } else { 1.1 };
		let new_k = (self.transform.k * factor).clamp(0.1, 10.0);
		let ratio = new_k / self.transform.k;
		self.transform.x = x - (x - self.transform.x) * ratio;
		self.transform.y = y - (y - self.transform.y) * ratio;
		self.transform.k = new_k;
	}

	/// Centre the graph's bounding box in the viewport at [`RESET_ZOOM`].
	pub fn reset_view(&mut self) {
		let mut bounds: Option<(f64, f64, f64, f64)> = None;
		self.graph.visit_nodes(|node| {
			let (x, y) = (node.x() as f64, node.y() as f64);
			bounds = Some(match bounds {
				None => (x, y, x, y),
				Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
			});
		});
		let (cx, cy) = bounds
			.map(|(x0, y0, x1, y1)| ((x0 + x1) / 2.0, (y0 + y1) / 2.0))
			.unwrap_or_default();
		self.transform = ViewTransform {
			x: self.width / 2.0 - cx * RESET_ZOOM,
			y: self.height / 2.0 - cy * RESET_ZOOM,
			k: RESET_ZOOM,
		};
	}

	pub fn tick(&mut self, dt: f32) {
		if self.is_settling() {
			self.graph.update(dt);
			self.settle = (self.settle - dt as f64).max(0.0);
		}
		if self.fade_t < 1.0 {
			self.fade_t += (1.0 - self.fade_t) * 4.0 * dt as f64;
			if self.fade_t > 0.99 {
				self.fade_t = 1.0;
			}
		}
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeSet;

	use super::*;
	use crate::kg::highlight::Thresholds;
	use crate::kg::KgEdge;

	fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> KnowledgeGraph {
		KnowledgeGraph {
			nodes: nodes
				.iter()
				.map(|id| KgNode {
					id: id.to_string(),
					kind: "ORG".into(),
					..Default::default()
				})
				.collect(),
			edges: edges
				.iter()
				.map(|(s, t)| KgEdge {
					source: s.to_string(),
					target: t.to_string(),
					label: "rel".into(),
					count: 1,
				})
				.collect(),
			..Default::default()
		}
	}

	#[test]
	fn snapshots_are_applied_incrementally() {
		let mut state = GraphViewState::new(800.0, 600.0);
		state.apply_snapshot(&graph(&["a", "b"], &[("a", "b"), ("b", "ghost")]));
		assert_eq!(state.node_count(), 2);
		assert_eq!(state.edges().len(), 1);
		assert!(state.is_settling());

		state.settle = 0.0;
		let patch = state.apply_snapshot(&graph(&["a", "b"], &[("a", "b"), ("b", "ghost")]));
		assert!(patch.is_empty());
		assert!(!state.is_settling(), "no-op updates leave the layout alone");
	}

	#[test]
	fn removal_keeps_surviving_positions() {
		let mut state = GraphViewState::new(800.0, 600.0);
		state.apply_snapshot(&graph(&["a", "b", "c"], &[("a", "b"), ("b", "c")]));
		let before = state.position(state.id_to_idx["a"]).unwrap();

		state.apply_snapshot(&graph(&["a", "b"], &[("a", "b")]));
		assert_eq!(state.node_count(), 2);
		assert!(!state.id_to_idx.contains_key("c"));
		assert_eq!(state.edges().len(), 1);
		assert_eq!(state.position(state.id_to_idx["a"]).unwrap(), before);
	}

	#[test]
	fn new_nodes_spawn_beside_a_placed_neighbour() {
		let mut state = GraphViewState::new(800.0, 600.0);
		state.apply_snapshot(&graph(&["a"], &[]));
		let anchor = state.position(state.id_to_idx["a"]).unwrap();
		state.apply_snapshot(&graph(&["a", "b", "c"], &[("b", "a"), ("a", "c")]));
		for id in ["b", "c"] {
			let (x, y) = state.position(state.id_to_idx[id]).unwrap();
			let distance = ((x - anchor.0).powi(2) + (y - anchor.1).powi(2)).sqrt();
			assert!((distance - SPAWN_OFFSET).abs() < 1e-3, "{id} spawned {distance} away");
		}
	}

	#[test]
	fn click_on_node_and_background() {
		let mut state = GraphViewState::new(800.0, 600.0);
		state.apply_snapshot(&graph(&["a"], &[]));
		let (gx, gy) = state.position(state.id_to_idx["a"]).unwrap();
		let (sx, sy) = (
			gx * state.transform.k + state.transform.x,
			gy * state.transform.k + state.transform.y,
		);

		state.pointer_down(sx, sy);
		assert_eq!(state.pointer_up(), Some(ClickTarget::Node("a".into())));

		state.pointer_down(5.0, 5.0);
		assert_eq!(state.pointer_up(), Some(ClickTarget::Background));

		state.pointer_down(5.0, 5.0);
		state.pointer_move(60.0, 40.0);
		assert_eq!(state.pointer_up(), None, "a pan is not a click");
	}

	#[test]
	fn reset_view_centres_the_graph() {
		let mut state = GraphViewState::new(800.0, 600.0);
		state.apply_snapshot(&graph(&["a", "b", "c"], &[]));
		state.zoom_at(10.0, 10.0, -1.0);
		state.reset_view();
		assert_eq!(state.transform.k, RESET_ZOOM);
		let mut bounds = (f64::MAX, f64::MAX, f64::MIN, f64::MIN);
		state.graph.visit_nodes(|node| {
			let (x, y) = (node.x() as f64, node.y() as f64);
			bounds = (bounds.0.min(x), bounds.1.min(y), bounds.2.max(x), bounds.3.max(y));
		});
		let centre_x = (bounds.0 + bounds.2) / 2.0 * state.transform.k + state.transform.x;
		let centre_y = (bounds.1 + bounds.3) / 2.0 * state.transform.k + state.transform.y;
		assert!((centre_x - 400.0).abs() < 1e-6);
		assert!((centre_y - 300.0).abs() < 1e-6);
	}

	#[test]
	fn selection_change_restarts_the_fade() {
		let mut state = GraphViewState::new(800.0, 600.0);
		let kg = graph(&["a", "b"], &[("a", "b")]);
		state.apply_snapshot(&kg);
		let selected: BTreeSet<String> = ["a".to_string()].into_iter().collect();
		state.set_highlight(Highlight::derive(&kg, &selected, Thresholds::default()));
		assert_eq!(state.fade_t, 0.0);
		state.tick(0.016);
		assert!(state.fade_t > 0.0);
		state.set_highlight(Highlight::default());
		assert_eq!(state.fade_t, 1.0);
	}
}
