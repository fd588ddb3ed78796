use std::collections::HashMap;
use std::f64::consts::PI;

use force_graph::DefaultNodeIdx;
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::{GraphViewState, NODE_RADIUS};
use crate::kg::highlight::Emphasis;

const BACKGROUND: &str = "#1a1a2e";
const SELECTED_RGB: &str = "173, 216, 230";
const COMMUNITY_RGB: &str = "255, 165, 0";
const SIMILAR_RGB: &str = "255, 192, 203";
const DIMMED_RGB: &str = "102, 102, 102";
const EDGE_RGB: &str = "100, 180, 255";

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

/// Blend from full opacity towards `target` as the fade progresses.
fn faded(target: f64, t: f64) -> f64 {
	1.0 + (target - 1.0) * t
}

pub fn render(state: &GraphViewState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);

	let mut positions: HashMap<DefaultNodeIdx, (f64, f64)> = HashMap::new();
	state.graph.visit_nodes(|node| {
		positions.insert(node.index(), (node.x() as f64, node.y() as f64));
	});
	draw_edges(state, ctx, &positions);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn draw_edges(
	state: &GraphViewState,
	ctx: &CanvasRenderingContext2d,
	positions: &HashMap<DefaultNodeIdx, (f64, f64)>,
) {
	let k = state.transform.k;
	let (line_width, arrow_size) = (1.5 / k, 8.0 / k);
	let t = ease_out_cubic(state.fade_t);
	let active = state.highlight.is_active();

	for edge in state.edges() {
		let (Some(&(x1, y1)), Some(&(x2, y2))) =
			(positions.get(&edge.source), positions.get(&edge.target))
		else {
			continue;
		};
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}

		let emphasized = state
			.highlight
			.edge_emphasized(&edge.key.source, &edge.key.target);
		let alpha = match (active, emphasized) {
			(false, _) => 0.6,
			(true, true) => 0.6 + 0.4 * t,
			(true, false) => 0.6 - 0.4 * t,
		};
		let width = if active && emphasized {
			line_width * (1.0 + 0.3 * t)
		} else {
			line_width
		};

		ctx.set_stroke_style_str(&format!("rgba({EDGE_RGB}, {alpha})"));
		ctx.set_line_width(width);
		let (ux, uy) = (dx / dist, dy / dist);
		ctx.begin_path();
		ctx.move_to(x1 + ux * NODE_RADIUS, y1 + uy * NODE_RADIUS);
		ctx.line_to(
			x2 - ux * (NODE_RADIUS + arrow_size),
			y2 - uy * (NODE_RADIUS + arrow_size),
		);
		ctx.stroke();

		ctx.set_fill_style_str(&format!("rgba({EDGE_RGB}, {})", (alpha + 0.2).min(1.0)));
		let (tip_x, tip_y) = (x2 - ux * NODE_RADIUS, y2 - uy * NODE_RADIUS);
		let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
		let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();

		if k >= 0.8 && (!active || emphasized) && !edge.key.label.is_empty() {
			ctx.set_fill_style_str(&format!("rgba(200, 220, 255, {})", alpha * 0.9));
			ctx.set_font(&format!("{}px sans-serif", 8.0 / k.max(0.5)));
			let _ = ctx.fill_text(&edge.key.label, (x1 + x2) / 2.0, (y1 + y2) / 2.0);
		}
	}
}

fn draw_nodes(state: &GraphViewState, ctx: &CanvasRenderingContext2d) {
	let (t, k) = (ease_out_cubic(state.fade_t), state.transform.k);

	state.graph.visit_nodes(|node| {
		let info = &node.data.user_data;
		let (x, y) = (node.x() as f64, node.y() as f64);
		let emphasis = state.highlight.emphasis(&info.id);
		let alpha = faded(emphasis.opacity(), t);
		let fill = match emphasis {
			Emphasis::Normal => info.color.clone(),
			Emphasis::Selected | Emphasis::Connected => format!("rgb({SELECTED_RGB})"),
			Emphasis::Community => format!("rgb({COMMUNITY_RGB})"),
			Emphasis::Similar => format!("rgb({SIMILAR_RGB})"),
			Emphasis::Dimmed => format!("rgb({DIMMED_RGB})"),
		};
		let radius = if emphasis == Emphasis::Selected {
			NODE_RADIUS * (1.0 + 0.35 * t)
		} else {
			NODE_RADIUS
		};

		if emphasis == Emphasis::Selected && t > 0.01 {
			let glow_radius = NODE_RADIUS * (1.8 + 1.2 * t);
			if let Ok(gradient) = ctx.create_radial_gradient(x, y, radius * 0.3, x, y, glow_radius) {
				let _ = gradient.add_color_stop(0.0, &format!("rgba(255, 255, 255, {})", 0.35 * t));
				let _ = gradient.add_color_stop(0.6, &format!("rgba({SELECTED_RGB}, {})", 0.1 * t));
				let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
				ctx.begin_path();
				let _ = ctx.arc(x, y, glow_radius, 0.0, 2.0 * PI);
				#[allow(deprecated)]
				ctx.set_fill_style(&gradient);
				ctx.fill();
			}
		}

		ctx.set_global_alpha(alpha);
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&fill);
		ctx.fill();
		ctx.set_global_alpha(1.0);

		match emphasis {
			Emphasis::Selected => {
				ctx.begin_path();
				let _ = ctx.arc(x, y, radius + 2.0 / k, 0.0, 2.0 * PI);
				ctx.set_stroke_style_str("rgba(255, 255, 255, 0.8)");
				ctx.set_line_width(1.5 / k);
				ctx.stroke();
			}
			// Dashed ring for matches that are not graph neighbours.
			Emphasis::Similar | Emphasis::Community => {
				let _ = ctx.set_line_dash(&js_sys::Array::of2(
					&JsValue::from_f64(3.0 / k),
					&JsValue::from_f64(2.0 / k),
				));
				ctx.begin_path();
				let _ = ctx.arc(x, y, radius + 2.5 / k, 0.0, 2.0 * PI);
				ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", 0.6 * t));
				ctx.set_line_width(1.0 / k);
				ctx.stroke();
				let _ = ctx.set_line_dash(&js_sys::Array::new());
			}
			_ => {}
		}

		let label_alpha = if emphasis == Emphasis::Dimmed { alpha * 0.6 } else { 0.85 };
		ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {label_alpha})"));
		ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
		let _ = ctx.fill_text(&info.id, x + radius + 3.0, y + 3.0);
	});
}
