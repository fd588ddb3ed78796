use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use leptos::prelude::*;
use log::{debug, warn};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent};

use super::render;
use super::state::{ClickTarget, GraphViewState};
use crate::kg::highlight::{Highlight, Thresholds};
use crate::store::GraphSnapshot;

/// Largest frame step fed to the simulation, in seconds.
const MAX_FRAME_STEP: f64 = 0.05;

fn pointer_position(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

/// Canvas view of the knowledge graph with selection highlighting.
///
/// Graph updates are applied incrementally; the layout only runs for a short
/// while after nodes or edges were added. A click on a node reports the id
/// and whether a multi-select modifier was held.
#[component]
pub fn GraphView(
	#[prop(into)] graph: Signal<GraphSnapshot>,
	#[prop(into)] selected: Signal<BTreeSet<String>>,
	on_node_click: Callback<(String, bool)>,
	on_background_click: Callback<()>,
	#[prop(default = 520.0)] height: f64,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state = Rc::new(RefCell::new(GraphViewState::new(800.0, height)));
	let animate: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let network_threshold = RwSignal::new(Thresholds::default().network);
	let text_threshold = RwSignal::new(Thresholds::default().text);

	let (state_init, animate_init, resize_cb_init) =
		(state.clone(), animate.clone(), resize_cb.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};
		let ctx = match canvas.get_context("2d") {
			Ok(Some(ctx)) => ctx,
			_ => {
				warn!("Canvas 2d context unavailable");
				return;
			}
		};
		let Ok(ctx) = ctx.dyn_into::<CanvasRenderingContext2d>() else {
			return;
		};

		let fit = {
			let (canvas, state) = (canvas.clone(), state_init.clone());
			move || {
				let w = canvas
					.parent_element()
					.map(|p| p.client_width() as f64)
					.filter(|w| *w > 0.0)
					.unwrap_or(800.0);
				canvas.set_width(w as u32);
				canvas.set_height(height as u32);
				state.borrow_mut().resize(w, height);
			}
		};
		fit();
		state_init.borrow_mut().reset_view();

		*resize_cb_init.borrow_mut() = Some(Closure::new(fit));
		if let Some(ref cb) = *resize_cb_init.borrow() {
			let _ = window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
		}

		let (state_anim, animate_inner) = (state_init.clone(), animate_init.clone());
		let mut last_frame: Option<f64> = None;
		*animate_init.borrow_mut() = Some(Closure::new(move |now: f64| {
			let dt = last_frame
				.map(|last| ((now - last) / 1000.0).clamp(0.0, MAX_FRAME_STEP))
				.unwrap_or(0.016);
			last_frame = Some(now);
			{
				let mut s = state_anim.borrow_mut();
				s.tick(dt as f32);
				render::render(&s, &ctx);
			}
			if let (Some(cb), Some(win)) = (&*animate_inner.borrow(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let state_data = state.clone();
	Effect::new(move |_| {
		let snapshot = graph.get();
		let patch = state_data.borrow_mut().apply_snapshot(&snapshot.graph);
		if !patch.is_empty() {
			debug!("Graph view at revision {}", snapshot.revision);
		}
	});

	let state_hl = state.clone();
	Effect::new(move |_| {
		let snapshot = graph.get();
		let thresholds = Thresholds {
			network: network_threshold.get(),
			text: text_threshold.get(),
		};
		let highlight = selected.with(|ids| Highlight::derive(&snapshot.graph, ids, thresholds));
		state_hl.borrow_mut().set_highlight(highlight);
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = pointer_position(&canvas, &ev);
		state_md.borrow_mut().pointer_down(x, y);
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = pointer_position(&canvas, &ev);
		state_mm.borrow_mut().pointer_move(x, y);
	};

	let state_mu = state.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let multi = ev.shift_key() || ev.ctrl_key() || ev.meta_key();
		let target = state_mu.borrow_mut().pointer_up();
		match target {
			Some(ClickTarget::Node(id)) => on_node_click.run((id, multi)),
			Some(ClickTarget::Background) => on_background_click.run(()),
			None => {}
		}
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		state_ml.borrow_mut().cancel_pointer();
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let (x, y) = pointer_position(&canvas, &ev);
		state_wh.borrow_mut().zoom_at(x, y, ev.delta_y());
	};

	let state_reset = state.clone();
	let on_reset = move |_: MouseEvent| state_reset.borrow_mut().reset_view();

	view! {
		<div class="graph-view">
			<div class="graph-toolbar">
				<label>
					"Network similarity "
					<input
						type="range"
						min="0"
						max="1"
						step="0.05"
						prop:value=move || network_threshold.get().to_string()
						on:input=move |ev| {
							if let Ok(value) = event_target_value(&ev).parse::<f64>() {
								network_threshold.set(value);
							}
						}
					/>
					<span class="threshold">{move || format!("{:.2}", network_threshold.get())}</span>
				</label>
				<label>
					"Text similarity "
					<input
						type="range"
						min="0"
						max="1"
						step="0.05"
						prop:value=move || text_threshold.get().to_string()
						on:input=move |ev| {
							if let Ok(value) = event_target_value(&ev).parse::<f64>() {
								text_threshold.set(value);
							}
						}
					/>
					<span class="threshold">{move || format!("{:.2}", text_threshold.get())}</span>
				</label>
				<button class="reset-view" on:click=on_reset>
					"Reset view"
				</button>
			</div>
			<canvas
				node_ref=canvas_ref
				class="graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				style="display: block; cursor: grab;"
			/>
		</div>
	}
}
