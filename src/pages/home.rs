use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{error, warn};
use wasm_bindgen_futures::spawn_local;
use web_sys::{Event, KeyboardEvent};

use crate::api::ApiClient;
use crate::api::event_source::{GenerationStream, generate_url};
use crate::api::stream::{StreamDirective, StreamPhase};
use crate::components::answer_panel::AnswerPanel;
use crate::components::article_panel::ArticlePanel;
use crate::components::graph_view::GraphView;
use crate::components::help_panel::HelpPanel;
use crate::components::node_panel::NodePanel;
use crate::config::{MAX_ARTICLES, MAX_TICKERS, MAX_WINDOW};
use crate::store::{AppState, AppStore};

fn parse_number(ev: &Event) -> Option<u32> {
	event_target_value(ev).trim().parse().ok()
}

fn step_label(label: &'static str, done: bool) -> String {
	if done {
		format!("{label} ✓")
	} else {
		label.to_string()
	}
}

/// Graph & Ask workspace: inputs, the three workflow steps, the graph and
/// the side drawers.
#[component]
pub fn Home() -> impl IntoView {
	let store = use_context::<AppStore>().unwrap_or_default();
	let client = use_context::<ApiClient>().unwrap_or_default();
	let stream_slot: Rc<RefCell<Option<GenerationStream>>> = Rc::new(RefCell::new(None));
	let help_open = RwSignal::new(true);
	let info_open = RwSignal::new(true);

	let graph = Memo::new(move |_| store.with(AppState::graph_snapshot));
	let selected = Memo::new(move |_| store.with(|s| s.selection().ids().clone()));
	let loading = Signal::derive(move || store.with(AppState::loading));
	let completed = Signal::derive(move || store.with(AppState::completed));
	let articles = Signal::derive(move || store.with(AppState::visible_articles));
	let selected_nodes = Signal::derive(move || store.with(AppState::selected_nodes));
	let answer = Signal::derive(move || store.with(|s| s.answer().cloned()));
	let summary = Signal::derive(move || {
		store.with(|s| {
			s.graph()
				.filter(|g| g.is_enriched() && !g.summary.is_empty())
				.map(|g| g.summary.clone())
		})
	});

	let generate = {
		let (slot, client) = (stream_slot.clone(), client.clone());
		move || {
			let Some((token, request)) = store.update(AppState::begin_generation).flatten() else {
				return;
			};
			if let Some(previous) = slot.borrow_mut().take() {
				previous.close();
			}
			let opened = generate_url(client.config(), &request).and_then(|url| {
				GenerationStream::open(&url, move |signal| {
					store
						.update(|s| s.handle_stream_signal(token, signal))
						.unwrap_or(StreamDirective::Close)
				})
			});
			match opened {
				Ok(stream) => *slot.borrow_mut() = Some(stream),
				Err(err) => {
					warn!("Streaming unavailable ({}), generating in one request", err);
					let client = client.clone();
					spawn_local(async move {
						match client.generate(&request).await {
							Ok(response) => {
								store.update(|s| s.finish_generation_with(token, response));
							}
							Err(err) => {
								error!("Generation failed: {}", err);
								store.update(|s| s.abort_generation(token));
							}
						}
					});
				}
			}
		}
	};

	let enrich = {
		let client = client.clone();
		move || {
			let Some(kg_ids) = store.update(AppState::begin_enrich).flatten() else {
				return;
			};
			let client = client.clone();
			spawn_local(async move {
				match client.enrich(&kg_ids).await {
					Ok(response) => {
						store.update(|s| s.finish_enrich(response));
					}
					Err(err) => {
						error!("Enrichment failed: {}", err);
						store.update(AppState::request_failed);
					}
				}
			});
		}
	};

	let query = {
		let client = client.clone();
		move || {
			let Some(request) = store.update(AppState::begin_query).flatten() else {
				return;
			};
			let client = client.clone();
			spawn_local(async move {
				match client.query(&request).await {
					Ok(response) => {
						store.update(|s| s.finish_query(response));
					}
					Err(err) => {
						error!("Query failed: {}", err);
						store.update(AppState::request_failed);
					}
				}
			});
		}
	};
	let query_on_enter = query.clone();

	let can_generate = move || !loading.get() && store.with(|s| !s.tickers().trim().is_empty());
	let can_enrich = move || !loading.get() && completed.get().generate;
	let can_query =
		move || !loading.get() && completed.get().enrich && store.with(|s| !s.query().trim().is_empty());

	let status = move || {
		store.with(|s| {
			if !s.loading() {
				return None;
			}
			Some(match (s.stream().phase(), s.progress()) {
				(_, Some(progress)) => format!("Generating ({}/{})", progress.current, progress.total),
				(StreamPhase::Connecting | StreamPhase::Streaming, None) => "Generating...".to_string(),
				_ => "Working...".to_string(),
			})
		})
	};
	let progress_bar = move || {
		store.with(|s| {
			s.progress().filter(|_| s.loading()).map(|progress| {
				view! {
					<progress
						class="generation-progress"
						max="1"
						value=progress.fraction().to_string()
					></progress>
				}
			})
		})
	};

	let on_node_click = Callback::new(move |(id, multi): (String, bool)| {
		store.update(|s| s.click_node(&id, multi));
	});
	let on_background_click = Callback::new(move |_: ()| {
		store.update(AppState::clear_selection);
	});
	let on_remove = Callback::new(move |id: String| {
		store.update(|s| s.deselect(&id));
	});
	let on_select_all = Callback::new(move |_: ()| {
		store.update(AppState::select_all);
	});

	view! {
		<div class="workspace">
			<aside class="drawer drawer-left" class:open=move || help_open.get()>
				<button class="drawer-toggle" on:click=move |_| help_open.update(|open| *open = !*open)>
					{move || if help_open.get() { "«" } else { "»" }}
				</button>
				<Show when=move || help_open.get()>
					<HelpPanel />
				</Show>
			</aside>

			<main class="main">
				<h1>"Graph & Ask"</h1>
				<div class="controls">
					<div class="step">
						<label>
							{format!("Tickers (up to {MAX_TICKERS})")}
							<input
								type="text"
								placeholder="AAPL, MSFT"
								prop:value=move || store.with(|s| s.tickers().to_string())
								on:input=move |ev| {
									let value = event_target_value(&ev);
									store.update(|s| s.set_tickers(&value));
								}
							/>
						</label>
						<label>
							{format!("Window (days, 1-{MAX_WINDOW})")}
							<input
								type="number"
								min="1"
								max=MAX_WINDOW.to_string()
								prop:value=move || store.with(AppState::window).to_string()
								on:change=move |ev| {
									if let Some(value) = parse_number(&ev) {
										store.update(|s| s.set_window(value));
									}
								}
							/>
						</label>
						<label>
							{format!("Articles per ticker (1-{MAX_ARTICLES})")}
							<input
								type="number"
								min="1"
								max=MAX_ARTICLES.to_string()
								prop:value=move || store.with(AppState::limit).to_string()
								on:change=move |ev| {
									if let Some(value) = parse_number(&ev) {
										store.update(|s| s.set_limit(value));
									}
								}
							/>
						</label>
						<button
							class="step-button"
							disabled=move || !can_generate()
							on:click=move |_| generate()
						>
							{move || step_label("1. Generate", completed.get().generate)}
						</button>
					</div>

					<div class="step">
						<button
							class="step-button"
							disabled=move || !can_enrich()
							on:click=move |_| enrich()
						>
							{move || step_label("2. Enrich", completed.get().enrich)}
						</button>
					</div>

					<div class="step">
						<input
							type="text"
							class="query-input"
							placeholder="Ask about the graph"
							prop:value=move || store.with(|s| s.query().to_string())
							on:input=move |ev| {
								let value = event_target_value(&ev);
								store.update(|s| s.set_query(&value));
							}
							on:keydown=move |ev: KeyboardEvent| {
								if ev.key() == "Enter" && can_query() {
									query_on_enter();
								}
							}
						/>
						<label>
							"Top N"
							<input
								type="number"
								min="1"
								prop:value=move || store.with(AppState::top_n).to_string()
								on:change=move |ev| {
									if let Some(value) = parse_number(&ev) {
										store.update(|s| s.set_top_n(value));
									}
								}
							/>
						</label>
						<label>
							"Hops"
							<input
								type="number"
								min="1"
								prop:value=move || store.with(AppState::hops).to_string()
								on:change=move |ev| {
									if let Some(value) = parse_number(&ev) {
										store.update(|s| s.set_hops(value));
									}
								}
							/>
						</label>
						<button
							class="step-button"
							disabled=move || !can_query()
							on:click=move |_| query()
						>
							{move || step_label("3. Query", completed.get().query)}
						</button>
					</div>
				</div>

				<div class="status">
					<span class="caption">{status}</span>
					{progress_bar}
				</div>

				<GraphView
					graph=graph
					selected=selected
					on_node_click=on_node_click
					on_background_click=on_background_click
				/>

				<NodePanel
					nodes=selected_nodes
					on_remove=on_remove
					on_clear=on_background_click
					on_select_all=on_select_all
					disabled=loading
				/>
			</main>

			<aside class="drawer drawer-right" class:open=move || info_open.get()>
				<button class="drawer-toggle" on:click=move |_| info_open.update(|open| *open = !*open)>
					{move || if info_open.get() { "»" } else { "«" }}
				</button>
				<Show when=move || info_open.get()>
					<AnswerPanel response=answer />
					<ArticlePanel articles=articles selection=selected summary=summary />
				</Show>
			</aside>
		</div>
	}
}
