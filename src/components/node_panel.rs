use leptos::prelude::*;

use crate::kg::KgNode;

/// Query context chips and details of every selected node.
#[component]
pub fn NodePanel(
	#[prop(into)] nodes: Signal<Vec<KgNode>>,
	on_remove: Callback<String>,
	on_clear: Callback<()>,
	on_select_all: Callback<()>,
	#[prop(into)] disabled: Signal<bool>,
) -> impl IntoView {
	view! {
		<section class="node-panel">
			<div class="context-header">
				<h3>"Context nodes"</h3>
				<button
					class="context-action"
					disabled=move || disabled.get() || nodes.with(Vec::is_empty)
					on:click=move |_| on_clear.run(())
				>
					"Clear All"
				</button>
				<button
					class="context-action"
					disabled=move || disabled.get()
					on:click=move |_| on_select_all.run(())
				>
					"Select All"
				</button>
			</div>
			<div class="chips">
				{move || {
					let nodes = nodes.get();
					if nodes.is_empty() {
						return view! {
							<span class="hint">"No nodes selected; queries use the whole graph."</span>
						}
							.into_any();
					}
					nodes
						.into_iter()
						.map(|node| {
							let id = node.id.clone();
							view! {
								<span class="chip">
									{node.id}
									<button
										class="chip-remove"
										title="Remove from context"
										on:click=move |_| on_remove.run(id.clone())
									>
										"×"
									</button>
								</span>
							}
						})
						.collect_view()
						.into_any()
				}}
			</div>
			{move || {
				nodes
					.get()
					.into_iter()
					.map(|node| view! { <NodeDetails node /> })
					.collect_view()
			}}
		</section>
	}
}

#[component]
fn NodeDetails(node: KgNode) -> impl IntoView {
	let kind = if node.detailed_type.is_empty() {
		node.kind.clone()
	} else {
		format!("{} ({})", node.kind, node.detailed_type)
	};
	let community = node.community.map(|c| view! { <p class="community">"Community " {c}</p> });
	let summary = node.summary.map(|s| view! { <p class="summary">{s}</p> });

	view! {
		<div class="node-details">
			<h4>{node.id}</h4>
			<p class="kind">{kind}</p>
			{summary}
			{community}
			<ul class="node-articles">
				{node
					.articles
					.into_iter()
					.map(|url| {
						let href = url.clone();
						view! {
							<li>
								<a href=href target="_blank" rel="noopener noreferrer">
									{url}
								</a>
							</li>
						}
					})
					.collect_view()}
			</ul>
		</div>
	}
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
	use wasm_bindgen::JsCast;
	use wasm_bindgen_test::*;
	use web_sys::HtmlElement;

	use super::*;

	wasm_bindgen_test_configure!(run_in_browser);

	#[wasm_bindgen_test]
	fn article_links_point_at_their_urls() {
		let document = web_sys::window().unwrap().document().unwrap();
		let host: HtmlElement = document.create_element("div").unwrap().unchecked_into();
		document.body().unwrap().append_child(&host).unwrap();

		let node = KgNode {
			id: "Apple".into(),
			kind: "ORG".into(),
			articles: vec!["https://news/1".into(), "https://news/2".into()],
			..Default::default()
		};
		let _mounted = leptos::mount::mount_to(host.clone(), move || view! { <NodeDetails node /> });

		let links = host.query_selector_all("a").unwrap();
		assert_eq!(links.length(), 2);
		let first: HtmlElement = links.item(0).unwrap().unchecked_into();
		assert_eq!(first.get_attribute("href").as_deref(), Some("https://news/1"));
		assert_eq!(first.text_content().as_deref(), Some("https://news/1"));
	}
}
