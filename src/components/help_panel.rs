use leptos::prelude::*;

/// Usage steps shown in the left drawer.
#[component]
pub fn HelpPanel() -> impl IntoView {
	view! {
		<section class="help-panel">
			<h3>"How it works"</h3>
			<ol>
				<li>
					<strong>"Generate. "</strong>
					"Enter up to three tickers, pick a news window and article count, and build a \
					 knowledge graph. Entities appear as the news is processed."
				</li>
				<li>
					<strong>"Enrich. "</strong>
					"Compute embeddings and communities for the graph. Selecting a node then \
					 highlights its neighbours, its community and similar entities."
				</li>
				<li>
					<strong>"Query. "</strong>
					"Ask a question. Selected nodes are sent as context; with nothing selected the \
					 whole graph is used."
				</li>
			</ol>
			<p class="hint">
				"Click a node to select it. Shift, Ctrl or Cmd click adds or removes nodes. Click \
				 the background to clear. Drag to move nodes or pan, scroll to zoom."
			</p>
		</section>
	}
}
