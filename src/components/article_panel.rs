use std::collections::BTreeSet;

use leptos::prelude::*;

use crate::kg::Article;

/// Articles behind the current selection, or the whole graph's articles and
/// summary when nothing is selected.
#[component]
pub fn ArticlePanel(
	#[prop(into)] articles: Signal<Vec<Article>>,
	#[prop(into)] selection: Signal<BTreeSet<String>>,
	/// Graph summary; only present once the graph is enriched.
	#[prop(into)] summary: Signal<Option<String>>,
) -> impl IntoView {
	let heading = move || {
		selection.with(|ids| match ids.len() {
			0 => None,
			1 => ids.iter().next().map(|id| format!("Articles for {id}")),
			n => Some(format!("Articles for {n} entities")),
		})
	};
	let list_title = move || {
		if selection.with(BTreeSet::is_empty) {
			"All Articles"
		} else {
			"Related Articles"
		}
	};

	view! {
		<section class="article-panel">
			{move || match (heading(), summary.get()) {
				(Some(heading), _) => view! { <h2>{heading}</h2> }.into_any(),
				(None, Some(summary)) => {
					view! {
						<h2>"Knowledge Graph Summary"</h2>
						<p class="graph-summary">{summary}</p>
					}
						.into_any()
				}
				(None, None) => ().into_any(),
			}}
			<h3>{list_title}</h3>
			{move || {
				let articles = articles.get();
				if articles.is_empty() {
					let message = if selection.with(BTreeSet::is_empty) {
						"No articles yet."
					} else {
						"No articles found for this node."
					};
					return view! { <p class="empty">{message}</p> }.into_any();
				}
				view! {
					<ul class="articles">
						{articles
							.into_iter()
							.map(|article| {
								view! {
									<li class="article">
										<a href=article.url target="_blank" rel="noopener noreferrer">
											{article.title}
										</a>
										<p>{article.summary}</p>
									</li>
								}
							})
							.collect_view()}
					</ul>
				}
					.into_any()
			}}
		</section>
	}
}
