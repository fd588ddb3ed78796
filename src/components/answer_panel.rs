use leptos::prelude::*;

use crate::kg::QueryResponse;

/// The latest answer, rendered verbatim.
#[component]
pub fn AnswerPanel(#[prop(into)] response: Signal<Option<QueryResponse>>) -> impl IntoView {
	move || {
		let Some(response) = response.get() else {
			return ().into_any();
		};
		let answer = response.answer;
		let entities = (!answer.key_entities.is_empty()).then(|| {
			view! {
				<h4>"Key entities"</h4>
				<div class="chips">
					{answer
						.key_entities
						.into_iter()
						.map(|entity| view! { <span class="chip">{entity}</span> })
						.collect_view()}
				</div>
			}
		});
		let evidence = (!answer.evidence.is_empty()).then(|| {
			view! {
				<h4>"Evidence"</h4>
				<ul class="evidence">
					{answer
						.evidence
						.into_iter()
						.map(|item| view! { <li>{item}</li> })
						.collect_view()}
				</ul>
			}
		});

		view! {
			<section class="answer-panel">
				<h3>"Answer"</h3>
				<p class="answer">{answer.answer}</p>
				{entities}
				{evidence}
			</section>
		}
			.into_any()
	}
}
