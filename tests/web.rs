#![cfg(target_arch = "wasm32")]

use graph_and_ask::api::event_source::generate_url;
use graph_and_ask::config::ClientConfig;
use graph_and_ask::kg::GenerateRequest;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn stream_url_carries_the_request() {
	let config = ClientConfig::new("https://kg.example.com/api/");
	let request = GenerateRequest {
		tickers: "AAPL,MSFT".into(),
		window: 2,
		limit: 3,
	};
	assert_eq!(
		generate_url(&config, &request).unwrap(),
		"https://kg.example.com/api/generate?tickers=AAPL%2CMSFT&window=2&limit=3"
	);
}
