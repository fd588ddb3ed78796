//! Build-time configuration and input limits.

/// Backend base URL, overridable at build time with `KG_API_BASE_URL`.
pub const API_BASE_URL: &str = match option_env!("KG_API_BASE_URL") {
	Some(url) => url,
	None => "/api",
};

/// Maximum number of tickers per generation request.
pub const MAX_TICKERS: usize = 3;
/// Maximum news window in days.
pub const MAX_WINDOW: u32 = 5;
/// Maximum number of articles per ticker.
pub const MAX_ARTICLES: u32 = 3;

/// Default number of top matches requested per retrieval channel.
pub const DEFAULT_TOP_N: u32 = 5;
/// Default neighbourhood depth for connected-entity retrieval.
pub const DEFAULT_HOPS: u32 = 1;

/// Reconnect attempts tolerated before a generation stream is abandoned.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Default cut-off for both embedding similarity sliders.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;

/// Runtime client settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
	/// Base URL all endpoint paths are appended to, without a trailing slash.
	pub base_url: String,
}

impl ClientConfig {
	/// Build a config for `base_url`, dropping any trailing slash.
	pub fn new(base_url: impl Into<String>) -> Self {
		let mut base_url = base_url.into();
		while base_url.ends_with('/') {
			base_url.pop();
		}
		Self { base_url }
	}

	/// Full URL for an endpoint path such as `/enrich`.
	pub fn endpoint(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self::new(API_BASE_URL)
	}
}

/// Parse a comma separated ticker list, upper-casing and capping it at
/// [`MAX_TICKERS`].
pub fn parse_tickers(input: &str) -> Vec<String> {
	let mut tickers: Vec<String> = Vec::new();
	for raw in input.split(',') {
		let ticker = raw.trim().to_uppercase();
		if ticker.is_empty() || tickers.contains(&ticker) {
			continue;
		}
		tickers.push(ticker);
		if tickers.len() == MAX_TICKERS {
			break;
		}
	}
	tickers
}

/// Clamp a user supplied window to `1..=MAX_WINDOW`.
pub fn clamp_window(value: u32) -> u32 {
	value.clamp(1, MAX_WINDOW)
}

/// Clamp a user supplied article limit to `1..=MAX_ARTICLES`.
pub fn clamp_limit(value: u32) -> u32 {
	value.clamp(1, MAX_ARTICLES)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn trailing_slashes_are_trimmed() {
		let config = ClientConfig::new("https://example.com/api//");
		assert_eq!(config.endpoint("/query"), "https://example.com/api/query");
	}

	#[test]
	fn tickers_are_normalized_and_capped() {
		assert_eq!(
			parse_tickers(" aapl, msft,,AAPL, nvda, tsla"),
			vec!["AAPL", "MSFT", "NVDA"]
		);
		assert!(parse_tickers(" , ").is_empty());
	}

	#[test]
	fn numeric_inputs_are_clamped() {
		assert_eq!(clamp_window(0), 1);
		assert_eq!(clamp_window(9), MAX_WINDOW);
		assert_eq!(clamp_limit(2), 2);
		assert_eq!(clamp_limit(7), MAX_ARTICLES);
	}
}
