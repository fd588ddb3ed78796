//! Errors of the backend client.

use thiserror::Error;
use wasm_bindgen::JsValue;

/// Failures talking to the knowledge-graph backend.
#[derive(Debug, Error)]
pub enum ApiError {
	/// The request never produced a response.
	#[error("request failed: {0}")]
	Network(#[from] gloo_net::Error),
	/// The backend answered with a non-success status.
	#[error("backend returned {status}: {message}")]
	Status { status: u16, message: String },
	/// A response or event payload did not match the expected shape.
	#[error("malformed payload: {0}")]
	Decode(#[from] serde_json::Error),
	/// The browser refused to open an event stream.
	#[error("event stream unavailable: {0}")]
	Stream(String),
}

impl From<JsValue> for ApiError {
	fn from(value: JsValue) -> Self {
		ApiError::Stream(value.as_string().unwrap_or_else(|| format!("{value:?}")))
	}
}
