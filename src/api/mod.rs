//! Client for the knowledge-graph backend.
//!
//! `generate`, `enrich` and `query` are plain JSON request/response calls;
//! streaming generation lives in [`stream`] and [`event_source`].

pub mod event_source;
pub mod stream;

use gloo_net::http::{Request, Response};
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::kg::{
	EnrichRequest, GenerateRequest, KnowledgeGraphResponse, QueryRequest, QueryResponse,
};

/// Typed wrapper over the backend endpoints.
#[derive(Clone, Debug, Default)]
pub struct ApiClient {
	config: ClientConfig,
}

impl ApiClient {
	/// Create a client for the given backend.
	pub fn new(config: ClientConfig) -> Self {
		Self { config }
	}

	/// Backend settings in use.
	pub fn config(&self) -> &ClientConfig {
		&self.config
	}

	/// Generate a graph in one request (`POST /generate`).
	pub async fn generate(&self, request: &GenerateRequest) -> Result<KnowledgeGraphResponse, ApiError> {
		self.post("/generate", request).await
	}

	/// Combine and enrich previously generated graphs (`POST /enrich`).
	pub async fn enrich(&self, kg_ids: &[String]) -> Result<KnowledgeGraphResponse, ApiError> {
		let body = EnrichRequest {
			kg_ids: kg_ids.to_vec(),
		};
		self.post("/enrich", &body).await
	}

	/// Ask a question scoped to the given context nodes (`POST /query`).
	pub async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, ApiError> {
		self.post("/query", request).await
	}

	async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
	where
		B: Serialize,
		T: DeserializeOwned,
	{
		let url = self.config.endpoint(path);
		debug!("POST {}", url);
		let response = Request::post(&url).json(body)?.send().await?;
		decode(response).await
	}
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
	if !response.ok() {
		let status = response.status();
		let message = match response.text().await {
			Ok(text) if !text.is_empty() => text,
			_ => response.status_text(),
		};
		return Err(ApiError::Status { status, message });
	}
	let text = response.text().await?;
	Ok(serde_json::from_str(&text)?)
}
