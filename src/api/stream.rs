//! Server-sent events of the streaming `/generate` endpoint and the state
//! machine that tracks one generation stream.

use serde::Deserialize;

use crate::config::MAX_RECONNECT_ATTEMPTS;
use crate::kg::{Article, GenerationProgress, KgEdge, KgNode};

/// Partial graph carried by a `kg_update` event.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct KgChunk {
	#[serde(default)]
	pub nodes: Vec<KgNode>,
	#[serde(default)]
	pub edges: Vec<KgEdge>,
	#[serde(default)]
	pub article: Option<Article>,
}

/// Payload of the `complete` event.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct CompletePayload {
	#[serde(default)]
	pub kg_id: Option<String>,
}

/// One decoded message of the generation stream.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
	/// Handshake acknowledgment.
	Connection {},
	Progress {
		#[serde(default)]
		progress: Option<GenerationProgress>,
	},
	KgUpdate {
		#[serde(default)]
		kg_id: Option<String>,
		#[serde(default)]
		data: Option<KgChunk>,
	},
	Complete {
		#[serde(default)]
		data: Option<CompletePayload>,
	},
	Error {
		#[serde(default)]
		message: String,
	},
	#[serde(other)]
	Unknown,
}

impl StreamEvent {
	/// Decode the `data` field of a message event.
	pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
		serde_json::from_str(raw)
	}
}

/// `EventSource.readyState`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyState {
	Connecting,
	Open,
	Closed,
}

impl From<u16> for ReadyState {
	fn from(value: u16) -> Self {
		match value {
			0 => ReadyState::Connecting,
			1 => ReadyState::Open,
			_ => ReadyState::Closed,
		}
	}
}

/// Identifies one generation stream. Callbacks of a replaced stream carry a
/// stale token and are ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StreamToken(u64);

/// Lifecycle of the current generation stream.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamPhase {
	#[default]
	Idle,
	Connecting,
	Streaming,
	Completed,
	Failed,
}

impl StreamPhase {
	/// Whether the stream has finished one way or the other.
	pub fn is_terminal(self) -> bool {
		matches!(self, StreamPhase::Completed | StreamPhase::Failed)
	}
}

/// What to do with the transport after handling a callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamDirective {
	Continue,
	Close,
}

/// Outcome of a transport error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorOutcome {
	/// Let the browser reconnect.
	Retry,
	/// The stream closed after delivering data; keep what arrived as final.
	Finalize,
	/// Give up and release the loading state.
	Fail,
}

/// Phase, token and reconnect budget of the one active stream.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StreamMachine {
	token: StreamToken,
	phase: StreamPhase,
	reconnect_attempts: u32,
}

impl StreamMachine {
	/// Current phase.
	pub fn phase(&self) -> StreamPhase {
		self.phase
	}

	/// Token of the stream being tracked.
	pub fn token(&self) -> StreamToken {
		self.token
	}

	/// Transport errors seen since the last successful open.
	pub fn reconnect_attempts(&self) -> u32 {
		self.reconnect_attempts
	}

	/// Start tracking a new stream, superseding any previous one.
	pub fn begin(&mut self) -> StreamToken {
		self.token = StreamToken(self.token.0 + 1);
		self.phase = StreamPhase::Connecting;
		self.reconnect_attempts = 0;
		self.token
	}

	/// Whether callbacks for `token` should still be applied.
	pub fn accepts(&self, token: StreamToken) -> bool {
		token == self.token && !matches!(self.phase, StreamPhase::Idle) && !self.phase.is_terminal()
	}

	/// The transport opened or the server acknowledged the connection.
	pub fn opened(&mut self) {
		self.phase = StreamPhase::Streaming;
		self.reconnect_attempts = 0;
	}

	/// The server reported completion.
	pub fn complete(&mut self) {
		self.phase = StreamPhase::Completed;
	}

	/// Abandon the stream.
	pub fn fail(&mut self) {
		self.phase = StreamPhase::Failed;
	}

	/// Classify a transport error. `has_partial` says whether progress and a
	/// partial graph were already received.
	pub fn on_error(&mut self, state: ReadyState, has_partial: bool) -> ErrorOutcome {
		if state == ReadyState::Closed {
			return if has_partial {
				self.phase = StreamPhase::Completed;
				ErrorOutcome::Finalize
			} else {
				self.phase = StreamPhase::Failed;
				ErrorOutcome::Fail
			};
		}
		self.reconnect_attempts += 1;
		if self.reconnect_attempts > MAX_RECONNECT_ATTEMPTS {
			self.phase = StreamPhase::Failed;
			ErrorOutcome::Fail
		} else {
			self.phase = StreamPhase::Connecting;
			ErrorOutcome::Retry
		}
	}
}
