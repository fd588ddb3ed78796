//! Browser `EventSource` transport for streaming generation.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, info, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Event, EventSource, MessageEvent, UrlSearchParams};

use super::stream::{ReadyState, StreamDirective};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::kg::GenerateRequest;

/// A transport callback forwarded to the stream handler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamSignal {
	Opened,
	/// Raw `data` of a message event.
	Message(String),
	Error(ReadyState),
}

/// Streaming endpoint URL with the request encoded as the query string.
pub fn generate_url(config: &ClientConfig, request: &GenerateRequest) -> Result<String, ApiError> {
	let params = UrlSearchParams::new()?;
	for (key, value) in request.query_pairs() {
		params.append(key, &value);
	}
	let query = String::from(params.to_string());
	Ok(format!("{}?{}", config.endpoint("/generate"), query))
}

/// An open `EventSource` together with the closures it calls into.
///
/// Dropping the stream closes it.
pub struct GenerationStream {
	source: EventSource,
	_on_open: Closure<dyn FnMut(Event)>,
	_on_message: Closure<dyn FnMut(MessageEvent)>,
	_on_error: Closure<dyn FnMut(Event)>,
}

impl GenerationStream {
	/// Connect to `url`, routing every callback through `handler`. The
	/// transport is closed as soon as the handler answers
	/// [`StreamDirective::Close`].
	pub fn open<F>(url: &str, handler: F) -> Result<Self, ApiError>
	where
		F: FnMut(StreamSignal) -> StreamDirective + 'static,
	{
		info!("Opening generation stream {}", url);
		let source = EventSource::new(url)?;
		let handler = Rc::new(RefCell::new(handler));

		let dispatch = {
			let source = source.clone();
			Rc::new(move |signal: StreamSignal| {
				let directive = (handler.borrow_mut())(signal);
				if directive == StreamDirective::Close {
					debug!("Closing generation stream");
					source.close();
				}
			})
		};

		let dispatch_open = dispatch.clone();
		let on_open: Closure<dyn FnMut(Event)> =
			Closure::new(move |_: Event| dispatch_open(StreamSignal::Opened));

		let dispatch_message = dispatch.clone();
		let on_message: Closure<dyn FnMut(MessageEvent)> =
			Closure::new(move |ev: MessageEvent| match ev.data().as_string() {
				Some(raw) => dispatch_message(StreamSignal::Message(raw)),
				None => warn!("Ignoring non-text stream message"),
			});

		let (dispatch_error, source_error) = (dispatch, source.clone());
		let on_error: Closure<dyn FnMut(Event)> = Closure::new(move |_: Event| {
			dispatch_error(StreamSignal::Error(source_error.ready_state().into()))
		});

		source.set_onopen(Some(on_open.as_ref().unchecked_ref()));
		source.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
		source.set_onerror(Some(on_error.as_ref().unchecked_ref()));

		Ok(Self {
			source,
			_on_open: on_open,
			_on_message: on_message,
			_on_error: on_error,
		})
	}

	/// Close the transport; no further callbacks fire.
	pub fn close(&self) {
		self.source.set_onopen(None);
		self.source.set_onmessage(None);
		self.source.set_onerror(None);
		self.source.close();
	}
}

impl Drop for GenerationStream {
	fn drop(&mut self) {
		self.close();
	}
}
