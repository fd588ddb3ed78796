//! Graph & Ask: a Leptos client for building, enriching and querying
//! stock-news knowledge graphs.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info};

pub mod api;
pub mod config;
pub mod error;
pub mod kg;
pub mod store;

// Modules
mod components;
mod pages;

// Top-Level pages
use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::pages::home::Home;
use crate::pages::not_found::NotFound;
use crate::store::AppStore;

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

/// Root component: session store, backend client and routes.
#[component]
pub fn App() -> impl IntoView {
	// Provides context that manages stylesheets, titles, meta tags, etc.
	provide_meta_context();

	let config = ClientConfig::default();
	info!("Backend at {}", config.base_url);
	provide_context(ApiClient::new(config));
	provide_context(AppStore::new());

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="dark" />

		<Title text="Graph & Ask" />

		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=Home />
			</Routes>
		</Router>
	}
}
