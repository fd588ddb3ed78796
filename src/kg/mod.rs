//! Knowledge-graph data model and the pure view logic built on it.

pub mod highlight;
pub mod panels;
pub mod reconcile;
pub mod selection;
pub mod similarity;
mod types;

pub use types::*;
