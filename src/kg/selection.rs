//! Node selection driven by canvas clicks.

use std::collections::{BTreeSet, HashSet};

/// The set of selected node ids plus the most recently clicked one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
	ids: BTreeSet<String>,
	last_clicked: Option<String>,
}

impl Selection {
	/// Empty selection.
	pub fn new() -> Self {
		Self::default()
	}

	/// Selected ids in sorted order.
	pub fn ids(&self) -> &BTreeSet<String> {
		&self.ids
	}

	/// The node last added by a click, if it is still selected.
	pub fn last_clicked(&self) -> Option<&str> {
		self.last_clicked.as_deref()
	}

	/// Whether nothing is selected.
	pub fn is_empty(&self) -> bool {
		self.ids.is_empty()
	}

	/// Number of selected nodes.
	pub fn len(&self) -> usize {
		self.ids.len()
	}

	/// Apply a node click. `multi` is the modifier-click gesture.
	pub fn click(&mut self, id: &str, multi: bool) {
		if !multi {
			self.ids.clear();
			self.ids.insert(id.to_string());
			self.last_clicked = Some(id.to_string());
		} else if self.ids.remove(id) {
			self.last_clicked = None;
		} else {
			self.ids.insert(id.to_string());
			self.last_clicked = Some(id.to_string());
		}
	}

	/// Drop one node, e.g. from a panel chip.
	pub fn remove(&mut self, id: &str) {
		self.ids.remove(id);
		if self.last_clicked.as_deref() == Some(id) {
			self.last_clicked = None;
		}
	}

	/// Background click: deselect everything.
	pub fn clear(&mut self) {
		self.ids.clear();
		self.last_clicked = None;
	}

	/// Replace the selection with `ids`.
	pub fn select_all<I, S>(&mut self, ids: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.ids = ids.into_iter().map(Into::into).collect();
		self.last_clicked = None;
	}

	/// Keep only ids that still exist in the graph.
	pub fn retain_known(&mut self, known: &HashSet<String>) {
		self.ids.retain(|id| known.contains(id));
		if let Some(last) = &self.last_clicked {
			if !known.contains(last) {
				self.last_clicked = None;
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ids(selection: &Selection) -> Vec<&str> {
		selection.ids().iter().map(String::as_str).collect()
	}

	#[test]
	fn click_sequence_walks_the_state_machine() {
		let mut selection = Selection::new();
		assert!(selection.is_empty());

		selection.click("x", false);
		assert_eq!(ids(&selection), vec!["x"]);
		assert_eq!(selection.last_clicked(), Some("x"));

		selection.click("y", true);
		assert_eq!(ids(&selection), vec!["x", "y"]);
		assert_eq!(selection.len(), 2);
		assert_eq!(selection.last_clicked(), Some("y"));

		selection.click("x", true);
		assert_eq!(ids(&selection), vec!["y"]);
		assert_eq!(selection.last_clicked(), None);

		selection.clear();
		assert!(selection.is_empty());
	}

	#[test]
	fn plain_click_replaces_a_multi_selection() {
		let mut selection = Selection::new();
		selection.select_all(["a", "b", "c"]);
		selection.click("b", false);
		assert_eq!(ids(&selection), vec!["b"]);
	}

	#[test]
	fn removing_the_last_member_empties_the_selection() {
		let mut selection = Selection::new();
		selection.click("a", true);
		selection.click("a", true);
		assert!(selection.is_empty());
		assert_eq!(selection.last_clicked(), None);
	}

	#[test]
	fn pruning_drops_unknown_ids() {
		let mut selection = Selection::new();
		selection.click("a", false);
		selection.click("gone", true);
		let known: HashSet<String> = ["a".to_string()].into_iter().collect();
		selection.retain_known(&known);
		assert_eq!(ids(&selection), vec!["a"]);
		assert_eq!(selection.last_clicked(), None);
	}
}
