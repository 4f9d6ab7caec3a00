//! Expand/collapse and selection state that survives tree rebuilds.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use messagify_shared::ChannelId;

/// Read-only copy of the view state for the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ViewState {
    /// Expanded category ids, sorted.
    pub expanded: Vec<ChannelId>,
    pub selected: Option<ChannelId>,
}

/// Owns the user's expand/collapse choices and the selected conversation.
///
/// Categories are tracked with their expanded flag so that a collapsed
/// category is remembered, not mistaken for a newly seen one.
#[derive(Debug, Clone, Default)]
pub struct ViewStateController {
    categories: BTreeMap<ChannelId, bool>,
    selected: Option<ChannelId>,
}

impl ViewStateController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip a category between expanded and collapsed. An untracked id counts
    /// as collapsed. Returns the new state.
    pub fn toggle_category(&mut self, id: &ChannelId) -> bool {
        let expanded = self.categories.entry(id.clone()).or_insert(false);
        *expanded = !*expanded;
        debug!(category = %id, expanded = *expanded, "Toggled category");
        *expanded
    }

    /// Align tracked categories with a new snapshot: unseen ids start
    /// expanded, ids no longer present are forgotten. Returns whether
    /// anything changed.
    pub fn reconcile<'a, I>(&mut self, category_ids: I) -> bool
    where
        I: IntoIterator<Item = &'a ChannelId>,
    {
        let present: BTreeSet<&ChannelId> = category_ids.into_iter().collect();

        let before = self.categories.len();
        self.categories.retain(|id, _| present.contains(id));
        let mut changed = self.categories.len() != before;

        for id in &present {
            if !self.categories.contains_key(*id) {
                self.categories.insert((*id).clone(), true);
                changed = true;
            }
        }

        if changed {
            debug!(tracked = self.categories.len(), "Reconciled category view state");
        }
        changed
    }

    pub fn select(&mut self, conversation: Option<ChannelId>) {
        self.selected = conversation;
    }

    pub fn selected(&self) -> Option<&ChannelId> {
        self.selected.as_ref()
    }

    pub fn is_expanded(&self, id: &ChannelId) -> bool {
        self.categories.get(id).copied().unwrap_or(false)
    }

    pub fn is_tracked(&self, id: &ChannelId) -> bool {
        self.categories.contains_key(id)
    }

    pub fn expanded(&self) -> Vec<ChannelId> {
        self.categories
            .iter()
            .filter(|(_, expanded)| **expanded)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn snapshot(&self) -> ViewState {
        ViewState {
            expanded: self.expanded(),
            selected: self.selected.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<ChannelId> {
        raw.iter().map(|s| ChannelId::from(*s)).collect()
    }

    #[test]
    fn test_new_categories_default_expanded() {
        let mut view = ViewStateController::new();
        assert!(view.reconcile(&ids(&["a", "b"])));

        assert_eq!(view.expanded(), ids(&["a", "b"]));
    }

    #[test]
    fn test_reconcile_twice_is_noop() {
        let mut view = ViewStateController::new();
        let set = ids(&["a", "b"]);
        assert!(view.reconcile(&set));
        view.toggle_category(&ChannelId::from("a"));

        let before = view.snapshot();
        assert!(!view.reconcile(&set));
        assert_eq!(view.snapshot(), before);
    }

    #[test]
    fn test_collapsed_category_stays_collapsed_across_rebuilds() {
        let mut view = ViewStateController::new();
        view.reconcile(&ids(&["a", "b"]));
        assert!(!view.toggle_category(&ChannelId::from("a")));

        view.reconcile(&ids(&["a", "b", "c"]));
        assert!(!view.is_expanded(&ChannelId::from("a")));
        assert!(view.is_expanded(&ChannelId::from("c")));
    }

    #[test]
    fn test_removed_categories_are_dropped() {
        let mut view = ViewStateController::new();
        view.reconcile(&ids(&["a", "b"]));
        assert!(view.reconcile(&ids(&["b"])));

        assert!(!view.is_tracked(&ChannelId::from("a")));
        assert_eq!(view.expanded(), ids(&["b"]));
    }

    #[test]
    fn test_toggle_flips_membership() {
        let mut view = ViewStateController::new();
        let id = ChannelId::from("x");
        assert!(view.toggle_category(&id));
        assert!(!view.toggle_category(&id));
        assert!(view.toggle_category(&id));
    }

    #[test]
    fn test_selection_recorded() {
        let mut view = ViewStateController::new();
        view.select(Some(ChannelId::from("c")));
        assert_eq!(view.selected(), Some(&ChannelId::from("c")));
        view.select(None);
        assert_eq!(view.snapshot().selected, None);
    }
}
