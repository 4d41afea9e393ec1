//! Presentation data derived from [`AppState`]. Pure; nothing here is persisted.

use std::sync::Arc;

use alloy_primitives::Address;
use serde::Serialize;

use crate::{
    intent::{Intent, IntentId, IntentStatus},
    reducer::AppState,
};

pub const INTENT_DESCRIPTION_PLACEHOLDER: &str = "Intent description";
pub const PENDING_GROUP: &str = "Pending intents";
pub const PAST_GROUP: &str = "Past intents";

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentView {
    pub intent_id: IntentId,
    pub status: IntentStatus,
    pub status_label: &'static str,
    pub open: bool,
    pub is_action: bool,
    pub submitter: Option<Address>,
    pub moderator: Option<Address>,
    pub description: String,
}

impl From<&Intent> for IntentView {
    fn from(intent: &Intent) -> Self {
        Self {
            intent_id: intent.intent_id,
            status: intent.data.status,
            status_label: intent.data.status.label(),
            open: intent.is_pending(),
            is_action: intent.is_action(),
            submitter: intent.data.submitter,
            moderator: intent.data.moderator,
            description: intent
                .data
                .description
                .clone()
                .unwrap_or_else(|| INTENT_DESCRIPTION_PLACEHOLDER.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IntentGroup {
    pub title: &'static str,
    pub count: usize,
    pub intents: Vec<IntentView>,
}

/// UI-owned selection and panel requests.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct UiSelection {
    pub selected_intent: Option<IntentId>,
    pub selected_panel_open: bool,
    pub new_intent_panel_open: bool,
}

impl UiSelection {
    /// Selecting an intent requests its panel open.
    pub fn select(mut self, intent_id: IntentId) -> Self {
        self.selected_intent = Some(intent_id);
        self.selected_panel_open = true;
        self
    }

    /// The selection is only cleared once the panel has closed, so it never shows up empty.
    pub fn close_selected_panel(mut self) -> Self {
        self.selected_panel_open = false;
        self.selected_intent = None;
        self
    }

    pub fn open_new_intent_panel(mut self) -> Self {
        self.new_intent_panel_open = true;
        self
    }

    pub fn close_new_intent_panel(mut self) -> Self {
        self.new_intent_panel_open = false;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppView {
    pub ready: bool,
    pub is_syncing: bool,
    pub intents: Vec<IntentView>,
    pub groups: Vec<IntentGroup>,
    pub selected_intent: Option<IntentView>,
    pub new_intent_panel_visible: bool,
    pub selected_intent_panel_visible: bool,
}

pub fn derive_view(state: &AppState, selection: &UiSelection) -> AppView {
    let intents: Vec<IntentView> = state.intents.iter().map(IntentView::from).collect();

    // Only resolve a selection once the state is ready.
    let selected_intent = selection
        .selected_intent
        .filter(|_| state.ready)
        .and_then(|id| intents.iter().find(|i| i.intent_id == id).cloned());

    AppView {
        ready: state.ready,
        is_syncing: state.is_syncing || !state.ready,
        groups: group_intents(&intents),
        intents,
        selected_intent,
        // Only one panel is shown at a time.
        new_intent_panel_visible: selection.new_intent_panel_open && !selection.selected_panel_open,
        selected_intent_panel_visible: selection.selected_panel_open && !selection.new_intent_panel_open,
    }
}

/// Pending and past intents, each by descending id. Empty groups are left out.
pub fn group_intents(intents: &[IntentView]) -> Vec<IntentGroup> {
    let mut sorted = intents.to_vec();
    sorted.sort_by(|a, b| b.intent_id.cmp(&a.intent_id));
    let (pending, past): (Vec<_>, Vec<_>) = sorted.into_iter().partition(|i| i.open);

    [(PENDING_GROUP, pending), (PAST_GROUP, past)]
        .into_iter()
        .filter(|(_, intents)| !intents.is_empty())
        .map(|(title, intents)| IntentGroup {
            title,
            count: intents.len(),
            intents,
        })
        .collect()
}

/// Memoizes the last derived view by store revision and selection.
#[derive(Default)]
pub struct ViewCache {
    last: Option<(u64, UiSelection, Arc<AppView>)>,
}

impl ViewCache {
    pub fn get_or_derive(
        &mut self,
        revision: u64,
        state: &AppState,
        selection: &UiSelection,
    ) -> Arc<AppView> {
        if let Some((rev, sel, view)) = &self.last {
            if *rev == revision && sel == selection {
                return view.clone();
            }
        }
        let view = Arc::new(derive_view(state, selection));
        self.last = Some((revision, *selection, view.clone()));
        view
    }
}
