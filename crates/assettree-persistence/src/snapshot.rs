//! Durable snapshot of the tree view state
//!
//! [`PersistedTreeState::capture`] and [`PersistedTreeState::into_patch`]
//! are the only places where the live set of expanded keys is converted to
//! and from its stored array form.

use assettree_state::{
    AssetId, BreadcrumbItem, NavigationHistory, SortBy, SortOrder, TreeViewState,
    TreeViewStatePatch, ViewMode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Schema version written by this build
pub const CURRENT_VERSION: u32 = 2;
/// Oldest schema version that can still be migrated
pub const MIN_SUPPORTED_VERSION: u32 = 1;

/// Persisted view preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewPreferences {
    pub view_mode: ViewMode,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,
    pub virtualization_enabled: bool,
    pub item_height: u32,
    pub compact_mode: bool,
}

impl Default for ViewPreferences {
    fn default() -> Self {
        Self::from_state(&TreeViewState::default())
    }
}

impl ViewPreferences {
    fn from_state(state: &TreeViewState) -> Self {
        Self {
            view_mode: state.view_mode,
            sort_by: state.sort_by,
            sort_order: state.sort_order,
            virtualization_enabled: state.virtualization_enabled,
            item_height: state.item_height,
            compact_mode: state.compact_mode,
        }
    }
}

/// Persisted layout state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UiState {
    pub sidebar_width: u32,
    pub show_performance_metrics: bool,
}

impl Default for UiState {
    fn default() -> Self {
        let state = TreeViewState::default();
        Self {
            sidebar_width: state.sidebar_width,
            show_performance_metrics: state.show_performance_metrics,
        }
    }
}

/// Versioned blob written on every save
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedTreeState {
    pub version: u32,
    pub timestamp: DateTime<Utc>,
    /// Monotonic write sequence; blobs written before sequencing read as 0
    #[serde(default)]
    pub sequence: u64,
    /// Sorted, de-duplicated
    pub expanded_keys: Vec<AssetId>,
    pub selected_asset_id: Option<AssetId>,
    #[serde(default)]
    pub breadcrumb_path: Vec<BreadcrumbItem>,
    pub navigation_history: Vec<AssetId>,
    /// `-1` when the history is empty
    pub current_position: i64,
    pub view_preferences: ViewPreferences,
    #[serde(default)]
    pub ui_state: UiState,
}

impl PersistedTreeState {
    /// Snapshot the live state, keeping at most `max_history` of the newest
    /// history entries
    pub fn capture(state: &TreeViewState, sequence: u64, max_history: usize) -> Self {
        let mut expanded_keys: Vec<AssetId> = state.expanded_keys.iter().copied().collect();
        expanded_keys.sort_unstable();

        let mut navigation = state.navigation.clone();
        navigation.truncate_front(max_history);

        Self {
            version: CURRENT_VERSION,
            timestamp: Utc::now(),
            sequence,
            expanded_keys,
            selected_asset_id: state.selected_asset_id,
            breadcrumb_path: state.breadcrumb_path.clone(),
            navigation_history: navigation.entries().to_vec(),
            current_position: navigation.position_or_sentinel(),
            view_preferences: ViewPreferences::from_state(state),
            ui_state: UiState {
                sidebar_width: state.sidebar_width,
                show_performance_metrics: state.show_performance_metrics,
            },
        }
    }

    /// Drop all but the newest `max` history entries, re-basing the cursor
    pub fn trim_history(&mut self, max: usize) {
        let mut navigation =
            NavigationHistory::restore(std::mem::take(&mut self.navigation_history), self.current_position);
        navigation.truncate_front(max);
        self.navigation_history = navigation.entries().to_vec();
        self.current_position = navigation.position_or_sentinel();
    }

    /// Patch that restores everything this snapshot carries
    pub fn into_patch(self) -> TreeViewStatePatch {
        TreeViewStatePatch {
            expanded_keys: Some(self.expanded_keys.into_iter().collect()),
            selected_asset_id: Some(self.selected_asset_id),
            breadcrumb_path: Some(self.breadcrumb_path),
            navigation_history: Some(self.navigation_history),
            current_position: Some(self.current_position),
            view_mode: Some(self.view_preferences.view_mode),
            sort_by: Some(self.view_preferences.sort_by),
            sort_order: Some(self.view_preferences.sort_order),
            virtualization_enabled: Some(self.view_preferences.virtualization_enabled),
            item_height: Some(self.view_preferences.item_height),
            compact_mode: Some(self.view_preferences.compact_mode),
            sidebar_width: Some(self.ui_state.sidebar_width),
            show_performance_metrics: Some(self.ui_state.show_performance_metrics),
            ..Default::default()
        }
    }

    /// Rebuild a full live state from defaults plus this snapshot
    pub fn to_view_state(&self) -> TreeViewState {
        let mut state = TreeViewState::default();
        state.apply_patch(self.clone().into_patch());
        state
    }
}

/// Wrapper written by export and accepted by import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnvelope {
    pub exported_at: DateTime<Utc>,
    pub version: u32,
    pub state: serde_json::Value,
}
