//! Live tree view state and partial patches over it

use std::collections::HashSet;

use assettree_common::RangeValidator;
use serde::{Deserialize, Serialize};

use crate::navigation::NavigationHistory;
use crate::types::{AssetId, BreadcrumbItem, SortBy, SortOrder, ViewMode};

/// Row height in pixels
pub const ITEM_HEIGHT: RangeValidator<u32> = RangeValidator::new("item_height", 24, 100);
/// Rows rendered beyond the viewport
pub const OVERSCAN_COUNT: RangeValidator<u32> = RangeValidator::new("overscan_count", 1, 20);
/// Sidebar width in pixels
pub const SIDEBAR_WIDTH: RangeValidator<u32> = RangeValidator::new("sidebar_width", 200, 800);

/// Everything the tree view remembers between renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeViewState {
    pub expanded_keys: HashSet<AssetId>,
    pub selected_asset_id: Option<AssetId>,
    pub breadcrumb_path: Vec<BreadcrumbItem>,
    pub navigation: NavigationHistory,

    // View preferences
    pub view_mode: ViewMode,
    pub search_value: String,
    pub show_hidden: bool,
    pub sort_by: SortBy,
    pub sort_order: SortOrder,

    // Rendering knobs
    pub virtualization_enabled: bool,
    pub item_height: u32,
    pub overscan_count: u32,
    pub sidebar_width: u32,
    pub show_performance_metrics: bool,
    pub compact_mode: bool,
}

impl Default for TreeViewState {
    fn default() -> Self {
        Self {
            expanded_keys: HashSet::new(),
            selected_asset_id: None,
            breadcrumb_path: Vec::new(),
            navigation: NavigationHistory::new(),
            view_mode: ViewMode::Tree,
            search_value: String::new(),
            show_hidden: false,
            sort_by: SortBy::Name,
            sort_order: SortOrder::Asc,
            virtualization_enabled: true,
            item_height: 32,
            overscan_count: 5,
            sidebar_width: 400,
            show_performance_metrics: false,
            compact_mode: false,
        }
    }
}

impl TreeViewState {
    /// Pull every numeric knob into its range
    pub fn clamp_knobs(&mut self) {
        self.item_height = ITEM_HEIGHT.clamp(self.item_height);
        self.overscan_count = OVERSCAN_COUNT.clamp(self.overscan_count);
        self.sidebar_width = SIDEBAR_WIDTH.clamp(self.sidebar_width);
    }

    /// Shallow merge of a patch.
    ///
    /// Present fields overwrite; `expanded_keys` is replaced wholesale.
    /// Knobs are clamped and the navigation cursor is normalized afterwards.
    pub fn apply_patch(&mut self, patch: TreeViewStatePatch) {
        let TreeViewStatePatch {
            expanded_keys,
            selected_asset_id,
            breadcrumb_path,
            navigation_history,
            current_position,
            view_mode,
            search_value,
            show_hidden,
            sort_by,
            sort_order,
            virtualization_enabled,
            item_height,
            overscan_count,
            sidebar_width,
            show_performance_metrics,
            compact_mode,
        } = patch;

        if let Some(keys) = expanded_keys {
            self.expanded_keys = keys;
        }
        if let Some(selected) = selected_asset_id {
            self.selected_asset_id = selected;
        }
        if let Some(path) = breadcrumb_path {
            self.breadcrumb_path = path;
        }
        if navigation_history.is_some() || current_position.is_some() {
            let entries = navigation_history.unwrap_or_else(|| self.navigation.entries().to_vec());
            let position = current_position.unwrap_or_else(|| self.navigation.position_or_sentinel());
            self.navigation = NavigationHistory::restore(entries, position);
        }

        if let Some(v) = view_mode {
            self.view_mode = v;
        }
        if let Some(v) = search_value {
            self.search_value = v;
        }
        if let Some(v) = show_hidden {
            self.show_hidden = v;
        }
        if let Some(v) = sort_by {
            self.sort_by = v;
        }
        if let Some(v) = sort_order {
            self.sort_order = v;
        }
        if let Some(v) = virtualization_enabled {
            self.virtualization_enabled = v;
        }
        if let Some(v) = item_height {
            self.item_height = v;
        }
        if let Some(v) = overscan_count {
            self.overscan_count = v;
        }
        if let Some(v) = sidebar_width {
            self.sidebar_width = v;
        }
        if let Some(v) = show_performance_metrics {
            self.show_performance_metrics = v;
        }
        if let Some(v) = compact_mode {
            self.compact_mode = v;
        }

        self.clamp_knobs();
    }
}

/// Partial [`TreeViewState`]; absent fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeViewStatePatch {
    pub expanded_keys: Option<HashSet<AssetId>>,
    /// `Some(None)` clears the selection
    pub selected_asset_id: Option<Option<AssetId>>,
    pub breadcrumb_path: Option<Vec<BreadcrumbItem>>,
    pub navigation_history: Option<Vec<AssetId>>,
    /// `-1` means no cursor
    pub current_position: Option<i64>,
    pub view_mode: Option<ViewMode>,
    pub search_value: Option<String>,
    pub show_hidden: Option<bool>,
    pub sort_by: Option<SortBy>,
    pub sort_order: Option<SortOrder>,
    pub virtualization_enabled: Option<bool>,
    pub item_height: Option<u32>,
    pub overscan_count: Option<u32>,
    pub sidebar_width: Option<u32>,
    pub show_performance_metrics: Option<bool>,
    pub compact_mode: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let state = TreeViewState::default();
        assert_eq!(state.view_mode, ViewMode::Tree);
        assert!(state.virtualization_enabled);
        assert_eq!((state.item_height, state.overscan_count, state.sidebar_width), (32, 5, 400));
        assert_eq!(state.navigation.position(), None);
    }

    #[test]
    fn test_empty_patch_changes_nothing() {
        let mut state = TreeViewState::default();
        state.expanded_keys.insert(3);
        let before = state.clone();

        state.apply_patch(TreeViewStatePatch::default());

        assert_eq!(state, before);
    }

    #[test]
    fn test_patch_replaces_expanded_keys_and_clamps() {
        let mut state = TreeViewState::default();
        state.expanded_keys.extend([1, 2, 3]);

        state.apply_patch(TreeViewStatePatch {
            expanded_keys: Some(HashSet::from([9])),
            item_height: Some(500),
            sidebar_width: Some(10),
            ..Default::default()
        });

        assert_eq!(state.expanded_keys, HashSet::from([9]));
        assert_eq!(state.item_height, 100);
        assert_eq!(state.sidebar_width, 200);
    }

    #[test]
    fn test_patch_normalizes_navigation() {
        let mut state = TreeViewState::default();
        state.apply_patch(TreeViewStatePatch {
            navigation_history: Some(vec![]),
            current_position: Some(4),
            ..Default::default()
        });
        assert_eq!(state.navigation.position(), None);

        state.apply_patch(TreeViewStatePatch {
            navigation_history: Some(vec![10, 20, 30]),
            current_position: Some(-1),
            ..Default::default()
        });
        assert_eq!(state.navigation.position(), Some(2));
    }

    #[test]
    fn test_patch_can_clear_selection() {
        let mut state = TreeViewState {
            selected_asset_id: Some(4),
            ..Default::default()
        };
        state.apply_patch(TreeViewStatePatch {
            selected_asset_id: Some(None),
            ..Default::default()
        });
        assert_eq!(state.selected_asset_id, None);
    }
}
