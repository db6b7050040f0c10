//! Tree state store

use std::collections::HashSet;

use tracing::{debug, trace};

use crate::types::{AssetId, AssetInfo, BreadcrumbItem, SortBy, SortOrder, ViewMode};
use crate::view_state::{TreeViewState, TreeViewStatePatch, ITEM_HEIGHT, OVERSCAN_COUNT, SIDEBAR_WIDTH};

/// Sole owner of the live [`TreeViewState`].
///
/// All operations are synchronous and perform no I/O.
#[derive(Debug, Clone, Default)]
pub struct TreeStateStore {
    state: TreeViewState,
}

impl TreeStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing state; knobs are clamped on the way in
    pub fn with_state(mut state: TreeViewState) -> Self {
        state.clamp_knobs();
        Self { state }
    }

    // Expansion

    pub fn expand_node(&mut self, id: AssetId) {
        self.state.expanded_keys.insert(id);
    }

    pub fn collapse_node(&mut self, id: AssetId) {
        self.state.expanded_keys.remove(&id);
    }

    /// Flip expansion; applying it twice restores the original set
    pub fn toggle_node(&mut self, id: AssetId) {
        if !self.state.expanded_keys.remove(&id) {
            self.state.expanded_keys.insert(id);
        }
    }

    /// Expand every node of the supplied tree snapshot
    pub fn expand_all(&mut self, snapshot: &[AssetInfo]) {
        self.state.expanded_keys = snapshot.iter().map(|node| node.id).collect();
        debug!(expanded = self.state.expanded_keys.len(), "Expanded all nodes");
    }

    pub fn collapse_all(&mut self) {
        self.state.expanded_keys.clear();
    }

    // Selection and history

    /// Select an asset and record the visit.
    ///
    /// Forward history beyond the cursor is discarded. `None` clears the
    /// selection and leaves history alone.
    pub fn select_asset(&mut self, id: Option<AssetId>) {
        match id {
            Some(id) => {
                self.state.navigation.push(id);
                self.state.selected_asset_id = Some(id);
                trace!(asset_id = id, position = ?self.state.navigation.position(), "Selected asset");
            }
            None => self.state.selected_asset_id = None,
        }
    }

    /// Returns whether the cursor moved
    pub fn navigate_back(&mut self) -> bool {
        match self.state.navigation.back() {
            Some(id) => {
                self.state.selected_asset_id = Some(id);
                true
            }
            None => false,
        }
    }

    /// Returns whether the cursor moved
    pub fn navigate_forward(&mut self) -> bool {
        match self.state.navigation.forward() {
            Some(id) => {
                self.state.selected_asset_id = Some(id);
                true
            }
            None => false,
        }
    }

    pub fn can_navigate_back(&self) -> bool {
        self.state.navigation.can_go_back()
    }

    pub fn can_navigate_forward(&self) -> bool {
        self.state.navigation.can_go_forward()
    }

    /// Forget visited assets; the current selection is kept
    pub fn clear_navigation_history(&mut self) {
        self.state.navigation.clear();
    }

    // Breadcrumbs

    pub fn set_breadcrumb_path(&mut self, path: Vec<BreadcrumbItem>) {
        self.state.breadcrumb_path = path;
    }

    /// Derive the breadcrumb trail of `leaf` from hierarchy records
    pub fn set_breadcrumb_from_lineage(&mut self, records: &[AssetInfo], leaf: AssetId) {
        self.state.breadcrumb_path = BreadcrumbItem::trail(records, leaf);
    }

    // View preferences

    pub fn set_search_value(&mut self, value: impl Into<String>) {
        self.state.search_value = value.into();
    }

    pub fn set_show_hidden(&mut self, show: bool) {
        self.state.show_hidden = show;
    }

    pub fn set_sort_by(&mut self, sort_by: SortBy) {
        self.state.sort_by = sort_by;
    }

    pub fn set_sort_order(&mut self, order: SortOrder) {
        self.state.sort_order = order;
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.state.view_mode = mode;
    }

    // Rendering knobs; numeric ones are clamped rather than rejected

    pub fn set_item_height(&mut self, height: u32) {
        self.state.item_height = ITEM_HEIGHT.clamp(height);
    }

    pub fn set_overscan_count(&mut self, count: u32) {
        self.state.overscan_count = OVERSCAN_COUNT.clamp(count);
    }

    pub fn set_sidebar_width(&mut self, width: u32) {
        self.state.sidebar_width = SIDEBAR_WIDTH.clamp(width);
    }

    pub fn set_virtualization_enabled(&mut self, enabled: bool) {
        self.state.virtualization_enabled = enabled;
    }

    pub fn set_show_performance_metrics(&mut self, show: bool) {
        self.state.show_performance_metrics = show;
    }

    pub fn set_compact_mode(&mut self, compact: bool) {
        self.state.compact_mode = compact;
    }

    // Bulk

    /// Merge a partial state, e.g. one restored from storage
    pub fn restore_view_state(&mut self, patch: TreeViewStatePatch) {
        self.state.apply_patch(patch);
        debug!(
            expanded = self.state.expanded_keys.len(),
            history = self.state.navigation.len(),
            "Restored tree view state"
        );
    }

    /// Back to defaults
    pub fn reset(&mut self) {
        self.state = TreeViewState::default();
    }

    // Selectors

    pub fn state(&self) -> &TreeViewState {
        &self.state
    }

    pub fn is_expanded(&self, id: AssetId) -> bool {
        self.state.expanded_keys.contains(&id)
    }

    pub fn expanded_keys(&self) -> &HashSet<AssetId> {
        &self.state.expanded_keys
    }

    pub fn selected_asset_id(&self) -> Option<AssetId> {
        self.state.selected_asset_id
    }

    pub fn navigation_history(&self) -> &[AssetId] {
        self.state.navigation.entries()
    }

    pub fn current_position(&self) -> Option<usize> {
        self.state.navigation.position()
    }
}
