//! Tree view state for the asset navigation panel
//!
//! The [`TreeStateStore`] owns a single [`TreeViewState`] and exposes
//! synchronous, I/O-free operations over it: node expansion, selection with
//! browser-style back/forward history, breadcrumbs and view preferences.
//! Persistence and rendering live elsewhere and talk to the store through
//! [`TreeViewStatePatch`] and plain selectors.

pub mod navigation;
pub mod store;
pub mod types;
pub mod view_state;

pub use navigation::NavigationHistory;
pub use store::TreeStateStore;
pub use types::{AssetId, AssetInfo, BreadcrumbItem, SortBy, SortOrder, ViewMode};
pub use view_state::{
    TreeViewState, TreeViewStatePatch, ITEM_HEIGHT, OVERSCAN_COUNT, SIDEBAR_WIDTH,
};
