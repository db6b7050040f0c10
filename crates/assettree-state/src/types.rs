//! Shared value types

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Opaque identifier of a node in the asset hierarchy
pub type AssetId = i64;

/// How the tree is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Tree,
    Virtualized,
}

/// Sort key for sibling nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Name,
    Type,
    CreatedAt,
    UpdatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Node record supplied by the hierarchy backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetInfo {
    pub id: AssetId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,
    #[serde(default)]
    pub parent_id: Option<AssetId>,
}

impl AssetInfo {
    pub fn new(id: AssetId, name: impl Into<String>, parent_id: Option<AssetId>) -> Self {
        Self {
            id,
            name: name.into(),
            asset_type: None,
            parent_id,
        }
    }
}

/// One step of the breadcrumb trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreadcrumbItem {
    pub id: AssetId,
    pub name: String,
}

impl BreadcrumbItem {
    pub fn new(id: AssetId, name: impl Into<String>) -> Self {
        Self { id, name: name.into() }
    }

    /// Root-first trail ending at `leaf`.
    ///
    /// Walks `parent_id` links through `records`. The walk stops at a parent
    /// that is not among the records or at the first repeated id. An unknown
    /// leaf yields an empty trail.
    pub fn trail(records: &[AssetInfo], leaf: AssetId) -> Vec<BreadcrumbItem> {
        let by_id: HashMap<AssetId, &AssetInfo> = records.iter().map(|r| (r.id, r)).collect();

        let mut trail = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = Some(leaf);

        while let Some(id) = cursor {
            if !seen.insert(id) {
                break;
            }
            let Some(record) = by_id.get(&id) else {
                break;
            };
            trail.push(BreadcrumbItem::new(record.id, record.name.clone()));
            cursor = record.parent_id;
        }

        trail.reverse();
        trail
    }
}
