//! Browser-style navigation history

use serde::{Deserialize, Serialize};

use crate::types::AssetId;

/// Visited assets with a cursor.
///
/// The cursor is `None` exactly when the history is empty; otherwise it
/// indexes an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationHistory {
    entries: Vec<AssetId>,
    position: Option<usize>,
}

impl NavigationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted parts, repairing an out-of-range cursor.
    ///
    /// `position` uses `-1` for "no cursor". A cursor that does not index an
    /// entry of a non-empty history snaps to the last entry.
    pub fn restore(entries: Vec<AssetId>, position: i64) -> Self {
        if entries.is_empty() {
            return Self::default();
        }
        let last = entries.len() - 1;
        let position = usize::try_from(position)
            .ok()
            .filter(|p| *p <= last)
            .unwrap_or(last);
        Self {
            entries,
            position: Some(position),
        }
    }

    /// Visit an asset, discarding any forward entries
    pub fn push(&mut self, id: AssetId) {
        let keep = self.position.map_or(0, |p| p + 1);
        self.entries.truncate(keep);
        self.entries.push(id);
        self.position = Some(self.entries.len() - 1);
    }

    /// Step back; returns the new current entry
    pub fn back(&mut self) -> Option<AssetId> {
        match self.position {
            Some(p) if p > 0 => {
                self.position = Some(p - 1);
                Some(self.entries[p - 1])
            }
            _ => None,
        }
    }

    /// Step forward; returns the new current entry
    pub fn forward(&mut self) -> Option<AssetId> {
        match self.position {
            Some(p) if p + 1 < self.entries.len() => {
                self.position = Some(p + 1);
                Some(self.entries[p + 1])
            }
            _ => None,
        }
    }

    pub fn can_go_back(&self) -> bool {
        matches!(self.position, Some(p) if p > 0)
    }

    pub fn can_go_forward(&self) -> bool {
        matches!(self.position, Some(p) if p + 1 < self.entries.len())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.position = None;
    }

    pub fn entries(&self) -> &[AssetId] {
        &self.entries
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Cursor in its persisted form (`-1` when empty)
    pub fn position_or_sentinel(&self) -> i64 {
        self.position.map_or(-1, |p| p as i64)
    }

    pub fn current(&self) -> Option<AssetId> {
        self.position.map(|p| self.entries[p])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keep only the newest `max` entries, shifting the cursor with them.
    ///
    /// A cursor that pointed into the dropped prefix lands on the oldest
    /// remaining entry.
    pub fn truncate_front(&mut self, max: usize) {
        if self.entries.len() <= max {
            return;
        }
        if max == 0 {
            self.clear();
            return;
        }
        let dropped = self.entries.len() - max;
        self.entries.drain(..dropped);
        self.position = self.position.map(|p| p.saturating_sub(dropped));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_discards_forward_entries() {
        let mut history = NavigationHistory::new();
        history.push(1);
        history.push(2);
        history.push(3);
        history.back();
        history.back();

        history.push(9);

        assert_eq!(history.entries(), &[1, 9]);
        assert_eq!(history.position(), Some(1));
    }

    #[test]
    fn test_back_and_forward_are_bounded() {
        let mut history = NavigationHistory::new();
        assert_eq!(history.back(), None);
        assert_eq!(history.forward(), None);

        history.push(4);
        assert_eq!(history.back(), None);
        assert_eq!(history.forward(), None);
        assert_eq!(history.position(), Some(0));
    }

    #[test]
    fn test_restore_normalizes_cursor() {
        assert_eq!(NavigationHistory::restore(vec![], 3).position(), None);
        assert_eq!(NavigationHistory::restore(vec![1, 2], -1).position(), Some(1));
        assert_eq!(NavigationHistory::restore(vec![1, 2], 7).position(), Some(1));
        assert_eq!(NavigationHistory::restore(vec![1, 2], 0).position(), Some(0));
    }

    #[test]
    fn test_truncate_front_rebases_cursor() {
        let mut history = NavigationHistory::restore((0..10).collect(), 8);
        history.truncate_front(4);
        assert_eq!(history.entries(), &[6, 7, 8, 9]);
        assert_eq!(history.position(), Some(2));
        assert_eq!(history.current(), Some(8));

        let mut early = NavigationHistory::restore((0..10).collect(), 1);
        early.truncate_front(3);
        assert_eq!(early.position(), Some(0));
    }

    #[test]
    fn test_sentinel() {
        let mut history = NavigationHistory::new();
        assert_eq!(history.position_or_sentinel(), -1);
        history.push(5);
        assert_eq!(history.position_or_sentinel(), 0);
    }
}
