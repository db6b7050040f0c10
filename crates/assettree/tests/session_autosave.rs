//! Debounced autosave behaviour of the session

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assettree::persistence::{
    MemoryStateStorage, PersistenceConfig, PersistenceError, PersistenceManager, SaveOutcome,
    StateStorage, StorageError,
};
use assettree::TreeStateSession;
use async_trait::async_trait;

/// Memory storage whose writes take a while and can be made to fail
#[derive(Default)]
struct SlowStorage {
    inner: MemoryStateStorage,
    failing: AtomicBool,
}

#[async_trait]
impl StateStorage for SlowStorage {
    async fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.read(key).await
    }

    async fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("disk offline".to_string()));
        }
        self.inner.write(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        self.inner.remove(key).await
    }

    fn name(&self) -> &str {
        "slow"
    }
}

fn slow_session(storage: Arc<SlowStorage>, delay_ms: u64) -> TreeStateSession {
    let manager = Arc::new(PersistenceManager::new(storage, PersistenceConfig::default()));
    TreeStateSession::new(manager, Duration::from_millis(delay_ms))
}

fn session(delay_ms: u64) -> TreeStateSession {
    let storage = Arc::new(MemoryStateStorage::new());
    let manager = Arc::new(PersistenceManager::new(storage, PersistenceConfig::default()));
    TreeStateSession::new(manager, Duration::from_millis(delay_ms))
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_updates_is_saved_once() {
    let session = session(300);

    for id in 1..=5 {
        session.update(|store| store.expand_node(id));
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(session.is_save_pending());
    assert_eq!(session.persistence().acknowledged_sequence(), 0);

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert!(!session.is_save_pending());
    assert_eq!(session.persistence().acknowledged_sequence(), 1);
    let stored = session.persistence().load_state().await.unwrap();
    assert_eq!(stored.expanded_keys, vec![1, 2, 3, 4, 5]);
}

#[tokio::test(start_paused = true)]
async fn test_no_op_updates_do_not_schedule_saves() {
    let session = session(300);

    let expanded = session.update(|store| {
        store.collapse_node(42);
        store.navigate_back()
    });

    assert!(!expanded);
    assert!(!session.is_save_pending());
}

#[tokio::test(start_paused = true)]
async fn test_flush_saves_immediately() {
    let session = session(10_000);
    assert_eq!(session.flush().await.unwrap(), None);

    session.update(|store| store.select_asset(Some(7)));
    let outcome = session.flush().await.unwrap();

    assert!(matches!(outcome, Some(SaveOutcome::Written { sequence: 1, .. })));
    assert!(!session.is_save_pending());
    let stored = session.persistence().load_state().await.unwrap();
    assert_eq!(stored.selected_asset_id, Some(7));

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(session.persistence().acknowledged_sequence(), 1);
}

#[tokio::test]
async fn test_restore_applies_stored_state() {
    let storage = Arc::new(MemoryStateStorage::new());
    let manager = Arc::new(PersistenceManager::new(storage, PersistenceConfig::default()));

    let first = TreeStateSession::new(Arc::clone(&manager), Duration::from_millis(50));
    first.update(|store| {
        store.select_asset(Some(1));
        store.select_asset(Some(2));
        store.set_item_height(60);
    });
    first.flush().await.unwrap();

    let second = TreeStateSession::new(manager, Duration::from_millis(50));
    assert!(second.restore().await);
    assert_eq!(second.read(|store| store.selected_asset_id()), Some(2));
    assert!(second.read(|store| store.can_navigate_back()));
    assert_eq!(second.snapshot().item_height, 60);
}

#[tokio::test]
async fn test_clear_resets_and_deletes() {
    let session = session(50);
    session.update(|store| store.expand_node(3));
    session.flush().await.unwrap();

    session.clear().await.unwrap();

    assert!(session.read(|store| store.expanded_keys().is_empty()));
    assert!(session.persistence().load_state().await.is_none());
    assert!(!session.restore().await);
}

#[tokio::test]
async fn test_import_replaces_live_state() {
    let source = session(50);
    source.update(|store| {
        store.expand_node(11);
        store.select_asset(Some(11));
    });
    source.flush().await.unwrap();
    let exported = source.persistence().export_state().await.unwrap().unwrap();

    let target = session(50);
    target.update(|store| store.expand_node(99));
    target.import(&exported).await.unwrap();

    assert!(!target.is_save_pending());
    assert!(target.read(|store| store.is_expanded(11)));
    assert!(!target.read(|store| store.is_expanded(99)));
    assert_eq!(target.read(|store| store.selected_asset_id()), Some(11));
}

#[tokio::test(start_paused = true)]
async fn test_flush_waits_for_autosave_already_writing() {
    let storage = Arc::new(SlowStorage::default());
    let session = slow_session(Arc::clone(&storage), 10);

    session.update(|store| store.expand_node(7));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(session.is_save_pending());
    assert!(storage.inner.is_empty());

    let outcome = session.flush().await.unwrap();

    assert!(matches!(outcome, Some(SaveOutcome::Written { sequence: 1, .. })));
    assert!(!session.is_save_pending());
    assert_eq!(storage.inner.len(), 1);
    let stored = session.persistence().load_state().await.unwrap();
    assert_eq!(stored.expanded_keys, vec![7]);
}

#[tokio::test(start_paused = true)]
async fn test_flush_saves_changes_made_while_autosave_was_writing() {
    let storage = Arc::new(SlowStorage::default());
    let session = slow_session(Arc::clone(&storage), 10);

    session.update(|store| store.expand_node(1));
    tokio::time::sleep(Duration::from_millis(20)).await;
    session.update(|store| store.expand_node(2));

    let outcome = session.flush().await.unwrap();

    assert!(matches!(outcome, Some(SaveOutcome::Written { sequence: 2, .. })));
    let stored = session.persistence().load_state().await.unwrap();
    assert_eq!(stored.expanded_keys, vec![1, 2]);
}

#[tokio::test(start_paused = true)]
async fn test_flush_reports_failed_autosave() {
    let storage = Arc::new(SlowStorage::default());
    storage.failing.store(true, Ordering::SeqCst);
    let session = slow_session(Arc::clone(&storage), 10);

    session.update(|store| store.select_asset(Some(3)));
    tokio::time::sleep(Duration::from_millis(20)).await;

    let err = session.flush().await.unwrap_err();
    assert!(matches!(err, PersistenceError::StorageUnavailable { .. }));
    assert_eq!(session.flush().await.unwrap(), None);
}
