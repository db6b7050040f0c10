//! Autosaving tree state session

use std::sync::Arc;
use std::time::Duration;

use assettree_common::{format_error, Debouncer};
use assettree_persistence::{PersistenceError, PersistenceManager, SaveOutcome};
use assettree_state::{TreeStateStore, TreeViewState};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type SaveTask = JoinHandle<Result<SaveOutcome, PersistenceError>>;

/// A [`TreeStateStore`] whose changes are saved after a quiet period.
///
/// Mutations go through [`update`](Self::update); each one that changes the
/// state restarts the autosave timer. Must be used inside a Tokio runtime.
pub struct TreeStateSession {
    store: Arc<Mutex<TreeStateStore>>,
    persistence: Arc<PersistenceManager>,
    autosave: Debouncer<TreeViewState>,
    in_flight: Arc<Mutex<Vec<SaveTask>>>,
}

impl TreeStateSession {
    pub fn new(persistence: Arc<PersistenceManager>, autosave_delay: Duration) -> Self {
        let saver = Arc::clone(&persistence);
        let in_flight: Arc<Mutex<Vec<SaveTask>>> = Arc::new(Mutex::new(Vec::new()));
        let tasks = Arc::clone(&in_flight);
        let autosave = Debouncer::new(autosave_delay, move |state: TreeViewState| {
            let saver = Arc::clone(&saver);
            let task = tokio::spawn(async move {
                let result = saver.save_state(&state).await;
                match &result {
                    Ok(outcome) => debug!(?outcome, "Autosaved tree state"),
                    Err(e) => warn!("Autosave failed: {}", format_error(e)),
                }
                result
            });
            let mut tasks = tasks.lock();
            tasks.retain(|task| !task.is_finished());
            tasks.push(task);
        });

        Self {
            store: Arc::new(Mutex::new(TreeStateStore::new())),
            persistence,
            autosave,
            in_flight,
        }
    }

    /// Replace the live state with the stored one, if any
    pub async fn restore(&self) -> bool {
        match self.persistence.load_state().await {
            Some(snapshot) => {
                self.store.lock().restore_view_state(snapshot.into_patch());
                info!(key = self.persistence.storage_key(), "Restored tree state");
                true
            }
            None => {
                debug!(key = self.persistence.storage_key(), "No stored tree state; using defaults");
                false
            }
        }
    }

    /// Mutate the store and schedule an autosave if anything changed
    pub fn update<F, R>(&self, mutate: F) -> R
    where
        F: FnOnce(&mut TreeStateStore) -> R,
    {
        let mut store = self.store.lock();
        let before = store.state().clone();
        let result = mutate(&mut *store);
        if store.state() != &before {
            self.autosave.call(store.state().clone());
        }
        result
    }

    pub fn read<F, R>(&self, inspect: F) -> R
    where
        F: FnOnce(&TreeStateStore) -> R,
    {
        inspect(&*self.store.lock())
    }

    pub fn snapshot(&self) -> TreeViewState {
        self.store.lock().state().clone()
    }

    /// Whether an autosave is scheduled or still writing
    pub fn is_save_pending(&self) -> bool {
        self.autosave.is_pending() || self.in_flight.lock().iter().any(|task| !task.is_finished())
    }

    /// Wait for autosaves already writing, then save now if one is still pending.
    ///
    /// Returns the outcome of the last write, or `None` when there was nothing
    /// to save. A failed autosave is reported as the error unless a later save
    /// from this flush succeeded.
    pub async fn flush(&self) -> Result<Option<SaveOutcome>, PersistenceError> {
        let pending = self.autosave.cancel();
        let settled = self.settle_in_flight().await;
        if !pending {
            return settled;
        }
        let outcome = self.persistence.save_state(&self.snapshot()).await?;
        Ok(Some(outcome))
    }

    async fn settle_in_flight(&self) -> Result<Option<SaveOutcome>, PersistenceError> {
        let tasks = std::mem::take(&mut *self.in_flight.lock());
        let mut last = None;
        let mut first_error = None;
        for task in tasks {
            match task.await {
                Ok(Ok(outcome)) => last = Some(outcome),
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => warn!("Autosave task did not complete: {}", e),
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(last),
        }
    }

    /// Reset to defaults and delete the stored state
    pub async fn clear(&self) -> Result<(), PersistenceError> {
        self.autosave.cancel();
        if let Err(e) = self.settle_in_flight().await {
            debug!("Discarding failed autosave before clear: {}", format_error(&e));
        }
        self.store.lock().reset();
        self.persistence.clear_state().await?;
        Ok(())
    }

    /// Import an export envelope, replacing the live state
    pub async fn import(&self, json: &str) -> Result<(), PersistenceError> {
        self.autosave.cancel();
        if let Err(e) = self.settle_in_flight().await {
            debug!("Discarding failed autosave before import: {}", format_error(&e));
        }
        let state = self.persistence.import_state(json).await?;
        *self.store.lock() = TreeStateStore::with_state(state);
        Ok(())
    }

    pub fn persistence(&self) -> &Arc<PersistenceManager> {
        &self.persistence
    }
}
