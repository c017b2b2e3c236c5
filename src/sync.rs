//! Keeps the local `CollectionStore` in step with the remote store.
//!
//! Edits are applied locally first and then written through. Writes for the
//! same record go out one at a time: each `update` waits for the previous
//! one on that record and snapshots the record only once it has its turn,
//! so a slow request can never carry stale values over a newer edit. A write
//! the server refuses is rolled back locally to the last value the server
//! acknowledged. Creates and deletes are not optimistic: the store only
//! changes once the server has confirmed.
//!
//! Remote failures never escape. They are logged and reported back to the
//! caller as an outcome value so a UI can show them.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::ai::{self, AIProvider};
use crate::errors::RemoteError;
use crate::models::{Fields, Patch, RecordId, TextField};
use crate::remote::RemoteStore;
use crate::store::CollectionStore;

/// Yes/no gate asked before a delete goes out.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug)]
pub enum UpdateOutcome {
    Saved,
    /// No record with that id (never existed or deleted meanwhile).
    Missing,
    /// The server refused; the local edit was undone.
    RolledBack(RemoteError),
}

#[derive(Debug)]
pub enum DeleteOutcome {
    Declined,
    Missing,
    Removed,
    Failed(RemoteError),
}

#[derive(Debug)]
pub enum EnrichOutcome {
    /// No provider configured.
    Disabled,
    Missing,
    /// Description too short to analyze.
    Skipped,
    /// The provider answered without any text.
    NoInsight,
    Applied,
    Failed(RemoteError),
}

/// Counts in-flight operations of one kind for as long as it is alive.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

type RecordLock = Arc<tokio::sync::Mutex<()>>;

pub struct SyncEngine<R> {
    remote: R,
    provider: Option<Box<dyn AIProvider>>,
    // never held across an await
    store: Mutex<CollectionStore>,
    record_locks: Mutex<HashMap<RecordId, RecordLock>>,
    saving: AtomicUsize,
    analyzing: AtomicUsize,
}

impl<R: RemoteStore> SyncEngine<R> {
    pub fn new(remote: R, provider: Option<Box<dyn AIProvider>>) -> Self {
        Self {
            remote,
            provider,
            store: Mutex::new(CollectionStore::new()),
            record_locks: Mutex::new(HashMap::new()),
            saving: AtomicUsize::new(0),
            analyzing: AtomicUsize::new(0),
        }
    }

    fn store(&self) -> MutexGuard<'_, CollectionStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_lock(&self, id: &RecordId) -> RecordLock {
        let mut locks = self
            .record_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        locks.entry(id.clone()).or_default().clone()
    }

    /// Drop locks of records the last load no longer returned.
    fn prune_record_locks(&self) {
        let live: HashSet<RecordId> =
            self.read(|store| store.records().iter().map(|r| r.id.clone()).collect());
        self.record_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|id, _| live.contains(id));
    }

    fn forget_record_lock(&self, id: &RecordId) {
        self.record_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id);
    }

    /// Run `f` against the current store state.
    pub fn read<T>(&self, f: impl FnOnce(&CollectionStore) -> T) -> T {
        f(&self.store())
    }

    pub fn snapshot(&self) -> CollectionStore {
        self.store().clone()
    }

    pub fn has_enrichment(&self) -> bool {
        self.provider.is_some()
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst) > 0
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing.load(Ordering::SeqCst) > 0
    }

    pub fn select(&self, id: &RecordId) -> bool {
        self.store().select(id)
    }

    pub fn set_search_term(&self, term: impl Into<String>) {
        self.store().set_search_term(term);
    }

    pub fn dismiss_error(&self) {
        self.store().clear_error();
    }

    /// Fetch everything from the server. On failure the store keeps its
    /// last known records and carries the error message until the next
    /// successful load.
    pub async fn load(&self) -> bool {
        self.store().set_loading();
        match self.remote.fetch_all().await {
            Ok(records) => {
                let count = records.len();
                self.store().replace_all(records);
                self.prune_record_locks();
                info!(count, "loaded applications");
                true
            }
            Err(err) => {
                warn!(error = %err, "loading applications failed");
                self.store()
                    .set_error(format!("Could not load applications: {}", err));
                false
            }
        }
    }

    /// Create an application with default values. Nothing shows up locally
    /// until the server has assigned an id.
    pub async fn create(&self) -> Option<RecordId> {
        let draft = Fields::draft(chrono::Local::now().date_naive());
        match self.remote.create(&draft).await {
            Ok(record) => {
                let id = record.id.clone();
                self.store().insert(record);
                info!(%id, "created application");
                Some(id)
            }
            Err(err) => {
                warn!(error = %err, "creating application failed");
                None
            }
        }
    }

    pub async fn update(&self, id: &RecordId, patch: Patch) -> UpdateOutcome {
        let _saving = InFlight::enter(&self.saving);
        let field = patch.field_name();

        if !self.store().patch(id, patch.clone()) {
            debug!(%id, field, "update for unknown application ignored");
            return UpdateOutcome::Missing;
        }

        let lock = self.record_lock(id);
        let _turn = lock.lock().await;

        let Some(snapshot) = self.read(|store| store.get(id).cloned()) else {
            debug!(%id, field, "application deleted before update was sent");
            return UpdateOutcome::Missing;
        };

        match self.remote.update(id, &snapshot).await {
            Ok(saved) => {
                self.store().confirm(&saved);
                info!(%id, field, "saved application");
                UpdateOutcome::Saved
            }
            Err(err) => {
                let restored = self.store().restore(id, &patch);
                warn!(%id, field, restored, error = %err, "saving application failed");
                UpdateOutcome::RolledBack(err)
            }
        }
    }

    /// Delete after confirmation. The record stays visible until the server
    /// confirms, so a failed delete never hides a live record.
    pub async fn delete(&self, id: &RecordId, confirm: &dyn Confirm) -> DeleteOutcome {
        let Some(label) = self.read(|store| {
            store
                .get(id)
                .map(|r| format!("{} at {}", r.role(), r.company()))
        }) else {
            return DeleteOutcome::Missing;
        };
        if !confirm.confirm(&format!("Delete this application ({})?", label)) {
            return DeleteOutcome::Declined;
        }

        let lock = self.record_lock(id);
        let turn = lock.lock().await;

        let outcome = match self.remote.delete(id).await {
            Ok(()) => {
                self.store().remove(id);
                info!(%id, "deleted application");
                DeleteOutcome::Removed
            }
            Err(err) => {
                warn!(%id, error = %err, "deleting application failed");
                DeleteOutcome::Failed(err)
            }
        };
        drop(turn);
        if matches!(outcome, DeleteOutcome::Removed) {
            self.forget_record_lock(id);
        }
        outcome
    }

    /// Analyze the record's description and store the result in
    /// `aiInsights` through the regular update path. No retry.
    pub async fn enrich(&self, id: &RecordId) -> EnrichOutcome {
        let Some(provider) = self.provider.as_deref() else {
            return EnrichOutcome::Disabled;
        };
        let Some(description) = self.read(|store| {
            store
                .get(id)
                .map(|r| r.fields.description.clone().unwrap_or_default())
        }) else {
            return EnrichOutcome::Missing;
        };
        if !ai::passes_gate(&description) {
            debug!(%id, "description too short to analyze");
            return EnrichOutcome::Skipped;
        }

        let analyzing = InFlight::enter(&self.analyzing);
        let result = ai::analyze_job_description(provider, &description).await;
        drop(analyzing);

        match result {
            Ok(Some(insights)) => {
                let patch = Patch::Text(TextField::AiInsights, Some(insights));
                match self.update(id, patch).await {
                    UpdateOutcome::Saved => EnrichOutcome::Applied,
                    UpdateOutcome::Missing => EnrichOutcome::Missing,
                    UpdateOutcome::RolledBack(err) => EnrichOutcome::Failed(err),
                }
            }
            Ok(None) => {
                info!(%id, model = provider.model_name(), "analysis produced no insight");
                EnrichOutcome::NoInsight
            }
            Err(err) => {
                warn!(%id, error = %err, "analysis failed");
                EnrichOutcome::Failed(err)
            }
        }
    }
}
