use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use tokio::sync::Mutex;

use todos_core::{Todo, TodoDraft, TodoId};
use todos_storage::{Page, StorageError, TodoStore, TodoTransaction};

use crate::snapshot;
use crate::transaction::MemoryTransaction;

/// In-memory Todo storage backend using a papaya lock-free HashMap.
///
/// This storage implementation provides:
/// - Lock-free concurrent access via papaya::HashMap
/// - Store-assigned monotonic ids starting at 1
/// - Soft deletes (records are marked, never removed)
/// - Stable ascending-id listing order
/// - Write-set transactions for atomic batch inserts
/// - Optional JSON snapshot persistence to a single local file
#[derive(Clone)]
pub struct MemoryStore {
    pub(crate) inner: Arc<StoreInner>,
}

pub(crate) struct StoreInner {
    /// Main storage keyed by record id.
    pub(crate) data: PapayaHashMap<TodoId, Todo>,
    /// Next id to assign. Ids allocated to rolled-back transactions are
    /// not reused.
    next_id: AtomicU64,
    /// Snapshot file, if persistence is enabled.
    persist_path: Option<PathBuf>,
    /// Serializes snapshot rewrites so concurrent writers cannot
    /// interleave their renames.
    persist_gate: Mutex<()>,
}

impl MemoryStore {
    /// Creates an empty, non-persistent store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                data: PapayaHashMap::new(),
                next_id: AtomicU64::new(1),
                persist_path: None,
                persist_gate: Mutex::new(()),
            }),
        }
    }

    /// Opens a store backed by a snapshot file.
    ///
    /// A missing file yields an empty store; the file is created on the
    /// first committed write. Id assignment resumes past the highest id
    /// seen in the snapshot, soft-deleted records included.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let records = snapshot::load(&path).await?;

        let max_id = records.iter().map(|t| t.id).max().unwrap_or(0);
        let data = PapayaHashMap::new();
        {
            let guard = data.pin();
            for record in records {
                guard.insert(record.id, record);
            }
        }

        Ok(Self {
            inner: Arc::new(StoreInner {
                data,
                next_id: AtomicU64::new(max_id + 1),
                persist_path: Some(path),
                persist_gate: Mutex::new(()),
            }),
        })
    }

    /// Number of live (non-deleted) records.
    pub async fn count(&self) -> usize {
        let guard = self.inner.data.pin();
        guard.iter().filter(|(_, todo)| !todo.is_deleted()).count()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreInner {
    pub(crate) fn alloc_id(&self) -> TodoId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// All records (soft-deleted included) in ascending id order, for the
    /// snapshot file.
    fn all_records(&self) -> Vec<Todo> {
        let mut records: Vec<Todo> = {
            let guard = self.data.pin();
            guard.iter().map(|(_, todo)| todo.clone()).collect()
        };
        records.sort_by_key(|t| t.id);
        records
    }

    /// Live records in ascending id order.
    fn live_records(&self) -> Vec<Todo> {
        let mut records: Vec<Todo> = {
            let guard = self.data.pin();
            guard
                .iter()
                .filter(|(_, todo)| !todo.is_deleted())
                .map(|(_, todo)| todo.clone())
                .collect()
        };
        records.sort_by_key(|t| t.id);
        records
    }

    /// Rewrites the snapshot file if persistence is enabled.
    pub(crate) async fn persist(&self) -> Result<(), StorageError> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };
        let records = self.all_records();
        let _gate = self.persist_gate.lock().await;
        snapshot::save(path, &records).await
    }
}

#[async_trait]
impl TodoStore for MemoryStore {
    async fn create(&self, draft: TodoDraft) -> Result<Todo, StorageError> {
        draft.validate()?;

        let todo = Todo::new(self.inner.alloc_id(), draft);
        {
            let guard = self.inner.data.pin();
            guard.insert(todo.id, todo.clone());
        }
        self.inner.persist().await?;

        tracing::debug!(id = todo.id, "todo created");
        Ok(todo)
    }

    async fn get(&self, id: TodoId) -> Result<Option<Todo>, StorageError> {
        let guard = self.inner.data.pin();
        Ok(guard
            .get(&id)
            .filter(|todo| !todo.is_deleted())
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Todo>, StorageError> {
        Ok(self.inner.live_records())
    }

    async fn page(&self, page: Page) -> Result<Vec<Todo>, StorageError> {
        Ok(self
            .inner
            .live_records()
            .into_iter()
            .skip(page.offset)
            .take(page.count)
            .collect())
    }

    async fn update(&self, id: TodoId, draft: TodoDraft) -> Result<Todo, StorageError> {
        draft.validate()?;

        let updated = {
            let guard = self.inner.data.pin();
            let existing = guard
                .get(&id)
                .filter(|todo| !todo.is_deleted())
                .ok_or_else(|| StorageError::not_found(id))?;

            let mut updated = existing.clone();
            updated.apply(draft);
            guard.insert(id, updated.clone());
            updated
        };
        self.inner.persist().await?;

        tracing::debug!(id, "todo updated");
        Ok(updated)
    }

    async fn delete(&self, id: TodoId) -> Result<(), StorageError> {
        {
            let guard = self.inner.data.pin();
            let existing = guard
                .get(&id)
                .filter(|todo| !todo.is_deleted())
                .ok_or_else(|| StorageError::not_found(id))?;

            let mut deleted = existing.clone();
            deleted.mark_deleted();
            guard.insert(id, deleted);
        }
        self.inner.persist().await?;

        tracing::debug!(id, "todo soft-deleted");
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<Box<dyn TodoTransaction>, StorageError> {
        Ok(Box::new(MemoryTransaction::new(Arc::clone(&self.inner))))
    }

    fn supports_transactions(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
