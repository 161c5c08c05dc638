//! Write-set transaction for atomic batch inserts.
//!
//! Records are staged in the transaction and only become visible to other
//! readers when `commit` applies the whole set in one guarded pass. Ids
//! and timestamps are assigned at staging time so callers get the final
//! record back immediately; ids allocated to a rolled-back transaction
//! are simply never used again.

use std::sync::Arc;

use async_trait::async_trait;

use todos_core::{Todo, TodoDraft};
use todos_storage::{StorageError, TodoTransaction};

use crate::storage::StoreInner;

pub struct MemoryTransaction {
    inner: Arc<StoreInner>,
    staged: Vec<Todo>,
}

impl MemoryTransaction {
    pub(crate) fn new(inner: Arc<StoreInner>) -> Self {
        Self {
            inner,
            staged: Vec::new(),
        }
    }
}

#[async_trait]
impl TodoTransaction for MemoryTransaction {
    async fn create(&mut self, draft: TodoDraft) -> Result<Todo, StorageError> {
        draft.validate()?;

        let todo = Todo::new(self.inner.alloc_id(), draft);
        self.staged.push(todo.clone());
        Ok(todo)
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        let MemoryTransaction { inner, staged } = *self;
        let count = staged.len();
        {
            let guard = inner.data.pin();
            for todo in staged {
                guard.insert(todo.id, todo);
            }
        }
        inner
            .persist()
            .await
            .map_err(|e| StorageError::transaction_error(e.to_string()))?;

        tracing::debug!(count, "transaction committed");
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        tracing::debug!(count = self.staged.len(), "transaction rolled back");
        Ok(())
    }
}
