//! Storage traits for the todos storage abstraction layer.
//!
//! This module defines the contract that all storage backends must
//! implement. Implementations must be thread-safe (`Send + Sync`).

use async_trait::async_trait;

use crate::error::StorageError;
use crate::types::Page;
use todos_core::{Todo, TodoDraft, TodoId};

/// The main storage trait for Todo records.
///
/// Reads exclude soft-deleted records: `get` returns `Ok(None)` and
/// `update`/`delete` return `StorageError::NotFound` for a record that is
/// absent or already soft-deleted. Listing order is stable ascending id.
///
/// # Example
///
/// ```ignore
/// use todos_storage::{StorageError, TodoStore};
///
/// async fn must_get(store: &dyn TodoStore, id: u64) -> Result<todos_core::Todo, StorageError> {
///     store.get(id).await?.ok_or(StorageError::NotFound { id })
/// }
/// ```
#[async_trait]
pub trait TodoStore: Send + Sync {
    // ==================== CRUD Operations ====================

    /// Creates a new record from a client draft.
    ///
    /// The store assigns the identity and both timestamps; anything the
    /// client supplied beyond title/description has already been dropped
    /// at the payload shape.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidRecord` if the draft fails the
    /// store's record validation.
    async fn create(&self, draft: TodoDraft) -> Result<Todo, StorageError>;

    /// Reads a record by id.
    ///
    /// Returns `None` if the record does not exist or is soft-deleted.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing
    /// records.
    async fn get(&self, id: TodoId) -> Result<Option<Todo>, StorageError>;

    /// Returns all live records in listing order.
    async fn list(&self) -> Result<Vec<Todo>, StorageError>;

    /// Returns one page of live records in listing order.
    async fn page(&self, page: Page) -> Result<Vec<Todo>, StorageError>;

    /// Overwrites the client-mutable fields of an existing record.
    ///
    /// Identity and creation timestamp are preserved; the update
    /// timestamp is refreshed by the store.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record is absent or
    /// soft-deleted, `StorageError::InvalidRecord` if the draft fails
    /// validation.
    async fn update(&self, id: TodoId, draft: TodoDraft) -> Result<Todo, StorageError>;

    /// Soft-deletes a record. The record stays in storage but is excluded
    /// from all default reads.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record is absent or
    /// already soft-deleted.
    async fn delete(&self, id: TodoId) -> Result<(), StorageError>;

    // ==================== Transactions ====================

    /// Begins a new transaction for atomic multi-record inserts.
    ///
    /// The transaction must be either committed or rolled back; dropping
    /// it without committing discards all staged work.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::TransactionError` if a transaction cannot
    /// be started.
    async fn begin_transaction(&self) -> Result<Box<dyn TodoTransaction>, StorageError>;

    // ==================== Metadata ====================

    /// Returns whether this storage backend supports transactions.
    fn supports_transactions(&self) -> bool;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

/// A transaction for performing atomic multi-record inserts.
///
/// Records staged with `create` become visible to other readers only
/// after `commit`; if any staged insert fails or `rollback` is called,
/// nothing is persisted.
#[async_trait]
pub trait TodoTransaction: Send + Sync {
    /// Stages a new record within this transaction and returns it with
    /// its store-assigned identity and timestamps.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidRecord` if the draft fails
    /// validation; the caller is expected to roll back the whole
    /// transaction.
    async fn create(&mut self, draft: TodoDraft) -> Result<Todo, StorageError>;

    /// Commits all staged records in one atomic step.
    ///
    /// After commit, the transaction is consumed and cannot be used again.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::TransactionError` if the commit fails; in
    /// that case no staged record was persisted.
    async fn commit(self: Box<Self>) -> Result<(), StorageError>;

    /// Discards all staged records.
    ///
    /// After rollback, the transaction is consumed and cannot be used
    /// again.
    async fn rollback(self: Box<Self>) -> Result<(), StorageError>;
}

// Ensure traits are object-safe by using them as trait objects
#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test that TodoStore is object-safe
    fn _assert_store_object_safe(_: &dyn TodoStore) {}

    // Compile-time test that TodoTransaction is object-safe
    fn _assert_transaction_object_safe(_: &dyn TodoTransaction) {}
}
