//! JSON snapshot persistence for the in-memory backend.
//!
//! The whole record set (soft-deleted records included) is stored as one
//! JSON array in a single local file. The file is rewritten after every
//! committed write via a temporary file and an atomic rename, so readers
//! never observe a half-written snapshot. A missing file is an empty
//! store; the snapshot shape is carried entirely by the record type, so
//! there is no separate schema to migrate at startup.

use std::path::Path;

use todos_core::Todo;
use todos_storage::StorageError;

/// Loads all records from a snapshot file.
///
/// Returns an empty set if the file does not exist yet.
pub async fn load(path: &Path) -> Result<Vec<Todo>, StorageError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(StorageError::persistence(format!(
                "failed to read snapshot {}: {e}",
                path.display()
            )));
        }
    };

    if bytes.is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_slice(&bytes).map_err(|e| {
        StorageError::persistence(format!("corrupt snapshot {}: {e}", path.display()))
    })
}

/// Writes all records to a snapshot file, atomically.
pub async fn save(path: &Path, records: &[Todo]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            StorageError::persistence(format!(
                "failed to create snapshot directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    let bytes = serde_json::to_vec_pretty(records)
        .map_err(|e| StorageError::persistence(format!("failed to encode snapshot: {e}")))?;

    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, &bytes).await.map_err(|e| {
        StorageError::persistence(format!("failed to write snapshot {}: {e}", tmp.display()))
    })?;
    tokio::fs::rename(&tmp, path).await.map_err(|e| {
        StorageError::persistence(format!(
            "failed to replace snapshot {}: {e}",
            path.display()
        ))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use todos_core::TodoDraft;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");
        let records = load(&path).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");

        let mut deleted = Todo::new(2, TodoDraft::new("b", ""));
        deleted.mark_deleted();
        let records = vec![Todo::new(1, TodoDraft::new("a", "first")), deleted];

        save(&path, &records).await.unwrap();
        let loaded = load(&path).await.unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0], records[0]);
        assert!(loaded[1].is_deleted());
        // No stray temp file left behind.
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todos.json");
        tokio::fs::write(&path, b"not json").await.unwrap();

        let err = load(&path).await.unwrap_err();
        assert!(matches!(err, StorageError::Persistence { .. }));
    }

    #[tokio::test]
    async fn test_save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/data/todos.json");
        save(&path, &[]).await.unwrap();
        assert!(path.exists());
    }
}
