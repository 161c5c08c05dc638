//! The Todo record and its embedded audit fields.
//!
//! A `Todo` is the single record type this service manages. Store-managed
//! bookkeeping (creation/update timestamps and the soft-deletion marker)
//! lives in the embedded [`Audit`] value object; clients can only supply
//! title and description via [`TodoDraft`].

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Store-assigned record identity. Unique per record, never reused.
pub type TodoId = u64;

/// Current UTC instant, truncated to whole seconds so serialized
/// timestamps round-trip through RFC 3339 without precision drift.
pub fn now_utc() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    now.replace_nanosecond(0).unwrap_or(now)
}

/// Store-managed audit fields embedded in every record.
///
/// `deleted_at` is the soft-deletion marker: once set, the record is
/// logically deleted and excluded from default reads. It never appears in
/// client-facing JSON because soft-deleted records are never returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub deleted_at: Option<OffsetDateTime>,
}

impl Audit {
    pub fn new() -> Self {
        let now = now_utc();
        Self {
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    /// Refresh the update timestamp; creation timestamp is immutable.
    pub fn touch(&mut self) {
        self.updated_at = now_utc();
    }
}

impl Default for Audit {
    fn default() -> Self {
        Self::new()
    }
}

/// A persisted Todo record.
///
/// Serializes as `{id, title, description, created_at, updated_at}`; the
/// audit fields are flattened into the record body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    #[serde(flatten)]
    pub audit: Audit,
}

impl Todo {
    pub fn new(id: TodoId, draft: TodoDraft) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            audit: Audit::new(),
        }
    }

    /// Overwrite the client-mutable fields and refresh the update
    /// timestamp. Identity and creation timestamp are preserved.
    pub fn apply(&mut self, draft: TodoDraft) {
        self.title = draft.title;
        self.description = draft.description;
        self.audit.touch();
    }

    pub fn mark_deleted(&mut self) {
        self.audit.deleted_at = Some(now_utc());
    }

    pub fn is_deleted(&self) -> bool {
        self.audit.deleted_at.is_some()
    }
}

/// Client-supplied record payload: title and description only.
///
/// Any id or timestamps in the request body are rejected by the shape
/// rather than silently ignored elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TodoDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl TodoDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    /// The one invariant a record must satisfy: a non-empty title. A
    /// draft failing this check is what makes a single insert fail and,
    /// inside a batch, aborts the whole transaction.
    pub fn validate(&self) -> crate::Result<()> {
        if self.title.trim().is_empty() {
            return Err(crate::CoreError::invalid_record("title must not be empty"));
        }
        Ok(())
    }
}
