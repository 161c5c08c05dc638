//! Storage abstraction layer for the todos server.
//!
//! Defines the [`TodoStore`] and [`TodoTransaction`] traits that storage
//! backends implement, plus the shared error and paging types. Handlers
//! depend only on this crate; the concrete backend is chosen at startup.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::{TodoStore, TodoTransaction};
pub use types::Page;
