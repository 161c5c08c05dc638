pub mod error;
pub mod todo;

pub use error::{CoreError, Result};
pub use todo::{Audit, Todo, TodoDraft, TodoId, now_utc};
