//! Record Store - durable storage for ingested messages
//!
//! The rest of the server only sees the [`EmailRepository`] trait; the
//! SQLite implementation lives in [`sqlite`].

mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::types::{Email, EmailSummary, NewEmail, Page, PageRequest};

/// Maximum number of recipient suggestions returned per lookup
pub const MAX_SUGGESTIONS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("corrupt row in {column}: {detail}")]
    CorruptRow {
        column: &'static str,
        detail: String,
    },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// Narrow repository interface over stored messages
pub trait EmailRepository: Send + Sync {
    /// Persist a message and return it with its assigned id
    fn insert(&self, email: NewEmail) -> Result<Email, StoreError>;

    /// Point lookup by id
    fn get(&self, id: i64) -> Result<Email, StoreError>;

    /// Newest-first listing, optionally restricted to one recipient
    fn list(
        &self,
        page: PageRequest,
        recipient: Option<&str>,
    ) -> Result<Page<EmailSummary>, StoreError>;

    /// Total number of stored messages
    fn count(&self) -> Result<u64, StoreError>;

    /// Distinct recipients starting with `prefix`, case-insensitive
    fn suggest_recipients(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}
