//! # ProjetoX - Project Store
//!
//! Data-access layer for the ProjetoX project manager.
//!
//! ProjetoX provides:
//! - Projects with stages ("etapas") and participants, plus login users
//! - A single [`ProjectStore`] interface with two backends: SQLite and a JSON document
//! - Partial-update builders that only touch the fields a caller supplies
//! - Pure password hashing and verification, independent of any backend
//! - Field validation shared by both backends

pub mod model;
pub mod validate;
pub mod auth;
pub mod storage;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use model::{
    NewParticipant, NewProject, NewStage, Participant, ParticipantUpdate, Project,
    ProjectStatus, ProjectUpdate, Stage, StageStatus, StageUpdate, StoreStats, User, UserSummary,
};
pub use storage::{open_store, JsonStore, ProjectStore, SqliteStore};
pub use config::{Backend, ProjetoxConfig};

/// Result type alias for ProjetoX operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for ProjetoX operations.
///
/// Absent records are not errors: lookups return `None` and
/// update/delete operations return `false`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("User already exists: {0}")]
    UniqueConstraint(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Document error: {0}")]
    Document(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures of the backing store itself (database, file, encoding)
    pub fn is_storage(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Document(_) | Error::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_kinds() {
        let io = Error::Io(std::io::Error::other("disk full"));
        assert!(io.is_storage());
        assert!(!Error::Validation("empty name".into()).is_storage());
        assert!(!Error::UniqueConstraint("alice".into()).is_storage());
    }
}
