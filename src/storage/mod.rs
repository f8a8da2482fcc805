//! Storage Layer - the project store and its two backends
//!
//! The system of record is either SQLite with tables:
//! - projects(id, name, client, description, deadline, budget, status, created_at, updated_at)
//! - stages(id, project_id, name, description, status, deadline, responsible, created_at)
//! - participants(id, project_id, name, role, stage, deadline, created_at)
//! - users(id, name, password_hash, created_at)
//!
//! or a JSON document with the same shape, where each project embeds its
//! stages and participants. Callers only see the `ProjectStore` trait; the
//! backend is chosen once, by `open_store`.

pub mod schema;
pub mod sqlite;
pub mod document;

#[cfg(test)]
mod conformance;

pub use sqlite::SqliteStore;
pub use document::JsonStore;

use crate::config::{Backend, ProjetoxConfig};
use crate::model::{
    NewParticipant, NewProject, NewStage, Participant, ParticipantUpdate, Project, ProjectUpdate,
    Stage, StageUpdate, StoreStats, User, UserSummary,
};
use crate::Result;

/// CRUD over projects, stages, participants and users.
///
/// Every write either fully commits or leaves the store untouched. Lookups
/// of missing records return `None`; updates and deletes of missing records
/// return `false`.
pub trait ProjectStore {
    /// Which backend this store writes to
    fn backend(&self) -> Backend;

    // ========== Projects ==========

    /// Insert a project, returning its generated id
    fn create_project(&self, project: &NewProject) -> Result<i64>;

    /// The base record only; `stages` and `participants` are left empty
    fn get_project(&self, id: i64) -> Result<Option<Project>>;

    /// The record with its stages and participants, each in insertion order
    fn get_project_with_children(&self, id: i64) -> Result<Option<Project>>;

    /// All projects with children, most recently created first
    fn list_projects(&self) -> Result<Vec<Project>>;

    /// Apply the present fields and touch `updated_at`.
    /// An empty update returns `false` without writing.
    fn update_project(&self, id: i64, update: &ProjectUpdate) -> Result<bool>;

    /// Remove a project together with all of its stages and participants
    fn delete_project(&self, id: i64) -> Result<bool>;

    // ========== Stages ==========

    fn create_stage(&self, project_id: i64, stage: &NewStage) -> Result<i64>;

    fn list_stages(&self, project_id: i64) -> Result<Vec<Stage>>;

    fn update_stage(&self, stage_id: i64, update: &StageUpdate) -> Result<bool>;

    fn delete_stage(&self, stage_id: i64) -> Result<bool>;

    // ========== Participants ==========

    fn create_participant(&self, project_id: i64, participant: &NewParticipant) -> Result<i64>;

    fn list_participants(&self, project_id: i64) -> Result<Vec<Participant>>;

    fn find_participant_by_name(&self, project_id: i64, name: &str) -> Result<Option<Participant>>;

    fn update_participant(&self, participant_id: i64, update: &ParticipantUpdate) -> Result<bool>;

    fn delete_participant(&self, participant_id: i64) -> Result<bool>;

    // ========== Users ==========

    /// Fails with `Error::UniqueConstraint` if `name` is already taken
    fn create_user(&self, name: &str, password_hash: &str) -> Result<i64>;

    fn find_user(&self, name: &str) -> Result<Option<User>>;

    fn update_password(&self, name: &str, password_hash: &str) -> Result<bool>;

    /// All users ordered by name, without password hashes
    fn list_users(&self) -> Result<Vec<UserSummary>>;

    fn stats(&self) -> Result<StoreStats>;
}

/// Open the backend selected by `config`, creating its file if needed
pub fn open_store(config: &ProjetoxConfig) -> Result<Box<dyn ProjectStore>> {
    match config.backend() {
        Backend::Sqlite => {
            let path = config.database_path();
            tracing::info!("Opening SQLite store at {}", path.display());
            Ok(Box::new(SqliteStore::open(&path)?))
        }
        Backend::Json => {
            let path = config.documents_path();
            tracing::info!("Opening JSON store at {}", path.display());
            Ok(Box::new(JsonStore::open(&path)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_store_selects_backend() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");

        let mut config = ProjetoxConfig {
            data_dir: Some(data_dir.to_string_lossy().to_string()),
            ..Default::default()
        };
        let store = open_store(&config).unwrap();
        assert_eq!(store.backend(), Backend::Sqlite);
        assert!(data_dir.join("projetox.sqlite3").exists());

        config.backend = Some(Backend::Json);
        let store = open_store(&config).unwrap();
        assert_eq!(store.backend(), Backend::Json);
        assert!(data_dir.join("dados_projetos.json").exists());
    }
}
