//! SQLite storage implementation

use std::path::Path;
use chrono::Utc;
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use tracing::{debug, info, warn};
use crate::config::{self, Backend};
use crate::model::{
    NewParticipant, NewProject, NewStage, Participant, ParticipantUpdate, Project, ProjectStatus,
    ProjectUpdate, Stage, StageStatus, StageUpdate, StoreStats, User, UserSummary,
};
use crate::{validate, Error, Result};
use super::{schema, ProjectStore};

const PROJECT_COLUMNS: &str =
    "id, name, client, description, deadline, budget, status, created_at, updated_at";
const STAGE_COLUMNS: &str =
    "id, project_id, name, description, status, deadline, responsible, created_at";
const PARTICIPANT_COLUMNS: &str = "id, project_id, name, role, stage, deadline, created_at";
const USER_COLUMNS: &str = "id, name, password_hash, created_at";

/// SQLite-backed project store.
///
/// Every write runs in its own transaction; a failed write is rolled back
/// when the transaction is dropped uncommitted.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates it and its directory if they don't exist)
    pub fn open(path: &Path) -> Result<Self> {
        config::ensure_parent_dir(path)?;
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;

        let legacy = store.legacy_tables()?;
        if !legacy.is_empty() {
            warn!(
                tables = %legacy.join(", "),
                "{} also holds desktop-app tables, which this store does not read",
                path.display()
            );
        }
        info!("SQLite store ready at {}", path.display());
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(schema::PRAGMAS)?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Tables left by the desktop app's own schema, if this file has any
    fn legacy_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table'
             AND name IN ('projetos', 'etapas', 'participantes', 'usuarios')
             ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    fn require_project(conn: &Connection, project_id: i64) -> Result<()> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1)",
            [project_id],
            |row| row.get(0),
        )?;
        if !exists {
            warn!(project_id, "rejected write for missing project");
            return Err(Error::Validation(format!("project {} does not exist", project_id)));
        }
        Ok(())
    }

    fn count(&self, table: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn attach_children(&self, project: &mut Project) -> Result<()> {
        project.stages = self.list_stages(project.id)?;
        project.participants = self.list_participants(project.id)?;
        Ok(())
    }

    /// Helper to convert a row to a Project (without children)
    fn row_to_project(row: &rusqlite::Row) -> rusqlite::Result<Project> {
        let status_str: String = row.get(6)?;
        let status: ProjectStatus = status_str.parse().map_err(|e: Error| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Project {
            id: row.get(0)?,
            name: row.get(1)?,
            client: row.get(2)?,
            description: row.get(3)?,
            deadline: row.get(4)?,
            budget: row.get(5)?,
            status,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
            stages: Vec::new(),
            participants: Vec::new(),
        })
    }

    fn row_to_stage(row: &rusqlite::Row) -> rusqlite::Result<Stage> {
        let status_str: String = row.get(4)?;
        let status: StageStatus = status_str.parse().map_err(|e: Error| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(Stage {
            id: row.get(0)?,
            project_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            status,
            deadline: row.get(5)?,
            responsible: row.get(6)?,
            created_at: row.get(7)?,
        })
    }

    fn row_to_participant(row: &rusqlite::Row) -> rusqlite::Result<Participant> {
        Ok(Participant {
            id: row.get(0)?,
            project_id: row.get(1)?,
            name: row.get(2)?,
            role: row.get(3)?,
            stage: row.get(4)?,
            deadline: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            password_hash: row.get(2)?,
            created_at: row.get(3)?,
        })
    }
}

/// Collects `column = ?n` assignments for a partial UPDATE
struct Assignments {
    columns: Vec<&'static str>,
    values: Vec<Box<dyn ToSql>>,
}

impl Assignments {
    fn new() -> Self {
        Self { columns: Vec::new(), values: Vec::new() }
    }

    fn set<T: ToSql + 'static>(&mut self, column: &'static str, value: Option<T>) {
        if let Some(value) = value {
            self.columns.push(column);
            self.values.push(Box::new(value));
        }
    }

    /// Run the UPDATE against the row whose `key_column` equals `key`
    fn execute<K: ToSql + 'static>(
        mut self,
        conn: &Connection,
        table: &str,
        key_column: &str,
        key: K,
    ) -> Result<usize> {
        let sets: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{} = ?{}", column, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            table,
            sets.join(", "),
            key_column,
            self.columns.len() + 1
        );
        self.values.push(Box::new(key));

        let changed = conn.execute(&sql, params_from_iter(self.values.iter().map(|v| v.as_ref())))?;
        Ok(changed)
    }
}

/// Map a failed user insert, turning a duplicate name into `UniqueConstraint`
fn map_user_insert_error(err: rusqlite::Error, name: &str) -> Error {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Error::UniqueConstraint(name.to_string())
        }
        _ => Error::Storage(err),
    }
}

impl ProjectStore for SqliteStore {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    // ========== Project Operations ==========

    fn create_project(&self, project: &NewProject) -> Result<i64> {
        project.validate()?;
        let record = project.build(0, Utc::now());

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            r#"
            INSERT INTO projects (name, client, description, deadline, budget, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.name,
                record.client,
                record.description,
                record.deadline,
                record.budget,
                record.status.as_str(),
                record.created_at,
                record.updated_at,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(id, name = %record.name, "created project");
        Ok(id)
    }

    fn get_project(&self, id: i64) -> Result<Option<Project>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM projects WHERE id = ?1", PROJECT_COLUMNS),
                [id],
                |row| Self::row_to_project(row),
            )
            .optional()
            .map_err(Into::into)
    }

    fn get_project_with_children(&self, id: i64) -> Result<Option<Project>> {
        let Some(mut project) = self.get_project(id)? else {
            return Ok(None);
        };
        self.attach_children(&mut project)?;
        Ok(Some(project))
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM projects ORDER BY created_at DESC, id DESC",
            PROJECT_COLUMNS
        ))?;

        let mut projects = stmt
            .query_map([], |row| Self::row_to_project(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for project in &mut projects {
            self.attach_children(project)?;
        }
        Ok(projects)
    }

    fn update_project(&self, id: i64, update: &ProjectUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }
        update.validate()?;

        let mut assignments = Assignments::new();
        assignments.set("name", update.name.clone());
        assignments.set("client", update.client.clone());
        assignments.set("description", update.description.clone());
        assignments.set("deadline", update.deadline.clone());
        assignments.set("budget", update.budget);
        assignments.set("status", update.status.map(|s| s.as_str()));
        assignments.set("updated_at", Some(Utc::now()));

        let tx = self.conn.unchecked_transaction()?;
        let changed = assignments.execute(&tx, "projects", "id", id)?;
        tx.commit()?;

        debug!(id, changed, "updated project");
        Ok(changed > 0)
    }

    fn delete_project(&self, id: i64) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute("DELETE FROM projects WHERE id = ?1", [id])?;
        tx.commit()?;

        debug!(id, changed, "deleted project");
        Ok(changed > 0)
    }

    // ========== Stage Operations ==========

    fn create_stage(&self, project_id: i64, stage: &NewStage) -> Result<i64> {
        stage.validate()?;
        let record = stage.build(0, project_id, Utc::now());

        let tx = self.conn.unchecked_transaction()?;
        Self::require_project(&tx, project_id)?;
        tx.execute(
            r#"
            INSERT INTO stages (project_id, name, description, status, deadline, responsible, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                record.project_id,
                record.name,
                record.description,
                record.status.as_str(),
                record.deadline,
                record.responsible,
                record.created_at,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(id, project_id, "created stage");
        Ok(id)
    }

    fn list_stages(&self, project_id: i64) -> Result<Vec<Stage>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM stages WHERE project_id = ?1 ORDER BY created_at, id",
            STAGE_COLUMNS
        ))?;

        let stages = stmt
            .query_map([project_id], |row| Self::row_to_stage(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(stages)
    }

    fn update_stage(&self, stage_id: i64, update: &StageUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }
        update.validate()?;

        let mut assignments = Assignments::new();
        assignments.set("name", update.name.clone());
        assignments.set("description", update.description.clone());
        assignments.set("status", update.status.map(|s| s.as_str()));
        assignments.set("deadline", update.deadline.clone());
        assignments.set("responsible", update.responsible.clone());

        let tx = self.conn.unchecked_transaction()?;
        let changed = assignments.execute(&tx, "stages", "id", stage_id)?;
        tx.commit()?;

        debug!(stage_id, changed, "updated stage");
        Ok(changed > 0)
    }

    fn delete_stage(&self, stage_id: i64) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute("DELETE FROM stages WHERE id = ?1", [stage_id])?;
        tx.commit()?;
        Ok(changed > 0)
    }

    // ========== Participant Operations ==========

    fn create_participant(&self, project_id: i64, participant: &NewParticipant) -> Result<i64> {
        participant.validate()?;
        let record = participant.build(0, project_id, Utc::now());

        let tx = self.conn.unchecked_transaction()?;
        Self::require_project(&tx, project_id)?;
        tx.execute(
            r#"
            INSERT INTO participants (project_id, name, role, stage, deadline, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.project_id,
                record.name,
                record.role,
                record.stage,
                record.deadline,
                record.created_at,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(id, project_id, "created participant");
        Ok(id)
    }

    fn list_participants(&self, project_id: i64) -> Result<Vec<Participant>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM participants WHERE project_id = ?1 ORDER BY id",
            PARTICIPANT_COLUMNS
        ))?;

        let participants = stmt
            .query_map([project_id], |row| Self::row_to_participant(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(participants)
    }

    fn find_participant_by_name(&self, project_id: i64, name: &str) -> Result<Option<Participant>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM participants WHERE project_id = ?1 AND name = ?2 ORDER BY id LIMIT 1",
                    PARTICIPANT_COLUMNS
                ),
                params![project_id, name],
                |row| Self::row_to_participant(row),
            )
            .optional()
            .map_err(Into::into)
    }

    fn update_participant(&self, participant_id: i64, update: &ParticipantUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }
        update.validate()?;

        let mut assignments = Assignments::new();
        assignments.set("name", update.name.clone());
        assignments.set("role", update.role.clone());
        assignments.set("stage", update.stage.clone());
        assignments.set("deadline", update.deadline.clone());

        let tx = self.conn.unchecked_transaction()?;
        let changed = assignments.execute(&tx, "participants", "id", participant_id)?;
        tx.commit()?;

        debug!(participant_id, changed, "updated participant");
        Ok(changed > 0)
    }

    fn delete_participant(&self, participant_id: i64) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute("DELETE FROM participants WHERE id = ?1", [participant_id])?;
        tx.commit()?;
        Ok(changed > 0)
    }

    // ========== User Operations ==========

    fn create_user(&self, name: &str, password_hash: &str) -> Result<i64> {
        validate::validate_user_name(name)?;
        if password_hash.is_empty() {
            return Err(Error::Validation("password hash must not be empty".into()));
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO users (name, password_hash, created_at) VALUES (?1, ?2, ?3)",
            params![name, password_hash, Utc::now()],
        )
        .map_err(|e| map_user_insert_error(e, name))?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!(id, user = name, "created user");
        Ok(id)
    }

    fn find_user(&self, name: &str) -> Result<Option<User>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM users WHERE name = ?1", USER_COLUMNS),
                [name],
                |row| Self::row_to_user(row),
            )
            .optional()
            .map_err(Into::into)
    }

    fn update_password(&self, name: &str, password_hash: &str) -> Result<bool> {
        if password_hash.is_empty() {
            return Err(Error::Validation("password hash must not be empty".into()));
        }

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE users SET password_hash = ?1 WHERE name = ?2",
            params![password_hash, name],
        )?;
        tx.commit()?;
        Ok(changed > 0)
    }

    fn list_users(&self) -> Result<Vec<UserSummary>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM users ORDER BY name")?;

        let users = stmt
            .query_map([], |row| {
                Ok(UserSummary {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(users)
    }

    fn stats(&self) -> Result<StoreStats> {
        let mut stats = StoreStats::default();

        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM projects GROUP BY status")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (label, count) = row?;
            let count = count as usize;
            stats.projects += count;
            match label.parse::<ProjectStatus>() {
                Ok(status) => stats.record_status(status, count),
                Err(_) => warn!(status = %label, count, "projects with unknown status"),
            }
        }

        stats.stages = self.count("stages")?;
        stats.participants = self.count("participants")?;
        stats.users = self.count("users")?;
        Ok(stats)
    }
}
