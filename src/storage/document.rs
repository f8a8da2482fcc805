//! JSON document storage implementation
//!
//! The whole store is one document:
//!
//! ```json
//! { "projects": [ { ..., "stages": [...], "participants": [...] } ], "users": [...] }
//! ```
//!
//! Every write loads the document, changes it in memory and rewrites the
//! file through a temporary sibling that is renamed into place, so a failed
//! write never leaves a half-written document behind.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::config::{self, Backend};
use crate::model::{
    NewParticipant, NewProject, NewStage, Participant, ParticipantUpdate, Project, ProjectUpdate,
    Stage, StageUpdate, StoreStats, User, UserSummary,
};
use crate::{validate, Error, Result};
use super::ProjectStore;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default, alias = "projetos")]
    projects: Vec<Project>,
    #[serde(default, alias = "usuarios")]
    users: Vec<User>,
}

impl Document {
    fn project(&self, id: i64) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    fn project_mut(&mut self, id: i64) -> Option<&mut Project> {
        self.projects.iter_mut().find(|p| p.id == id)
    }

    fn stage_mut(&mut self, stage_id: i64) -> Option<&mut Stage> {
        self.projects
            .iter_mut()
            .flat_map(|p| p.stages.iter_mut())
            .find(|s| s.id == stage_id)
    }

    fn participant_mut(&mut self, participant_id: i64) -> Option<&mut Participant> {
        self.projects
            .iter_mut()
            .flat_map(|p| p.participants.iter_mut())
            .find(|p| p.id == participant_id)
    }

    fn next_project_id(&self) -> i64 {
        self.projects.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    /// Stage ids are unique across the whole document, not per project
    fn next_stage_id(&self) -> i64 {
        self.projects
            .iter()
            .flat_map(|p| p.stages.iter().map(|s| s.id))
            .max()
            .unwrap_or(0)
            + 1
    }

    fn next_participant_id(&self) -> i64 {
        self.projects
            .iter()
            .flat_map(|p| p.participants.iter().map(|p| p.id))
            .max()
            .unwrap_or(0)
            + 1
    }

    fn next_user_id(&self) -> i64 {
        self.users.iter().map(|u| u.id).max().unwrap_or(0) + 1
    }

    /// Give id-less records a fresh id and point every child at the project
    /// holding it. Documents written by older releases store stages and
    /// participants without either. Returns whether anything changed.
    fn normalize(&mut self) -> bool {
        let mut changed = false;
        let mut next_project = self.next_project_id();
        let mut next_stage = self.next_stage_id();
        let mut next_participant = self.next_participant_id();
        let mut next_user = self.next_user_id();

        for project in &mut self.projects {
            if project.id == 0 {
                project.id = next_project;
                next_project += 1;
                changed = true;
            }
            for stage in &mut project.stages {
                if stage.id == 0 {
                    stage.id = next_stage;
                    next_stage += 1;
                    changed = true;
                }
                if stage.project_id != project.id {
                    stage.project_id = project.id;
                    changed = true;
                }
            }
            for participant in &mut project.participants {
                if participant.id == 0 {
                    participant.id = next_participant;
                    next_participant += 1;
                    changed = true;
                }
                if participant.project_id != project.id {
                    participant.project_id = project.id;
                    changed = true;
                }
            }
        }

        for user in &mut self.users {
            if user.id == 0 {
                user.id = next_user;
                next_user += 1;
                changed = true;
            }
        }
        changed
    }

    fn missing_project(project_id: i64) -> Error {
        warn!(project_id, "rejected write for missing project");
        Error::Validation(format!("project {} does not exist", project_id))
    }
}

/// Project store kept in a single JSON file
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    /// Open a document file, creating an empty one if it doesn't exist.
    ///
    /// An existing file must parse; a malformed document is an error rather
    /// than being replaced. Ids assigned to legacy records are written back
    /// right away so they stay stable.
    pub fn open(path: &Path) -> Result<Self> {
        config::ensure_parent_dir(path)?;
        let store = Self { path: path.to_path_buf() };

        if path.exists() {
            let mut doc = store.read()?;
            if doc.normalize() {
                store.save(&doc)?;
                info!("Assigned ids to legacy records in {}", path.display());
            }
        } else {
            store.save(&Document::default())?;
            info!("Created empty project document at {}", path.display());
        }
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Document> {
        let mut doc = self.read()?;
        if doc.normalize() {
            debug!("normalized legacy records in {}", self.path.display());
        }
        Ok(doc)
    }

    fn read(&self) -> Result<Document> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(Document::default()),
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Document::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, doc: &Document) -> Result<()> {
        let contents = serde_json::to_string_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl ProjectStore for JsonStore {
    fn backend(&self) -> Backend {
        Backend::Json
    }

    // ========== Project Operations ==========

    fn create_project(&self, project: &NewProject) -> Result<i64> {
        project.validate()?;

        let mut doc = self.load()?;
        let id = doc.next_project_id();
        doc.projects.push(project.build(id, Utc::now()));
        self.save(&doc)?;

        debug!(id, name = %project.name, "created project");
        Ok(id)
    }

    fn get_project(&self, id: i64) -> Result<Option<Project>> {
        Ok(self.load()?.project(id).map(Project::without_children))
    }

    fn get_project_with_children(&self, id: i64) -> Result<Option<Project>> {
        Ok(self.load()?.project(id).cloned())
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let mut projects = self.load()?.projects;
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(projects)
    }

    fn update_project(&self, id: i64, update: &ProjectUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }
        update.validate()?;

        let mut doc = self.load()?;
        let Some(project) = doc.project_mut(id) else {
            return Ok(false);
        };
        update.apply_to(project);
        project.updated_at = Utc::now();
        self.save(&doc)?;

        debug!(id, "updated project");
        Ok(true)
    }

    fn delete_project(&self, id: i64) -> Result<bool> {
        let mut doc = self.load()?;
        let before = doc.projects.len();
        doc.projects.retain(|p| p.id != id);
        if doc.projects.len() == before {
            return Ok(false);
        }
        self.save(&doc)?;

        debug!(id, "deleted project");
        Ok(true)
    }

    // ========== Stage Operations ==========

    fn create_stage(&self, project_id: i64, stage: &NewStage) -> Result<i64> {
        stage.validate()?;

        let mut doc = self.load()?;
        let id = doc.next_stage_id();
        let project = doc
            .project_mut(project_id)
            .ok_or_else(|| Document::missing_project(project_id))?;
        project.stages.push(stage.build(id, project_id, Utc::now()));
        self.save(&doc)?;

        debug!(id, project_id, "created stage");
        Ok(id)
    }

    fn list_stages(&self, project_id: i64) -> Result<Vec<Stage>> {
        Ok(self
            .load()?
            .project(project_id)
            .map(|p| p.stages.clone())
            .unwrap_or_default())
    }

    fn update_stage(&self, stage_id: i64, update: &StageUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }
        update.validate()?;

        let mut doc = self.load()?;
        let Some(stage) = doc.stage_mut(stage_id) else {
            return Ok(false);
        };
        update.apply_to(stage);
        self.save(&doc)?;
        Ok(true)
    }

    fn delete_stage(&self, stage_id: i64) -> Result<bool> {
        let mut doc = self.load()?;
        for project in &mut doc.projects {
            if let Some(pos) = project.stages.iter().position(|s| s.id == stage_id) {
                project.stages.remove(pos);
                self.save(&doc)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    // ========== Participant Operations ==========

    fn create_participant(&self, project_id: i64, participant: &NewParticipant) -> Result<i64> {
        participant.validate()?;

        let mut doc = self.load()?;
        let id = doc.next_participant_id();
        let project = doc
            .project_mut(project_id)
            .ok_or_else(|| Document::missing_project(project_id))?;
        project
            .participants
            .push(participant.build(id, project_id, Utc::now()));
        self.save(&doc)?;

        debug!(id, project_id, "created participant");
        Ok(id)
    }

    fn list_participants(&self, project_id: i64) -> Result<Vec<Participant>> {
        Ok(self
            .load()?
            .project(project_id)
            .map(|p| p.participants.clone())
            .unwrap_or_default())
    }

    fn find_participant_by_name(&self, project_id: i64, name: &str) -> Result<Option<Participant>> {
        Ok(self
            .load()?
            .project(project_id)
            .and_then(|p| p.participants.iter().find(|pa| pa.name == name).cloned()))
    }

    fn update_participant(&self, participant_id: i64, update: &ParticipantUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }
        update.validate()?;

        let mut doc = self.load()?;
        let Some(participant) = doc.participant_mut(participant_id) else {
            return Ok(false);
        };
        update.apply_to(participant);
        self.save(&doc)?;
        Ok(true)
    }

    fn delete_participant(&self, participant_id: i64) -> Result<bool> {
        let mut doc = self.load()?;
        for project in &mut doc.projects {
            if let Some(pos) = project.participants.iter().position(|p| p.id == participant_id) {
                project.participants.remove(pos);
                self.save(&doc)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    // ========== User Operations ==========

    fn create_user(&self, name: &str, password_hash: &str) -> Result<i64> {
        validate::validate_user_name(name)?;
        if password_hash.is_empty() {
            return Err(Error::Validation("password hash must not be empty".into()));
        }

        let mut doc = self.load()?;
        if doc.users.iter().any(|u| u.name == name) {
            return Err(Error::UniqueConstraint(name.to_string()));
        }
        let id = doc.next_user_id();
        doc.users.push(User {
            id,
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        });
        self.save(&doc)?;

        debug!(id, user = name, "created user");
        Ok(id)
    }

    fn find_user(&self, name: &str) -> Result<Option<User>> {
        Ok(self.load()?.users.into_iter().find(|u| u.name == name))
    }

    fn update_password(&self, name: &str, password_hash: &str) -> Result<bool> {
        if password_hash.is_empty() {
            return Err(Error::Validation("password hash must not be empty".into()));
        }

        let mut doc = self.load()?;
        let Some(user) = doc.users.iter_mut().find(|u| u.name == name) else {
            return Ok(false);
        };
        user.password_hash = password_hash.to_string();
        self.save(&doc)?;
        Ok(true)
    }

    fn list_users(&self) -> Result<Vec<UserSummary>> {
        let doc = self.load()?;
        let mut users: Vec<UserSummary> = doc.users.iter().map(UserSummary::from).collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    fn stats(&self) -> Result<StoreStats> {
        let doc = self.load()?;
        Ok(StoreStats::from_projects(&doc.projects, doc.users.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ProjectStatus, StageStatus};

    #[test]
    fn test_open_creates_empty_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("dados_projetos.json");

        let store = JsonStore::open(&path).unwrap();
        assert!(path.exists());
        assert!(store.list_projects().unwrap().is_empty());

        let contents = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert!(value["projects"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_document_is_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dados_projetos.json");
        fs::write(&path, "{ not json").unwrap();

        let err = JsonStore::open(&path).err().unwrap();
        assert!(matches!(err, Error::Document(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    /// Records as the desktop app's document mode writes them: no stage or
    /// participant ids, no project links, participants under "pessoas"
    const LEGACY_DOCUMENT: &str = r#"{
        "projetos": [
            {
                "id": 4,
                "nome": "Reforma",
                "descricao": "Casa da praia",
                "pessoas": [
                    {"nome": "Joao", "cargo": "Pedreiro", "etapa": "Obra", "prazo": "10-12-2024"},
                    {"nome": "Lia", "cargo": "Arquiteta", "etapa": "", "prazo": ""}
                ],
                "etapas": [
                    {"nome": "Obra", "status": "pendente", "prazo": "10-12-2024", "responsavel": "Joao"},
                    {"nome": "Pintura", "status": "concluído", "prazo": "", "responsavel": "Lia"}
                ]
            },
            {"id": 7, "nome": "Jardim", "descricao": "", "pessoas": [], "etapas": []}
        ]
    }"#;

    #[test]
    fn test_reads_legacy_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dados_projetos.json");
        fs::write(&path, LEGACY_DOCUMENT).unwrap();

        let store = JsonStore::open(&path).unwrap();
        let project = store.get_project_with_children(4).unwrap().unwrap();
        assert_eq!(project.name, "Reforma");
        assert_eq!(project.status, ProjectStatus::Active);
        assert_eq!(project.stages.len(), 2);
        assert_eq!(project.stages[0].status, StageStatus::InProgress);
        assert_eq!(project.participants.len(), 2);
        assert_eq!(project.participants[0].role, "Pedreiro");
        assert_eq!(project.progress(), 50);

        let id = store.create_project(&NewProject::new("Novo")).unwrap();
        assert_eq!(id, 8);
    }

    #[test]
    fn test_legacy_participants_survive_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dados_projetos.json");
        fs::write(&path, LEGACY_DOCUMENT).unwrap();

        let store = JsonStore::open(&path).unwrap();
        store.create_project(&NewProject::new("Outro")).unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("Joao"));

        let reopened = JsonStore::open(&path).unwrap();
        let names: Vec<String> = reopened
            .list_participants(4)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["Joao", "Lia"]);
    }

    #[test]
    fn test_legacy_children_get_ids_and_links() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dados_projetos.json");
        fs::write(&path, LEGACY_DOCUMENT).unwrap();

        let store = JsonStore::open(&path).unwrap();
        let stages = store.list_stages(4).unwrap();
        let ids: Vec<i64> = stages.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(stages.iter().all(|s| s.project_id == 4));
        assert!(store.list_participants(4).unwrap().iter().all(|p| p.id > 0 && p.project_id == 4));

        // ids are written back on open, so a second open sees the same ones
        let reopened = JsonStore::open(&path).unwrap();
        assert_eq!(reopened.list_stages(4).unwrap(), stages);

        assert!(!store.delete_stage(0).unwrap());
        assert!(store.delete_stage(1).unwrap());
        let left: Vec<(String, i64)> = store
            .list_stages(4)
            .unwrap()
            .into_iter()
            .map(|s| (s.name, s.id))
            .collect();
        assert_eq!(left, vec![("Pintura".to_string(), 2)]);
        assert!(store.update_stage(2, &StageUpdate::default().with_name("Acabamento")).unwrap());

        let next = store.create_stage(7, &NewStage::new("Plantio")).unwrap();
        assert_eq!(next, 3);
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dados_projetos.json");

        let store = JsonStore::open(&path).unwrap();
        store.create_project(&NewProject::new("Website")).unwrap();

        assert!(!path.with_extension("json.tmp").exists());
        let reopened = JsonStore::open(store.path()).unwrap();
        assert_eq!(reopened.list_projects().unwrap().len(), 1);
    }

    #[test]
    fn test_child_ids_unique_across_projects() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(&dir.path().join("doc.json")).unwrap();

        let a = store.create_project(&NewProject::new("Alpha")).unwrap();
        let b = store.create_project(&NewProject::new("Beta")).unwrap();
        let s1 = store.create_stage(a, &NewStage::new("Design")).unwrap();
        let s2 = store.create_stage(b, &NewStage::new("Design")).unwrap();
        assert_ne!(s1, s2);

        assert!(store.delete_stage(s2).unwrap());
        assert_eq!(store.list_stages(a).unwrap().len(), 1);
        assert!(store.list_stages(b).unwrap().is_empty());
    }
}
