//! Domain types - projects, stages, participants and users
//!
//! Four record types make up the store:
//! - `Project`: top-level work item, owns stages and participants
//! - `Stage`: a phase or milestone within a project ("etapa")
//! - `Participant`: a person on a project, optionally tied to a stage by name
//! - `User`: a login account holding a password hash
//!
//! Creation goes through `New*` inputs and partial updates through `*Update`
//! builders, where every field is independently optional.

use crate::validate;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle status of a project.
///
/// Persisted with the labels the ProjetoX data files have always used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[default]
    #[serde(rename = "ativo", alias = "active")]
    Active,
    #[serde(rename = "concluído", alias = "concluido", alias = "completed")]
    Completed,
    #[serde(rename = "pausado", alias = "paused")]
    Paused,
    #[serde(rename = "cancelado", alias = "cancelled", alias = "canceled")]
    Cancelled,
}

impl ProjectStatus {
    /// Get the persisted label
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "ativo",
            ProjectStatus::Completed => "concluído",
            ProjectStatus::Paused => "pausado",
            ProjectStatus::Cancelled => "cancelado",
        }
    }

    /// Get all project statuses
    pub fn all() -> &'static [ProjectStatus] {
        &[
            ProjectStatus::Active,
            ProjectStatus::Completed,
            ProjectStatus::Paused,
            ProjectStatus::Cancelled,
        ]
    }
}

impl FromStr for ProjectStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ativo" | "active" => Ok(ProjectStatus::Active),
            "concluído" | "concluido" | "completed" | "done" => Ok(ProjectStatus::Completed),
            "pausado" | "paused" => Ok(ProjectStatus::Paused),
            "cancelado" | "cancelled" | "canceled" => Ok(ProjectStatus::Cancelled),
            _ => Err(Error::Validation(format!("Unknown project status: {}", s))),
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single stage.
///
/// Older documents also carry "pendente", which has no state of its own and
/// reads as in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StageStatus {
    #[default]
    #[serde(
        rename = "em andamento",
        alias = "in-progress",
        alias = "in progress",
        alias = "pendente",
        alias = "pending"
    )]
    InProgress,
    #[serde(rename = "concluído", alias = "concluido", alias = "completed")]
    Completed,
    #[serde(rename = "pausado", alias = "paused")]
    Paused,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::InProgress => "em andamento",
            StageStatus::Completed => "concluído",
            StageStatus::Paused => "pausado",
        }
    }
}

impl FromStr for StageStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "em andamento" | "in-progress" | "in progress" | "in_progress" | "pendente"
            | "pending" => Ok(StageStatus::InProgress),
            "concluído" | "concluido" | "completed" | "done" => Ok(StageStatus::Completed),
            "pausado" | "paused" => Ok(StageStatus::Paused),
            _ => Err(Error::Validation(format!("Unknown stage status: {}", s))),
        }
    }
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A project record.
///
/// `stages` and `participants` are only populated by the "with children"
/// reads; a base read leaves them empty. Legacy document keys (`nome`,
/// `cliente`, ...) are accepted on input.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub id: i64,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "cliente")]
    pub client: String,
    #[serde(alias = "descricao")]
    pub description: String,
    /// Free-text date, `DD-MM-YYYY` or `DD/MM/YYYY` when set
    #[serde(alias = "prazo")]
    pub deadline: String,
    #[serde(alias = "orcamento")]
    pub budget: f64,
    pub status: ProjectStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(alias = "etapas")]
    pub stages: Vec<Stage>,
    #[serde(alias = "pessoas", alias = "participantes")]
    pub participants: Vec<Participant>,
}

impl Project {
    /// Percentage of completed stages, truncated; 0 for a project without stages
    pub fn progress(&self) -> u8 {
        if self.stages.is_empty() {
            return 0;
        }
        let done = self
            .stages
            .iter()
            .filter(|s| s.status == StageStatus::Completed)
            .count();
        (done * 100 / self.stages.len()) as u8
    }

    /// The base record, without children
    pub fn without_children(&self) -> Project {
        Project {
            stages: Vec::new(),
            participants: Vec::new(),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage {
    pub id: i64,
    pub project_id: i64,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "descricao")]
    pub description: String,
    pub status: StageStatus,
    #[serde(alias = "prazo")]
    pub deadline: String,
    /// Name of the person in charge
    #[serde(alias = "responsavel")]
    pub responsible: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Participant {
    pub id: i64,
    pub project_id: i64,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "cargo")]
    pub role: String,
    /// Stage name as typed by the user; not a reference to a `Stage` row
    #[serde(alias = "etapa")]
    pub stage: String,
    #[serde(alias = "prazo")]
    pub deadline: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: i64,
    #[serde(alias = "nome")]
    pub name: String,
    #[serde(alias = "senha_hash")]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A user as listed to callers: never carries the password hash
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            created_at: user.created_at,
        }
    }
}

// ========== Creation inputs ==========

/// Input for creating a project. Omitted fields take their defaults:
/// empty text, budget 0, status active.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewProject {
    pub name: String,
    pub client: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<String>,
    pub budget: Option<f64>,
    pub status: Option<ProjectStatus>,
}

impl NewProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_deadline(mut self, deadline: impl Into<String>) -> Self {
        self.deadline = Some(deadline.into());
        self
    }

    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate::validate_name("project name", &self.name)?;
        if let Some(deadline) = &self.deadline {
            validate::validate_deadline(deadline)?;
        }
        if let Some(budget) = self.budget {
            validate::validate_budget(budget)?;
        }
        Ok(())
    }

    /// Materialize the record with defaults applied
    pub fn build(&self, id: i64, now: DateTime<Utc>) -> Project {
        Project {
            id,
            name: self.name.clone(),
            client: self.client.clone().unwrap_or_default(),
            description: self.description.clone().unwrap_or_default(),
            deadline: self.deadline.clone().unwrap_or_default(),
            budget: self.budget.unwrap_or(0.0),
            status: self.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
            stages: Vec::new(),
            participants: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewStage {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<StageStatus>,
    pub deadline: Option<String>,
    pub responsible: Option<String>,
}

impl NewStage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: StageStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_deadline(mut self, deadline: impl Into<String>) -> Self {
        self.deadline = Some(deadline.into());
        self
    }

    pub fn with_responsible(mut self, responsible: impl Into<String>) -> Self {
        self.responsible = Some(responsible.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate::validate_name("stage name", &self.name)?;
        if let Some(deadline) = &self.deadline {
            validate::validate_deadline(deadline)?;
        }
        Ok(())
    }

    pub fn build(&self, id: i64, project_id: i64, now: DateTime<Utc>) -> Stage {
        Stage {
            id,
            project_id,
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            deadline: self.deadline.clone().unwrap_or_default(),
            responsible: self.responsible.clone().unwrap_or_default(),
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewParticipant {
    pub name: String,
    pub role: Option<String>,
    pub stage: Option<String>,
    pub deadline: Option<String>,
}

impl NewParticipant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_deadline(mut self, deadline: impl Into<String>) -> Self {
        self.deadline = Some(deadline.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate::validate_name("participant name", &self.name)?;
        if let Some(deadline) = &self.deadline {
            validate::validate_deadline(deadline)?;
        }
        Ok(())
    }

    pub fn build(&self, id: i64, project_id: i64, now: DateTime<Utc>) -> Participant {
        Participant {
            id,
            project_id,
            name: self.name.clone(),
            role: self.role.clone().unwrap_or_default(),
            stage: self.stage.clone().unwrap_or_default(),
            deadline: self.deadline.clone().unwrap_or_default(),
            created_at: now,
        }
    }
}

// ========== Partial updates ==========

/// Sparse set of project fields to change. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub client: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<String>,
    pub budget: Option<f64>,
    pub status: Option<ProjectStatus>,
}

impl ProjectUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_client(mut self, client: impl Into<String>) -> Self {
        self.client = Some(client.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_deadline(mut self, deadline: impl Into<String>) -> Self {
        self.deadline = Some(deadline.into());
        self
    }

    pub fn with_budget(mut self, budget: f64) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn with_status(mut self, status: ProjectStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.client.is_none()
            && self.description.is_none()
            && self.deadline.is_none()
            && self.budget.is_none()
            && self.status.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate::validate_name("project name", name)?;
        }
        if let Some(deadline) = &self.deadline {
            validate::validate_deadline(deadline)?;
        }
        if let Some(budget) = self.budget {
            validate::validate_budget(budget)?;
        }
        Ok(())
    }

    /// Copy the present fields onto `project`. Does not touch `updated_at`.
    pub fn apply_to(&self, project: &mut Project) {
        if let Some(name) = &self.name {
            project.name = name.clone();
        }
        if let Some(client) = &self.client {
            project.client = client.clone();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
        if let Some(deadline) = &self.deadline {
            project.deadline = deadline.clone();
        }
        if let Some(budget) = self.budget {
            project.budget = budget;
        }
        if let Some(status) = self.status {
            project.status = status;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<StageStatus>,
    pub deadline: Option<String>,
    pub responsible: Option<String>,
}

impl StageUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: StageStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_deadline(mut self, deadline: impl Into<String>) -> Self {
        self.deadline = Some(deadline.into());
        self
    }

    pub fn with_responsible(mut self, responsible: impl Into<String>) -> Self {
        self.responsible = Some(responsible.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.deadline.is_none()
            && self.responsible.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate::validate_name("stage name", name)?;
        }
        if let Some(deadline) = &self.deadline {
            validate::validate_deadline(deadline)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, stage: &mut Stage) {
        if let Some(name) = &self.name {
            stage.name = name.clone();
        }
        if let Some(description) = &self.description {
            stage.description = description.clone();
        }
        if let Some(status) = self.status {
            stage.status = status;
        }
        if let Some(deadline) = &self.deadline {
            stage.deadline = deadline.clone();
        }
        if let Some(responsible) = &self.responsible {
            stage.responsible = responsible.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParticipantUpdate {
    pub name: Option<String>,
    pub role: Option<String>,
    pub stage: Option<String>,
    pub deadline: Option<String>,
}

impl ParticipantUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_deadline(mut self, deadline: impl Into<String>) -> Self {
        self.deadline = Some(deadline.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.role.is_none() && self.stage.is_none() && self.deadline.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate::validate_name("participant name", name)?;
        }
        if let Some(deadline) = &self.deadline {
            validate::validate_deadline(deadline)?;
        }
        Ok(())
    }

    pub fn apply_to(&self, participant: &mut Participant) {
        if let Some(name) = &self.name {
            participant.name = name.clone();
        }
        if let Some(role) = &self.role {
            participant.role = role.clone();
        }
        if let Some(stage) = &self.stage {
            participant.stage = stage.clone();
        }
        if let Some(deadline) = &self.deadline {
            participant.deadline = deadline.clone();
        }
    }
}

// ========== Statistics ==========

/// Store-wide counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub projects: usize,
    pub active: usize,
    pub completed: usize,
    pub paused: usize,
    pub cancelled: usize,
    pub stages: usize,
    pub participants: usize,
    pub users: usize,
}

impl StoreStats {
    /// Tally statistics from fully-populated project records
    pub fn from_projects(projects: &[Project], users: usize) -> Self {
        let mut stats = StoreStats {
            projects: projects.len(),
            users,
            ..Default::default()
        };
        for project in projects {
            stats.record_status(project.status, 1);
            stats.stages += project.stages.len();
            stats.participants += project.participants.len();
        }
        stats
    }

    pub(crate) fn record_status(&mut self, status: ProjectStatus, count: usize) {
        match status {
            ProjectStatus::Active => self.active += count,
            ProjectStatus::Completed => self.completed += count,
            ProjectStatus::Paused => self.paused += count,
            ProjectStatus::Cancelled => self.cancelled += count,
        }
    }
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Store Statistics:")?;
        writeln!(f, "  Projects: {}", self.projects)?;
        writeln!(f, "    Active: {}", self.active)?;
        writeln!(f, "    Completed: {}", self.completed)?;
        writeln!(f, "    Paused: {}", self.paused)?;
        writeln!(f, "    Cancelled: {}", self.cancelled)?;
        writeln!(f, "  Stages: {}", self.stages)?;
        writeln!(f, "  Participants: {}", self.participants)?;
        writeln!(f, "  Users: {}", self.users)
    }
}
