//! ProjetoX CLI - manage projects, stages, participants and users from the shell

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use projetox::auth::{self, LoginOutcome};
use projetox::config::{self, Backend};
use projetox::{
    open_store, ui, NewParticipant, NewProject, NewStage, ParticipantUpdate, Project,
    ProjectStatus, ProjectStore, ProjectUpdate, ProjetoxConfig, StageStatus, StageUpdate,
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "projetox")]
#[command(version)]
#[command(about = "ProjetoX - project manager data store")]
#[command(long_about = r#"
ProjetoX keeps projects, their stages and participants, and login users in
either a SQLite database or a JSON document.

Example usage:
  projetox init --backend sqlite
  projetox project add "Website" --client ACME --budget 1500
  projetox stage add 1 "Design" --responsible Ana --deadline 31/12/2025
  projetox project show 1
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the config file (defaults to ./projetox.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured backend
    #[arg(short, long, global = true, value_enum)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file and create the data store
    Init {
        /// Directory for the data files
        #[arg(long, default_value = "data")]
        data_dir: String,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Manage the stages of a project
    Stage {
        #[command(subcommand)]
        command: StageCommand,
    },

    /// Manage the participants of a project
    Participant {
        #[command(subcommand)]
        command: ParticipantCommand,
    },

    /// Manage login users
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Show counts of everything in the store
    Stats,
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// Create a project
    Add {
        name: String,
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// DD-MM-YYYY or DD/MM/YYYY
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        budget: Option<f64>,
        /// ativo, concluído, pausado or cancelado (English names accepted)
        #[arg(long)]
        status: Option<String>,
    },

    /// List projects, newest first
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show a project with its stages and participants
    Show {
        id: i64,
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Change only the given fields of a project
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        client: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        budget: Option<f64>,
        #[arg(long)]
        status: Option<String>,
    },

    /// Delete a project with all its stages and participants
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum StageCommand {
    /// Add a stage to a project
    Add {
        project: i64,
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// em andamento, concluído or pausado (English names accepted)
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        responsible: Option<String>,
    },

    /// List the stages of a project
    List { project: i64 },

    /// Change only the given fields of a stage
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        responsible: Option<String>,
    },

    /// Delete a stage
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum ParticipantCommand {
    /// Add a participant to a project
    Add {
        project: i64,
        name: String,
        #[arg(long)]
        role: Option<String>,
        /// Name of the stage the participant works on
        #[arg(long)]
        stage: Option<String>,
        #[arg(long)]
        deadline: Option<String>,
    },

    /// List the participants of a project
    List { project: i64 },

    /// Change only the given fields of a participant
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        stage: Option<String>,
        #[arg(long)]
        deadline: Option<String>,
    },

    /// Remove a participant
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum UserCommand {
    /// Create a login user
    Register {
        name: String,
        #[arg(long)]
        password: String,
    },

    /// Check a user's password
    Login {
        name: String,
        #[arg(long)]
        password: String,
    },

    /// Change a user's password
    Passwd {
        name: String,
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },

    /// List users
    List,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            ui::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(config::default_config_path);
    let mut settings = ProjetoxConfig::load(&config_path)?.with_backend(cli.backend);
    tracing::debug!(?settings, "resolved configuration");

    match cli.command {
        Commands::Init { data_dir, force } => {
            settings.data_dir = Some(data_dir);
            settings.backend = Some(settings.backend());
            settings.save(&config_path, force)?;
            let store = open_store(&settings)?;

            ui::success(&format!("Wrote {}", config_path.display()));
            ui::field("Backend", &store.backend().to_string());
            let data_file = match store.backend() {
                Backend::Sqlite => settings.database_path(),
                Backend::Json => settings.documents_path(),
            };
            ui::field("Data file", &data_file.display().to_string());
        }
        Commands::Project { command } => run_project(open_store(&settings)?.as_ref(), command)?,
        Commands::Stage { command } => run_stage(open_store(&settings)?.as_ref(), command)?,
        Commands::Participant { command } => {
            run_participant(open_store(&settings)?.as_ref(), command)?
        }
        Commands::User { command } => run_user(open_store(&settings)?.as_ref(), command)?,
        Commands::Stats => {
            let store = open_store(&settings)?;
            let stats = store.stats()?;
            ui::header(&format!("ProjetoX statistics ({})", store.backend()));
            println!("{}", ui::stats_table(&stats));
        }
    }

    Ok(())
}

fn parse_project_status(status: Option<String>) -> anyhow::Result<Option<ProjectStatus>> {
    Ok(status.map(|s| s.parse()).transpose()?)
}

fn parse_stage_status(status: Option<String>) -> anyhow::Result<Option<StageStatus>> {
    Ok(status.map(|s| s.parse()).transpose()?)
}

fn report_change(changed: bool, done: &str, what: &str) {
    if changed {
        ui::success(done);
    } else {
        ui::warn(&format!("Nothing changed: {} not found or no fields given", what));
    }
}

fn print_project(project: &Project) {
    ui::header(&format!("#{} {}", project.id, project.name));
    ui::field("Client", &project.client);
    ui::field("Status", &ui::project_status(project.status));
    ui::field("Deadline", &project.deadline);
    ui::field("Budget", &format!("{:.2}", project.budget));
    ui::field("Progress", &format!("{}%", project.progress()));
    if !project.description.is_empty() {
        ui::field("Description", &project.description);
    }

    ui::section(&format!("Stages ({})", project.stages.len()));
    for (idx, stage) in project.stages.iter().enumerate() {
        println!(
            "  {}. {} [{}]",
            idx + 1,
            stage.name,
            ui::stage_status(stage.status)
        );
    }

    ui::section(&format!("Participants ({})", project.participants.len()));
    if !project.participants.is_empty() {
        println!("{}", ui::participants_table(&project.participants));
    }
}

fn run_project(store: &dyn ProjectStore, command: ProjectCommand) -> anyhow::Result<()> {
    match command {
        ProjectCommand::Add { name, client, description, deadline, budget, status } => {
            let project = NewProject {
                name,
                client,
                description,
                deadline,
                budget,
                status: parse_project_status(status)?,
            };
            let id = store.create_project(&project)?;
            ui::success(&format!("Created project #{} {}", id, project.name));
        }

        ProjectCommand::List { format } => {
            let projects = store.list_projects()?;
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&projects)?);
            } else if projects.is_empty() {
                println!("∅ No projects yet.");
            } else {
                println!("{}", ui::projects_table(&projects));
            }
        }

        ProjectCommand::Show { id, format } => {
            let Some(project) = store.get_project_with_children(id)? else {
                anyhow::bail!("project #{} not found", id);
            };
            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&project)?);
            } else {
                print_project(&project);
            }
        }

        ProjectCommand::Update { id, name, client, description, deadline, budget, status } => {
            let update = ProjectUpdate {
                name,
                client,
                description,
                deadline,
                budget,
                status: parse_project_status(status)?,
            };
            let changed = store.update_project(id, &update)?;
            report_change(changed, &format!("Updated project #{}", id), "project");
        }

        ProjectCommand::Delete { id } => {
            let changed = store.delete_project(id)?;
            report_change(changed, &format!("Deleted project #{} and its children", id), "project");
        }
    }
    Ok(())
}

fn run_stage(store: &dyn ProjectStore, command: StageCommand) -> anyhow::Result<()> {
    match command {
        StageCommand::Add { project, name, description, status, deadline, responsible } => {
            let stage = NewStage {
                name,
                description,
                status: parse_stage_status(status)?,
                deadline,
                responsible,
            };
            let id = store.create_stage(project, &stage)?;
            ui::success(&format!("Added stage #{} to project #{}", id, project));
        }

        StageCommand::List { project } => {
            let stages = store.list_stages(project)?;
            if stages.is_empty() {
                println!("∅ No stages.");
            } else {
                println!("{}", ui::stages_table(&stages));
            }
        }

        StageCommand::Update { id, name, description, status, deadline, responsible } => {
            let update = StageUpdate {
                name,
                description,
                status: parse_stage_status(status)?,
                deadline,
                responsible,
            };
            let changed = store.update_stage(id, &update)?;
            report_change(changed, &format!("Updated stage #{}", id), "stage");
        }

        StageCommand::Delete { id } => {
            let changed = store.delete_stage(id)?;
            report_change(changed, &format!("Deleted stage #{}", id), "stage");
        }
    }
    Ok(())
}

fn run_participant(store: &dyn ProjectStore, command: ParticipantCommand) -> anyhow::Result<()> {
    match command {
        ParticipantCommand::Add { project, name, role, stage, deadline } => {
            let participant = NewParticipant { name, role, stage, deadline };
            let id = store.create_participant(project, &participant)?;
            ui::success(&format!("Added participant #{} to project #{}", id, project));
        }

        ParticipantCommand::List { project } => {
            let participants = store.list_participants(project)?;
            if participants.is_empty() {
                println!("∅ No participants.");
            } else {
                println!("{}", ui::participants_table(&participants));
            }
        }

        ParticipantCommand::Update { id, name, role, stage, deadline } => {
            let update = ParticipantUpdate { name, role, stage, deadline };
            let changed = store.update_participant(id, &update)?;
            report_change(changed, &format!("Updated participant #{}", id), "participant");
        }

        ParticipantCommand::Delete { id } => {
            let changed = store.delete_participant(id)?;
            report_change(changed, &format!("Removed participant #{}", id), "participant");
        }
    }
    Ok(())
}

fn run_user(store: &dyn ProjectStore, command: UserCommand) -> anyhow::Result<()> {
    match command {
        UserCommand::Register { name, password } => {
            let id = auth::register(store, &name, &password)?;
            ui::success(&format!("Registered user #{} {}", id, name.trim()));
        }

        UserCommand::Login { name, password } => match auth::login(store, &name, &password)? {
            LoginOutcome::Authenticated(user) => ui::success(&format!("Welcome, {}!", user.name)),
            LoginOutcome::UnknownUser => anyhow::bail!("user {} not found", name.trim()),
            LoginOutcome::WrongPassword => anyhow::bail!("wrong password for {}", name.trim()),
        },

        UserCommand::Passwd { name, current, new } => {
            if auth::change_password(store, &name, &current, &new)? {
                ui::success("Password changed");
            } else {
                anyhow::bail!("unknown user or wrong current password");
            }
        }

        UserCommand::List => {
            let users = store.list_users()?;
            if users.is_empty() {
                println!("∅ No users.");
            } else {
                println!("{}", ui::users_table(&users));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use projetox::SqliteStore;

    #[test]
    fn test_failed_login_is_an_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        auth::register(&store, "alice", "secret").unwrap();

        let wrong = UserCommand::Login { name: "alice".into(), password: "nope".into() };
        let err = run_user(&store, wrong).unwrap_err();
        assert!(err.to_string().contains("wrong password"));

        let unknown = UserCommand::Login { name: "bob".into(), password: "secret".into() };
        assert!(run_user(&store, unknown).is_err());

        let ok = UserCommand::Login { name: "alice".into(), password: "secret".into() };
        assert!(run_user(&store, ok).is_ok());
    }

    #[test]
    fn test_rejected_password_change_is_an_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        auth::register(&store, "alice", "secret").unwrap();

        let command = UserCommand::Passwd {
            name: "alice".into(),
            current: "wrong".into(),
            new: "changed".into(),
        };
        assert!(run_user(&store, command).is_err());
    }

    #[test]
    fn test_show_missing_project_is_an_error() {
        let store = SqliteStore::open_in_memory().unwrap();
        let command = ProjectCommand::Show { id: 42, format: "table".into() };
        let err = run_project(&store, command).unwrap_err();
        assert!(err.to_string().contains("#42"));
    }
}
