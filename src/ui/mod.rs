//! Terminal output for the `projetox` binary

pub mod table;

pub use table::{participants_table, projects_table, stages_table, stats_table, users_table};

use crate::model::{ProjectStatus, StageStatus};
use owo_colors::{OwoColorize, Style};
use std::sync::OnceLock;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub dim: Style,
    pub done: Style,
    pub halted: Style,
}

impl Theme {
    /// Colored output on a terminal, plain text when piped
    pub fn detect() -> Self {
        if !console::Term::stdout().is_term() {
            return Self::plain();
        }
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warn: Style::new().yellow().bold(),
            dim: Style::new().bright_black(),
            done: Style::new().green(),
            halted: Style::new().yellow(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            error: Style::new(),
            warn: Style::new(),
            dim: Style::new(),
            done: Style::new(),
            halted: Style::new(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}

pub fn header(text: &str) {
    println!("📁 {}", text.style(theme().header.clone()));
}

pub fn success(label: &str) {
    println!("✅ {}", label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("❌ {}", label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("⚠️  {}", label.style(theme().warn.clone()));
}

pub fn field(label: &str, value: &str) {
    println!("  {} {}", format!("{}:", label).style(theme().dim.clone()), value);
}

pub fn section(title: &str) {
    println!();
    println!("━ {} ━", title.style(theme().header.clone()));
}

pub fn project_status(status: ProjectStatus) -> String {
    let label = status.as_str().to_uppercase();
    match status {
        ProjectStatus::Active => label,
        ProjectStatus::Completed => label.style(theme().done.clone()).to_string(),
        ProjectStatus::Paused => label.style(theme().halted.clone()).to_string(),
        ProjectStatus::Cancelled => label.style(theme().error.clone()).to_string(),
    }
}

pub fn stage_status(status: StageStatus) -> String {
    let label = status.as_str().to_uppercase();
    match status {
        StageStatus::InProgress => label,
        StageStatus::Completed => label.style(theme().done.clone()).to_string(),
        StageStatus::Paused => label.style(theme().halted.clone()).to_string(),
    }
}
