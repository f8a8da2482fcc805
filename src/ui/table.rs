use crate::model::{Participant, Project, Stage, StoreStats, UserSummary};
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct ProjectRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Project")]
    name: String,
    #[tabled(rename = "Client")]
    client: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Deadline")]
    deadline: String,
    #[tabled(rename = "Budget")]
    budget: String,
    #[tabled(rename = "Progress")]
    progress: String,
}

#[derive(Tabled)]
struct StageRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Stage")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Deadline")]
    deadline: String,
    #[tabled(rename = "Responsible")]
    responsible: String,
}

#[derive(Tabled)]
struct ParticipantRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Role")]
    role: String,
    #[tabled(rename = "Stage")]
    stage: String,
    #[tabled(rename = "Deadline")]
    deadline: String,
}

#[derive(Tabled)]
struct UserRow {
    #[tabled(rename = "ID")]
    id: i64,
    #[tabled(rename = "User")]
    name: String,
    #[tabled(rename = "Created")]
    created_at: String,
}

#[derive(Tabled)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    metric: &'static str,
    #[tabled(rename = "Value")]
    value: usize,
}

fn render<T: Tabled>(rows: Vec<T>) -> String {
    if rows.is_empty() {
        return String::new();
    }
    Table::new(rows).with(Style::rounded()).to_string()
}

fn or_dash(value: &str) -> String {
    if value.is_empty() { "-".to_string() } else { value.to_string() }
}

pub fn projects_table(projects: &[Project]) -> String {
    render(
        projects
            .iter()
            .map(|p| ProjectRow {
                id: p.id,
                name: p.name.clone(),
                client: or_dash(&p.client),
                status: p.status.as_str().to_uppercase(),
                deadline: or_dash(&p.deadline),
                budget: format!("{:.2}", p.budget),
                progress: format!("{}%", p.progress()),
            })
            .collect(),
    )
}

pub fn stages_table(stages: &[Stage]) -> String {
    render(
        stages
            .iter()
            .map(|s| StageRow {
                id: s.id,
                name: s.name.clone(),
                status: s.status.as_str().to_uppercase(),
                deadline: or_dash(&s.deadline),
                responsible: or_dash(&s.responsible),
            })
            .collect(),
    )
}

pub fn participants_table(participants: &[Participant]) -> String {
    render(
        participants
            .iter()
            .map(|p| ParticipantRow {
                id: p.id,
                name: p.name.clone(),
                role: or_dash(&p.role),
                stage: or_dash(&p.stage),
                deadline: or_dash(&p.deadline),
            })
            .collect(),
    )
}

pub fn users_table(users: &[UserSummary]) -> String {
    render(
        users
            .iter()
            .map(|u| UserRow {
                id: u.id,
                name: u.name.clone(),
                created_at: u.created_at.format("%d/%m/%Y %H:%M").to_string(),
            })
            .collect(),
    )
}

pub fn stats_table(stats: &StoreStats) -> String {
    render(vec![
        MetricRow { metric: "Projects", value: stats.projects },
        MetricRow { metric: "Active", value: stats.active },
        MetricRow { metric: "Completed", value: stats.completed },
        MetricRow { metric: "Paused", value: stats.paused },
        MetricRow { metric: "Cancelled", value: stats.cancelled },
        MetricRow { metric: "Stages", value: stats.stages },
        MetricRow { metric: "Participants", value: stats.participants },
        MetricRow { metric: "Users", value: stats.users },
    ])
}
