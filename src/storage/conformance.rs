//! Behaviour every `ProjectStore` backend must share.
//!
//! Each check takes a fresh store; `backend_tests!` runs the whole set
//! against one backend.

use super::{JsonStore, ProjectStore, SqliteStore};
use crate::auth::hash_password;
use crate::model::{
    NewParticipant, NewProject, NewStage, ParticipantUpdate, ProjectStatus, ProjectUpdate,
    StageStatus, StageUpdate,
};
use crate::Error;

fn create_then_get_applies_defaults(store: &dyn ProjectStore) {
    let id = store
        .create_project(
            &NewProject::new("Website")
                .with_client("ACME")
                .with_deadline("31/12/2024"),
        )
        .unwrap();

    let project = store.get_project(id).unwrap().unwrap();
    assert_eq!(project.id, id);
    assert_eq!(project.name, "Website");
    assert_eq!(project.client, "ACME");
    assert_eq!(project.deadline, "31/12/2024");
    assert_eq!(project.description, "");
    assert_eq!(project.budget, 0.0);
    assert_eq!(project.status, ProjectStatus::Active);
    assert_eq!(project.created_at, project.updated_at);
}

fn create_then_get_keeps_every_field(store: &dyn ProjectStore) {
    let id = store
        .create_project(
            &NewProject::new("Reforma")
                .with_client("Maria")
                .with_description("Cozinha e banheiro")
                .with_deadline("01-03-2025")
                .with_budget(12500.75)
                .with_status(ProjectStatus::Paused),
        )
        .unwrap();

    let project = store.get_project(id).unwrap().unwrap();
    assert_eq!(project.description, "Cozinha e banheiro");
    assert_eq!(project.budget, 12500.75);
    assert_eq!(project.status, ProjectStatus::Paused);
}

fn missing_records_are_absent(store: &dyn ProjectStore) {
    assert!(store.get_project(99).unwrap().is_none());
    assert!(store.get_project_with_children(99).unwrap().is_none());
    assert!(store.list_stages(99).unwrap().is_empty());
    assert!(store.list_participants(99).unwrap().is_empty());
    assert!(store.find_user("ghost").unwrap().is_none());
    assert!(!store.update_project(99, &ProjectUpdate::new().with_name("X1")).unwrap());
    assert!(!store.delete_project(99).unwrap());
    assert!(!store.delete_stage(99).unwrap());
    assert!(!store.delete_participant(99).unwrap());
    assert!(!store.update_password("ghost", &hash_password("x")).unwrap());
}

fn invalid_input_is_rejected(store: &dyn ProjectStore) {
    assert!(matches!(
        store.create_project(&NewProject::new("  ")),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        store.create_project(&NewProject::new("Website").with_deadline("2024-12-31")),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        store.create_project(&NewProject::new("Website").with_budget(-10.0)),
        Err(Error::Validation(_))
    ));
    assert!(store.list_projects().unwrap().is_empty());

    let id = store.create_project(&NewProject::new("Website")).unwrap();
    assert!(matches!(
        store.update_project(id, &ProjectUpdate::new().with_name("")),
        Err(Error::Validation(_))
    ));
    assert_eq!(store.get_project(id).unwrap().unwrap().name, "Website");
}

fn empty_update_is_a_no_op(store: &dyn ProjectStore) {
    let id = store
        .create_project(&NewProject::new("Website").with_budget(100.0))
        .unwrap();
    let before = store.get_project(id).unwrap().unwrap();

    assert!(!store.update_project(id, &ProjectUpdate::new()).unwrap());

    let after = store.get_project(id).unwrap().unwrap();
    assert_eq!(before, after);
}

fn partial_update_touches_only_given_fields(store: &dyn ProjectStore) {
    let id = store
        .create_project(
            &NewProject::new("Website")
                .with_client("ACME")
                .with_budget(100.0),
        )
        .unwrap();
    let before = store.get_project(id).unwrap().unwrap();

    let update = ProjectUpdate::new()
        .with_status(ProjectStatus::Completed)
        .with_budget(250.0);
    assert!(store.update_project(id, &update).unwrap());

    let after = store.get_project(id).unwrap().unwrap();
    assert_eq!(after.status, ProjectStatus::Completed);
    assert_eq!(after.budget, 250.0);
    assert_eq!(after.name, "Website");
    assert_eq!(after.client, "ACME");
    assert_eq!(after.created_at, before.created_at);
    assert!(after.updated_at >= before.updated_at);
}

fn list_is_newest_first(store: &dyn ProjectStore) {
    let first = store.create_project(&NewProject::new("First")).unwrap();
    let second = store.create_project(&NewProject::new("Second")).unwrap();
    let third = store.create_project(&NewProject::new("Third")).unwrap();

    let ids: Vec<i64> = store.list_projects().unwrap().iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![third, second, first]);
}

fn list_populates_children(store: &dyn ProjectStore) {
    let id = store.create_project(&NewProject::new("Website")).unwrap();
    store.create_stage(id, &NewStage::new("Design")).unwrap();
    store.create_participant(id, &NewParticipant::new("Ana")).unwrap();

    let projects = store.list_projects().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].stages.len(), 1);
    assert_eq!(projects[0].participants.len(), 1);

    let base = store.get_project(id).unwrap().unwrap();
    assert!(base.stages.is_empty());
    assert!(base.participants.is_empty());
}

fn stages_keep_insertion_order(store: &dyn ProjectStore) {
    let project = store.create_project(&NewProject::new("Website")).unwrap();
    let other = store.create_project(&NewProject::new("Other")).unwrap();

    let design = store.create_stage(project, &NewStage::new("Design")).unwrap();
    store.create_stage(other, &NewStage::new("Elsewhere")).unwrap();
    let build = store
        .create_stage(
            project,
            &NewStage::new("Build")
                .with_description("Frontend and API")
                .with_status(StageStatus::Paused)
                .with_deadline("15-06-2025")
                .with_responsible("Bruno"),
        )
        .unwrap();

    let stages = store.list_stages(project).unwrap();
    assert_eq!(stages.iter().map(|s| s.id).collect::<Vec<_>>(), vec![design, build]);

    let stage = &stages[1];
    assert_eq!(stage.project_id, project);
    assert_eq!(stage.name, "Build");
    assert_eq!(stage.description, "Frontend and API");
    assert_eq!(stage.status, StageStatus::Paused);
    assert_eq!(stage.deadline, "15-06-2025");
    assert_eq!(stage.responsible, "Bruno");
    assert_eq!(stages[0].status, StageStatus::InProgress);

    let full = store.get_project_with_children(project).unwrap().unwrap();
    assert_eq!(full.stages, stages);
}

fn stage_update_and_delete(store: &dyn ProjectStore) {
    let project = store.create_project(&NewProject::new("Website")).unwrap();
    let stage = store.create_stage(project, &NewStage::new("Design")).unwrap();

    assert!(!store.update_stage(stage, &StageUpdate::new()).unwrap());
    assert!(store
        .update_stage(stage, &StageUpdate::new().with_status(StageStatus::Completed))
        .unwrap());

    let stages = store.list_stages(project).unwrap();
    assert_eq!(stages[0].status, StageStatus::Completed);
    assert_eq!(stages[0].name, "Design");
    assert_eq!(store.get_project_with_children(project).unwrap().unwrap().progress(), 100);

    assert!(store.delete_stage(stage).unwrap());
    assert!(store.list_stages(project).unwrap().is_empty());
    assert!(store.get_project(project).unwrap().is_some());
}

fn participant_crud(store: &dyn ProjectStore) {
    let project = store.create_project(&NewProject::new("Website")).unwrap();
    let ana = store
        .create_participant(
            project,
            &NewParticipant::new("Ana")
                .with_role("Designer")
                .with_stage("Design"),
        )
        .unwrap();
    let bruno = store.create_participant(project, &NewParticipant::new("Bruno")).unwrap();

    let participants = store.list_participants(project).unwrap();
    assert_eq!(participants.iter().map(|p| p.id).collect::<Vec<_>>(), vec![ana, bruno]);
    assert_eq!(participants[0].role, "Designer");
    assert_eq!(participants[0].stage, "Design");

    let found = store.find_participant_by_name(project, "Bruno").unwrap().unwrap();
    assert_eq!(found.id, bruno);
    assert!(store.find_participant_by_name(project, "Carla").unwrap().is_none());

    assert!(!store.update_participant(ana, &ParticipantUpdate::new()).unwrap());
    assert!(store
        .update_participant(ana, &ParticipantUpdate::new().with_deadline("01/02/2025"))
        .unwrap());
    let updated = store.find_participant_by_name(project, "Ana").unwrap().unwrap();
    assert_eq!(updated.deadline, "01/02/2025");
    assert_eq!(updated.role, "Designer");

    assert!(store.delete_participant(bruno).unwrap());
    assert_eq!(store.list_participants(project).unwrap().len(), 1);
}

fn children_require_live_project(store: &dyn ProjectStore) {
    assert!(matches!(
        store.create_stage(7, &NewStage::new("Design")),
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        store.create_participant(7, &NewParticipant::new("Ana")),
        Err(Error::Validation(_))
    ));
}

fn delete_cascades_to_children(store: &dyn ProjectStore) {
    let doomed = store.create_project(&NewProject::new("Doomed")).unwrap();
    let kept = store.create_project(&NewProject::new("Kept")).unwrap();
    let stage = store.create_stage(doomed, &NewStage::new("Design")).unwrap();
    let participant = store.create_participant(doomed, &NewParticipant::new("Ana")).unwrap();
    store.create_stage(kept, &NewStage::new("Build")).unwrap();

    assert!(store.delete_project(doomed).unwrap());

    assert!(store.get_project(doomed).unwrap().is_none());
    assert!(store.list_stages(doomed).unwrap().is_empty());
    assert!(store.list_participants(doomed).unwrap().is_empty());
    assert!(!store.delete_stage(stage).unwrap());
    assert!(!store.delete_participant(participant).unwrap());
    assert_eq!(store.list_stages(kept).unwrap().len(), 1);
}

fn user_uniqueness(store: &dyn ProjectStore) {
    let hash = hash_password("s3cret");
    let id = store.create_user("alice", &hash).unwrap();

    let user = store.find_user("alice").unwrap().unwrap();
    assert_eq!(user.id, id);
    assert_eq!(user.password_hash, hash);

    let err = store.create_user("alice", &hash_password("other")).unwrap_err();
    assert!(matches!(err, Error::UniqueConstraint(ref name) if name == "alice"));
    assert_eq!(store.find_user("alice").unwrap().unwrap().password_hash, hash);
}

fn user_password_and_listing(store: &dyn ProjectStore) {
    store.create_user("carol", &hash_password("one")).unwrap();
    store.create_user("alice", &hash_password("two")).unwrap();

    let new_hash = hash_password("three");
    assert!(store.update_password("carol", &new_hash).unwrap());
    assert_eq!(store.find_user("carol").unwrap().unwrap().password_hash, new_hash);

    let names: Vec<String> = store.list_users().unwrap().into_iter().map(|u| u.name).collect();
    assert_eq!(names, vec!["alice", "carol"]);
}

fn stats_count_everything(store: &dyn ProjectStore) {
    let a = store.create_project(&NewProject::new("Alpha")).unwrap();
    store
        .create_project(&NewProject::new("Beta").with_status(ProjectStatus::Completed))
        .unwrap();
    store.create_stage(a, &NewStage::new("Design")).unwrap();
    store.create_stage(a, &NewStage::new("Build")).unwrap();
    store.create_participant(a, &NewParticipant::new("Ana")).unwrap();
    store.create_user("alice", &hash_password("s3cret")).unwrap();

    let stats = store.stats().unwrap();
    assert_eq!(stats.projects, 2);
    assert_eq!(stats.active, 1);
    assert_eq!(stats.completed, 1);
    assert_eq!(stats.paused, 0);
    assert_eq!(stats.stages, 2);
    assert_eq!(stats.participants, 1);
    assert_eq!(stats.users, 1);
}

macro_rules! backend_tests {
    ($backend:ident, $open:expr) => {
        mod $backend {
            use super::*;

            backend_tests!(@each $open;
                create_then_get_applies_defaults,
                create_then_get_keeps_every_field,
                missing_records_are_absent,
                invalid_input_is_rejected,
                empty_update_is_a_no_op,
                partial_update_touches_only_given_fields,
                list_is_newest_first,
                list_populates_children,
                stages_keep_insertion_order,
                stage_update_and_delete,
                participant_crud,
                children_require_live_project,
                delete_cascades_to_children,
                user_uniqueness,
                user_password_and_listing,
                stats_count_everything,
            );
        }
    };
    (@each $open:expr; $($check:ident),* $(,)?) => {
        $(
            #[test]
            fn $check() {
                let (_guard, store) = $open;
                super::$check(&store);
            }
        )*
    };
}

backend_tests!(sqlite, ((), SqliteStore::open_in_memory().unwrap()));

backend_tests!(json, {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonStore::open(&dir.path().join("dados_projetos.json")).unwrap();
    (dir, store)
});
