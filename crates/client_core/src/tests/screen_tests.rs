use super::*;
use crate::test_support::{project, FakeRepository, RecordingNavigator};

fn screen_with(
    repository: &Arc<FakeRepository>,
) -> (ProjectScreen, Arc<RecordingNavigator>) {
    let navigator = Arc::new(RecordingNavigator::default());
    let screen = ProjectScreen::new(
        Arc::clone(repository) as Arc<dyn ProjectRepository>,
        Arc::clone(&navigator) as Arc<dyn Navigator>,
    );
    (screen, navigator)
}

#[tokio::test]
async fn load_exposes_projects() {
    let repository = FakeRepository::with_projects(vec![
        project("p-1", "Roadmap"),
        project("p-2", "Migration"),
    ]);
    let (screen, _) = screen_with(&repository);

    screen.load_projects().await;

    match screen.view().await {
        ScreenView::Ready {
            projects,
            error_message,
            editor,
        } => {
            assert_eq!(projects.len(), 2);
            assert!(error_message.is_none());
            assert_eq!(editor, EditorState::Closed);
        }
        other => panic!("unexpected view: {other:?}"),
    }
    assert!(!screen.is_loading().await);
}

#[tokio::test]
async fn empty_collection_renders_empty_state() {
    let repository = FakeRepository::with_projects(Vec::new());
    let (screen, _) = screen_with(&repository);

    screen.load_projects().await;

    assert_eq!(screen.view().await.empty_state(), Some(EMPTY_LIST_MESSAGE));
}

#[tokio::test]
async fn first_load_in_flight_renders_loading() {
    let repository = FakeRepository::with_projects(Vec::new());
    let gate = repository.gate_next_list();
    let (screen, _) = screen_with(&repository);

    let load = screen.load_projects();
    let check = async {
        tokio::task::yield_now().await;
        let view = screen.view().await;
        gate.send(Ok(vec![project("p-1", "Roadmap")]))
            .expect("load still pending");
        view
    };
    let ((), view_during_load) = tokio::join!(load, check);

    assert_eq!(view_during_load, ScreenView::Loading);
    assert_eq!(screen.projects().await.len(), 1);
}

#[tokio::test]
async fn failed_load_is_retryable() {
    let repository = FakeRepository::with_projects(vec![project("p-1", "Roadmap")]);
    repository.configure(|state| state.fail_list_with = Some("timeout".into()));
    let (screen, _) = screen_with(&repository);

    screen.load_projects().await;
    assert_eq!(
        screen.view().await,
        ScreenView::LoadFailed {
            message: LOAD_ERROR_MESSAGE.to_string()
        }
    );

    repository.configure(|state| state.fail_list_with = None);
    screen.retry().await;

    assert_eq!(repository.list_calls(), 2);
    assert!(matches!(screen.view().await, ScreenView::Ready { .. }));
}

#[tokio::test]
async fn successful_create_reloads_once_and_clears_error() {
    let repository = FakeRepository::with_projects(vec![project("p-1", "Roadmap")]);
    let (screen, _) = screen_with(&repository);
    screen.load_projects().await;

    repository.configure(|state| state.fail_create_with = Some("name is required".into()));
    assert!(!screen.create_project("", "").await);
    assert_eq!(
        screen.error_message().await.as_deref(),
        Some("name is required")
    );

    repository.configure(|state| state.fail_create_with = None);
    let loads_before = repository.list_calls();
    assert!(screen.create_project("Launch", "Go-to-market").await);

    assert_eq!(repository.list_calls(), loads_before + 1);
    assert!(screen.error_message().await.is_none());
    let names: Vec<String> = screen
        .projects()
        .await
        .into_iter()
        .map(|project| project.name)
        .collect();
    assert_eq!(names, vec!["Roadmap".to_string(), "Launch".to_string()]);
}

#[tokio::test]
async fn failed_create_keeps_list_and_skips_reload() {
    let repository = FakeRepository::with_projects(vec![project("p-1", "Roadmap")]);
    let (screen, _) = screen_with(&repository);
    screen.load_projects().await;
    repository.configure(|state| state.fail_create_with = Some("quota exceeded".into()));

    assert!(!screen.create_project("Launch", "").await);

    assert_eq!(repository.list_calls(), 1);
    assert_eq!(screen.error_message().await.as_deref(), Some("quota exceeded"));
    assert_eq!(screen.projects().await, vec![project("p-1", "Roadmap")]);
}

#[tokio::test]
async fn update_reconciles_like_create() {
    let repository = FakeRepository::with_projects(vec![project("p-1", "Roadmap")]);
    let (screen, _) = screen_with(&repository);
    screen.load_projects().await;
    let id = ProjectId::new("p-1");

    repository.configure(|state| state.fail_update_with = Some("conflict".into()));
    assert!(!screen.update_project(&id, "Roadmap v2", "").await);
    assert_eq!(repository.list_calls(), 1);
    assert_eq!(screen.error_message().await.as_deref(), Some("conflict"));
    assert_eq!(screen.projects().await[0].name, "Roadmap");

    repository.configure(|state| state.fail_update_with = None);
    assert!(screen.update_project(&id, "Roadmap v2", "Updated").await);
    assert_eq!(repository.list_calls(), 2);
    assert!(screen.error_message().await.is_none());
    assert_eq!(screen.projects().await[0].name, "Roadmap v2");
}

#[tokio::test]
async fn failed_delete_records_error_without_reload() {
    let repository = FakeRepository::with_projects(vec![project("p-1", "Roadmap")]);
    let (screen, _) = screen_with(&repository);
    screen.load_projects().await;
    repository.configure(|state| state.fail_delete_with = Some("forbidden".into()));

    assert!(!screen.delete_project(&ProjectId::new("p-1")).await);

    assert_eq!(repository.list_calls(), 1);
    assert_eq!(screen.error_message().await.as_deref(), Some("forbidden"));
    assert_eq!(screen.projects().await.len(), 1);
}

#[tokio::test]
async fn successful_delete_reloads_but_keeps_previous_error() {
    let repository = FakeRepository::with_projects(vec![
        project("p-1", "Roadmap"),
        project("p-2", "Migration"),
    ]);
    let (screen, _) = screen_with(&repository);
    screen.load_projects().await;

    repository.configure(|state| state.fail_create_with = Some("quota exceeded".into()));
    screen.create_project("Launch", "").await;

    assert!(screen.delete_project(&ProjectId::new("p-1")).await);

    assert_eq!(repository.list_calls(), 2);
    assert_eq!(screen.projects().await, vec![project("p-2", "Migration")]);
    assert_eq!(screen.error_message().await.as_deref(), Some("quota exceeded"));
}

#[tokio::test]
async fn editor_transitions_are_local() {
    let repository = FakeRepository::with_projects(vec![project("p-1", "Roadmap")]);
    let (screen, _) = screen_with(&repository);
    screen.load_projects().await;

    screen.open_creator().await;
    let state = screen.view_state().await;
    assert!(state.modal_open);
    assert!(state.selected_project.is_none());

    screen.select_for_edit(project("p-1", "Roadmap")).await;
    match screen.view().await {
        ScreenView::Ready { editor, .. } => {
            assert_eq!(editor, EditorState::Editing(project("p-1", "Roadmap")))
        }
        other => panic!("unexpected view: {other:?}"),
    }

    screen.close_editor().await;
    assert_eq!(screen.view_state().await, ScreenViewState::default());
    assert_eq!(repository.list_calls(), 1);
}

#[tokio::test]
async fn opening_a_project_hands_off_route_state() {
    let repository = FakeRepository::with_projects(Vec::new());
    let (screen, navigator) = screen_with(&repository);

    screen.open_project(&project("p-9", "Audit"));

    let routes = navigator.routes();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0].path(), "/proyecto/periodo");
    assert_eq!(
        routes[0],
        Route::ProjectPeriods(ProjectRouteState {
            period_project_id: "p-9".into(),
            project_name: "Audit".into(),
        })
    );
}

#[tokio::test]
async fn stale_load_response_does_not_overwrite_newer_one() {
    let repository = FakeRepository::with_projects(Vec::new());
    let first = repository.gate_next_list();
    let second = repository.gate_next_list();
    let (screen, _) = screen_with(&repository);

    let older = vec![project("p-old", "Stale")];
    let newer = vec![project("p-new", "Fresh")];
    let expected = newer.clone();

    let driver = async {
        second.send(Ok(newer)).expect("second load pending");
        while screen.projects().await.is_empty() {
            tokio::task::yield_now().await;
        }
        first.send(Ok(older)).expect("first load pending");
    };
    tokio::join!(screen.load_projects(), screen.load_projects(), driver);

    assert_eq!(repository.list_calls(), 2);
    assert_eq!(screen.projects().await, expected);
    assert!(!screen.is_loading().await);
}

#[tokio::test]
async fn stale_failure_does_not_replace_loaded_list() {
    let repository = FakeRepository::with_projects(Vec::new());
    let first = repository.gate_next_list();
    let second = repository.gate_next_list();
    let (screen, _) = screen_with(&repository);

    let driver = async {
        second
            .send(Ok(vec![project("p-1", "Roadmap")]))
            .expect("second load pending");
        while screen.projects().await.is_empty() {
            tokio::task::yield_now().await;
        }
        first
            .send(Err("connection reset".into()))
            .expect("first load pending");
    };
    tokio::join!(screen.load_projects(), screen.load_projects(), driver);

    assert!(matches!(screen.view().await, ScreenView::Ready { .. }));
    assert_eq!(screen.projects().await.len(), 1);
}
