use speculate2::speculate;

speculate! {
    use std::sync::{Arc, Mutex};

    use chrono::NaiveDate;
    use taskman_core::history::render_history;
    use taskman_core::lifecycle::{Notifier, StatusChangeNotice};
    use taskman_core::models::*;
    use taskman_core::{Database, Error};

    fn setup_db() -> Database {
        let db = Database::open_memory()
            .expect("Failed to create test database")
            .with_password_rounds(1_000);
        db.migrate().expect("Failed to migrate test database");
        db
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_project(db: &Database, name: &str) -> Project {
        db.create_project(CreateProjectInput {
            name: name.to_string(),
            description: "Test project".to_string(),
            is_complete: false,
        })
        .expect("Failed to create project")
    }

    fn create_status(db: &Database, name: &str, parent_id: Option<i64>) -> Status {
        db.create_status(CreateStatusInput { name: name.to_string(), parent_id })
            .expect("Failed to create status")
    }

    fn create_user(db: &Database, username: &str, email: Option<&str>) -> User {
        db.create_user(CreateUserInput {
            username: username.to_string(),
            email: email.map(String::from),
            password: "correct horse".to_string(),
            password_confirm: "correct horse".to_string(),
        })
        .expect("Failed to create user")
    }

    #[derive(Default)]
    struct RecordingNotifier {
        notices: Mutex<Vec<StatusChangeNotice>>,
    }

    impl Notifier for RecordingNotifier {
        fn status_changed(&self, notice: &StatusChangeNotice) {
            self.notices.lock().unwrap().push(notice.clone());
        }
    }

    describe "projects" {
        it "sets and clears the completion timestamp with the flag" {
            let db = setup_db();
            let project = create_project(&db, "Apollo");
            assert!(project.completed_at.is_none());

            let done = db
                .patch_project(project.id, UpdateProjectInput { is_complete: Some(true), ..Default::default() })
                .unwrap()
                .unwrap();
            assert!(done.completed_at.is_some());

            let reopened = db
                .patch_project(project.id, UpdateProjectInput { is_complete: Some(false), ..Default::default() })
                .unwrap()
                .unwrap();
            assert!(reopened.completed_at.is_none());
            assert_eq!(db.get_project(project.id).unwrap().unwrap(), reopened);
        }

        it "keeps the first completion timestamp across saves" {
            let db = setup_db();
            let project = create_project(&db, "Apollo");
            let done = db
                .patch_project(project.id, UpdateProjectInput { is_complete: Some(true), ..Default::default() })
                .unwrap()
                .unwrap();
            let renamed = db
                .patch_project(project.id, UpdateProjectInput { name: Some("Gemini".into()), ..Default::default() })
                .unwrap()
                .unwrap();
            assert_eq!(renamed.completed_at, done.completed_at);
        }

        it "refuses deletion while sprints reference it" {
            let db = setup_db();
            let project = create_project(&db, "Apollo");
            let sprint = db
                .create_sprint(CreateSprintInput {
                    name: "S1".into(),
                    date_start: date(2024, 6, 1),
                    date_end: date(2024, 6, 10),
                    project_id: project.id,
                })
                .unwrap();

            assert!(matches!(db.delete_project(project.id), Err(Error::Protected { .. })));
            assert!(db.delete_sprint(sprint.id).unwrap());
            assert!(db.delete_project(project.id).unwrap());
        }

        it "detaches tasks when deleted" {
            let db = setup_db();
            let project = create_project(&db, "Apollo");
            let mut input = CreateTaskInput::new("A", "B");
            input.project_id = Some(project.id);
            let task = db.create_task(input).unwrap();

            assert!(db.delete_project(project.id).unwrap());
            assert_eq!(db.get_task(task.id).unwrap().unwrap().project_id, None);

            let entries = render_history(&db.task_history_window(task.id, 100).unwrap());
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[1].change_type, ChangeType::Updated);
            assert_eq!(entries[1].narration, format!("Задача удалена из проекта №{}.", project.id));
        }
    }

    describe "sprints" {
        it "records the removal in the history of its tasks" {
            let db = setup_db();
            let project = create_project(&db, "Apollo");
            let sprint = db
                .create_sprint(CreateSprintInput {
                    name: "S1".into(),
                    date_start: date(2024, 3, 1),
                    date_end: date(2024, 3, 14),
                    project_id: project.id,
                })
                .unwrap();
            let mut input = CreateTaskInput::new("A", "B");
            input.sprint_id = Some(sprint.id);
            let task = db.create_task(input).unwrap();

            assert!(db.delete_sprint(sprint.id).unwrap());
            assert_eq!(db.get_task(task.id).unwrap().unwrap().sprint_id, None);

            let entries = render_history(&db.task_history_window(task.id, 100).unwrap());
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[1].narration, format!("Задача удалена из спринта №{}.", sprint.id));
        }

        it "rejects an end date before the start date" {
            let db = setup_db();
            let project = create_project(&db, "Apollo");
            let result = db.create_sprint(CreateSprintInput {
                name: "S1".into(),
                date_start: date(2024, 6, 10),
                date_end: date(2024, 6, 1),
                project_id: project.id,
            });

            assert!(matches!(result, Err(Error::Validation(ref e)) if e.has_field("date_end")));
            assert_eq!(db.list_sprints(&SprintFilter::default(), PageRequest::default()).unwrap().count, 0);
        }

        it "rejects an unknown project" {
            let db = setup_db();
            let result = db.create_sprint(CreateSprintInput {
                name: "S1".into(),
                date_start: date(2024, 6, 1),
                date_end: date(2024, 6, 10),
                project_id: 42,
            });
            assert!(matches!(result, Err(Error::Validation(ref e)) if e.has_field("project_id")));
        }

        it "filters by the day a sprint is active on" {
            let db = setup_db();
            let project = create_project(&db, "Apollo");
            for (name, start, end) in [("June", date(2024, 6, 1), date(2024, 6, 30)), ("July", date(2024, 7, 1), date(2024, 7, 31))] {
                db.create_sprint(CreateSprintInput { name: name.into(), date_start: start, date_end: end, project_id: project.id })
                    .unwrap();
            }

            let filter = SprintFilter { project_id: None, active_on: Some(date(2024, 6, 30)) };
            let page = db.list_sprints(&filter, PageRequest::default()).unwrap();
            assert_eq!(page.count, 1);
            assert_eq!(page.results[0].name, "June");
        }

        it "lists active sprints only while they hold open tasks" {
            let db = setup_db();
            let project = create_project(&db, "Apollo");
            let sprint = db
                .create_sprint(CreateSprintInput {
                    name: "Now".into(),
                    date_start: date(2024, 6, 1),
                    date_end: date(2024, 6, 30),
                    project_id: project.id,
                })
                .unwrap();
            let mut input = CreateTaskInput::new("A", "B");
            input.sprint_id = Some(sprint.id);
            let task = db.create_task(input).unwrap();

            assert_eq!(db.active_sprints_with_open_tasks(date(2024, 6, 15)).unwrap().len(), 1);
            assert!(db.active_sprints_with_open_tasks(date(2024, 7, 1)).unwrap().is_empty());

            db.patch_task(task.id, UpdateTaskInput { is_complete: Some(true), ..Default::default() }).unwrap();
            assert!(db.active_sprints_with_open_tasks(date(2024, 6, 15)).unwrap().is_empty());
        }
    }

    describe "statuses" {
        it "rejects a parent that would close a loop" {
            let db = setup_db();
            let root = create_status(&db, "Backlog", None);
            let child = create_status(&db, "Doing", Some(root.id));

            let result = db.patch_status(root.id, UpdateStatusInput { name: None, parent_id: Some(Some(child.id)) });
            assert!(matches!(result, Err(Error::StatusCycle { .. })));

            let result = db.patch_status(root.id, UpdateStatusInput { name: None, parent_id: Some(Some(root.id)) });
            assert!(matches!(result, Err(Error::StatusCycle { .. })));
        }

        it "rejects an unknown parent" {
            let db = setup_db();
            let result = db.create_status(CreateStatusInput { name: "Doing".into(), parent_id: Some(99) });
            assert!(matches!(result, Err(Error::Validation(ref e)) if e.has_field("parent_id")));
        }

        it "turns children into roots when their parent is deleted" {
            let db = setup_db();
            let root = create_status(&db, "Backlog", None);
            let child = create_status(&db, "Doing", Some(root.id));
            let mut input = CreateTaskInput::new("A", "B");
            input.status_id = Some(root.id);
            let task = db.create_task(input).unwrap();

            assert!(db.delete_status(root.id).unwrap());
            assert_eq!(db.get_status(child.id).unwrap().unwrap().parent_id, None);
            assert_eq!(db.get_task(task.id).unwrap().unwrap().status_id, None);
        }

        it "charges a deleted status to its own snapshot, not the next save" {
            let db = setup_db();
            let status = create_status(&db, "Doing", None);
            let mut input = CreateTaskInput::new("A", "B");
            input.status_id = Some(status.id);
            let task = db.create_task(input).unwrap();

            assert!(db.delete_status(status.id).unwrap());
            db.patch_task(task.id, UpdateTaskInput { name: Some("A2".into()), ..Default::default() })
                .unwrap();

            let entries = render_history(&db.task_history_window(task.id, 100).unwrap());
            assert_eq!(entries.len(), 3);
            assert_eq!(entries[1].narration, "Поле 'статус' изменено на ''.");
            assert_eq!(entries[2].narration, "Поле 'название' изменено на 'A2'.");
        }

        it "reports a missing status on delete" {
            let db = setup_db();
            assert!(!db.delete_status(42).unwrap());
        }

        it "orders the tree by root" {
            let db = setup_db();
            let a = create_status(&db, "A", None);
            let b = create_status(&db, "B", None);
            create_status(&db, "B1", Some(b.id));
            create_status(&db, "A1", Some(a.id));

            let names: Vec<String> = db.status_tree().unwrap().into_iter().map(|e| e.relative_name).collect();
            assert_eq!(names, vec!["A", "---A1", "B", "---B1"]);
        }
    }

    describe "tasks" {
        it "records a created snapshot with an empty narration" {
            let db = setup_db();
            let task = db.create_task(CreateTaskInput::new("A", "B")).unwrap();

            let entries = render_history(&db.task_history_window(task.id, 100).unwrap());
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].change_type, ChangeType::Created);
            assert!(entries[0].narration.is_empty());
        }

        it "narrates a status assignment" {
            let db = setup_db();
            let status = create_status(&db, "Doing", None);
            let task = db.create_task(CreateTaskInput::new("A", "B")).unwrap();
            db.patch_task(task.id, UpdateTaskInput { status_id: Some(Some(status.id)), ..Default::default() })
                .unwrap();

            let entries = render_history(&db.task_history_window(task.id, 100).unwrap());
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[1].change_type, ChangeType::Updated);
            assert_eq!(entries[1].narration, format!("Поле 'статус' изменено на '{}'.", status.id));
        }

        it "round-trips the completion flag without touching other fields" {
            let db = setup_db();
            let task = db.create_task(CreateTaskInput::new("A", "B")).unwrap();
            let done = db
                .patch_task(task.id, UpdateTaskInput { is_complete: Some(true), ..Default::default() })
                .unwrap()
                .unwrap();
            assert!(done.completed_at.is_some());

            let reopened = db
                .patch_task(task.id, UpdateTaskInput { is_complete: Some(false), ..Default::default() })
                .unwrap()
                .unwrap();
            assert_eq!(reopened, task);
        }

        it "rejects references to missing records without saving" {
            let db = setup_db();
            let mut input = CreateTaskInput::new("A", "B");
            input.sprint_id = Some(3);
            input.executor_id = Some(4);

            let result = db.create_task(input);
            assert!(matches!(result, Err(Error::Validation(ref e)) if e.has_field("sprint_id") && e.has_field("executor_id")));
            assert_eq!(db.list_tasks(&TaskFilter::default(), PageRequest::default()).unwrap().count, 0);
        }

        it "keeps its history after deletion" {
            let db = setup_db();
            let task = db.create_task(CreateTaskInput::new("A", "B")).unwrap();
            assert!(db.delete_task(task.id).unwrap());
            assert!(db.get_task(task.id).unwrap().is_none());

            let window = db.task_history_window(task.id, 100).unwrap();
            let entries = render_history(&window);
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[1].change_type, ChangeType::Deleted);
            assert_eq!(window.snapshots[1].prev_history_id, Some(window.snapshots[0].history_id));
        }

        it "returns the most recent snapshots with their baseline" {
            let db = setup_db();
            let task = db.create_task(CreateTaskInput::new("A", "B")).unwrap();
            for i in 0..4 {
                db.patch_task(task.id, UpdateTaskInput { name: Some(format!("A{}", i)), ..Default::default() })
                    .unwrap();
            }

            let window = db.task_history_window(task.id, 2).unwrap();
            assert_eq!(window.snapshots.len(), 2);
            assert_eq!(window.baseline.as_ref().unwrap().name, "A1");
            let entries = render_history(&window);
            assert_eq!(entries[0].narration, "Поле 'название' изменено на 'A2'.");
        }

        it "orders open tasks first, newest first" {
            let db = setup_db();
            let first = db.create_task(CreateTaskInput::new("first", "x")).unwrap();
            let second = db.create_task(CreateTaskInput::new("second", "x")).unwrap();
            let third = db.create_task(CreateTaskInput::new("third", "x")).unwrap();
            db.patch_task(third.id, UpdateTaskInput { is_complete: Some(true), ..Default::default() }).unwrap();

            let filter = TaskFilter { order: TaskOrder::OpenFirst, ..Default::default() };
            let ids: Vec<i64> = db.list_tasks(&filter, PageRequest::all()).unwrap().results.iter().map(|t| t.id).collect();
            assert_eq!(ids, vec![second.id, first.id, third.id]);
        }

        it "walks down and up the status tree" {
            let db = setup_db();
            let root = create_status(&db, "Backlog", None);
            let child = create_status(&db, "Doing", Some(root.id));
            let task = db.create_task(CreateTaskInput::new("A", "B")).unwrap();

            let moved = db.advance_task_status(task.id).unwrap().unwrap();
            assert_eq!(moved.status_id, Some(root.id));
            let moved = db.advance_task_status(task.id).unwrap().unwrap();
            assert_eq!(moved.status_id, Some(child.id));

            let before = db.task_history_window(task.id, 100).unwrap().snapshots.len();
            let stayed = db.advance_task_status(task.id).unwrap().unwrap();
            assert_eq!(stayed.status_id, Some(child.id));
            assert_eq!(db.task_history_window(task.id, 100).unwrap().snapshots.len(), before);

            let back = db.retreat_task_status(task.id).unwrap().unwrap();
            assert_eq!(back.status_id, Some(root.id));
        }

        it "notifies a reachable executor when the status changes" {
            let notifier = Arc::new(RecordingNotifier::default());
            let db = setup_db().with_notifier(notifier.clone());
            let status = create_status(&db, "Doing", None);
            let reachable = create_user(&db, "alice", Some("alice@example.com"));
            let silent = create_user(&db, "bob", None);

            let mut input = CreateTaskInput::new("A", "B");
            input.executor_id = Some(reachable.id);
            let task = db.create_task(input).unwrap();
            assert!(notifier.notices.lock().unwrap().is_empty());

            db.patch_task(task.id, UpdateTaskInput { status_id: Some(Some(status.id)), ..Default::default() })
                .unwrap();
            db.patch_task(task.id, UpdateTaskInput { name: Some("A2".into()), ..Default::default() })
                .unwrap();
            db.patch_task(
                task.id,
                UpdateTaskInput { executor_id: Some(Some(silent.id)), status_id: Some(None), ..Default::default() },
            )
            .unwrap();

            let notices = notifier.notices.lock().unwrap();
            assert_eq!(notices.len(), 1);
            assert_eq!(notices[0].email, "alice@example.com");
            assert_eq!(notices[0].new_status_id, Some(status.id));
        }
    }

    describe "users" {
        it "verifies credentials" {
            let db = setup_db();
            let user = create_user(&db, "alice", None);
            assert_eq!(db.verify_credentials("alice", "correct horse").unwrap(), Some(user));
            assert!(db.verify_credentials("alice", "wrong").unwrap().is_none());
            assert!(db.verify_credentials("nobody", "correct horse").unwrap().is_none());
        }

        it "refuses a taken username" {
            let db = setup_db();
            create_user(&db, "alice", None);
            let result = db.create_user(CreateUserInput {
                username: "alice".into(),
                email: None,
                password: "another pass".into(),
                password_confirm: "another pass".into(),
            });
            assert!(matches!(result, Err(Error::Validation(ref e)) if e.has_field("username")));
        }

        it "resolves live sessions and drops expired ones" {
            let db = setup_db();
            let user = create_user(&db, "alice", None);
            let session = db.create_session(user.id, chrono::Duration::hours(1)).unwrap();

            let now = chrono::Utc::now();
            assert_eq!(db.user_for_token(&session.token, now).unwrap(), Some(user));
            assert!(db.user_for_token(&session.token, now + chrono::Duration::hours(2)).unwrap().is_none());
            assert!(db.user_for_token(&session.token, now).unwrap().is_none());
        }

        it "purges expired sessions when a new one opens" {
            let db = setup_db();
            let user = create_user(&db, "alice", None);
            db.create_session(user.id, chrono::Duration::hours(-1)).unwrap();
            let live = db.create_session(user.id, chrono::Duration::hours(1)).unwrap();

            let now = chrono::Utc::now();
            assert_eq!(db.purge_expired_sessions(now).unwrap(), 0);
            assert_eq!(db.user_for_token(&live.token, now).unwrap(), Some(user));
        }

        it "purges on demand" {
            let db = setup_db();
            let user = create_user(&db, "alice", None);
            db.create_session(user.id, chrono::Duration::hours(1)).unwrap();

            let later = chrono::Utc::now() + chrono::Duration::hours(2);
            assert_eq!(db.purge_expired_sessions(later).unwrap(), 1);
        }
    }
}

#[test]
fn file_backed_database_persists_across_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("taskman.db");

    {
        let db = taskman_core::Database::open(&path).unwrap();
        db.migrate().unwrap();
        db.create_task(taskman_core::models::CreateTaskInput::new("A", "B")).unwrap();
    }

    let db = taskman_core::Database::open(&path).unwrap();
    db.migrate().unwrap();
    let page = db
        .list_tasks(&Default::default(), Default::default())
        .unwrap();
    assert_eq!(page.count, 1);
}
