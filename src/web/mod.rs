//! Server-rendered pages over the same records as the REST API.

mod html;

use axum::extract::{Form, FromRequestParts, Path, State};
use axum::http::header::SET_COOKIE;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::Local;
use serde::Deserialize;
use taskman_core::history::render_history;
use taskman_core::models::{PageRequest, SprintFilter, Task, TaskFilter, TaskOrder};

use crate::api::{
    clear_cookie, found, login, session_cookie, session_token, ApiError, AppState, CurrentUser,
    LoginInput,
};
use html::{escape, layout, link, table, timestamp};

/// A signed-in page visitor. Anyone else is sent to the sign-in page.
pub struct PageUser(pub CurrentUser);

impl FromRequestParts<AppState> for PageUser {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match CurrentUser::resolve(state, &parts.headers) {
            Ok(Some(user)) => Ok(Self(user)),
            Ok(None) => Err(Redirect::to("/login").into_response()),
            Err(err) => Err(PageError(err).into_response()),
        }
    }
}

impl PageUser {
    fn username(&self) -> Option<&str> {
        Some(self.0.user.username.as_str())
    }
}

/// [`ApiError`] rendered as an HTML page.
pub struct PageError(ApiError);

impl From<ApiError> for PageError {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl From<taskman_core::Error> for PageError {
    fn from(err: taskman_core::Error) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(err) = &self.0 {
            tracing::error!("Page request failed: {}", err);
        }
        let body = format!("<p>{}</p>", escape(&self.0.public_message()));
        (self.0.status(), layout("Ошибка", None, &body)).into_response()
    }
}

type PageResult = Result<Html<String>, PageError>;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(task_list))
        .route("/login", get(login_page).post(login_submit))
        .route("/logout", post(logout_submit))
        .route("/task/{id}", get(task_detail).post(task_status_action))
        .route("/project/list", get(project_list))
        .route("/project/{id}", get(project_detail))
        .route("/status/list", get(status_list))
}

fn login_form(error: Option<&str>) -> Html<String> {
    let error = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape(e)))
        .unwrap_or_default();
    let body = format!(
        r#"{error}<form method="post" action="/login">
<input name="username" placeholder="Пользователь" required>
<input name="password" type="password" placeholder="Пароль" required>
<button>Войти</button>
</form>"#
    );
    layout("Вход", None, &body)
}

async fn login_page(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, PageError> {
    if CurrentUser::resolve(&state, &headers)?.is_some() {
        return Ok(Redirect::to("/").into_response());
    }
    Ok(login_form(None).into_response())
}

async fn login_submit(
    State(state): State<AppState>,
    Form(input): Form<LoginInput>,
) -> Result<Response, PageError> {
    match login(&state, &input) {
        Ok((session, _)) => {
            Ok(([(SET_COOKIE, session_cookie(&session))], Redirect::to("/")).into_response())
        }
        Err(ApiError::InvalidCredentials) => Ok((
            StatusCode::UNAUTHORIZED,
            login_form(Some("Неверное имя пользователя или пароль")),
        )
            .into_response()),
        Err(err) => Err(err.into()),
    }
}

async fn logout_submit(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, PageError> {
    if let Some(token) = session_token(&headers) {
        state.db.delete_session(&token)?;
    }
    Ok(([(SET_COOKIE, clear_cookie())], Redirect::to("/login")).into_response())
}

fn task_rows(tasks: &[Task]) -> Vec<Vec<String>> {
    tasks
        .iter()
        .map(|t| {
            vec![
                t.id.to_string(),
                link(&format!("/task/{}", t.id), &t.name),
                if t.is_complete { "да" } else { "нет" }.to_string(),
                timestamp(&t.created_at),
            ]
        })
        .collect()
}

const TASK_HEADERS: [&str; 4] = ["№", "Название", "Выполнена", "Создана"];

async fn task_list(State(state): State<AppState>, user: PageUser) -> PageResult {
    let filter = TaskFilter {
        order: TaskOrder::OpenFirst,
        ..TaskFilter::default()
    };
    let tasks = state.db.list_tasks(&filter, PageRequest::all())?.results;
    let body = table(&TASK_HEADERS, &task_rows(&tasks));
    Ok(layout("Задачи", user.username(), &body))
}

async fn task_detail(State(state): State<AppState>, user: PageUser, Path(id): Path<i64>) -> PageResult {
    let task = found(state.db.get_task(id)?, "task", id)?;

    let status = match task.status_id {
        Some(sid) => state.db.get_status(sid)?.map(|s| s.name),
        None => None,
    };
    let executor = match task.executor_id {
        Some(uid) => state.db.get_user(uid)?.map(|u| u.username),
        None => None,
    };
    let project = match task.project_id {
        Some(pid) => state.db.get_project(pid)?.map(|p| link(&format!("/project/{}", p.id), &p.name)),
        None => None,
    };
    let sprint = match task.sprint_id {
        Some(sid) => state.db.get_sprint(sid)?.map(|s| s.name),
        None => None,
    };

    let fields = table(
        &["Поле", "Значение"],
        &[
            vec!["Описание".into(), escape(&task.description)],
            vec!["Выполнена".into(), if task.is_complete { "да" } else { "нет" }.into()],
            vec![
                "Когда выполнена".into(),
                task.completed_at.as_ref().map(timestamp).unwrap_or_default(),
            ],
            vec!["Статус".into(), escape(&status.unwrap_or_default())],
            vec!["Исполнитель".into(), escape(&executor.unwrap_or_default())],
            vec!["Проект".into(), project.unwrap_or_default()],
            vec!["Спринт".into(), escape(&sprint.unwrap_or_default())],
        ],
    );

    let actions = format!(
        r#"<form method="post" action="/task/{id}">
<button name="action" value="prev">Предыдущий статус</button>
<button name="action" value="next">Следующий статус</button>
</form>"#
    );

    let window = state.db.task_history_window(id, state.config.history_limit)?;
    let history_rows: Vec<Vec<String>> = render_history(&window)
        .into_iter()
        .map(|e| vec![timestamp(&e.recorded_at), escape(&e.label), escape(&e.narration)])
        .collect();
    let history = table(&["Когда", "Событие", "Изменения"], &history_rows);

    let body = format!("{fields}{actions}<h2>История</h2>{history}");
    Ok(layout(&task.name, user.username(), &body))
}

#[derive(Debug, Deserialize)]
struct StatusAction {
    action: String,
}

async fn task_status_action(
    State(state): State<AppState>,
    _user: PageUser,
    Path(id): Path<i64>,
    Form(form): Form<StatusAction>,
) -> Result<Redirect, PageError> {
    let moved = match form.action.as_str() {
        "next" => state.db.advance_task_status(id)?,
        "prev" => state.db.retreat_task_status(id)?,
        other => {
            return Err(ApiError::Validation(taskman_core::ValidationError::single(
                "action",
                format!("unknown action '{}'", other),
            ))
            .into())
        }
    };
    found(moved, "task", id)?;
    Ok(Redirect::to(&format!("/task/{}", id)))
}

async fn project_list(State(state): State<AppState>, user: PageUser) -> PageResult {
    let projects = state.db.list_projects(PageRequest::all())?.results;
    let sprints = state
        .db
        .active_sprints_with_open_tasks(Local::now().date_naive())?;

    let project_rows: Vec<Vec<String>> = projects
        .iter()
        .map(|p| {
            vec![
                link(&format!("/project/{}", p.id), &p.name),
                if p.is_complete { "да" } else { "нет" }.to_string(),
            ]
        })
        .collect();
    let sprint_rows: Vec<Vec<String>> = sprints
        .iter()
        .map(|s| {
            vec![
                escape(&s.name),
                s.date_start.to_string(),
                s.date_end.to_string(),
                link(&format!("/project/{}", s.project_id), &s.project_id.to_string()),
            ]
        })
        .collect();

    let body = format!(
        "{}<h2>Активные спринты</h2>{}",
        table(&["Проект", "Выполнен"], &project_rows),
        table(&["Спринт", "Начало", "Окончание", "Проект"], &sprint_rows),
    );
    Ok(layout("Проекты", user.username(), &body))
}

async fn project_detail(State(state): State<AppState>, user: PageUser, Path(id): Path<i64>) -> PageResult {
    let project = found(state.db.get_project(id)?, "project", id)?;
    let sprints = state
        .db
        .list_sprints(
            &SprintFilter {
                project_id: Some(id),
                active_on: None,
            },
            PageRequest::all(),
        )?
        .results;
    let tasks = state
        .db
        .list_tasks(
            &TaskFilter {
                project_id: Some(id),
                order: TaskOrder::OpenFirst,
                ..TaskFilter::default()
            },
            PageRequest::all(),
        )?
        .results;

    let sprint_rows: Vec<Vec<String>> = sprints
        .iter()
        .map(|s| {
            vec![
                escape(&s.name),
                s.date_start.to_string(),
                s.date_end.to_string(),
                if s.is_active() { "да" } else { "нет" }.to_string(),
            ]
        })
        .collect();

    let body = format!(
        "<p>{}</p><h2>Спринты</h2>{}<h2>Задачи</h2>{}",
        escape(&project.description),
        table(&["Спринт", "Начало", "Окончание", "Активен"], &sprint_rows),
        table(&TASK_HEADERS, &task_rows(&tasks)),
    );
    Ok(layout(&project.name, user.username(), &body))
}

async fn status_list(State(state): State<AppState>, user: PageUser) -> PageResult {
    let rows: Vec<Vec<String>> = state
        .db
        .status_tree()?
        .into_iter()
        .map(|e| vec![e.status.id.to_string(), escape(&e.relative_name)])
        .collect();
    Ok(layout("Статусы", user.username(), &table(&["№", "Статус"], &rows)))
}
