use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use taskman_core::history::render_history;
use taskman_core::models::{
    CreateTaskInput, HistoryEntry, Page, PageRequest, Task, TaskFilter, TaskOrder, UpdateTaskInput,
};

use super::{found, ApiError, AppState, CurrentUser};

#[derive(Debug, Default, Deserialize)]
pub struct TaskListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub project: Option<i64>,
    pub sprint: Option<i64>,
    pub status: Option<i64>,
    pub executor: Option<i64>,
    pub is_complete: Option<bool>,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/task/", get(list).post(create))
        .route(
            "/task/{id}",
            get(retrieve).put(replace).patch(patch).delete(destroy),
        )
        .route("/task/{id}/history", get(history))
        .route("/task/{id}/status/next", post(next_status))
        .route("/task/{id}/status/prev", post(prev_status))
}

async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<Page<Task>>, ApiError> {
    let filter = TaskFilter {
        project_id: query.project,
        sprint_id: query.sprint,
        status_id: query.status,
        executor_id: query.executor,
        is_complete: query.is_complete,
        order: TaskOrder::Id,
    };
    let page = state
        .db
        .list_tasks(&filter, PageRequest::new(query.limit, query.offset))?;
    Ok(Json(page))
}

async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(input): Json<CreateTaskInput>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = state.db.create_task(input)?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn retrieve(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(found(state.db.get_task(id)?, "task", id)?))
}

async fn replace(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<CreateTaskInput>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(found(state.db.update_task(id, input)?, "task", id)?))
}

async fn patch(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateTaskInput>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(found(state.db.patch_task(id, input)?, "task", id)?))
}

async fn destroy(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.db.delete_task(id)? {
        return Err(ApiError::NotFound { entity: "task", id });
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Served from the snapshots alone, so it outlives the task.
async fn history(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let window = state.db.task_history_window(id, state.config.history_limit)?;
    if window.snapshots.is_empty() {
        return Err(ApiError::NotFound { entity: "task", id });
    }
    Ok(Json(render_history(&window)))
}

async fn next_status(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(found(state.db.advance_task_status(id)?, "task", id)?))
}

async fn prev_status(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(found(state.db.retreat_task_status(id)?, "task", id)?))
}
