use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use taskman_core::models::{CreateProjectInput, Page, PageRequest, Project, UpdateProjectInput};

use super::{found, ApiError, AppState, CurrentUser};

#[derive(Debug, Default, Deserialize)]
pub struct ProjectListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/project/", get(list).post(create))
        .route(
            "/project/{id}",
            get(retrieve).put(replace).patch(patch).delete(destroy),
        )
}

async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<ProjectListQuery>,
) -> Result<Json<Page<Project>>, ApiError> {
    let page = state
        .db
        .list_projects(PageRequest::new(query.limit, query.offset))?;
    Ok(Json(page))
}

async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(input): Json<CreateProjectInput>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let project = state.db.create_project(input)?;
    Ok((StatusCode::CREATED, Json(project)))
}

async fn retrieve(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(found(state.db.get_project(id)?, "project", id)?))
}

async fn replace(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<CreateProjectInput>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(found(state.db.update_project(id, input)?, "project", id)?))
}

async fn patch(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateProjectInput>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(found(state.db.patch_project(id, input)?, "project", id)?))
}

async fn destroy(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.db.delete_project(id)? {
        return Err(ApiError::NotFound { entity: "project", id });
    }
    Ok(StatusCode::NO_CONTENT)
}
