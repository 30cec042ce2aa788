use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use taskman_core::models::{
    CreateSprintInput, Page, PageRequest, Sprint, SprintFilter, UpdateSprintInput,
};

use super::{found, ApiError, AppState, CurrentUser};

#[derive(Debug, Default, Deserialize)]
pub struct SprintListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub project: Option<i64>,
    pub active_on: Option<NaiveDate>,
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/sprint/", get(list).post(create))
        .route(
            "/sprint/{id}",
            get(retrieve).put(replace).patch(patch).delete(destroy),
        )
}

async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<SprintListQuery>,
) -> Result<Json<Page<Sprint>>, ApiError> {
    let filter = SprintFilter {
        project_id: query.project,
        active_on: query.active_on,
    };
    let page = state
        .db
        .list_sprints(&filter, PageRequest::new(query.limit, query.offset))?;
    Ok(Json(page))
}

async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(input): Json<CreateSprintInput>,
) -> Result<(StatusCode, Json<Sprint>), ApiError> {
    let sprint = state.db.create_sprint(input)?;
    Ok((StatusCode::CREATED, Json(sprint)))
}

async fn retrieve(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Sprint>, ApiError> {
    Ok(Json(found(state.db.get_sprint(id)?, "sprint", id)?))
}

async fn replace(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<CreateSprintInput>,
) -> Result<Json<Sprint>, ApiError> {
    Ok(Json(found(state.db.update_sprint(id, input)?, "sprint", id)?))
}

async fn patch(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateSprintInput>,
) -> Result<Json<Sprint>, ApiError> {
    Ok(Json(found(state.db.patch_sprint(id, input)?, "sprint", id)?))
}

async fn destroy(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.db.delete_sprint(id)? {
        return Err(ApiError::NotFound { entity: "sprint", id });
    }
    Ok(StatusCode::NO_CONTENT)
}
