use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use taskman_core::models::{
    CreateStatusInput, Page, PageRequest, Status, StatusFilter, StatusTreeEntry, UpdateStatusInput,
};

use super::{found, ApiError, AppState, CurrentUser};

#[derive(Debug, Default, Deserialize)]
pub struct StatusListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub parent: Option<i64>,
    /// Only statuses without a parent.
    #[serde(default)]
    pub root: bool,
}

impl StatusListQuery {
    fn filter(&self) -> StatusFilter {
        let parent_id = match (self.root, self.parent) {
            (true, _) => Some(None),
            (false, Some(id)) => Some(Some(id)),
            (false, None) => None,
        };
        StatusFilter { parent_id }
    }
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/status/", get(list).post(create))
        .route("/status/tree", get(tree))
        .route(
            "/status/{id}",
            get(retrieve).put(replace).patch(patch).delete(destroy),
        )
}

async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<StatusListQuery>,
) -> Result<Json<Page<Status>>, ApiError> {
    let page = state
        .db
        .list_statuses(&query.filter(), PageRequest::new(query.limit, query.offset))?;
    Ok(Json(page))
}

async fn tree(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<StatusTreeEntry>>, ApiError> {
    Ok(Json(state.db.status_tree()?))
}

async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(input): Json<CreateStatusInput>,
) -> Result<(StatusCode, Json<Status>), ApiError> {
    let status = state.db.create_status(input)?;
    Ok((StatusCode::CREATED, Json(status)))
}

async fn retrieve(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Status>, ApiError> {
    Ok(Json(found(state.db.get_status(id)?, "status", id)?))
}

async fn replace(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<CreateStatusInput>,
) -> Result<Json<Status>, ApiError> {
    Ok(Json(found(state.db.update_status(id, input)?, "status", id)?))
}

async fn patch(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
    Json(input): Json<UpdateStatusInput>,
) -> Result<Json<Status>, ApiError> {
    Ok(Json(found(state.db.patch_status(id, input)?, "status", id)?))
}

async fn destroy(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if !state.db.delete_status(id)? {
        return Err(ApiError::NotFound { entity: "status", id });
    }
    Ok(StatusCode::NO_CONTENT)
}
