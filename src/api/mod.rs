//! HTTP surface: the REST resources under `/api` and the HTML pages.

mod auth;
mod error;
mod projects;
mod sprints;
mod statuses;
mod tasks;

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use taskman_core::Database;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::web;

pub use auth::{
    clear_cookie, login, session_cookie, session_token, CurrentUser, LoginInput, SESSION_COOKIE,
};
pub use error::{found, ApiError};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(tasks::routes())
        .merge(projects::routes())
        .merge(sprints::routes())
        .merge(statuses::routes());

    Router::new()
        .nest("/api", api)
        .merge(web::routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
