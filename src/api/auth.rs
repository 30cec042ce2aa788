use axum::extract::{FromRequestParts, State};
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use taskman_core::models::{AuthSession, CreateUserInput, User};

use super::{ApiError, AppState};

pub const SESSION_COOKIE: &str = "taskman_session";

/// The signed-in user behind a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

/// Bearer token first, then the session cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
        .filter(|t| !t.is_empty())
}

impl CurrentUser {
    pub fn resolve(state: &AppState, headers: &HeaderMap) -> Result<Option<Self>, ApiError> {
        let Some(token) = session_token(headers) else {
            return Ok(None);
        };
        let user = state.db.user_for_token(&token, Utc::now())?;
        Ok(user.map(|user| Self { user, token }))
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Self::resolve(state, &parts.headers)?.ok_or(ApiError::Unauthorized)
    }
}

pub fn session_cookie(session: &AuthSession) -> String {
    let max_age = (session.expires_at - session.created_at).num_seconds().max(0);
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, session.token, max_age
    )
}

pub fn clear_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Checks credentials and opens a session.
pub fn login(state: &AppState, input: &LoginInput) -> Result<(AuthSession, User), ApiError> {
    let user = state
        .db
        .verify_credentials(&input.username, &input.password)?
        .ok_or(ApiError::InvalidCredentials)?;
    let session = state.db.create_session(user.id, state.config.session_ttl())?;
    tracing::info!(user_id = user.id, "User signed in");
    Ok((session, user))
}

pub(super) fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout))
}

async fn signup(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = state.db.create_user(input)?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn login_handler(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<impl IntoResponse, ApiError> {
    let (session, user) = login(&state, &input)?;
    Ok((
        [(SET_COOKIE, session_cookie(&session))],
        Json(LoginResponse {
            token: session.token,
            user,
        }),
    ))
}

async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    state.db.delete_session(&current.token)?;
    Ok((StatusCode::NO_CONTENT, [(SET_COOKIE, clear_cookie())]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("taskman_session=from-cookie"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(session_token(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn cookie_is_found_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; taskman_session=abc; lang=ru"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn missing_credentials_yield_none() {
        assert_eq!(session_token(&HeaderMap::new()), None);
    }
}
