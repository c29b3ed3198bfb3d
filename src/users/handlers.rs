use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{AuthUser, JwtKeys},
    error::reject,
    state::AppState,
    users::{
        dto::{AuthResponse, CreateUsersRequest, LoginRequest},
        repo_types::User,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_users))
        .route("/users/authenticate", post(authenticate))
        .route("/users/:id", get(get_user).delete(delete_user))
}

#[instrument(skip(state, _caller))]
pub async fn list_users(
    State(state): State<AppState>,
    _caller: AuthUser,
) -> Result<Json<Vec<User>>, (StatusCode, String)> {
    let users = state.users.list().await.map_err(reject)?;
    Ok(Json(users))
}

#[instrument(skip(state, _caller))]
pub async fn get_user(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<User>, (StatusCode, String)> {
    let user = state.users.get(id).await.map_err(reject)?;
    Ok(Json(user))
}

/// Registers every user in the body or none of them, issuing one token per user.
#[instrument(skip(state, caller, payload), fields(batch = payload.users.len()))]
pub async fn create_users(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<CreateUsersRequest>,
) -> Result<(StatusCode, Json<Vec<AuthResponse>>), (StatusCode, String)> {
    let created = state
        .users
        .create_many(&payload.users)
        .await
        .map_err(reject)?;

    let keys = JwtKeys::from_ref(&state);
    let mut issued = Vec::with_capacity(created.len());
    for user in created {
        let token = keys.sign(&user).map_err(|e| {
            error!(error = %e, user_id = user.id, "jwt sign failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
        })?;
        issued.push(AuthResponse { token, user });
    }

    info!(count = issued.len(), by = caller.sub, "users registered");
    Ok((StatusCode::CREATED, Json(issued)))
}

#[instrument(skip(state, caller))]
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<User>, (StatusCode, String)> {
    match state.users.delete(id).await.map_err(reject)? {
        Some(user) => {
            info!(user_id = id, by = caller.sub, "user removed");
            Ok(Json(user))
        }
        None => Err((StatusCode::NOT_FOUND, format!("user {id} not found"))),
    }
}

#[instrument(skip(state, payload), fields(username = %payload.username))]
pub async fn authenticate(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let user = state
        .users
        .authenticate(payload.username.trim(), &payload.password)
        .await
        .map_err(reject)?
        .ok_or_else(|| {
            warn!("invalid credentials");
            (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
        })?;

    let token = JwtKeys::from_ref(&state).sign(&user).map_err(|e| {
        error!(error = %e, user_id = user.id, "jwt sign failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
    })?;

    info!(user_id = user.id, "user logged in");
    Ok(Json(AuthResponse { token, user }))
}
