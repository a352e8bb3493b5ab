use axum::{
    extract::{Extension, Path, State},
    Json,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{UpdateUserRequest, User, UserResponse, UserRole},
    state::AppState,
    types::UserId,
};

pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = state.users.list().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn list_teachers(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let teachers = state.users.list_by_role(UserRole::Teacher).await?;
    Ok(Json(teachers.into_iter().map(UserResponse::from).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(user_id): Path<UserId>,
) -> Result<Json<UserResponse>, AppError> {
    if user.id != user_id && !user.is_admin() {
        return Err(AppError::Forbidden("Forbidden".into()));
    }
    let found = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(Json(UserResponse::from(found)))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(user_id): Path<UserId>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    if user.id != user_id && !user.is_admin() {
        return Err(AppError::Forbidden("Forbidden".into()));
    }
    if payload.role.is_some() && !user.is_admin() {
        return Err(AppError::Forbidden("Only admins can change roles".into()));
    }
    payload.validate()?;

    let mut target = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    if let Some(name) = payload.name {
        target.name = name.trim().to_string();
    }
    if let Some(email) = payload.email {
        target.email = email.trim().to_lowercase();
    }
    if let Some(role) = payload.role {
        target.role = role;
    }

    let updated = state.users.update(&target).await?;
    tracing::info!(user_id = %updated.id, updated_by = %user.id, "user updated");
    Ok(Json(UserResponse::from(updated)))
}
