use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{SignInRequest, SignInResponse, SignUpRequest, User, UserResponse, UserRole},
    state::AppState,
    utils::{
        hash_password,
        jwt::{create_access_token, Claims},
        verify_password,
    },
};

pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    payload.validate()?;
    let role = payload.role.unwrap_or_default();
    if role == UserRole::Admin {
        return Err(AppError::Forbidden(
            "Admin accounts cannot be self-registered".into(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;
    let user = User::new(
        payload.name.trim().to_string(),
        payload.email,
        password_hash,
        role,
    );
    let created = state.users.create(&user).await?;
    tracing::info!(user_id = %created.id, role = created.role.as_str(), "user registered");

    Ok((StatusCode::CREATED, Json(UserResponse::from(created))))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<SignInResponse>, AppError> {
    payload.validate()?;
    let invalid = || AppError::Unauthorized("Invalid email or password".into());

    let user = state
        .users
        .find_by_email(&payload.email)
        .await?
        .ok_or_else(invalid)?;
    if !verify_password(&payload.password, &user.password_hash)? {
        tracing::warn!(user_id = %user.id, "sign-in rejected");
        return Err(invalid());
    }

    let (access_token, claims) = create_access_token(
        user.id.to_string(),
        user.email.clone(),
        user.role.as_str().to_string(),
        &state.config.jwt_secret,
        state.config.jwt_expiration_hours,
    )?;

    Ok(Json(SignInResponse {
        access_token,
        expires_at: claims.expires_at(),
        user: UserResponse::from(user),
    }))
}

pub async fn me(Extension(user): Extension<User>) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// Tokens are stateless; signing out only acknowledges the request so the
/// client can drop its copy.
pub async fn sign_out(Extension(claims): Extension<Claims>) -> Json<Value> {
    tracing::info!(user_id = %claims.sub, jti = %claims.jti, "user signed out");
    Json(json!({ "message": "Sign-out successful" }))
}
