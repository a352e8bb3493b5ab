use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        attendance_session::{
            AttendanceRecord, AttendanceSession, CompleteSessionResponse, CreateSessionRequest,
            CreateSessionResponse, ScanRequest, SessionListQuery, StudentEntry,
            UpdateStatusRequest,
        },
        user::User,
    },
    state::AppState,
    types::SessionId,
};

pub async fn create_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), AppError> {
    let (session, token) = state
        .attendance
        .create_session(&user, payload.subject_id, payload.start_time, payload.end_time)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session,
            qr_token: token.token,
            token_expires_at: token.expires_at,
        }),
    ))
}

/// Unauthenticated: the signed QR token is the credential.
pub async fn scan(
    State(state): State<AppState>,
    Json(payload): Json<ScanRequest>,
) -> Result<Json<StudentEntry>, AppError> {
    payload.validate()?;
    let entry = state
        .attendance
        .scan(payload.qr_token.trim(), payload.student_id)
        .await?;
    Ok(Json(entry))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(mut payload): Json<UpdateStatusRequest>,
) -> Result<Json<StudentEntry>, AppError> {
    payload.validate()?;
    payload.reason = payload
        .reason
        .map(|reason| reason.trim().to_string())
        .filter(|reason| !reason.is_empty());
    let entry = state
        .attendance
        .update_student_status(&user, payload)
        .await?;
    Ok(Json(entry))
}

pub async fn complete_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<CompleteSessionResponse>, AppError> {
    let (session, records_created) = state
        .attendance
        .complete_session(&user, session_id)
        .await?;
    Ok(Json(CompleteSessionResponse {
        session,
        records_created,
    }))
}

pub async fn cancel_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<AttendanceSession>, AppError> {
    let session = state.attendance.cancel_session(&user, session_id).await?;
    Ok(Json(session))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Query(query): Query<SessionListQuery>,
) -> Result<Json<Vec<AttendanceSession>>, AppError> {
    let sessions = state.attendance.list_sessions(&user, query).await?;
    Ok(Json(sessions))
}

pub async fn get_session(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<AttendanceSession>, AppError> {
    let session = state.attendance.get_session(&user, session_id).await?;
    Ok(Json(session))
}

pub async fn list_session_records(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(session_id): Path<SessionId>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    let records = state.attendance.list_records(&user, session_id).await?;
    Ok(Json(records))
}
