use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use rand::{distributions::Alphanumeric, Rng};
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        subject::{
            CreateSubjectRequest, JoinSubjectRequest, JoinSubjectResponse, Subject,
            SubjectListQuery, UpdateSubjectRequest,
        },
        user::{User, UserRole},
    },
    repositories::SubjectFilter,
    state::AppState,
    types::{SubjectId, UserId},
    validation::rules::validate_subject_code,
};

const CODE_LENGTH: usize = 5;
const CODE_ATTEMPTS: usize = 8;

fn random_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CODE_LENGTH)
        .map(|c| char::from(c).to_ascii_uppercase())
        .collect()
}

async fn unique_code(state: &AppState) -> Result<String, AppError> {
    for _ in 0..CODE_ATTEMPTS {
        let code = random_code();
        if !state.subjects.code_exists(&code).await? {
            return Ok(code);
        }
    }
    Err(AppError::Conflict(
        "Could not allocate a unique subject code, please retry".into(),
    ))
}

async fn ensure_teacher(state: &AppState, teacher_id: UserId) -> Result<(), AppError> {
    match state.users.find_by_id(teacher_id).await? {
        Some(user) if user.role == UserRole::Teacher => Ok(()),
        Some(_) => Err(AppError::BadRequest(
            "assigned_teacher_id must reference a teacher".into(),
        )),
        None => Err(AppError::NotFound("Teacher not found".into())),
    }
}

async fn load_subject(state: &AppState, subject_id: SubjectId) -> Result<Subject, AppError> {
    state
        .subjects
        .find_by_id(subject_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Subject not found".into()))
}

/// `?code=` is an exact lookup and yields at most one subject.
pub async fn list_subjects(
    State(state): State<AppState>,
    Query(query): Query<SubjectListQuery>,
) -> Result<Json<Vec<Subject>>, AppError> {
    if let Some(code) = query.code {
        let code = code.trim().to_uppercase();
        validate_subject_code(&code)
            .map_err(|_| AppError::Validation(vec!["code: subject_code_invalid".into()]))?;
        let found = state
            .subjects
            .find_by_code(&code)
            .await?
            .filter(|subject| query.student_id.map_or(true, |id| subject.is_enrolled(&id)));
        return Ok(Json(found.into_iter().collect()));
    }

    let subjects = state
        .subjects
        .list(SubjectFilter {
            student_id: query.student_id,
            teacher_id: None,
        })
        .await?;
    Ok(Json(subjects))
}

pub async fn get_subject(
    State(state): State<AppState>,
    Path(subject_id): Path<SubjectId>,
) -> Result<Json<Subject>, AppError> {
    Ok(Json(load_subject(&state, subject_id).await?))
}

/// Teachers always become the assigned teacher of subjects they create.
pub async fn create_subject(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Json(payload): Json<CreateSubjectRequest>,
) -> Result<(StatusCode, Json<Subject>), AppError> {
    payload.validate()?;
    let assigned_teacher_id = match user.role {
        UserRole::Admin => payload.assigned_teacher_id,
        UserRole::Teacher => Some(user.id),
        UserRole::Student => {
            return Err(AppError::Forbidden(
                "Only teachers and admins can create subjects".into(),
            ))
        }
    };
    if let (UserRole::Admin, Some(teacher_id)) = (user.role, assigned_teacher_id) {
        ensure_teacher(&state, teacher_id).await?;
    }

    let code = unique_code(&state).await?;
    let subject = Subject::new(
        code,
        payload.title.trim().to_string(),
        payload.description,
        assigned_teacher_id,
    );
    let created = state.subjects.create(&subject).await?;
    tracing::info!(subject_id = %created.id, code = %created.code, "subject created");

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_subject(
    State(state): State<AppState>,
    Path(subject_id): Path<SubjectId>,
    Json(payload): Json<UpdateSubjectRequest>,
) -> Result<Json<Subject>, AppError> {
    payload.validate()?;
    let mut subject = load_subject(&state, subject_id).await?;

    if let Some(title) = payload.title {
        subject.title = title.trim().to_string();
    }
    if let Some(description) = payload.description {
        subject.description = Some(description);
    }
    if let Some(teacher_id) = payload.assigned_teacher_id {
        ensure_teacher(&state, teacher_id).await?;
        subject.assigned_teacher_id = Some(teacher_id);
    }

    let updated = state.subjects.update(&subject).await?;
    Ok(Json(updated))
}

pub async fn delete_subject(
    State(state): State<AppState>,
    Path(subject_id): Path<SubjectId>,
) -> Result<StatusCode, AppError> {
    if !state.subjects.delete(subject_id).await? {
        return Err(AppError::NotFound("Subject not found".into()));
    }
    tracing::info!(subject_id = %subject_id, "subject deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn join_subject(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(subject_id): Path<SubjectId>,
    payload: Option<Json<JoinSubjectRequest>>,
) -> Result<Json<JoinSubjectResponse>, AppError> {
    let payload = payload.map(|Json(body)| body).unwrap_or_default();
    let student_id = payload.student_id.unwrap_or(user.id);

    if student_id != user.id && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Only admins can enroll other users".into(),
        ));
    }
    if student_id == user.id && !user.is_student() {
        return Err(AppError::BadRequest("Only students can join subjects".into()));
    }
    if student_id != user.id {
        let target = state
            .users
            .find_by_id(student_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Student not found".into()))?;
        if !target.is_student() {
            return Err(AppError::BadRequest("Only students can join subjects".into()));
        }
    }

    load_subject(&state, subject_id).await?;
    let joined = state.subjects.add_student(subject_id, student_id).await?;
    let subject = load_subject(&state, subject_id).await?;
    tracing::info!(subject_id = %subject_id, student_id = %student_id, joined, "subject join");

    Ok(Json(JoinSubjectResponse { subject, joined }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_code_is_five_uppercase_alphanumerics() {
        for _ in 0..50 {
            let code = random_code();
            assert!(validate_subject_code(&code).is_ok());
            assert!(!code.chars().any(|c| c.is_ascii_lowercase()));
        }
    }
}
