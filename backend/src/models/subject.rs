//! Subjects (courses) and their enrollment rosters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::types::{SubjectId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Subject {
    pub id: SubjectId,
    /// Five character enrollment code, unique across subjects.
    pub code: String,
    pub title: String,
    pub description: Option<String>,
    pub assigned_teacher_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Enrolled students, loaded from `subject_students`.
    #[sqlx(skip)]
    pub students: Vec<UserId>,
}

impl Subject {
    pub fn new(
        code: String,
        title: String,
        description: Option<String>,
        assigned_teacher_id: Option<UserId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SubjectId::new(),
            code,
            title,
            description,
            assigned_teacher_id,
            created_at: now,
            updated_at: now,
            students: Vec::new(),
        }
    }

    pub fn roster_size(&self) -> usize {
        self.students.len()
    }

    pub fn is_enrolled(&self, student_id: &UserId) -> bool {
        self.students.contains(student_id)
    }

    pub fn is_assigned_to(&self, teacher_id: &UserId) -> bool {
        self.assigned_teacher_id.as_ref() == Some(teacher_id)
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSubjectRequest {
    #[validate(length(min = 2, max = 255))]
    pub title: String,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
    pub assigned_teacher_id: Option<UserId>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateSubjectRequest {
    #[validate(length(min = 2, max = 255))]
    pub title: Option<String>,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
    pub assigned_teacher_id: Option<UserId>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct JoinSubjectRequest {
    /// Student to enroll. Defaults to the caller; only admins may enroll others.
    #[serde(default)]
    pub student_id: Option<UserId>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JoinSubjectResponse {
    pub subject: Subject,
    /// `false` when the student was already on the roster.
    pub joined: bool,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct SubjectListQuery {
    pub code: Option<String>,
    pub student_id: Option<UserId>,
}
