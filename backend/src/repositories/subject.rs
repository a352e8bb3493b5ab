//! Subjects and their enrollment rosters.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::AppError;
use crate::models::subject::Subject;
use crate::repositories::common::{conflict_on_foreign_key, conflict_on_unique, push_clause};
use crate::types::{SubjectId, UserId};

const SUBJECT_COLUMNS: &str =
    "id, code, title, description, assigned_teacher_id, created_at, updated_at";

/// Optional narrowing applied by [`SubjectRepositoryTrait::list`].
#[derive(Debug, Clone, Default)]
pub struct SubjectFilter {
    pub student_id: Option<UserId>,
    pub teacher_id: Option<UserId>,
}

/// Repository trait for subjects.
///
/// Every returned [`Subject`] carries its roster in `students`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubjectRepositoryTrait: Send + Sync {
    async fn find_by_id(&self, id: SubjectId) -> Result<Option<Subject>, AppError>;

    async fn find_by_code(&self, code: &str) -> Result<Option<Subject>, AppError>;

    async fn list(&self, filter: SubjectFilter) -> Result<Vec<Subject>, AppError>;

    async fn code_exists(&self, code: &str) -> Result<bool, AppError>;

    async fn create(&self, subject: &Subject) -> Result<Subject, AppError>;

    async fn update(&self, subject: &Subject) -> Result<Subject, AppError>;

    /// Returns `false` when nothing was deleted. Sessions referencing the
    /// subject make this a `Conflict`.
    async fn delete(&self, id: SubjectId) -> Result<bool, AppError>;

    /// Set semantics: returns `false` when the student was already enrolled.
    async fn add_student(&self, subject_id: SubjectId, student_id: UserId)
        -> Result<bool, AppError>;
}

#[derive(Debug, Clone)]
pub struct SubjectRepository {
    pool: PgPool,
}

impl SubjectRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_rosters(&self, subjects: &mut [Subject]) -> Result<(), AppError> {
        if subjects.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = subjects.iter().map(|s| s.id.to_string()).collect();
        let rows = sqlx::query_as::<_, (SubjectId, UserId)>(
            "SELECT subject_id, student_id FROM subject_students \
             WHERE subject_id = ANY($1) ORDER BY joined_at, student_id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut rosters: HashMap<SubjectId, Vec<UserId>> = HashMap::new();
        for (subject_id, student_id) in rows {
            rosters.entry(subject_id).or_default().push(student_id);
        }
        for subject in subjects.iter_mut() {
            subject.students = rosters.remove(&subject.id).unwrap_or_default();
        }
        Ok(())
    }

    async fn fetch_one_with_roster(
        &self,
        column: &str,
        value: String,
    ) -> Result<Option<Subject>, AppError> {
        let query = format!(
            "SELECT {} FROM subjects WHERE {} = $1",
            SUBJECT_COLUMNS, column
        );
        let subject = sqlx::query_as::<_, Subject>(&query)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        match subject {
            Some(subject) => {
                let mut found = [subject];
                self.attach_rosters(&mut found).await?;
                let [subject] = found;
                Ok(Some(subject))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl SubjectRepositoryTrait for SubjectRepository {
    async fn find_by_id(&self, id: SubjectId) -> Result<Option<Subject>, AppError> {
        self.fetch_one_with_roster("id", id.to_string()).await
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Subject>, AppError> {
        self.fetch_one_with_roster("code", code.trim().to_uppercase())
            .await
    }

    async fn list(&self, filter: SubjectFilter) -> Result<Vec<Subject>, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM subjects",
            SUBJECT_COLUMNS
        ));
        let mut has_clause = false;

        if let Some(teacher_id) = filter.teacher_id {
            push_clause(&mut builder, &mut has_clause);
            builder.push("assigned_teacher_id = ").push_bind(teacher_id);
        }
        if let Some(student_id) = filter.student_id {
            push_clause(&mut builder, &mut has_clause);
            builder
                .push("id IN (SELECT subject_id FROM subject_students WHERE student_id = ")
                .push_bind(student_id)
                .push(")");
        }
        builder.push(" ORDER BY created_at DESC, id");

        let mut subjects = builder
            .build_query_as::<Subject>()
            .fetch_all(&self.pool)
            .await?;
        self.attach_rosters(&mut subjects).await?;
        Ok(subjects)
    }

    async fn code_exists(&self, code: &str) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM subjects WHERE code = $1)",
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn create(&self, subject: &Subject) -> Result<Subject, AppError> {
        let query = format!(
            "INSERT INTO subjects (id, code, title, description, assigned_teacher_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {}",
            SUBJECT_COLUMNS
        );
        let created = sqlx::query_as::<_, Subject>(&query)
            .bind(subject.id)
            .bind(&subject.code)
            .bind(&subject.title)
            .bind(&subject.description)
            .bind(subject.assigned_teacher_id)
            .bind(subject.created_at)
            .bind(subject.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| conflict_on_unique(err, "Subject code already in use"))?;
        Ok(created)
    }

    async fn update(&self, subject: &Subject) -> Result<Subject, AppError> {
        let query = format!(
            "UPDATE subjects SET title = $2, description = $3, assigned_teacher_id = $4, updated_at = $5 \
             WHERE id = $1 RETURNING {}",
            SUBJECT_COLUMNS
        );
        let mut updated = sqlx::query_as::<_, Subject>(&query)
            .bind(subject.id)
            .bind(&subject.title)
            .bind(&subject.description)
            .bind(subject.assigned_teacher_id)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Subject not found".into()))?;
        updated.students = subject.students.clone();
        Ok(updated)
    }

    async fn delete(&self, id: SubjectId) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM subjects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                conflict_on_foreign_key(err, "Subject has attendance sessions and cannot be deleted")
            })?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_student(
        &self,
        subject_id: SubjectId,
        student_id: UserId,
    ) -> Result<bool, AppError> {
        let result = sqlx::query(
            "INSERT INTO subject_students (subject_id, student_id, joined_at) \
             VALUES ($1, $2, $3) ON CONFLICT (subject_id, student_id) DO NOTHING",
        )
        .bind(subject_id)
        .bind(student_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
