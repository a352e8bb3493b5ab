//! Persistence for attendance sessions, their per-student entries and the
//! records archived on completion.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgTransaction;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::error::AppError;
use crate::models::attendance_session::{
    AttendanceRecord, AttendanceSession, SessionStatus, StudentEntry, StudentStatus,
};
use crate::models::report::TimeWindow;
use crate::repositories::common::push_clause;
use crate::repositories::transaction::{begin_transaction, commit_transaction, rollback_transaction};
use crate::types::{SessionId, SubjectId, UserId};

const SESSION_COLUMNS: &str =
    "id, subject_id, start_time, end_time, created_by, status, created_at, updated_at";
const ENTRY_COLUMNS: &str =
    "session_id, student_id, status, scanned_at, updated_by, updated_at, reason, position";
const RECORD_COLUMNS: &str =
    "id, session_id, subject_id, student_id, status, start_time, end_time, scanned_at, updated_by, created_at";

/// Optional narrowing applied by [`AttendanceSessionRepositoryTrait::list`].
/// All present fields are AND-ed.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub session_id: Option<SessionId>,
    pub subject_id: Option<SubjectId>,
    /// Restricts to a set of subjects; an empty set matches nothing.
    pub subject_ids: Option<Vec<SubjectId>>,
    pub status: Option<SessionStatus>,
    pub created_by: Option<UserId>,
    /// Applied to `start_time` as `[from, to)`.
    pub window: Option<TimeWindow>,
    pub limit: Option<i64>,
}

/// A single conditional write against one student entry.
#[derive(Debug, Clone)]
pub struct EntryUpdate {
    pub session_id: SessionId,
    pub student_id: UserId,
    pub status: StudentStatus,
    pub updated_by: UserId,
    /// `None` keeps the stored reason.
    pub reason: Option<Option<String>>,
    pub at: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AttendanceSessionRepositoryTrait: Send + Sync {
    /// Persists the session row and all of its entries in one transaction.
    async fn create(&self, session: &AttendanceSession) -> Result<AttendanceSession, AppError>;

    async fn find_by_id(&self, id: SessionId) -> Result<Option<AttendanceSession>, AppError>;

    /// Sessions with entries, newest first by creation time.
    async fn list(&self, filter: SessionFilter) -> Result<Vec<AttendanceSession>, AppError>;

    /// Applies the update only while the session is active. `None` means no
    /// row matched (missing session, inactive session or unknown student).
    async fn update_entry(&self, update: EntryUpdate) -> Result<Option<StudentEntry>, AppError>;

    /// Flips `active -> completed` and archives one record per entry, in one
    /// transaction. `None` when the session was not active.
    async fn complete(
        &self,
        id: SessionId,
        at: DateTime<Utc>,
    ) -> Result<Option<(AttendanceSession, u64)>, AppError>;

    /// Flips `active -> cancelled`. `None` when the session was not active.
    async fn cancel(
        &self,
        id: SessionId,
        at: DateTime<Utc>,
    ) -> Result<Option<AttendanceSession>, AppError>;

    async fn list_records(&self, session_id: SessionId) -> Result<Vec<AttendanceRecord>, AppError>;

    async fn list_subject_records(
        &self,
        subject_id: SubjectId,
        window: Option<TimeWindow>,
    ) -> Result<Vec<AttendanceRecord>, AppError>;
}

#[derive(Debug, Clone)]
pub struct AttendanceSessionRepository {
    pool: PgPool,
}

impl AttendanceSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn attach_entries(&self, sessions: &mut [AttendanceSession]) -> Result<(), AppError> {
        if sessions.is_empty() {
            return Ok(());
        }
        let ids: Vec<String> = sessions.iter().map(|s| s.id.to_string()).collect();
        let query = format!(
            "SELECT {} FROM attendance_session_students WHERE session_id = ANY($1) \
             ORDER BY session_id, position",
            ENTRY_COLUMNS
        );
        let entries = sqlx::query_as::<_, StudentEntry>(&query)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        let mut grouped: HashMap<SessionId, Vec<StudentEntry>> = HashMap::new();
        for entry in entries {
            grouped.entry(entry.session_id).or_default().push(entry);
        }
        for session in sessions.iter_mut() {
            session.students = grouped.remove(&session.id).unwrap_or_default();
        }
        Ok(())
    }
}

async fn entries_in_tx(
    tx: &mut PgTransaction<'_>,
    session_id: SessionId,
) -> Result<Vec<StudentEntry>, AppError> {
    let query = format!(
        "SELECT {} FROM attendance_session_students WHERE session_id = $1 ORDER BY position",
        ENTRY_COLUMNS
    );
    let entries = sqlx::query_as::<_, StudentEntry>(&query)
        .bind(session_id)
        .fetch_all(&mut **tx)
        .await?;
    Ok(entries)
}

async fn transition_in_tx(
    tx: &mut PgTransaction<'_>,
    id: SessionId,
    to: SessionStatus,
    at: DateTime<Utc>,
) -> Result<Option<AttendanceSession>, AppError> {
    let query = format!(
        "UPDATE attendance_sessions SET status = $2, updated_at = $3 \
         WHERE id = $1 AND status = 'active' RETURNING {}",
        SESSION_COLUMNS
    );
    let session = sqlx::query_as::<_, AttendanceSession>(&query)
        .bind(id)
        .bind(to)
        .bind(at)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(session)
}

#[async_trait]
impl AttendanceSessionRepositoryTrait for AttendanceSessionRepository {
    async fn create(&self, session: &AttendanceSession) -> Result<AttendanceSession, AppError> {
        let mut tx = begin_transaction(&self.pool).await?;

        let query = format!(
            "INSERT INTO attendance_sessions ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {cols}",
            cols = SESSION_COLUMNS
        );
        let mut created = sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(session.id)
            .bind(session.subject_id)
            .bind(session.start_time)
            .bind(session.end_time)
            .bind(session.created_by)
            .bind(session.status)
            .bind(session.created_at)
            .bind(session.updated_at)
            .fetch_one(&mut *tx)
            .await?;

        if !session.students.is_empty() {
            let mut builder = QueryBuilder::<Postgres>::new(format!(
                "INSERT INTO attendance_session_students ({}) ",
                ENTRY_COLUMNS
            ));
            builder.push_values(session.students.iter(), |mut row, entry| {
                row.push_bind(entry.session_id)
                    .push_bind(entry.student_id)
                    .push_bind(entry.status)
                    .push_bind(entry.scanned_at)
                    .push_bind(entry.updated_by)
                    .push_bind(entry.updated_at)
                    .push_bind(entry.reason.clone())
                    .push_bind(entry.position);
            });
            builder.build().execute(&mut *tx).await?;
        }

        commit_transaction(tx).await?;
        created.students = session.students.clone();
        Ok(created)
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<AttendanceSession>, AppError> {
        let query = format!(
            "SELECT {} FROM attendance_sessions WHERE id = $1",
            SESSION_COLUMNS
        );
        let session = sqlx::query_as::<_, AttendanceSession>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match session {
            Some(session) => {
                let mut found = [session];
                self.attach_entries(&mut found).await?;
                let [session] = found;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn list(&self, filter: SessionFilter) -> Result<Vec<AttendanceSession>, AppError> {
        if matches!(&filter.subject_ids, Some(ids) if ids.is_empty()) {
            return Ok(Vec::new());
        }

        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM attendance_sessions",
            SESSION_COLUMNS
        ));
        let mut has_clause = false;

        if let Some(session_id) = filter.session_id {
            push_clause(&mut builder, &mut has_clause);
            builder.push("id = ").push_bind(session_id);
        }
        if let Some(subject_id) = filter.subject_id {
            push_clause(&mut builder, &mut has_clause);
            builder.push("subject_id = ").push_bind(subject_id);
        }
        if let Some(subject_ids) = filter.subject_ids {
            let raw: Vec<String> = subject_ids.iter().map(|id| id.to_string()).collect();
            push_clause(&mut builder, &mut has_clause);
            builder.push("subject_id = ANY(").push_bind(raw).push(")");
        }
        if let Some(status) = filter.status {
            push_clause(&mut builder, &mut has_clause);
            builder.push("status = ").push_bind(status);
        }
        if let Some(created_by) = filter.created_by {
            push_clause(&mut builder, &mut has_clause);
            builder.push("created_by = ").push_bind(created_by);
        }
        if let Some(window) = filter.window {
            push_clause(&mut builder, &mut has_clause);
            builder
                .push("start_time >= ")
                .push_bind(window.from)
                .push(" AND start_time < ")
                .push_bind(window.to);
        }
        builder.push(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(limit);
        }

        let mut sessions = builder
            .build_query_as::<AttendanceSession>()
            .fetch_all(&self.pool)
            .await?;
        self.attach_entries(&mut sessions).await?;
        Ok(sessions)
    }

    async fn update_entry(&self, update: EntryUpdate) -> Result<Option<StudentEntry>, AppError> {
        let (replace_reason, reason) = match update.reason {
            Some(reason) => (true, reason),
            None => (false, None),
        };
        let entry = sqlx::query_as::<_, StudentEntry>(
            r#"
            UPDATE attendance_session_students AS e
            SET status = $3,
                updated_by = $4,
                updated_at = $5,
                scanned_at = CASE WHEN $3 = 'present' THEN COALESCE(e.scanned_at, $5) ELSE e.scanned_at END,
                reason = CASE WHEN $6 THEN $7 ELSE e.reason END
            FROM attendance_sessions AS s
            WHERE e.session_id = $1
              AND e.student_id = $2
              AND s.id = e.session_id
              AND s.status = 'active'
            RETURNING e.session_id, e.student_id, e.status, e.scanned_at, e.updated_by,
                      e.updated_at, e.reason, e.position
            "#,
        )
        .bind(update.session_id)
        .bind(update.student_id)
        .bind(update.status)
        .bind(update.updated_by)
        .bind(update.at)
        .bind(replace_reason)
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn complete(
        &self,
        id: SessionId,
        at: DateTime<Utc>,
    ) -> Result<Option<(AttendanceSession, u64)>, AppError> {
        let mut tx = begin_transaction(&self.pool).await?;

        let Some(mut session) =
            transition_in_tx(&mut tx, id, SessionStatus::Completed, at).await?
        else {
            rollback_transaction(tx).await?;
            return Ok(None);
        };
        session.students = entries_in_tx(&mut tx, id).await?;

        let mut created = 0;
        if !session.students.is_empty() {
            let records: Vec<AttendanceRecord> = session
                .students
                .iter()
                .map(|entry| AttendanceRecord::from_entry(&session, entry, at))
                .collect();
            let mut builder = QueryBuilder::<Postgres>::new(format!(
                "INSERT INTO attendance_records ({}) ",
                RECORD_COLUMNS
            ));
            builder.push_values(records.iter(), |mut row, record| {
                row.push_bind(record.id)
                    .push_bind(record.session_id)
                    .push_bind(record.subject_id)
                    .push_bind(record.student_id)
                    .push_bind(record.status)
                    .push_bind(record.start_time)
                    .push_bind(record.end_time)
                    .push_bind(record.scanned_at)
                    .push_bind(record.updated_by)
                    .push_bind(record.created_at);
            });
            created = builder.build().execute(&mut *tx).await?.rows_affected();
        }

        commit_transaction(tx).await?;
        Ok(Some((session, created)))
    }

    async fn cancel(
        &self,
        id: SessionId,
        at: DateTime<Utc>,
    ) -> Result<Option<AttendanceSession>, AppError> {
        let mut tx = begin_transaction(&self.pool).await?;
        let Some(mut session) =
            transition_in_tx(&mut tx, id, SessionStatus::Cancelled, at).await?
        else {
            rollback_transaction(tx).await?;
            return Ok(None);
        };
        session.students = entries_in_tx(&mut tx, id).await?;
        commit_transaction(tx).await?;
        Ok(Some(session))
    }

    async fn list_records(&self, session_id: SessionId) -> Result<Vec<AttendanceRecord>, AppError> {
        let query = format!(
            "SELECT {} FROM attendance_records WHERE session_id = $1 ORDER BY student_id",
            RECORD_COLUMNS
        );
        let records = sqlx::query_as::<_, AttendanceRecord>(&query)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    async fn list_subject_records(
        &self,
        subject_id: SubjectId,
        window: Option<TimeWindow>,
    ) -> Result<Vec<AttendanceRecord>, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM attendance_records WHERE subject_id = ",
            RECORD_COLUMNS
        ));
        builder.push_bind(subject_id);
        if let Some(window) = window {
            builder
                .push(" AND start_time >= ")
                .push_bind(window.from)
                .push(" AND start_time < ")
                .push_bind(window.to);
        }
        builder.push(" ORDER BY start_time, session_id, student_id");
        let records = builder
            .build_query_as::<AttendanceRecord>()
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }
}
