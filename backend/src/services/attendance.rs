//! Attendance session engine: session lifecycle, QR scans and manual marks.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::{AppError, AttendanceError};
use crate::models::attendance_session::{
    AttendanceRecord, AttendanceSession, SessionListQuery, SessionStatus, StudentEntry,
    StudentStatus, UpdateStatusRequest,
};
use crate::models::subject::Subject;
use crate::models::user::{User, UserRole};
use crate::repositories::{
    AttendanceSessionRepositoryTrait, EntryUpdate, SessionFilter, SubjectFilter,
    SubjectRepositoryTrait,
};
use crate::services::authorization::authorize;
use crate::types::{SessionId, SubjectId, UserId};
use crate::utils::session_token::{IssuedSessionToken, SessionTokenCodec};

const STAFF: &[UserRole] = &[UserRole::Teacher, UserRole::Admin];
const ANYONE: &[UserRole] = &[UserRole::Student, UserRole::Teacher, UserRole::Admin];

#[derive(Clone)]
pub struct AttendanceService {
    sessions: Arc<dyn AttendanceSessionRepositoryTrait>,
    subjects: Arc<dyn SubjectRepositoryTrait>,
    tokens: SessionTokenCodec,
}

impl AttendanceService {
    pub fn new(
        sessions: Arc<dyn AttendanceSessionRepositoryTrait>,
        subjects: Arc<dyn SubjectRepositoryTrait>,
        tokens: SessionTokenCodec,
    ) -> Self {
        Self {
            sessions,
            subjects,
            tokens,
        }
    }

    /// Opens a session with one `absent` entry per enrolled student and
    /// returns it together with a freshly minted QR token.
    pub async fn create_session(
        &self,
        actor: &User,
        subject_id: SubjectId,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<(AttendanceSession, IssuedSessionToken), AttendanceError> {
        if end_time <= start_time {
            return Err(AttendanceError::InvalidWindow);
        }
        let subject = self.load_subject(subject_id).await?;
        authorize(actor, &subject, STAFF)?;

        let now = Utc::now();
        let session = AttendanceSession::new(
            subject.id,
            start_time,
            end_time,
            actor.id,
            &subject.students,
            now,
        );
        let token = self
            .tokens
            .issue(&session, now)
            .map_err(|err| AttendanceError::Storage(AppError::InternalServerError(err)))?;
        let session = self.sessions.create(&session).await?;

        tracing::info!(
            session_id = %session.id,
            subject_id = %session.subject_id,
            created_by = %actor.id,
            roster = session.students.len(),
            "attendance session created"
        );
        Ok((session, token))
    }

    /// Marks `student_id` present in the session named by `token`.
    pub async fn scan(
        &self,
        token: &str,
        student_id: UserId,
    ) -> Result<StudentEntry, AttendanceError> {
        let claims = self.tokens.verify(token)?;
        let update = EntryUpdate {
            session_id: claims.sid,
            student_id,
            status: StudentStatus::Present,
            updated_by: student_id,
            reason: None,
            at: Utc::now(),
        };
        match self.sessions.update_entry(update).await? {
            Some(entry) => {
                tracing::info!(session_id = %claims.sid, student_id = %student_id, "attendance scanned");
                Ok(entry)
            }
            None => Err(self.diagnose_rejected_entry_write(claims.sid).await),
        }
    }

    pub async fn update_student_status(
        &self,
        actor: &User,
        request: UpdateStatusRequest,
    ) -> Result<StudentEntry, AttendanceError> {
        let session = self.load_session(request.session_id).await?;
        let subject = self.load_subject(session.subject_id).await?;
        authorize(actor, &subject, STAFF)?;
        if !session.is_active() {
            return Err(AttendanceError::SessionNotActive);
        }
        if session.entry(&request.student_id).is_none() {
            return Err(AttendanceError::StudentNotEnrolled);
        }

        let update = EntryUpdate {
            session_id: session.id,
            student_id: request.student_id,
            status: request.status,
            updated_by: actor.id,
            reason: Some(request.reason),
            at: Utc::now(),
        };
        match self.sessions.update_entry(update).await? {
            Some(entry) => {
                tracing::info!(
                    session_id = %session.id,
                    student_id = %entry.student_id,
                    status = entry.status.db_value(),
                    updated_by = %actor.id,
                    "attendance status updated"
                );
                Ok(entry)
            }
            None => Err(self.diagnose_rejected_entry_write(session.id).await),
        }
    }

    /// Closes an active session and archives one record per entry.
    pub async fn complete_session(
        &self,
        actor: &User,
        session_id: SessionId,
    ) -> Result<(AttendanceSession, u64), AttendanceError> {
        let session = self.load_session(session_id).await?;
        let subject = self.load_subject(session.subject_id).await?;
        authorize(actor, &subject, STAFF)?;
        ensure_active(&session)?;

        match self.sessions.complete(session_id, Utc::now()).await? {
            Some((session, created)) => {
                tracing::info!(
                    session_id = %session.id,
                    records = created,
                    completed_by = %actor.id,
                    "attendance session completed"
                );
                Ok((session, created))
            }
            None => Err(self.diagnose_rejected_transition(session_id).await),
        }
    }

    pub async fn cancel_session(
        &self,
        actor: &User,
        session_id: SessionId,
    ) -> Result<AttendanceSession, AttendanceError> {
        let session = self.load_session(session_id).await?;
        let subject = self.load_subject(session.subject_id).await?;
        authorize(actor, &subject, STAFF)?;
        ensure_active(&session)?;

        match self.sessions.cancel(session_id, Utc::now()).await? {
            Some(session) => {
                tracing::info!(session_id = %session.id, cancelled_by = %actor.id, "attendance session cancelled");
                Ok(session)
            }
            None => Err(self.diagnose_rejected_transition(session_id).await),
        }
    }

    pub async fn get_session(
        &self,
        actor: &User,
        session_id: SessionId,
    ) -> Result<AttendanceSession, AttendanceError> {
        let session = self.load_session(session_id).await?;
        let subject = self.load_subject(session.subject_id).await?;
        authorize(actor, &subject, ANYONE)?;
        Ok(session)
    }

    /// Newest first. Non-admins only see sessions of their own subjects.
    pub async fn list_sessions(
        &self,
        actor: &User,
        query: SessionListQuery,
    ) -> Result<Vec<AttendanceSession>, AttendanceError> {
        let visible = match actor.role {
            UserRole::Admin => None,
            UserRole::Teacher => Some(SubjectFilter {
                teacher_id: Some(actor.id),
                ..Default::default()
            }),
            UserRole::Student => Some(SubjectFilter {
                student_id: Some(actor.id),
                ..Default::default()
            }),
        };
        let subject_ids = match visible {
            Some(filter) => Some(
                self.subjects
                    .list(filter)
                    .await?
                    .into_iter()
                    .map(|subject| subject.id)
                    .collect(),
            ),
            None => None,
        };

        let filter = SessionFilter {
            subject_id: query.subject_id,
            subject_ids,
            status: query.status,
            created_by: query.created_by,
            ..Default::default()
        };
        Ok(self.sessions.list(filter).await?)
    }

    pub async fn list_records(
        &self,
        actor: &User,
        session_id: SessionId,
    ) -> Result<Vec<AttendanceRecord>, AttendanceError> {
        let session = self.load_session(session_id).await?;
        let subject = self.load_subject(session.subject_id).await?;
        authorize(actor, &subject, STAFF)?;
        Ok(self.sessions.list_records(session_id).await?)
    }

    async fn load_session(&self, id: SessionId) -> Result<AttendanceSession, AttendanceError> {
        self.sessions
            .find_by_id(id)
            .await?
            .ok_or(AttendanceError::SessionNotFound)
    }

    async fn load_subject(&self, id: SubjectId) -> Result<Subject, AttendanceError> {
        self.subjects
            .find_by_id(id)
            .await?
            .ok_or(AttendanceError::SubjectNotFound)
    }

    /// Explains why a conditional entry write matched no row. Any closed
    /// session reports `SessionNotActive` here.
    async fn diagnose_rejected_entry_write(&self, session_id: SessionId) -> AttendanceError {
        match self.sessions.find_by_id(session_id).await {
            Ok(None) => AttendanceError::SessionNotFound,
            Ok(Some(session)) if session.is_active() => AttendanceError::StudentNotEnrolled,
            Ok(Some(_)) => AttendanceError::SessionNotActive,
            Err(err) => AttendanceError::Storage(err),
        }
    }

    /// Explains why a conditional `active -> *` transition matched no row.
    async fn diagnose_rejected_transition(&self, session_id: SessionId) -> AttendanceError {
        match self.sessions.find_by_id(session_id).await {
            Ok(None) => AttendanceError::SessionNotFound,
            Ok(Some(session)) => match ensure_active(&session) {
                Err(err) => err,
                Ok(()) => AttendanceError::SessionNotActive,
            },
            Err(err) => AttendanceError::Storage(err),
        }
    }
}

fn ensure_active(session: &AttendanceSession) -> Result<(), AttendanceError> {
    match session.status {
        SessionStatus::Active => Ok(()),
        SessionStatus::Completed => Err(AttendanceError::AlreadyCompleted),
        SessionStatus::Cancelled => Err(AttendanceError::SessionNotActive),
    }
}
