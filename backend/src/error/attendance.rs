use thiserror::Error;

use super::AppError;

/// Failures raised by the attendance session and reporting services.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("Subject not found")]
    SubjectNotFound,
    #[error("Attendance session not found")]
    SessionNotFound,
    #[error("Attendance session is not active")]
    SessionNotActive,
    #[error("Attendance session is already completed")]
    AlreadyCompleted,
    #[error("Student is not enrolled in this session")]
    StudentNotEnrolled,
    #[error("Invalid or expired QR token, please scan again")]
    InvalidToken,
    #[error("{0}")]
    Forbidden(String),
    #[error("end_time must be after start_time")]
    InvalidWindow,
    #[error("`from` must be on or before `to`")]
    InvalidRange,
    #[error("storage failure")]
    Storage(AppError),
}

impl From<AppError> for AttendanceError {
    fn from(err: AppError) -> Self {
        AttendanceError::Storage(err)
    }
}
