pub mod attendance_session;
pub mod common;
pub mod subject;
pub mod transaction;
pub mod user;

pub use attendance_session::{
    AttendanceSessionRepository, AttendanceSessionRepositoryTrait, EntryUpdate, SessionFilter,
};
pub use common::*;
pub use subject::{SubjectFilter, SubjectRepository, SubjectRepositoryTrait};
pub use transaction::*;
pub use user::{UserRepository, UserRepositoryTrait};
