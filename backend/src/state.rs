use std::sync::Arc;

use crate::{
    config::Config,
    db::connection::DbPool,
    repositories::{
        AttendanceSessionRepository, AttendanceSessionRepositoryTrait, SubjectRepository,
        SubjectRepositoryTrait, UserRepository, UserRepositoryTrait,
    },
    services::{AttendanceService, ReportService},
    utils::session_token::SessionTokenCodec,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Config,
    pub users: Arc<dyn UserRepositoryTrait>,
    pub subjects: Arc<dyn SubjectRepositoryTrait>,
    pub sessions: Arc<dyn AttendanceSessionRepositoryTrait>,
    pub attendance: AttendanceService,
    pub reports: ReportService,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Self {
        let users: Arc<dyn UserRepositoryTrait> = Arc::new(UserRepository::new(pool.clone()));
        let subjects: Arc<dyn SubjectRepositoryTrait> =
            Arc::new(SubjectRepository::new(pool.clone()));
        let sessions: Arc<dyn AttendanceSessionRepositoryTrait> =
            Arc::new(AttendanceSessionRepository::new(pool.clone()));

        let attendance = AttendanceService::new(
            sessions.clone(),
            subjects.clone(),
            SessionTokenCodec::from_config(&config),
        );
        let reports = ReportService::new(
            sessions.clone(),
            subjects.clone(),
            users.clone(),
            config.time_zone,
        );

        Self {
            pool,
            config,
            users,
            subjects,
            sessions,
            attendance,
            reports,
        }
    }
}
