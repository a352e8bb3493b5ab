pub mod attendance;
pub mod auth;
pub mod health;
pub mod reports;
pub mod subjects;
pub mod users;
