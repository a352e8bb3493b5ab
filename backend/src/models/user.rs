//! Models that represent users, authentication payloads, and role metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::types::UserId;
use crate::validation::rules::validate_person_name;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
/// Database representation of an account in the directory.
pub struct User {
    /// Unique identifier for the user.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Lowercased login email, unique across the directory.
    pub email: String,
    /// Argon2 hash of the user's password.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Role describing the user's privileges.
    pub role: UserRole,
    /// Creation timestamp for auditing.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp for auditing.
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type, ToSchema, Default)]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
/// Supported user roles stored in the database.
pub enum UserRole {
    /// Enrolled learner; may only scan and read their own sessions.
    #[default]
    Student,
    /// Runs sessions for the subjects assigned to them.
    Teacher,
    /// Unrestricted access to every subject and the dashboard.
    Admin,
}

impl UserRole {
    /// Returns the canonical snake_case representation of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Teacher => "teacher",
            UserRole::Admin => "admin",
        }
    }
}

impl Serialize for UserRole {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for UserRole {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        match s.to_ascii_lowercase().as_str() {
            "student" => Ok(UserRole::Student),
            "teacher" => Ok(UserRole::Teacher),
            "admin" => Ok(UserRole::Admin),
            _ => Err(serde::de::Error::unknown_variant(
                &s,
                &["student", "teacher", "admin"],
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
/// Payload for registering a new account.
pub struct SignUpRequest {
    #[validate(custom(function = "validate_person_name"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    /// Defaults to `student`. Admin accounts cannot be self-registered.
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
/// Credentials submitted by a user attempting to authenticate.
pub struct SignInRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Default, Serialize, Deserialize, Validate, ToSchema)]
/// Partial profile update. Only admins may change `role`.
pub struct UpdateUserRequest {
    #[validate(custom(function = "validate_person_name"))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
/// Access token returned after a successful sign-in.
pub struct SignInResponse {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Public-facing representation of a user returned by the API.
pub struct UserResponse {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

impl User {
    /// Constructs a new user with a freshly generated identifier.
    pub fn new(name: String, email: String, password_hash: String, role: UserRole) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            name,
            email: email.trim().to_lowercase(),
            password_hash,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }

    pub fn is_teacher(&self) -> bool {
        matches!(self.role, UserRole::Teacher)
    }

    pub fn is_student(&self) -> bool {
        matches!(self.role, UserRole::Student)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn user_role_serde_accepts_any_casing_and_emits_snake_case() {
        let t: UserRole = serde_json::from_str("\"teacher\"").unwrap();
        let a: UserRole = serde_json::from_str("\"ADMIN\"").unwrap();
        assert_eq!(t, UserRole::Teacher);
        assert_eq!(a, UserRole::Admin);
        assert!(serde_json::from_str::<UserRole>("\"janitor\"").is_err());

        let s = serde_json::to_value(UserRole::Student).unwrap();
        assert_eq!(s, Value::String("student".into()));
    }

    #[test]
    fn user_new_normalizes_email() {
        let user = User::new(
            "Alice".into(),
            "  Alice@Example.COM ".into(),
            "hash".into(),
            UserRole::Teacher,
        );
        assert_eq!(user.email, "alice@example.com");
        assert!(user.is_teacher());
        assert!(!user.is_admin());
    }

    #[test]
    fn user_serialization_hides_password_hash() {
        let user = User::new("Bob".into(), "bob@example.com".into(), "secret".into(), UserRole::Student);
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        let resp: UserResponse = user.into();
        assert_eq!(resp.role, UserRole::Student);
    }

    #[test]
    fn sign_up_validation_rejects_bad_email() {
        let payload = SignUpRequest {
            name: "Carol".into(),
            email: "not-an-email".into(),
            password: "secret123".into(),
            role: None,
        };
        assert!(payload.validate().is_err());
    }

    #[test]
    fn update_user_validation_checks_only_present_fields() {
        assert!(UpdateUserRequest::default().validate().is_ok());

        let blank_name = UpdateUserRequest {
            name: Some("  ".into()),
            ..Default::default()
        };
        assert!(blank_name.validate().is_err());

        let bad_email = UpdateUserRequest {
            email: Some("nope".into()),
            ..Default::default()
        };
        assert!(bad_email.validate().is_err());
    }
}
