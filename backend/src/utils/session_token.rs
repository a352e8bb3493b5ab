//! Signed QR tokens that let students mark themselves present.
//!
//! Tokens are HS256 JWTs carrying the session identity. They are never
//! persisted and expire independently of the session's `end_time`.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::AttendanceError;
use crate::models::attendance_session::AttendanceSession;
use crate::types::{SessionId, SubjectId};

pub const SESSION_TOKEN_AUDIENCE: &str = "attendance-scan";

/// Longest accepted QR token lifetime: one year.
pub const MAX_TTL_MINUTES: u64 = 525_600;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sid: SessionId,
    pub subject_id: SubjectId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
}

#[derive(Debug, Clone)]
pub struct IssuedSessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionTokenCodec {
    secret: String,
    ttl: Duration,
}

impl SessionTokenCodec {
    pub fn new(secret: impl Into<String>, ttl_minutes: u64) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::minutes(ttl_minutes.min(MAX_TTL_MINUTES) as i64),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.qr_token_secret.clone(),
            config.qr_token_expiration_minutes,
        )
    }

    pub fn issue(
        &self,
        session: &AttendanceSession,
        issued_at: DateTime<Utc>,
    ) -> anyhow::Result<IssuedSessionToken> {
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .ok_or_else(|| anyhow::anyhow!("session token expiry is out of range"))?;
        let claims = SessionClaims {
            sid: session.id,
            subject_id: session.subject_id,
            start_time: session.start_time,
            end_time: session.end_time,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            aud: SESSION_TOKEN_AUDIENCE.to_string(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or(expires_at);

        Ok(IssuedSessionToken { token, expires_at })
    }

    /// Checks signature, expiry and audience. Any failure is `InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AttendanceError> {
        let mut validation = Validation::default();
        validation.set_audience(&[SESSION_TOKEN_AUDIENCE]);
        validation.leeway = 0;

        decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|err| {
            tracing::debug!(error = %err, "session token rejected");
            AttendanceError::InvalidToken
        })
    }
}
