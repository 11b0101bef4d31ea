use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, header, request::Parts},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, sync::Arc};
use uuid::Uuid;

use crate::config::Env;

/// Header accepted as a development bypass in `Env::Local`.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Claims
///
/// Payload expected inside a session JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the user's UUID.
    pub sub: Uuid,
    /// Expiration Time (exp), seconds since the epoch.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// Credentials
///
/// Whatever the client presented with the request. Extracting it never fails; whether
/// it amounts to a session is the Auth Oracle's call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credentials {
    /// Raw bearer token from the `Authorization` header.
    pub bearer: Option<String>,
    /// Raw `x-user-id` header value.
    pub user_id: Option<String>,
}

impl Credentials {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            bearer: Some(token.into()),
            user_id: None,
        }
    }

    pub fn user_id(id: impl Into<String>) -> Self {
        Self {
            bearer: None,
            user_id: Some(id.into()),
        }
    }

    pub fn from_parts(parts: &Parts) -> Self {
        let bearer = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string);
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        Self { bearer, user_id }
    }
}

impl<S> FromRequestParts<S> for Credentials
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Credentials::from_parts(parts))
    }
}

/// Session
///
/// A valid authenticated-user context, as vouched for by the Auth Oracle.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub subject: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            expires_at: None,
        }
    }
}

/// AuthOracle
///
/// Source of truth for "is a session currently valid". Consulted on every transition;
/// callers never cache the answer.
#[async_trait]
pub trait AuthOracle: Send + Sync {
    async fn check_auth(&self, credentials: &Credentials) -> Option<Session>;
}

/// AuthState
///
/// The concrete type used to share the Auth Oracle across the application state.
pub type AuthState = Arc<dyn AuthOracle>;

/// JwtAuthOracle
///
/// Validates HS256 session tokens signed with the configured secret. In `Env::Local`
/// a well-formed UUID in `x-user-id` is accepted without a token.
pub struct JwtAuthOracle {
    decoding_key: DecodingKey,
    env: Env,
}

impl JwtAuthOracle {
    pub fn new(secret: &str, env: Env) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            env,
        }
    }
}

#[async_trait]
impl AuthOracle for JwtAuthOracle {
    async fn check_auth(&self, credentials: &Credentials) -> Option<Session> {
        // Local Development Bypass
        if self.env == Env::Local {
            if let Some(user_id) = credentials
                .user_id
                .as_deref()
                .and_then(|id| Uuid::parse_str(id).ok())
            {
                return Some(Session::new(user_id.to_string()));
            }
        }

        let token = credentials.bearer.as_deref()?;

        let mut validation = Validation::default();
        validation.validate_exp = true;

        match decode::<Claims>(token, &self.decoding_key, &validation) {
            Ok(data) => Some(Session {
                subject: data.claims.sub.to_string(),
                expires_at: DateTime::<Utc>::from_timestamp(data.claims.exp as i64, 0),
            }),
            Err(e) => {
                match e.kind() {
                    ErrorKind::ExpiredSignature => tracing::debug!("session token expired"),
                    _ => tracing::debug!("session token rejected: {}", e),
                }
                None
            }
        }
    }
}

/// AuthSession
///
/// Extractor for routes that require a valid session. Rejects with 401 otherwise.
#[derive(Debug, Clone)]
pub struct AuthSession(pub Session);

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    AuthState: FromRef<S>,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let oracle = AuthState::from_ref(state);
        let credentials = Credentials::from_parts(parts);

        oracle
            .check_auth(&credentials)
            .await
            .map(AuthSession)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
