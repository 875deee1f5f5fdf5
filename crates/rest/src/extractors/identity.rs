//! Caller identity extractor.
//!
//! Authentication happens upstream: a trusted proxy sets `X-User-Id` and
//! `X-User-Roles`, and this extractor only reads them back.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Header carrying comma-separated role names.
pub const USER_ROLES_HEADER: &str = "x-user-roles";

/// The caller of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    user_id: Option<String>,
    roles: Vec<String>,
}

impl Identity {
    /// An unauthenticated caller.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// An authenticated caller without roles.
    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            roles: Vec::new(),
        }
    }

    /// Adds a role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Reads the identity headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let user_id = headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from);

        let roles = headers
            .get(USER_ROLES_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|roles| {
                roles
                    .split(',')
                    .map(str::trim)
                    .filter(|role| !role.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Self { user_id, roles }
    }

    /// The user id, when authenticated.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Roles held by the caller.
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// True when a user id was provided.
    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    /// True when the caller holds `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Identity::from_headers(&parts.headers))
    }
}
