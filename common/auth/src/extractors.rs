use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{request::Parts, HeaderMap};
use chrono::{DateTime, Utc};
use tracing::{warn, Span};
use uuid::Uuid;

use crate::error::{AuthError, AuthResult};
use crate::roles::Role;
use crate::session::{SessionState, SessionUser, UserProfile};

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const USER_EMAIL_HEADER: &str = "X-User-Email";
pub const ROLES_HEADER: &str = "X-Roles";
pub const FULL_NAME_HEADER: &str = "X-Profile-Full-Name";
pub const PHONE_HEADER: &str = "X-Profile-Phone";
pub const TERMS_VERSION_HEADER: &str = "X-Terms-Version";
pub const TERMS_ACCEPTED_AT_HEADER: &str = "X-Terms-Accepted-At";
pub const TRACE_ID_HEADER: &str = "X-Trace-ID";

/// Session forwarded by the authenticating gateway. Requests without a user
/// id yield an anonymous, settled session.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session: SessionState,
    pub trace_id: Uuid,
}

impl SessionContext {
    pub fn from_headers(headers: &HeaderMap) -> AuthResult<Self> {
        let trace_id = header_str(headers, TRACE_ID_HEADER)
            .and_then(|value| Uuid::parse_str(value).ok())
            .unwrap_or_else(Uuid::new_v4);

        let user_id = match header_str(headers, USER_ID_HEADER) {
            Some(raw) => Some(
                Uuid::parse_str(raw).map_err(|_| AuthError::InvalidUserId(raw.to_string()))?,
            ),
            None => None,
        };

        let Some(user_id) = user_id else {
            return Ok(Self {
                session: SessionState::anonymous(),
                trace_id,
            });
        };

        let user = SessionUser {
            id: user_id,
            email: header_str(headers, USER_EMAIL_HEADER).map(str::to_owned),
        };
        let roles = roles_from_headers(headers);
        let profile = UserProfile {
            id: user_id,
            full_name: header_str(headers, FULL_NAME_HEADER).map(str::to_owned),
            phone: header_str(headers, PHONE_HEADER).map(str::to_owned),
            terms_accepted_at: terms_accepted_at(headers)?,
            terms_version: header_str(headers, TERMS_VERSION_HEADER).map(str::to_owned),
        };

        Ok(Self {
            session: SessionState::authenticated(user, roles).with_profile(profile),
            trace_id,
        })
    }

    pub fn primary_role(&self) -> Option<Role> {
        self.session.primary_role()
    }
}

/// Same as [`SessionContext`] but rejects anonymous requests.
#[derive(Debug, Clone)]
pub struct RequireSession(pub SessionContext);

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn roles_from_headers(headers: &HeaderMap) -> Vec<Role> {
    let Some(csv) = header_str(headers, ROLES_HEADER) else {
        return Vec::new();
    };
    let mut roles = Vec::new();
    for item in csv.split(',').map(str::trim).filter(|item| !item.is_empty()) {
        match item.parse::<Role>() {
            Ok(role) if !roles.contains(&role) => roles.push(role),
            Ok(_) => {}
            Err(err) => warn!(%err, "ignoring unrecognised role in header"),
        }
    }
    roles
}

fn terms_accepted_at(headers: &HeaderMap) -> AuthResult<Option<DateTime<Utc>>> {
    match header_str(headers, TERMS_ACCEPTED_AT_HEADER) {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|value| Some(value.with_timezone(&Utc)))
            .map_err(|_| AuthError::InvalidHeader(TERMS_ACCEPTED_AT_HEADER, raw.to_string())),
        None => Ok(None),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = SessionContext::from_headers(&parts.headers)?;
        Span::current().record("trace_id", tracing::field::display(ctx.trace_id));
        if let Some(user_id) = ctx.session.user_id() {
            Span::current().record("user_id", tracing::field::display(user_id));
        }
        Ok(ctx)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = SessionContext::from_request_parts(parts, state).await?;
        if !ctx.session.is_authenticated() {
            return Err(AuthError::Unauthenticated);
        }
        Ok(RequireSession(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const USER: &str = "22222222-2222-2222-2222-222222222222";

    #[test]
    fn missing_user_is_anonymous() {
        let ctx = SessionContext::from_headers(&HeaderMap::new()).expect("anonymous");
        assert!(!ctx.session.is_authenticated());
        assert!(!ctx.session.loading);
    }

    #[test]
    fn parses_roles_and_profile() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static(USER));
        headers.insert(ROLES_HEADER, HeaderValue::from_static("entrepreneur, advisor,advisor"));
        headers.insert(FULL_NAME_HEADER, HeaderValue::from_static("Dana Levi"));
        headers.insert(TERMS_VERSION_HEADER, HeaderValue::from_static("1"));
        headers.insert(
            TERMS_ACCEPTED_AT_HEADER,
            HeaderValue::from_static("2024-03-01T10:00:00Z"),
        );

        let ctx = SessionContext::from_headers(&headers).expect("session");
        assert_eq!(ctx.session.roles, vec![Role::Entrepreneur, Role::Advisor]);
        assert_eq!(ctx.primary_role(), Some(Role::Advisor));
        let profile = ctx.session.profile.expect("profile");
        assert_eq!(profile.full_name.as_deref(), Some("Dana Levi"));
        assert!(profile.terms_accepted_at.is_some());
    }

    #[test]
    fn unknown_roles_are_skipped() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static(USER));
        headers.insert(ROLES_HEADER, HeaderValue::from_static("cashier,supplier"));
        let ctx = SessionContext::from_headers(&headers).expect("session");
        assert_eq!(ctx.session.roles, vec![Role::Supplier]);
    }

    #[test]
    fn malformed_user_id_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("not-a-uuid"));
        let err = SessionContext::from_headers(&headers).expect_err("should reject");
        assert!(matches!(err, AuthError::InvalidUserId(_)));
    }

    #[test]
    fn malformed_terms_timestamp_is_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static(USER));
        headers.insert(TERMS_ACCEPTED_AT_HEADER, HeaderValue::from_static("yesterday"));
        let err = SessionContext::from_headers(&headers).expect_err("should reject");
        assert!(matches!(err, AuthError::InvalidHeader(TERMS_ACCEPTED_AT_HEADER, _)));
    }
}
