use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no authenticated user on request")]
    Unauthenticated,
    #[error("invalid user id header value '{0}'")]
    InvalidUserId(String),
    #[error("invalid header '{0}' with value '{1}'")]
    InvalidHeader(&'static str, String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoleParseError {
    #[error("unknown role '{0}'")]
    UnknownRole(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::Unauthenticated => (StatusCode::UNAUTHORIZED, "AUTH_REQUIRED"),
            AuthError::InvalidUserId(_) => (StatusCode::UNAUTHORIZED, "AUTH_USER"),
            AuthError::InvalidHeader(_, _) => (StatusCode::BAD_REQUEST, "AUTH_HEADER"),
        };

        let body = ErrorBody {
            code,
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
