//! Unified application error model and mapping helpers.
//! One enum is shared by the dispatcher, the renderers and both frontends
//! (HTTP and CLI), with a stable `code` for clients and an HTTP mapping.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// Query id missing, non-numeric or outside the catalog range.
    InvalidRequest { code: String, message: String },
    /// Well-formed id with no catalog entry.
    NotFound { code: String, message: String },
    /// The stored procedure call failed. `code` carries the SQLSTATE when the
    /// database reported one.
    Backend { code: String, message: String },
    /// A renderer's positional shape does not match the result fields.
    ShapeMismatch { code: String, message: String },
    Config { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::InvalidRequest { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Backend { code, .. }
            | AppError::ShapeMismatch { code, .. }
            | AppError::Config { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::InvalidRequest { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Backend { message, .. }
            | AppError::ShapeMismatch { message, .. }
            | AppError::Config { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn invalid<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::InvalidRequest { code: code.into(), message: msg.into() } }
    pub fn not_found<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn backend<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Backend { code: code.into(), message: msg.into() } }
    pub fn shape<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::ShapeMismatch { code: code.into(), message: msg.into() } }
    pub fn config<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Config { code: code.into(), message: msg.into() } }
    pub fn internal<C: Into<String>, M: Into<String>>(code: C, msg: M) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::InvalidRequest { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::ShapeMismatch { .. } => 422,
            AppError::Backend { .. } => 502,
            AppError::Config { .. } => 500,
            AppError::Internal { .. } => 500,
        }
    }

    /// Inverse of `http_status`, for errors reported by a remote server.
    pub fn from_status(status: u16, code: String, message: String) -> Self {
        match status {
            400 => AppError::InvalidRequest { code, message },
            404 => AppError::NotFound { code, message },
            422 => AppError::ShapeMismatch { code, message },
            502 => AppError::Backend { code, message },
            _ => AppError::Internal { code, message },
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<tokio_postgres::Error> for AppError {
    fn from(err: tokio_postgres::Error) -> Self {
        // Keep the SQLSTATE as the code so logs and clients can tell SQL errors
        // from connectivity failures.
        let code = err
            .code()
            .map(|c| c.code().to_string())
            .unwrap_or_else(|| "backend_error".to_string());
        let message = match err.as_db_error() {
            Some(db) => format!("{}: {}", db.severity(), db.message()),
            None => {
                let mut msg = err.to_string();
                let mut source = std::error::Error::source(&err);
                while let Some(cause) = source {
                    msg.push_str(": ");
                    msg.push_str(&cause.to_string());
                    source = cause.source();
                }
                msg
            }
        };
        AppError::Backend { code, message }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config { code: "invalid_json".into(), message: err.to_string() }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let code = if err.is_connect() || err.is_timeout() { "remote_unreachable" } else { "remote_error" };
        AppError::Backend { code: code.into(), message: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::invalid("invalid_query_id", "oops").http_status(), 400);
        assert_eq!(AppError::not_found("not_found", "missing").http_status(), 404);
        assert_eq!(AppError::shape("shape_mismatch", "bad").http_status(), 422);
        assert_eq!(AppError::backend("08006", "down").http_status(), 502);
        assert_eq!(AppError::config("bad_flag", "nope").http_status(), 500);
        assert_eq!(AppError::internal("internal", "panic").http_status(), 500);
    }

    #[test]
    fn status_round_trips_for_remote_errors() {
        for e in [
            AppError::invalid("invalid_query_id", "x"),
            AppError::not_found("query_not_found", "x"),
            AppError::backend("42883", "x"),
        ] {
            let back = AppError::from_status(e.http_status(), e.code_str().to_string(), e.message().to_string());
            assert_eq!(back, e);
        }
        assert!(matches!(AppError::from_status(500, "internal_panic".into(), "boom".into()), AppError::Internal { .. }));
    }

    #[test]
    fn display_joins_code_and_message() {
        let e = AppError::invalid("missing_query_id", "queryId is required");
        assert_eq!(e.to_string(), "missing_query_id: queryId is required");
    }

    #[test]
    fn serializes_with_type_tag() {
        let v = serde_json::to_value(AppError::not_found("not_found", "no entry")).unwrap();
        assert_eq!(v["type"], "not_found");
        assert_eq!(v["code"], "not_found");
        assert_eq!(v["message"], "no entry");
    }
}
