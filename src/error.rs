//! # Error Handling
//!
//! Unified error taxonomy for the IAM Registry core. Every operation funnels
//! failures into [`CoreError`]; the result envelope (see [`crate::envelope`])
//! renders them as `{errorCode, message, systemMessage, errorDetails}` with
//! three-digit codes mirroring HTTP status classes.

use thiserror::Error;

use crate::policy::PolicyError;
use crate::registry::RegistryError;

/// Core error taxonomy.
///
/// `message` content is short and caller-facing; the verbose lower-level
/// detail is produced by [`CoreError::system_message`] and is intended for
/// logs and operators.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    /// Policy service returned a failure before any store write.
    #[error("policy service request failed")]
    Upstream { status: u16, body: String },
    /// The store and the policy service diverged after a partial failure;
    /// out-of-band reconciliation is required.
    #[error("{message}")]
    Integrity {
        message: String,
        orphaned_upstream_id: Option<String>,
    },
    #[error("internal error")]
    Internal(String),
}

impl CoreError {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        CoreError::Validation(message.into())
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        CoreError::NotFound(message.into())
    }

    pub fn conflict<S: Into<String>>(message: S) -> Self {
        CoreError::Conflict(message.into())
    }

    /// Three-digit error code mirroring the HTTP status class.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "400",
            CoreError::Unauthorized(_) => "401",
            CoreError::Forbidden(_) => "403",
            CoreError::NotFound(_) => "404",
            CoreError::Conflict(_) => "409",
            CoreError::Upstream { .. } => "502",
            CoreError::Integrity { .. } | CoreError::Internal(_) => "500",
        }
    }

    /// Short, actionable caller-facing message.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Upstream { .. } => "policy service request failed".to_string(),
            CoreError::Internal(_) => "an internal error occurred".to_string(),
            other => other.to_string(),
        }
    }

    /// Verbose detail for logs: wrapped error chain, upstream status and a
    /// body prefix, and explicit mention of orphaned upstream state.
    pub fn system_message(&self) -> String {
        match self {
            CoreError::Upstream { status, body } => {
                format!(
                    "policy service returned status {}: {}",
                    status,
                    truncate(body, 200)
                )
            }
            CoreError::Integrity {
                message,
                orphaned_upstream_id,
            } => match orphaned_upstream_id {
                Some(id) => format!(
                    "integrity failure: {}; orphaned upstream object {} requires reconciliation",
                    message, id
                ),
                None => format!("integrity failure: {}", message),
            },
            CoreError::Internal(detail) => format!("internal error: {}", detail),
            other => other.to_string(),
        }
    }
}

fn truncate(body: &str, max_chars: usize) -> String {
    if body.chars().count() > max_chars {
        let truncated: String = body.chars().take(max_chars).collect();
        format!("{}...", truncated)
    } else {
        body.to_string()
    }
}

fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    if let Some(code) = db_error.code() {
        let code_str = code.as_ref();
        if code_str == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&code_str) {
            return true;
        }
    }

    false
}

impl From<sea_orm::DbErr> for CoreError {
    fn from(error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            tracing::debug!(?error, "unique constraint violation detected");
            return CoreError::Conflict("resource already exists".to_string());
        }

        match error {
            sea_orm::DbErr::RecordNotFound(record) => {
                CoreError::NotFound(format!("record not found: {}", record))
            }
            other => {
                tracing::error!("database error: {:?}", other);
                CoreError::Internal(other.to_string())
            }
        }
    }
}

impl From<PolicyError> for CoreError {
    fn from(error: PolicyError) -> Self {
        match error {
            PolicyError::Http { status, body } => CoreError::Upstream { status, body },
            PolicyError::Transport(detail) => CoreError::Upstream {
                status: 0,
                body: detail,
            },
            PolicyError::Decode(detail) => CoreError::Upstream {
                status: 0,
                body: format!("malformed policy response: {}", detail),
            },
        }
    }
}

impl From<RegistryError> for CoreError {
    fn from(error: RegistryError) -> Self {
        CoreError::Internal(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_follow_http_classes() {
        assert_eq!(CoreError::validation("bad").error_code(), "400");
        assert_eq!(CoreError::Unauthorized("no".into()).error_code(), "401");
        assert_eq!(CoreError::Forbidden("no".into()).error_code(), "403");
        assert_eq!(CoreError::not_found("missing").error_code(), "404");
        assert_eq!(CoreError::conflict("dup").error_code(), "409");
        assert_eq!(
            CoreError::Upstream {
                status: 500,
                body: String::new()
            }
            .error_code(),
            "502"
        );
        assert_eq!(
            CoreError::Integrity {
                message: "diverged".into(),
                orphaned_upstream_id: None
            }
            .error_code(),
            "500"
        );
        assert_eq!(CoreError::Internal("boom".into()).error_code(), "500");
    }

    #[test]
    fn upstream_system_message_includes_status_and_body_prefix() {
        let error = CoreError::Upstream {
            status: 503,
            body: "x".repeat(300),
        };
        let message = error.system_message();
        assert!(message.contains("503"));
        assert!(message.ends_with("..."));
        // 200-char prefix, not the whole body
        assert!(message.len() < 300);
    }

    #[test]
    fn integrity_system_message_mentions_orphan() {
        let error = CoreError::Integrity {
            message: "store commit failed after policy create".into(),
            orphaned_upstream_id: Some("tenant-123".into()),
        };
        assert!(error.system_message().contains("tenant-123"));
    }

    #[test]
    fn record_not_found_maps_to_not_found() {
        let error: CoreError = sea_orm::DbErr::RecordNotFound("tnt_resource".into()).into();
        assert_eq!(error.error_code(), "404");
    }

    #[test]
    fn internal_user_message_hides_detail() {
        let error = CoreError::Internal("connection pool exhausted".into());
        assert_eq!(error.user_message(), "an internal error occurred");
        assert!(error.system_message().contains("connection pool exhausted"));
    }
}
