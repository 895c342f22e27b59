//! Operation result envelope.
//!
//! Every query and mutation answers with the same wrapper: a success payload
//! carrying a list of projected resources, or an error payload carrying the
//! three-digit code, the caller-facing message and the operator-facing
//! system message. Handlers always answer HTTP 200; the envelope itself is
//! the outcome channel.

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::CoreError;
use crate::projection::ResourceView;

/// Successful operation: a message and zero or more projected resources.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SuccessEnvelope {
    pub is_success: bool,
    pub message: String,
    pub data: Vec<ResourceView>,
}

/// Failed operation: code, messages and optional machine-readable details.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub is_success: bool,
    pub error_code: String,
    pub message: String,
    pub system_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<serde_json::Value>,
    /// Correlation id of the request that failed, when one is active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

/// The uniform response wrapper for all operations.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum OperationResult {
    Success(SuccessEnvelope),
    Error(ErrorEnvelope),
}

impl OperationResult {
    pub fn success<S: Into<String>>(message: S, data: Vec<ResourceView>) -> Self {
        OperationResult::Success(SuccessEnvelope {
            is_success: true,
            message: message.into(),
            data,
        })
    }

    pub fn success_one<S: Into<String>>(message: S, resource: ResourceView) -> Self {
        Self::success(message, vec![resource])
    }

    /// Success with an empty data list (deletes, root queries with no rows).
    pub fn success_empty<S: Into<String>>(message: S) -> Self {
        Self::success(message, Vec::new())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OperationResult::Success(_))
    }
}

impl From<&CoreError> for OperationResult {
    fn from(error: &CoreError) -> Self {
        let error_details = match error {
            CoreError::Upstream { status, .. } => {
                Some(serde_json::json!({ "upstreamStatus": status }))
            }
            CoreError::Integrity {
                orphaned_upstream_id: Some(id),
                ..
            } => Some(serde_json::json!({ "orphanedUpstreamId": id })),
            _ => None,
        };
        OperationResult::Error(ErrorEnvelope {
            is_success: false,
            error_code: error.error_code().to_string(),
            message: error.user_message(),
            system_message: error.system_message(),
            error_details,
            trace_id: crate::telemetry::current_trace_id(),
        })
    }
}

impl From<CoreError> for OperationResult {
    fn from(error: CoreError) -> Self {
        OperationResult::from(&error)
    }
}

impl From<Result<OperationResult, CoreError>> for OperationResult {
    fn from(result: Result<OperationResult, CoreError>) -> Self {
        match result {
            Ok(envelope) => envelope,
            Err(error) => OperationResult::from(error),
        }
    }
}

impl IntoResponse for OperationResult {
    fn into_response(self) -> Response {
        if let OperationResult::Error(ref envelope) = self {
            tracing::warn!(
                error_code = %envelope.error_code,
                system_message = %envelope.system_message,
                "operation failed"
            );
        }
        Json(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::{PermissionView, ResourceView};
    use uuid::Uuid;

    #[test]
    fn success_envelope_wire_shape() {
        let view = ResourceView::Permission(PermissionView {
            id: Uuid::new_v4(),
            service_id: "billing".into(),
            action: "read".into(),
            name: "billing:read".into(),
        });
        let value = serde_json::to_value(OperationResult::success_one("created", view)).unwrap();

        assert_eq!(value["isSuccess"], true);
        assert_eq!(value["message"], "created");
        assert_eq!(value["data"][0]["type"], "Permission");
        assert_eq!(value["data"][0]["serviceId"], "billing");
        assert!(value.get("errorCode").is_none());
    }

    #[test]
    fn error_envelope_wire_shape() {
        let error = CoreError::not_found("tenant not found");
        let value = serde_json::to_value(OperationResult::from(error)).unwrap();

        assert_eq!(value["isSuccess"], false);
        assert_eq!(value["errorCode"], "404");
        assert_eq!(value["message"], "tenant not found");
        assert!(value.get("data").is_none());
    }

    #[test]
    fn upstream_error_carries_status_detail() {
        let error = CoreError::Upstream {
            status: 503,
            body: "unavailable".into(),
        };
        let value = serde_json::to_value(OperationResult::from(error)).unwrap();

        assert_eq!(value["errorCode"], "502");
        assert_eq!(value["errorDetails"]["upstreamStatus"], 503);
        assert_eq!(value["message"], "policy service request failed");
    }

    #[tokio::test]
    async fn error_envelope_picks_up_the_active_trace_id() {
        use crate::telemetry::{TraceContext, with_trace_context};

        let context = TraceContext {
            trace_id: "req-1234".to_string(),
        };
        let value = with_trace_context(context, async {
            serde_json::to_value(OperationResult::from(CoreError::not_found("gone"))).unwrap()
        })
        .await;

        assert_eq!(value["traceId"], "req-1234");

        // Outside a request scope the field is omitted entirely.
        let bare =
            serde_json::to_value(OperationResult::from(CoreError::not_found("gone"))).unwrap();
        assert!(bare.get("traceId").is_none());
    }

    #[test]
    fn integrity_error_names_orphan() {
        let error = CoreError::Integrity {
            message: "store commit failed after policy create".into(),
            orphaned_upstream_id: Some("t-42".into()),
        };
        let value = serde_json::to_value(OperationResult::from(error)).unwrap();

        assert_eq!(value["errorCode"], "500");
        assert_eq!(value["errorDetails"]["orphanedUpstreamId"], "t-42");
        assert!(
            value["systemMessage"]
                .as_str()
                .unwrap()
                .contains("t-42")
        );
    }
}
