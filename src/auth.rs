//! Caller identity extraction.
//!
//! Identity arrives on trusted headers set by the gateway in front of this
//! service: `X-Caller-Id` names the acting principal and `X-Tenant-Id`
//! narrows list queries to one tenant. A missing caller header falls back to
//! the literal `system` identity used by provisioning jobs.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::coordinator::RequestContext;
use crate::envelope::OperationResult;
use crate::error::CoreError;

pub const CALLER_HEADER: &str = "x-caller-id";
pub const TENANT_HEADER: &str = "x-tenant-id";

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = OperationResult;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller_id = parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("system")
            .to_string();

        let tenant_id = match parts.headers.get(TENANT_HEADER) {
            None => None,
            Some(value) => {
                let raw = value.to_str().map_err(|_| {
                    OperationResult::from(&CoreError::validation(
                        "X-Tenant-Id header is not valid UTF-8",
                    ))
                })?;
                let parsed = raw.trim().parse().map_err(|_| {
                    OperationResult::from(&CoreError::validation(
                        "X-Tenant-Id header is not a valid UUID",
                    ))
                })?;
                Some(parsed)
            }
        };

        Ok(RequestContext { caller_id, tenant_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use uuid::Uuid;

    async fn extract(req: Request<()>) -> Result<RequestContext, OperationResult> {
        let (mut parts, _) = req.into_parts();
        RequestContext::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn missing_caller_header_falls_back_to_system() {
        let req = Request::builder().body(()).unwrap();
        let ctx = extract(req).await.unwrap();
        assert_eq!(ctx.caller_id, "system");
        assert!(ctx.tenant_id.is_none());
    }

    #[tokio::test]
    async fn headers_populate_the_context() {
        let tenant = Uuid::new_v4();
        let req = Request::builder()
            .header(CALLER_HEADER, "alice")
            .header(TENANT_HEADER, tenant.to_string())
            .body(())
            .unwrap();
        let ctx = extract(req).await.unwrap();
        assert_eq!(ctx.caller_id, "alice");
        assert_eq!(ctx.tenant_id, Some(tenant));
    }

    #[tokio::test]
    async fn malformed_tenant_header_is_rejected() {
        let req = Request::builder()
            .header(TENANT_HEADER, "not-a-uuid")
            .body(())
            .unwrap();
        assert!(extract(req).await.is_err());
    }
}
