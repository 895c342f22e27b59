//! Policy service client.
//!
//! Thin REST client for the external policy decision service. All requests
//! target `{base}/v2/{facts|schema}/{project}/{environment}/{path}` with a
//! bearer token and a 30 second timeout. Requests are never retried: a
//! timed-out mutation may have been applied upstream, and retrying would
//! double-apply it. Callers decide how to reconcile after a failure.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::metadata::PrincipalType;

/// Errors raised by policy service calls.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The service answered with a non-success status.
    #[error("policy service returned status {status}")]
    Http { status: u16, body: String },
    /// The request never completed (connect failure, timeout).
    #[error("policy service unreachable: {0}")]
    Transport(String),
    /// The service answered 2xx with a body this client cannot decode.
    #[error("malformed policy response: {0}")]
    Decode(String),
}

/// Which API family a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKind {
    /// Runtime data: tenants, resource instances, users, role assignments.
    Facts,
    /// Authorization model: roles, resource types and their actions.
    Schema,
}

impl ApiKind {
    fn segment(&self) -> &'static str {
        match self {
            ApiKind::Facts => "facts",
            ApiKind::Schema => "schema",
        }
    }
}

/// Connection settings for the policy service.
#[derive(Debug, Clone)]
pub struct PolicySettings {
    pub endpoint: Url,
    pub project: String,
    pub environment: String,
    pub token: String,
    pub timeout: Duration,
}

/// Tenant object as the policy service returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyTenant {
    pub id: Uuid,
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: serde_json::Value,
}

/// Resource instance object (accounts, org units, binding scopes).
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyResourceInstance {
    pub id: Uuid,
    pub key: String,
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default)]
    pub resource: Option<String>,
}

/// Role object from the authorization schema.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyRole {
    pub id: Uuid,
    pub key: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Role assignment fact.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyRoleAssignment {
    pub id: Uuid,
    pub user: String,
    pub role: String,
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default)]
    pub resource_instance: Option<String>,
}

/// Directory entry for a user principal.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyUser {
    pub key: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Paged list envelope used by facts list endpoints.
#[derive(Debug, Clone, Deserialize)]
struct Page<T> {
    data: Vec<T>,
    #[serde(default)]
    page_count: Option<u32>,
}

const LIST_PAGE_SIZE: u32 = 100;

/// REST client for the policy decision service.
#[derive(Debug, Clone)]
pub struct PolicyClient {
    client: Client,
    endpoint: Url,
    project: String,
    environment: String,
    token: String,
}

impl PolicyClient {
    pub fn new(settings: PolicySettings) -> Result<Self, PolicyError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| PolicyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: settings.endpoint,
            project: settings.project,
            environment: settings.environment,
            token: settings.token,
        })
    }

    fn url(&self, kind: ApiKind, path: &str) -> String {
        format!(
            "{}/v2/{}/{}/{}/{}",
            self.endpoint.as_str().trim_end_matches('/'),
            kind.segment(),
            self.project,
            self.environment,
            path
        )
    }

    /// Send one request and decode the JSON body.
    ///
    /// Single attempt by design; see the module docs.
    async fn send(
        &self,
        method: Method,
        kind: ApiKind,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, PolicyError> {
        let url = self.url(kind, path);
        debug!(%method, %url, "policy service request");

        let mut request = self.client.request(method, &url).bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PolicyError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PolicyError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(PolicyError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| PolicyError::Decode(e.to_string()))
    }

    fn decode<T: for<'de> Deserialize<'de>>(value: serde_json::Value) -> Result<T, PolicyError> {
        serde_json::from_value(value).map_err(|e| PolicyError::Decode(e.to_string()))
    }

    /// DELETE where an already-absent object counts as success.
    async fn delete_absent_ok(&self, kind: ApiKind, path: &str) -> Result<(), PolicyError> {
        match self.send(Method::DELETE, kind, path, None).await {
            Ok(_) => Ok(()),
            Err(PolicyError::Http { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                debug!(path, "policy object already absent on delete");
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    // Tenants ---------------------------------------------------------------

    pub async fn create_tenant(
        &self,
        key: &str,
        name: &str,
        attributes: serde_json::Value,
    ) -> Result<PolicyTenant, PolicyError> {
        let body = json!({ "key": key, "name": name, "attributes": attributes });
        let value = self
            .send(Method::POST, ApiKind::Facts, "tenants", Some(body))
            .await?;
        Self::decode(value)
    }

    pub async fn update_tenant(
        &self,
        id: Uuid,
        name: &str,
        attributes: serde_json::Value,
    ) -> Result<PolicyTenant, PolicyError> {
        let body = json!({ "name": name, "attributes": attributes });
        let value = self
            .send(
                Method::PATCH,
                ApiKind::Facts,
                &format!("tenants/{}", id),
                Some(body),
            )
            .await?;
        Self::decode(value)
    }

    pub async fn delete_tenant(&self, id: Uuid) -> Result<(), PolicyError> {
        self.delete_absent_ok(ApiKind::Facts, &format!("tenants/{}", id))
            .await
    }

    /// List every tenant, merging all pages.
    pub async fn list_tenants(&self) -> Result<Vec<PolicyTenant>, PolicyError> {
        let mut merged = Vec::new();
        let mut page = 1u32;
        loop {
            let value = self
                .send(
                    Method::GET,
                    ApiKind::Facts,
                    &format!(
                        "tenants?page={}&per_page={}&include_total_count=true",
                        page, LIST_PAGE_SIZE
                    ),
                    None,
                )
                .await?;
            let chunk: Page<PolicyTenant> = Self::decode(value)?;
            let page_count = chunk.page_count.unwrap_or(1);
            merged.extend(chunk.data);
            if page >= page_count {
                return Ok(merged);
            }
            page += 1;
        }
    }

    // Resource instances ----------------------------------------------------

    pub async fn create_resource_instance(
        &self,
        resource_type: &str,
        key: &str,
        tenant: &str,
        attributes: serde_json::Value,
    ) -> Result<PolicyResourceInstance, PolicyError> {
        let body = json!({
            "key": key,
            "resource": resource_type,
            "tenant": tenant,
            "attributes": attributes,
        });
        let value = self
            .send(Method::POST, ApiKind::Facts, "resource_instances", Some(body))
            .await?;
        Self::decode(value)
    }

    pub async fn update_resource_instance(
        &self,
        id: Uuid,
        attributes: serde_json::Value,
    ) -> Result<PolicyResourceInstance, PolicyError> {
        let body = json!({ "attributes": attributes });
        let value = self
            .send(
                Method::PATCH,
                ApiKind::Facts,
                &format!("resource_instances/{}", id),
                Some(body),
            )
            .await?;
        Self::decode(value)
    }

    pub async fn delete_resource_instance(&self, id: Uuid) -> Result<(), PolicyError> {
        self.delete_absent_ok(ApiKind::Facts, &format!("resource_instances/{}", id))
            .await
    }

    // Roles -----------------------------------------------------------------

    pub async fn create_role(
        &self,
        key: &str,
        name: &str,
        description: Option<&str>,
        permissions: &[String],
    ) -> Result<PolicyRole, PolicyError> {
        let body = json!({
            "key": key,
            "name": name,
            "description": description,
            "permissions": permissions,
        });
        let value = self
            .send(Method::POST, ApiKind::Schema, "roles", Some(body))
            .await?;
        Self::decode(value)
    }

    pub async fn update_role(
        &self,
        id: Uuid,
        name: &str,
        description: Option<&str>,
        permissions: &[String],
    ) -> Result<PolicyRole, PolicyError> {
        let body = json!({
            "name": name,
            "description": description,
            "permissions": permissions,
        });
        let value = self
            .send(
                Method::PATCH,
                ApiKind::Schema,
                &format!("roles/{}", id),
                Some(body),
            )
            .await?;
        Self::decode(value)
    }

    pub async fn delete_role(&self, id: Uuid) -> Result<(), PolicyError> {
        self.delete_absent_ok(ApiKind::Schema, &format!("roles/{}", id))
            .await
    }

    // Permissions (resource actions in the authorization schema) -------------

    pub async fn create_resource_action(
        &self,
        service_id: &str,
        action: &str,
        name: &str,
    ) -> Result<(), PolicyError> {
        let body = json!({ "key": action, "name": name });
        self.send(
            Method::POST,
            ApiKind::Schema,
            &format!("resources/{}/actions", service_id),
            Some(body),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_resource_action(
        &self,
        service_id: &str,
        action: &str,
    ) -> Result<(), PolicyError> {
        self.delete_absent_ok(
            ApiKind::Schema,
            &format!("resources/{}/actions/{}", service_id, action),
        )
        .await
    }

    // Role assignments --------------------------------------------------------

    pub async fn create_role_assignment(
        &self,
        principal_id: Uuid,
        principal_type: PrincipalType,
        role: &str,
        tenant: &str,
        resource_instance: Option<&str>,
    ) -> Result<PolicyRoleAssignment, PolicyError> {
        let principal_kind = match principal_type {
            PrincipalType::User => "user",
            PrincipalType::Group => "group",
        };
        let body = json!({
            principal_kind: principal_id.to_string(),
            "role": role,
            "tenant": tenant,
            "resource_instance": resource_instance,
        });
        let value = self
            .send(Method::POST, ApiKind::Facts, "role_assignments", Some(body))
            .await?;
        Self::decode(value)
    }

    pub async fn delete_role_assignment(&self, id: Uuid) -> Result<(), PolicyError> {
        self.delete_absent_ok(ApiKind::Facts, &format!("role_assignments/{}", id))
            .await
    }

    // Directory ---------------------------------------------------------------

    pub async fn get_user(&self, id: Uuid) -> Result<Option<PolicyUser>, PolicyError> {
        match self
            .send(Method::GET, ApiKind::Facts, &format!("users/{}", id), None)
            .await
        {
            Ok(value) => Ok(Some(Self::decode(value)?)),
            Err(PolicyError::Http { status, .. }) if status == 404 => Ok(None),
            Err(other) => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> PolicyClient {
        PolicyClient::new(PolicySettings {
            endpoint: Url::parse(base).unwrap(),
            project: "iam".into(),
            environment: "prod".into(),
            token: "secret".into(),
            timeout: Duration::from_secs(30),
        })
        .unwrap()
    }

    #[test]
    fn urls_follow_the_versioned_layout() {
        let client = client("https://pdp.example.com");
        assert_eq!(
            client.url(ApiKind::Facts, "tenants"),
            "https://pdp.example.com/v2/facts/iam/prod/tenants"
        );
        assert_eq!(
            client.url(ApiKind::Schema, "roles/abc"),
            "https://pdp.example.com/v2/schema/iam/prod/roles/abc"
        );
    }

    #[test]
    fn trailing_slash_on_endpoint_is_tolerated() {
        let client = client("https://pdp.example.com/");
        assert_eq!(
            client.url(ApiKind::Facts, "tenants"),
            "https://pdp.example.com/v2/facts/iam/prod/tenants"
        );
    }
}
