//! Typed resource metadata and merge semantics.
//!
//! Every resource row owns an opaque JSON blob in `tnt_resource_metadata`.
//! The blob is not free-form: each resource kind has a declared metadata
//! shape, and inputs carrying undeclared keys are rejected at the DTO
//! boundary. Reads are lenient: missing keys yield `None`, never an error,
//! so list projections cannot fail on a single bad row.
//!
//! Updates merge field-wise: only keys present in the patch overwrite, with
//! recursive overlay for `contactInfo`, `contactInfo.address`, `billingInfo`
//! and `billingInfo.billingAddress`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Postal address nested inside contact and billing info.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Address {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Address {
    /// Overlay `patch` onto `self`: present keys overwrite, absent keys keep
    /// the stored value.
    pub fn merge(&mut self, patch: Address) {
        merge_field(&mut self.street, patch.street);
        merge_field(&mut self.city, patch.city);
        merge_field(&mut self.state, patch.state);
        merge_field(&mut self.zip_code, patch.zip_code);
        merge_field(&mut self.country, patch.country);
    }
}

/// Tenant/COU contact details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContactInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

impl ContactInfo {
    pub fn merge(&mut self, patch: ContactInfo) {
        merge_field(&mut self.email, patch.email);
        merge_field(&mut self.phone_number, patch.phone_number);
        merge_nested(&mut self.address, patch.address, Address::merge);
    }
}

/// Account billing details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BillingInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<Address>,
}

impl BillingInfo {
    pub fn merge(&mut self, patch: BillingInfo) {
        merge_field(&mut self.billing_email, patch.billing_email);
        merge_field(&mut self.payment_method, patch.payment_method);
        merge_nested(&mut self.billing_address, patch.billing_address, Address::merge);
    }
}

/// Metadata shape for Tenant resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TenantMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_info: Option<ContactInfo>,
}

impl TenantMetadata {
    pub fn merge(&mut self, patch: TenantMetadata) {
        merge_field(&mut self.description, patch.description);
        merge_nested(&mut self.contact_info, patch.contact_info, ContactInfo::merge);
    }
}

/// Metadata shape for Account resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AccountMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_info: Option<BillingInfo>,
}

impl AccountMetadata {
    pub fn merge(&mut self, patch: AccountMetadata) {
        merge_field(&mut self.description, patch.description);
        merge_nested(&mut self.billing_info, patch.billing_info, BillingInfo::merge);
    }
}

/// Metadata shape for ClientOrganizationUnit resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CouMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CouMetadata {
    pub fn merge(&mut self, patch: CouMetadata) {
        merge_field(&mut self.description, patch.description);
    }
}

/// Metadata shape for the Root resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RootMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Principal kind for bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrincipalType {
    User,
    Group,
}

/// Metadata shape for Binding resources.
///
/// There is no dedicated binding table; the triple lives in the metadata
/// blob of the binding's resource row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BindingMetadata {
    pub principal_id: Uuid,
    pub principal_type: PrincipalType,
    pub role_id: Uuid,
    pub scope_ref_id: Uuid,
    pub version: i32,
}

fn merge_field<T>(stored: &mut Option<T>, patch: Option<T>) {
    if let Some(value) = patch {
        *stored = Some(value);
    }
}

fn merge_nested<T>(stored: &mut Option<T>, patch: Option<T>, merge: impl FnOnce(&mut T, T)) {
    if let Some(patch_value) = patch {
        match stored {
            Some(stored_value) => merge(stored_value, patch_value),
            None => *stored = Some(patch_value),
        }
    }
}

/// Parse a stored metadata blob leniently: absent keys become `None`, and a
/// blob that no longer matches the declared shape degrades to the default
/// rather than failing the read.
pub fn parse_lenient<T: for<'de> Deserialize<'de> + Default>(value: &serde_json::Value) -> T {
    serde_json::from_value(value.clone()).unwrap_or_default()
}
