//! Action submission
//!
//! Builds the `ResourceActionRequest` document and posts it to the
//! catalog-service; the platform answers with a `Location` pointing at the
//! asynchronous request it created.

use serde::Serialize;
use serde_json::Value;

use super::descriptor::OrganizationInfo;
use crate::request::RequestHandle;
use crate::vra::{Result, VraClient, VraError};

/// Action names the platform uses for the built-in lifecycle operations
pub const ACTION_DESTROY: &str = "Destroy";
pub const ACTION_SHUTDOWN: &str = "Shutdown";
pub const ACTION_POWER_OFF: &str = "Power Off";
pub const ACTION_POWER_ON: &str = "Power On";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdRef {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadOrganization {
    pub tenant_ref: Option<String>,
    pub tenant_label: Option<String>,
    pub subtenant_ref: Option<String>,
    pub subtenant_label: Option<String>,
}

impl From<&OrganizationInfo> for PayloadOrganization {
    fn from(org: &OrganizationInfo) -> Self {
        Self {
            tenant_ref: org.tenant_ref.clone(),
            tenant_label: org.tenant_label.clone(),
            subtenant_ref: org.subtenant_ref.clone(),
            subtenant_label: org.subtenant_label.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestData {
    pub entries: Vec<Value>,
}

/// Body of `POST /catalog-service/api/consumer/requests` for a resource action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequestPayload {
    #[serde(rename = "@type")]
    pub request_type: &'static str,
    pub resource_ref: IdRef,
    pub resource_action_ref: IdRef,
    pub organization: PayloadOrganization,
    pub state: &'static str,
    pub request_number: u64,
    pub request_data: RequestData,
}

impl ActionRequestPayload {
    pub fn new(resource_id: &str, action_id: &str, organization: &OrganizationInfo) -> Self {
        Self {
            request_type: "ResourceActionRequest",
            resource_ref: IdRef {
                id: resource_id.to_string(),
            },
            resource_action_ref: IdRef {
                id: action_id.to_string(),
            },
            organization: organization.into(),
            state: "SUBMITTED",
            request_number: 0,
            request_data: RequestData::default(),
        }
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Submits action requests on behalf of one resource
pub struct ActionSubmitter<'a> {
    client: &'a VraClient,
    resource_id: &'a str,
    organization: &'a OrganizationInfo,
}

impl<'a> ActionSubmitter<'a> {
    pub fn new(client: &'a VraClient, resource_id: &'a str, organization: &'a OrganizationInfo) -> Self {
        Self {
            client,
            resource_id,
            organization,
        }
    }

    pub fn payload(&self, action_id: &str) -> ActionRequestPayload {
        ActionRequestPayload::new(self.resource_id, action_id, self.organization)
    }

    /// Post the action request and return a handle to the request it created
    pub async fn submit(&self, action_id: &str) -> Result<RequestHandle> {
        let body = self.payload(action_id).to_json()?;

        tracing::info!(
            "Submitting action {} for resource {}",
            action_id,
            self.resource_id
        );

        let response = self.client.post(&self.client.requests_path(), &body).await?;

        let location = response.location.as_deref().ok_or_else(|| {
            VraError::MalformedResponse("action request response has no Location header".to_string())
        })?;
        let request_id = request_id_from_location(location)?;

        tracing::info!(
            "Action {} on resource {} created request {}",
            action_id,
            self.resource_id,
            request_id
        );

        Ok(RequestHandle::new(self.client.clone(), request_id))
    }
}

/// Last non-empty path segment of a `Location` header
fn request_id_from_location(location: &str) -> Result<String> {
    let path = location.split(['?', '#']).next().unwrap_or(location);
    path.rsplit('/')
        .find(|segment| !segment.is_empty())
        .map(|segment| segment.to_string())
        .ok_or_else(|| {
            VraError::MalformedResponse(format!("cannot extract request id from Location '{}'", location))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn organization() -> OrganizationInfo {
        OrganizationInfo {
            tenant_ref: Some("vsphere.local".to_string()),
            tenant_label: Some("vsphere.local".to_string()),
            subtenant_ref: Some("bg-1".to_string()),
            subtenant_label: Some("Engineering".to_string()),
        }
    }

    #[test]
    fn test_payload_wire_shape() {
        let payload = ActionRequestPayload::new("res-1", "act-9", &organization());

        assert_eq!(
            payload.to_json().unwrap(),
            json!({
                "@type": "ResourceActionRequest",
                "resourceRef": {"id": "res-1"},
                "resourceActionRef": {"id": "act-9"},
                "organization": {
                    "tenantRef": "vsphere.local",
                    "tenantLabel": "vsphere.local",
                    "subtenantRef": "bg-1",
                    "subtenantLabel": "Engineering"
                },
                "state": "SUBMITTED",
                "requestNumber": 0,
                "requestData": {"entries": []}
            })
        );
    }

    #[test]
    fn test_payload_without_organization_emits_nulls() {
        let payload = ActionRequestPayload::new("res-1", "act-9", &OrganizationInfo::default());
        let json = payload.to_json().unwrap();

        assert_eq!(json["organization"]["tenantRef"], Value::Null);
        assert_eq!(json["organization"]["subtenantLabel"], Value::Null);
    }

    #[test]
    fn test_request_id_from_location() {
        assert_eq!(
            request_id_from_location("https://vra/catalog-service/api/consumer/requests/abc123").unwrap(),
            "abc123"
        );
        assert_eq!(request_id_from_location("/requests/abc123/").unwrap(), "abc123");
        assert_eq!(request_id_from_location("/requests/abc123?x=1").unwrap(), "abc123");
        assert!(request_id_from_location("/").is_err());
    }
}
