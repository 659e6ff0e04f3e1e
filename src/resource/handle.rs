//! Resource Handle
//!
//! One catalog-service resource: its cached descriptor, derived fields,
//! action lookup and action submission.

use serde_json::Value;

use super::action::{
    ActionSubmitter, ACTION_DESTROY, ACTION_POWER_OFF, ACTION_POWER_ON, ACTION_SHUTDOWN,
};
use super::descriptor::{
    CatalogItemInfo, Completeness, Descriptor, NetworkInterface, Operation, OrganizationInfo,
    Owner, MACHINE_STATUS_KEY, VM_RESOURCE_TYPES,
};
use super::fetcher::{fetch_all_resources, name_matches, DEFAULT_PAGE_SIZE};
use crate::poll::{poll_until, PollPolicy};
use crate::request::RequestHandle;
use crate::vra::{Result, VraClient, VraError};

const TURNING_ON_STATES: &[&str] = &["TurningOn", "MachineActivated"];
const TURNING_OFF_STATES: &[&str] = &["TurningOff", "ShuttingDown"];

/// A single resource managed through the catalog-service
#[derive(Clone)]
pub struct ResourceHandle {
    client: VraClient,
    id: String,
    raw: Value,
    descriptor: Descriptor,
}

impl std::fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("id", &self.id)
            .field("name", &self.descriptor.name)
            .field("completeness", &self.completeness())
            .finish()
    }
}

impl ResourceHandle {
    /// Build a handle from exactly one of `id` or `descriptor`.
    ///
    /// With an id the descriptor is fetched immediately; with a descriptor no
    /// network access happens. Supplying both or neither fails with
    /// [`VraError::InvalidArgument`] before touching the network.
    pub async fn new(client: VraClient, id: Option<&str>, descriptor: Option<Value>) -> Result<Self> {
        let id = id.filter(|id| !id.is_empty());
        match (id, descriptor) {
            (Some(id), None) => Self::by_id(client, id).await,
            (None, Some(descriptor)) => Self::from_descriptor(client, descriptor),
            (Some(_), Some(_)) => Err(VraError::InvalidArgument(
                "supply either a resource id or a descriptor, not both".to_string(),
            )),
            (None, None) => Err(VraError::InvalidArgument(
                "a resource id or a descriptor is required".to_string(),
            )),
        }
    }

    /// Fetch a resource by id
    pub async fn by_id(client: VraClient, id: &str) -> Result<Self> {
        if id.is_empty() {
            return Err(VraError::InvalidArgument("resource id is empty".to_string()));
        }

        let raw = fetch_descriptor(&client, id).await?;
        let descriptor = Descriptor::decode(&raw)?;

        Ok(Self {
            client,
            id: id.to_string(),
            raw,
            descriptor,
        })
    }

    /// Wrap an already-fetched descriptor; `id` is taken from it
    pub fn from_descriptor(client: VraClient, raw: Value) -> Result<Self> {
        let descriptor = Descriptor::decode(&raw)?;
        let id = descriptor
            .id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| VraError::malformed("<unknown>", "descriptor has no id"))?;

        Ok(Self {
            client,
            id,
            raw,
            descriptor,
        })
    }

    /// First resource whose name contains `name`, ignoring case.
    ///
    /// The match is a substring match, not equality: "web" finds
    /// "webserver01". `name` is taken literally: regex patterns such as
    /// `web.*01` are not interpreted and only match names that contain that
    /// exact text. Only the first match in listing order is returned.
    pub async fn by_name(client: VraClient, name: &str) -> Result<Option<Self>> {
        Self::by_name_paged(client, name, DEFAULT_PAGE_SIZE).await
    }

    /// [`by_name`](Self::by_name) with an explicit listing page size
    pub async fn by_name_paged(client: VraClient, name: &str, page_size: u32) -> Result<Option<Self>> {
        if name.trim().is_empty() {
            return Err(VraError::InvalidArgument("resource name is empty".to_string()));
        }

        let resources = fetch_all_resources(&client, page_size).await?;
        let found = resources.into_iter().find(|resource| {
            resource
                .get("name")
                .and_then(Value::as_str)
                .is_some_and(|candidate| name_matches(candidate, name))
        });

        match found {
            Some(raw) => Self::from_descriptor(client, raw).map(Some),
            None => {
                tracing::debug!("No resource matching '{}'", name);
                Ok(None)
            }
        }
    }

    /// Re-fetch the descriptor by id
    pub async fn refresh(&mut self) -> Result<()> {
        let raw = fetch_descriptor(&self.client, &self.id).await?;
        self.descriptor = Descriptor::decode(&raw)?;
        self.raw = raw;
        Ok(())
    }

    /// Re-fetch once if the descriptor is [`Completeness::Partial`]
    pub async fn ensure_complete(&mut self) -> Result<()> {
        if self.completeness() == Completeness::Partial {
            tracing::warn!("Descriptor for {} has no operations, re-fetching", self.id);
            self.refresh().await?;
        }
        Ok(())
    }

    pub fn completeness(&self) -> Completeness {
        self.descriptor.completeness()
    }

    // =========================================================================
    // Descriptor fields
    // =========================================================================

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw descriptor as returned by the platform
    pub fn descriptor(&self) -> &Value {
        &self.raw
    }

    pub fn client(&self) -> &VraClient {
        &self.client
    }

    pub fn name(&self) -> Option<&str> {
        self.descriptor.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.descriptor.description.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.descriptor.status.as_deref()
    }

    pub fn resource_type(&self) -> Option<&str> {
        self.descriptor
            .resource_type_ref
            .as_ref()
            .and_then(|r| r.id.as_deref())
    }

    pub fn is_vm(&self) -> bool {
        self.resource_type()
            .is_some_and(|t| VM_RESOURCE_TYPES.contains(&t))
    }

    /// Request that provisioned this resource
    pub fn request_id(&self) -> Option<&str> {
        self.descriptor.request_id.as_deref()
    }

    /// Organization block; empty when the descriptor has none
    pub fn organization(&self) -> &OrganizationInfo {
        &self.descriptor.organization
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.organization().tenant_ref.as_deref()
    }

    pub fn tenant_name(&self) -> Option<&str> {
        self.organization().tenant_label.as_deref()
    }

    pub fn subtenant_id(&self) -> Option<&str> {
        self.organization().subtenant_ref.as_deref()
    }

    pub fn subtenant_name(&self) -> Option<&str> {
        self.organization().subtenant_label.as_deref()
    }

    /// Catalog item block; empty when the descriptor has none
    pub fn catalog_item(&self) -> &CatalogItemInfo {
        &self.descriptor.catalog_item
    }

    pub fn catalog_id(&self) -> Option<&str> {
        self.catalog_item().id.as_deref()
    }

    pub fn catalog_name(&self) -> Option<&str> {
        self.catalog_item().label.as_deref()
    }

    pub fn owner_ids(&self) -> Result<Vec<&str>> {
        Ok(self.owners()?.iter().map(|o| o.reference.as_str()).collect())
    }

    pub fn owner_names(&self) -> Result<Vec<&str>> {
        Ok(self.owners()?.iter().map(|o| o.value.as_str()).collect())
    }

    fn owners(&self) -> Result<&[Owner]> {
        self.descriptor
            .owners
            .as_deref()
            .ok_or_else(|| VraError::malformed(&self.id, "descriptor has no owners list"))
    }

    // =========================================================================
    // Machine state
    // =========================================================================

    /// `MachineStatus` resource-data value
    pub fn machine_status(&self) -> Result<&str> {
        let entry = self
            .descriptor
            .resource_data_entry(MACHINE_STATUS_KEY)
            .ok_or_else(|| VraError::malformed(&self.id, "no MachineStatus entry available"))?;

        entry
            .as_str()
            .ok_or_else(|| VraError::malformed(&self.id, "MachineStatus value is not a string"))
    }

    pub fn is_machine_on(&self) -> Result<bool> {
        Ok(self.machine_status()? == "On")
    }

    pub fn is_machine_off(&self) -> Result<bool> {
        Ok(self.machine_status()? == "Off")
    }

    pub fn is_machine_turning_on(&self) -> Result<bool> {
        Ok(TURNING_ON_STATES.contains(&self.machine_status()?))
    }

    pub fn is_machine_turning_off(&self) -> Result<bool> {
        Ok(TURNING_OFF_STATES.contains(&self.machine_status()?))
    }

    pub fn is_machine_in_provisioned_state(&self) -> Result<bool> {
        Ok(self.machine_status()? == "MachineProvisioned")
    }

    /// NICs in platform order; `None` for non-VMs or when no `NETWORK_LIST`
    /// entry exists
    pub fn network_interfaces(&self) -> Option<Vec<NetworkInterface>> {
        if !self.is_vm() {
            return None;
        }
        self.descriptor.network_interfaces()
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Operations available on the resource.
    ///
    /// Descriptors from the bulk listing lack `operations`; those trigger one
    /// re-fetch. `None` if the platform still reports none.
    pub async fn actions(&mut self) -> Result<Option<&[Operation]>> {
        self.ensure_complete().await?;
        Ok(self.descriptor.operations.as_deref())
    }

    /// Id of the first operation named exactly `name`
    pub async fn action_id_by_name(&mut self, name: &str) -> Result<Option<String>> {
        let Some(actions) = self.actions().await? else {
            return Ok(None);
        };

        Ok(actions
            .iter()
            .find(|op| op.name == name)
            .map(|op| op.id.clone()))
    }

    pub async fn destroy(&mut self) -> Result<RequestHandle> {
        self.submit_named_action(ACTION_DESTROY).await
    }

    pub async fn shutdown(&mut self) -> Result<RequestHandle> {
        self.submit_named_action(ACTION_SHUTDOWN).await
    }

    pub async fn poweroff(&mut self) -> Result<RequestHandle> {
        self.submit_named_action(ACTION_POWER_OFF).await
    }

    pub async fn poweron(&mut self) -> Result<RequestHandle> {
        self.submit_named_action(ACTION_POWER_ON).await
    }

    /// Resolve `name` to an action id and submit it
    pub async fn submit_named_action(&mut self, name: &str) -> Result<RequestHandle> {
        let Some(action_id) = self.action_id_by_name(name).await? else {
            return Err(VraError::NotFound {
                what: format!("action '{}'", name),
                id: self.id.clone(),
            });
        };

        self.submit_action(&action_id).await
    }

    /// Submit an action by its platform id
    pub async fn submit_action(&self, action_id: &str) -> Result<RequestHandle> {
        self.submitter().submit(action_id).await
    }

    pub fn submitter(&self) -> ActionSubmitter<'_> {
        ActionSubmitter::new(&self.client, &self.id, self.organization())
    }

    // =========================================================================
    // IP polling
    // =========================================================================

    /// Wait until the platform reports at least one IP address.
    ///
    /// Uses [`PollPolicy::default`], which never gives up; prefer
    /// [`wait_for_ip_addresses`](Self::wait_for_ip_addresses) with a bound.
    pub async fn ip_addresses(&self) -> Result<Option<Vec<String>>> {
        self.wait_for_ip_addresses(&PollPolicy::default()).await
    }

    /// Poll the provisioning request's resource views until one reports an
    /// IP address. `None` without network access for non-VMs and resources
    /// without NICs.
    pub async fn wait_for_ip_addresses(&self, policy: &PollPolicy) -> Result<Option<Vec<String>>> {
        if !self.network_interfaces().is_some_and(|nics| !nics.is_empty()) {
            return Ok(None);
        }

        let request_id = self
            .request_id()
            .ok_or_else(|| VraError::malformed(&self.id, "descriptor has no requestId"))?;

        let client = &self.client;
        let what = format!("IP address of resource {}", self.id);

        let addresses = poll_until(policy, &what, move || async move {
            let views = client
                .get(&client.request_resource_views_path(request_id))
                .await?;
            let found = ip_addresses_from_views(&views);
            Ok((!found.is_empty()).then_some(found))
        })
        .await?;

        tracing::info!("Resource {} has IP address(es) {:?}", self.id, addresses);
        Ok(Some(addresses))
    }
}

async fn fetch_descriptor(client: &VraClient, id: &str) -> Result<Value> {
    match client.get(&client.resource_path(id)).await {
        Err(err) if err.is_not_found() => Err(VraError::NotFound {
            what: "resource".to_string(),
            id: id.to_string(),
        }),
        other => other,
    }
}

/// Non-empty `content[].data.ip_address` values of a resourceViews response
fn ip_addresses_from_views(views: &Value) -> Vec<String> {
    views
        .get("content")
        .and_then(Value::as_array)
        .map(|content| {
            content
                .iter()
                .filter_map(|view| view.pointer("/data/ip_address").and_then(Value::as_str))
                .filter(|addr| !addr.is_empty())
                .map(|addr| addr.to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> VraClient {
        // Nothing listens here; tests that reach the network would fail
        VraClient::new("http://127.0.0.1:9", None, true).unwrap()
    }

    fn vm_descriptor() -> Value {
        json!({
            "id": "res-1",
            "name": "webserver01",
            "description": "front end",
            "status": "ACTIVE",
            "requestId": "req-1",
            "resourceTypeRef": {"id": "Infrastructure.Virtual", "label": "Virtual Machine"},
            "organization": {
                "tenantRef": "vsphere.local",
                "tenantLabel": "vsphere.local",
                "subtenantRef": "bg-1",
                "subtenantLabel": "Engineering"
            },
            "catalogItem": {"id": "cat-1", "label": "CentOS 7"},
            "owners": [
                {"ref": "a", "value": "Alice", "type": "USER"},
                {"ref": "b", "value": "Bob", "type": "USER"}
            ],
            "operations": [
                {"id": "op-destroy", "name": "Destroy"},
                {"id": "op-on", "name": "Power On"}
            ],
            "resourceData": {"entries": [
                {"key": "MachineStatus", "value": {"type": "string", "value": "On"}},
                {"key": "NETWORK_LIST", "value": {"type": "multiple", "items": [
                    {"type": "complex", "values": {"entries": [
                        {"key": "NETWORK_NAME", "value": {"type": "string", "value": "VM Network"}}
                    ]}}
                ]}}
            ]}
        })
    }

    fn handle(descriptor: Value) -> ResourceHandle {
        ResourceHandle::from_descriptor(client(), descriptor).unwrap()
    }

    fn with_status(status: &str) -> ResourceHandle {
        let mut descriptor = vm_descriptor();
        descriptor["resourceData"]["entries"][0]["value"]["value"] = json!(status);
        handle(descriptor)
    }

    #[tokio::test]
    async fn test_new_rejects_both_id_and_descriptor() {
        let err = ResourceHandle::new(client(), Some("res-1"), Some(vm_descriptor()))
            .await
            .unwrap_err();
        assert!(matches!(err, VraError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_new_rejects_neither() {
        let err = ResourceHandle::new(client(), None, None).await.unwrap_err();
        assert!(matches!(err, VraError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_new_with_descriptor_takes_its_id() {
        let resource = ResourceHandle::new(client(), None, Some(vm_descriptor()))
            .await
            .unwrap();
        assert_eq!(resource.id(), "res-1");
        assert_eq!(resource.descriptor()["name"], "webserver01");
    }

    #[test]
    fn test_descriptor_without_id_is_malformed() {
        let err = ResourceHandle::from_descriptor(client(), json!({"name": "x"})).unwrap_err();
        assert!(matches!(err, VraError::MalformedDescriptor { .. }));
    }

    #[test]
    fn test_direct_fields() {
        let resource = handle(vm_descriptor());
        assert_eq!(resource.name(), Some("webserver01"));
        assert_eq!(resource.description(), Some("front end"));
        assert_eq!(resource.status(), Some("ACTIVE"));
        assert_eq!(resource.catalog_id(), Some("cat-1"));
        assert_eq!(resource.catalog_name(), Some("CentOS 7"));
        assert_eq!(resource.tenant_id(), Some("vsphere.local"));
        assert_eq!(resource.subtenant_name(), Some("Engineering"));
    }

    #[test]
    fn test_is_vm_by_resource_type() {
        assert!(handle(vm_descriptor()).is_vm());

        let mut cloud = vm_descriptor();
        cloud["resourceTypeRef"]["id"] = json!("Infrastructure.Cloud");
        assert!(handle(cloud).is_vm());

        let mut other = vm_descriptor();
        other["resourceTypeRef"]["id"] = json!("Infrastructure.Network.Network");
        assert!(!handle(other).is_vm());
    }

    #[test]
    fn test_missing_organization_yields_no_values() {
        let mut descriptor = vm_descriptor();
        descriptor.as_object_mut().unwrap().remove("organization");
        descriptor.as_object_mut().unwrap().remove("catalogItem");
        let resource = handle(descriptor);

        assert_eq!(resource.tenant_id(), None);
        assert_eq!(resource.tenant_name(), None);
        assert_eq!(resource.subtenant_id(), None);
        assert_eq!(resource.subtenant_name(), None);
        assert_eq!(resource.catalog_id(), None);
    }

    #[test]
    fn test_owners_preserve_order() {
        let resource = handle(vm_descriptor());
        assert_eq!(resource.owner_ids().unwrap(), vec!["a", "b"]);
        assert_eq!(resource.owner_names().unwrap(), vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_missing_owners_is_an_error() {
        let mut descriptor = vm_descriptor();
        descriptor.as_object_mut().unwrap().remove("owners");
        let resource = handle(descriptor);

        assert!(matches!(
            resource.owner_ids(),
            Err(VraError::MalformedDescriptor { .. })
        ));
    }

    #[test]
    fn test_machine_state_classifiers() {
        assert!(with_status("On").is_machine_on().unwrap());
        assert!(with_status("Off").is_machine_off().unwrap());
        assert!(with_status("TurningOn").is_machine_turning_on().unwrap());
        assert!(with_status("MachineActivated").is_machine_turning_on().unwrap());
        assert!(with_status("TurningOff").is_machine_turning_off().unwrap());
        assert!(with_status("ShuttingDown").is_machine_turning_off().unwrap());
        assert!(with_status("MachineProvisioned")
            .is_machine_in_provisioned_state()
            .unwrap());

        let unknown = with_status("Rebooting");
        assert!(!unknown.is_machine_on().unwrap());
        assert!(!unknown.is_machine_off().unwrap());
        assert!(!unknown.is_machine_turning_on().unwrap());
    }

    #[test]
    fn test_machine_status_missing_is_malformed() {
        let mut descriptor = vm_descriptor();
        descriptor["resourceData"] = json!({"entries": []});
        let resource = handle(descriptor);

        assert!(matches!(
            resource.machine_status(),
            Err(VraError::MalformedDescriptor { .. })
        ));
    }

    #[test]
    fn test_network_interfaces_only_for_vms() {
        let resource = handle(vm_descriptor());
        let nics = resource.network_interfaces().unwrap();
        assert_eq!(nics.len(), 1);
        assert_eq!(nics[0].name(), Some("VM Network"));

        let mut other = vm_descriptor();
        other["resourceTypeRef"]["id"] = json!("Infrastructure.Network.Network");
        assert!(handle(other).network_interfaces().is_none());
    }

    #[tokio::test]
    async fn test_action_id_by_name_exact_match() {
        let mut resource = handle(vm_descriptor());
        assert_eq!(
            resource.action_id_by_name("Destroy").await.unwrap().as_deref(),
            Some("op-destroy")
        );
        assert_eq!(resource.action_id_by_name("destroy").await.unwrap(), None);
        assert_eq!(resource.action_id_by_name("Reboot").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_named_action_is_not_found() {
        let mut resource = handle(vm_descriptor());
        match resource.shutdown().await.unwrap_err() {
            VraError::NotFound { what, id } => {
                assert_eq!(what, "action 'Shutdown'");
                assert_eq!(id, "res-1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            resource.poweroff().await,
            Err(VraError::NotFound { .. })
        ));
    }

    #[test]
    fn test_submitter_payload_references_resource_and_action() {
        let resource = handle(vm_descriptor());
        let payload = resource.submitter().payload("op-on");

        assert_eq!(payload.resource_ref.id, "res-1");
        assert_eq!(payload.resource_action_ref.id, "op-on");
        assert_eq!(payload.organization.subtenant_ref.as_deref(), Some("bg-1"));
    }

    #[tokio::test]
    async fn test_ip_addresses_skip_non_vms_without_network() {
        let mut descriptor = vm_descriptor();
        descriptor["resourceTypeRef"]["id"] = json!("Infrastructure.Network.Network");
        let resource = handle(descriptor);

        // Client points at a closed port, so reaching the network would error
        assert_eq!(resource.ip_addresses().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ip_addresses_skip_vms_without_nics() {
        let mut descriptor = vm_descriptor();
        descriptor["resourceData"]["entries"]
            .as_array_mut()
            .unwrap()
            .truncate(1);
        let resource = handle(descriptor);

        assert_eq!(resource.ip_addresses().await.unwrap(), None);
    }

    #[test]
    fn test_ip_addresses_from_views_skips_blank_entries() {
        let views = json!({"content": [
            {"data": {"ip_address": ""}},
            {"data": {"ip_address": "10.0.0.5"}},
            {"data": {}},
            {"resourceId": "x"},
            {"data": {"ip_address": "10.0.0.6"}}
        ]});
        assert_eq!(ip_addresses_from_views(&views), vec!["10.0.0.5", "10.0.0.6"]);
        assert!(ip_addresses_from_views(&json!({})).is_empty());
    }
}
