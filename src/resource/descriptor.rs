//! Resource Descriptor
//!
//! Typed view over the JSON document the catalog-service returns for a
//! resource. The platform schema is loose: almost every section is optional,
//! and semi-structured attributes (power state, NICs) live in
//! `resourceData.entries` as typed literals. Decoding happens once per fetch;
//! accessors on [`ResourceHandle`](super::ResourceHandle) read these structs.


use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::vra::{Result, VraError};

/// Resource type ids that denote a virtual machine
pub const VM_RESOURCE_TYPES: &[&str] = &["Infrastructure.Virtual", "Infrastructure.Cloud"];

/// `resourceData` key carrying the machine power state
pub const MACHINE_STATUS_KEY: &str = "MachineStatus";

/// `resourceData` key carrying the network interface list
pub const NETWORK_LIST_KEY: &str = "NETWORK_LIST";

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Whether a descriptor carries everything the action workflow reads.
///
/// Descriptors obtained from the bulk listing omit `operations`; those are
/// `Partial` until re-fetched by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    Partial,
    Complete,
}

/// Decoded resource descriptor
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    /// Request that provisioned this resource
    pub request_id: Option<String>,
    pub resource_type_ref: Option<Reference>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub organization: OrganizationInfo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub catalog_item: CatalogItemInfo,
    pub owners: Option<Vec<Owner>>,
    pub operations: Option<Vec<Operation>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub resource_data: ResourceData,
}

impl Descriptor {
    /// Decode a raw platform document
    pub fn decode(raw: &Value) -> Result<Self> {
        let id = raw
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("<unknown>");

        if !raw.is_object() {
            return Err(VraError::malformed(id, "descriptor is not a JSON object"));
        }

        Self::deserialize(raw).map_err(|e| VraError::malformed(id, e.to_string()))
    }

    pub fn completeness(&self) -> Completeness {
        if self.operations.is_some() {
            Completeness::Complete
        } else {
            Completeness::Partial
        }
    }

    /// First `resourceData` entry with the given key
    pub fn resource_data_entry(&self, key: &str) -> Option<&ResourceDataEntry> {
        self.resource_data.entries.iter().find(|e| e.key == key)
    }

    /// NICs from the `NETWORK_LIST` entry, in platform order
    pub fn network_interfaces(&self) -> Option<Vec<NetworkInterface>> {
        let network_list = self.resource_data_entry(NETWORK_LIST_KEY)?;

        let nics = network_list
            .value
            .items
            .iter()
            .map(|item| NetworkInterface::from_entries(&item.values.entries))
            .collect();

        Some(nics)
    }
}

/// `{id, label}` reference (resource type)
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Reference {
    pub id: Option<String>,
    pub label: Option<String>,
}

/// Tenant / business group the resource belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationInfo {
    pub tenant_ref: Option<String>,
    pub tenant_label: Option<String>,
    pub subtenant_ref: Option<String>,
    pub subtenant_label: Option<String>,
}

/// Catalog item the resource was requested from
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CatalogItemInfo {
    pub id: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    #[serde(rename = "ref", default)]
    pub reference: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub tenant_name: Option<String>,
}

/// An action the platform allows against the resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    pub binding_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResourceData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub entries: Vec<ResourceDataEntry>,
}

/// One key/value pair of `resourceData`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResourceDataEntry {
    #[serde(default)]
    pub key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: TypedValue,
}

impl ResourceDataEntry {
    /// Scalar payload as a string, if it is one
    pub fn as_str(&self) -> Option<&str> {
        self.value.value.as_ref().and_then(Value::as_str)
    }
}

/// Platform typed literal: `{"type": "string", "value": ...}` for scalars,
/// `{"type": "multiple", "items": [...]}` for lists of complex values
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TypedValue {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub value: Option<Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub items: Vec<ComplexItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ComplexItem {
    #[serde(default, deserialize_with = "null_as_default")]
    pub values: ResourceData,
}

/// One NIC, flattened from its `resourceData` entries in platform order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkInterface {
    entries: Vec<(String, Value)>,
}

impl NetworkInterface {
    fn from_entries(entries: &[ResourceDataEntry]) -> Self {
        let entries = entries
            .iter()
            .map(|e| (e.key.clone(), e.value.value.clone().unwrap_or(Value::Null)))
            .collect();
        Self { entries }
    }

    /// First entry stored under `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    pub fn name(&self) -> Option<&str> {
        self.get_str("NETWORK_NAME")
    }

    pub fn address(&self) -> Option<&str> {
        self.get_str("NETWORK_ADDRESS")
    }

    pub fn mac_address(&self) -> Option<&str> {
        self.get_str("NETWORK_MAC_ADDRESS")
    }
}
