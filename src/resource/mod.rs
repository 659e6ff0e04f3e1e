//! Resource abstraction layer
//!
//! This module models one catalog-service resource and the workflow for
//! invoking lifecycle actions against it.
//!
//! # Architecture
//!
//! - [`descriptor`] - Typed view over the platform's resource document
//! - [`handle`] - [`ResourceHandle`]: construction, accessors, action lookup, IP polling
//! - [`action`] - Builds and submits `ResourceActionRequest` payloads
//! - [`fetcher`] - Paginated resource listing backing name lookup
//!
//! # Example
//!
//! ```ignore
//! use vra_resource::{ResourceHandle, VraClient};
//!
//! async fn power_on(client: VraClient) -> vra_resource::Result<()> {
//!     let mut vm = ResourceHandle::by_id(client, "0b8c8e4a-...").await?;
//!     let request = vm.poweron().await?;
//!     println!("submitted request {}", request.id());
//!     Ok(())
//! }
//! ```

pub mod action;
pub mod descriptor;
pub mod fetcher;
pub mod handle;

pub use action::{ActionRequestPayload, ActionSubmitter};
pub use descriptor::{
    CatalogItemInfo, Completeness, Descriptor, NetworkInterface, Operation, OrganizationInfo,
    Owner,
};
pub use fetcher::fetch_all_resources;
pub use handle::ResourceHandle;
