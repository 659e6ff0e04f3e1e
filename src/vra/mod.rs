//! vRA API interaction module
//!
//! This module provides the transport layer for talking to the vRealize
//! Automation catalog-service API: a thin HTTP wrapper that turns non-2xx
//! responses into typed errors, and a client that knows the base URL, the
//! bearer token and the catalog-service paths.
//!
//! # Module Structure
//!
//! - [`client`] - Main vRA client for making API requests
//! - [`http`] - HTTP utilities for REST API calls
//! - [`error`] - Error kinds shared by the whole crate
//!
//! # Example
//!
//! ```ignore
//! use vra_resource::vra::VraClient;
//!
//! async fn example() -> vra_resource::Result<()> {
//!     let client = VraClient::new("https://vra.example.com", Some(token), true)?;
//!     let resources = client.get(&client.resources_path()).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod http;

pub use client::VraClient;
pub use error::{Result, VraError};
