//! vRA Client
//!
//! Main client for interacting with the vRA catalog-service API, combining
//! the base URL, bearer token and HTTP functionality.

use serde_json::Value;
use url::Url;

use super::error::Result;
use super::http::{HttpResponse, VraHttpClient};

/// Consumer-facing catalog-service API root
const CATALOG_CONSUMER_PATH: &str = "catalog-service/api/consumer";

/// Main vRA client
///
/// Cloning is cheap: the underlying connection pool is shared between clones.
#[derive(Clone)]
pub struct VraClient {
    pub http: VraHttpClient,
    base_url: Url,
    token: Option<String>,
}

impl VraClient {
    /// Create a new vRA client for the appliance at `base_url`
    pub fn new(base_url: &str, token: Option<String>, verify_tls: bool) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        // Url::join drops the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http: VraHttpClient::new(verify_tls)?,
            base_url,
            token,
        })
    }

    /// Base URL of the appliance
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a full URL for an API path (leading '/' optional)
    pub fn url(&self, path: &str) -> Result<String> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?.to_string())
    }

    /// Make a GET request, returning the raw response
    pub async fn get_raw(&self, path: &str) -> Result<HttpResponse> {
        let url = self.url(path)?;
        self.http.get(&url, self.token.as_deref()).await
    }

    /// Make a GET request and parse the JSON body
    pub async fn get(&self, path: &str) -> Result<Value> {
        let url = self.url(path)?;
        self.http.get_json(&url, self.token.as_deref()).await
    }

    /// Make a POST request with a JSON body
    pub async fn post(&self, path: &str, body: &Value) -> Result<HttpResponse> {
        let url = self.url(path)?;
        self.http.post(&url, self.token.as_deref(), body).await
    }

    // =========================================================================
    // Catalog-service path helpers
    // =========================================================================

    /// Path of the resource collection
    pub fn resources_path(&self) -> String {
        format!("/{}/resources", CATALOG_CONSUMER_PATH)
    }

    /// Path of a single resource
    pub fn resource_path(&self, id: &str) -> String {
        format!("{}/{}", self.resources_path(), urlencoding::encode(id))
    }

    /// Path of the request collection (action submission target)
    pub fn requests_path(&self) -> String {
        format!("/{}/requests", CATALOG_CONSUMER_PATH)
    }

    /// Path of a single request
    pub fn request_path(&self, request_id: &str) -> String {
        format!("{}/{}", self.requests_path(), urlencoding::encode(request_id))
    }

    /// Path of the resource views spawned by a request
    pub fn request_resource_views_path(&self, request_id: &str) -> String {
        format!("{}/resourceViews", self.request_path(request_id))
    }
}
