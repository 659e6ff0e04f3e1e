//! HTTP utilities for vRA REST API calls

use reqwest::header::{ACCEPT, LOCATION};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

use super::error::{Result, VraError};

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Raw response: status, the `Location` header and the unparsed body
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub body: String,
}

impl HttpResponse {
    /// Parse the body as JSON; an empty body is `Value::Null`
    pub fn json(&self) -> Result<Value> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// HTTP client wrapper for vRA API calls
#[derive(Clone)]
pub struct VraHttpClient {
    client: Client,
}

impl VraHttpClient {
    /// Create a new HTTP client
    pub fn new(verify_tls: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("vra-resource/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(!verify_tls)
            .build()?;

        Ok(Self { client })
    }

    /// Make a GET request, returning the raw response
    pub async fn get(&self, url: &str, token: Option<&str>) -> Result<HttpResponse> {
        tracing::debug!("GET {}", url);
        let request = self.client.get(url);
        self.send(url, request, token).await
    }

    /// Make a GET request and parse the response as JSON
    pub async fn get_json(&self, url: &str, token: Option<&str>) -> Result<Value> {
        self.get(url, token).await?.json()
    }

    /// Make a POST request with a JSON body
    pub async fn post(&self, url: &str, token: Option<&str>, body: &Value) -> Result<HttpResponse> {
        tracing::debug!("POST {}", url);
        let request = self.client.post(url).json(body);
        self.send(url, request, token).await
    }

    async fn send(
        &self,
        url: &str,
        mut request: RequestBuilder,
        token: Option<&str>,
    ) -> Result<HttpResponse> {
        request = request.header(ACCEPT, "application/json");
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response.text().await?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            let message = sanitize_for_log(&body);
            tracing::error!("API error: {} - {}", status, message);
            return Err(VraError::Http {
                status: status.as_u16(),
                url: url.to_string(),
                message,
            });
        }

        Ok(HttpResponse {
            status,
            location,
            body,
        })
    }
}

/// Format a vRA API error for display
pub fn format_vra_error(error: &VraError) -> String {
    match error.status() {
        Some(401) => "Authentication failed. Check your vRA token.".to_string(),
        Some(403) => "Permission denied. Check your vRA entitlements.".to_string(),
        Some(404) => "Resource not found.".to_string(),
        Some(429) => "Rate limit exceeded. Please try again later.".to_string(),
        Some(400) => "Invalid request. Check your parameters.".to_string(),
        Some(500) | Some(503) => "vRA service temporarily unavailable. Please try again.".to_string(),
        Some(409) => "Conflict. The resource may be busy with another request.".to_string(),
        _ => error.to_string(),
    }
}
