//! Request tracking
//!
//! Every action submission creates an asynchronous request on the platform.
//! [`RequestHandle`] is bound to that request's id and can re-read its state.

use serde_json::Value;

use crate::poll::{poll_until, PollPolicy};
use crate::vra::{Result, VraClient};

/// Terminal request states
const SUCCESSFUL_STATES: &[&str] = &["SUCCESSFUL"];
const FAILED_STATES: &[&str] = &["FAILED", "REJECTED"];

/// Handle to an asynchronous platform request
#[derive(Clone)]
pub struct RequestHandle {
    client: VraClient,
    id: String,
    descriptor: Option<Value>,
}

impl std::fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandle")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}

impl RequestHandle {
    /// Bind a handle to `id`; no network access
    pub fn new(client: VraClient, id: impl Into<String>) -> Self {
        Self {
            client,
            id: id.into(),
            descriptor: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Last fetched request document, if any
    pub fn descriptor(&self) -> Option<&Value> {
        self.descriptor.as_ref()
    }

    /// Re-read the request from the platform
    pub async fn refresh(&mut self) -> Result<&Value> {
        let descriptor = fetch_request(&self.client, &self.id).await?;
        let descriptor: &Value = self.descriptor.insert(descriptor);
        Ok(descriptor)
    }

    fn field(&self, key: &str) -> Option<&str> {
        self.descriptor.as_ref()?.get(key)?.as_str()
    }

    pub fn state(&self) -> Option<&str> {
        self.field("state")
    }

    pub fn phase(&self) -> Option<&str> {
        self.field("phase")
    }

    pub fn completion_state(&self) -> Option<&str> {
        self.descriptor
            .as_ref()?
            .pointer("/requestCompletion/requestCompletionState")?
            .as_str()
    }

    pub fn completion_details(&self) -> Option<&str> {
        self.descriptor
            .as_ref()?
            .pointer("/requestCompletion/completionDetails")?
            .as_str()
    }

    pub fn is_successful(&self) -> bool {
        self.state().is_some_and(|s| SUCCESSFUL_STATES.contains(&s))
    }

    pub fn is_failed(&self) -> bool {
        self.state().is_some_and(|s| FAILED_STATES.contains(&s))
    }

    pub fn is_completed(&self) -> bool {
        self.is_successful() || self.is_failed()
    }

    /// Poll the request until it reaches a terminal state
    pub async fn wait_until_completed(&mut self, policy: &PollPolicy) -> Result<&Value> {
        let client = &self.client;
        let id = self.id.as_str();
        let what = format!("request {}", id);

        let descriptor = poll_until(policy, &what, move || async move {
            let descriptor = fetch_request(client, id).await?;
            let state = descriptor.get("state").and_then(Value::as_str);
            tracing::debug!("Request {} state: {:?}", id, state);
            let terminal = state.is_some_and(|s| SUCCESSFUL_STATES.contains(&s) || FAILED_STATES.contains(&s));
            Ok(terminal.then_some(descriptor))
        })
        .await?;

        let descriptor: &Value = self.descriptor.insert(descriptor);
        Ok(descriptor)
    }
}

async fn fetch_request(client: &VraClient, id: &str) -> Result<Value> {
    client.get(&client.request_path(id)).await
}
