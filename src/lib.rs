//! Lifecycle actions for vRealize Automation catalog resources.
//!
//! A [`ResourceHandle`] wraps one resource's descriptor, resolves the
//! platform-specific ids of its actions (power on/off, shutdown, destroy),
//! submits them and returns a [`RequestHandle`] for the asynchronous request
//! the platform creates. Convergence waits such as IP assignment go through
//! [`poll::poll_until`] with a caller-chosen [`PollPolicy`].

pub mod config;
pub mod poll;
pub mod request;
pub mod resource;
pub mod vra;

pub use config::Config;
pub use poll::PollPolicy;
pub use request::RequestHandle;
pub use resource::{ActionRequestPayload, ActionSubmitter, ResourceHandle};
pub use vra::{Result, VraClient, VraError};
