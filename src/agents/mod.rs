//! Client for the hosted agent-orchestration service.
//!
//! [`client::AgentsClient`] speaks the service's REST surface; [`wire`]
//! holds the JSON shapes. Session lifecycle and the turn loop live in
//! [`crate::session`], which drives this client.

pub mod client;
pub mod wire;

pub use client::{AgentsClient, ServiceError};
