//! HTTP client for the ProxyFlow user API.

pub mod client;

pub use client::{AllocatedProxy, ClientError, Credential, ProxyFlowClient, UserProfile};
