//! HTTP API client

pub mod client;
pub mod deployments;
pub mod pipelines;
pub mod resources;
