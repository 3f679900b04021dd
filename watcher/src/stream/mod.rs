//! Live log streaming

pub mod connector;
pub mod coordinator;
