//! In-memory state shared between coordinators and consumers

pub mod logs;
pub mod store;
