//! deploywatch library
//!
//! Keeps a local view of remote build, deployment and pipeline jobs in sync
//! with the backend by polling their status and tailing their logs.

pub mod app;
pub mod cache;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod progress;
pub mod storage;
pub mod stream;
pub mod sync;
pub mod utils;
pub mod workers;
