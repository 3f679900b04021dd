//! Remote status source

use async_trait::async_trait;

use crate::errors::WatchError;
use crate::models::{Resource, ResourceId};

/// Fetches the current status snapshot of a single resource
#[async_trait]
pub trait StatusSource<R: Resource>: Send + Sync {
    async fn fetch_status(&self, id: &ResourceId) -> Result<R, WatchError>;
}
