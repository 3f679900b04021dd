//! Generic resource endpoints

use async_trait::async_trait;
use openapi_client::models::{ListResponse, LogsResponse};
use serde::Serialize;

use crate::errors::WatchError;
use crate::http::client::HttpClient;
use crate::models::log::LogEntry;
use crate::models::{Resource, ResourceId, ResourceKind};
use crate::sync::source::StatusSource;

fn resource_path(kind: ResourceKind, id: &ResourceId) -> String {
    format!("/{}/{}", kind.collection(), id)
}

impl HttpClient {
    /// Fetch one resource's current snapshot
    pub async fn get_resource<R: Resource>(&self, id: &ResourceId) -> Result<R, WatchError> {
        self.get(&resource_path(R::KIND, id)).await
    }

    /// List resources, optionally restricted to a parent resource
    pub async fn list_resources<R: Resource>(
        &self,
        parent: Option<&ResourceId>,
    ) -> Result<Vec<R>, WatchError> {
        let path = format!("/{}", R::KIND.collection());
        let response: ListResponse<R> = match parent {
            Some(parent) => self.get_with_query(&path, &[("parent", parent.as_str())]).await?,
            None => self.get(&path).await?,
        };
        Ok(response.into_items())
    }

    /// Create a resource; the server starts the job and returns the initial snapshot
    pub async fn create_resource<R: Resource, B: Serialize + ?Sized>(
        &self,
        body: &B,
    ) -> Result<R, WatchError> {
        self.post(&format!("/{}", R::KIND.collection()), body).await
    }

    /// Delete a resource
    pub async fn delete_resource<R: Resource>(&self, id: &ResourceId) -> Result<(), WatchError> {
        self.delete(&resource_path(R::KIND, id)).await
    }

    /// Run an action such as `reload-model` and return the updated snapshot
    pub async fn perform_action<R: Resource, B: Serialize + ?Sized>(
        &self,
        id: &ResourceId,
        action: &str,
        body: &B,
    ) -> Result<R, WatchError> {
        let path = format!("{}/{}", resource_path(R::KIND, id), action.trim_matches('/'));
        self.post(&path, body).await
    }

    /// One-shot historical log fetch
    pub async fn fetch_logs(
        &self,
        kind: ResourceKind,
        id: &ResourceId,
    ) -> Result<Vec<LogEntry>, WatchError> {
        let response: LogsResponse = self.get(&format!("{}/logs", resource_path(kind, id))).await?;
        Ok(response.entries.into_iter().map(LogEntry::from).collect())
    }
}

#[async_trait]
impl<R: Resource> StatusSource<R> for HttpClient {
    async fn fetch_status(&self, id: &ResourceId) -> Result<R, WatchError> {
        self.get_resource(id).await
    }
}
