//! Deployment action endpoints

use openapi_client::models::{ReloadModelRequest, RollbackRequest, TrafficUpdateRequest};

use crate::errors::WatchError;
use crate::http::client::HttpClient;
use crate::models::deployment::Deployment;
use crate::models::ResourceId;

impl HttpClient {
    /// Hot-reload the model served by a deployment
    pub async fn reload_model(
        &self,
        id: &ResourceId,
        request: &ReloadModelRequest,
    ) -> Result<Deployment, WatchError> {
        self.perform_action(id, "reload-model", request).await
    }

    /// Roll a deployment back to a previous revision
    pub async fn rollback(
        &self,
        id: &ResourceId,
        request: &RollbackRequest,
    ) -> Result<Deployment, WatchError> {
        self.perform_action(id, "rollback", request).await
    }

    /// Change the traffic split of a deployment
    pub async fn update_traffic(
        &self,
        id: &ResourceId,
        request: &TrafficUpdateRequest,
    ) -> Result<Deployment, WatchError> {
        check_traffic_percent(request)?;
        self.perform_action(id, "traffic", request).await
    }
}

/// Reject traffic splits outside `0..=100` before they reach the backend
pub fn check_traffic_percent(request: &TrafficUpdateRequest) -> Result<(), WatchError> {
    if request.percent > 100 {
        return Err(WatchError::ConfigError(format!(
            "Traffic percent must be 0-100, got {}",
            request.percent
        )));
    }
    Ok(())
}
