//! One-shot API commands

use openapi_client::models::{
    CreatePipelineRequest, ReloadModelRequest, RollbackRequest, TrafficUpdateRequest,
};
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::app::render::Render;
use crate::app::state::AppState;
use crate::errors::WatchError;
use crate::http::deployments::check_traffic_percent;
use crate::models::deployment::Deployment;
use crate::models::pipeline::Pipeline;
use crate::models::{Resource, ResourceId};

/// Deployment actions with a typed request body
#[derive(Debug, Clone)]
pub enum DeploymentAction {
    ReloadModel(ReloadModelRequest),
    Rollback(RollbackRequest),
    Traffic(TrafficUpdateRequest),
}

impl DeploymentAction {
    /// Typed form of `action`, or `None` for actions without a known body
    pub fn parse(action: &str, body: &Value) -> Result<Option<Self>, WatchError> {
        let parsed = match action {
            "reload-model" => DeploymentAction::ReloadModel(ReloadModelRequest::deserialize(body)?),
            "rollback" => DeploymentAction::Rollback(RollbackRequest::deserialize(body)?),
            "traffic" => {
                let request = TrafficUpdateRequest::deserialize(body)?;
                check_traffic_percent(&request)?;
                DeploymentAction::Traffic(request)
            }
            _ => return Ok(None),
        };
        Ok(Some(parsed))
    }
}

/// Print every resource of a kind, optionally under a parent
pub async fn list<R: Render>(state: &AppState, parent: Option<&ResourceId>) -> Result<usize, WatchError> {
    let items: Vec<R> = state.http_client.list_resources(parent).await?;
    for item in &items {
        println!("{}", item.summary());
    }
    Ok(items.len())
}

/// Create a resource from a raw JSON body and print it
pub async fn create<R: Render>(state: &AppState, body: &Value) -> Result<R, WatchError> {
    let created: R = state.http_client.create_resource(body).await?;
    info!("Created {} {}", R::KIND, created.id());
    println!("{}", created.summary());
    Ok(created)
}

pub async fn delete<R: Render>(state: &AppState, id: &ResourceId) -> Result<(), WatchError> {
    state.http_client.delete_resource::<R>(id).await?;
    println!("Deleted {} {}", R::KIND, id);
    Ok(())
}

/// Run a named action and print the updated resource
pub async fn action<R: Render>(
    state: &AppState,
    id: &ResourceId,
    action: &str,
    body: &Value,
) -> Result<R, WatchError> {
    let updated: R = state.http_client.perform_action(id, action, body).await?;
    println!("{}", updated.summary());
    Ok(updated)
}

/// Run a typed deployment action and print the updated deployment
pub async fn deployment_action(
    state: &AppState,
    id: &ResourceId,
    action: &DeploymentAction,
) -> Result<Deployment, WatchError> {
    let updated = match action {
        DeploymentAction::ReloadModel(request) => state.http_client.reload_model(id, request).await?,
        DeploymentAction::Rollback(request) => state.http_client.rollback(id, request).await?,
        DeploymentAction::Traffic(request) => state.http_client.update_traffic(id, request).await?,
    };
    println!("{}", updated.summary());
    Ok(updated)
}

/// Start a pipeline from a `CreatePipelineRequest` body
pub async fn create_pipeline(state: &AppState, body: &Value) -> Result<Pipeline, WatchError> {
    let request = CreatePipelineRequest::deserialize(body)?;
    let created = state.http_client.create_pipeline(&request).await?;
    info!("Started pipeline {} for notebook {}", created.id(), request.notebook_id);
    println!("{}", created.summary());
    Ok(created)
}

/// Parse a `--body` argument, treating an absent body as `{}`
pub fn parse_body(raw: Option<&str>) -> Result<Value, WatchError> {
    match raw {
        Some(raw) => Ok(serde_json::from_str(raw)?),
        None => Ok(Value::Object(Default::default())),
    }
}
