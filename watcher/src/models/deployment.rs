//! Deployment models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::status::DeploymentStatus;
use crate::models::{merge_field, Resource, ResourceId, ResourceKind};

/// A serverless service deployed from a build
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deployment {
    /// Unique deployment ID
    pub id: ResourceId,

    /// Build whose image is deployed
    #[serde(default, alias = "buildId")]
    pub build_id: Option<ResourceId>,

    #[serde(default, alias = "serviceName")]
    pub service_name: Option<String>,

    /// Current status
    pub status: DeploymentStatus,

    /// Public URL of the running service
    #[serde(default, alias = "serviceUrl")]
    pub service_url: Option<String>,

    /// Share of traffic routed to the latest revision
    #[serde(default, alias = "trafficPercent")]
    pub traffic_percent: Option<u8>,

    /// Model currently loaded by the service
    #[serde(default, alias = "modelVersion")]
    pub model_version: Option<String>,

    #[serde(default, alias = "errorMessage")]
    pub error_message: Option<String>,

    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Resource for Deployment {
    const KIND: ResourceKind = ResourceKind::Deployment;

    fn id(&self) -> &ResourceId {
        &self.id
    }

    fn status_label(&self) -> &str {
        self.status.as_str()
    }

    fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    fn merge_from(&mut self, newer: Self) {
        self.status = newer.status;
        merge_field(&mut self.build_id, newer.build_id);
        merge_field(&mut self.service_name, newer.service_name);
        merge_field(&mut self.service_url, newer.service_url);
        merge_field(&mut self.traffic_percent, newer.traffic_percent);
        merge_field(&mut self.model_version, newer.model_version);
        merge_field(&mut self.error_message, newer.error_message);
        merge_field(&mut self.created_at, newer.created_at);
        merge_field(&mut self.updated_at, newer.updated_at);
    }
}
