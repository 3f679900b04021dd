//! Build models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::status::BuildStatus;
use crate::models::{merge_field, Resource, ResourceId, ResourceKind};

/// A container image build for a notebook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Build {
    /// Unique build ID
    pub id: ResourceId,

    /// Notebook the build was produced from
    #[serde(default, alias = "notebookId")]
    pub notebook_id: Option<ResourceId>,

    /// Current status
    pub status: BuildStatus,

    /// Pushed image, set once the build succeeds
    #[serde(default, alias = "imageUri")]
    pub image_uri: Option<String>,

    /// Failure reason
    #[serde(default, alias = "errorMessage")]
    pub error_message: Option<String>,

    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, alias = "completedAt")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Resource for Build {
    const KIND: ResourceKind = ResourceKind::Build;

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
        merge_field(&mut self.notebook_id, newer.notebook_id);
        merge_field(&mut self.image_uri, newer.image_uri);
        merge_field(&mut self.error_message, newer.error_message);
        merge_field(&mut self.created_at, newer.created_at);
        merge_field(&mut self.completed_at, newer.completed_at);
    }
}
