//! Pipeline models

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::status::PipelineStatus;
use crate::models::{merge_field, Resource, ResourceId, ResourceKind};

/// One stage of the fixed notebook-to-service sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStep {
    Parse,
    Dependencies,
    Upload,
    Build,
    Deploy,
}

impl PipelineStep {
    /// Every step, in execution order
    pub const ALL: [PipelineStep; 5] = [
        PipelineStep::Parse,
        PipelineStep::Dependencies,
        PipelineStep::Upload,
        PipelineStep::Build,
        PipelineStep::Deploy,
    ];

    /// Position in [`PipelineStep::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStep::Parse => "parse",
            PipelineStep::Dependencies => "dependencies",
            PipelineStep::Upload => "upload",
            PipelineStep::Build => "build",
            PipelineStep::Deploy => "deploy",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// End-to-end notebook pipeline: parse, resolve dependencies, upload, build, deploy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    /// Unique pipeline ID
    pub id: ResourceId,

    #[serde(default, alias = "notebookId")]
    pub notebook_id: Option<ResourceId>,

    /// Overall status
    pub status: PipelineStatus,

    /// Step currently executing (or the last one, once finished)
    #[serde(default, alias = "currentStep")]
    pub current_step: Option<PipelineStep>,

    #[serde(default, alias = "stepsCompleted")]
    pub steps_completed: Vec<PipelineStep>,

    #[serde(default, alias = "buildId")]
    pub build_id: Option<ResourceId>,

    #[serde(default, alias = "deploymentId")]
    pub deployment_id: Option<ResourceId>,

    #[serde(default, alias = "serviceUrl")]
    pub service_url: Option<String>,

    #[serde(default, alias = "errorMessage")]
    pub error_message: Option<String>,

    #[serde(default, alias = "createdAt")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, alias = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Pipeline {
    /// Check that completed steps form a prefix of the fixed sequence and the
    /// current step is either the next one or the last completed one.
    pub fn steps_are_consistent(&self) -> bool {
        let mut completed: Vec<usize> = self.steps_completed.iter().map(|s| s.index()).collect();
        completed.sort_unstable();
        completed.dedup();

        let is_prefix = completed.iter().enumerate().all(|(pos, idx)| pos == *idx);
        if !is_prefix {
            return false;
        }

        match self.current_step {
            Some(step) => step.index() <= completed.len(),
            None => true,
        }
    }
}

impl Resource for Pipeline {
    const KIND: ResourceKind = ResourceKind::Pipeline;

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
        merge_field(&mut self.current_step, newer.current_step);
        // completed steps never shrink; an empty list means the field was omitted
        if !newer.steps_completed.is_empty() {
            self.steps_completed = newer.steps_completed;
        }
        merge_field(&mut self.build_id, newer.build_id);
        merge_field(&mut self.deployment_id, newer.deployment_id);
        merge_field(&mut self.service_url, newer.service_url);
        merge_field(&mut self.error_message, newer.error_message);
        merge_field(&mut self.created_at, newer.created_at);
        merge_field(&mut self.updated_at, newer.updated_at);
    }
}
