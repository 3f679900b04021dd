//! Domain models for tracked resources

pub mod build;
pub mod deployment;
pub mod log;
pub mod pipeline;
pub mod status;
pub mod stream;

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Resource identifier
///
/// The API hands out integer ids for some resources and string ids for
/// others; both are normalized to their string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::str::FromStr for ResourceId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().to_string()))
    }
}

impl From<i64> for ResourceId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Int(i64),
            Str(String),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Int(id) => ResourceId::from(id),
            RawId::Str(id) => ResourceId::from(id),
        })
    }
}

/// Kind of tracked resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Build,
    Deployment,
    Pipeline,
}

impl ResourceKind {
    /// URL path segment for the collection
    pub fn collection(&self) -> &'static str {
        match self {
            ResourceKind::Build => "builds",
            ResourceKind::Deployment => "deployments",
            ResourceKind::Pipeline => "pipelines",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceKind::Build => "build",
            ResourceKind::Deployment => "deployment",
            ResourceKind::Pipeline => "pipeline",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "build" | "builds" => Ok(ResourceKind::Build),
            "deployment" | "deployments" => Ok(ResourceKind::Deployment),
            "pipeline" | "pipelines" => Ok(ResourceKind::Pipeline),
            _ => Err(format!("Invalid resource kind: {}", s)),
        }
    }
}

/// A remotely tracked entity with a status that moves toward a terminal state
pub trait Resource: Clone + fmt::Debug + DeserializeOwned + Send + Sync + 'static {
    const KIND: ResourceKind;

    fn id(&self) -> &ResourceId;

    /// Wire form of the current status
    fn status_label(&self) -> &str;

    /// Whether no further transitions will happen
    fn is_terminal(&self) -> bool;

    fn error_message(&self) -> Option<&str>;

    /// Whether the resource ended in failure; a leftover `error_message` on
    /// a successful resource does not count
    fn is_failed(&self) -> bool {
        self.is_terminal() && self.status_label() == "failed"
    }

    /// Fold a newer snapshot of the same resource into this one.
    ///
    /// Fields absent from `newer` keep their current value.
    fn merge_from(&mut self, newer: Self);
}

/// Overwrite `slot` only when the incoming value is present
pub(crate) fn merge_field<T>(slot: &mut Option<T>, incoming: Option<T>) {
    if incoming.is_some() {
        *slot = incoming;
    }
}
