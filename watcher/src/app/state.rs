//! Application state management

use std::sync::Arc;

use tracing::{debug, info};

use crate::app::options::AppOptions;
use crate::cache::store::ResourceStore;
use crate::errors::WatchError;
use crate::http::client::HttpClient;
use crate::models::build::Build;
use crate::models::deployment::Deployment;
use crate::models::pipeline::Pipeline;
use crate::models::{ResourceId, ResourceKind};
use crate::stream::connector::{LogConnector, WsConnector};
use crate::stream::coordinator::StreamCoordinator;
use crate::sync::polling::PollingCoordinator;
use crate::sync::source::StatusSource;

/// Main application state
pub struct AppState {
    /// HTTP client for backend communication
    pub http_client: Arc<HttpClient>,

    /// Opens log streams
    pub connector: Arc<dyn LogConnector>,

    pub builds: PollingCoordinator<Build>,
    pub deployments: PollingCoordinator<Deployment>,
    pub pipelines: PollingCoordinator<Pipeline>,

    options: AppOptions,
}

impl AppState {
    /// Build the HTTP client, the stream connector and one coordinator per kind
    pub fn init(options: &AppOptions) -> Result<Self, WatchError> {
        info!("Connecting to {}", options.api_base_url);

        let http_client = Arc::new(HttpClient::new(
            &options.api_base_url,
            options.token.clone(),
            options.request_timeout,
        )?);
        let connector: Arc<dyn LogConnector> = Arc::new(WsConnector::new(&options.api_base_url, options.token.clone())?);

        let source: Arc<dyn StatusSource<Build>> = http_client.clone();
        let builds = PollingCoordinator::new(source, Arc::new(ResourceStore::new()), options.poller.clone());
        let source: Arc<dyn StatusSource<Deployment>> = http_client.clone();
        let deployments =
            PollingCoordinator::new(source, Arc::new(ResourceStore::new()), options.poller.clone());
        let source: Arc<dyn StatusSource<Pipeline>> = http_client.clone();
        let pipelines = PollingCoordinator::new(source, Arc::new(ResourceStore::new()), options.poller.clone());

        Ok(Self {
            http_client,
            connector,
            builds,
            deployments,
            pipelines,
            options: options.clone(),
        })
    }

    pub fn options(&self) -> &AppOptions {
        &self.options
    }

    /// New log stream coordinator for one resource
    pub fn stream_for(&self, kind: ResourceKind, id: ResourceId) -> StreamCoordinator {
        StreamCoordinator::new(kind, id, self.connector.clone(), self.options.stream.clone())
    }

    /// Stop every poll session across all kinds
    pub fn stop_all_polling(&self) -> usize {
        self.builds.stop_all_polling()
            + self.deployments.stop_all_polling()
            + self.pipelines.stop_all_polling()
    }

    /// Teardown: stop polling and drop every cached resource
    pub fn shutdown(&self) {
        let stopped = self.stop_all_polling();
        self.builds.store().clear();
        self.deployments.store().clear();
        self.pipelines.store().clear();
        debug!("Stopped {} poll sessions and cleared the resource cache", stopped);
    }
}
