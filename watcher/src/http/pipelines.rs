//! Pipeline endpoints

use openapi_client::models::CreatePipelineRequest;

use crate::errors::WatchError;
use crate::http::client::HttpClient;
use crate::models::pipeline::Pipeline;

impl HttpClient {
    /// Start a pipeline for an uploaded notebook
    pub async fn create_pipeline(
        &self,
        request: &CreatePipelineRequest,
    ) -> Result<Pipeline, WatchError> {
        self.create_resource(request).await
    }
}
