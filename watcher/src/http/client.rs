//! HTTP client implementation

use std::time::Duration;

use openapi_client::models::ErrorResponse;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::errors::WatchError;

/// HTTP client for the build/deploy API
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<SecretString>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(
        base_url: &str,
        token: Option<SecretString>,
        request_timeout: Duration,
    ) -> Result<Self, WatchError> {
        let client = Client::builder().timeout(request_timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let request = self.client.request(method, &url);
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, WatchError> {
        let response = self.request(Method::GET, path).send().await?;
        read_json(Method::GET, response).await
    }

    /// Make a GET request with query parameters
    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, WatchError> {
        let response = self.request(Method::GET, path).query(query).send().await?;
        read_json(Method::GET, response).await
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, WatchError> {
        let response = self.request(Method::POST, path).json(body).send().await?;
        read_json(Method::POST, response).await
    }

    /// Make a DELETE request, ignoring any response body
    pub async fn delete(&self, path: &str) -> Result<(), WatchError> {
        let response = self.request(Method::DELETE, path).send().await?;
        check_status(Method::DELETE, response).await?;
        Ok(())
    }
}

async fn check_status(method: Method, response: Response) -> Result<Response, WatchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.message)
        .unwrap_or(body);

    if status == StatusCode::NOT_FOUND {
        return Err(WatchError::NotFound(format!("{} ({})", url, message)));
    }

    error!("HTTP {} {} failed: {} - {}", method, url, status, message);
    Err(WatchError::ApiError {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(method: Method, response: Response) -> Result<T, WatchError> {
    let response = check_status(method, response).await?;
    let body = response.json().await?;
    Ok(body)
}
