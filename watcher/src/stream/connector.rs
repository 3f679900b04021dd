//! Log stream transport

use async_trait::async_trait;
use futures::StreamExt;
use http::header::{HeaderValue, AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};
use url::Url;

use crate::errors::WatchError;
use crate::models::{ResourceId, ResourceKind};

/// Close code for a normal, intentional closure
pub const NORMAL_CLOSE: u16 = 1000;

/// What a connection produced next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text message
    Text(String),

    /// The peer closed the connection; `None` when no close code was sent
    /// or the stream simply ended
    Closed { code: Option<u16> },

    /// Transport error
    Failed(String),
}

/// An open, server-to-client log connection
#[async_trait]
pub trait LogConnection: Send {
    /// Wait for the next frame
    async fn next_frame(&mut self) -> Frame;

    /// Close the connection normally
    async fn close(&mut self);
}

/// Opens log connections, one per resource
#[async_trait]
pub trait LogConnector: Send + Sync {
    async fn connect(
        &self,
        kind: ResourceKind,
        id: &ResourceId,
    ) -> Result<Box<dyn LogConnection>, WatchError>;
}

/// WebSocket connector for `<base>/{kind}/{id}/logs/stream`
pub struct WsConnector {
    base_url: Url,
    token: Option<SecretString>,
}

impl WsConnector {
    /// Create a connector from the HTTP API base URL
    pub fn new(api_base_url: &str, token: Option<SecretString>) -> Result<Self, WatchError> {
        Ok(Self {
            base_url: build_stream_base_url(api_base_url)?,
            token,
        })
    }

    /// Full stream URL for a resource
    pub fn stream_url(&self, kind: ResourceKind, id: &ResourceId) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&format!(
            "{}/{}/{}/logs/stream",
            url.path().trim_end_matches('/'),
            kind.collection(),
            id
        ));
        url
    }
}

#[async_trait]
impl LogConnector for WsConnector {
    async fn connect(
        &self,
        kind: ResourceKind,
        id: &ResourceId,
    ) -> Result<Box<dyn LogConnection>, WatchError> {
        let url = self.stream_url(kind, id);
        info!("Connecting to log stream: {}", url);

        let mut request = url.as_str().into_client_request()?;
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                .map_err(|e| WatchError::ConfigError(e.to_string()))?;
            request.headers_mut().insert(AUTHORIZATION, value);
        }

        let (ws, _) = connect_async(request).await?;
        Ok(Box::new(WsConnection { ws }))
    }
}

struct WsConnection {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl LogConnection for WsConnection {
    async fn next_frame(&mut self) -> Frame {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Frame::Text(text.to_string()),
                Some(Ok(Message::Close(frame))) => {
                    return Frame::Closed {
                        code: frame.map(|f| u16::from(f.code)),
                    }
                }
                Some(Ok(_)) => {
                    // ping/pong/binary frames carry nothing for us
                }
                Some(Err(e)) => return Frame::Failed(e.to_string()),
                None => return Frame::Closed { code: None },
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.ws.close(None).await {
            debug!("Error while closing log stream: {}", e);
        }
    }
}

fn build_stream_base_url(api_base_url: &str) -> Result<Url, WatchError> {
    let mut url = Url::parse(api_base_url).map_err(|e| WatchError::ConfigError(e.to_string()))?;

    // Change http/https to ws/wss
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(WatchError::ConfigError("Invalid API URL scheme".to_string())),
    };

    url.set_scheme(scheme)
        .map_err(|_| WatchError::ConfigError("Failed to set scheme".to_string()))?;

    Ok(url)
}
