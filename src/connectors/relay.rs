//! HTTP relay abstraction.
//!
//! Every exchange call goes through an [`HttpRelay`]. The direct relay talks
//! to the network itself; the channel relay forwards requests to a
//! [`RelayWorker`] running in another task and receives a [`RelayResponse`]
//! envelope back, mirroring a privileged background worker that performs
//! fetches on behalf of a restricted caller.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

#[derive(Debug, Clone, Error)]
pub enum RelayError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Relay worker is not running")]
    Disconnected,
}

/// A single outbound request.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
}

impl RelayRequest {
    /// Creates a GET request with the given headers.
    pub fn get(url: impl Into<String>, headers: Vec<(String, String)>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            headers,
        }
    }

    /// URL without its query string, safe to log (no signature).
    pub fn loggable_url(&self) -> &str {
        self.url.split('?').next().unwrap_or(&self.url)
    }
}

/// Issues HTTP requests and returns the decoded JSON body.
///
/// Implementations must surface any non-2xx response as
/// [`RelayError::Http`] carrying the response body text.
#[async_trait]
pub trait HttpRelay: Send + Sync {
    async fn request(&self, request: RelayRequest) -> Result<Value, RelayError>;
}

/// Relay that performs requests directly with reqwest.
#[derive(Clone)]
pub struct DirectRelay {
    client: Client,
}

impl DirectRelay {
    /// Creates a direct relay with the given request timeout.
    pub fn new(timeout: Duration) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpRelay for DirectRelay {
    async fn request(&self, request: RelayRequest) -> Result<Value, RelayError> {
        debug!("{} {}", request.method, request.loggable_url());

        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!("{} returned {}: {}", request.loggable_url(), status, body);
            return Err(RelayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RelayError::Parse(e.to_string()))
    }
}

// ============ Message Relay ============

/// Response envelope exchanged between [`ChannelRelay`] and [`RelayWorker`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// HTTP status of a failed exchange response, if there was one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl RelayResponse {
    /// Wraps a relay outcome into an envelope.
    pub fn from_result(result: Result<Value, RelayError>) -> Self {
        match result {
            Ok(data) => Self {
                success: true,
                data: Some(data),
                error: None,
                status: None,
            },
            Err(RelayError::Http { status, body }) => Self {
                success: false,
                data: None,
                error: Some(body),
                status: Some(status),
            },
            Err(e) => Self {
                success: false,
                data: None,
                error: Some(e.to_string()),
                status: None,
            },
        }
    }

    /// Unwraps an envelope back into a relay outcome.
    pub fn into_result(self) -> Result<Value, RelayError> {
        if self.success {
            return Ok(self.data.unwrap_or(Value::Null));
        }

        let message = self.error.unwrap_or_default();
        match self.status {
            Some(status) => Err(RelayError::Http {
                status,
                body: message,
            }),
            None => Err(RelayError::Transport(message)),
        }
    }
}

type RelayMessage = (RelayRequest, oneshot::Sender<RelayResponse>);

/// Caller side of the message relay.
#[derive(Clone)]
pub struct ChannelRelay {
    tx: mpsc::Sender<RelayMessage>,
}

/// Worker side of the message relay. Serves requests one at a time until
/// every [`ChannelRelay`] handle has been dropped.
pub struct RelayWorker<R> {
    inner: R,
    rx: mpsc::Receiver<RelayMessage>,
}

/// Creates a connected relay handle and worker around `inner`.
pub fn relay_channel<R: HttpRelay>(inner: R, capacity: usize) -> (ChannelRelay, RelayWorker<R>) {
    let (tx, rx) = mpsc::channel(capacity);
    (ChannelRelay { tx }, RelayWorker { inner, rx })
}

impl<R: HttpRelay> RelayWorker<R> {
    /// Runs the worker loop.
    pub async fn run(mut self) {
        debug!("Relay worker started");

        while let Some((request, reply)) = self.rx.recv().await {
            let url = request.loggable_url().to_string();
            let response = RelayResponse::from_result(self.inner.request(request).await);

            if !response.success {
                debug!("Relay call to {} failed: {:?}", url, response.error);
            }

            if reply.send(response).is_err() {
                warn!("Relay caller for {} went away before the response", url);
            }
        }

        debug!("Relay worker stopped");
    }
}

#[async_trait]
impl HttpRelay for ChannelRelay {
    async fn request(&self, request: RelayRequest) -> Result<Value, RelayError> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send((request, reply_tx))
            .await
            .map_err(|_| RelayError::Disconnected)?;

        reply_rx
            .await
            .map_err(|_| RelayError::Disconnected)?
            .into_result()
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted relay for unit tests.

    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    pub enum MockReply {
        Json(Value),
        Status(u16, String),
    }

    #[derive(Default)]
    struct MockState {
        routes: HashMap<(String, Option<String>), MockReply>,
        calls: Vec<RelayRequest>,
    }

    /// Serves canned replies keyed by URL path and `symbol` query parameter.
    ///
    /// Unscripted symbol requests get Binance's invalid symbol error.
    #[derive(Clone, Default)]
    pub struct MockRelay {
        state: Arc<Mutex<MockState>>,
    }

    impl MockRelay {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn on(&self, path: &str, symbol: Option<&str>, reply: MockReply) -> &Self {
            self.state
                .lock()
                .unwrap()
                .routes
                .insert((path.to_string(), symbol.map(str::to_string)), reply);
            self
        }

        pub fn calls(&self) -> Vec<RelayRequest> {
            self.state.lock().unwrap().calls.clone()
        }

        pub fn calls_to(&self, path: &str) -> usize {
            self.symbols_requested(path).len()
        }

        /// Symbols requested on `path`, in request order. Calls without a
        /// symbol are recorded as an empty string.
        pub fn symbols_requested(&self, path: &str) -> Vec<String> {
            self.calls()
                .iter()
                .filter_map(|call| {
                    let url = reqwest::Url::parse(&call.url).ok()?;
                    if url.path() != path {
                        return None;
                    }
                    Some(query_param(&url, "symbol").unwrap_or_default())
                })
                .collect()
        }
    }

    fn query_param(url: &reqwest::Url, name: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }

    #[async_trait]
    impl HttpRelay for MockRelay {
        async fn request(&self, request: RelayRequest) -> Result<Value, RelayError> {
            let url = reqwest::Url::parse(&request.url)
                .map_err(|e| RelayError::Parse(e.to_string()))?;
            let path = url.path().to_string();
            let symbol = query_param(&url, "symbol");

            let mut state = self.state.lock().unwrap();
            state.calls.push(request);

            let reply = state
                .routes
                .get(&(path.clone(), symbol.clone()))
                .or_else(|| state.routes.get(&(path, None)))
                .cloned();

            match reply {
                Some(MockReply::Json(value)) => Ok(value),
                Some(MockReply::Status(status, body)) => Err(RelayError::Http { status, body }),
                None => Err(RelayError::Http {
                    status: 400,
                    body: r#"{"code":-1121,"msg":"Invalid symbol."}"#.to_string(),
                }),
            }
        }
    }
}
