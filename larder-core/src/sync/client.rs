//! HTTP transport for the Larder sync server.

use std::marker::PhantomData;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::SyncError;
use super::protocol::{ErrorBody, GetDataRequest, HealthResponse, SyncDataRequest, SyncResponse};
use super::transport::SyncTransport;
use crate::record::Payload;

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for the reachability probe.
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// REST/JSON transport (`POST /sync`, `POST /data`).
#[derive(Debug)]
pub struct HttpTransport<P = Payload> {
    server_url: String,
    client: reqwest::Client,
    _payload: PhantomData<fn() -> P>,
}

impl<P> Clone for HttpTransport<P> {
    fn clone(&self) -> Self {
        Self {
            server_url: self.server_url.clone(),
            client: self.client.clone(),
            _payload: PhantomData,
        }
    }
}

impl<P> HttpTransport<P> {
    /// Creates a transport for `server_url` with a per-request timeout.
    pub fn new(server_url: impl Into<String>, timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Network(e.to_string()))?;

        Ok(Self {
            server_url: server_url.into(),
            client,
            _payload: PhantomData,
        })
    }

    /// Returns the server URL.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, SyncError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = build_http_url(&self.server_url, path);
        tracing::debug!("POST {}", url);

        let response = self.client.post(&url).json(body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.message,
                Err(_) => status.to_string(),
            };
            return Err(SyncError::Server {
                status: status.as_u16(),
                message,
            });
        }

        // A body that stalls or is cut off is a transport failure, not a
        // malformed reply, so read it fully before decoding.
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| SyncError::Protocol(e.to_string()))
    }
}

impl<P> SyncTransport<P> for HttpTransport<P>
where
    P: Serialize + DeserializeOwned + Send + Sync,
{
    async fn sync_data(&self, request: SyncDataRequest<P>) -> Result<SyncResponse<P>, SyncError> {
        self.post("/sync", &request).await
    }

    async fn get_data(&self, request: GetDataRequest) -> Result<SyncResponse<P>, SyncError> {
        self.post("/data", &request).await
    }
}

/// Returns true if the server answers its health check.
pub async fn check_server(server_url: &str) -> bool {
    let client = match reqwest::Client::builder().timeout(HEALTH_TIMEOUT).build() {
        Ok(client) => client,
        Err(_) => return false,
    };

    let url = build_http_url(server_url, "/health");
    match client.get(&url).send().await {
        Ok(response) if response.status().is_success() => response
            .json::<HealthResponse>()
            .await
            .map(|h| h.status == "ok")
            .unwrap_or(false),
        _ => false,
    }
}

/// Builds an HTTP URL for a given path.
fn build_http_url(server_url: &str, path: &str) -> String {
    // Convert ws(s) to http(s) if needed
    let base_url = if let Some(rest) = server_url.strip_prefix("ws://") {
        format!("http://{}", rest)
    } else if let Some(rest) = server_url.strip_prefix("wss://") {
        format!("https://{}", rest)
    } else if !server_url.starts_with("http://") && !server_url.starts_with("https://") {
        format!("http://{}", server_url)
    } else {
        server_url.to_string()
    };

    format!("{}{}", base_url.trim_end_matches('/'), path)
}
