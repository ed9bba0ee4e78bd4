use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::{fmt::Debug, sync::OnceLock, time::Duration};
use tracing::debug;

/// Error produced by a transport. Kept opaque; the client only carries it.
pub type TransportError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Raw response handed back by a transport.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::new(StatusCode::OK, body)
    }
}

/// HTTP execution facility used by [`crate::ForecastClient`].
///
/// Implementations must be safe to share between concurrent fetches.
#[async_trait]
pub trait HttpTransport: Send + Sync + Debug {
    async fn get(&self, url: Url) -> Result<TransportResponse, TransportError>;
}

/// [`HttpTransport`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(http: Client) -> Self {
        Self { http }
    }

    /// Handle to the process-wide client. Clones share one connection pool.
    pub fn shared() -> Self {
        static SHARED: OnceLock<Client> = OnceLock::new();
        Self { http: SHARED.get_or_init(Client::new).clone() }
    }

    /// Dedicated client with a total request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::shared()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: Url) -> Result<TransportResponse, TransportError> {
        let res = self.http.get(url).send().await?;

        let status = res.status();
        let body = res.bytes().await?;
        debug!(%status, bytes = body.len(), "received response");

        Ok(TransportResponse { status, body: body.to_vec() })
    }
}
