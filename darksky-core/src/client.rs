use async_trait::async_trait;
use reqwest::Url;
use std::{collections::BTreeMap, fmt, sync::Arc};
use tokio::{runtime::Handle, task::JoinHandle};
use tracing::{debug, instrument};

use crate::{
    error::FetchError,
    model::{Forecast, ForecastRequest},
    transport::{HttpTransport, ReqwestTransport},
};

pub const DEFAULT_BASE_DOMAIN: &str = "https://api.darksky.net/";

const FORECAST_PATH: &str = "forecast";

/// Anything that can resolve a coordinate pair into a [`Forecast`].
#[async_trait]
pub trait ForecastApi: Send + Sync + fmt::Debug {
    async fn fetch_forecast(&self, latitude: f64, longitude: f64) -> Result<Forecast, FetchError>;
}

/// Immutable configuration of a [`ForecastClient`].
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_domain: String,
    pub transport: Arc<dyn HttpTransport>,
}

impl ClientConfig {
    /// Default domain and the shared `reqwest` transport.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_domain: DEFAULT_BASE_DOMAIN.to_string(),
            transport: Arc::new(ReqwestTransport::shared()),
        }
    }

    pub fn with_base_domain(mut self, base_domain: impl Into<String>) -> Self {
        self.base_domain = base_domain.into();
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("base_domain", &self.base_domain)
            .field("transport", &self.transport)
            .finish()
    }
}

/// Client for the forecast endpoint.
///
/// Holds only immutable state; share it freely (`Arc<ForecastClient>`) and
/// issue as many concurrent fetches as needed.
#[derive(Debug, Clone)]
pub struct ForecastClient {
    config: ClientConfig,
    default_parameters: BTreeMap<&'static str, &'static str>,
}

impl ForecastClient {
    pub fn new(config: ClientConfig) -> Self {
        let default_parameters =
            BTreeMap::from([("exclude", "hourly,currently,flags"), ("units", "si")]);

        Self { config, default_parameters }
    }

    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self::new(ClientConfig::new(api_key))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn default_parameters(&self) -> &BTreeMap<&'static str, &'static str> {
        &self.default_parameters
    }

    /// Build `{base}/forecast/{key}/{lat},{lon}?exclude=..&units=..`.
    ///
    /// Fails with [`FetchError::MalformedRequest`] when the base domain does not
    /// parse, cannot carry a path, or the coordinates are not finite.
    pub fn request_url(&self, latitude: f64, longitude: f64) -> Result<Url, FetchError> {
        let request = ForecastRequest::new(latitude, longitude);
        if !request.is_finite() {
            return Err(FetchError::MalformedRequest);
        }

        let mut url =
            Url::parse(&self.config.base_domain).map_err(|_| FetchError::MalformedRequest)?;

        url.path_segments_mut()
            .map_err(|_| FetchError::MalformedRequest)?
            .pop_if_empty()
            .push(FORECAST_PATH)
            .push(&self.config.api_key)
            .push(&request.coordinates_segment());

        // Built by hand: form encoding would escape the commas in `exclude`.
        let query = self
            .default_parameters
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&query));

        Ok(url)
    }

    /// Fetch and decode the forecast for one coordinate pair.
    #[instrument(skip_all, fields(lat = %latitude, lon = %longitude))]
    pub async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Forecast, FetchError> {
        let url = self.request_url(latitude, longitude)?;
        execute(Arc::clone(&self.config.transport), url).await
    }

    /// Callback flavour of [`ForecastClient::fetch_forecast`].
    ///
    /// `completion` runs exactly once unless the returned handle is cancelled
    /// first. A malformed request completes immediately on the calling
    /// thread, and so does a call made outside a Tokio runtime.
    pub fn fetch_forecast_with<F>(&self, latitude: f64, longitude: f64, completion: F) -> FetchHandle
    where
        F: FnOnce(Result<Forecast, FetchError>) + Send + 'static,
    {
        let url = match self.request_url(latitude, longitude) {
            Ok(url) => url,
            Err(err) => {
                completion(Err(err));
                return FetchHandle { task: None };
            }
        };

        let Ok(runtime) = Handle::try_current() else {
            debug!("no async runtime, failing fetch");
            completion(Err(FetchError::NetworkFailure("no async runtime available".into())));
            return FetchHandle { task: None };
        };

        let transport = Arc::clone(&self.config.transport);
        let task = runtime.spawn(async move {
            let result = execute(transport, url).await;
            completion(result);
        });

        FetchHandle { task: Some(task) }
    }
}

#[async_trait]
impl ForecastApi for ForecastClient {
    async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Forecast, FetchError> {
        ForecastClient::fetch_forecast(self, latitude, longitude).await
    }
}

/// Handle to a fetch started with [`ForecastClient::fetch_forecast_with`].
#[derive(Debug)]
pub struct FetchHandle {
    task: Option<JoinHandle<()>>,
}

impl FetchHandle {
    /// Abort the in-flight request. The completion will not be called
    /// unless it was already running.
    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Wait until the fetch has completed or been cancelled.
    pub async fn join(self) {
        if let Some(task) = self.task {
            let _ = task.await;
        }
    }
}

async fn execute(
    transport: Arc<dyn HttpTransport>,
    url: Url,
) -> Result<Forecast, FetchError> {
    // The path carries the API key; keep it out of the logs.
    debug!(host = url.host_str().unwrap_or_default(), "requesting forecast");

    let response = transport.get(url).await.map_err(FetchError::NetworkFailure)?;
    if !response.status.is_success() {
        debug!(status = %response.status, "non-success status, decoding body anyway");
    }

    decode_forecast(&response.body)
}

fn decode_forecast(body: &[u8]) -> Result<Forecast, FetchError> {
    if body.is_empty() {
        debug!("empty response body");
        return Err(FetchError::DecodeFailure);
    }

    serde_json::from_slice(body).map_err(|err| {
        debug!(error = %err, "forecast body did not decode");
        FetchError::DecodeFailure
    })
}
