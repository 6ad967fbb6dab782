//! Transport seam between the gateway and the wire.
//!
//! Production traffic goes over HTTP via [`HttpTransport`]; tests substitute
//! a scripted implementation of [`Transport`].

use crate::protocol::{Action, Envelope, Params};
use async_trait::async_trait;
use derive_more::{Display, Error, From};
use tracing::{debug, instrument};

/// Failure to obtain a response envelope.
///
/// This covers the "no response received" case only; an envelope with an
/// `error` status is a successful transport round trip.
#[derive(Debug, Display, Error, From)]
pub enum TransportError {
    /// The HTTP request failed or the body could not be read.
    #[display("http request failed: {_0}")]
    Http(reqwest::Error),
    /// A parameter value could not be encoded.
    #[display("parameter encoding failed: {_0}")]
    Encode(serde_json::Error),
}

/// A single logical channel to the game service.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Performs one request and returns the decoded response envelope.
    async fn send(&self, action: Action, params: &Params) -> Result<Envelope, TransportError>;
}

/// HTTP transport for the game service.
///
/// Requests are GETs against `{base_url}/{action}`; each parameter value is
/// JSON-encoded individually, and a `_time` millisecond timestamp defeats
/// intermediate caches.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport rooted at the given backend path.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, params), fields(action = %action))]
    async fn send(&self, action: Action, params: &Params) -> Result<Envelope, TransportError> {
        let url = format!("{}/{}", self.base_url, action.wire_name());

        let mut query: Vec<(String, String)> = Vec::with_capacity(params.len() + 1);
        query.push((
            "_time".to_string(),
            chrono::Utc::now().timestamp_millis().to_string(),
        ));
        for (key, value) in params {
            query.push(((*key).to_string(), serde_json::to_string(value)?));
        }

        debug!(url = %url, "Sending request");
        let envelope = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await?
            .json::<Envelope>()
            .await?;
        debug!(status = %envelope.status, "Received envelope");

        Ok(envelope)
    }
}
