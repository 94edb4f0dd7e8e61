//! The conversion service seam and its reqwest implementation.
//!
//! The session and the prober only see [`ConversionService`]; tests drive
//! them with in-process fakes, production code with
//! [`HttpConversionService`].
//!
//! ## Wire contract
//!
//! ```text
//! probe    POST <endpoint>  application/json  {"test": true}
//!          2xx + JSON body          → Ok
//! convert  POST <endpoint>  multipart/form-data, field "file"
//!          2xx, body = UTF-8 Markdown → Ok(text)
//! failure  non-2xx, body may be {"error": "<message>"}
//! ```

use crate::config::ConversionConfig;
use crate::error::{Batch2MdError, ConversionError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Response, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Fallback message when a failure body carries no readable error.
const UNKNOWN_ERROR: &str = "unknown error";

/// A remote service that turns one file into Markdown text.
///
/// Implementations must resolve each call exactly once (success or failure);
/// the session awaits every call before sending the next.
#[async_trait]
pub trait ConversionService: Send + Sync {
    /// Lightweight reachability check; converts nothing.
    async fn probe(&self) -> Result<(), ConversionError>;

    /// Convert one file. `name` travels with the payload so the service can
    /// pick a decoder from the extension.
    async fn convert(&self, name: &str, payload: Bytes) -> Result<String, ConversionError>;
}

#[derive(Debug, Serialize)]
struct ProbeRequest {
    test: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

/// [`ConversionService`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpConversionService {
    client: Client,
    endpoint: Url,
}

impl HttpConversionService {
    /// Build a client for `config.endpoint` with the configured timeouts.
    pub fn new(config: &ConversionConfig) -> Result<Self, Batch2MdError> {
        let endpoint = Url::parse(&config.endpoint)
            .map_err(|e| Batch2MdError::InvalidConfig(format!("endpoint: {e}")))?;

        let mut builder = Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| Batch2MdError::ClientBuild(e.to_string()))?;

        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ConversionService for HttpConversionService {
    async fn probe(&self) -> Result<(), ConversionError> {
        debug!("Probing {}", self.endpoint);
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(ACCEPT, "application/json")
            .json(&ProbeRequest { test: true })
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        debug!("Probe response status: {}", status);
        if !status.is_success() {
            return Err(service_error(response).await);
        }

        let ack: serde_json::Value = response.json().await.map_err(|e| ConversionError::Unknown {
            detail: error_chain(&e),
        })?;
        debug!("Probe acknowledgement: {}", ack);
        Ok(())
    }

    async fn convert(&self, name: &str, payload: Bytes) -> Result<String, ConversionError> {
        debug!("Sending {} ({} bytes) to {}", name, payload.len(), self.endpoint);
        let len = payload.len() as u64;
        let part = Part::stream_with_length(Body::from(payload), len).file_name(name.to_string());
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        debug!("{}: response status {}", name, status);
        if !status.is_success() {
            return Err(service_error(response).await);
        }

        let body = response.bytes().await.map_err(|e| ConversionError::Unknown {
            detail: format!("failed to read response body: {}", error_chain(&e)),
        })?;
        String::from_utf8(body.to_vec()).map_err(|e| ConversionError::Unknown {
            detail: format!("response is not valid UTF-8: {e}"),
        })
    }
}

fn transport_error(e: reqwest::Error) -> ConversionError {
    let detail = error_chain(&e);
    warn!("Request did not complete: {}", detail);
    ConversionError::Transport { detail }
}

async fn service_error(response: Response) -> ConversionError {
    let status = response.status().as_u16();
    let message = match response.bytes().await {
        Ok(body) => service_message(status, &body),
        Err(_) => UNKNOWN_ERROR.to_string(),
    };
    warn!("Service returned {}: {}", status, message);
    ConversionError::Service { status, message }
}

/// Message for a non-success reply.
///
/// A JSON body with a non-empty `error` string wins; other JSON falls back to
/// the status code; anything unparseable is an unknown error.
pub(crate) fn service_message(status: u16, body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody { error: Some(msg) }) if !msg.is_empty() => msg,
        Ok(_) => format!("server error: {status}"),
        Err(_) => UNKNOWN_ERROR.to_string(),
    }
}

/// Render an error with its `source()` chain, e.g.
/// `error sending request: client error (Connect): connection refused`.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut msg = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        msg.push_str(": ");
        msg.push_str(&s.to_string());
        source = s.source();
    }
    msg
}
