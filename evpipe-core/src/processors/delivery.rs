//! DeliveryStage processor.
//!
//! The DeliveryStage is responsible for:
//! - Waiting for admission from the shared `RateLimiter`
//! - Building the outbound request (POST, `text/plain; charset=UTF-8`)
//! - Dispatching it through an `EventSink`
//! - Counting successful deliveries (`recordsOut`)
//!
//! The rate-limit wait and the dispatch are each bounded by the configured
//! external service timeout. Failures are never retried.

use super::transform::TransformedPayload;
use crate::config::ExternalServiceConfig;
use crate::metrics::MetricsRegistry;
use crate::throttle::RateLimiter;
use async_trait::async_trait;
use evpipe_sdk::objects::CounterName;
use kanau::processor::Processor;
use reqwest::Method;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Content type of every outbound request.
pub const OUTBOUND_CONTENT_TYPE: &str = "text/plain; charset=UTF-8";

/// Errors that can occur during delivery.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The sink answered with a non-2xx status
    #[error("delivery failed with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// No rate-limit slot opened in time
    #[error("rate limiter wait exceeded {0:?}")]
    ThrottleTimeout(Duration),

    /// The sink did not answer in time
    #[error("dispatch exceeded {0:?}")]
    Timeout(Duration),
}

/// The request emitted for one delivered record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub content_type: &'static str,
    pub body: String,
}

impl OutboundRequest {
    /// A `POST` of `body` as UTF-8 plain text.
    pub fn text_plain(url: Url, body: String) -> Self {
        Self {
            method: Method::POST,
            url,
            content_type: OUTBOUND_CONTENT_TYPE,
            body,
        }
    }
}

/// Transport for outbound requests.
///
/// Implementations report any non-success outcome as an error.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn dispatch(&self, request: OutboundRequest) -> Result<(), DeliveryError>;
}

/// `EventSink` backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpSink {
    http_client: reqwest::Client,
}

impl HttpSink {
    /// Create a new HttpSink whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Use an existing client (e.g. with a proxy or custom TLS settings).
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl EventSink for HttpSink {
    async fn dispatch(&self, request: OutboundRequest) -> Result<(), DeliveryError> {
        let response = self
            .http_client
            .request(request.method, request.url)
            .header(reqwest::header::CONTENT_TYPE, request.content_type)
            .body(request.body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Final pipeline stage: rate-limited dispatch to the external service.
pub struct DeliveryStage<S: EventSink> {
    sink: S,
    limiter: RateLimiter,
    target: Url,
    timeout: Duration,
    metrics: MetricsRegistry,
}

impl<S: EventSink> DeliveryStage<S> {
    /// Create a new DeliveryStage.
    ///
    /// # Arguments
    ///
    /// * `sink` - Transport used for dispatch
    /// * `limiter` - Admission gate shared with every other delivery
    /// * `config` - Target URL and timeout
    /// * `metrics` - Counter registry
    pub fn new(
        sink: S,
        limiter: RateLimiter,
        config: &ExternalServiceConfig,
        metrics: MetricsRegistry,
    ) -> Self {
        Self {
            sink,
            limiter,
            target: config.url.clone(),
            timeout: config.timeout,
            metrics,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S: EventSink> Processor<TransformedPayload> for DeliveryStage<S> {
    type Output = ();
    type Error = DeliveryError;
    #[tracing::instrument(skip_all, err(level = "debug"), name = "Stage:Delivery", fields(event_id = payload.event_id))]
    async fn process(&self, payload: TransformedPayload) -> Result<(), DeliveryError> {
        tokio::time::timeout(self.timeout, self.limiter.acquire())
            .await
            .map_err(|_| DeliveryError::ThrottleTimeout(self.timeout))?;

        let request = OutboundRequest::text_plain(self.target.clone(), payload.body);
        tokio::time::timeout(self.timeout, self.sink.dispatch(request))
            .await
            .map_err(|_| DeliveryError::Timeout(self.timeout))??;

        self.metrics.increment(CounterName::RecordsOut);
        Ok(())
    }
}
