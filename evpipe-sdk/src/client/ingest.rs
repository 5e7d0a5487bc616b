//! Ingest client (producer → evpipe server).

use bytes::Bytes;
use reqwest::Client;
use url::Url;

use super::ClientError;
use crate::codec;
use crate::objects::ingest::ENCODED_EVENT_CONTENT_TYPE;
use crate::objects::{Event, MetricsSnapshot, RecordAccepted};

/// Typed HTTP client that publishes encoded events to one topic and reads
/// the server's counters.
#[derive(Debug, Clone)]
pub struct IngestClient {
    http: Client,
    base_url: Url,
    topic: String,
}

impl IngestClient {
    /// Create a new `IngestClient`.
    ///
    /// * `base_url` – root URL of the evpipe server.
    /// * `topic` – the topic the server consumes.
    pub fn new(base_url: Url, topic: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url,
            topic: topic.into(),
        }
    }

    /// Replace the default `reqwest::Client` with a custom one.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Encode `event` and publish it. Returns the assigned offset.
    pub async fn publish(&self, event: &Event) -> Result<u64, ClientError> {
        self.publish_raw(codec::encode(event)).await
    }

    /// `POST /topics/{topic}/records` – publish pre-encoded bytes as-is.
    ///
    /// The server accepts any bytes; malformed records are counted as
    /// decode failures by the pipeline, not rejected here.
    pub async fn publish_raw(&self, payload: impl Into<Bytes>) -> Result<u64, ClientError> {
        let url = records_url(&self.base_url, &self.topic)?;

        let resp = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, ENCODED_EVENT_CONTENT_TYPE)
            .body(payload.into())
            .send()
            .await?;

        let accepted: RecordAccepted = parse_response(resp).await?;
        Ok(accepted.offset)
    }

    /// `GET /metrics` – current counter values.
    pub async fn metrics(&self) -> Result<MetricsSnapshot, ClientError> {
        let url = self.base_url.join("/metrics")?;
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }
}

/// `{base}/topics/{topic}/records`, with `topic` percent-encoded as a
/// single path segment.
fn records_url(base: &Url, topic: &str) -> Result<Url, ClientError> {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| ClientError::CannotBeABase(base.clone()))?
        .clear()
        .extend(["topics", topic, "records"]);
    Ok(url)
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        body::Bytes as BodyBytes,
        extract::{Path, State},
        http::StatusCode,
        routing::{get, post},
    };
    use std::sync::{Arc, Mutex};

    type Received = Arc<Mutex<Vec<(String, Vec<u8>)>>>;

    async fn spawn_server() -> (Url, Received) {
        let received: Received = Arc::default();

        async fn ingest(
            State(received): State<Received>,
            Path(topic): Path<String>,
            body: BodyBytes,
        ) -> (StatusCode, Json<RecordAccepted>) {
            let mut guard = received.lock().unwrap();
            guard.push((topic, body.to_vec()));
            let offset = guard.len() as u64 - 1;
            (StatusCode::ACCEPTED, Json(RecordAccepted { offset }))
        }

        async fn metrics() -> Json<MetricsSnapshot> {
            Json(MetricsSnapshot {
                records_in: 7,
                ..Default::default()
            })
        }

        let app = Router::new()
            .route("/topics/{topic}/records", post(ingest))
            .route("/metrics", get(metrics))
            .route(
                "/broken/metrics",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down") }),
            )
            .with_state(received.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (Url::parse(&format!("http://{addr}")).unwrap(), received)
    }

    #[tokio::test]
    async fn test_publish_sends_encoded_event() {
        let (base, received) = spawn_server().await;
        let client = IngestClient::new(base, "events");
        let event = Event::new(42, "test").with_property("value", "test-value");

        let offset = client.publish(&event).await.unwrap();
        assert_eq!(offset, 0);

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, "events");
        assert_eq!(codec::decode(&received[0].1).unwrap(), event);
    }

    #[test]
    fn test_records_url_encodes_topic_as_one_segment() {
        let base = Url::parse("http://localhost:8080").unwrap();
        assert_eq!(
            records_url(&base, "events").unwrap().as_str(),
            "http://localhost:8080/topics/events/records"
        );
        assert_eq!(
            records_url(&base, "a/b?c#d e").unwrap().as_str(),
            "http://localhost:8080/topics/a%2Fb%3Fc%23d%20e/records"
        );
    }

    #[test]
    fn test_records_url_rejects_cannot_be_a_base() {
        let base = Url::parse("mailto:ops@example.com").unwrap();
        assert!(matches!(
            records_url(&base, "events"),
            Err(ClientError::CannotBeABase(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_to_topic_with_reserved_characters() {
        let (base, received) = spawn_server().await;
        let client = IngestClient::new(base, "a/b?c#d");

        client.publish_raw(vec![1u8]).await.unwrap();
        assert_eq!(received.lock().unwrap()[0].0, "a/b?c#d");
    }

    #[tokio::test]
    async fn test_publish_raw_passes_bytes_through() {
        let (base, received) = spawn_server().await;
        let client = IngestClient::new(base, "events");

        client.publish_raw(vec![0u8, 1, 2]).await.unwrap();
        assert_eq!(received.lock().unwrap()[0].1, vec![0u8, 1, 2]);
    }

    #[tokio::test]
    async fn test_metrics_roundtrip() {
        let (base, _) = spawn_server().await;
        let client = IngestClient::new(base, "events");
        assert_eq!(client.metrics().await.unwrap().records_in, 7);
    }

    #[tokio::test]
    async fn test_non_success_status_is_api_error() {
        let (base, _) = spawn_server().await;
        let client = IngestClient::new(base.clone(), "events");
        let resp = client
            .http
            .get(base.join("/broken/metrics").unwrap())
            .send()
            .await
            .unwrap();
        let err = parse_response::<MetricsSnapshot>(resp).await.unwrap_err();
        match err {
            ClientError::Api { status, body } => {
                assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
                assert_eq!(body, "down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
