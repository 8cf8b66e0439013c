use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use pulse_core::FeedbackRecord;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("collector transport failure: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("collector endpoint returned http status {status}")]
    Status { status: u16 },
}

/// Outbound sink for finished feedback records. Delivery is advisory: the
/// caller keeps its own copy and treats a failed delivery as a warning.
#[async_trait]
pub trait FeedbackCollector: Send + Sync {
    async fn deliver(&self, record: &FeedbackRecord) -> Result<(), CollectorError>;
}

/// POSTs each record as JSON to the collection endpoint. Request deadlines
/// come from the client's configured timeout.
pub struct HttpCollector {
    http: reqwest::Client,
    endpoint_url: String,
}

impl HttpCollector {
    pub fn new(http: reqwest::Client, endpoint_url: impl Into<String>) -> Self {
        Self { http, endpoint_url: endpoint_url.into() }
    }
}

#[async_trait]
impl FeedbackCollector for HttpCollector {
    async fn deliver(&self, record: &FeedbackRecord) -> Result<(), CollectorError> {
        let response = self
            .http
            .post(&self.endpoint_url)
            .json(record)
            .send()
            .await
            .map_err(CollectorError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::Status { status: status.as_u16() });
        }

        debug!(
            event_name = "egress.collector.delivered",
            record_id = %record.record_id,
            status = status.as_u16(),
            "feedback record delivered to collector"
        );
        Ok(())
    }
}

/// Swallows every record. Useful when no collection endpoint is reachable,
/// and as the delivery stand-in for tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCollector;

#[async_trait]
impl FeedbackCollector for NoopCollector {
    async fn deliver(&self, _record: &FeedbackRecord) -> Result<(), CollectorError> {
        Ok(())
    }
}
