use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::decode::decode_envelope;
use crate::events::{default_dispatcher, EventContext, EventDispatcher, SurveyEvent};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

/// One socket mode frame as received, before any decoding. The envelope id
/// is lifted out so the frame can be acknowledged even when the payload
/// turns out to be garbage.
#[derive(Clone, Debug, PartialEq)]
pub struct RawEnvelope {
    pub envelope_id: String,
    pub payload: serde_json::Value,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<RawEnvelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;

    /// True for the placeholder transport, so startup can say whether a
    /// live connection will actually be pumped.
    fn is_noop(&self) -> bool {
        false
    }
}

#[derive(Default)]
pub struct NoopSocketTransport;

#[async_trait]
impl SocketTransport for NoopSocketTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<RawEnvelope>, TransportError> {
        Ok(None)
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn is_noop(&self) -> bool {
        true
    }
}

pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: EventDispatcher,
    reconnect_policy: ReconnectPolicy,
}

impl Default for SocketModeRunner {
    fn default() -> Self {
        Self {
            transport: Arc::new(NoopSocketTransport),
            dispatcher: default_dispatcher(),
            reconnect_policy: ReconnectPolicy::default(),
        }
    }
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, reconnect_policy }
    }

    pub fn is_noop_transport(&self) -> bool {
        self.transport.is_noop()
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "socket mode transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "socket mode retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening socket mode transport connection");
        self.transport.connect().await?;
        info!(attempt, "socket mode transport connected");

        loop {
            let Some(raw) = self.transport.next_envelope().await? else {
                info!(attempt, "socket mode transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };

            info!(
                event_name = "ingress.slack.envelope_received",
                envelope_id = %raw.envelope_id,
                correlation_id = %raw.envelope_id,
                "received socket envelope"
            );

            // Ack first, unconditionally. The gateway redelivers anything
            // left unacknowledged, whatever happens to the payload below.
            if let Err(error) = self.transport.acknowledge(&raw.envelope_id).await {
                warn!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %raw.envelope_id,
                    correlation_id = %raw.envelope_id,
                    error = %error,
                    "failed to acknowledge socket envelope"
                );
            } else {
                debug!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %raw.envelope_id,
                    correlation_id = %raw.envelope_id,
                    "acknowledged socket envelope"
                );
            }

            let envelope = match decode_envelope(&raw) {
                Ok(envelope) => envelope,
                Err(error) => {
                    warn!(
                        event_name = "ingress.slack.envelope_undecodable",
                        envelope_id = %raw.envelope_id,
                        correlation_id = %raw.envelope_id,
                        error = %error,
                        "dropping undecodable socket payload; envelope was still acknowledged"
                    );
                    continue;
                }
            };
            let (user_id, thread_id) = correlation_fields(&envelope.event);

            debug!(
                event_name = "ingress.slack.envelope_decoded",
                envelope_id = %envelope.envelope_id,
                correlation_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                user_id = user_id.as_deref().unwrap_or("unknown"),
                thread_id = thread_id.as_deref().unwrap_or("unknown"),
                "decoded socket envelope"
            );

            let context = EventContext { correlation_id: envelope.envelope_id.clone() };
            if let Err(error) = self.dispatcher.dispatch(&envelope, &context).await {
                warn!(
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %envelope.envelope_id,
                    user_id = user_id.as_deref().unwrap_or("unknown"),
                    thread_id = thread_id.as_deref().unwrap_or("unknown"),
                    error = %error,
                    "event dispatch failed; continuing socket loop"
                );
            }
        }
    }
}

fn correlation_fields(event: &SurveyEvent) -> (Option<String>, Option<String>) {
    match event {
        SurveyEvent::Message(event) => (None, Some(event.thread_ts.clone())),
        SurveyEvent::PromptAccepted(event) => {
            (Some(event.user_id.clone()), Some(event.thread_ts.clone()))
        }
        SurveyEvent::RatingSelected(event) => (Some(event.user_id.clone()), None),
        SurveyEvent::CommentEdited(event) => (Some(event.user_id.clone()), None),
        SurveyEvent::SubmitRequested(event) => {
            (Some(event.user_id.clone()), Some(event.thread_ts.clone()))
        }
        SurveyEvent::Unsupported { .. } => (None, None),
    }
}
