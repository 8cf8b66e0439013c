use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::blocks::MessageTemplate;

const SLACK_API_BASE_URL: &str = "https://slack.com/api";

/// Display name used whenever Slack will not tell us a real one.
pub const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("slack {method} transport failure: {source}")]
    Transport {
        method: &'static str,
        source: reqwest::Error,
    },
    #[error("slack {method} returned http status {status}")]
    Status { method: &'static str, status: u16 },
    #[error("slack {method} failed: {error}")]
    Api { method: &'static str, error: String },
    #[error("slack {method} response is missing `{field}`")]
    MissingResponseField {
        method: &'static str,
        field: &'static str,
    },
}

/// Outbound chat surface the survey engines talk through. One production
/// implementation ([`SlackApiClient`]); tests substitute recording fakes.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Posts a threaded message and returns the new message's ts.
    async fn post_message(
        &self,
        channel_id: &str,
        thread_ts: &str,
        template: &MessageTemplate,
    ) -> Result<String, GatewayError>;

    /// Replaces an existing message's text and blocks in place.
    async fn update_message(
        &self,
        channel_id: &str,
        message_ts: &str,
        template: &MessageTemplate,
    ) -> Result<(), GatewayError>;

    /// Human display name for a user id; `Unknown` when the profile hides one.
    async fn lookup_user(&self, user_id: &str) -> Result<String, GatewayError>;

    /// Channel name for a channel id; `Unknown` when the channel has none.
    async fn lookup_channel(&self, channel_id: &str) -> Result<String, GatewayError>;
}

/// Web API client over the bot token. Slack answers HTTP 200 for most
/// app-level failures, so every response goes through the JSON `ok` check
/// before any field is trusted.
pub struct SlackApiClient {
    http: reqwest::Client,
    base_url: String,
    bot_token: SecretString,
}

impl SlackApiClient {
    pub fn new(http: reqwest::Client, bot_token: SecretString) -> Self {
        Self { http, base_url: SLACK_API_BASE_URL.to_owned(), bot_token }
    }

    /// Points the client at a different API root, for proxies and stubs.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn post_request(&self, method: &'static str) -> reqwest::RequestBuilder {
        self.http
            .post(format!("{}/{method}", self.base_url))
            .bearer_auth(self.bot_token.expose_secret()) // ubs:ignore
    }

    fn get_request(&self, method: &'static str) -> reqwest::RequestBuilder {
        self.http
            .get(format!("{}/{method}", self.base_url))
            .bearer_auth(self.bot_token.expose_secret()) // ubs:ignore
    }

    async fn call(
        &self,
        method: &'static str,
        request: reqwest::RequestBuilder,
    ) -> Result<Value, GatewayError> {
        let response =
            request.send().await.map_err(|source| GatewayError::Transport { method, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status { method, status: status.as_u16() });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|source| GatewayError::Transport { method, source })?;
        let payload = ensure_api_ok(method, payload)?;

        debug!(event_name = "egress.slack.api_call", method, "slack api call succeeded");
        Ok(payload)
    }
}

#[async_trait]
impl ChatGateway for SlackApiClient {
    async fn post_message(
        &self,
        channel_id: &str,
        thread_ts: &str,
        template: &MessageTemplate,
    ) -> Result<String, GatewayError> {
        const METHOD: &str = "chat.postMessage";
        let body = post_message_body(channel_id, thread_ts, template);
        let payload = self.call(METHOD, self.post_request(METHOD).json(&body)).await?;
        message_ts(METHOD, &payload)
    }

    async fn update_message(
        &self,
        channel_id: &str,
        message_ts: &str,
        template: &MessageTemplate,
    ) -> Result<(), GatewayError> {
        const METHOD: &str = "chat.update";
        let body = update_message_body(channel_id, message_ts, template);
        self.call(METHOD, self.post_request(METHOD).json(&body)).await?;
        Ok(())
    }

    async fn lookup_user(&self, user_id: &str) -> Result<String, GatewayError> {
        const METHOD: &str = "users.info";
        let request = self.get_request(METHOD).query(&[("user", user_id)]);
        let payload = self.call(METHOD, request).await?;
        Ok(user_display_name(&payload))
    }

    async fn lookup_channel(&self, channel_id: &str) -> Result<String, GatewayError> {
        const METHOD: &str = "conversations.info";
        let request = self.get_request(METHOD).query(&[("channel", channel_id)]);
        let payload = self.call(METHOD, request).await?;
        Ok(channel_display_name(&payload))
    }
}

fn post_message_body(channel_id: &str, thread_ts: &str, template: &MessageTemplate) -> Value {
    json!({
        "channel": channel_id,
        "thread_ts": thread_ts,
        "text": template.fallback_text,
        "blocks": template.blocks,
    })
}

fn update_message_body(channel_id: &str, message_ts: &str, template: &MessageTemplate) -> Value {
    json!({
        "channel": channel_id,
        "ts": message_ts,
        "text": template.fallback_text,
        "blocks": template.blocks,
    })
}

fn ensure_api_ok(method: &'static str, payload: Value) -> Result<Value, GatewayError> {
    if payload.get("ok") == Some(&Value::Bool(false)) {
        let error = payload.get("error").and_then(Value::as_str).unwrap_or("unknown").to_owned();
        return Err(GatewayError::Api { method, error });
    }
    Ok(payload)
}

fn message_ts(method: &'static str, payload: &Value) -> Result<String, GatewayError> {
    payload
        .get("ts")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or(GatewayError::MissingResponseField { method, field: "ts" })
}

fn user_display_name(payload: &Value) -> String {
    payload.pointer("/user/real_name").and_then(Value::as_str).unwrap_or(UNKNOWN_NAME).to_owned()
}

fn channel_display_name(payload: &Value) -> String {
    payload.pointer("/channel/name").and_then(Value::as_str).unwrap_or(UNKNOWN_NAME).to_owned()
}
