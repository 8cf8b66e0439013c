use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use pulse_core::config::{AppConfig, ConfigError, LoadOptions};
use pulse_core::{FeedbackLog, SessionStore};
use pulse_slack::api::{ChatGateway, SlackApiClient};
use pulse_slack::events::{
    CommentEditedHandler, EventDispatcher, MessageHandler, PromptAcceptedHandler,
    RatingSelectedHandler, SubmitHandler,
};
use pulse_slack::socket::{NoopSocketTransport, ReconnectPolicy, SocketModeRunner};
use pulse_survey::{FeedbackCollector, FormEngine, HttpCollector, PromptEngine, SubmissionFinalizer};

pub struct Application {
    pub config: AppConfig,
    pub session_store: SessionStore,
    pub feedback_log: FeedbackLog,
    pub slack_runner: SocketModeRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        user_id = "unknown",
        thread_id = "unknown",
        "starting application bootstrap"
    );

    let session_store = SessionStore::default();
    let feedback_log = FeedbackLog::default();

    let gateway_http = reqwest::Client::builder().build().map_err(BootstrapError::HttpClient)?;
    let gateway: Arc<dyn ChatGateway> =
        Arc::new(SlackApiClient::new(gateway_http, config.slack.bot_token.clone()));

    let collector_http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.collector.timeout_secs))
        .build()
        .map_err(BootstrapError::HttpClient)?;
    let collector: Arc<dyn FeedbackCollector> =
        Arc::new(HttpCollector::new(collector_http, config.collector.endpoint_url.clone()));
    info!(
        event_name = "system.bootstrap.collector_ready",
        correlation_id = "bootstrap",
        user_id = "unknown",
        thread_id = "unknown",
        endpoint_url = %config.collector.endpoint_url,
        "feedback collector client constructed"
    );

    let prompt = PromptEngine::new(Arc::clone(&gateway), config.survey.trigger_phrase.clone());
    let form = FormEngine::new(session_store.clone(), Arc::clone(&gateway));
    let finalizer =
        SubmissionFinalizer::new(session_store.clone(), feedback_log.clone(), gateway, collector);

    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(MessageHandler::new(prompt));
    dispatcher.register(PromptAcceptedHandler::new(form.clone()));
    dispatcher.register(RatingSelectedHandler::new(form.clone()));
    dispatcher.register(CommentEditedHandler::new(form));
    dispatcher.register(SubmitHandler::new(finalizer));
    info!(
        event_name = "system.bootstrap.dispatcher_ready",
        correlation_id = "bootstrap",
        user_id = "unknown",
        thread_id = "unknown",
        handler_count = dispatcher.handler_count(),
        "survey event handlers registered"
    );

    let slack_runner = SocketModeRunner::new(
        Arc::new(NoopSocketTransport),
        dispatcher,
        ReconnectPolicy::default(),
    );

    Ok(Application { config, session_store, feedback_log, slack_runner })
}
