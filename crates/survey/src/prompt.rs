use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use pulse_slack::api::ChatGateway;
use pulse_slack::blocks::survey_offer_message;
use pulse_slack::events::{
    EventContext, EventHandlerError, MessageEvent, PromptService, SurveyOffer,
};

/// Watches thread chatter for the resolution phrase and posts the survey
/// offer into the thread. Stateless by design: every matching message
/// prompts again, even in a thread that already saw an offer or a finished
/// survey. The substring match is case-sensitive.
#[derive(Clone)]
pub struct PromptEngine {
    gateway: Arc<dyn ChatGateway>,
    trigger_phrase: String,
}

impl PromptEngine {
    pub fn new(gateway: Arc<dyn ChatGateway>, trigger_phrase: impl Into<String>) -> Self {
        Self { gateway, trigger_phrase: trigger_phrase.into() }
    }
}

#[async_trait]
impl PromptService for PromptEngine {
    async fn offer_survey(
        &self,
        event: &MessageEvent,
        ctx: &EventContext,
    ) -> Result<SurveyOffer, EventHandlerError> {
        if !event.text.contains(&self.trigger_phrase) {
            return Ok(SurveyOffer::NotTriggered);
        }

        self.gateway
            .post_message(&event.channel_id, &event.thread_ts, &survey_offer_message())
            .await
            .map_err(|error| EventHandlerError::Prompt(error.to_string()))?;

        info!(
            event_name = "survey.prompt.offered",
            correlation_id = %ctx.correlation_id,
            channel_id = %event.channel_id,
            thread_id = %event.thread_ts,
            "resolution phrase detected; survey offer posted"
        );

        Ok(SurveyOffer::Offered)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use pulse_slack::api::{ChatGateway, GatewayError};
    use pulse_slack::blocks::MessageTemplate;
    use pulse_slack::events::{EventContext, EventHandlerError, MessageEvent, PromptService, SurveyOffer};

    use super::PromptEngine;

    #[derive(Default)]
    struct RecordingGateway {
        posts: Mutex<Vec<(String, String, String)>>,
        fail_posts: bool,
    }

    impl RecordingGateway {
        fn failing() -> Self {
            Self { fail_posts: true, ..Self::default() }
        }

        async fn posts(&self) -> Vec<(String, String, String)> {
            self.posts.lock().await.clone()
        }
    }

    #[async_trait]
    impl ChatGateway for RecordingGateway {
        async fn post_message(
            &self,
            channel_id: &str,
            thread_ts: &str,
            template: &MessageTemplate,
        ) -> Result<String, GatewayError> {
            if self.fail_posts {
                return Err(GatewayError::Api {
                    method: "chat.postMessage",
                    error: "channel_not_found".to_owned(),
                });
            }
            let mut posts = self.posts.lock().await;
            posts.push((
                channel_id.to_owned(),
                thread_ts.to_owned(),
                template.fallback_text.clone(),
            ));
            Ok(format!("1730000100.{:04}", posts.len()))
        }

        async fn update_message(
            &self,
            _channel_id: &str,
            _message_ts: &str,
            _template: &MessageTemplate,
        ) -> Result<(), GatewayError> {
            Ok(())
        }

        async fn lookup_user(&self, _user_id: &str) -> Result<String, GatewayError> {
            Ok("Unknown".to_owned())
        }

        async fn lookup_channel(&self, _channel_id: &str) -> Result<String, GatewayError> {
            Ok("Unknown".to_owned())
        }
    }

    fn message(text: &str) -> MessageEvent {
        MessageEvent {
            channel_id: "C1".to_owned(),
            thread_ts: "1730000000.1000".to_owned(),
            text: text.to_owned(),
        }
    }

    fn engine(gateway: &Arc<RecordingGateway>) -> PromptEngine {
        PromptEngine::new(Arc::clone(gateway) as Arc<dyn ChatGateway>, "This issue is resolved")
    }

    #[tokio::test]
    async fn posts_the_offer_into_the_triggering_thread() {
        let gateway = Arc::new(RecordingGateway::default());
        let engine = engine(&gateway);

        let offer = engine
            .offer_survey(&message("Confirmed on our side. This issue is resolved."), &EventContext::default())
            .await
            .expect("offer");

        assert_eq!(offer, SurveyOffer::Offered);
        assert_eq!(
            gateway.posts().await,
            vec![(
                "C1".to_owned(),
                "1730000000.1000".to_owned(),
                "Would you like to provide feedback?".to_owned()
            )]
        );
    }

    #[tokio::test]
    async fn stays_quiet_without_the_trigger_phrase() {
        let gateway = Arc::new(RecordingGateway::default());
        let engine = engine(&gateway);

        let offer = engine
            .offer_survey(&message("thanks everyone"), &EventContext::default())
            .await
            .expect("offer");

        assert_eq!(offer, SurveyOffer::NotTriggered);
        assert!(gateway.posts().await.is_empty());
    }

    #[tokio::test]
    async fn trigger_match_is_case_sensitive() {
        let gateway = Arc::new(RecordingGateway::default());
        let engine = engine(&gateway);

        let offer = engine
            .offer_survey(&message("this issue is resolved"), &EventContext::default())
            .await
            .expect("offer");

        assert_eq!(offer, SurveyOffer::NotTriggered);
        assert!(gateway.posts().await.is_empty());
    }

    #[tokio::test]
    async fn re_prompts_on_every_matching_message() {
        let gateway = Arc::new(RecordingGateway::default());
        let engine = engine(&gateway);
        let ctx = EventContext::default();

        for _ in 0..2 {
            let offer = engine
                .offer_survey(&message("This issue is resolved"), &ctx)
                .await
                .expect("offer");
            assert_eq!(offer, SurveyOffer::Offered);
        }

        assert_eq!(gateway.posts().await.len(), 2, "each match posts a fresh offer");
    }

    #[tokio::test]
    async fn surfaces_delivery_failures_as_prompt_errors() {
        let gateway = Arc::new(RecordingGateway::failing());
        let engine = engine(&gateway);

        let error = engine
            .offer_survey(&message("This issue is resolved"), &EventContext::default())
            .await
            .expect_err("post failure should surface");

        assert!(matches!(error, EventHandlerError::Prompt(_)));
    }
}
