use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use pulse_core::SessionStore;
use pulse_slack::api::{ChatGateway, UNKNOWN_NAME};
use pulse_slack::blocks::feedback_form_message;
use pulse_slack::events::{
    CommentEditedEvent, EventContext, EventHandlerError, FormOpen, FormService,
    PromptAcceptedEvent, RatingSelectedEvent,
};

/// Opens the feedback form when the survey offer is accepted and soaks up
/// field edits as they stream in. Field recording is last-write-wins with no
/// ordering requirement between rating and comment events.
#[derive(Clone)]
pub struct FormEngine {
    store: SessionStore,
    gateway: Arc<dyn ChatGateway>,
}

impl FormEngine {
    pub fn new(store: SessionStore, gateway: Arc<dyn ChatGateway>) -> Self {
        Self { store, gateway }
    }

    /// Resolves and caches the display name on first contact. A failed
    /// lookup caches `Unknown` rather than blocking the form.
    async fn ensure_display_name(&self, user_id: &str, ctx: &EventContext) {
        if self.store.cached_display_name(user_id).is_some() {
            return;
        }

        let display_name = match self.gateway.lookup_user(user_id).await {
            Ok(name) => name,
            Err(error) => {
                warn!(
                    event_name = "survey.form.user_lookup_failed",
                    correlation_id = %ctx.correlation_id,
                    user_id = %user_id,
                    error = %error,
                    "user lookup failed; falling back to Unknown"
                );
                UNKNOWN_NAME.to_owned()
            }
        };
        self.store.cache_display_name(user_id, display_name);
    }
}

#[async_trait]
impl FormService for FormEngine {
    async fn open_form(
        &self,
        event: &PromptAcceptedEvent,
        ctx: &EventContext,
    ) -> Result<FormOpen, EventHandlerError> {
        if self.store.has_submitted(&event.user_id, &event.thread_ts) {
            debug!(
                event_name = "survey.form.already_submitted",
                correlation_id = %ctx.correlation_id,
                user_id = %event.user_id,
                thread_id = %event.thread_ts,
                "feedback already submitted for this thread; not reopening the form"
            );
            return Ok(FormOpen::AlreadySubmitted);
        }

        self.ensure_display_name(&event.user_id, ctx).await;

        let form_ts = self
            .gateway
            .post_message(&event.channel_id, &event.thread_ts, &feedback_form_message())
            .await
            .map_err(|error| EventHandlerError::Form(error.to_string()))?;
        self.store.set_pending_form(&event.user_id, form_ts.clone());

        info!(
            event_name = "survey.form.opened",
            correlation_id = %ctx.correlation_id,
            user_id = %event.user_id,
            thread_id = %event.thread_ts,
            form_ts = %form_ts,
            "feedback form posted"
        );
        Ok(FormOpen::Opened { form_ts })
    }

    async fn rating_selected(
        &self,
        event: &RatingSelectedEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        self.store.record_rating(&event.user_id, event.rating);
        debug!(
            event_name = "survey.form.rating_recorded",
            correlation_id = %ctx.correlation_id,
            user_id = %event.user_id,
            rating = %event.rating,
            "rating recorded"
        );
        Ok(())
    }

    async fn comment_edited(
        &self,
        event: &CommentEditedEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        self.store.record_comments(&event.user_id, event.text.clone());
        debug!(
            event_name = "survey.form.comment_recorded",
            correlation_id = %ctx.correlation_id,
            user_id = %event.user_id,
            "comment recorded"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use pulse_core::{Rating, SessionStore};
    use pulse_slack::api::{ChatGateway, GatewayError};
    use pulse_slack::blocks::MessageTemplate;
    use pulse_slack::events::{
        CommentEditedEvent, EventContext, EventHandlerError, FormOpen, FormService,
        PromptAcceptedEvent, RatingSelectedEvent,
    };

    use super::FormEngine;

    #[derive(Default)]
    struct RecordingGateway {
        posts: Mutex<Vec<(String, String, String)>>,
        user_lookups: Mutex<Vec<String>>,
        fail_posts: bool,
        fail_lookups: bool,
    }

    impl RecordingGateway {
        async fn posts(&self) -> Vec<(String, String, String)> {
            self.posts.lock().await.clone()
        }

        async fn user_lookups(&self) -> Vec<String> {
            self.user_lookups.lock().await.clone()
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
                return Err(GatewayError::Status { method: "chat.postMessage", status: 500 });
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

        async fn lookup_user(&self, user_id: &str) -> Result<String, GatewayError> {
            self.user_lookups.lock().await.push(user_id.to_owned());
            if self.fail_lookups {
                return Err(GatewayError::Api {
                    method: "users.info",
                    error: "user_not_found".to_owned(),
                });
            }
            Ok("Dana Oduya".to_owned())
        }

        async fn lookup_channel(&self, _channel_id: &str) -> Result<String, GatewayError> {
            Ok("support".to_owned())
        }
    }

    fn acceptance() -> PromptAcceptedEvent {
        PromptAcceptedEvent {
            user_id: "U1".to_owned(),
            channel_id: "C1".to_owned(),
            thread_ts: "1730000000.1000".to_owned(),
        }
    }

    fn engine(store: &SessionStore, gateway: &Arc<RecordingGateway>) -> FormEngine {
        FormEngine::new(store.clone(), Arc::clone(gateway) as Arc<dyn ChatGateway>)
    }

    /// qa-tag: fake-in-memory-critical-path (bd-3vp2.1)
    #[tokio::test]
    async fn opens_the_form_and_remembers_its_ts() {
        let store = SessionStore::default();
        let gateway = Arc::new(RecordingGateway::default());
        let engine = engine(&store, &gateway);

        let open = engine.open_form(&acceptance(), &EventContext::default()).await.expect("open");

        assert_eq!(open, FormOpen::Opened { form_ts: "1730000100.0001".to_owned() });
        assert_eq!(
            store.peek("U1", |session| session.pending_form_ts.clone()).flatten().as_deref(),
            Some("1730000100.0001")
        );
        assert_eq!(store.cached_display_name("U1").as_deref(), Some("Dana Oduya"));
        assert_eq!(gateway.posts().await.len(), 1);
        assert_eq!(gateway.posts().await[0].2, "Please provide your feedback");
    }

    #[tokio::test]
    async fn reopening_reuses_the_cached_name_and_newest_form() {
        let store = SessionStore::default();
        let gateway = Arc::new(RecordingGateway::default());
        let engine = engine(&store, &gateway);
        let ctx = EventContext::default();

        engine.open_form(&acceptance(), &ctx).await.expect("first open");
        let open = engine.open_form(&acceptance(), &ctx).await.expect("second open");

        assert_eq!(open, FormOpen::Opened { form_ts: "1730000100.0002".to_owned() });
        assert_eq!(gateway.user_lookups().await, vec!["U1"], "name resolved once");
        assert_eq!(
            store.peek("U1", |session| session.pending_form_ts.clone()).flatten().as_deref(),
            Some("1730000100.0002"),
            "confirmation will edit the newest form"
        );
    }

    #[tokio::test]
    async fn does_not_reopen_after_submission() {
        let store = SessionStore::default();
        store.record_rating("U1", Rating::new(7).expect("in domain"));
        store.claim_submission("U1", "1730000000.1000");

        let gateway = Arc::new(RecordingGateway::default());
        let engine = engine(&store, &gateway);

        let open = engine.open_form(&acceptance(), &EventContext::default()).await.expect("open");

        assert_eq!(open, FormOpen::AlreadySubmitted);
        assert!(gateway.posts().await.is_empty());
        assert!(gateway.user_lookups().await.is_empty());
    }

    #[tokio::test]
    async fn failed_name_lookup_caches_unknown() {
        let store = SessionStore::default();
        let gateway = Arc::new(RecordingGateway { fail_lookups: true, ..Default::default() });
        let engine = engine(&store, &gateway);

        engine.open_form(&acceptance(), &EventContext::default()).await.expect("open");

        assert_eq!(store.cached_display_name("U1").as_deref(), Some("Unknown"));
        assert_eq!(gateway.posts().await.len(), 1, "the form still opens");
    }

    #[tokio::test]
    async fn failed_form_post_leaves_no_pending_form() {
        let store = SessionStore::default();
        let gateway = Arc::new(RecordingGateway { fail_posts: true, ..Default::default() });
        let engine = engine(&store, &gateway);

        let error = engine
            .open_form(&acceptance(), &EventContext::default())
            .await
            .expect_err("post failure should surface");

        assert!(matches!(error, EventHandlerError::Form(_)));
        assert_eq!(store.peek("U1", |session| session.pending_form_ts.clone()).flatten(), None);
    }

    #[tokio::test]
    async fn field_edits_are_last_write_wins_in_any_order() {
        let store = SessionStore::default();
        let gateway = Arc::new(RecordingGateway::default());
        let engine = engine(&store, &gateway);
        let ctx = EventContext::default();

        engine
            .comment_edited(
                &CommentEditedEvent { user_id: "U1".to_owned(), text: "first draft".to_owned() },
                &ctx,
            )
            .await
            .expect("comment");
        engine
            .rating_selected(
                &RatingSelectedEvent {
                    user_id: "U1".to_owned(),
                    rating: Rating::new(3).expect("in domain"),
                },
                &ctx,
            )
            .await
            .expect("rating");
        engine
            .rating_selected(
                &RatingSelectedEvent {
                    user_id: "U1".to_owned(),
                    rating: Rating::new(8).expect("in domain"),
                },
                &ctx,
            )
            .await
            .expect("rating");
        engine
            .comment_edited(
                &CommentEditedEvent { user_id: "U1".to_owned(), text: "Great support".to_owned() },
                &ctx,
            )
            .await
            .expect("comment");

        let (rating, comments) = store
            .peek("U1", |session| (session.rating, session.comments.clone()))
            .expect("session exists");
        assert_eq!(rating.map(Rating::value), Some(8));
        assert_eq!(comments.as_deref(), Some("Great support"));
    }
}
