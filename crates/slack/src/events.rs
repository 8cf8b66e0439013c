use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;

use pulse_core::config::DEFAULT_TRIGGER_PHRASE;
use pulse_core::Rating;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurveyEnvelope {
    pub envelope_id: String,
    pub event: SurveyEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurveyEvent {
    Message(MessageEvent),
    PromptAccepted(PromptAcceptedEvent),
    RatingSelected(RatingSelectedEvent),
    CommentEdited(CommentEditedEvent),
    SubmitRequested(SubmitRequestedEvent),
    Unsupported { event_type: String },
}

impl SurveyEvent {
    pub fn event_type(&self) -> SurveyEventType {
        match self {
            Self::Message(_) => SurveyEventType::Message,
            Self::PromptAccepted(_) => SurveyEventType::PromptAccepted,
            Self::RatingSelected(_) => SurveyEventType::RatingSelected,
            Self::CommentEdited(_) => SurveyEventType::CommentEdited,
            Self::SubmitRequested(_) => SurveyEventType::SubmitRequested,
            Self::Unsupported { .. } => SurveyEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SurveyEventType {
    Message,
    PromptAccepted,
    RatingSelected,
    CommentEdited,
    SubmitRequested,
    Unsupported,
}

/// Channel message as delivered by the events API. `thread_ts` is the
/// message's own ts when it starts a thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub thread_ts: String,
    pub text: String,
}

/// Yes button click on the survey offer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptAcceptedEvent {
    pub user_id: String,
    pub channel_id: String,
    pub thread_ts: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RatingSelectedEvent {
    pub user_id: String,
    pub rating: Rating,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommentEditedEvent {
    pub user_id: String,
    pub text: String,
}

/// Submit button click. `form_comments` is the text input's value from the
/// interaction's view-state snapshot, authoritative over any cached comment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitRequestedEvent {
    pub user_id: String,
    pub channel_id: String,
    pub thread_ts: String,
    pub form_comments: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Processed,
    Ignored,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error("survey prompt failure: {0}")]
    Prompt(String),
    #[error("feedback form failure: {0}")]
    Form(String),
    #[error("feedback submission failure: {0}")]
    Submission(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> SurveyEventType;
    async fn handle(
        &self,
        envelope: &SurveyEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<SurveyEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &SurveyEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

pub fn default_dispatcher() -> EventDispatcher {
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(MessageHandler::new(NoopPromptService));
    dispatcher.register(PromptAcceptedHandler::new(NoopFormService));
    dispatcher.register(RatingSelectedHandler::new(NoopFormService));
    dispatcher.register(CommentEditedHandler::new(NoopFormService));
    dispatcher.register(SubmitHandler::new(NoopFinalizerService));
    dispatcher
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SurveyOffer {
    Offered,
    NotTriggered,
}

#[async_trait]
pub trait PromptService: Send + Sync {
    async fn offer_survey(
        &self,
        event: &MessageEvent,
        ctx: &EventContext,
    ) -> Result<SurveyOffer, EventHandlerError>;
}

pub struct MessageHandler<S> {
    service: S,
}

impl<S> MessageHandler<S>
where
    S: PromptService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for MessageHandler<S>
where
    S: PromptService + 'static,
{
    fn event_type(&self) -> SurveyEventType {
        SurveyEventType::Message
    }

    async fn handle(
        &self,
        envelope: &SurveyEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SurveyEvent::Message(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.offer_survey(event, ctx).await?;
        Ok(HandlerResult::Processed)
    }
}

/// Trigger matching without delivery, so the crate routes end to end on its
/// own. The wired implementation lives in the survey crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPromptService;

#[async_trait]
impl PromptService for NoopPromptService {
    async fn offer_survey(
        &self,
        event: &MessageEvent,
        _ctx: &EventContext,
    ) -> Result<SurveyOffer, EventHandlerError> {
        if event.text.contains(DEFAULT_TRIGGER_PHRASE) {
            Ok(SurveyOffer::Offered)
        } else {
            Ok(SurveyOffer::NotTriggered)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormOpen {
    Opened { form_ts: String },
    AlreadySubmitted,
}

#[async_trait]
pub trait FormService: Send + Sync {
    async fn open_form(
        &self,
        event: &PromptAcceptedEvent,
        ctx: &EventContext,
    ) -> Result<FormOpen, EventHandlerError>;

    async fn rating_selected(
        &self,
        event: &RatingSelectedEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError>;

    async fn comment_edited(
        &self,
        event: &CommentEditedEvent,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError>;
}

pub struct PromptAcceptedHandler<S> {
    service: S,
}

impl<S> PromptAcceptedHandler<S>
where
    S: FormService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for PromptAcceptedHandler<S>
where
    S: FormService + 'static,
{
    fn event_type(&self) -> SurveyEventType {
        SurveyEventType::PromptAccepted
    }

    async fn handle(
        &self,
        envelope: &SurveyEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SurveyEvent::PromptAccepted(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.open_form(event, ctx).await?;
        Ok(HandlerResult::Processed)
    }
}

pub struct RatingSelectedHandler<S> {
    service: S,
}

impl<S> RatingSelectedHandler<S>
where
    S: FormService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for RatingSelectedHandler<S>
where
    S: FormService + 'static,
{
    fn event_type(&self) -> SurveyEventType {
        SurveyEventType::RatingSelected
    }

    async fn handle(
        &self,
        envelope: &SurveyEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SurveyEvent::RatingSelected(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.rating_selected(event, ctx).await?;
        Ok(HandlerResult::Processed)
    }
}

pub struct CommentEditedHandler<S> {
    service: S,
}

impl<S> CommentEditedHandler<S>
where
    S: FormService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for CommentEditedHandler<S>
where
    S: FormService + 'static,
{
    fn event_type(&self) -> SurveyEventType {
        SurveyEventType::CommentEdited
    }

    async fn handle(
        &self,
        envelope: &SurveyEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SurveyEvent::CommentEdited(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.comment_edited(event, ctx).await?;
        Ok(HandlerResult::Processed)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopFormService;

#[async_trait]
impl FormService for NoopFormService {
    async fn open_form(
        &self,
        _event: &PromptAcceptedEvent,
        _ctx: &EventContext,
    ) -> Result<FormOpen, EventHandlerError> {
        Ok(FormOpen::Opened { form_ts: "0000000000.000000".to_owned() })
    }

    async fn rating_selected(
        &self,
        _event: &RatingSelectedEvent,
        _ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        Ok(())
    }

    async fn comment_edited(
        &self,
        _event: &CommentEditedEvent,
        _ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Submitted { record_id: String },
    AlreadySubmitted,
    MissingRating,
}

#[async_trait]
pub trait FinalizerService: Send + Sync {
    async fn submit(
        &self,
        event: &SubmitRequestedEvent,
        ctx: &EventContext,
    ) -> Result<SubmissionOutcome, EventHandlerError>;
}

pub struct SubmitHandler<S> {
    service: S,
}

impl<S> SubmitHandler<S>
where
    S: FinalizerService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for SubmitHandler<S>
where
    S: FinalizerService + 'static,
{
    fn event_type(&self) -> SurveyEventType {
        SurveyEventType::SubmitRequested
    }

    async fn handle(
        &self,
        envelope: &SurveyEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let SurveyEvent::SubmitRequested(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        self.service.submit(event, ctx).await?;
        Ok(HandlerResult::Processed)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopFinalizerService;

#[async_trait]
impl FinalizerService for NoopFinalizerService {
    async fn submit(
        &self,
        _event: &SubmitRequestedEvent,
        _ctx: &EventContext,
    ) -> Result<SubmissionOutcome, EventHandlerError> {
        Ok(SubmissionOutcome::Submitted {
            record_id: "00000000-0000-0000-0000-000000000000".to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{
        default_dispatcher, CommentEditedEvent, EventContext, EventDispatcher, HandlerResult,
        MessageEvent, MessageHandler, NoopPromptService, PromptAcceptedEvent, PromptService,
        RatingSelectedEvent, SubmitRequestedEvent, SurveyEnvelope, SurveyEvent, SurveyOffer,
    };
    use pulse_core::Rating;

    fn message_envelope(envelope_id: &str, text: &str) -> SurveyEnvelope {
        SurveyEnvelope {
            envelope_id: envelope_id.to_owned(),
            event: SurveyEvent::Message(MessageEvent {
                channel_id: "C1".to_owned(),
                thread_ts: "1730000000.1000".to_owned(),
                text: text.to_owned(),
            }),
        }
    }

    /// qa-tag: fake-in-memory-critical-path (bd-3vp2.1)
    #[tokio::test]
    async fn dispatcher_routes_channel_messages() {
        let dispatcher = default_dispatcher();
        let envelope = message_envelope("env-1", "This issue is resolved, thanks!");

        let result =
            dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");

        assert_eq!(result, HandlerResult::Processed);
    }

    #[tokio::test]
    async fn dispatcher_returns_ignored_when_no_handler_registered() {
        let dispatcher = EventDispatcher::new();
        let envelope = message_envelope("env-2", "hello");

        let result =
            dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");

        assert_eq!(result, HandlerResult::Ignored);
    }

    #[test]
    fn default_dispatcher_registers_handlers() {
        let dispatcher = default_dispatcher();
        assert_eq!(dispatcher.handler_count(), 5);
    }

    #[tokio::test]
    async fn dispatcher_ignores_unsupported_events() {
        let dispatcher = default_dispatcher();
        let envelope = SurveyEnvelope {
            envelope_id: "env-3".to_owned(),
            event: SurveyEvent::Unsupported { event_type: "reaction_added".to_owned() },
        };

        let result =
            dispatcher.dispatch(&envelope, &EventContext::default()).await.expect("dispatch");

        assert_eq!(result, HandlerResult::Ignored);
    }

    #[tokio::test]
    async fn noop_prompt_service_matches_the_default_trigger() {
        let service = NoopPromptService;
        let triggered = MessageEvent {
            channel_id: "C1".to_owned(),
            thread_ts: "1730000000.1000".to_owned(),
            text: "Closing out: This issue is resolved".to_owned(),
        };
        let noise = MessageEvent { text: "thanks all".to_owned(), ..triggered.clone() };

        let offer = service.offer_survey(&triggered, &EventContext::default()).await;
        assert_eq!(offer, Ok(SurveyOffer::Offered));

        let offer = service.offer_survey(&noise, &EventContext::default()).await;
        assert_eq!(offer, Ok(SurveyOffer::NotTriggered));

        let cased = MessageEvent { text: "this issue is resolved".to_owned(), ..triggered };
        let offer = service.offer_survey(&cased, &EventContext::default()).await;
        assert_eq!(offer, Ok(SurveyOffer::NotTriggered), "trigger match is case-sensitive");
    }

    /// qa-tag: fake-in-memory-critical-path (bd-3vp2.1)
    #[tokio::test]
    async fn dispatcher_routes_each_form_interaction() {
        let dispatcher = default_dispatcher();
        let ctx = EventContext::default();
        let rating = Rating::new(8).expect("test ratings are in domain");

        let interactions = [
            SurveyEvent::PromptAccepted(PromptAcceptedEvent {
                user_id: "U1".to_owned(),
                channel_id: "C1".to_owned(),
                thread_ts: "1730000000.1000".to_owned(),
            }),
            SurveyEvent::RatingSelected(RatingSelectedEvent { user_id: "U1".to_owned(), rating }),
            SurveyEvent::CommentEdited(CommentEditedEvent {
                user_id: "U1".to_owned(),
                text: "quick turnaround".to_owned(),
            }),
            SurveyEvent::SubmitRequested(SubmitRequestedEvent {
                user_id: "U1".to_owned(),
                channel_id: "C1".to_owned(),
                thread_ts: "1730000000.1000".to_owned(),
                form_comments: Some("quick turnaround".to_owned()),
            }),
        ];

        for (index, event) in interactions.into_iter().enumerate() {
            let envelope = SurveyEnvelope { envelope_id: format!("env-int-{index}"), event };
            let result = dispatcher.dispatch(&envelope, &ctx).await.expect("dispatch");
            assert_eq!(result, HandlerResult::Processed, "interaction {index} should be handled");
        }
    }

    #[tokio::test]
    async fn handlers_ignore_envelopes_of_another_shape() {
        let handler = MessageHandler::new(NoopPromptService);
        let envelope = SurveyEnvelope {
            envelope_id: "env-4".to_owned(),
            event: SurveyEvent::CommentEdited(CommentEditedEvent {
                user_id: "U1".to_owned(),
                text: "misrouted".to_owned(),
            }),
        };

        let result = super::EventHandler::handle(&handler, &envelope, &EventContext::default())
            .await
            .expect("handle");

        assert_eq!(result, HandlerResult::Ignored);
    }
}
