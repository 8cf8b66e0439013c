use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use pulse_core::{FeedbackLog, FeedbackRecord, SessionStore, SubmissionClaim};
use pulse_slack::api::{ChatGateway, UNKNOWN_NAME};
use pulse_slack::blocks::confirmation_message;
use pulse_slack::events::{
    EventContext, EventHandlerError, FinalizerService, SubmissionOutcome, SubmitRequestedEvent,
};

use crate::collector::FeedbackCollector;

/// Turns a submit click into at most one feedback record per user per
/// thread. The store's claim settles who wins a race before any I/O starts;
/// everything after the claim degrades instead of failing, so a submission
/// that was accepted is always recorded and confirmed as far as possible.
#[derive(Clone)]
pub struct SubmissionFinalizer {
    store: SessionStore,
    log: FeedbackLog,
    gateway: Arc<dyn ChatGateway>,
    collector: Arc<dyn FeedbackCollector>,
}

impl SubmissionFinalizer {
    pub fn new(
        store: SessionStore,
        log: FeedbackLog,
        gateway: Arc<dyn ChatGateway>,
        collector: Arc<dyn FeedbackCollector>,
    ) -> Self {
        Self { store, log, gateway, collector }
    }

    async fn resolve_user_name(
        &self,
        cached: Option<String>,
        user_id: &str,
        ctx: &EventContext,
    ) -> String {
        if let Some(name) = cached {
            return name;
        }

        // Rare path: submit without ever opening a form. The fresh name is
        // used once and deliberately not written back to the session.
        match self.gateway.lookup_user(user_id).await {
            Ok(name) => name,
            Err(error) => {
                warn!(
                    event_name = "survey.submit.user_lookup_failed",
                    correlation_id = %ctx.correlation_id,
                    user_id = %user_id,
                    error = %error,
                    "user lookup failed; recording Unknown"
                );
                UNKNOWN_NAME.to_owned()
            }
        }
    }

    async fn resolve_channel_name(&self, channel_id: &str, ctx: &EventContext) -> String {
        match self.gateway.lookup_channel(channel_id).await {
            Ok(name) => name,
            Err(error) => {
                warn!(
                    event_name = "survey.submit.channel_lookup_failed",
                    correlation_id = %ctx.correlation_id,
                    channel_id = %channel_id,
                    error = %error,
                    "channel lookup failed; recording Unknown"
                );
                UNKNOWN_NAME.to_owned()
            }
        }
    }
}

#[async_trait]
impl FinalizerService for SubmissionFinalizer {
    async fn submit(
        &self,
        event: &SubmitRequestedEvent,
        ctx: &EventContext,
    ) -> Result<SubmissionOutcome, EventHandlerError> {
        let snapshot = match self.store.claim_submission(&event.user_id, &event.thread_ts) {
            SubmissionClaim::Accepted(snapshot) => snapshot,
            SubmissionClaim::AlreadySubmitted => {
                debug!(
                    event_name = "survey.submit.duplicate",
                    correlation_id = %ctx.correlation_id,
                    user_id = %event.user_id,
                    thread_id = %event.thread_ts,
                    "duplicate submission suppressed"
                );
                return Ok(SubmissionOutcome::AlreadySubmitted);
            }
            SubmissionClaim::MissingRating => {
                warn!(
                    event_name = "survey.submit.missing_rating",
                    correlation_id = %ctx.correlation_id,
                    user_id = %event.user_id,
                    thread_id = %event.thread_ts,
                    "submit clicked without a rating; nothing recorded"
                );
                return Ok(SubmissionOutcome::MissingRating);
            }
        };

        // The form's own payload wins over step-wise comment edits.
        let comments = event
            .form_comments
            .clone()
            .or_else(|| snapshot.comments.clone())
            .unwrap_or_default();

        let user_name =
            self.resolve_user_name(snapshot.display_name.clone(), &event.user_id, ctx).await;
        let channel_name = self.resolve_channel_name(&event.channel_id, ctx).await;

        let record = FeedbackRecord::new(
            &event.channel_id,
            channel_name,
            &event.user_id,
            &user_name,
            &event.thread_ts,
            snapshot.rating,
            comments,
        );
        let record_id = record.record_id.clone();
        self.log.append(record.clone());

        info!(
            event_name = "survey.submit.recorded",
            correlation_id = %ctx.correlation_id,
            record_id = %record_id,
            user_id = %event.user_id,
            thread_id = %event.thread_ts,
            rating = %record.rating,
            "feedback submission recorded"
        );

        if let Err(error) = self.collector.deliver(&record).await {
            warn!(
                event_name = "egress.collector.delivery_failed",
                correlation_id = %ctx.correlation_id,
                record_id = %record_id,
                error = %error,
                "collector delivery failed; record kept in the in-process log"
            );
        }

        match snapshot.pending_form_ts.as_deref() {
            Some(form_ts) => {
                let confirmation = confirmation_message(&user_name);
                if let Err(error) =
                    self.gateway.update_message(&event.channel_id, form_ts, &confirmation).await
                {
                    warn!(
                        event_name = "survey.submit.confirmation_failed",
                        correlation_id = %ctx.correlation_id,
                        user_id = %event.user_id,
                        form_ts = %form_ts,
                        error = %error,
                        "form could not be replaced with the confirmation"
                    );
                }
            }
            None => {
                warn!(
                    event_name = "survey.submit.no_pending_form",
                    correlation_id = %ctx.correlation_id,
                    user_id = %event.user_id,
                    thread_id = %event.thread_ts,
                    "no pending form message to confirm into; skipping the edit"
                );
            }
        }

        Ok(SubmissionOutcome::Submitted { record_id })
    }
}
