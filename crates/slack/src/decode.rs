use serde_json::Value;
use thiserror::Error;

use pulse_core::RatingError;

use crate::blocks::{
    ACTION_FEEDBACK_TEXT, ACTION_RATING_SELECT, ACTION_SHOW_FEEDBACK_FORM, ACTION_SUBMIT_FEEDBACK,
    FEEDBACK_INPUT_BLOCK_ID,
};
use crate::events::{
    CommentEditedEvent, MessageEvent, PromptAcceptedEvent, RatingSelectedEvent,
    SubmitRequestedEvent, SurveyEnvelope, SurveyEvent,
};
use crate::socket::RawEnvelope;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EnvelopeDecodeError {
    #[error("frame is missing required field `{field}`")]
    MissingField { field: &'static str },
    #[error("rating value rejected: {0}")]
    Rating(#[from] RatingError),
}

/// Turns a raw socket frame into a typed survey event.
///
/// Unknown frame kinds, inner event kinds, and action ids decode to
/// [`SurveyEvent::Unsupported`] so the caller can drop them after logging.
/// Only a structurally broken frame, one missing a field the interaction
/// contract requires, produces an error. Empty strings count as missing.
pub fn decode_envelope(raw: &RawEnvelope) -> Result<SurveyEnvelope, EnvelopeDecodeError> {
    let event = decode_frame(&raw.payload)?;
    Ok(SurveyEnvelope { envelope_id: raw.envelope_id.clone(), event })
}

fn decode_frame(frame: &Value) -> Result<SurveyEvent, EnvelopeDecodeError> {
    match required_str(frame, "/type", "type")? {
        "events_api" => decode_events_api(frame),
        "interactive" => decode_interaction(frame),
        other => Ok(SurveyEvent::Unsupported { event_type: other.to_owned() }),
    }
}

fn decode_events_api(frame: &Value) -> Result<SurveyEvent, EnvelopeDecodeError> {
    let event = frame
        .pointer("/payload/event")
        .ok_or(EnvelopeDecodeError::MissingField { field: "payload.event" })?;
    let event_type = required_str(event, "/type", "event.type")?;
    if event_type != "message" {
        return Ok(SurveyEvent::Unsupported { event_type: event_type.to_owned() });
    }

    let channel_id = required_str(event, "/channel", "event.channel")?;
    let ts = required_str(event, "/ts", "event.ts")?;
    // A top-level message has no thread_ts; it is its own thread root, so
    // its ts doubles as the thread id.
    let thread_ts = optional_str(event, "/thread_ts").unwrap_or(ts);
    let text = optional_str(event, "/text").unwrap_or_default();

    Ok(SurveyEvent::Message(MessageEvent {
        channel_id: channel_id.to_owned(),
        thread_ts: thread_ts.to_owned(),
        text: text.to_owned(),
    }))
}

fn decode_interaction(frame: &Value) -> Result<SurveyEvent, EnvelopeDecodeError> {
    let interaction =
        frame.get("payload").ok_or(EnvelopeDecodeError::MissingField { field: "payload" })?;
    let interaction_type = required_str(interaction, "/type", "payload.type")?;
    if interaction_type != "block_actions" {
        return Ok(SurveyEvent::Unsupported { event_type: interaction_type.to_owned() });
    }

    let action = interaction
        .pointer("/actions/0")
        .ok_or(EnvelopeDecodeError::MissingField { field: "actions[0]" })?;
    let action_id = required_str(action, "/action_id", "actions[0].action_id")?;
    let user_id = required_str(interaction, "/user/id", "user.id")?;

    match action_id {
        ACTION_SHOW_FEEDBACK_FORM => Ok(SurveyEvent::PromptAccepted(PromptAcceptedEvent {
            user_id: user_id.to_owned(),
            channel_id: required_str(interaction, "/channel/id", "channel.id")?.to_owned(),
            thread_ts: container_thread_ts(interaction)?.to_owned(),
        })),
        ACTION_RATING_SELECT => {
            let value = required_str(
                action,
                "/selected_option/value",
                "actions[0].selected_option.value",
            )?;
            Ok(SurveyEvent::RatingSelected(RatingSelectedEvent {
                user_id: user_id.to_owned(),
                rating: value.parse()?,
            }))
        }
        ACTION_FEEDBACK_TEXT => Ok(SurveyEvent::CommentEdited(CommentEditedEvent {
            user_id: user_id.to_owned(),
            text: optional_str(action, "/value").unwrap_or_default().to_owned(),
        })),
        ACTION_SUBMIT_FEEDBACK => Ok(SurveyEvent::SubmitRequested(SubmitRequestedEvent {
            user_id: user_id.to_owned(),
            channel_id: required_str(interaction, "/channel/id", "channel.id")?.to_owned(),
            thread_ts: container_thread_ts(interaction)?.to_owned(),
            form_comments: form_comments(interaction),
        })),
        other => Ok(SurveyEvent::Unsupported { event_type: other.to_owned() }),
    }
}

/// The interaction container points at the message whose element was used.
/// Offer and form messages live inside the survey thread, so the container
/// carries thread_ts; message_ts covers a container that is itself the
/// thread root.
fn container_thread_ts(interaction: &Value) -> Result<&str, EnvelopeDecodeError> {
    optional_str(interaction, "/container/thread_ts")
        .or_else(|| optional_str(interaction, "/container/message_ts"))
        .ok_or(EnvelopeDecodeError::MissingField { field: "container.thread_ts" })
}

/// The submit click carries the whole form's view state; the comment input's
/// current value sits under its block and action ids. An untouched input is
/// reported as null, which decodes to `None`.
fn form_comments(interaction: &Value) -> Option<String> {
    interaction
        .pointer(&format!("/state/values/{FEEDBACK_INPUT_BLOCK_ID}/{ACTION_FEEDBACK_TEXT}/value"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

fn required_str<'a>(
    value: &'a Value,
    pointer: &str,
    field: &'static str,
) -> Result<&'a str, EnvelopeDecodeError> {
    optional_str(value, pointer).ok_or(EnvelopeDecodeError::MissingField { field })
}

fn optional_str<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str).filter(|text| !text.is_empty())
}
