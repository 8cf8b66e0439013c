//! Survey Engines - feedback collection over resolved support threads
//!
//! This crate provides the behavior between Slack events and the core state:
//! - Watches thread chatter for the resolution phrase and offers a survey
//! - Opens the feedback form when the offer is accepted
//! - Records rating and comment edits as they stream in, in any order
//! - Finalizes one submission per user per thread and confirms in place
//! - Forwards finished records to the external collection endpoint
//!
//! # Architecture
//!
//! Each engine implements one of the service traits the Slack handlers are
//! generic over:
//! 1. **Prompting** (`prompt`) - `PromptService` over channel messages
//! 2. **Form lifecycle** (`form`) - `FormService` over form interactions
//! 3. **Finalization** (`finalizer`) - `FinalizerService` over submit clicks
//! 4. **Delivery** (`collector`) - `FeedbackCollector` for the outbound POST
//!
//! # Key Types
//!
//! - `PromptEngine` - Stateless trigger matching, re-prompts on every match
//! - `FormEngine` - Display-name caching and pending-form bookkeeping
//! - `SubmissionFinalizer` - Atomic claim, record build, delivery, confirmation
//! - `HttpCollector` - Fire-and-forget POST of finished records
//!
//! # Concurrency Principle
//!
//! Engines never hold the session store lock across an outbound call. All
//! duplicate suppression rides on the store's atomic submission claim, so
//! concurrent submit clicks cannot double-record.

pub mod collector;
pub mod finalizer;
pub mod form;
pub mod prompt;

pub use collector::{CollectorError, FeedbackCollector, HttpCollector, NoopCollector};
pub use finalizer::SubmissionFinalizer;
pub use form::FormEngine;
pub use prompt::PromptEngine;
