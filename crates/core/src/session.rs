use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::feedback::Rating;

/// Survey state for one user. Lives for the whole process; a finished
/// submission only marks its thread in `submitted_threads`, the other
/// fields stay live for the next survey.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedbackSession {
    pub display_name: Option<String>,
    /// Message id of the most recently rendered form. Overwritten on every
    /// render; the only handle for the confirmation edit.
    pub pending_form_ts: Option<String>,
    pub rating: Option<Rating>,
    pub comments: Option<String>,
    pub submitted_threads: HashSet<String>,
}

/// Session fields captured inside the claim's critical section, for the
/// finalizer's follow-up I/O.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmissionSnapshot {
    pub display_name: Option<String>,
    pub rating: Rating,
    pub comments: Option<String>,
    pub pending_form_ts: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmissionClaim {
    Accepted(SubmissionSnapshot),
    AlreadySubmitted,
    MissingRating,
}

/// Shared map of user id to session. All mutation goes through closure-scoped
/// critical sections; the lock is never held across I/O.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, FeedbackSession>>>,
}

impl SessionStore {
    /// Mutates the user's session, creating it on first touch.
    pub fn update<T>(&self, user_id: &str, mutate: impl FnOnce(&mut FeedbackSession) -> T) -> T {
        let mut sessions = self.lock();
        let session = sessions.entry(user_id.to_string()).or_default();
        mutate(session)
    }

    /// Reads the user's session without creating one.
    pub fn peek<T>(&self, user_id: &str, read: impl FnOnce(&FeedbackSession) -> T) -> Option<T> {
        let sessions = self.lock();
        sessions.get(user_id).map(read)
    }

    pub fn has_submitted(&self, user_id: &str, thread_ts: &str) -> bool {
        self.peek(user_id, |session| session.submitted_threads.contains(thread_ts))
            .unwrap_or(false)
    }

    pub fn cached_display_name(&self, user_id: &str) -> Option<String> {
        self.peek(user_id, |session| session.display_name.clone()).flatten()
    }

    pub fn cache_display_name(&self, user_id: &str, display_name: impl Into<String>) {
        let display_name = display_name.into();
        self.update(user_id, |session| session.display_name = Some(display_name));
    }

    pub fn set_pending_form(&self, user_id: &str, form_ts: impl Into<String>) {
        let form_ts = form_ts.into();
        self.update(user_id, |session| session.pending_form_ts = Some(form_ts));
    }

    pub fn record_rating(&self, user_id: &str, rating: Rating) {
        self.update(user_id, |session| session.rating = Some(rating));
    }

    pub fn record_comments(&self, user_id: &str, comments: impl Into<String>) {
        let comments = comments.into();
        self.update(user_id, |session| session.comments = Some(comments));
    }

    /// Duplicate check, rating check, and thread registration in one critical
    /// section. Concurrent submits for the same (user, thread) race for the
    /// lock; exactly one observes the thread as unclaimed.
    pub fn claim_submission(&self, user_id: &str, thread_ts: &str) -> SubmissionClaim {
        let mut sessions = self.lock();
        let session = sessions.entry(user_id.to_string()).or_default();

        if session.submitted_threads.contains(thread_ts) {
            return SubmissionClaim::AlreadySubmitted;
        }
        let Some(rating) = session.rating else {
            return SubmissionClaim::MissingRating;
        };

        session.submitted_threads.insert(thread_ts.to_string());
        SubmissionClaim::Accepted(SubmissionSnapshot {
            display_name: session.display_name.clone(),
            rating,
            comments: session.comments.clone(),
            pending_form_ts: session.pending_form_ts.clone(),
        })
    }

    pub fn session_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, FeedbackSession>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
