use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RatingError {
    #[error("rating `{raw}` is not a whole number")]
    Unparsable { raw: String },
    #[error("rating {value} must be in range 1..=10")]
    OutOfScale { value: u64 },
}

/// Survey score from the 1..=10 select menu. Select values arrive as strings,
/// so construction always validates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: u8) -> Result<Self, RatingError> {
        if (1..=10).contains(&value) {
            Ok(Self(value))
        } else {
            Err(RatingError::OutOfScale { value: u64::from(value) })
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl std::str::FromStr for Rating {
    type Err = RatingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw
            .trim()
            .parse::<u64>()
            .map_err(|_| RatingError::Unparsable { raw: raw.to_string() })?;
        if !(1..=10).contains(&value) {
            return Err(RatingError::OutOfScale { value });
        }
        Ok(Self(value as u8))
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One finished survey. Immutable once built; `timestamp` is the wire name
/// the collection endpoint expects for the submission instant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub record_id: String,
    pub channel_name: String,
    pub channel_id: String,
    pub user_id: String,
    pub user_name: String,
    pub thread_ts: String,
    pub rating: Rating,
    pub comments: String,
    #[serde(rename = "timestamp")]
    pub submitted_at: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(
        channel_id: impl Into<String>,
        channel_name: impl Into<String>,
        user_id: impl Into<String>,
        user_name: impl Into<String>,
        thread_ts: impl Into<String>,
        rating: Rating,
        comments: impl Into<String>,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4().to_string(),
            channel_name: channel_name.into(),
            channel_id: channel_id.into(),
            user_id: user_id.into(),
            user_name: user_name.into(),
            thread_ts: thread_ts.into(),
            rating,
            comments: comments.into(),
            submitted_at: Utc::now(),
        }
    }
}

/// Ordered in-process log of every record this instance produced. Process
/// lifetime only; a restart starts empty.
#[derive(Clone, Default)]
pub struct FeedbackLog {
    records: Arc<Mutex<Vec<FeedbackRecord>>>,
}

impl FeedbackLog {
    pub fn append(&self, record: FeedbackRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }

    pub fn records(&self) -> Vec<FeedbackRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self.records.lock() {
            Ok(records) => records.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
