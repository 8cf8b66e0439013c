pub mod config;
pub mod feedback;
pub mod session;

pub use feedback::{FeedbackLog, FeedbackRecord, Rating, RatingError};
pub use session::{FeedbackSession, SessionStore, SubmissionClaim, SubmissionSnapshot};
