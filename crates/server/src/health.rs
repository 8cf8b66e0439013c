use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use pulse_core::{FeedbackLog, SessionStore};
use serde::Serialize;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    session_store: SessionStore,
    feedback_log: FeedbackLog,
}

impl HealthState {
    pub fn new(session_store: SessionStore, feedback_log: FeedbackLog) -> Self {
        Self { session_store, feedback_log }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

/// In-memory state is always reachable, so these counters are about
/// observability rather than readiness gating.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SurveyCounters {
    pub sessions_tracked: usize,
    pub records_collected: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub survey: SurveyCounters,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn spawn(bind_address: &str, port: u16, state: HealthState) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        event_name = "system.health.start",
        correlation_id = "bootstrap",
        user_id = "unknown",
        thread_id = "unknown",
        bind_address = %address,
        "health endpoint started"
    );

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(state)).await {
            error!(
                event_name = "system.health.error",
                correlation_id = "bootstrap",
                user_id = "unknown",
                thread_id = "unknown",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let payload = HealthResponse {
        status: "ready",
        service: HealthCheck {
            status: "ready",
            detail: "pulse-server runtime initialized".to_string(),
        },
        survey: SurveyCounters {
            sessions_tracked: state.session_store.session_count(),
            records_collected: state.feedback_log.len(),
        },
        checked_at: Utc::now().to_rfc3339(),
    };

    (StatusCode::OK, Json(payload))
}
