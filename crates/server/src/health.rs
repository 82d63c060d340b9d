use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use barkeep_slack::SessionState;
use chrono::Utc;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info};

#[derive(Clone)]
pub struct HealthState {
    session: watch::Receiver<SessionState>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub session: SessionState,
    pub checked_at: String,
}

pub fn router(session: watch::Receiver<SessionState>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState { session })
}

pub async fn spawn(
    bind_address: &str,
    port: u16,
    session: watch::Receiver<SessionState>,
) -> std::io::Result<()> {
    let address = format!("{bind_address}:{port}");
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(event_name = "system.health.start", bind_address = %address, "health endpoint started");

    tokio::spawn(async move {
        if let Err(error) = axum::serve(listener, router(session)).await {
            error!(
                event_name = "system.health.error",
                error = %error,
                "health endpoint server terminated unexpectedly"
            );
        }
    });

    Ok(())
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let session = state.session.borrow().clone();
    let ready = session.is_running();

    let payload = HealthResponse {
        status: if ready { "ready" } else { "connecting" },
        session,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}
