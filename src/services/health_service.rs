use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with a static health payload while logging persistence issues.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    if state.store().is_degraded() {
        warn!("state document not persisting (degraded mode)");
        HealthResponse::degraded()
    } else {
        HealthResponse::ok()
    }
}
