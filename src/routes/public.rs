use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::public::{DrawSnapshot, PhaseResponse},
    services::public_service,
    state::SharedState,
};

/// Read-only endpoints consumed by displays and operator consoles alike.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/public/snapshot", get(snapshot))
        .route("/public/phase", get(phase))
}

/// Full event snapshot for a freshly connected client.
#[utoipa::path(
    get,
    path = "/public/snapshot",
    tag = "public",
    responses((status = 200, description = "Current event snapshot", body = DrawSnapshot))
)]
pub async fn snapshot(State(state): State<SharedState>) -> Json<DrawSnapshot> {
    Json(public_service::snapshot(&state).await)
}

/// Current spin phase, for cheap polling.
#[utoipa::path(
    get,
    path = "/public/phase",
    tag = "public",
    responses((status = 200, description = "Current spin phase", body = PhaseResponse))
)]
pub async fn phase(State(state): State<SharedState>) -> Json<PhaseResponse> {
    Json(public_service::phase(&state).await)
}
