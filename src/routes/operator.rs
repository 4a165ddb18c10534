use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{delete, get, post, put},
};
use validator::Validate;

use crate::{
    dto::{
        operator::{
            ActionResponse, DrawStartedResponse, QuotaUpdateRequest, RosterImportRequest,
            RosterImportResponse, SelectTierRequest, SettingsUpdateRequest,
        },
        public::{ExportResponse, SettingsView, TierStatus, WinnerSummary},
    },
    error::AppError,
    services::{draw_service, roster_service},
    state::{SharedState, draw::TierId},
};

/// Operator endpoints for configuring and driving the draw.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/operator/tier/select", post(select_tier))
        .route("/operator/draw", post(draw))
        .route("/operator/stop", post(stop))
        .route("/operator/winners/{index}", delete(undo_winner))
        .route("/operator/winners/export", get(export_winners))
        .route("/operator/reset", post(reset))
        .route("/operator/tiers/{tier}/quota", put(update_quota))
        .route("/operator/settings", put(update_settings))
        .route("/operator/roster", put(import_roster))
}

/// Select the tier the next draw will run for.
#[utoipa::path(
    post,
    path = "/operator/tier/select",
    tag = "operator",
    request_body = SelectTierRequest,
    responses(
        (status = 200, description = "Tier selected", body = ActionResponse),
        (status = 409, description = "A spin is in flight")
    )
)]
pub async fn select_tier(
    State(state): State<SharedState>,
    Json(request): Json<SelectTierRequest>,
) -> Result<Json<ActionResponse>, AppError> {
    draw_service::select_tier(&state, request.tier).await?;
    Ok(Json(ActionResponse {
        message: format!("tier {:?} selected", request.tier),
    }))
}

/// Start a spin for the selected tier.
#[utoipa::path(
    post,
    path = "/operator/draw",
    tag = "operator",
    responses(
        (status = 200, description = "Spin started", body = DrawStartedResponse),
        (status = 409, description = "Quota exhausted, empty pool, or a spin already in flight")
    )
)]
pub async fn draw(
    State(state): State<SharedState>,
) -> Result<Json<DrawStartedResponse>, AppError> {
    Ok(Json(draw_service::start_spin(&state).await?))
}

/// Request the reel to stop. A no-op outside an active spin.
#[utoipa::path(
    post,
    path = "/operator/stop",
    tag = "operator",
    responses((status = 200, description = "Stop intent recorded or ignored", body = ActionResponse))
)]
pub async fn stop(State(state): State<SharedState>) -> Result<Json<ActionResponse>, AppError> {
    let applied = draw_service::stop_spin(&state).await?;
    let message = if applied {
        "stop requested, reel settling".to_string()
    } else {
        "no spin to stop".to_string()
    };
    Ok(Json(ActionResponse { message }))
}

/// Remove the winner at the given position, freeing its quota slot.
#[utoipa::path(
    delete,
    path = "/operator/winners/{index}",
    tag = "operator",
    params(("index" = usize, Path, description = "Position of the winner in commit order")),
    responses(
        (status = 200, description = "Winner removed", body = WinnerSummary),
        (status = 404, description = "No winner at that index")
    )
)]
pub async fn undo_winner(
    State(state): State<SharedState>,
    Path(index): Path<usize>,
) -> Result<Json<WinnerSummary>, AppError> {
    Ok(Json(draw_service::undo_winner(&state, index).await?))
}

/// Export the winners list with resolved tier names.
#[utoipa::path(
    get,
    path = "/operator/winners/export",
    tag = "operator",
    responses((status = 200, description = "Winners export", body = ExportResponse))
)]
pub async fn export_winners(State(state): State<SharedState>) -> Json<ExportResponse> {
    Json(roster_service::export_winners(&state).await)
}

/// Reset the event: clear winners and abort any in-flight spin.
#[utoipa::path(
    post,
    path = "/operator/reset",
    tag = "operator",
    responses((status = 200, description = "Event reset", body = ActionResponse))
)]
pub async fn reset(State(state): State<SharedState>) -> Result<Json<ActionResponse>, AppError> {
    draw_service::reset_event(&state).await?;
    Ok(Json(ActionResponse {
        message: "event reset".into(),
    }))
}

/// Update one tier's winner quota.
#[utoipa::path(
    put,
    path = "/operator/tiers/{tier}/quota",
    tag = "operator",
    params(("tier" = TierId, Path, description = "Tier to reconfigure")),
    request_body = QuotaUpdateRequest,
    responses(
        (status = 200, description = "Quota updated", body = TierStatus),
        (status = 409, description = "Quota below the recorded winner count")
    )
)]
pub async fn update_quota(
    State(state): State<SharedState>,
    Path(tier): Path<TierId>,
    Json(request): Json<QuotaUpdateRequest>,
) -> Result<Json<TierStatus>, AppError> {
    request.validate()?;
    Ok(Json(
        draw_service::update_quota(&state, tier, request.quota).await?,
    ))
}

/// Update spin settings; absent fields keep their current value.
#[utoipa::path(
    put,
    path = "/operator/settings",
    tag = "operator",
    request_body = SettingsUpdateRequest,
    responses((status = 200, description = "Settings updated", body = SettingsView))
)]
pub async fn update_settings(
    State(state): State<SharedState>,
    Json(request): Json<SettingsUpdateRequest>,
) -> Result<Json<SettingsView>, AppError> {
    Ok(Json(draw_service::update_settings(&state, request).await?))
}

/// Replace the roster with the submitted rows.
#[utoipa::path(
    put,
    path = "/operator/roster",
    tag = "operator",
    request_body = RosterImportRequest,
    responses(
        (status = 200, description = "Roster replaced", body = RosterImportResponse),
        (status = 400, description = "No importable rows")
    )
)]
pub async fn import_roster(
    State(state): State<SharedState>,
    Json(request): Json<RosterImportRequest>,
) -> Result<Json<RosterImportResponse>, AppError> {
    Ok(Json(roster_service::import_roster(&state, request).await?))
}
