use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Lucky Reel Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::event_stream,
        crate::routes::public::snapshot,
        crate::routes::public::phase,
        crate::routes::operator::select_tier,
        crate::routes::operator::draw,
        crate::routes::operator::stop,
        crate::routes::operator::undo_winner,
        crate::routes::operator::export_winners,
        crate::routes::operator::reset,
        crate::routes::operator::update_quota,
        crate::routes::operator::update_settings,
        crate::routes::operator::import_roster,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::operator::ActionResponse,
            crate::dto::operator::DrawStartedResponse,
            crate::dto::operator::QuotaUpdateRequest,
            crate::dto::operator::RosterEntryInput,
            crate::dto::operator::RosterImportRequest,
            crate::dto::operator::RosterImportResponse,
            crate::dto::operator::SelectTierRequest,
            crate::dto::operator::SettingsUpdateRequest,
            crate::dto::phase::VisibleSpinPhase,
            crate::dto::public::DrawSnapshot,
            crate::dto::public::ExportResponse,
            crate::dto::public::PhaseResponse,
            crate::dto::public::SettingsView,
            crate::dto::public::TierStatus,
            crate::dto::public::WinnerSummary,
            crate::dto::sse::Handshake,
            crate::state::draw::StopMode,
            crate::state::draw::TierId,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events stream"),
        (name = "public", description = "Read-only event state"),
        (name = "operator", description = "Draw control and configuration"),
    )
)]
pub struct ApiDoc;
