/// OpenAPI documentation generation.
pub mod documentation;
/// Spin lifecycle orchestration and operator configuration edits.
pub mod draw_service;
/// Health check service.
pub mod health_service;
/// Read-only snapshot assembly.
pub mod public_service;
/// Staged reel settle cascade.
pub mod reel_service;
/// Roster import and winners export.
pub mod roster_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Store change folding across instances.
pub mod sync_bridge;
