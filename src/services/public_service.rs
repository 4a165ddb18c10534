use crate::{
    dto::public::{DrawSnapshot, PhaseResponse},
    state::SharedState,
};

/// Assemble the full event snapshot for a freshly connected client.
pub async fn snapshot(state: &SharedState) -> DrawSnapshot {
    let engine = state.engine().read().await;
    DrawSnapshot::from_engine(&engine, state.store().is_degraded())
}

/// Current spin phase only.
pub async fn phase(state: &SharedState) -> PhaseResponse {
    let engine = state.engine().read().await;
    PhaseResponse {
        phase: (&engine.phase()).into(),
    }
}
