use serde::Serialize;
use utoipa::ToSchema;

use crate::state::spin::SpinPhase;

/// Publicly visible spin phase exposed to clients (REST/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleSpinPhase {
    /// No spin running.
    Idle,
    /// The reel is cycling.
    Spinning,
    /// Stop requested, digits are settling.
    StopRequested,
    /// A winner has just been committed.
    Resolved,
}

impl From<&SpinPhase> for VisibleSpinPhase {
    fn from(value: &SpinPhase) -> Self {
        match value {
            SpinPhase::Idle => VisibleSpinPhase::Idle,
            SpinPhase::Spinning => VisibleSpinPhase::Spinning,
            SpinPhase::StopRequested => VisibleSpinPhase::StopRequested,
            SpinPhase::Resolved => VisibleSpinPhase::Resolved,
        }
    }
}
