use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::{phase::VisibleSpinPhase, public::WinnerSummary},
    state::draw::TierId,
    state::reel::SettleStage,
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across the SSE channel.
pub struct ServerEvent {
    /// Optional SSE event name.
    pub event: Option<String>,
    /// Pre-serialised JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether persistence is currently failing.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast after every store write, carrying the key and its new value.
pub struct StoreChangedEvent {
    /// Store key that was written.
    pub key: String,
    /// The value as it now stands under that key.
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast whenever the spin phase changes.
pub struct PhaseChangedEvent(pub VisibleSpinPhase);

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the operator selects a tier for the next draw.
pub struct TierSelectedEvent {
    /// Tier the next draw will run for.
    pub tier: TierId,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a spin starts. Carries no candidate data; the winner is
/// only revealed digit by digit once the stop is staged.
pub struct SpinStartedEvent {
    /// Identity of the spin.
    pub session_id: Uuid,
    /// Tier the spin runs for.
    pub tier: TierId,
    /// Spin loop duration per digit, left to right.
    pub digit_loops_ms: Vec<u64>,
}

#[derive(Debug, Serialize, ToSchema, Clone, Copy)]
/// One entry of the staged stop schedule, relative to the stop request.
pub struct SettleStageView {
    /// Digit index, left to right.
    pub index: usize,
    /// When this digit starts settling.
    pub fire_at_ms: u64,
    /// When this digit is locked.
    pub done_at_ms: u64,
}

impl From<SettleStage> for SettleStageView {
    fn from(stage: SettleStage) -> Self {
        Self {
            index: stage.index,
            fire_at_ms: stage.fire_at_ms,
            done_at_ms: stage.done_at_ms,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a stop has been requested and the settle schedule is fixed.
pub struct ReelStopStagedEvent {
    /// Identity of the spin being stopped.
    pub session_id: Uuid,
    /// Settle schedule, one entry per digit.
    pub stages: Vec<SettleStageView>,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when one digit starts settling onto its final value.
pub struct ReelDigitSettlingEvent {
    /// Identity of the spin.
    pub session_id: Uuid,
    /// Digit index, left to right.
    pub index: usize,
    /// Final character this digit lands on.
    pub value: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when one digit has locked.
pub struct ReelDigitSettledEvent {
    /// Identity of the spin.
    pub session_id: Uuid,
    /// Digit index, left to right.
    pub index: usize,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the reel finished and the winner is committed.
pub struct SpinResolvedEvent {
    /// Identity of the finished spin.
    pub session_id: Uuid,
    /// The committed winner.
    pub winner: WinnerSummary,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when an in-flight spin is discarded without a winner.
pub struct SpinAbortedEvent {
    /// Identity of the discarded spin.
    pub session_id: Uuid,
}
