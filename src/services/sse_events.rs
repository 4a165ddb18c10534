use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::{
        phase::VisibleSpinPhase,
        public::WinnerSummary,
        sse::{
            PhaseChangedEvent, ReelDigitSettledEvent, ReelDigitSettlingEvent, ReelStopStagedEvent,
            ServerEvent, SpinAbortedEvent, SpinResolvedEvent, SpinStartedEvent, StoreChangedEvent,
            TierSelectedEvent,
        },
    },
    state::{SharedState, draw::TierId, reel::SettleStage, spin::SpinPhase},
};

const EVENT_STORE_CHANGED: &str = "store.changed";
const EVENT_PHASE_CHANGED: &str = "phase_changed";
const EVENT_TIER_SELECTED: &str = "tier.selected";
const EVENT_SPIN_STARTED: &str = "spin.started";
const EVENT_REEL_STOP_STAGED: &str = "reel.stop_staged";
const EVENT_REEL_DIGIT_SETTLING: &str = "reel.digit_settling";
const EVENT_REEL_DIGIT_SETTLED: &str = "reel.digit_settled";
const EVENT_SPIN_RESOLVED: &str = "spin.resolved";
const EVENT_SPIN_ABORTED: &str = "spin.aborted";

/// Broadcast a store change so every connected instance can fold it in.
pub fn broadcast_store_changed(state: &SharedState, key: &str, value: serde_json::Value) {
    let payload = StoreChangedEvent {
        key: key.to_string(),
        value,
    };
    send_event(state, EVENT_STORE_CHANGED, &payload);
}

/// Broadcast a spin phase change notification.
pub fn broadcast_phase_changed(state: &SharedState, phase: &SpinPhase) {
    let payload = PhaseChangedEvent(VisibleSpinPhase::from(phase));
    send_event(state, EVENT_PHASE_CHANGED, &payload);
}

/// Broadcast the tier selected for the next draw.
pub fn broadcast_tier_selected(state: &SharedState, tier: TierId) {
    let payload = TierSelectedEvent { tier };
    send_event(state, EVENT_TIER_SELECTED, &payload);
}

/// Broadcast that a spin has started.
pub fn broadcast_spin_started(
    state: &SharedState,
    session_id: Uuid,
    tier: TierId,
    digit_loops_ms: Vec<u64>,
) {
    let payload = SpinStartedEvent {
        session_id,
        tier,
        digit_loops_ms,
    };
    send_event(state, EVENT_SPIN_STARTED, &payload);
}

/// Broadcast the staged settle schedule fixed by a stop request.
pub fn broadcast_stop_staged(state: &SharedState, session_id: Uuid, stages: &[SettleStage]) {
    let payload = ReelStopStagedEvent {
        session_id,
        stages: stages.iter().copied().map(Into::into).collect(),
    };
    send_event(state, EVENT_REEL_STOP_STAGED, &payload);
}

/// Broadcast that one digit started settling, revealing its final value.
pub fn broadcast_digit_settling(state: &SharedState, session_id: Uuid, index: usize, value: char) {
    let payload = ReelDigitSettlingEvent {
        session_id,
        index,
        value: value.to_string(),
    };
    send_event(state, EVENT_REEL_DIGIT_SETTLING, &payload);
}

/// Broadcast that one digit has locked.
pub fn broadcast_digit_settled(state: &SharedState, session_id: Uuid, index: usize) {
    let payload = ReelDigitSettledEvent { session_id, index };
    send_event(state, EVENT_REEL_DIGIT_SETTLED, &payload);
}

/// Broadcast the committed winner of a finished spin.
pub fn broadcast_spin_resolved(state: &SharedState, session_id: Uuid, winner: WinnerSummary) {
    let payload = SpinResolvedEvent { session_id, winner };
    send_event(state, EVENT_SPIN_RESOLVED, &payload);
}

/// Broadcast that an in-flight spin was discarded without a winner.
pub fn broadcast_spin_aborted(state: &SharedState, session_id: Uuid) {
    let payload = SpinAbortedEvent { session_id };
    send_event(state, EVENT_SPIN_ABORTED, &payload);
}

fn send_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize SSE payload"),
    }
}
