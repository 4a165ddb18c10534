//! Operator-facing draw orchestration: spin lifecycle, timers, quota and
//! settings edits. Engine transitions happen under the engine lock; timers
//! and the reel cascade run as spawned tasks keyed by the spin session id so
//! stale callbacks never touch a newer spin.

use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::state_store::{
        KEY_AUTO_STOP_MS, KEY_KEYBOARD_ENABLED, KEY_PRIZE_TIERS, KEY_STOP_MODE, KEY_WINNERS,
    },
    dto::{
        operator::{DrawStartedResponse, SettingsUpdateRequest},
        public::{SettingsView, TierStatus, WinnerSummary},
    },
    error::ServiceError,
    services::{reel_service, sse_events},
    state::{
        SharedState,
        draw::{SpinSettings, StopMode, TierId, WinnerRecord},
        reel::ReelController,
        spin::SpinPhase,
    },
};

/// Change the tier the next draw runs for.
pub async fn select_tier(state: &SharedState, tier: TierId) -> Result<(), ServiceError> {
    {
        let mut engine = state.engine().write().await;
        engine.select_tier(tier)?;
    }
    sse_events::broadcast_tier_selected(state, tier);
    Ok(())
}

/// Start a spin for the selected tier.
///
/// The candidate is drawn up front but stays server-side; clients only see
/// the reel cycling until the stop is staged. In auto mode a timer task is
/// armed that requests the stop when the deadline passes.
pub async fn start_spin(state: &SharedState) -> Result<DrawStartedResponse, ServiceError> {
    let (session, settings) = {
        let mut engine = state.engine().write().await;
        let session = engine.begin_spin()?;
        (session, engine.settings())
    };

    info!(session_id = %session.id, tier = ?session.tier, "spin started");
    sse_events::broadcast_phase_changed(state, &SpinPhase::Spinning);
    sse_events::broadcast_spin_started(
        state,
        session.id,
        session.tier,
        reel_service::digit_loops_ms(),
    );

    let auto_stop = settings.stop_mode == StopMode::Auto;
    if auto_stop {
        arm_auto_stop(state, session.id, settings).await;
    }

    Ok(DrawStartedResponse {
        session_id: session.id,
        tier: session.tier,
        auto_stop,
    })
}

/// Record stop intent and stage the reel settle.
///
/// Idempotent: returns `false` without side effects when no spin is
/// currently in the spinning phase.
pub async fn stop_spin(state: &SharedState) -> Result<bool, ServiceError> {
    let session = {
        let mut engine = state.engine().write().await;
        if !engine.request_stop() {
            return Ok(false);
        }
        match engine.session() {
            Some(session) => session.clone(),
            // request_stop only succeeds with a session in place
            None => return Ok(false),
        }
    };

    let reel = ReelController::start(session.id, &session.candidate.code);
    let schedule = reel.settle_schedule();

    sse_events::broadcast_phase_changed(state, &SpinPhase::StopRequested);
    sse_events::broadcast_stop_staged(state, session.id, &schedule);

    {
        let mut tasks = state.spin_tasks().lock().await;
        if let Some(handle) = tasks.auto_stop.take() {
            handle.abort();
        }
        let cascade_state = state.clone();
        tasks.reel = Some(tokio::spawn(async move {
            reel_service::run_cascade(cascade_state, reel).await;
        }));
    }

    info!(session_id = %session.id, "stop requested, reel settling");
    Ok(true)
}

/// Commit the winner of a finished reel.
///
/// Called from the cascade task when the last digit locks. Stale session ids
/// are ignored, so a cascade outliving its spin commits nothing.
pub async fn resolve_spin(state: &SharedState, session_id: Uuid) -> Option<WinnerSummary> {
    let (record, summary) = {
        let mut engine = state.engine().write().await;
        let record = engine.resolve(session_id)?;
        let summary = WinnerSummary::from_record(
            engine.winners().len() - 1,
            &record,
            engine.tiers(),
        );
        (record, summary)
    };

    info!(session_id = %session_id, code = %record.code, tier = ?record.tier, "winner committed");
    sse_events::broadcast_phase_changed(state, &SpinPhase::Resolved);
    sse_events::broadcast_spin_resolved(state, session_id, summary.clone());

    persist_winners(state).await;

    {
        let mut engine = state.engine().write().await;
        engine.finish_cycle();
    }
    sse_events::broadcast_phase_changed(state, &SpinPhase::Idle);
    state.spin_tasks().lock().await.reel.take();

    Some(summary)
}

/// Remove the winner at `index`, freeing one slot of its tier's quota.
pub async fn undo_winner(state: &SharedState, index: usize) -> Result<WinnerSummary, ServiceError> {
    let (removed, summary) = {
        let mut engine = state.engine().write().await;
        let record = engine
            .remove_winner(index)
            .ok_or_else(|| ServiceError::NotFound(format!("no winner at index {index}")))?;
        let summary = WinnerSummary::from_record(index, &record, engine.tiers());
        (record, summary)
    };

    info!(index, code = %removed.code, tier = ?removed.tier, "winner removed");
    persist_winners(state).await;
    Ok(summary)
}

/// Reset the event: discard any in-flight spin and clear the winners list.
///
/// The roster, tiers, and settings survive a reset. Clearing winners is
/// written to the store, so every connected instance folds the same reset.
pub async fn reset_event(state: &SharedState) -> Result<(), ServiceError> {
    state.cancel_spin_tasks().await;

    let aborted_session = {
        let mut engine = state.engine().write().await;
        let session_id = engine.session().map(|s| s.id);
        engine.abort();
        session_id
    };

    if let Some(session_id) = aborted_session {
        sse_events::broadcast_spin_aborted(state, session_id);
        sse_events::broadcast_phase_changed(state, &SpinPhase::Idle);
    }

    let empty: Vec<WinnerRecord> = Vec::new();
    if let Err(err) = state.store().write(KEY_WINNERS, &empty) {
        warn!(error = %err, "failed to write winners reset");
    }
    info!("event reset, winners cleared");
    Ok(())
}

/// Update one tier's winner quota.
///
/// Lowering the quota below the number of winners already recorded is
/// rejected; undo the surplus winners first.
pub async fn update_quota(
    state: &SharedState,
    tier: TierId,
    quota: u32,
) -> Result<TierStatus, ServiceError> {
    let (status, tiers) = {
        let mut engine = state.engine().write().await;
        let used = engine.used(tier);
        // an in-flight spin for this tier will consume one more slot on commit
        let pending = u32::from(engine.session().is_some_and(|s| s.tier == tier));
        if quota < used + pending {
            return Err(ServiceError::InvalidState(format!(
                "quota {quota} is below the {} winners recorded or pending",
                used + pending
            )));
        }
        if !engine.set_tier_quota(tier, quota) {
            return Err(ServiceError::NotFound(format!("tier {tier:?} is not configured")));
        }
        let status = TierStatus {
            id: tier,
            name: engine
                .tiers()
                .iter()
                .find(|t| t.id == tier)
                .map(|t| t.display_name.clone())
                .unwrap_or_default(),
            quota,
            used,
            remaining: quota - used,
        };
        (status, engine.tiers().to_vec())
    };

    if let Err(err) = state.store().write(KEY_PRIZE_TIERS, &tiers) {
        warn!(error = %err, "failed to persist tier configuration");
    }
    Ok(status)
}

/// Update spin settings; absent fields keep their current value. The
/// auto-stop deadline is clamped to its supported range before storing.
pub async fn update_settings(
    state: &SharedState,
    request: SettingsUpdateRequest,
) -> Result<SettingsView, ServiceError> {
    let (settings, keyboard) = {
        let mut engine = state.engine().write().await;
        let current = engine.settings();
        let merged = SpinSettings {
            stop_mode: request.stop_mode.unwrap_or(current.stop_mode),
            auto_stop_ms: request.auto_stop_ms.unwrap_or(current.auto_stop_ms),
        };
        let merged = SpinSettings {
            auto_stop_ms: merged.clamped_auto_stop_ms(),
            ..merged
        };
        engine.apply_settings(merged);
        if let Some(enabled) = request.keyboard_enabled {
            engine.apply_keyboard_enabled(enabled);
        }
        (merged, engine.keyboard_enabled())
    };

    let store = state.store();
    if request.stop_mode.is_some()
        && let Err(err) = store.write(KEY_STOP_MODE, &settings.stop_mode)
    {
        warn!(error = %err, "failed to persist stop mode");
    }
    if request.auto_stop_ms.is_some()
        && let Err(err) = store.write(KEY_AUTO_STOP_MS, &settings.auto_stop_ms)
    {
        warn!(error = %err, "failed to persist auto-stop deadline");
    }
    if request.keyboard_enabled.is_some()
        && let Err(err) = store.write(KEY_KEYBOARD_ENABLED, &keyboard)
    {
        warn!(error = %err, "failed to persist keyboard toggle");
    }

    Ok(SettingsView {
        stop_mode: settings.stop_mode,
        auto_stop_ms: settings.auto_stop_ms,
        keyboard_enabled: keyboard,
    })
}

/// Arm the auto-stop timer for `session_id`. The timer clears its own task
/// slot before requesting the stop, then stops only if that same spin is
/// still running.
async fn arm_auto_stop(state: &SharedState, session_id: Uuid, settings: SpinSettings) {
    let deadline = Duration::from_millis(settings.clamped_auto_stop_ms());
    let timer_state = state.clone();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(deadline).await;

        timer_state.spin_tasks().lock().await.auto_stop.take();

        let still_current = {
            let engine = timer_state.engine().read().await;
            engine.phase() == SpinPhase::Spinning
                && engine.session().is_some_and(|s| s.id == session_id)
        };
        if !still_current {
            return;
        }

        if let Err(err) = stop_spin(&timer_state).await {
            warn!(session_id = %session_id, error = %err, "auto-stop failed");
        }
    });
    state.spin_tasks().lock().await.auto_stop = Some(handle);
}

/// Write the current winners list back to the store.
async fn persist_winners(state: &SharedState) {
    let winners = {
        let engine = state.engine().read().await;
        engine.winners().to_vec()
    };
    if let Err(err) = state.store().write(KEY_WINNERS, &winners) {
        warn!(error = %err, "failed to persist winners");
    }
}
