//! Folds store change notifications into the draw engine.
//!
//! Every store write, including this process's own, arrives here and is
//! applied through the engine's sync reducers. Used counts are always
//! re-derived from the full winners list, so replaying a change or receiving
//! changes out of order converges to the same state. Payloads that do not
//! parse are logged and dropped; the engine keeps its last good state.

use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::{
    dao::state_store::{
        KEY_AUTO_STOP_MS, KEY_KEYBOARD_ENABLED, KEY_PRIZE_TIERS, KEY_ROSTER, KEY_STOP_MODE,
        KEY_WINNERS, StoreChange,
    },
    services::sse_events,
    state::{
        SharedState,
        draw::{Participant, PrizeTier, SpinSettings, StopMode, WinnerRecord},
        spin::SpinPhase,
    },
};

/// Run the bridge until the store's change channel closes.
///
/// The receiver comes from the caller, subscribed before this future is
/// spawned, so writes issued in the meantime cannot slip past the bridge.
pub async fn run(state: SharedState, mut changes: broadcast::Receiver<StoreChange>) {
    info!("sync bridge running");
    loop {
        match changes.recv().await {
            Ok(change) => apply_change(&state, change).await,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "sync bridge lagged behind store changes");
            }
            Err(RecvError::Closed) => break,
        }
    }
    info!("sync bridge stopped");
}

/// Fold one store change into the engine and re-broadcast it to SSE clients.
pub(crate) async fn apply_change(state: &SharedState, change: StoreChange) {
    let applied = match change.key.as_str() {
        KEY_WINNERS => apply_winners(state, &change).await,
        KEY_ROSTER => apply_roster(state, &change).await,
        KEY_PRIZE_TIERS => apply_tiers(state, &change).await,
        KEY_STOP_MODE | KEY_AUTO_STOP_MS => apply_settings(state, &change).await,
        KEY_KEYBOARD_ENABLED => apply_keyboard(state, &change).await,
        other => {
            debug!(key = other, "ignoring change for unknown key");
            false
        }
    };

    if applied {
        sse_events::broadcast_store_changed(state, &change.key, change.value);
    }
}

async fn apply_winners(state: &SharedState, change: &StoreChange) -> bool {
    let winners: Vec<WinnerRecord> = match serde_json::from_value(change.value.clone()) {
        Ok(winners) => winners,
        Err(err) => {
            warn!(key = %change.key, error = %err, "dropping malformed winners payload");
            return false;
        }
    };

    let aborted_session = {
        let mut engine = state.engine().write().await;
        let session_id = engine.session().map(|s| s.id);
        if engine.apply_winners(winners) {
            session_id
        } else {
            None
        }
    };

    if let Some(session_id) = aborted_session {
        info!(session_id = %session_id, "winners reset aborted the in-flight spin");
        state.cancel_spin_tasks().await;
        sse_events::broadcast_spin_aborted(state, session_id);
        sse_events::broadcast_phase_changed(state, &SpinPhase::Idle);
    }
    true
}

async fn apply_roster(state: &SharedState, change: &StoreChange) -> bool {
    let roster: Vec<Participant> = match serde_json::from_value(change.value.clone()) {
        Ok(roster) => roster,
        Err(err) => {
            warn!(key = %change.key, error = %err, "dropping malformed roster payload");
            return false;
        }
    };
    state.engine().write().await.apply_roster(roster);
    true
}

async fn apply_tiers(state: &SharedState, change: &StoreChange) -> bool {
    let tiers: Vec<PrizeTier> = match serde_json::from_value(change.value.clone()) {
        Ok(tiers) => tiers,
        Err(err) => {
            warn!(key = %change.key, error = %err, "dropping malformed tiers payload");
            return false;
        }
    };
    let rejected = state.engine().write().await.apply_tiers(tiers);
    if !rejected.is_empty() {
        warn!(
            tiers = ?rejected,
            "kept previous quotas for tiers whose new quota fell below their winner count"
        );
    }
    true
}

async fn apply_settings(state: &SharedState, change: &StoreChange) -> bool {
    let mut engine = state.engine().write().await;
    let current = engine.settings();
    let merged = match change.key.as_str() {
        KEY_STOP_MODE => match serde_json::from_value::<StopMode>(change.value.clone()) {
            Ok(stop_mode) => SpinSettings {
                stop_mode,
                ..current
            },
            Err(err) => {
                warn!(key = %change.key, error = %err, "dropping malformed stop mode payload");
                return false;
            }
        },
        _ => match serde_json::from_value::<u64>(change.value.clone()) {
            Ok(auto_stop_ms) => SpinSettings {
                auto_stop_ms,
                ..current
            },
            Err(err) => {
                warn!(key = %change.key, error = %err, "dropping malformed auto-stop payload");
                return false;
            }
        },
    };
    engine.apply_settings(merged);
    true
}

async fn apply_keyboard(state: &SharedState, change: &StoreChange) -> bool {
    match serde_json::from_value::<bool>(change.value.clone()) {
        Ok(enabled) => {
            state.engine().write().await.apply_keyboard_enabled(enabled);
            true
        }
        Err(err) => {
            warn!(key = %change.key, error = %err, "dropping malformed keyboard payload");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;

    use crate::{
        config::AppConfig,
        dao::state_store::StateStore,
        state::{AppState, draw::TierId},
    };

    fn fresh_state(dir: &tempfile::TempDir) -> SharedState {
        let store = Arc::new(StateStore::open(dir.path().join("event.json")));
        AppState::new(&AppConfig::default(), store)
    }

    fn change(key: &str, value: serde_json::Value) -> StoreChange {
        StoreChange {
            key: key.into(),
            value,
        }
    }

    #[tokio::test]
    async fn winners_fold_recomputes_counts() {
        let dir = tempfile::tempdir().unwrap();
        let state = fresh_state(&dir);

        let payload = json!([
            {"id": "x", "code": "010", "name": "X", "department": "HR", "tier": "THIRD"},
            {"id": "y", "code": "011", "name": "Y", "department": "HR", "tier": "THIRD"},
        ]);
        apply_change(&state, change(KEY_WINNERS, payload.clone())).await;
        apply_change(&state, change(KEY_WINNERS, payload)).await;

        let engine = state.engine().read().await;
        assert_eq!(engine.used(TierId::Third), 2);
        assert_eq!(engine.winners().len(), 2);
    }

    #[tokio::test]
    async fn malformed_payload_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let state = fresh_state(&dir);

        apply_change(&state, change(KEY_WINNERS, json!("not a list"))).await;
        apply_change(&state, change(KEY_ROSTER, json!(42))).await;
        apply_change(&state, change(KEY_AUTO_STOP_MS, json!("soon"))).await;

        let engine = state.engine().read().await;
        assert!(engine.winners().is_empty());
        assert!(engine.roster().is_empty());
        assert_eq!(engine.settings().auto_stop_ms, 3_500);
    }

    #[tokio::test]
    async fn empty_winners_resets_and_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let state = fresh_state(&dir);

        apply_change(
            &state,
            change(
                KEY_ROSTER,
                json!([{"id": "a", "code": "001", "name": "A", "department": "Ops"}]),
            ),
        )
        .await;
        let session = state.engine().write().await.begin_spin().unwrap();

        apply_change(&state, change(KEY_WINNERS, json!([]))).await;

        let mut engine = state.engine().write().await;
        assert_eq!(engine.phase(), SpinPhase::Idle);
        assert!(engine.resolve(session.id).is_none());
    }

    #[tokio::test]
    async fn settings_changes_merge_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let state = fresh_state(&dir);

        apply_change(&state, change(KEY_STOP_MODE, json!("auto"))).await;
        apply_change(&state, change(KEY_AUTO_STOP_MS, json!(8_000))).await;
        apply_change(&state, change(KEY_KEYBOARD_ENABLED, json!(false))).await;

        let engine = state.engine().read().await;
        assert_eq!(engine.settings().stop_mode, StopMode::Auto);
        assert_eq!(engine.settings().auto_stop_ms, 8_000);
        assert!(!engine.keyboard_enabled());
    }

    #[tokio::test]
    async fn bridge_task_folds_store_writes() {
        let dir = tempfile::tempdir().unwrap();
        let state = fresh_state(&dir);
        // subscribe first so the write below cannot race the startup
        let changes = state.store().subscribe();
        let bridge = tokio::spawn(run(state.clone(), changes));

        let roster = vec![Participant {
            id: "a".into(),
            code: "001".into(),
            name: "A".into(),
            department: "Ops".into(),
        }];
        state.store().write(KEY_ROSTER, &roster).unwrap();

        // give the bridge a chance to drain the channel
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(state.engine().read().await.roster().len(), 1);
        bridge.abort();
    }
}
