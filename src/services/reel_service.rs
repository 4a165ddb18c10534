//! Drives the staged reel settle for one spin: digits start settling left to
//! right on a fixed schedule, each locks after its settle duration, and the
//! last lock hands the session back to the draw service for commitment.

use std::time::Duration;

use tokio::time::{Instant, sleep_until};

use crate::{
    services::{draw_service, sse_events},
    state::{
        SharedState,
        reel::{REEL_WIDTH, ReelController, SPIN_LOOP_MS, SPIN_SPEED_STEP_MS, SettleStage},
    },
};

/// Spin loop durations per digit, left to right.
pub fn digit_loops_ms() -> Vec<u64> {
    (0..REEL_WIDTH)
        .map(|index| SPIN_LOOP_MS + index as u64 * SPIN_SPEED_STEP_MS)
        .collect()
}

/// One step of the settle timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReelAction {
    /// Digit `index` starts easing onto its final value.
    Begin(usize),
    /// Digit `index` locks.
    Finish(usize),
}

/// Merge the per-digit stages into one time-ordered action list. Begin and
/// finish instants of different digits interleave because the settle
/// duration is longer than the stage interval.
pub fn settle_timeline(schedule: &[SettleStage]) -> Vec<(u64, ReelAction)> {
    let mut timeline: Vec<(u64, ReelAction)> = Vec::with_capacity(schedule.len() * 2);
    for stage in schedule {
        timeline.push((stage.fire_at_ms, ReelAction::Begin(stage.index)));
        timeline.push((stage.done_at_ms, ReelAction::Finish(stage.index)));
    }
    timeline.sort_by_key(|(at_ms, _)| *at_ms);
    timeline
}

/// Run the settle cascade to completion, broadcasting each digit event and
/// resolving the spin when the last digit locks.
///
/// The task is abortable at every sleep; an aborted cascade leaves the
/// engine untouched because resolution is keyed by the session id.
pub async fn run_cascade(state: SharedState, mut reel: ReelController) {
    let origin = Instant::now();
    let session_id = reel.session();
    let timeline = settle_timeline(&reel.settle_schedule());

    for (at_ms, action) in timeline {
        sleep_until(origin + Duration::from_millis(at_ms)).await;
        match action {
            ReelAction::Begin(index) => {
                if reel.begin_settle(index)
                    && let Some(digit) = reel.digits().get(index)
                {
                    sse_events::broadcast_digit_settling(
                        &state,
                        session_id,
                        index,
                        digit.target,
                    );
                }
            }
            ReelAction::Finish(index) => {
                let completion = reel.finish_settle(index);
                sse_events::broadcast_digit_settled(&state, session_id, index);
                if let Some(completion) = completion {
                    draw_service::resolve_spin(&state, completion.session).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn timeline_interleaves_begins_and_finishes() {
        let reel = ReelController::start(Uuid::new_v4(), "042");
        let timeline = settle_timeline(&reel.settle_schedule());
        let actions: Vec<ReelAction> = timeline.iter().map(|(_, action)| *action).collect();
        assert_eq!(
            actions,
            vec![
                ReelAction::Begin(0),
                ReelAction::Begin(1),
                ReelAction::Begin(2),
                ReelAction::Finish(0),
                ReelAction::Finish(1),
                ReelAction::Finish(2),
            ]
        );
        // instants are non-decreasing
        for pair in timeline.windows(2) {
            assert!(pair[0].0 <= pair[1].0);
        }
        // the final lock lands at base + 2 * stage + settle
        assert_eq!(timeline.last().map(|(at, _)| *at), Some(3_500));
    }

    #[test]
    fn digit_loops_match_the_stagger() {
        assert_eq!(digit_loops_ms(), vec![1_200, 1_320, 1_440]);
    }
}
