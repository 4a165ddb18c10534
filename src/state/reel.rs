use uuid::Uuid;

/// Number of digit wheels on the reel; codes are left-padded to this width.
pub const REEL_WIDTH: usize = 3;

/// Duration of one full spin loop for the leftmost digit.
pub const SPIN_LOOP_MS: u64 = 1_200;
/// Each digit to the right spins this much slower than its neighbor.
pub const SPIN_SPEED_STEP_MS: u64 = 120;
/// Delay before the first digit starts settling after a stop.
pub const STOP_BASE_DELAY_MS: u64 = 600;
/// Gap between consecutive digits starting to settle.
pub const STOP_STAGE_INTERVAL_MS: u64 = 650;
/// How long a digit takes to ease onto its final value.
pub const SETTLE_DURATION_MS: u64 = 1_600;

/// Animation phase of one digit wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigitPhase {
    /// Cycling freely.
    Spin,
    /// Easing onto its final value.
    Settling,
    /// Locked on its final value.
    Idle,
}

/// One digit wheel: its final value and where it is in the animation.
#[derive(Debug, Clone)]
pub struct ReelDigit {
    /// Final character this wheel lands on.
    pub target: char,
    /// Current animation phase.
    pub phase: DigitPhase,
    /// Spin loop duration for this wheel, staggered by position.
    pub loop_ms: u64,
}

/// One entry in the staged stop schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettleStage {
    /// Digit index, left to right.
    pub index: usize,
    /// When this digit starts settling, relative to the stop request.
    pub fire_at_ms: u64,
    /// When this digit is locked, relative to the stop request.
    pub done_at_ms: u64,
}

/// Drives the staged stop of one spin's reel.
///
/// Pure bookkeeping: the service layer owns the clock and calls
/// [`ReelController::begin_settle`] / [`ReelController::finish_settle`] at
/// the scheduled instants. Completion is reported exactly once, from the
/// last digit locking, regardless of how the calls interleave.
#[derive(Debug, Clone)]
pub struct ReelController {
    session: Uuid,
    digits: Vec<ReelDigit>,
    completed: bool,
}

/// Emitted when the final digit locks; carries the session the commit
/// belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReelCompletion {
    /// Spin session this reel was animating.
    pub session: Uuid,
}

impl ReelController {
    /// Start a reel for `code`, left-padded with zeros to [`REEL_WIDTH`].
    /// Codes longer than the width keep their trailing digits.
    pub fn start(session: Uuid, code: &str) -> Self {
        let padded = pad_code(code);
        let digits = padded
            .chars()
            .enumerate()
            .map(|(index, target)| ReelDigit {
                target,
                phase: DigitPhase::Spin,
                loop_ms: SPIN_LOOP_MS + index as u64 * SPIN_SPEED_STEP_MS,
            })
            .collect();
        Self {
            session,
            digits,
            completed: false,
        }
    }

    /// Session this reel animates.
    pub fn session(&self) -> Uuid {
        self.session
    }

    /// Digit wheels, left to right.
    pub fn digits(&self) -> &[ReelDigit] {
        &self.digits
    }

    /// The staged stop schedule: digit `i` starts settling at
    /// `base + i * stage` and locks [`SETTLE_DURATION_MS`] later, so stages
    /// fire strictly left to right.
    pub fn settle_schedule(&self) -> Vec<SettleStage> {
        (0..self.digits.len())
            .map(|index| {
                let fire_at_ms =
                    STOP_BASE_DELAY_MS + index as u64 * STOP_STAGE_INTERVAL_MS;
                SettleStage {
                    index,
                    fire_at_ms,
                    done_at_ms: fire_at_ms + SETTLE_DURATION_MS,
                }
            })
            .collect()
    }

    /// Move digit `index` from spin to settling. Returns `true` when the
    /// phase actually changed.
    pub fn begin_settle(&mut self, index: usize) -> bool {
        match self.digits.get_mut(index) {
            Some(digit) if digit.phase == DigitPhase::Spin => {
                digit.phase = DigitPhase::Settling;
                true
            }
            _ => false,
        }
    }

    /// Lock digit `index` on its final value.
    ///
    /// Returns the completion signal only when this call locks the last
    /// digit and it has not been reported before.
    pub fn finish_settle(&mut self, index: usize) -> Option<ReelCompletion> {
        let digit = self.digits.get_mut(index)?;
        if digit.phase == DigitPhase::Idle {
            return None;
        }
        digit.phase = DigitPhase::Idle;

        let all_idle = self.digits.iter().all(|d| d.phase == DigitPhase::Idle);
        if all_idle && !self.completed {
            self.completed = true;
            Some(ReelCompletion {
                session: self.session,
            })
        } else {
            None
        }
    }

    /// Whether the completion signal has fired.
    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

/// Left-pad `code` with zeros to [`REEL_WIDTH`]; longer codes keep their
/// trailing characters.
pub fn pad_code(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    if chars.len() >= REEL_WIDTH {
        chars[chars.len() - REEL_WIDTH..].iter().collect()
    } else {
        let mut padded = String::new();
        for _ in 0..REEL_WIDTH - chars.len() {
            padded.push('0');
        }
        padded.push_str(code);
        padded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_padded_to_width() {
        assert_eq!(pad_code("7"), "007");
        assert_eq!(pad_code("42"), "042");
        assert_eq!(pad_code("123"), "123");
        assert_eq!(pad_code("9876"), "876");
    }

    #[test]
    fn spin_loops_are_staggered_per_digit() {
        let reel = ReelController::start(Uuid::new_v4(), "123");
        let loops: Vec<u64> = reel.digits().iter().map(|d| d.loop_ms).collect();
        assert_eq!(loops, vec![1_200, 1_320, 1_440]);
    }

    #[test]
    fn settle_schedule_is_strictly_staged() {
        let reel = ReelController::start(Uuid::new_v4(), "042");
        let schedule = reel.settle_schedule();
        assert_eq!(schedule.len(), REEL_WIDTH);
        assert_eq!(schedule[0].fire_at_ms, 600);
        assert_eq!(schedule[1].fire_at_ms, 1_250);
        assert_eq!(schedule[2].fire_at_ms, 1_900);
        for stage in &schedule {
            assert_eq!(stage.done_at_ms, stage.fire_at_ms + SETTLE_DURATION_MS);
        }
        for pair in schedule.windows(2) {
            assert!(pair[0].fire_at_ms < pair[1].fire_at_ms);
        }
    }

    #[test]
    fn completion_fires_once_from_last_digit() {
        let session = Uuid::new_v4();
        let mut reel = ReelController::start(session, "042");

        for index in 0..REEL_WIDTH {
            assert!(reel.begin_settle(index));
        }
        assert!(reel.finish_settle(0).is_none());
        assert!(reel.finish_settle(1).is_none());

        let completion = reel.finish_settle(2).unwrap();
        assert_eq!(completion.session, session);
        assert!(reel.is_completed());

        // repeated lock of the last digit reports nothing
        assert!(reel.finish_settle(2).is_none());
    }

    #[test]
    fn completion_waits_for_every_digit() {
        let mut reel = ReelController::start(Uuid::new_v4(), "042");
        // out-of-order locking: last digit first
        assert!(reel.finish_settle(2).is_none());
        assert!(reel.finish_settle(0).is_none());
        assert!(reel.finish_settle(1).is_some());
    }

    #[test]
    fn begin_settle_is_single_shot_per_digit() {
        let mut reel = ReelController::start(Uuid::new_v4(), "042");
        assert!(reel.begin_settle(0));
        assert!(!reel.begin_settle(0));
        assert!(!reel.begin_settle(99));
    }
}
