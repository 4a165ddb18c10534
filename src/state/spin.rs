use indexmap::IndexMap;
use rand::seq::IndexedRandom;
use thiserror::Error;
use uuid::Uuid;

use crate::state::draw::{
    Participant, PrizeTier, SpinSettings, TierId, WinnerRecord, used_counts,
};

/// Lifecycle phases of a single spin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinPhase {
    /// No spin is running; the next draw can start.
    Idle,
    /// A candidate has been drawn and the reel is cycling.
    Spinning,
    /// Stop intent recorded; the reel is settling digit by digit.
    StopRequested,
    /// The reel finished and the winner has just been committed. Transient:
    /// the machine returns to [`SpinPhase::Idle`] immediately after commit.
    Resolved,
}

/// Transient state of an in-flight spin. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpinSession {
    /// Identity of this spin; commits and reel signals are keyed by it so
    /// stale signals from an aborted spin are no-ops.
    pub id: Uuid,
    /// Tier the spin was started for.
    pub tier: TierId,
    /// Candidate selected when the spin started; becomes the winner only at
    /// resolution.
    pub candidate: Participant,
}

/// Reasons the engine refuses a draw action. All operator-visible, none fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    /// The selected tier already has as many winners as its quota allows.
    #[error("quota exhausted for tier {tier:?}")]
    QuotaExhausted {
        /// Tier whose quota is used up.
        tier: TierId,
    },
    /// Every roster participant is already present in the winners list.
    #[error("no eligible candidates: every participant has already won")]
    NoEligibleCandidates,
    /// The action is not valid in the current phase.
    #[error("cannot {action} while in {phase:?}")]
    InvalidPhase {
        /// Operator action that was attempted.
        action: &'static str,
        /// Phase the engine was in.
        phase: SpinPhase,
    },
}

/// The draw engine: spin lifecycle, candidate selection, and quota accounting.
///
/// Purely synchronous; timers and broadcasts live in the service layer. All
/// mutation goes through one instance behind a lock, so transitions never
/// race within a process. Cross-instance convergence comes from the sync
/// reducers (`apply_*`), which always re-derive counts from full lists.
#[derive(Debug)]
pub struct DrawEngine {
    phase: SpinPhase,
    session: Option<SpinSession>,
    selected_tier: TierId,
    roster: Vec<Participant>,
    tiers: Vec<PrizeTier>,
    winners: Vec<WinnerRecord>,
    used: IndexMap<TierId, u32>,
    settings: SpinSettings,
    keyboard_enabled: bool,
}

impl DrawEngine {
    /// Build an engine from persisted state; used counts are derived, never
    /// loaded.
    pub fn new(
        roster: Vec<Participant>,
        tiers: Vec<PrizeTier>,
        winners: Vec<WinnerRecord>,
        settings: SpinSettings,
        keyboard_enabled: bool,
    ) -> Self {
        let used = used_counts(&winners);
        Self {
            phase: SpinPhase::Idle,
            session: None,
            selected_tier: TierId::Special,
            roster,
            tiers,
            winners,
            used,
            settings,
            keyboard_enabled,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SpinPhase {
        self.phase
    }

    /// The in-flight spin session, if any.
    pub fn session(&self) -> Option<&SpinSession> {
        self.session.as_ref()
    }

    /// Tier the next draw will run for.
    pub fn selected_tier(&self) -> TierId {
        self.selected_tier
    }

    /// Configured tiers in display order.
    pub fn tiers(&self) -> &[PrizeTier] {
        &self.tiers
    }

    /// Current roster.
    pub fn roster(&self) -> &[Participant] {
        &self.roster
    }

    /// All committed winners, in commit order.
    pub fn winners(&self) -> &[WinnerRecord] {
        &self.winners
    }

    /// Current spin settings.
    pub fn settings(&self) -> SpinSettings {
        self.settings
    }

    /// Whether presentation layers should honor keyboard shortcuts.
    pub fn keyboard_enabled(&self) -> bool {
        self.keyboard_enabled
    }

    /// Number of winners already recorded for `tier`.
    pub fn used(&self, tier: TierId) -> u32 {
        self.used.get(&tier).copied().unwrap_or(0)
    }

    /// Configured quota for `tier` (0 when the tier is not configured).
    pub fn quota(&self, tier: TierId) -> u32 {
        self.tiers
            .iter()
            .find(|t| t.id == tier)
            .map(|t| t.quota)
            .unwrap_or(0)
    }

    /// Roster entries not yet present in any winner record.
    pub fn candidate_pool(&self) -> Vec<&Participant> {
        self.roster
            .iter()
            .filter(|p| !self.winners.iter().any(|w| w.id == p.id))
            .collect()
    }

    /// Change the tier the next draw runs for. Only valid while idle.
    pub fn select_tier(&mut self, tier: TierId) -> Result<(), DrawError> {
        if self.phase != SpinPhase::Idle {
            return Err(DrawError::InvalidPhase {
                action: "select a tier",
                phase: self.phase,
            });
        }
        self.selected_tier = tier;
        Ok(())
    }

    /// Start a spin for the selected tier: quota check, pool computation, one
    /// uniform draw, then `Idle -> Spinning`.
    ///
    /// Returns the fresh session so the caller can schedule timers and drive
    /// the reel. Rejections leave the engine untouched.
    pub fn begin_spin(&mut self) -> Result<SpinSession, DrawError> {
        if self.phase != SpinPhase::Idle {
            return Err(DrawError::InvalidPhase {
                action: "draw",
                phase: self.phase,
            });
        }

        let tier = self.selected_tier;
        if self.used(tier) >= self.quota(tier) {
            return Err(DrawError::QuotaExhausted { tier });
        }

        let pool = self.candidate_pool();
        let candidate = pool
            .choose(&mut rand::rng())
            .map(|p| (*p).clone())
            .ok_or(DrawError::NoEligibleCandidates)?;

        let session = SpinSession {
            id: Uuid::new_v4(),
            tier,
            candidate,
        };
        self.session = Some(session.clone());
        self.phase = SpinPhase::Spinning;
        Ok(session)
    }

    /// Record stop intent: `Spinning -> StopRequested`.
    ///
    /// Returns `true` when the transition happened. A stop while already
    /// stopping, or outside a spin, is a no-op returning `false`; the action
    /// only records intent, so repeating it changes nothing.
    pub fn request_stop(&mut self) -> bool {
        if self.phase == SpinPhase::Spinning {
            self.phase = SpinPhase::StopRequested;
            true
        } else {
            false
        }
    }

    /// Commit the pending winner: `StopRequested -> Resolved`.
    ///
    /// Driven solely by the reel completion signal. The commit is keyed by
    /// the session id: a signal for any other session, or a repeated signal
    /// after the session was consumed, returns `None` and changes nothing.
    /// At most one winner per spin.
    pub fn resolve(&mut self, session_id: Uuid) -> Option<WinnerRecord> {
        if self.phase != SpinPhase::StopRequested {
            return None;
        }
        if self
            .session
            .as_ref()
            .is_none_or(|session| session.id != session_id)
        {
            return None;
        }

        let session = self.session.take()?;
        let record = WinnerRecord::snapshot(&session.candidate, session.tier);
        self.winners.push(record.clone());
        *self.used.entry(session.tier).or_insert(0) += 1;
        self.phase = SpinPhase::Resolved;
        Some(record)
    }

    /// `Resolved -> Idle`, immediately after commit.
    pub fn finish_cycle(&mut self) {
        if self.phase == SpinPhase::Resolved {
            self.phase = SpinPhase::Idle;
        }
    }

    /// Force any phase back to idle, discarding the pending session without
    /// committing. Returns `true` when something was actually discarded.
    pub fn abort(&mut self) -> bool {
        let had_spin = self.phase != SpinPhase::Idle || self.session.is_some();
        self.phase = SpinPhase::Idle;
        self.session = None;
        had_spin
    }

    /// Remove the winner at `index` (undo), decrementing that tier's count.
    pub fn remove_winner(&mut self, index: usize) -> Option<WinnerRecord> {
        if index >= self.winners.len() {
            return None;
        }
        let record = self.winners.remove(index);
        self.used = used_counts(&self.winners);
        Some(record)
    }

    /// Set the quota for one tier. Validation (positive, not below the used
    /// count) happens at the service boundary.
    pub fn set_tier_quota(&mut self, tier: TierId, quota: u32) -> bool {
        match self.tiers.iter_mut().find(|t| t.id == tier) {
            Some(entry) => {
                entry.quota = quota;
                true
            }
            None => false,
        }
    }

    /// Sync reducer: replace the winners list wholesale and re-derive used
    /// counts from it.
    ///
    /// An empty list is a full reset: any in-flight spin is discarded and the
    /// phase returns to idle. Returns `true` when such a reset aborted a
    /// spin, so the caller can cancel timers.
    pub fn apply_winners(&mut self, winners: Vec<WinnerRecord>) -> bool {
        let reset = winners.is_empty();
        self.winners = winners;
        self.used = used_counts(&self.winners);
        if reset { self.abort() } else { false }
    }

    /// Sync reducer: replace the roster verbatim.
    pub fn apply_roster(&mut self, roster: Vec<Participant>) {
        self.roster = roster;
    }

    /// Sync reducer: replace the tier configuration.
    ///
    /// A tier whose incoming quota is below its derived used count keeps its
    /// previous quota; the ids of such tiers are returned so the caller can
    /// log them. This keeps `used <= quota` holding under any payload order.
    pub fn apply_tiers(&mut self, tiers: Vec<PrizeTier>) -> Vec<TierId> {
        let mut rejected = Vec::new();
        let previous = std::mem::replace(&mut self.tiers, tiers);
        for entry in &mut self.tiers {
            let used = self.used.get(&entry.id).copied().unwrap_or(0);
            if entry.quota < used {
                rejected.push(entry.id);
                if let Some(old) = previous.iter().find(|t| t.id == entry.id) {
                    entry.quota = old.quota;
                }
            }
        }
        rejected
    }

    /// Sync reducer: replace the spin settings verbatim.
    pub fn apply_settings(&mut self, settings: SpinSettings) {
        self.settings = settings;
    }

    /// Sync reducer: replace the keyboard toggle verbatim.
    pub fn apply_keyboard_enabled(&mut self, enabled: bool) {
        self.keyboard_enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::draw::StopMode;

    fn participant(id: &str, code: &str) -> Participant {
        Participant {
            id: id.into(),
            code: code.into(),
            name: format!("Person {id}"),
            department: "Ops".into(),
        }
    }

    fn tier(id: TierId, quota: u32) -> PrizeTier {
        PrizeTier {
            id,
            display_name: format!("{id:?} Prize"),
            quota,
        }
    }

    fn engine(roster: Vec<Participant>, tiers: Vec<PrizeTier>) -> DrawEngine {
        DrawEngine::new(
            roster,
            tiers,
            Vec::new(),
            SpinSettings {
                stop_mode: StopMode::Manual,
                auto_stop_ms: 3_500,
            },
            true,
        )
    }

    /// Drive one full spin cycle to resolution and return the winner.
    fn spin_to_winner(engine: &mut DrawEngine) -> WinnerRecord {
        let session = engine.begin_spin().unwrap();
        assert!(engine.request_stop());
        let record = engine.resolve(session.id).unwrap();
        engine.finish_cycle();
        assert_eq!(engine.phase(), SpinPhase::Idle);
        record
    }

    #[test]
    fn initial_phase_is_idle() {
        let engine = engine(vec![participant("a", "001")], vec![tier(TierId::Special, 1)]);
        assert_eq!(engine.phase(), SpinPhase::Idle);
        assert!(engine.session().is_none());
    }

    #[test]
    fn draw_never_selects_a_prior_winner() {
        let roster = vec![
            participant("a", "001"),
            participant("b", "002"),
            participant("c", "003"),
        ];
        // quota above the roster size so exhausting the pool is what trips
        let mut engine = engine(roster.clone(), vec![tier(TierId::Third, 4)]);
        engine.select_tier(TierId::Third).unwrap();

        let mut seen = Vec::new();
        for _ in 0..roster.len() {
            let record = spin_to_winner(&mut engine);
            assert!(!seen.contains(&record.id), "repeated winner {}", record.id);
            seen.push(record.id);
        }

        // pool exhausted: the next draw reports it
        assert_eq!(
            engine.begin_spin().unwrap_err(),
            DrawError::NoEligibleCandidates
        );
    }

    #[test]
    fn quota_exhaustion_rejects_without_mutation() {
        let roster = vec![
            participant("a", "001"),
            participant("b", "002"),
            participant("c", "003"),
        ];
        let mut engine = engine(roster, vec![tier(TierId::Special, 2)]);

        spin_to_winner(&mut engine);
        spin_to_winner(&mut engine);
        assert_eq!(engine.used(TierId::Special), 2);

        let err = engine.begin_spin().unwrap_err();
        assert_eq!(
            err,
            DrawError::QuotaExhausted {
                tier: TierId::Special
            }
        );
        assert_eq!(engine.winners().len(), 2);
        assert_eq!(engine.phase(), SpinPhase::Idle);
    }

    #[test]
    fn two_tier_scenario_excludes_prior_winner() {
        let roster = vec![
            participant("a", "001"),
            participant("b", "002"),
            participant("c", "003"),
        ];
        let mut engine = engine(
            roster,
            vec![tier(TierId::Special, 1), tier(TierId::First, 1)],
        );

        engine.select_tier(TierId::Special).unwrap();
        let first = spin_to_winner(&mut engine);
        assert_eq!(first.tier, TierId::Special);

        engine.select_tier(TierId::First).unwrap();
        let session = engine.begin_spin().unwrap();
        assert_ne!(session.candidate.id, first.id);
    }

    #[test]
    fn draw_outside_idle_is_rejected() {
        let mut engine = engine(
            vec![participant("a", "001"), participant("b", "002")],
            vec![tier(TierId::Special, 2)],
        );
        engine.begin_spin().unwrap();
        assert!(matches!(
            engine.begin_spin(),
            Err(DrawError::InvalidPhase {
                action: "draw",
                phase: SpinPhase::Spinning,
            })
        ));
    }

    #[test]
    fn stop_is_idempotent_and_phase_guarded() {
        let mut engine = engine(vec![participant("a", "001")], vec![tier(TierId::Special, 1)]);

        // stop while idle: no-op
        assert!(!engine.request_stop());

        engine.begin_spin().unwrap();
        assert!(engine.request_stop());
        assert_eq!(engine.phase(), SpinPhase::StopRequested);

        // second stop: no-op, phase unchanged
        assert!(!engine.request_stop());
        assert_eq!(engine.phase(), SpinPhase::StopRequested);
    }

    #[test]
    fn resolve_is_idempotent_per_session() {
        let mut engine = engine(vec![participant("a", "001")], vec![tier(TierId::Special, 1)]);
        let session = engine.begin_spin().unwrap();
        engine.request_stop();

        assert!(engine.resolve(session.id).is_some());
        engine.finish_cycle();

        // repeated completion signal for the same session: no-op
        assert!(engine.resolve(session.id).is_none());
        assert_eq!(engine.winners().len(), 1);
        assert_eq!(engine.used(TierId::Special), 1);
    }

    #[test]
    fn resolve_ignores_foreign_sessions() {
        let mut engine = engine(vec![participant("a", "001")], vec![tier(TierId::Special, 1)]);
        engine.begin_spin().unwrap();
        engine.request_stop();

        assert!(engine.resolve(Uuid::new_v4()).is_none());
        assert!(engine.winners().is_empty());
        assert_eq!(engine.phase(), SpinPhase::StopRequested);
    }

    #[test]
    fn abort_discards_pending_spin_and_stale_signal_is_noop() {
        let mut engine = engine(vec![participant("a", "001")], vec![tier(TierId::Special, 1)]);
        let session = engine.begin_spin().unwrap();
        engine.request_stop();

        assert!(engine.abort());
        assert_eq!(engine.phase(), SpinPhase::Idle);
        assert!(engine.session().is_none());

        // stale completion signal after the abort commits nothing
        assert!(engine.resolve(session.id).is_none());
        assert!(engine.winners().is_empty());
    }

    #[test]
    fn select_tier_rejected_while_spinning() {
        let mut engine = engine(vec![participant("a", "001")], vec![tier(TierId::Special, 1)]);
        engine.begin_spin().unwrap();
        assert!(engine.select_tier(TierId::First).is_err());
        assert_eq!(engine.selected_tier(), TierId::Special);
    }

    #[test]
    fn undo_decrements_only_that_tier() {
        let roster = vec![
            participant("a", "001"),
            participant("b", "002"),
            participant("c", "003"),
        ];
        let mut engine = engine(
            roster,
            vec![tier(TierId::Special, 1), tier(TierId::First, 2)],
        );

        engine.select_tier(TierId::Special).unwrap();
        spin_to_winner(&mut engine);
        engine.select_tier(TierId::First).unwrap();
        spin_to_winner(&mut engine);

        let removed = engine.remove_winner(0).unwrap();
        assert_eq!(removed.tier, TierId::Special);
        assert_eq!(engine.used(TierId::Special), 0);
        assert_eq!(engine.used(TierId::First), 1);
        assert_eq!(engine.winners().len(), 1);
    }

    #[test]
    fn apply_winners_recomputes_and_is_idempotent() {
        let mut engine = engine(
            vec![participant("a", "001")],
            vec![tier(TierId::Second, 5)],
        );
        let payload = vec![
            WinnerRecord {
                id: "x".into(),
                code: "010".into(),
                name: "X".into(),
                department: "HR".into(),
                tier: TierId::Second,
            },
            WinnerRecord {
                id: "y".into(),
                code: "011".into(),
                name: "Y".into(),
                department: "HR".into(),
                tier: TierId::Second,
            },
        ];

        engine.apply_winners(payload.clone());
        assert_eq!(engine.used(TierId::Second), 2);

        // same payload again: counts unchanged
        engine.apply_winners(payload);
        assert_eq!(engine.used(TierId::Second), 2);
    }

    #[test]
    fn empty_winners_sync_aborts_inflight_spin() {
        let mut engine = engine(
            vec![participant("a", "001"), participant("b", "002")],
            vec![tier(TierId::Special, 2)],
        );
        let session = engine.begin_spin().unwrap();
        engine.request_stop();

        assert!(engine.apply_winners(Vec::new()));
        assert_eq!(engine.phase(), SpinPhase::Idle);
        assert!(engine.resolve(session.id).is_none());
    }

    #[test]
    fn apply_tiers_refuses_quota_below_used() {
        let mut engine = engine(
            vec![participant("a", "001"), participant("b", "002")],
            vec![tier(TierId::Special, 2)],
        );
        spin_to_winner(&mut engine);
        spin_to_winner(&mut engine);

        let rejected = engine.apply_tiers(vec![tier(TierId::Special, 1)]);
        assert_eq!(rejected, vec![TierId::Special]);
        assert_eq!(engine.quota(TierId::Special), 2);
    }
}
