//! DTO definitions for the read-only public surface.

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::phase::VisibleSpinPhase,
    state::draw::{PrizeTier, SpinSettings, StopMode, TierId, WinnerRecord},
    state::spin::DrawEngine,
};

/// Snapshot of one winner for listing and export.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct WinnerSummary {
    /// Position in the winners list; undo is addressed by this index.
    pub index: usize,
    /// Display code shown on the reel.
    pub code: String,
    /// Winner name.
    pub name: String,
    /// Department or group label.
    pub department: String,
    /// Tier the winner was drawn for.
    pub tier: TierId,
    /// Operator-facing name of that tier.
    pub tier_name: String,
}

impl WinnerSummary {
    /// Build a summary from a stored record, resolving the tier display name
    /// against the current configuration.
    pub fn from_record(index: usize, record: &WinnerRecord, tiers: &[PrizeTier]) -> Self {
        let tier_name = tiers
            .iter()
            .find(|t| t.id == record.tier)
            .map(|t| t.display_name.clone())
            .unwrap_or_else(|| format!("{:?}", record.tier));
        Self {
            index,
            code: record.code.clone(),
            name: record.name.clone(),
            department: record.department.clone(),
            tier: record.tier,
            tier_name,
        }
    }
}

/// Quota accounting for one tier.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct TierStatus {
    /// Which tier.
    pub id: TierId,
    /// Operator-facing tier name.
    pub name: String,
    /// Configured maximum number of winners.
    pub quota: u32,
    /// Winners already recorded.
    pub used: u32,
    /// Draws still possible for this tier.
    pub remaining: u32,
}

/// Spin settings as exposed to clients.
#[derive(Debug, Serialize, ToSchema, Clone, Copy)]
pub struct SettingsView {
    /// How a spin ends.
    pub stop_mode: StopMode,
    /// Auto-stop deadline in milliseconds (already clamped).
    pub auto_stop_ms: u64,
    /// Whether presentation layers honor keyboard shortcuts.
    pub keyboard_enabled: bool,
}

/// Full event snapshot served to a freshly connected client.
#[derive(Debug, Serialize, ToSchema)]
pub struct DrawSnapshot {
    /// Current spin phase.
    pub phase: VisibleSpinPhase,
    /// Tier the next draw will run for.
    pub selected_tier: TierId,
    /// Per-tier quota accounting.
    pub tiers: Vec<TierStatus>,
    /// Winners in commit order.
    pub winners: Vec<WinnerSummary>,
    /// Current settings.
    pub settings: SettingsView,
    /// Number of roster entries.
    pub roster_size: usize,
    /// Roster entries still eligible to win.
    pub pool_remaining: usize,
    /// Whether persistence is currently failing.
    pub degraded: bool,
}

impl DrawSnapshot {
    /// Assemble the snapshot from the engine under its read lock.
    pub fn from_engine(engine: &DrawEngine, degraded: bool) -> Self {
        let settings: SpinSettings = engine.settings();
        Self {
            phase: (&engine.phase()).into(),
            selected_tier: engine.selected_tier(),
            tiers: tier_statuses(engine),
            winners: winner_summaries(engine),
            settings: SettingsView {
                stop_mode: settings.stop_mode,
                auto_stop_ms: settings.clamped_auto_stop_ms(),
                keyboard_enabled: engine.keyboard_enabled(),
            },
            roster_size: engine.roster().len(),
            pool_remaining: engine.candidate_pool().len(),
            degraded,
        }
    }
}

/// Current phase only, for cheap polling.
#[derive(Debug, Serialize, ToSchema)]
pub struct PhaseResponse {
    /// Current spin phase.
    pub phase: VisibleSpinPhase,
}

/// Winners list export with a generation timestamp.
#[derive(Debug, Serialize, ToSchema)]
pub struct ExportResponse {
    /// RFC 3339 instant the export was generated.
    pub generated_at: String,
    /// Winners in commit order.
    pub winners: Vec<WinnerSummary>,
}

/// Project the engine's tiers into quota statuses.
pub fn tier_statuses(engine: &DrawEngine) -> Vec<TierStatus> {
    engine
        .tiers()
        .iter()
        .map(|tier| {
            let used = engine.used(tier.id);
            TierStatus {
                id: tier.id,
                name: tier.display_name.clone(),
                quota: tier.quota,
                used,
                remaining: tier.quota.saturating_sub(used),
            }
        })
        .collect()
}

/// Project the engine's winners into indexed summaries.
pub fn winner_summaries(engine: &DrawEngine) -> Vec<WinnerSummary> {
    engine
        .winners()
        .iter()
        .enumerate()
        .map(|(index, record)| WinnerSummary::from_record(index, record, engine.tiers()))
        .collect()
}
