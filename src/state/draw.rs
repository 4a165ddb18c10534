use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identifier of a prize tier. The set is fixed; quotas and display names are
/// configurable per event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, PartialOrd, Ord,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TierId {
    /// Grand prize, usually a single winner.
    Special,
    /// First prize.
    First,
    /// Second prize.
    Second,
    /// Third prize, the widest tier.
    Third,
}

impl TierId {
    /// All tiers in display order (top prize first).
    pub const ALL: [TierId; 4] = [TierId::Special, TierId::First, TierId::Second, TierId::Third];
}

/// A person eligible for the draw.
///
/// Winners hold a snapshot of these fields, not a reference: editing or
/// removing a roster entry never rewrites recorded winners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Opaque stable identifier, unique within the roster.
    pub id: String,
    /// Short display token shown on the reel (not guaranteed numeric).
    pub code: String,
    /// Display name.
    pub name: String,
    /// Department or group label.
    pub department: String,
}

/// A configured prize tier with its winner quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrizeTier {
    /// Which tier this entry configures.
    pub id: TierId,
    /// Operator-facing tier name.
    pub display_name: String,
    /// Maximum number of winners for this tier (strictly positive).
    pub quota: u32,
}

/// A committed draw result: participant fields snapshotted at resolution time
/// plus the tier it was drawn for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRecord {
    /// Participant id at the time of the draw.
    pub id: String,
    /// Display token at the time of the draw.
    pub code: String,
    /// Name at the time of the draw.
    pub name: String,
    /// Department at the time of the draw.
    pub department: String,
    /// Tier the participant won.
    pub tier: TierId,
}

impl WinnerRecord {
    /// Snapshot a participant into a winner record for `tier`.
    pub fn snapshot(participant: &Participant, tier: TierId) -> Self {
        Self {
            id: participant.id.clone(),
            code: participant.code.clone(),
            name: participant.name.clone(),
            department: participant.department.clone(),
            tier,
        }
    }
}

/// Policy for ending a spin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StopMode {
    /// The operator triggers the stop explicitly.
    Manual,
    /// A deadline timer triggers the stop.
    Auto,
}

/// Lower bound for the auto-stop deadline.
pub const AUTO_STOP_MIN_MS: u64 = 1_000;
/// Upper bound for the auto-stop deadline.
pub const AUTO_STOP_MAX_MS: u64 = 30_000;
/// Default auto-stop deadline.
pub const AUTO_STOP_DEFAULT_MS: u64 = 3_500;

/// Operator settings read by the engine when a spin starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinSettings {
    /// How the spin ends.
    pub stop_mode: StopMode,
    /// Auto-stop deadline in milliseconds; clamped on use.
    pub auto_stop_ms: u64,
}

impl Default for SpinSettings {
    fn default() -> Self {
        Self {
            stop_mode: StopMode::Manual,
            auto_stop_ms: AUTO_STOP_DEFAULT_MS,
        }
    }
}

impl SpinSettings {
    /// Auto-stop deadline clamped to the supported range.
    pub fn clamped_auto_stop_ms(&self) -> u64 {
        self.auto_stop_ms.clamp(AUTO_STOP_MIN_MS, AUTO_STOP_MAX_MS)
    }
}

/// Derive per-tier used-quota counts from the full winners list.
///
/// Sync folds always call this instead of applying deltas so that replaying
/// the same payload is idempotent and delivery order does not matter.
pub fn used_counts(winners: &[WinnerRecord]) -> IndexMap<TierId, u32> {
    let mut counts: IndexMap<TierId, u32> = TierId::ALL.iter().map(|t| (*t, 0)).collect();
    for winner in winners {
        if let Some(count) = counts.get_mut(&winner.tier) {
            *count += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn winner(id: &str, tier: TierId) -> WinnerRecord {
        WinnerRecord {
            id: id.into(),
            code: "042".into(),
            name: "A Winner".into(),
            department: "QA".into(),
            tier,
        }
    }

    #[test]
    fn used_counts_covers_every_tier() {
        let counts = used_counts(&[]);
        assert_eq!(counts.len(), TierId::ALL.len());
        assert!(counts.values().all(|count| *count == 0));
    }

    #[test]
    fn used_counts_derives_from_full_list() {
        let winners = vec![
            winner("a", TierId::Third),
            winner("b", TierId::Third),
            winner("c", TierId::Special),
        ];
        let counts = used_counts(&winners);
        assert_eq!(counts[&TierId::Third], 2);
        assert_eq!(counts[&TierId::Special], 1);
        assert_eq!(counts[&TierId::First], 0);
    }

    #[test]
    fn auto_stop_is_clamped_on_use() {
        let low = SpinSettings {
            stop_mode: StopMode::Auto,
            auto_stop_ms: 10,
        };
        assert_eq!(low.clamped_auto_stop_ms(), AUTO_STOP_MIN_MS);

        let high = SpinSettings {
            stop_mode: StopMode::Auto,
            auto_stop_ms: 600_000,
        };
        assert_eq!(high.clamped_auto_stop_ms(), AUTO_STOP_MAX_MS);
    }

    #[test]
    fn tier_ids_serialize_like_the_stored_form() {
        let json = serde_json::to_string(&TierId::Special).unwrap();
        assert_eq!(json, "\"SPECIAL\"");
        let back: TierId = serde_json::from_str("\"THIRD\"").unwrap();
        assert_eq!(back, TierId::Third);
    }
}
