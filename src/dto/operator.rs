//! DTO definitions used by the operator REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::state::draw::{StopMode, TierId};

/// Request to change the tier the next draw runs for.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectTierRequest {
    /// Tier the next draw should run for.
    pub tier: TierId,
}

/// Response confirming a spin has started.
#[derive(Debug, Serialize, ToSchema)]
pub struct DrawStartedResponse {
    /// Identity of the spin; stop and resolution signals reference it.
    pub session_id: Uuid,
    /// Tier the spin runs for.
    pub tier: TierId,
    /// Whether a timer will trigger the stop automatically.
    pub auto_stop: bool,
}

/// Request to update one tier's winner quota.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct QuotaUpdateRequest {
    /// New maximum number of winners; must stay positive and at or above the
    /// number of winners already recorded for the tier.
    #[validate(range(min = 1))]
    pub quota: u32,
}

/// Request to update spin settings; absent fields keep their current value.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SettingsUpdateRequest {
    /// How a spin ends.
    #[serde(default)]
    pub stop_mode: Option<StopMode>,
    /// Auto-stop deadline in milliseconds; out-of-range values are clamped.
    #[serde(default)]
    pub auto_stop_ms: Option<u64>,
    /// Whether presentation layers honor keyboard shortcuts.
    #[serde(default)]
    pub keyboard_enabled: Option<bool>,
}

/// One roster row as submitted by the operator.
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
pub struct RosterEntryInput {
    /// Stable identifier; generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Display code shown on the reel.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Department or group label.
    #[serde(default)]
    pub department: Option<String>,
}

/// Request replacing the whole roster.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RosterImportRequest {
    /// Submitted rows; rows without a code or name are skipped.
    #[validate(length(min = 1))]
    pub entries: Vec<RosterEntryInput>,
}

/// Result of a roster import.
#[derive(Debug, Serialize, ToSchema)]
pub struct RosterImportResponse {
    /// Rows accepted into the roster.
    pub imported: usize,
    /// Rows skipped for missing code or name.
    pub skipped: usize,
}

/// Generic action acknowledgement used by operator endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    /// Human-readable outcome of the action.
    pub message: String,
}
