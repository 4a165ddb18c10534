use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::state_store::KEY_ROSTER,
    dto::{
        now_rfc3339,
        operator::{RosterImportRequest, RosterImportResponse},
        public::{ExportResponse, winner_summaries},
        validation::is_importable_row,
    },
    error::ServiceError,
    state::{SharedState, draw::Participant},
};

/// Replace the roster with the submitted rows.
///
/// Rows missing a code or a name are skipped; when nothing importable
/// remains the previous roster is kept and the import is rejected. Already
/// recorded winners are untouched, they hold their own snapshots.
pub async fn import_roster(
    state: &SharedState,
    request: RosterImportRequest,
) -> Result<RosterImportResponse, ServiceError> {
    request.validate()?;

    let total = request.entries.len();
    let roster: Vec<Participant> = request
        .entries
        .into_iter()
        .filter(is_importable_row)
        .map(|entry| Participant {
            id: entry
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            code: entry.code.trim().to_string(),
            name: entry.name.trim().to_string(),
            department: entry.department.unwrap_or_default().trim().to_string(),
        })
        .collect();

    if roster.is_empty() {
        return Err(ServiceError::InvalidInput(
            "no importable rows: every entry is missing a code or a name".into(),
        ));
    }

    let imported = roster.len();
    let skipped = total - imported;

    state.engine().write().await.apply_roster(roster.clone());
    if let Err(err) = state.store().write(KEY_ROSTER, &roster) {
        warn!(error = %err, "failed to persist roster");
    }

    info!(imported, skipped, "roster replaced");
    Ok(RosterImportResponse { imported, skipped })
}

/// Export the winners list with resolved tier names and a timestamp.
pub async fn export_winners(state: &SharedState) -> ExportResponse {
    let engine = state.engine().read().await;
    ExportResponse {
        generated_at: now_rfc3339(),
        winners: winner_summaries(&engine),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::{
        config::AppConfig,
        dao::state_store::StateStore,
        dto::operator::RosterEntryInput,
        state::AppState,
    };

    fn fresh_state(dir: &tempfile::TempDir) -> SharedState {
        let store = Arc::new(StateStore::open(dir.path().join("event.json")));
        AppState::new(&AppConfig::default(), store)
    }

    fn entry(code: &str, name: &str) -> RosterEntryInput {
        RosterEntryInput {
            id: None,
            code: code.into(),
            name: name.into(),
            department: Some("Ops".into()),
        }
    }

    #[tokio::test]
    async fn import_skips_blank_rows() {
        let dir = tempfile::tempdir().unwrap();
        let state = fresh_state(&dir);

        let response = import_roster(
            &state,
            RosterImportRequest {
                entries: vec![entry("001", "Alice"), entry("", "Bob"), entry("003", " ")],
            },
        )
        .await
        .unwrap();

        assert_eq!(response.imported, 1);
        assert_eq!(response.skipped, 2);
        assert_eq!(state.engine().read().await.roster().len(), 1);
    }

    #[tokio::test]
    async fn import_rejects_all_blank_batches() {
        let dir = tempfile::tempdir().unwrap();
        let state = fresh_state(&dir);

        let err = import_roster(
            &state,
            RosterImportRequest {
                entries: vec![entry("", ""), entry(" ", "x")],
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert!(state.engine().read().await.roster().is_empty());
    }

    #[tokio::test]
    async fn import_rejects_an_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let state = fresh_state(&dir);

        let err = import_roster(&state, RosterImportRequest { entries: vec![] })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn import_generates_missing_ids() {
        let dir = tempfile::tempdir().unwrap();
        let state = fresh_state(&dir);

        import_roster(
            &state,
            RosterImportRequest {
                entries: vec![entry("001", "Alice")],
            },
        )
        .await
        .unwrap();

        let engine = state.engine().read().await;
        assert!(!engine.roster()[0].id.is_empty());
    }
}
