use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::AppState;
use crate::domain::{AccountId, LedgerSnapshot};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetTallyResponse {
    pub account_id: String,
    /// Recomputed from the full transaction log.
    pub computed_client: String,
    pub computed_company: String,
    /// The incrementally maintained ledger entry, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger: Option<LedgerSnapshot>,
    /// True when the stored ledger matches the recomputed figures.
    pub consistent: bool,
}

pub async fn get_net_tally(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<NetTallyResponse>, AppError> {
    let account_id = AccountId::new(id);
    let account = state
        .repo
        .get_account(&account_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("account {}", account_id)))?;

    let report = state.reconciler.reconcile(&account).await?;

    let ledger = if account.is_company() {
        state
            .repo
            .get_tally(&account_id)
            .await?
            .map(LedgerSnapshot::Tally)
    } else {
        state
            .repo
            .get_outstanding(&account_id)
            .await?
            .map(LedgerSnapshot::Outstanding)
    };

    Ok(Json(NetTallyResponse {
        account_id: account_id.to_string(),
        computed_client: report.computed.client.to_canonical_string(),
        computed_company: report.computed.company.to_canonical_string(),
        ledger,
        consistent: report.consistent,
    }))
}
