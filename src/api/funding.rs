use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::accounts::parse_decimal;
use crate::api::AppState;
use crate::domain::{AccountId, TimeMs, Transaction};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingRequest {
    pub account_id: String,
    /// Signed amount: positive for a deposit, negative for a withdrawal.
    pub amount: String,
    pub time_ms: Option<i64>,
    pub note: Option<String>,
    /// External transfer id; identical re-submissions dedupe on it.
    pub reference: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FundingResponse {
    /// False when the event was already present (idempotent replay).
    pub recorded: bool,
    pub current_balance: String,
}

pub async fn record_funding(
    State(state): State<AppState>,
    Json(body): Json<FundingRequest>,
) -> Result<Json<FundingResponse>, AppError> {
    let amount = parse_decimal("amount", &body.amount)?;
    if amount.is_zero() {
        return Err(AppError::BadRequest("amount must be non-zero".into()));
    }

    let account_id = AccountId::new(body.account_id);
    let _guard = state.locks.acquire(&account_id).await;

    let account = state
        .repo
        .get_account(&account_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("account {}", account_id)))?;

    let tx = Transaction::funding(
        account.id.clone(),
        body.time_ms.map(TimeMs::new).unwrap_or_else(TimeMs::now),
        amount,
        body.note,
        body.reference.as_deref(),
    );
    let recorded = state.repo.insert_transaction(&tx).await?;
    let current_balance = state.balance.refresh_cache(&account).await?;

    Ok(Json(FundingResponse {
        recorded,
        current_balance: current_balance.to_canonical_string(),
    }))
}
