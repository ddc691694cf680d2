use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::accounts::parse_decimal;
use crate::api::AppState;
use crate::domain::{AccountId, Direction, TimeMs};
use crate::engine::{SettlementOutcome, SettlementRequest};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleBody {
    pub account_id: String,
    pub amount: String,
    pub time_ms: Option<i64>,
    pub direction: String,
    pub note: Option<String>,
}

/// A rejected settlement is a domain outcome, not a transport error: the
/// response carries `accepted: false` and the reason, with status 200.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub resulting_pending: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_direction: Option<String>,
    pub resulting_baseline: String,
}

impl SettleResponse {
    fn from_outcome(outcome: &SettlementOutcome) -> Self {
        SettleResponse {
            accepted: outcome.accepted,
            reason: outcome.reason.clone(),
            resulting_pending: outcome.resulting_pending.to_canonical_string(),
            pending_direction: outcome.pending_direction.map(|d| d.to_string()),
            resulting_baseline: outcome.resulting_baseline.to_canonical_string(),
        }
    }
}

pub async fn settle(
    State(state): State<AppState>,
    Json(body): Json<SettleBody>,
) -> Result<Json<SettleResponse>, AppError> {
    let amount = parse_decimal("amount", &body.amount)?;
    let direction = Direction::from_str(&body.direction)
        .map_err(|e| AppError::BadRequest(format!("Invalid direction: {}", e)))?;

    let request = SettlementRequest {
        account_id: AccountId::new(body.account_id),
        amount,
        time_ms: body.time_ms.map(TimeMs::new),
        direction,
        note: body.note,
    };
    let outcome = state.settlement.settle(&request).await?;

    Ok(Json(SettleResponse::from_outcome(&outcome)))
}
