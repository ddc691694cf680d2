use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::accounts::parse_decimal;
use crate::api::AppState;
use crate::domain::{AccountId, Decimal, TimeMs};
use crate::engine::PnlEvent;
use crate::error::AppError;
use crate::orchestration::BalanceRecordRequest;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordBalanceBody {
    pub account_id: String,
    pub time_ms: Option<i64>,
    pub remaining_balance: String,
    pub extra_adjustment: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordBalanceResponse {
    pub current_balance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived: Option<DerivedEventDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedEventDto {
    pub kind: String,
    pub amount: String,
    pub total_share: String,
    pub broker_cut: String,
    pub company_cut: String,
}

impl DerivedEventDto {
    fn from_event(event: &PnlEvent) -> Self {
        DerivedEventDto {
            kind: event.kind.to_string(),
            amount: event.amount.to_canonical_string(),
            total_share: event.split.total_share.to_canonical_string(),
            broker_cut: event.split.broker_cut.to_canonical_string(),
            company_cut: event.split.company_cut.to_canonical_string(),
        }
    }
}

pub async fn record_balance(
    State(state): State<AppState>,
    Json(body): Json<RecordBalanceBody>,
) -> Result<Json<RecordBalanceResponse>, AppError> {
    let remaining_balance = parse_decimal("remainingBalance", &body.remaining_balance)?;
    let extra_adjustment = match &body.extra_adjustment {
        Some(s) => parse_decimal("extraAdjustment", s)?,
        None => Decimal::zero(),
    };

    let request = BalanceRecordRequest {
        account_id: AccountId::new(body.account_id),
        time_ms: body.time_ms.map(TimeMs::new),
        remaining_balance,
        extra_adjustment,
    };
    let outcome = state.recorder.record_balance(&request).await?;

    Ok(Json(RecordBalanceResponse {
        current_balance: outcome.current_balance.to_canonical_string(),
        derived: outcome.derived.as_ref().map(DerivedEventDto::from_event),
    }))
}
