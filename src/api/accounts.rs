use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::AppState;
use crate::domain::{Account, AccountId, ClientKind, Decimal, LedgerSnapshot, TimeMs, Venue};
use crate::engine::pending_for;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub client_name: String,
    pub venue: String,
    pub client_kind: String,
    pub broker_share_pct: String,
    pub company_share_pct: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDto {
    pub account_id: String,
    pub client_name: String,
    pub venue: String,
    pub client_kind: String,
    pub broker_share_pct: String,
    pub company_share_pct: String,
    pub active: bool,
}

impl AccountDto {
    fn from_account(account: &Account) -> Self {
        AccountDto {
            account_id: account.id.to_string(),
            client_name: account.client_name.clone(),
            venue: account.venue.to_string(),
            client_kind: account.client_kind.to_string(),
            broker_share_pct: account.broker_share_pct.to_canonical_string(),
            company_share_pct: account.company_share_pct.to_canonical_string(),
            active: account.active,
        }
    }
}

pub async fn create_account(
    State(state): State<AppState>,
    Json(body): Json<CreateAccountRequest>,
) -> Result<Json<AccountDto>, AppError> {
    if body.client_name.trim().is_empty() {
        return Err(AppError::BadRequest("clientName must not be empty".into()));
    }
    if body.venue.trim().is_empty() {
        return Err(AppError::BadRequest("venue must not be empty".into()));
    }

    let client_kind = ClientKind::from_str(&body.client_kind)
        .map_err(|e| AppError::BadRequest(format!("Invalid clientKind: {}", e)))?;
    let broker_share_pct = parse_decimal("brokerSharePct", &body.broker_share_pct)?;
    let company_share_pct = match &body.company_share_pct {
        Some(s) => parse_decimal("companySharePct", s)?,
        None => Decimal::zero(),
    };

    let account = Account::new(
        body.client_name.trim().to_string(),
        Venue::new(body.venue.trim().to_string()),
        client_kind,
        broker_share_pct,
        company_share_pct,
    )
    .map_err(|e| AppError::BadRequest(e.to_string()))?;

    state.repo.insert_account(&account).await?;

    Ok(Json(AccountDto::from_account(&account)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotQuery {
    pub at_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    #[serde(flatten)]
    pub account: AccountDto,
    pub current_balance: String,
    pub old_balance: String,
    pub pending: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_direction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ledger: Option<LedgerSnapshot>,
}

pub async fn get_account(
    Path(id): Path<String>,
    Query(params): Query<SnapshotQuery>,
    State(state): State<AppState>,
) -> Result<Json<AccountSnapshot>, AppError> {
    let account_id = AccountId::new(id);
    let account = state
        .repo
        .get_account(&account_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("account {}", account_id)))?;

    let at = params.at_ms.map(TimeMs::new);
    let current = state.balance.resolve(&account, at).await?;
    let old_balance = state.baseline.old_balance(&account, at).await?;
    let pending = pending_for(&account, old_balance, current);

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

    Ok(Json(AccountSnapshot {
        account: AccountDto::from_account(&account),
        current_balance: current.to_canonical_string(),
        old_balance: old_balance.to_canonical_string(),
        pending: pending.amount().to_canonical_string(),
        pending_direction: pending.direction().map(|d| d.to_string()),
        ledger,
    }))
}

pub(crate) fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, AppError> {
    Decimal::from_str(raw)
        .map_err(|_| AppError::BadRequest(format!("Invalid decimal for {}: {}", field, raw)))
}
