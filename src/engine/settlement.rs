//! Settlement validation and application.
//!
//! A settlement is a human-initiated partial payment against the pending
//! share obligation. Validation and application run as one atomic unit per
//! account; a rejected request mutates nothing.

use crate::db::Repository;
use crate::domain::{Account, AccountId, Decimal, Direction, TimeMs, Transaction, TxKind};
use crate::engine::{
    pnl::{pending_for, split_payment},
    BalanceResolver, LedgerUpdater, OldBalanceCalculator, Pending,
};
use crate::orchestration::locks::AccountLocks;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// A settlement request violated an invariant. Nothing was mutated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("payment amount must be positive")]
    NonPositiveAmount,
    #[error("nothing is pending for this account")]
    NothingPending,
    #[error("payment {amount} exceeds pending {pending}")]
    ExceedsPending { amount: Decimal, pending: Decimal },
    #[error("direction {requested} does not match the {pending} side owed")]
    DirectionMismatch {
        requested: Direction,
        pending: Direction,
    },
}

/// The baseline-crossing safety check failed: applying the payment would push
/// the baseline past the current balance, which signals upstream data
/// corruption. Aborted without partial writes; never auto-corrected.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("baseline {new_baseline} would cross current balance {current} (was {old_baseline})")]
pub struct InconsistentStateError {
    pub old_baseline: Decimal,
    pub new_baseline: Decimal,
    pub current: Decimal,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown account: {0}")]
    UnknownAccount(AccountId),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// A settlement payment to validate and apply.
#[derive(Debug, Clone, Deserialize)]
pub struct SettlementRequest {
    pub account_id: AccountId,
    /// Positive payment amount at currency granularity.
    pub amount: Decimal,
    /// Event time for the settlement transaction (default: now).
    pub time_ms: Option<TimeMs>,
    pub direction: Direction,
    pub note: Option<String>,
}

/// Outcome of a settlement request: either applied, or rejected with a
/// specific reason and the unchanged figures.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SettlementOutcome {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub resulting_pending: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_direction: Option<Direction>,
    pub resulting_baseline: Decimal,
}

impl SettlementOutcome {
    fn rejected(reason: String, pending: &Pending, baseline: Decimal) -> Self {
        SettlementOutcome {
            accepted: false,
            reason: Some(reason),
            resulting_pending: pending.amount(),
            pending_direction: pending.direction(),
            resulting_baseline: baseline,
        }
    }
}

#[derive(Clone)]
pub struct SettlementEngine {
    repo: Arc<Repository>,
    balance: BalanceResolver,
    baseline: OldBalanceCalculator,
    ledger: LedgerUpdater,
    locks: Arc<AccountLocks>,
}

impl SettlementEngine {
    pub fn new(
        repo: Arc<Repository>,
        balance: BalanceResolver,
        baseline: OldBalanceCalculator,
        ledger: LedgerUpdater,
        locks: Arc<AccountLocks>,
    ) -> Self {
        Self {
            repo,
            balance,
            baseline,
            ledger,
            locks,
        }
    }

    /// Validate and, if valid, apply a settlement payment.
    ///
    /// Both figures are recomputed fresh from the log here; caches are never
    /// trusted for settlement. An accepted settlement strictly decreases
    /// |pending| in the same direction and can never flip its sign.
    pub async fn settle(&self, request: &SettlementRequest) -> Result<SettlementOutcome, EngineError> {
        let _guard = self.locks.acquire(&request.account_id).await;

        let account = self
            .repo
            .get_account(&request.account_id)
            .await?
            .ok_or_else(|| EngineError::UnknownAccount(request.account_id.clone()))?;

        let old_balance = self.baseline.old_balance(&account, None).await?;
        let current = self.balance.recompute(&account, TimeMs::now()).await?;
        let pending = pending_for(&account, old_balance, current);

        if let Err(reason) = validate(request, &pending) {
            info!(
                account_id = %account.id,
                amount = %request.amount,
                direction = %request.direction,
                reason = %reason,
                "Settlement rejected"
            );
            return Ok(SettlementOutcome::rejected(
                reason.to_string(),
                &pending,
                old_balance,
            ));
        }

        let pct = account.total_share_pct();
        let capital_closed = (request.amount * Decimal::hundred() / pct).round_money();
        let new_baseline = match request.direction {
            Direction::ClientPays => old_balance - capital_closed,
            Direction::BrokerPays => old_balance + capital_closed,
        };

        // The baseline must stay on the same side of the current balance;
        // crossing it would flip who owes whom.
        let crossed = match request.direction {
            Direction::ClientPays => new_baseline < current,
            Direction::BrokerPays => new_baseline > current,
        };
        if crossed {
            let inconsistency = InconsistentStateError {
                old_baseline: old_balance,
                new_baseline,
                current,
            };
            error!(
                account_id = %account.id,
                amount = %request.amount,
                error = %inconsistency,
                "Settlement aborted on inconsistent state"
            );
            return Ok(SettlementOutcome::rejected(
                inconsistency.to_string(),
                &pending,
                old_balance,
            ));
        }

        let mut new_baseline = new_baseline;
        let mut new_pending = pending_for(&account, new_baseline, current);
        // Residual within rounding epsilon: close the position exactly.
        if !new_pending.amount().is_material() {
            new_baseline = current;
            new_pending = Pending::None;
        }

        let payment = split_payment(&account, request.amount);
        let settlement_tx = Transaction::new(
            account.id.clone(),
            TxKind::Settlement,
            request.time_ms.unwrap_or_else(TimeMs::now),
            request.amount,
            request.amount,
            payment.broker,
            payment.company,
            Some(request.direction),
            request.note.clone(),
            None,
        );

        // The baseline is persisted directly on the account, never as a
        // balance record: records represent physical venue state only.
        self.repo.update_baseline(&account.id, new_baseline).await?;
        self.repo.insert_transaction(&settlement_tx).await?;
        self.ledger
            .apply_settlement(
                &account,
                request.direction,
                request.amount,
                &payment,
                &new_pending,
            )
            .await?;
        self.balance.refresh_cache(&account).await?;

        info!(
            account_id = %account.id,
            amount = %request.amount,
            direction = %request.direction,
            new_baseline = %new_baseline,
            new_pending = %new_pending.amount(),
            "Settlement applied"
        );

        Ok(SettlementOutcome {
            accepted: true,
            reason: None,
            resulting_pending: new_pending.amount(),
            pending_direction: new_pending.direction(),
            resulting_baseline: new_baseline,
        })
    }
}

fn validate(request: &SettlementRequest, pending: &Pending) -> Result<(), ValidationError> {
    if !request.amount.is_positive() {
        return Err(ValidationError::NonPositiveAmount);
    }
    let pending_direction = match pending.direction() {
        Some(d) => d,
        None => return Err(ValidationError::NothingPending),
    };
    if request.amount > pending.amount() {
        return Err(ValidationError::ExceedsPending {
            amount: request.amount,
            pending: pending.amount(),
        });
    }
    if request.direction != pending_direction {
        return Err(ValidationError::DirectionMismatch {
            requested: request.direction,
            pending: pending_direction,
        });
    }
    Ok(())
}
