//! Old-Balance calculation: the capital baseline profit/loss is measured
//! against.
//!
//! The baseline is always replayed from the transaction log; the persisted
//! account field is a hint written by the settlement engine, never consulted
//! here.

use crate::db::Repository;
use crate::domain::{Account, Decimal, Direction, TimeMs, Transaction};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct OldBalanceCalculator {
    repo: Arc<Repository>,
}

impl OldBalanceCalculator {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// The capital baseline for the account as of `at` (default: now).
    ///
    /// With settlements: cumulative funding up to the latest settlement,
    /// replayed against every settlement up to and including it (client-pays
    /// closes capital, broker-pays reopens it), plus funding strictly after.
    /// Without settlements: cumulative funding. Never undefined.
    pub async fn old_balance(
        &self,
        account: &Account,
        at: Option<TimeMs>,
    ) -> Result<Decimal, sqlx::Error> {
        let at = at.unwrap_or_else(TimeMs::now);

        let settlements = self.repo.settlements_up_to(&account.id, at).await?;
        let last = match settlements.last() {
            Some(last) => last.clone(),
            None => return self.funding_baseline(account, at).await,
        };

        let mut baseline = self
            .repo
            .sum_funding_up_to(&account.id, last.time_ms)
            .await?;
        for settlement in &settlements {
            let closed = capital_closed(account, settlement);
            match settlement_direction(settlement) {
                Direction::ClientPays => baseline = baseline - closed,
                Direction::BrokerPays => baseline = baseline + closed,
            }
        }
        baseline = baseline + self.repo.sum_funding_after(&account.id, last.time_ms, at).await?;

        if baseline.is_negative() {
            return self.clamped_baseline(account, at, &settlements, &last).await;
        }

        Ok(baseline)
    }

    /// Baseline when no settlement exists: cumulative funding up to the date.
    ///
    /// A zero total while funding transactions exist means the date filter
    /// clipped everything (e.g. backdated events); recompute without it.
    async fn funding_baseline(
        &self,
        account: &Account,
        at: TimeMs,
    ) -> Result<Decimal, sqlx::Error> {
        let baseline = self.repo.sum_funding_up_to(&account.id, at).await?;
        if baseline.is_zero() && self.repo.count_funding(&account.id).await? > 0 {
            return self.repo.sum_funding_total(&account.id).await;
        }
        Ok(baseline)
    }

    /// Safety clamp for a replay that went negative: prefer the last balance
    /// record before the settlement date, else funding minus settlement
    /// shares computed directly.
    async fn clamped_baseline(
        &self,
        account: &Account,
        at: TimeMs,
        settlements: &[Transaction],
        last: &Transaction,
    ) -> Result<Decimal, sqlx::Error> {
        warn!(
            account_id = %account.id,
            settlement_time_ms = last.time_ms.as_i64(),
            "Settlement replay produced a negative baseline, using fallback"
        );

        let before_settlement = TimeMs::new(last.time_ms.as_i64().saturating_sub(1));
        if let Some(record) = self
            .repo
            .latest_balance_record_at_or_before(&account.id, before_settlement)
            .await?
        {
            return Ok(record.effective_balance());
        }

        let mut baseline = self.repo.sum_funding_up_to(&account.id, at).await?;
        for settlement in settlements {
            match settlement_direction(settlement) {
                Direction::ClientPays => baseline = baseline - settlement.amount,
                Direction::BrokerPays => baseline = baseline + settlement.amount,
            }
        }
        Ok(baseline)
    }
}

/// The 100%-scale capital a settlement payment closed.
fn capital_closed(account: &Account, settlement: &Transaction) -> Decimal {
    (settlement.amount * Decimal::hundred() / account.total_share_pct()).round_money()
}

fn settlement_direction(settlement: &Transaction) -> Direction {
    settlement.direction.unwrap_or_else(|| {
        warn!(
            event_key = %settlement.event_key,
            "Settlement without direction, assuming client pays"
        );
        Direction::ClientPays
    })
}
