//! The asserted-balance write path.
//!
//! Recording a venue balance is the one flow that creates profit/loss events:
//! upsert the record, mark the log, derive the movement, update the ledger,
//! refresh the cache. Runs under the per-account lock.

use crate::db::Repository;
use crate::domain::{Account, AccountId, BalanceRecord, Decimal, TimeMs, Transaction, TxKind};
use crate::engine::settlement::EngineError;
use crate::engine::{derive_pnl, BalanceResolver, LedgerUpdater, PnlEvent};
use crate::orchestration::locks::AccountLocks;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct BalanceRecordRequest {
    pub account_id: AccountId,
    /// Event time (default: now).
    pub time_ms: Option<TimeMs>,
    pub remaining_balance: Decimal,
    pub extra_adjustment: Decimal,
}

/// What a recorded balance produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordOutcome {
    pub current_balance: Decimal,
    /// The derived loss/profit event, if the movement was material.
    pub derived: Option<PnlEvent>,
}

#[derive(Clone)]
pub struct BalanceRecorder {
    repo: Arc<Repository>,
    balance: BalanceResolver,
    ledger: LedgerUpdater,
    locks: Arc<AccountLocks>,
}

impl BalanceRecorder {
    pub fn new(
        repo: Arc<Repository>,
        balance: BalanceResolver,
        ledger: LedgerUpdater,
        locks: Arc<AccountLocks>,
    ) -> Self {
        Self {
            repo,
            balance,
            ledger,
            locks,
        }
    }

    /// Record an asserted balance and derive the profit/loss it implies.
    ///
    /// The movement is measured against the prior record plus any funding
    /// that landed between the two snapshots, so capital transfers never
    /// masquerade as trading results. Each loss/profit event covers exactly
    /// the drift since the record before it, and the event sum reconciles
    /// with the baseline-derived pending.
    pub async fn record_balance(
        &self,
        request: &BalanceRecordRequest,
    ) -> Result<RecordOutcome, EngineError> {
        let _guard = self.locks.acquire(&request.account_id).await;

        let account = self
            .repo
            .get_account(&request.account_id)
            .await?
            .ok_or_else(|| EngineError::UnknownAccount(request.account_id.clone()))?;

        let time_ms = request.time_ms.unwrap_or_else(TimeMs::now);
        let expected = match self
            .repo
            .latest_balance_record_at_or_before(&account.id, time_ms)
            .await?
        {
            Some(prior) => {
                let funded = self
                    .repo
                    .sum_funding_after(&account.id, prior.time_ms, time_ms)
                    .await?;
                prior.effective_balance() + funded
            }
            None => self.repo.sum_funding_up_to(&account.id, time_ms).await?,
        };

        let record = BalanceRecord::new(
            account.id.clone(),
            time_ms,
            request.remaining_balance,
            request.extra_adjustment,
        );
        self.repo.upsert_balance_record(&record).await?;
        self.repo
            .insert_transaction(&Transaction::new(
                account.id.clone(),
                TxKind::BalanceRecord,
                time_ms,
                record.effective_balance(),
                Decimal::zero(),
                Decimal::zero(),
                Decimal::zero(),
                None,
                None,
                None,
            ))
            .await?;

        let derived = derive_pnl(&account, expected, record.effective_balance());
        if let Some(event) = &derived {
            self.append_pnl(&account, event, time_ms).await?;
        }

        let current = self.balance.refresh_cache(&account).await?;

        info!(
            account_id = %account.id,
            balance = %current,
            derived = derived.is_some(),
            "Balance recorded"
        );

        Ok(RecordOutcome {
            current_balance: current,
            derived,
        })
    }

    async fn append_pnl(
        &self,
        account: &Account,
        event: &PnlEvent,
        time_ms: TimeMs,
    ) -> Result<(), EngineError> {
        let tx = Transaction::new(
            account.id.clone(),
            event.kind,
            time_ms,
            event.amount,
            event.split.total_share,
            event.split.broker_cut,
            event.split.company_cut,
            None,
            None,
            None,
        );
        self.repo.insert_transaction(&tx).await?;
        self.ledger.apply_pnl(account, event).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::test_support::setup_test_db;
    use crate::domain::{ClientKind, Venue};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    async fn setup(kind: ClientKind) -> (Arc<Repository>, Account, BalanceRecorder, tempfile::TempDir) {
        let (repo, temp) = setup_test_db().await;
        let repo = Arc::new(repo);
        let (broker, company) = match kind {
            ClientKind::Individual => ("10", "0"),
            ClientKind::Company => ("1", "10"),
        };
        let account = Account::new(
            "client".to_string(),
            Venue::new("venue-a".to_string()),
            kind,
            dec(broker),
            dec(company),
        )
        .unwrap();
        repo.insert_account(&account).await.unwrap();

        let balance = BalanceResolver::new(repo.clone(), 3_600_000);
        let ledger = LedgerUpdater::new(repo.clone());
        let recorder = BalanceRecorder::new(
            repo.clone(),
            balance,
            ledger,
            Arc::new(AccountLocks::new()),
        );
        (repo, account, recorder, temp)
    }

    async fn fund(repo: &Repository, account: &Account, time_ms: i64, amount: &str) {
        repo.insert_transaction(&Transaction::funding(
            account.id.clone(),
            TimeMs::new(time_ms),
            dec(amount),
            None,
            Some(&format!("wire-{}", time_ms)),
        ))
        .await
        .unwrap();
    }

    fn record(account: &Account, time_ms: i64, balance: &str) -> BalanceRecordRequest {
        BalanceRecordRequest {
            account_id: account.id.clone(),
            time_ms: Some(TimeMs::new(time_ms)),
            remaining_balance: dec(balance),
            extra_adjustment: Decimal::zero(),
        }
    }

    #[tokio::test]
    async fn test_loss_derived_and_ledger_updated() {
        let (repo, account, recorder, _temp) = setup(ClientKind::Individual).await;
        fund(&repo, &account, 1000, "1000").await;

        let outcome = recorder
            .record_balance(&record(&account, 2000, "820"))
            .await
            .unwrap();

        assert_eq!(outcome.current_balance, dec("820"));
        let event = outcome.derived.unwrap();
        assert_eq!(event.kind, TxKind::Loss);
        assert_eq!(event.amount, dec("180"));
        assert_eq!(event.split.total_share, dec("18"));

        let entry = repo.get_outstanding(&account.id).await.unwrap().unwrap();
        assert_eq!(entry.net_amount, dec("18"));

        let losses = repo
            .query_transactions(&account.id, Some(TxKind::Loss), None, None)
            .await
            .unwrap();
        assert_eq!(losses.len(), 1);
        assert_eq!(losses[0].amount, dec("180"));
    }

    #[tokio::test]
    async fn test_repeated_records_accumulate_incrementally() {
        let (repo, account, recorder, _temp) = setup(ClientKind::Individual).await;
        fund(&repo, &account, 1000, "1000").await;

        recorder
            .record_balance(&record(&account, 2000, "820"))
            .await
            .unwrap();
        let outcome = recorder
            .record_balance(&record(&account, 3000, "800"))
            .await
            .unwrap();

        // Second event only covers the 20 of further drift.
        let event = outcome.derived.unwrap();
        assert_eq!(event.amount, dec("20"));
        assert_eq!(event.split.total_share, dec("2"));

        let entry = repo.get_outstanding(&account.id).await.unwrap().unwrap();
        assert_eq!(entry.net_amount, dec("20"));
    }

    #[tokio::test]
    async fn test_unchanged_balance_derives_nothing() {
        let (repo, account, recorder, _temp) = setup(ClientKind::Individual).await;
        fund(&repo, &account, 1000, "1000").await;

        let outcome = recorder
            .record_balance(&record(&account, 2000, "1000"))
            .await
            .unwrap();
        assert!(outcome.derived.is_none());
        assert!(repo.get_outstanding(&account.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_company_record_fills_tally() {
        let (repo, account, recorder, _temp) = setup(ClientKind::Company).await;
        fund(&repo, &account, 1000, "1000").await;

        recorder
            .record_balance(&record(&account, 2000, "800"))
            .await
            .unwrap();

        let entry = repo.get_tally(&account.id).await.unwrap().unwrap();
        assert_eq!(entry.client_owes_you, dec("20"));
        assert_eq!(entry.company_owes_you, dec("18"));
    }

    #[tokio::test]
    async fn test_funding_between_records_is_not_profit() {
        let (repo, account, recorder, _temp) = setup(ClientKind::Individual).await;
        fund(&repo, &account, 1000, "1000").await;

        recorder
            .record_balance(&record(&account, 2000, "820"))
            .await
            .unwrap();
        fund(&repo, &account, 3000, "500").await;

        let outcome = recorder
            .record_balance(&record(&account, 4000, "1320"))
            .await
            .unwrap();
        assert!(outcome.derived.is_none());
        assert_eq!(outcome.current_balance, dec("1320"));

        // The 18 from the first record is still the whole obligation.
        let entry = repo.get_outstanding(&account.id).await.unwrap().unwrap();
        assert_eq!(entry.net_amount, dec("18"));
    }

    #[tokio::test]
    async fn test_reasserting_same_time_derives_the_delta() {
        let (repo, account, recorder, _temp) = setup(ClientKind::Individual).await;
        fund(&repo, &account, 1000, "1000").await;

        recorder
            .record_balance(&record(&account, 2000, "820"))
            .await
            .unwrap();
        // Corrected figure for the same snapshot replaces the record and
        // derives only the difference.
        let outcome = recorder
            .record_balance(&record(&account, 2000, "810"))
            .await
            .unwrap();

        let event = outcome.derived.unwrap();
        assert_eq!(event.kind, TxKind::Loss);
        assert_eq!(event.amount, dec("10"));

        let entry = repo.get_outstanding(&account.id).await.unwrap().unwrap();
        assert_eq!(entry.net_amount, dec("19"));
    }

    #[tokio::test]
    async fn test_unknown_account_rejected() {
        let (_repo, _account, recorder, _temp) = setup(ClientKind::Individual).await;
        let request = BalanceRecordRequest {
            account_id: AccountId::new("missing".to_string()),
            time_ms: None,
            remaining_balance: dec("100"),
            extra_adjustment: Decimal::zero(),
        };
        assert!(matches!(
            recorder.record_balance(&request).await,
            Err(EngineError::UnknownAccount(_))
        ));
    }

    #[tokio::test]
    async fn test_cache_refreshed_after_record() {
        let (repo, account, recorder, _temp) = setup(ClientKind::Individual).await;
        fund(&repo, &account, 1000, "1000").await;

        recorder
            .record_balance(&record(&account, 2000, "820"))
            .await
            .unwrap();

        let stored = repo.get_account(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.cached_current_balance, dec("820"));
        assert!(stored.cache_updated_ms.is_some());
    }
}
