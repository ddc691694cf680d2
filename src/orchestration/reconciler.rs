//! Ledger reconciliation against the transaction log.
//!
//! The ledgers are maintained incrementally on each write; the reconciler
//! recomputes the same figures from the full log and flags divergence. It is
//! strictly read-only: a mismatch is logged, never auto-corrected.

use crate::db::Repository;
use crate::domain::ordering::sort_transactions_deterministic;
use crate::domain::{Account, ClientKind, Decimal};
use crate::engine::{net_tally, NetTally};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of reconciling one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Recomputed from the full log.
    pub computed: NetTally,
    /// Read from the stored ledger entry.
    pub stored: NetTally,
    /// True when stored and computed agree within the minor currency unit.
    pub consistent: bool,
}

#[derive(Clone)]
pub struct Reconciler {
    repo: Arc<Repository>,
}

impl Reconciler {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Recompute an account's net tallies from the log and compare against
    /// its stored ledger entry.
    pub async fn reconcile(&self, account: &Account) -> Result<ReconcileReport, sqlx::Error> {
        let mut transactions = self
            .repo
            .query_transactions(&account.id, None, None, None)
            .await?;
        sort_transactions_deterministic(&mut transactions);
        let computed = net_tally(&transactions);

        let stored = match account.client_kind {
            ClientKind::Individual => {
                let net = self
                    .repo
                    .get_outstanding(&account.id)
                    .await?
                    .map(|entry| entry.net_amount)
                    .unwrap_or_else(Decimal::zero);
                NetTally {
                    client: net,
                    company: Decimal::zero(),
                }
            }
            ClientKind::Company => {
                let entry = self.repo.get_tally(&account.id).await?;
                NetTally {
                    client: entry
                        .as_ref()
                        .map(|e| e.net_client())
                        .unwrap_or_else(Decimal::zero),
                    company: entry
                        .as_ref()
                        .map(|e| e.net_company())
                        .unwrap_or_else(Decimal::zero),
                }
            }
        };

        let consistent = !(computed.client - stored.client).is_material()
            && !(computed.company - stored.company).is_material();

        if consistent {
            debug!(account_id = %account.id, "Ledger reconciled");
        } else {
            warn!(
                account_id = %account.id,
                computed_client = %computed.client,
                stored_client = %stored.client,
                computed_company = %computed.company,
                stored_company = %stored.company,
                "Ledger diverges from transaction log"
            );
        }

        Ok(ReconcileReport {
            computed,
            stored,
            consistent,
        })
    }

    /// Reconcile every active account. Returns the number that diverged.
    pub async fn reconcile_all(&self) -> Result<usize, sqlx::Error> {
        let accounts = self.repo.list_active_accounts().await?;
        let mut diverged = 0;
        for account in &accounts {
            if !self.reconcile(account).await?.consistent {
                diverged += 1;
            }
        }
        info!(
            accounts = accounts.len(),
            diverged, "Reconciliation sweep complete"
        );
        Ok(diverged)
    }

    /// Run reconciliation sweeps forever at the given interval.
    pub fn spawn_periodic(self, interval_ms: u64) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = self.reconcile_all().await {
                    warn!(error = %e, "Reconciliation sweep failed");
                }
            }
        })
    }
}
