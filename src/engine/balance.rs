//! Current-balance resolution with a best-effort cache.

use crate::db::Repository;
use crate::domain::{Account, Decimal, TimeMs};
use std::sync::Arc;

/// Resolves the Current Balance of an account as of any date.
///
/// The cache fast path is purely a performance optimization: staleness is
/// safe because the recompute path is always available, and mutating flows
/// refresh the cache explicitly.
#[derive(Clone)]
pub struct BalanceResolver {
    repo: Arc<Repository>,
    cache_ttl_ms: i64,
}

impl BalanceResolver {
    pub fn new(repo: Arc<Repository>, cache_ttl_ms: i64) -> Self {
        Self { repo, cache_ttl_ms }
    }

    /// Resolve the current balance. With no as-of date a sufficiently fresh
    /// cached value is returned directly; otherwise the balance is
    /// recomputed from records. Pure read, no side effects.
    pub async fn resolve(
        &self,
        account: &Account,
        at: Option<TimeMs>,
    ) -> Result<Decimal, sqlx::Error> {
        if at.is_none() {
            if let Some(updated) = account.cache_updated_ms {
                let age = TimeMs::now().as_i64().saturating_sub(updated.as_i64());
                if age < self.cache_ttl_ms {
                    return Ok(account.cached_current_balance);
                }
            }
        }

        self.recompute(account, at.unwrap_or_else(TimeMs::now)).await
    }

    /// Canonical recompute path, never consulting the cache: the latest
    /// non-marker balance record at/before the date wins; with no record the
    /// balance is cumulative funding.
    pub async fn recompute(&self, account: &Account, at: TimeMs) -> Result<Decimal, sqlx::Error> {
        if let Some(record) = self
            .repo
            .latest_balance_record_at_or_before(&account.id, at)
            .await?
        {
            return Ok(record.effective_balance());
        }

        self.repo.sum_funding_up_to(&account.id, at).await
    }

    /// Recompute now and persist the result as the account's cache.
    ///
    /// Issued explicitly by mutating flows after each write; nothing updates
    /// the cache implicitly.
    pub async fn refresh_cache(&self, account: &Account) -> Result<Decimal, sqlx::Error> {
        let now = TimeMs::now();
        let balance = self.recompute(account, now).await?;
        self.repo
            .update_balance_cache(&account.id, balance, now)
            .await?;
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::test_support::setup_test_db;
    use crate::domain::{BalanceRecord, ClientKind, Transaction, Venue};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    async fn setup() -> (Arc<Repository>, Account, tempfile::TempDir) {
        let (repo, temp) = setup_test_db().await;
        let repo = Arc::new(repo);
        let account = Account::new(
            "alice".to_string(),
            Venue::new("venue-a".to_string()),
            ClientKind::Individual,
            dec("10"),
            Decimal::zero(),
        )
        .unwrap();
        repo.insert_account(&account).await.unwrap();
        (repo, account, temp)
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

    #[tokio::test]
    async fn test_falls_back_to_funding_without_records() {
        let (repo, account, _temp) = setup().await;
        fund(&repo, &account, 1000, "1000").await;

        let resolver = BalanceResolver::new(repo, 3_600_000);
        let balance = resolver.resolve(&account, None).await.unwrap();
        assert_eq!(balance, dec("1000"));
    }

    #[tokio::test]
    async fn test_balance_record_wins_over_funding() {
        let (repo, account, _temp) = setup().await;
        fund(&repo, &account, 1000, "1000").await;
        repo.upsert_balance_record(&BalanceRecord::new(
            account.id.clone(),
            TimeMs::new(2000),
            dec("820"),
            dec("5"),
        ))
        .await
        .unwrap();

        let resolver = BalanceResolver::new(repo, 3_600_000);
        let balance = resolver.resolve(&account, None).await.unwrap();
        assert_eq!(balance, dec("825"));
    }

    #[tokio::test]
    async fn test_as_of_date_ignores_later_records() {
        let (repo, account, _temp) = setup().await;
        fund(&repo, &account, 1000, "1000").await;
        repo.upsert_balance_record(&BalanceRecord::new(
            account.id.clone(),
            TimeMs::new(5000),
            dec("820"),
            Decimal::zero(),
        ))
        .await
        .unwrap();

        let resolver = BalanceResolver::new(repo, 3_600_000);
        // Time-travel to before the record: cumulative funding applies.
        let balance = resolver
            .resolve(&account, Some(TimeMs::new(2000)))
            .await
            .unwrap();
        assert_eq!(balance, dec("1000"));
    }

    #[tokio::test]
    async fn test_fresh_cache_short_circuits() {
        let (repo, mut account, _temp) = setup().await;
        fund(&repo, &account, 1000, "1000").await;

        account.cached_current_balance = dec("777");
        account.cache_updated_ms = Some(TimeMs::now());

        let resolver = BalanceResolver::new(repo, 3_600_000);
        let balance = resolver.resolve(&account, None).await.unwrap();
        assert_eq!(balance, dec("777"));

        // An explicit as-of date always bypasses the cache.
        let balance = resolver
            .resolve(&account, Some(TimeMs::now()))
            .await
            .unwrap();
        assert_eq!(balance, dec("1000"));
    }

    #[tokio::test]
    async fn test_stale_cache_recomputes() {
        let (repo, mut account, _temp) = setup().await;
        fund(&repo, &account, 1000, "1000").await;

        account.cached_current_balance = dec("777");
        account.cache_updated_ms = Some(TimeMs::new(TimeMs::now().as_i64() - 7_200_000));

        let resolver = BalanceResolver::new(repo, 3_600_000);
        let balance = resolver.resolve(&account, None).await.unwrap();
        assert_eq!(balance, dec("1000"));
    }

    #[tokio::test]
    async fn test_refresh_cache_persists() {
        let (repo, account, _temp) = setup().await;
        fund(&repo, &account, 1000, "1000").await;

        let resolver = BalanceResolver::new(repo.clone(), 3_600_000);
        let balance = resolver.refresh_cache(&account).await.unwrap();
        assert_eq!(balance, dec("1000"));

        let stored = repo.get_account(&account.id).await.unwrap().unwrap();
        assert_eq!(stored.cached_current_balance, dec("1000"));
        assert!(stored.cache_updated_ms.is_some());
    }

    #[tokio::test]
    async fn test_idempotent_recompute() {
        let (repo, account, _temp) = setup().await;
        fund(&repo, &account, 1000, "1000").await;

        let resolver = BalanceResolver::new(repo, 3_600_000);
        let at = TimeMs::new(5000);
        let first = resolver.recompute(&account, at).await.unwrap();
        let second = resolver.recompute(&account, at).await.unwrap();
        assert_eq!(first, second);
    }
}
