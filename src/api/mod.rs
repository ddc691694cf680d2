pub mod accounts;
pub mod balances;
pub mod funding;
pub mod health;
pub mod ledgers;
pub mod settlements;

use crate::config::Config;
use crate::db::Repository;
use crate::engine::{BalanceResolver, OldBalanceCalculator, SettlementEngine};
use crate::orchestration::{AccountLocks, BalanceRecorder, Reconciler};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub balance: BalanceResolver,
    pub baseline: OldBalanceCalculator,
    pub settlement: Arc<SettlementEngine>,
    pub recorder: Arc<BalanceRecorder>,
    pub reconciler: Reconciler,
    pub locks: Arc<AccountLocks>,
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/accounts", post(accounts::create_account))
        .route("/v1/accounts/:id", get(accounts::get_account))
        .route("/v1/accounts/:id/net-tally", get(ledgers::get_net_tally))
        .route("/v1/funding", post(funding::record_funding))
        .route("/v1/balance-records", post(balances::record_balance))
        .route("/v1/settlements", post(settlements::settle))
        .layer(cors)
        .with_state(state)
}
