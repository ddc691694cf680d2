use std::net::SocketAddr;
use std::sync::Arc;
use tallybook::engine::{BalanceResolver, LedgerUpdater, OldBalanceCalculator, SettlementEngine};
use tallybook::orchestration::{AccountLocks, BalanceRecorder, Reconciler};
use tallybook::{api, config::Config, db::init_db, Repository};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    // Initialize database and dependencies
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));
    let locks = Arc::new(AccountLocks::new());
    let balance = BalanceResolver::new(repo.clone(), config.balance_cache_ttl_ms);
    let baseline = OldBalanceCalculator::new(repo.clone());
    let ledger = LedgerUpdater::new(repo.clone());
    let settlement = Arc::new(SettlementEngine::new(
        repo.clone(),
        balance.clone(),
        baseline.clone(),
        ledger.clone(),
        locks.clone(),
    ));
    let recorder = Arc::new(BalanceRecorder::new(
        repo.clone(),
        balance.clone(),
        ledger,
        locks.clone(),
    ));
    let reconciler = Reconciler::new(repo.clone());

    if config.reconcile_interval_ms > 0 {
        reconciler.clone().spawn_periodic(config.reconcile_interval_ms);
        tracing::info!(
            interval_ms = config.reconcile_interval_ms,
            "Background reconciler started"
        );
    }

    // Create router
    let app = api::create_router(api::AppState {
        repo,
        config,
        balance,
        baseline,
        settlement,
        recorder,
        reconciler,
        locks,
    });

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
