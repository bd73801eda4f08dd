// src/config.rs

use std::{env, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;

use crate::{
    common::i18n::I18nStore,
    db::{DocumentStore, MemoryDocumentStore, PgDocumentStore, ResilientStore},
    resilience::{CircuitBreaker, CircuitBreakerConfig},
    services::{
        auth::AuthService, catalog_service::CatalogService, dashboard_service::DashboardService,
        ferme_service::FermeService, import_service::ImportService,
        occupancy_service::OccupancyService, room_service::RoomService,
        stock_service::StockService, supervisor_service::SupervisorService,
        transfer_service::TransferService, worker_service::WorkerService,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("unknown STORE_BACKEND '{other}' (expected postgres or memory)"),
        }
    }
}

/// Runtime settings, read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: String,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub bcrypt_cost: u32,
    pub breaker: CircuitBreakerConfig,
    // None disables the periodic reconciliation
    pub reconcile_interval: Option<Duration>,
    pub superadmin_email: Option<String>,
    pub superadmin_password: Option<String>,
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value for {key}: {e}")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let store_backend: StoreBackend = env_or("STORE_BACKEND", StoreBackend::Postgres)?;
        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORE_BACKEND=postgres");
        }

        let reconcile_secs: u64 = env_or("RECONCILE_INTERVAL_SECS", 300)?;

        Ok(Self {
            bind_address: env_or("BIND_ADDRESS", "0.0.0.0:3000".to_string())?,
            store_backend,
            database_url,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            token_ttl_days: env_or("TOKEN_TTL_DAYS", 7)?,
            bcrypt_cost: env_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?,
            breaker: CircuitBreakerConfig {
                failure_threshold: env_or("BREAKER_FAILURE_THRESHOLD", 5)?,
                recovery_timeout: Duration::from_secs(env_or("BREAKER_RECOVERY_TIMEOUT_SECS", 30)?),
                reset_after: Duration::from_secs(env_or("BREAKER_RESET_AFTER_SECS", 10)?),
            },
            reconcile_interval: (reconcile_secs > 0).then(|| Duration::from_secs(reconcile_secs)),
            superadmin_email: env::var("SUPERADMIN_EMAIL").ok(),
            superadmin_password: env::var("SUPERADMIN_PASSWORD").ok(),
        })
    }
}

// Shared state reachable from every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<ResilientStore>,
    pub i18n_store: Arc<I18nStore>,
    pub auth_service: AuthService,
    pub ferme_service: FermeService,
    pub worker_service: WorkerService,
    pub room_service: RoomService,
    pub occupancy_service: OccupancyService,
    pub supervisor_service: SupervisorService,
    pub stock_service: StockService,
    pub transfer_service: TransferService,
    pub import_service: ImportService,
    pub catalog_service: CatalogService,
    pub dashboard_service: DashboardService,
}

impl AppState {
    /// Connects the configured backend (running migrations for Postgres).
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let backend: Arc<dyn DocumentStore> = match config.store_backend {
            StoreBackend::Postgres => {
                let database_url = config
                    .database_url
                    .as_deref()
                    .context("DATABASE_URL must be set")?;

                // '?' propagates connection errors instead of exiting
                let db_pool = PgPoolOptions::new()
                    .max_connections(5)
                    .acquire_timeout(Duration::from_secs(3))
                    .connect(database_url)
                    .await?;
                tracing::info!("✅ Database connection established");

                sqlx::migrate!().run(&db_pool).await?;
                tracing::info!("✅ Database migrations applied");

                Arc::new(PgDocumentStore::new(db_pool))
            }
            StoreBackend::Memory => {
                tracing::warn!("Using the in-memory document store; data is lost on restart");
                Arc::new(MemoryDocumentStore::new())
            }
        };

        Ok(Self::with_backend(config, backend))
    }

    /// Builds the dependency graph on top of any backend.
    pub fn with_backend(config: Config, backend: Arc<dyn DocumentStore>) -> Self {
        let breaker = Arc::new(CircuitBreaker::new("document_store", config.breaker.clone()));
        let store = Arc::new(ResilientStore::new(backend, breaker));
        let shared: Arc<dyn DocumentStore> = store.clone();

        let occupancy_service = OccupancyService::new(store.strict());
        let auth_service = AuthService::new(
            shared.clone(),
            config.jwt_secret.clone(),
            config.token_ttl_days,
            config.bcrypt_cost,
        );

        Self {
            config: Arc::new(config),
            store,
            i18n_store: Arc::new(I18nStore::new()),
            auth_service,
            ferme_service: FermeService::new(shared.clone()),
            worker_service: WorkerService::new(shared.clone(), occupancy_service.clone()),
            room_service: RoomService::new(shared.clone(), occupancy_service.clone()),
            supervisor_service: SupervisorService::new(shared.clone()),
            stock_service: StockService::new(shared.clone()),
            transfer_service: TransferService::new(shared.clone(), occupancy_service.clone()),
            import_service: ImportService::new(shared.clone(), occupancy_service.clone()),
            catalog_service: CatalogService::new(shared.clone()),
            dashboard_service: DashboardService::new(shared),
            occupancy_service,
        }
    }
}
