use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, DefaultImportService, ImportService, MatchService, PredictionService,
    RankingService, SeaOrmAuthService, SeaOrmMatchService, SeaOrmPredictionService,
    SeaOrmRankingService, SettlementEngine,
};

/// Services shared by the HTTP layer and the CLI.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub auth_service: Arc<dyn AuthService>,

    pub match_service: Arc<dyn MatchService>,

    pub prediction_service: Arc<dyn PredictionService>,

    pub ranking_service: Arc<dyn RankingService>,

    pub import_service: Arc<dyn ImportService>,
}

impl SharedState {
    /// Opens the database, runs migrations and wires the services.
    ///
    /// When a bootstrap admin password is configured it is applied here, so
    /// every entry point starts with the same admin credentials.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.security.clone(),
        )) as Arc<dyn AuthService>;

        if let Some(password) = config.bootstrap.admin_password.as_deref() {
            auth_service
                .bootstrap_admin_password(password)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to set admin password: {e}"))?;
        }

        let match_service = Arc::new(SeaOrmMatchService::new(
            store.clone(),
            SettlementEngine::new(),
            config.pool.clone(),
        )) as Arc<dyn MatchService>;

        let prediction_service = Arc::new(SeaOrmPredictionService::new(
            store.clone(),
            config.pool.clone(),
        )) as Arc<dyn PredictionService>;

        let ranking_service =
            Arc::new(SeaOrmRankingService::new(store.clone())) as Arc<dyn RankingService>;

        let import_service =
            Arc::new(DefaultImportService::new(match_service.clone())) as Arc<dyn ImportService>;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            store,
            auth_service,
            match_service,
            prediction_service,
            ranking_service,
            import_service,
        })
    }

    pub async fn config(&self) -> Config {
        self.config.read().await.clone()
    }
}
