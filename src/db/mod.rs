use anyhow::Result;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DatabaseTransaction, DbErr,
    RuntimeErr, Statement, TransactionTrait,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::info;

use crate::config::SecurityConfig;
use crate::domain::{Match, MatchId, Prediction, UserId, UserRole};

pub mod migrator;
pub mod repositories;

pub use repositories::matches::NewMatch;
pub use repositories::predictions::PredictionWithMatch;
pub use repositories::user::{RankingEntry, User};

/// Held for the lifetime of a write transaction.
pub type WriteGuard = OwnedMutexGuard<()>;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
    writer: Arc<Mutex<()>>,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        // Every connection to an in-memory database sees its own empty
        // database, so the pool is pinned to a single connection.
        let in_memory = db_url.contains(":memory:");
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        if !in_memory {
            opt.idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self {
            conn,
            writer: Arc::new(Mutex::new(())),
        })
    }

    /// Opens a transaction that is going to write.
    ///
    /// SQLite transactions start deferred, so two of them may read the same
    /// snapshot and only collide when the second one writes. Writers are queued
    /// here instead: each one begins after the previous commit and reads its
    /// result. Keep the guard alive until the transaction is finished.
    pub async fn begin_write(&self) -> Result<(WriteGuard, DatabaseTransaction), DbErr> {
        let guard = Arc::clone(&self.writer).lock_owned().await;
        let txn = self.conn.begin().await?;
        Ok((guard, txn))
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    // ========== Match Repository Methods ==========

    #[must_use]
    pub fn match_repo(&self) -> repositories::matches::MatchRepository {
        repositories::matches::MatchRepository::new(self.conn.clone())
    }

    pub async fn create_match(&self, new: NewMatch) -> Result<Match> {
        self.match_repo().create(new).await
    }

    pub async fn get_match(&self, id: MatchId) -> Result<Option<Match>> {
        self.match_repo().get(id).await
    }

    pub async fn list_matches_by_round(&self, round: i32) -> Result<Vec<Match>> {
        self.match_repo().list_by_round(round).await
    }

    pub async fn list_all_matches(&self) -> Result<Vec<Match>> {
        self.match_repo().list_all().await
    }

    pub async fn list_visible_matches(&self) -> Result<Vec<Match>> {
        self.match_repo().list_visible().await
    }

    pub async fn delete_match(&self, id: MatchId) -> Result<bool> {
        let _writer = self.writer.lock().await;
        self.match_repo().delete(id).await
    }

    pub async fn delete_round(&self, round: i32) -> Result<u64> {
        let _writer = self.writer.lock().await;
        self.match_repo().delete_round(round).await
    }

    // ========== Prediction Repository Methods ==========

    #[must_use]
    pub fn prediction_repo(&self) -> repositories::predictions::PredictionRepository {
        repositories::predictions::PredictionRepository::new(self.conn.clone())
    }

    pub async fn list_predictions_by_user(&self, user: UserId) -> Result<Vec<PredictionWithMatch>> {
        self.prediction_repo().list_by_user(user).await
    }

    pub async fn list_predictions_by_user_and_round(
        &self,
        user: UserId,
        round: i32,
    ) -> Result<Vec<PredictionWithMatch>> {
        self.prediction_repo()
            .list_by_user_and_round(user, round)
            .await
    }

    pub async fn get_prediction(
        &self,
        user: UserId,
        match_id: MatchId,
    ) -> Result<Option<Prediction>> {
        self.prediction_repo()
            .get_for_user_and_match(user, match_id)
            .await
    }

    // ========== User Repository Methods ==========

    #[must_use]
    pub fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    pub async fn create_user(
        &self,
        username: &str,
        password: &str,
        role: UserRole,
        config: &SecurityConfig,
    ) -> Result<User> {
        self.user_repo()
            .create(username, password, role, config)
            .await
    }

    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.user_repo().list_all().await
    }

    pub async fn verify_user_password(&self, username: &str, password: &str) -> Result<Option<User>> {
        self.user_repo().verify_password(username, password).await
    }

    pub async fn update_user_password(
        &self,
        id: UserId,
        new_password: &str,
        config: &SecurityConfig,
    ) -> Result<()> {
        self.user_repo()
            .update_password(id, new_password, config)
            .await
    }

    pub async fn update_username(&self, id: UserId, username: &str) -> Result<Option<User>> {
        self.user_repo().update_username(id, username).await
    }

    pub async fn set_user_active(&self, id: UserId, is_active: bool) -> Result<Option<User>> {
        self.user_repo().set_active(id, is_active).await
    }

    pub async fn verify_api_key(&self, api_key: &str) -> Result<Option<User>> {
        self.user_repo().verify_api_key(api_key).await
    }

    pub async fn regenerate_user_api_key(&self, id: UserId) -> Result<String> {
        self.user_repo().regenerate_api_key(id).await
    }

    pub async fn ranking(&self, limit: Option<u64>) -> Result<Vec<RankingEntry>> {
        self.user_repo().ranking(limit).await
    }
}

/// Reported when a write lost the race for the database lock.
pub const BUSY_MESSAGE: &str = "The database is busy with another write, retry the request";

/// Whether SQLite refused the statement because another connection (for
/// example a CLI import running beside the server) holds the write lock.
#[must_use]
pub fn is_lock_contention(err: &DbErr) -> bool {
    let (DbErr::Exec(RuntimeErr::SqlxError(e))
    | DbErr::Query(RuntimeErr::SqlxError(e))
    | DbErr::Conn(RuntimeErr::SqlxError(e))) = err
    else {
        return false;
    };

    // SQLITE_BUSY, SQLITE_LOCKED and their extended codes.
    e.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| matches!(code.as_ref(), "5" | "6" | "261" | "262" | "517"))
}
