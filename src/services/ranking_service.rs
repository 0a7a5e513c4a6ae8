//! Read-only leaderboard over users' accumulated points.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::db::Store;
use crate::domain::UserId;

pub const MAX_RANKING_LIMIT: u64 = 1000;

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for RankingError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(format!("{err:#}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    /// 1-based; users with equal points share a position.
    pub position: usize,
    pub user_id: UserId,
    pub username: String,
    pub points: i32,
}

#[async_trait]
pub trait RankingService: Send + Sync {
    /// Users ordered by points, highest first. Equal points keep
    /// registration order so the output is stable.
    ///
    /// # Errors
    ///
    /// Returns [`RankingError::Validation`] if `limit` is outside `1..=1000`.
    async fn ranking(&self, limit: Option<u64>) -> Result<Vec<Standing>, RankingError>;
}

pub struct SeaOrmRankingService {
    store: Store,
}

impl SeaOrmRankingService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RankingService for SeaOrmRankingService {
    async fn ranking(&self, limit: Option<u64>) -> Result<Vec<Standing>, RankingError> {
        if let Some(limit) = limit
            && !(1..=MAX_RANKING_LIMIT).contains(&limit)
        {
            return Err(RankingError::Validation(format!(
                "Invalid limit: {limit}. Limit must be between 1 and {MAX_RANKING_LIMIT}"
            )));
        }

        let entries = self.store.ranking(limit).await?;

        let mut standings = Vec::with_capacity(entries.len());
        let mut previous: Option<(i32, usize)> = None;
        for (index, entry) in entries.into_iter().enumerate() {
            let position = match previous {
                Some((points, position)) if points == entry.points => position,
                _ => index + 1,
            };
            previous = Some((entry.points, position));
            standings.push(Standing {
                position,
                user_id: entry.id,
                username: entry.username,
                points: entry.points,
            });
        }

        Ok(standings)
    }
}
