use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use super::recommendations::RecommendationEngine;
use crate::{
    error::{AppError, AppResult},
    models::{StayRecord, UserId},
};

/// Supplier of the stay history the engine is built from
///
/// Known users are loaded separately: the request layer validates ids against
/// them, the engine never does.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait StayRecordSource: Send + Sync {
    /// Every historical stay record
    async fn load_stays(&self) -> AppResult<Vec<StayRecord>>;

    /// Ids of every registered user, including ones without stays
    async fn load_known_users(&self) -> AppResult<HashSet<UserId>>;

    /// Source name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Record source backed by vectors held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordSource {
    stays: Vec<StayRecord>,
    known_users: HashSet<UserId>,
}

impl InMemoryRecordSource {
    /// Known users default to everyone with at least one stay
    pub fn new(stays: Vec<StayRecord>) -> Self {
        let known_users = stays.iter().map(|s| s.user_id).collect();
        Self { stays, known_users }
    }

    pub fn with_known_users(mut self, users: impl IntoIterator<Item = UserId>) -> Self {
        self.known_users.extend(users);
        self
    }
}

#[async_trait::async_trait]
impl StayRecordSource for InMemoryRecordSource {
    async fn load_stays(&self) -> AppResult<Vec<StayRecord>> {
        Ok(self.stays.clone())
    }

    async fn load_known_users(&self) -> AppResult<HashSet<UserId>> {
        Ok(self.known_users.clone())
    }

    fn name(&self) -> &'static str {
        "in-memory"
    }
}

/// A built engine together with the user registry it was loaded alongside
///
/// Immutable once created; a refresh produces a new snapshot.
#[derive(Debug)]
pub struct EngineSnapshot {
    pub engine: RecommendationEngine,
    pub known_users: HashSet<UserId>,
    pub built_at: DateTime<Utc>,
}

impl EngineSnapshot {
    pub fn is_known_user(&self, user: UserId) -> bool {
        self.known_users.contains(&user)
    }
}

/// Loads records and users from `source` and builds a fresh snapshot
///
/// The O(U² · H) build runs on the blocking pool so request workers keep serving.
pub async fn load_snapshot(source: Arc<dyn StayRecordSource>) -> AppResult<EngineSnapshot> {
    let start = Instant::now();

    let stays = source.load_stays().await?;
    let known_users = source.load_known_users().await?;

    tracing::info!(
        source = source.name(),
        records = stays.len(),
        known_users = known_users.len(),
        "Stay records loaded"
    );

    let engine = tokio::task::spawn_blocking(move || RecommendationEngine::build(&stays))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    tracing::info!(
        processing_time_ms = start.elapsed().as_millis(),
        "Engine snapshot ready"
    );

    Ok(EngineSnapshot {
        engine,
        known_users,
        built_at: Utc::now(),
    })
}
